use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use notiflow_core::NotiflowConfig;
use notiflow_core::extractor::OpenAiExtractor;
use notiflow_core::records::{CourseMeetingRecord, OneOrMany, RawRecord, TimedEventRecord};
use notiflow_core::sources::announcements::{AnnouncementSource, AnnouncementsByCourse};
use notiflow_core::sources::assignments::CourseMap;
use notiflow_core::sources::final_exam::FinalExamSchedule;
use notiflow_core::sync::{RecordSource, sync_source};
use owo_colors::OwoColorize;
use serde::de::DeserializeOwned;

use crate::render::Render;

fn read_records<T: DeserializeOwned>(file: &Path) -> Result<T> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("{} does not hold the expected records", file.display()))
}

fn run(config: &NotiflowConfig, source: &dyn RecordSource) -> Result<()> {
    let outcome = sync_source(config, source)?;

    println!("{} {}", "📅".bold(), config.calendar_path().display());
    println!("{}", outcome.render());

    Ok(())
}

pub fn events(config: &NotiflowConfig, file: &Path) -> Result<()> {
    let records: OneOrMany<TimedEventRecord> = read_records(file)?;
    let records: Vec<RawRecord> = records.into_vec().into_iter().map(RawRecord::from).collect();
    run(config, &records)
}

pub fn meeting(config: &NotiflowConfig, file: &Path) -> Result<()> {
    let record: CourseMeetingRecord = read_records(file)?;
    run(config, &vec![RawRecord::from(record)])
}

pub fn assignments(config: &NotiflowConfig, file: &Path) -> Result<()> {
    let courses: CourseMap = read_records(file)?;
    run(config, &courses)
}

pub fn announcements(config: &NotiflowConfig, file: &Path) -> Result<()> {
    let by_course: AnnouncementsByCourse = read_records(file)?;
    let extractor = OpenAiExtractor::from_config(&config.extractor)?;

    let source = AnnouncementSource {
        by_course: &by_course,
        extractor: &extractor,
        tz: config.tz()?,
    };
    run(config, &source)
}

pub fn finals(config: &NotiflowConfig, file: &Path) -> Result<()> {
    let schedule: FinalExamSchedule = read_records(file)?;
    run(config, &schedule)
}
