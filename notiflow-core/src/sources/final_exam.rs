//! Final exam records from the exam schedule.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::{NotiflowError, NotiflowResult};
use crate::event::EventCategory;
use crate::records::{RawRecord, TimedEventRecord};
use crate::sync::{RecordSource, SourceBatch};
use crate::time::{format_date, format_time};

/// Format of the schedule's date-time line, e.g. `Thu Dec 11 2025 | 12:00 pm`.
const EXAM_DATETIME_FORMAT: &str = "%a %b %d %Y | %I:%M %p";

/// Final exams are scheduled in 2.5-hour slots.
pub const EXAM_DURATION_MINUTES: i64 = 150;

/// One room assignment of an exam. Missing parts fall back to `All` and
/// `Unknown`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamLocation {
    #[serde(default)]
    pub split: Option<String>,
    #[serde(default)]
    pub building: Option<String>,
}

pub fn parse_exam_datetime(text: &str) -> NotiflowResult<(NaiveDate, NaiveTime)> {
    let dt = NaiveDateTime::parse_from_str(text.trim(), EXAM_DATETIME_FORMAT)
        .map_err(|e| NotiflowError::Parse(format!("invalid exam date-time '{}': {}", text, e)))?;
    Ok((dt.date(), dt.time()))
}

/// End of an exam starting at `start`.
///
/// The time wraps past midnight without moving the date, so a slot starting
/// after 21:30 ends before it starts on the same day.
pub fn exam_end_time(start: NaiveTime) -> NaiveTime {
    start + TimeDelta::minutes(EXAM_DURATION_MINUTES)
}

/// `"split: building"` pairs joined with `", "`.
pub fn exam_location(locations: &[ExamLocation]) -> String {
    locations
        .iter()
        .map(|loc| {
            format!(
                "{}: {}",
                loc.split.as_deref().unwrap_or("All"),
                loc.building.as_deref().unwrap_or("Unknown")
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn final_exam_record(
    course: &str,
    datetime_text: &str,
    locations: &[ExamLocation],
) -> NotiflowResult<TimedEventRecord> {
    let (date, start) = parse_exam_datetime(datetime_text)?;
    let location = exam_location(locations);

    Ok(TimedEventRecord {
        course: Some(course.to_string()),
        event_type: Some(EventCategory::FinalExam.label().to_string()),
        date: Some(format_date(date)),
        begin_date_time: Some(format_time(start)),
        end_date_time: Some(format_time(exam_end_time(start))),
        location: (!location.is_empty()).then_some(location),
        ..Default::default()
    })
}

/// One course's entry as scraped from the exam schedule page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalExamListing {
    pub course: String,
    /// Raw date-time line, e.g. `Thu Dec 11 2025 | 12:00 pm`.
    pub datetime: String,
    #[serde(default)]
    pub locations: Vec<ExamLocation>,
}

/// Scraped listings for all of a student's courses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinalExamSchedule(pub Vec<FinalExamListing>);

impl RecordSource for FinalExamSchedule {
    fn fetch(&self) -> NotiflowResult<SourceBatch> {
        let mut batch = SourceBatch::default();
        for listing in &self.0 {
            match final_exam_record(&listing.course, &listing.datetime, &listing.locations) {
                Ok(record) => batch.push(record),
                Err(e) => {
                    tracing::warn!(course = %listing.course, error = %e, "no usable final exam time");
                    batch.skip(listing, e)?;
                }
            }
        }
        Ok(batch)
    }
}
