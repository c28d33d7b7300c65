//! One fetch, normalize, store, persist pass.
//!
//! A [`SyncRun`] owns everything a single invocation accumulates: the loaded
//! document, the normalization context and the report. Nothing outlives it,
//! so back-to-back runs can't leak state into each other.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::NotiflowConfig;
use crate::error::NotiflowResult;
use crate::event::Component;
use crate::normalize::{NormalizeContext, normalize};
use crate::records::RawRecord;
use crate::store::CalendarDocument;

/// Something that yields raw records, e.g. a collaborator adapter.
///
/// A failure here is an upstream failure: it aborts the run before anything
/// is written. Collaborator items that can't be turned into records go into
/// the batch's `skipped` list instead.
pub trait RecordSource {
    fn fetch(&self) -> NotiflowResult<SourceBatch>;
}

impl RecordSource for Vec<RawRecord> {
    fn fetch(&self) -> NotiflowResult<SourceBatch> {
        Ok(SourceBatch::from(self.clone()))
    }
}

/// What a source hands to a run: usable records plus the items it had to
/// leave out.
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    pub records: Vec<RawRecord>,
    pub skipped: Vec<SkippedRecord>,
}

impl SourceBatch {
    pub fn push(&mut self, record: impl Into<RawRecord>) {
        self.records.push(record.into());
    }

    /// Leave `item` out, keeping it and the reason for the report.
    pub fn skip(&mut self, item: &impl Serialize, reason: impl ToString) -> NotiflowResult<()> {
        self.skipped.push(SkippedRecord {
            record: serde_json::to_value(item)?,
            reason: reason.to_string(),
        });
        Ok(())
    }
}

impl From<Vec<RawRecord>> for SourceBatch {
    fn from(records: Vec<RawRecord>) -> Self {
        SourceBatch {
            records,
            skipped: Vec::new(),
        }
    }
}

/// A record that could not be normalized, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRecord {
    pub record: serde_json::Value,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// UIDs inserted by this run.
    pub added: Vec<String>,
    /// UIDs already present in the calendar.
    pub duplicates: Vec<String>,
    pub skipped: Vec<SkippedRecord>,
}

/// What a run hands back to its caller.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    /// Every component normalized this run, including duplicates.
    pub components: Vec<Component>,
    pub report: SyncReport,
}

pub struct SyncRun {
    path: PathBuf,
    document: CalendarDocument,
    context: NormalizeContext,
    components: Vec<Component>,
    report: SyncReport,
}

impl SyncRun {
    pub fn new(path: PathBuf, document: CalendarDocument, context: NormalizeContext) -> Self {
        SyncRun {
            path,
            document,
            context,
            components: Vec::new(),
            report: SyncReport::default(),
        }
    }

    /// Load the configured calendar and start a run against it.
    pub fn open(config: &NotiflowConfig) -> NotiflowResult<Self> {
        let context = NormalizeContext::from_config(config)?;
        Ok(Self::open_with(config, context))
    }

    /// Like [`SyncRun::open`] with an explicit normalization context.
    pub fn open_with(config: &NotiflowConfig, context: NormalizeContext) -> Self {
        let path = config.calendar_path();
        let document = CalendarDocument::load(&path, config.metadata(), context.tz);
        Self::new(path, document, context)
    }

    /// Normalize one record and add it to the document.
    ///
    /// Record-scoped failures are collected as skips; anything else is
    /// returned.
    pub fn ingest(&mut self, raw: &RawRecord) -> NotiflowResult<()> {
        let component = match normalize(raw, &self.context) {
            Ok(component) => component,
            Err(e) if e.is_record_scoped() => {
                tracing::info!(reason = %e, "skipping record");
                self.report.skipped.push(SkippedRecord {
                    record: serde_json::to_value(raw)?,
                    reason: e.to_string(),
                });
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let uid = component.uid().to_string();
        if self.document.add(component.clone()) {
            tracing::debug!(uid = %uid, "added");
            self.report.added.push(uid);
        } else {
            tracing::debug!(uid = %uid, "already in calendar");
            self.report.duplicates.push(uid);
        }
        self.components.push(component);
        Ok(())
    }

    /// Report an item the source could not turn into a record.
    pub fn skip(&mut self, skipped: SkippedRecord) {
        tracing::info!(reason = %skipped.reason, "skipping source item");
        self.report.skipped.push(skipped);
    }

    pub fn ingest_all<'a>(&mut self, records: impl IntoIterator<Item = &'a RawRecord>) -> NotiflowResult<()> {
        for raw in records {
            self.ingest(raw)?;
        }
        Ok(())
    }

    pub fn document(&self) -> &CalendarDocument {
        &self.document
    }

    pub fn report(&self) -> &SyncReport {
        &self.report
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the document and hand back what the run did.
    pub fn finish(self) -> NotiflowResult<SyncOutcome> {
        self.document.persist(&self.path)?;

        tracing::info!(
            added = self.report.added.len(),
            duplicates = self.report.duplicates.len(),
            skipped = self.report.skipped.len(),
            "sync finished"
        );

        Ok(SyncOutcome {
            components: self.components,
            report: self.report,
        })
    }
}

/// Run the whole pipeline once for `source` against the configured calendar.
pub fn sync_source(config: &NotiflowConfig, source: &dyn RecordSource) -> NotiflowResult<SyncOutcome> {
    let context = NormalizeContext::from_config(config)?;
    sync_source_with(config, context, source)
}

pub fn sync_source_with(
    config: &NotiflowConfig,
    context: NormalizeContext,
    source: &dyn RecordSource,
) -> NotiflowResult<SyncOutcome> {
    let batch = source.fetch()?;
    let mut run = SyncRun::open_with(config, context);
    for skipped in batch.skipped {
        run.skip(skipped);
    }
    run.ingest_all(&batch.records)?;
    run.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotiflowError;
    use crate::records::{CourseMeetingRecord, TaskRecord, TimedEventRecord};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    struct FailingSource;

    impl RecordSource for FailingSource {
        fn fetch(&self) -> NotiflowResult<SourceBatch> {
            Err(NotiflowError::Upstream("LMS returned 503".into()))
        }
    }

    fn config(dir: &Path) -> NotiflowConfig {
        NotiflowConfig {
            calendar_path: dir.join("calendar.ics"),
            ..Default::default()
        }
    }

    fn ctx() -> NormalizeContext {
        NormalizeContext::new(
            chrono_tz::America::Vancouver,
            NaiveDate::from_ymd_opt(2025, 12, 7).unwrap(),
        )
        .with_anchor_date(NaiveDate::from_ymd_opt(2025, 9, 2).unwrap())
    }

    fn records() -> Vec<RawRecord> {
        vec![
            TimedEventRecord {
                course: Some("CPEN 311".into()),
                event_type: Some("Midterm".into()),
                date: Some("2025/10/23".into()),
                begin_date_time: Some("15:00:00".into()),
                end_date_time: Some("16:00:00".into()),
                ..Default::default()
            }
            .into(),
            TimedEventRecord {
                course: Some("CPEN 311".into()),
                ..Default::default()
            }
            .into(),
            CourseMeetingRecord {
                class_name: Some("CPEN 311".into()),
                start_time: Some("10:00 AM".into()),
                end_time: Some("11:00 AM".into()),
                days: BTreeMap::from([("M".to_string(), true)]),
            }
            .into(),
            TaskRecord {
                course: "CPEN311".into(),
                title: "Lab 1".into(),
                due_at: "2025-10-01T06:59:00Z".into(),
            }
            .into(),
        ]
    }

    #[test]
    fn test_sync_collects_added_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let outcome = sync_source_with(&config, ctx(), &records()).unwrap();

        assert_eq!(outcome.report.added.len(), 3);
        assert!(outcome.report.duplicates.is_empty());
        assert_eq!(outcome.report.skipped.len(), 1);
        assert!(outcome.report.skipped[0].reason.contains("event_type"));
        assert_eq!(outcome.report.skipped[0].record["course"], "CPEN 311");
        assert_eq!(outcome.components.len(), 3);
        assert!(config.calendar_path().exists());
    }

    #[test]
    fn test_second_run_only_reports_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        sync_source_with(&config, ctx(), &records()).unwrap();
        let outcome = sync_source_with(&config, ctx(), &records()).unwrap();

        assert!(outcome.report.added.is_empty());
        assert_eq!(outcome.report.duplicates.len(), 3);

        let run = SyncRun::open_with(&config, ctx());
        assert_eq!(run.document().len(), 3);
    }

    #[test]
    fn test_upstream_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let result = sync_source_with(&config, ctx(), &FailingSource);

        assert!(matches!(result, Err(NotiflowError::Upstream(_))));
        assert!(!config.calendar_path().exists());
    }

    struct PartialSource;

    impl RecordSource for PartialSource {
        fn fetch(&self) -> NotiflowResult<SourceBatch> {
            let mut batch = SourceBatch::from(vec![records().remove(0)]);
            batch.skip(&serde_json::json!({"course": "CPEN 281", "datetime": "TBA"}), "no exam time yet")?;
            Ok(batch)
        }
    }

    #[test]
    fn test_source_skips_reach_the_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let outcome = sync_source_with(&config, ctx(), &PartialSource).unwrap();

        assert_eq!(outcome.report.added.len(), 1);
        assert_eq!(outcome.report.skipped.len(), 1);
        assert_eq!(outcome.report.skipped[0].record["datetime"], "TBA");
        assert_eq!(outcome.report.skipped[0].reason, "no exam time yet");
    }

    #[test]
    fn test_same_record_twice_in_one_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let record = records().remove(0);

        let mut run = SyncRun::open_with(&config, ctx());
        run.ingest_all([&record, &record]).unwrap();

        assert_eq!(run.report().added.len(), 1);
        assert_eq!(run.report().duplicates.len(), 1);
        assert_eq!(run.document().len(), 1);
    }
}
