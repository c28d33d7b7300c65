//! Assignments grouped by simplified course name.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::course::simplify;
use crate::error::{NotiflowError, NotiflowResult};
use crate::records::{RawRecord, TaskRecord};
use crate::sync::{RecordSource, SourceBatch};

/// `[title, "YYYY/MM/DD", "HH:MM:SS", raw due_at]`, the array shape the LMS
/// fetcher produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord(pub String, pub String, pub String, pub String);

impl AssignmentRecord {
    /// Split an LMS `due_at` (`2025-11-29T23:59:00Z`) into the record's date
    /// and time columns. The raw value is kept as the fourth element.
    pub fn from_due_at(title: &str, due_at: &str) -> NotiflowResult<Self> {
        let (date, time) = due_at
            .trim_end_matches('Z')
            .split_once('T')
            .ok_or_else(|| NotiflowError::Parse(format!("invalid due_at '{}'", due_at)))?;

        Ok(AssignmentRecord(
            title.to_string(),
            date.replace('-', "/"),
            time.to_string(),
            due_at.to_string(),
        ))
    }

    pub fn title(&self) -> &str {
        &self.0
    }

    pub fn date(&self) -> &str {
        &self.1
    }

    pub fn time(&self) -> &str {
        &self.2
    }

    pub fn due_at(&self) -> &str {
        &self.3
    }
}

fn parse_utc(value: &str) -> NotiflowResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| NotiflowError::Parse(format!("invalid instant '{}': {}", value, e)))
}

/// Whether `due_at` is strictly after `now`.
pub fn is_due_in_future(due_at: &str, now: DateTime<Utc>) -> NotiflowResult<bool> {
    Ok(parse_utc(due_at)? > now)
}

/// An LMS term window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Term {
    #[serde(default)]
    pub start_at: Option<String>,
    #[serde(default)]
    pub end_at: Option<String>,
}

impl Term {
    /// Whether `now` falls inside the term, bounds included. A term missing
    /// either bound never matches.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let (Some(start), Some(end)) = (self.start_at.as_deref(), self.end_at.as_deref()) else {
            return false;
        };
        match (parse_utc(start), parse_utc(end)) {
            (Ok(start), Ok(end)) => start <= now && now <= end,
            _ => false,
        }
    }
}

/// One LMS course and its upcoming assignments.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseListing {
    pub name: String,
    pub id: u64,
    pub assignments: Vec<AssignmentRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseEntry {
    pub ids: Vec<u64>,
    pub classes: Vec<String>,
    /// One list per id, same order as `ids`.
    pub assignments: Vec<Vec<AssignmentRecord>>,
}

/// Simplified course name -> every LMS course that shares it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseMap(BTreeMap<String, CourseEntry>);

impl CourseMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_listings(listings: impl IntoIterator<Item = CourseListing>) -> Self {
        let mut map = Self::new();
        for listing in listings {
            map.insert(listing);
        }
        map
    }

    /// Add a course. Names that don't simplify and ids already present are
    /// ignored; returns whether the listing was taken.
    pub fn insert(&mut self, listing: CourseListing) -> bool {
        let Some(key) = simplify(&listing.name) else {
            tracing::debug!(name = %listing.name, "course name does not simplify, skipping");
            return false;
        };

        let entry = self.0.entry(key).or_default();
        if entry.ids.contains(&listing.id) {
            return false;
        }

        entry.ids.push(listing.id);
        entry.classes.push(listing.name);
        entry.assignments.push(listing.assignments);
        true
    }

    pub fn get(&self, key: &str) -> Option<&CourseEntry> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CourseEntry)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// One task record per assignment, keyed by the simplified course name.
    pub fn task_records(&self) -> Vec<TaskRecord> {
        self.iter()
            .flat_map(|(course, entry)| {
                entry.assignments.iter().flatten().map(move |a| TaskRecord {
                    course: course.clone(),
                    title: a.title().to_string(),
                    due_at: a.due_at().to_string(),
                })
            })
            .collect()
    }
}

impl RecordSource for CourseMap {
    fn fetch(&self) -> NotiflowResult<SourceBatch> {
        Ok(SourceBatch::from(
            self.task_records().into_iter().map(RawRecord::from).collect::<Vec<_>>(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 15, 12, 0, 0).unwrap()
    }

    fn listing(name: &str, id: u64, titles: &[&str]) -> CourseListing {
        CourseListing {
            name: name.to_string(),
            id,
            assignments: titles
                .iter()
                .map(|t| AssignmentRecord::from_due_at(t, "2025-11-29T23:59:00Z").unwrap())
                .collect(),
        }
    }

    #[test]
    fn test_from_due_at_splits_columns() {
        let record = AssignmentRecord::from_due_at("Lab 3", "2025-11-29T23:59:00Z").unwrap();
        assert_eq!(record.title(), "Lab 3");
        assert_eq!(record.date(), "2025/11/29");
        assert_eq!(record.time(), "23:59:00");
        assert_eq!(record.due_at(), "2025-11-29T23:59:00Z");

        assert!(AssignmentRecord::from_due_at("Lab 3", "2025-11-29").is_err());
    }

    #[test]
    fn test_assignment_record_is_a_json_array() {
        let record = AssignmentRecord::from_due_at("HW1", "2025-10-20T07:00:00Z").unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"["HW1","2025/10/20","07:00:00","2025-10-20T07:00:00Z"]"#);
    }

    #[test]
    fn test_is_due_in_future() {
        assert!(is_due_in_future("2025-11-29T23:59:00Z", now()).unwrap());
        assert!(!is_due_in_future("2025-10-15T12:00:00Z", now()).unwrap());
        assert!(is_due_in_future("not a date", now()).is_err());
    }

    #[test]
    fn test_term_contains() {
        let term = Term {
            start_at: Some("2025-09-01T07:00:00Z".into()),
            end_at: Some("2025-12-20T08:00:00Z".into()),
        };
        assert!(term.contains(now()));
        assert!(term.contains(Utc.with_ymd_and_hms(2025, 9, 1, 7, 0, 0).unwrap()));
        assert!(!term.contains(Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap()));

        let open_ended = Term {
            start_at: Some("2025-09-01T07:00:00Z".into()),
            end_at: None,
        };
        assert!(!open_ended.contains(now()));
    }

    #[test]
    fn test_course_map_groups_sections() {
        let map = CourseMap::from_listings([
            listing("CPEN_V 221 101", 1, &["Lab 1"]),
            listing("CPEN_V 221 L1A", 2, &["Prelab 1", "Prelab 2"]),
            listing("CPEN_V 221 101", 1, &["Lab 1"]),
            listing("CS 110", 3, &["Quiz"]),
        ]);

        assert_eq!(map.len(), 1);
        let entry = map.get("CPEN_V 221").unwrap();
        assert_eq!(entry.ids, vec![1, 2]);
        assert_eq!(entry.classes, vec!["CPEN_V 221 101", "CPEN_V 221 L1A"]);
        assert_eq!(entry.assignments.len(), 2);
    }

    #[test]
    fn test_task_records_from_grouped_json() {
        let json = r#"{
            "CPEN_V 221": {
                "ids": [1],
                "classes": ["CPEN_V 221 101"],
                "assignments": [[["Lab 1", "2025/10/20", "07:00:00", "2025-10-20T07:00:00Z"]]]
            }
        }"#;
        let map: CourseMap = serde_json::from_str(json).unwrap();

        let tasks = map.task_records();
        assert_eq!(
            tasks,
            vec![TaskRecord {
                course: "CPEN_V 221".into(),
                title: "Lab 1".into(),
                due_at: "2025-10-20T07:00:00Z".into(),
            }]
        );
        assert_eq!(map.fetch().unwrap().records.len(), 1);
    }
}
