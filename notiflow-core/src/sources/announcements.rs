//! Midterm dates from course announcements.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::course::short_course_name;
use crate::error::{NotiflowError, NotiflowResult};
use crate::event::EventCategory;
use crate::extractor::DateExtractor;
use crate::records::TimedEventRecord;
use crate::sync::{RecordSource, SourceBatch};
use crate::time::{format_date, parse_iso_instant};

static MIDTERM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bmidterm\b").expect("MIDTERM_REGEX should compile"));

static GRADE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)grades?|marks?|results?|scores?|passed?|failed?|review?")
        .expect("GRADE_REGEX should compile")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    /// ISO 8601 instant, e.g. `2025-10-01T16:30:00Z`.
    #[serde(default)]
    pub posted_at: String,
    #[serde(default)]
    pub message: String,
}

/// Announcements keyed by full course name, oldest first.
pub type AnnouncementsByCourse = BTreeMap<String, Vec<Announcement>>;

pub fn mentions_midterm(text: &str) -> bool {
    MIDTERM_REGEX.is_match(text)
}

/// Whether the text talks about grades or results rather than scheduling.
pub fn is_grade_related(text: &str) -> bool {
    GRADE_REGEX.is_match(text)
}

/// Sentences of `text` that mention a midterm, trimmed.
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace.
pub fn midterm_sentences(text: &str) -> Vec<String> {
    split_sentences(text)
        .into_iter()
        .map(str::trim)
        .filter(|s| mentions_midterm(s))
        .map(str::to_string)
        .collect()
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let Some(&(next, n)) = chars.peek() else {
            break;
        };
        if !n.is_whitespace() {
            continue;
        }
        sentences.push(&text[start..i + c.len_utf8()]);
        start = next;
        while let Some(&(j, w)) = chars.peek() {
            if !w.is_whitespace() {
                break;
            }
            chars.next();
            start = j + w.len_utf8();
        }
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Build a one-hour midterm record from an extracted ISO date or date-time.
///
/// A date alone means midnight. Midnight is written as `12:00:00` to
/// `1:00:00` rather than `00:00:00` to `01:00:00`: calendars that received
/// the earlier output already carry UIDs built from those strings.
/// The end hour wraps with `(hour + 1) % 24` on the same date, so a 23:xx
/// start ends at 00:xx that morning.
pub fn midterm_record(course: &str, extracted: &str) -> NotiflowResult<TimedEventRecord> {
    let when = parse_extracted(extracted)?;
    let (hour, minute) = (when.hour(), when.minute());

    let (begin, end) = if hour == 0 && minute == 0 {
        ("12:00:00".to_string(), "1:00:00".to_string())
    } else {
        (
            format!("{:02}:{:02}:00", hour, minute),
            format!("{:02}:{:02}:00", (hour + 1) % 24, minute),
        )
    };

    Ok(TimedEventRecord {
        course: Some(short_course_name(course)),
        event_type: Some(EventCategory::Midterm.label().to_string()),
        date: Some(format_date(when.date())),
        begin_date_time: Some(begin),
        end_date_time: Some(end),
        ..Default::default()
    })
}

fn parse_extracted(value: &str) -> NotiflowResult<NaiveDateTime> {
    let value = value.trim();
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
        .ok_or_else(|| NotiflowError::Parse(format!("invalid extracted date '{}'", value)))
}

/// Find the first midterm date announced in each course.
///
/// Announcements are read in order; ones that mention a midterm but are about
/// grades are passed over. The post time, in `tz`, is given to the extractor
/// as context. Announcements with a bad post time, and extracted dates that
/// don't parse, end up in the batch's skipped list. Extractor failures abort
/// the whole call.
pub fn extract_midterms(
    by_course: &AnnouncementsByCourse,
    extractor: &dyn DateExtractor,
    tz: Tz,
) -> NotiflowResult<SourceBatch> {
    let mut batch = SourceBatch::default();

    for (course, announcements) in by_course {
        for announcement in announcements {
            if mentions_midterm(&announcement.message) && is_grade_related(&announcement.message) {
                continue;
            }

            let posted_at = match parse_iso_instant(&announcement.posted_at, tz) {
                Ok(Some(posted_at)) => posted_at,
                Ok(None) => Utc::now().with_timezone(&tz),
                Err(e) => {
                    tracing::debug!(course = %course, error = %e, "skipping announcement with bad post time");
                    batch.skip(&skipped_announcement(course, announcement, None), e)?;
                    continue;
                }
            };

            let Some(extracted) = extractor.extract_date(&announcement.message, &posted_at)? else {
                continue;
            };
            if extracted.trim().is_empty() {
                continue;
            }

            match midterm_record(course, &extracted) {
                Ok(record) => batch.push(record),
                Err(e) => {
                    tracing::info!(course = %course, error = %e, "ignoring extracted midterm date");
                    batch.skip(&skipped_announcement(course, announcement, Some(&extracted)), e)?;
                }
            }
            break;
        }
    }

    Ok(batch)
}

fn skipped_announcement(course: &str, announcement: &Announcement, extracted: Option<&str>) -> serde_json::Value {
    let mut item = serde_json::json!({
        "course": course,
        "posted_at": announcement.posted_at,
        "message": announcement.message,
    });
    if let Some(extracted) = extracted {
        item["extracted"] = serde_json::Value::from(extracted);
    }
    item
}

/// Announcements plus the extractor, as a record source for a sync run.
pub struct AnnouncementSource<'a> {
    pub by_course: &'a AnnouncementsByCourse,
    pub extractor: &'a dyn DateExtractor,
    pub tz: Tz,
}

impl RecordSource for AnnouncementSource<'_> {
    fn fetch(&self) -> NotiflowResult<SourceBatch> {
        extract_midterms(self.by_course, self.extractor, self.tz)
    }
}
