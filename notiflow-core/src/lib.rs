//! Calendar synthesis and deduplication engine for NotiFlow.
//!
//! Turns event-like records from an LMS, the exam schedule and the browser
//! extension into a single persistent iCalendar document:
//! - `records` / `normalize`: collaborator record shapes and their conversion to `Event` / `Task`
//! - `store`: the calendar document with idempotent add and atomic persist
//! - `sync`: one load, normalize, add, persist run
//! - `sources` / `extractor`: adapters for announcements, assignments and final exams

pub mod config;
pub mod course;
pub mod error;
pub mod event;
pub mod extractor;
pub mod ics;
pub mod identity;
pub mod logging;
pub mod normalize;
pub mod records;
pub mod recurrence;
pub mod sources;
pub mod store;
pub mod sync;
pub mod time;

pub use config::NotiflowConfig;
pub use error::{NotiflowError, NotiflowResult};
pub use event::{Component, Event, EventCategory, Task};
pub use normalize::{NormalizeContext, normalize};
pub use records::{CourseMeetingRecord, RawRecord, TaskRecord, TimedEventRecord};
pub use store::{CalendarDocument, CalendarMetadata};
pub use sync::{RecordSource, SourceBatch, SyncOutcome, SyncReport, SyncRun};
