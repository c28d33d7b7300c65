//! ICS file generation and parsing.
//!
//! This module reads and writes whole calendar documents according to RFC 5545.

mod generate;
mod parse;

pub use generate::generate_ics;
pub use parse::{ParsedComponent, RawComponent, parse_components, parse_document};

/// Course the component belongs to; lets components rehydrate losslessly.
pub(crate) const PROP_COURSE: &str = "X-NOTIFLOW-COURSE";
/// Event category label.
pub(crate) const PROP_CATEGORY: &str = "X-NOTIFLOW-CATEGORY";
/// Assignment title of a task.
pub(crate) const PROP_TITLE: &str = "X-NOTIFLOW-TITLE";

pub(crate) const ICS_UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";
pub(crate) const ICS_LOCAL_FORMAT: &str = "%Y%m%dT%H%M%S";
