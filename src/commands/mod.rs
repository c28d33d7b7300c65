pub mod config;
pub mod list;
pub mod occurrences;
pub mod sync;
