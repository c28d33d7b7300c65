//! Adapters from collaborator payloads to raw records.
//!
//! Fetching (LMS calls, pagination, page scraping) happens elsewhere; these
//! modules only reshape what was fetched.

pub mod announcements;
pub mod assignments;
pub mod final_exam;
