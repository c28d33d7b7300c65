mod commands;
mod render;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use notiflow_core::NotiflowConfig;
use notiflow_core::logging::{LogFormat, init_tracing};

#[derive(Parser)]
#[command(name = "notiflow")]
#[command(about = "Build your course calendar from LMS, exam schedule and class meeting records")]
struct Cli {
    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add records from a JSON file to the calendar
    Sync {
        #[command(subcommand)]
        source: SyncSource,
    },
    /// List everything in the calendar
    List {
        /// Show each entry's UID
        #[arg(long)]
        uids: bool,
    },
    /// Show upcoming start times of a calendar entry
    Occurrences {
        /// UID of the entry (see `notiflow list --uids`)
        uid: String,

        /// How many occurrences to show
        #[arg(short, long, default_value_t = 10)]
        limit: u16,
    },
    /// Show config and calendar paths
    Config,
}

#[derive(Subcommand)]
enum SyncSource {
    /// Timed events: `{course, event_type, date, begin_date_time, end_date_time, location?}` or a list of them
    Events { file: PathBuf },
    /// One weekly class meeting: `{className, startTime, endTime, days}`
    Meeting { file: PathBuf },
    /// Assignments grouped by course
    Assignments { file: PathBuf },
    /// Announcements grouped by course; midterm dates are extracted from them
    Announcements { file: PathBuf },
    /// Scraped final exam listings: `[{course, datetime, locations}]`
    Finals { file: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    init_tracing(level, LogFormat::Compact)?;

    let config = NotiflowConfig::load()?;

    match cli.command {
        Commands::Sync { source } => match source {
            SyncSource::Events { file } => commands::sync::events(&config, &file),
            SyncSource::Meeting { file } => commands::sync::meeting(&config, &file),
            SyncSource::Assignments { file } => commands::sync::assignments(&config, &file),
            SyncSource::Announcements { file } => commands::sync::announcements(&config, &file),
            SyncSource::Finals { file } => commands::sync::finals(&config, &file),
        },
        Commands::List { uids } => commands::list::run(&config, uids),
        Commands::Occurrences { uid, limit } => commands::occurrences::run(&config, &uid, limit),
        Commands::Config => commands::config::run(&config),
    }
}
