//! Terminal rendering for NotiFlow types.
//!
//! Extension traits that add colored output to notiflow-core types using
//! owo_colors.

use std::collections::HashSet;

use notiflow_core::{Component, SyncOutcome};
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for Component {
    fn render(&self) -> String {
        match self {
            Component::Event(event) => {
                let time = format!(
                    "{}-{}",
                    event.start.format("%H:%M"),
                    event.end.format("%H:%M")
                );
                let mut line = format!("{:>11}  {}", time, event.summary);
                if event.recurrence.is_some() {
                    line.push_str(&format!(" {}", "(weekly)".cyan()));
                }
                line
            }
            Component::Task(task) => {
                format!("{:>11}  {} {}", format!("due {}", task.due.format("%H:%M")), task.summary, "[task]".dimmed())
            }
        }
    }
}

impl Render for SyncOutcome {
    fn render(&self) -> String {
        let added: HashSet<&str> = self.report.added.iter().map(String::as_str).collect();
        let mut lines = Vec::new();
        let mut shown = HashSet::new();

        for component in &self.components {
            let uid = component.uid();
            // The same record can arrive twice in one run
            if !shown.insert(uid) {
                continue;
            }
            if added.contains(uid) {
                lines.push(format!("   {} {}", "+".green(), component.summary().green()));
            } else {
                let label = format!("{} (already in calendar)", component.summary());
                lines.push(format!("   {} {}", "=".dimmed(), label.dimmed()));
            }
        }

        for skipped in &self.report.skipped {
            lines.push(format!("   {} {}", "!".red(), skipped.reason.red()));
            lines.push(format!("      {}", skipped.record.to_string().dimmed()));
        }

        if lines.is_empty() {
            return "   No records".dimmed().to_string();
        }

        lines.push(String::new());
        lines.push(format!(
            "   {} added, {} already present, {} skipped",
            self.report.added.len(),
            self.report.duplicates.len(),
            self.report.skipped.len()
        ));

        lines.join("\n")
    }
}
