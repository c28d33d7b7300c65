use anyhow::Result;
use chrono::NaiveDate;
use notiflow_core::{CalendarDocument, Component, NotiflowConfig};
use owo_colors::OwoColorize;

use crate::render::Render;

pub fn run(config: &NotiflowConfig, show_uids: bool) -> Result<()> {
    let tz = config.tz()?;
    let document = CalendarDocument::load(&config.calendar_path(), config.metadata(), tz);

    if document.is_empty() {
        println!("{}", "Calendar is empty".dimmed());
        return Ok(());
    }

    let mut components: Vec<&Component> = document.components().iter().collect();
    components.sort_by_key(|c| c.start());

    let mut current_date: Option<NaiveDate> = None;

    for component in components {
        let date = component.start().date_naive();

        if current_date != Some(date) {
            if current_date.is_some() {
                println!();
            }
            println!("{}", date.format("%a %b %-d %Y").bold());
            current_date = Some(date);
        }

        println!("  {}", component.render());
        if show_uids {
            println!("  {:>11}  {}", "", component.uid().dimmed());
        }
    }

    Ok(())
}
