use anyhow::{Result, bail};
use notiflow_core::{CalendarDocument, NotiflowConfig};
use owo_colors::OwoColorize;

pub fn run(config: &NotiflowConfig, uid: &str, limit: u16) -> Result<()> {
    let tz = config.tz()?;
    let document = CalendarDocument::load(&config.calendar_path(), config.metadata(), tz);

    let Some(component) = document.components().iter().find(|c| c.uid() == uid) else {
        bail!("No calendar entry with UID '{}'", uid);
    };

    println!("{}", component.summary().bold());

    for start in component.occurrences(limit)? {
        println!("  {}", start.format("%a %b %-d %Y %H:%M %Z"));
    }

    Ok(())
}
