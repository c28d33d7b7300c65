use anyhow::Result;
use notiflow_core::NotiflowConfig;
use owo_colors::OwoColorize;

pub fn run(config: &NotiflowConfig) -> Result<()> {
    let config_path = NotiflowConfig::config_path()?;

    println!("{}", "Paths".bold());
    println!("  Config:    {}", config_path.display());
    println!("  Calendar:  {}", config.calendar_path().display());
    println!();

    let api_key = if config.extractor.resolved_api_key().is_some() {
        "set".green().to_string()
    } else {
        "not set (announcement sync is unavailable)".yellow().to_string()
    };
    println!("{}", "Extractor".bold());
    println!("  API key:   {}", api_key);
    println!();

    // Never echo the key itself
    let mut effective = config.clone();
    effective.extractor.api_key = None;

    println!("{}", "Effective config".bold());
    for line in effective.to_toml_string()?.lines() {
        println!("  {}", line.dimmed());
    }

    Ok(())
}
