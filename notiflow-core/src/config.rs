//! NotiFlow configuration.
//!
//! Read from `~/.config/notiflow/config.toml` (created with every option
//! commented out on first use) and overridden by `NOTIFLOW_*` environment
//! variables, e.g. `NOTIFLOW_TIMEZONE` or `NOTIFLOW_SERVER__PORT`.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{NotiflowError, NotiflowResult};
use crate::store::CalendarMetadata;
use crate::time::parse_timezone;

static DEFAULT_CALENDAR_PATH: &str = "~/.notiflow/calendar.ics";
static DEFAULT_TIMEZONE: &str = "America/Vancouver";
static DEFAULT_TERM_END_DATE: &str = "2025/12/07";
static DEFAULT_CALENDAR_NAME: &str = "NotiFlow Winter Term 1";
static DEFAULT_PRODUCT_ID: &str = "-//NotiFlow//Finals Scheduler//EN";

fn default_calendar_path() -> PathBuf {
    PathBuf::from(DEFAULT_CALENDAR_PATH)
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_term_end_date() -> String {
    DEFAULT_TERM_END_DATE.to_string()
}

fn default_calendar_name() -> String {
    DEFAULT_CALENDAR_NAME.to_string()
}

fn default_product_id() -> String {
    DEFAULT_PRODUCT_ID.to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotiflowConfig {
    /// Where the synthesized calendar is persisted.
    #[serde(default = "default_calendar_path")]
    pub calendar_path: PathBuf,

    /// IANA zone of the institution; all local times are read in it.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Last day of term (`YYYY/MM/DD`); class meeting series end on it.
    #[serde(default = "default_term_end_date")]
    pub term_end_date: String,

    #[serde(default = "default_calendar_name")]
    pub calendar_name: String,

    #[serde(default = "default_product_id")]
    pub product_id: String,

    #[serde(default)]
    pub extractor: ExtractorConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Settings for the hosted text model used to pull dates out of announcements.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExtractorConfig {
    #[serde(default = "ExtractorConfig::default_model")]
    pub model: String,

    #[serde(default = "ExtractorConfig::default_endpoint")]
    pub endpoint: String,

    /// Falls back to `OPENAI_API_KEY` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "ExtractorConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ExtractorConfig {
    fn default_model() -> String {
        "gpt-4o-mini".to_string()
    }

    fn default_endpoint() -> String {
        "https://api.openai.com/v1/responses".to_string()
    }

    fn default_timeout_secs() -> u64 {
        30
    }

    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.is_empty())
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            model: Self::default_model(),
            endpoint: Self::default_endpoint(),
            api_key: None,
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
}

impl ServerConfig {
    fn default_port() -> u16 {
        8080
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: Self::default_port(),
        }
    }
}

impl Default for NotiflowConfig {
    fn default() -> Self {
        NotiflowConfig {
            calendar_path: default_calendar_path(),
            timezone: default_timezone(),
            term_end_date: default_term_end_date(),
            calendar_name: default_calendar_name(),
            product_id: default_product_id(),
            extractor: ExtractorConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl NotiflowConfig {
    pub fn config_path() -> NotiflowResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| NotiflowError::Config("Could not determine config directory".into()))?
            .join("notiflow");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the user's config, creating a commented-out default file first if needed.
    pub fn load() -> NotiflowResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    /// Load from an explicit file (which may be missing) plus the environment.
    pub fn load_from(path: &Path) -> NotiflowResult<Self> {
        let config: NotiflowConfig = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix("NOTIFLOW").separator("__"))
            .build()
            .map_err(|e| NotiflowError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| NotiflowError::Config(e.to_string()))?;

        config.tz()?;
        Ok(config)
    }

    /// The calendar path with `~` expanded.
    pub fn calendar_path(&self) -> PathBuf {
        let full_path_str =
            shellexpand::tilde(&self.calendar_path.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    pub fn tz(&self) -> NotiflowResult<Tz> {
        parse_timezone(&self.timezone)
    }

    pub fn metadata(&self) -> CalendarMetadata {
        CalendarMetadata {
            product_id: self.product_id.clone(),
            name: self.calendar_name.clone(),
        }
    }

    /// The effective configuration, as it would be written to the config file.
    pub fn to_toml_string(&self) -> NotiflowResult<String> {
        toml::to_string_pretty(self).map_err(|e| NotiflowError::Serialization(e.to_string()))
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> NotiflowResult<()> {
        let contents = format!(
            "\
# NotiFlow configuration

# Where the generated calendar is stored:
# calendar_path = \"{}\"

# Time zone every class, exam and deadline is read in:
# timezone = \"{}\"

# Last day of term; weekly class meetings stop repeating here:
# term_end_date = \"{}\"

# calendar_name = \"{}\"

# [extractor]
# model = \"gpt-4o-mini\"
# api_key = \"...\"   (defaults to $OPENAI_API_KEY)

# [server]
# port = 8080
",
            DEFAULT_CALENDAR_PATH, DEFAULT_TIMEZONE, DEFAULT_TERM_END_DATE, DEFAULT_CALENDAR_NAME
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                NotiflowError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| NotiflowError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
