use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use notiflow_core::NotiflowConfig;
use notiflow_core::error::NotiflowResult;
use notiflow_core::extractor::{DateExtractor, OpenAiExtractor};
use notiflow_core::normalize::NormalizeContext;

use crate::routes::AppError;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    config: Arc<NotiflowConfig>,
    /// Replaces the configured extractor (tests).
    extractor: Option<Arc<dyn DateExtractor>>,
    /// Held for the whole of a run; there is one calendar file.
    run_lock: Arc<Mutex<()>>,
    anchor_date: Option<NaiveDate>,
}

impl AppState {
    pub fn new(config: NotiflowConfig) -> Result<Self> {
        // Fail at startup rather than on the first request
        config.tz()?;
        NormalizeContext::from_config(&config)?;

        if config.extractor.resolved_api_key().is_none() {
            tracing::warn!("no extractor API key, announcement runs will fail");
        }

        Ok(AppState {
            config: Arc::new(config),
            extractor: None,
            run_lock: Arc::new(Mutex::new(())),
            anchor_date: None,
        })
    }

    #[cfg(test)]
    pub fn with_extractor(mut self, extractor: Arc<dyn DateExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Start new class meeting series on a fixed date instead of today.
    #[cfg(test)]
    pub fn with_anchor_date(mut self, anchor_date: NaiveDate) -> Self {
        self.anchor_date = Some(anchor_date);
        self
    }

    pub fn config(&self) -> &NotiflowConfig {
        &self.config
    }

    /// The extractor for one announcement run.
    ///
    /// The configured one wraps a blocking HTTP client, so it is built inside
    /// the run on the blocking pool rather than kept in the state.
    pub fn extractor_builder(&self) -> impl FnOnce(&NotiflowConfig) -> NotiflowResult<Arc<dyn DateExtractor>> + Send + 'static {
        let injected = self.extractor.clone();
        move |config| match injected {
            Some(extractor) => Ok(extractor),
            None => {
                let extractor: Arc<dyn DateExtractor> = Arc::new(OpenAiExtractor::from_config(&config.extractor)?);
                Ok(extractor)
            }
        }
    }

    fn normalize_context(&self) -> NotiflowResult<NormalizeContext> {
        let ctx = NormalizeContext::from_config(&self.config)?;
        Ok(match self.anchor_date {
            Some(date) => ctx.with_anchor_date(date),
            None => ctx,
        })
    }

    /// Run a synchronous pipeline on the blocking pool, one run at a time.
    pub async fn run_exclusive<F, T>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&NotiflowConfig, NormalizeContext) -> NotiflowResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let _guard = self.run_lock.lock().await;
        let config = Arc::clone(&self.config);
        let context = self.normalize_context()?;

        let result = tokio::task::spawn_blocking(move || f(&config, context)).await?;
        Ok(result?)
    }
}
