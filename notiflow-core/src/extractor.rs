//! Natural-language date extraction.
//!
//! The engine only needs "find the midterm date in this text"; how that is
//! answered lives behind [`DateExtractor`]. [`OpenAiExtractor`] asks a hosted
//! text model through the responses API.

use std::time::Duration;

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::config::ExtractorConfig;
use crate::error::{NotiflowError, NotiflowResult};
use crate::sources::announcements::midterm_sentences;

const MAX_OUTPUT_TOKENS: u32 = 250;

pub trait DateExtractor: Send + Sync {
    /// Find a midterm date in `text`, posted at `context_time`.
    ///
    /// Returns an ISO 8601 date (`YYYY-MM-DD`) or date-time
    /// (`YYYY-MM-DDTHH:MM`), or `None` if the text names no date.
    fn extract_date(&self, text: &str, context_time: &DateTime<Tz>) -> NotiflowResult<Option<String>>;
}

pub struct OpenAiExtractor {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a str,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl ResponsesReply {
    /// Concatenated `output_text` parts, like the SDKs' `output_text`.
    fn output_text(&self) -> String {
        self.output
            .iter()
            .flat_map(|item| &item.content)
            .filter(|c| c.kind == "output_text")
            .map(|c| c.text.as_str())
            .collect()
    }
}

impl OpenAiExtractor {
    pub fn from_config(config: &ExtractorConfig) -> NotiflowResult<Self> {
        let api_key = config
            .resolved_api_key()
            .ok_or_else(|| NotiflowError::Config("No extractor API key (set OPENAI_API_KEY)".into()))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotiflowError::Config(format!("Could not build HTTP client: {e}")))?;

        Ok(OpenAiExtractor {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
        })
    }
}

impl DateExtractor for OpenAiExtractor {
    fn extract_date(&self, text: &str, context_time: &DateTime<Tz>) -> NotiflowResult<Option<String>> {
        let sentences = midterm_sentences(text);
        if sentences.is_empty() {
            return Ok(None);
        }

        let prompt = build_prompt(&sentences, context_time);
        let request = ResponsesRequest {
            model: &self.model,
            input: &prompt,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        };

        tracing::debug!(model = %self.model, sentences = sentences.len(), "asking extractor for a midterm date");

        let reply: ResponsesReply = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json::<ResponsesReply>())
            .map_err(|e| NotiflowError::Upstream(format!("date extraction failed: {e}")))?;

        Ok(first_answer(&reply.output_text()))
    }
}

pub(crate) fn build_prompt(sentences: &[String], context_time: &DateTime<Tz>) -> String {
    let posted_at = context_time.to_rfc3339();
    let body = sentences
        .iter()
        .map(|s| format!("Posted at {}: {}", posted_at, s))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Extract all midterm dates or date-times mentioned below.\n\
         Output ONLY in ISO 8601 format (YYYY-MM-DD or YYYY-MM-DDTHH:MM).\n\
         When analyzing, if a date is found in a sentence, stop and return it.\n\
         If no date is found, output nothing. Do not write explanations or text.\n\n\
         {}",
        body
    )
}

/// First non-empty line of the model's answer.
fn first_answer(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
