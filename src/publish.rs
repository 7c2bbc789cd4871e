//! Outbound delivery — best-effort webhook publishing.
//!
//! One attempt per cycle, no queue: a failed delivery is logged and the
//! next cycle's content supersedes it.

use crate::error::RelayError;
use chrono::Local;
use std::time::Duration;

/// Discord-style webhooks reject messages near 2000 characters; clip a bit
/// under that and mark the cut.
const MAX_PAYLOAD_CHARS: usize = 1900;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Delivery seam for the worker loop.
pub trait Publisher {
    fn publish(&self, text: &str) -> Result<(), RelayError>;
}

pub struct WebhookSender {
    client: reqwest::blocking::Client,
    url: String,
}

impl WebhookSender {
    pub fn new(url: &str) -> Result<Self, RelayError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RelayError::PublishFailed(e.to_string()))?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl Publisher for WebhookSender {
    fn publish(&self, text: &str) -> Result<(), RelayError> {
        if text.is_empty() {
            return Ok(());
        }

        let body = serde_json::json!({ "content": clip_payload(text) });
        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .map_err(|e| RelayError::PublishFailed(e.to_string()))?;

        let status = resp.status();
        if status.as_u16() >= 400 {
            let detail = resp.text().unwrap_or_default();
            return Err(RelayError::PublishFailed(format!(
                "HTTP {}: {}",
                status,
                detail.trim()
            )));
        }

        Ok(())
    }
}

/// Clip a payload to the webhook's size limit, appending `...` when cut.
pub fn clip_payload(text: &str) -> String {
    match text.char_indices().nth(MAX_PAYLOAD_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Prepend a local timestamp line when timestamping is enabled.
pub fn format_message(text: &str, add_timestamp: bool) -> String {
    if !add_timestamp {
        return text.to_string();
    }
    let ts = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!("[{}]\n{}", ts, text)
}
