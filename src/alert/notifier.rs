//! Silence alert delivery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

/// Connection timeout for webhook requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum number of retries for transient failures.
const MAX_RETRIES: u32 = 3;

/// Determine if a request should be retried based on status code and attempt count.
fn should_retry(status_code: u16, attempt: u32) -> bool {
    if attempt >= MAX_RETRIES {
        return false;
    }
    (500..600).contains(&status_code)
}

/// Exponential backoff: 1s, 2s, 4s.
fn calculate_backoff(attempt: u32) -> Duration {
    Duration::from_secs(1 << attempt)
}

/// Errors from alert delivery.
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Webhook request failed: {0}")]
    RequestFailed(String),
    #[error("Webhook request timed out")]
    Timeout,
}

/// Receives the dead-man switch alert.
#[async_trait]
pub trait Alerter: Send + Sync {
    /// No file events arrived for `minutes` minutes.
    async fn notify_silence(&self, minutes: u64) -> Result<(), AlertError>;
}

/// Human-readable alert text.
#[must_use]
pub fn silence_message(minutes: u64) -> String {
    format!("No update log activity for {minutes} minutes")
}

/// Writes alerts to the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlerter;

#[async_trait]
impl Alerter for LogAlerter {
    async fn notify_silence(&self, minutes: u64) -> Result<(), AlertError> {
        tracing::error!(minutes, "{}", silence_message(minutes));
        Ok(())
    }
}

/// JSON body posted to the webhook.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SilencePayload {
    pub kind: &'static str,
    pub minutes: u64,
    pub message: String,
    /// RFC 3339 time the alert was raised.
    pub raised_at: String,
}

impl SilencePayload {
    #[must_use]
    pub fn new(minutes: u64) -> Self {
        Self {
            kind: "silence",
            minutes,
            message: silence_message(minutes),
            raised_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Posts alerts as JSON to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookAlerter {
    client: Client,
    url: String,
}

impl WebhookAlerter {
    /// Create an alerter posting to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AlertError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(AlertError::Client)?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Alerter for WebhookAlerter {
    async fn notify_silence(&self, minutes: u64) -> Result<(), AlertError> {
        let payload = SilencePayload::new(minutes);

        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(&self.url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        AlertError::Timeout
                    } else {
                        AlertError::RequestFailed(e.to_string())
                    }
                })?;

            let status = response.status();
            if status.is_success() {
                tracing::info!(url = %self.url, minutes, "Silence alert delivered");
                return Ok(());
            }

            if should_retry(status.as_u16(), attempt) {
                tracing::warn!(status = %status, attempt, "Webhook failed, retrying");
                tokio::time::sleep(calculate_backoff(attempt)).await;
                attempt += 1;
                continue;
            }

            let text = response.text().await.unwrap_or_default();
            return Err(AlertError::RequestFailed(format!("{status}: {text}")));
        }
    }
}
