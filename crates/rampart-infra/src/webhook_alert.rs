//! Webhook alert sink.
//!
//! Posts escalation alerts to a Slack-compatible incoming webhook. The
//! orchestrator treats delivery as best effort; errors surface as
//! `AlertError` and are logged by the caller.

use std::time::Duration;

use rampart_core::alert::{AlertError, AlertSink};

pub struct WebhookAlertSink {
    url: String,
    client: reqwest::Client,
}

impl WebhookAlertSink {
    pub fn new(url: impl Into<String>) -> Result<Self, AlertError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AlertError::Delivery(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    fn payload(text: &str) -> serde_json::Value {
        serde_json::json!({ "text": text })
    }
}

impl AlertSink for WebhookAlertSink {
    async fn post_alert(&self, text: &str) -> Result<(), AlertError> {
        let response = self
            .client
            .post(&self.url)
            .json(&Self::payload(text))
            .send()
            .await
            .map_err(|e| AlertError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AlertError::Delivery(format!(
                "webhook returned {}",
                response.status()
            )));
        }
        tracing::debug!("Alert delivered to webhook");
        Ok(())
    }
}
