//! Alerting capability.
//!
//! The orchestrator posts escalation alerts through an explicit `AlertSink`
//! rather than a fire-and-forget background call, so sinks are injectable
//! and failures are observable. Sink failures are logged by the caller and
//! never propagate into the recovery path.

use std::future::Future;
use std::pin::Pin;

/// Errors from alert delivery.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert delivery failed: {0}")]
    Delivery(String),
}

/// Trait for alert destinations (chat webhook, pager, log).
pub trait AlertSink: Send + Sync {
    /// Deliver one alert message.
    fn post_alert(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<(), AlertError>> + Send;
}

/// Object-safe version of [`AlertSink`] with boxed futures.
pub trait AlertSinkDyn: Send + Sync {
    fn post_alert_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), AlertError>> + Send + 'a>>;
}

impl<T: AlertSink> AlertSinkDyn for T {
    fn post_alert_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), AlertError>> + Send + 'a>> {
        Box::pin(self.post_alert(text))
    }
}

/// Type-erased alert sink.
pub struct BoxAlertSink {
    inner: Box<dyn AlertSinkDyn + Send + Sync>,
}

impl BoxAlertSink {
    pub fn new<T: AlertSink + 'static>(sink: T) -> Self {
        Self {
            inner: Box::new(sink),
        }
    }

    pub async fn post_alert(&self, text: &str) -> Result<(), AlertError> {
        self.inner.post_alert_boxed(text).await
    }
}

/// Default sink that records alerts in the log at WARN.
#[derive(Debug, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    async fn post_alert(&self, text: &str) -> Result<(), AlertError> {
        tracing::warn!(alert = %text, "Escalation alert");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_alert::RecordingSink;
    use super::*;

    #[tokio::test]
    async fn test_box_sink_delegates() {
        let recording = RecordingSink::default();
        let posted = recording.posted.clone();
        let sink = BoxAlertSink::new(recording);
        sink.post_alert("db_connection cluster").await.unwrap();
        assert_eq!(posted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tracing_sink_never_fails() {
        let sink = TracingAlertSink;
        assert!(sink.post_alert("anything").await.is_ok());
    }
}
