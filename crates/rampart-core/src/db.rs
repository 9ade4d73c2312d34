//! Database layer port and primary/secondary adapter management.
//!
//! The persistence engine itself is out of scope; the recovery orchestrator
//! only needs a connection layer it can reinitialize, a liveness probe, and
//! an optional degraded-mode adapter to switch to when the primary cannot
//! be recovered.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

/// Errors from database adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("database connection failed: {0}")]
    Connection(String),

    #[error("database ping failed: {0}")]
    Ping(String),

    #[error("no secondary adapter configured")]
    NoSecondary,
}

/// Trait for a database connection adapter.
///
/// Uses RPITIT; implementations live in rampart-infra.
pub trait DatabaseAdapter: Send + Sync {
    /// Adapter name (e.g. "mongo-primary", "sqlite-degraded").
    fn name(&self) -> &str;

    /// Lightweight liveness probe.
    fn ping(&self) -> impl Future<Output = Result<(), DatabaseError>> + Send;

    /// Tear down and re-establish the connection.
    fn reconnect(&self) -> impl Future<Output = Result<(), DatabaseError>> + Send;
}

/// Object-safe version of [`DatabaseAdapter`] with boxed futures.
pub trait DatabaseAdapterDyn: Send + Sync {
    fn name(&self) -> &str;

    fn ping_boxed(&self) -> Pin<Box<dyn Future<Output = Result<(), DatabaseError>> + Send + '_>>;

    fn reconnect_boxed(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<(), DatabaseError>> + Send + '_>>;
}

impl<T: DatabaseAdapter> DatabaseAdapterDyn for T {
    fn name(&self) -> &str {
        DatabaseAdapter::name(self)
    }

    fn ping_boxed(&self) -> Pin<Box<dyn Future<Output = Result<(), DatabaseError>> + Send + '_>> {
        Box::pin(self.ping())
    }

    fn reconnect_boxed(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<(), DatabaseError>> + Send + '_>> {
        Box::pin(self.reconnect())
    }
}

/// Which adapter is currently serving traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveAdapter {
    Primary,
    Secondary,
}

/// Primary/secondary adapter pair with an active selector.
///
/// A switch to the secondary is permanent until [`DatabaseLayer::promote_primary`]
/// is called by an external operator path; recovery never switches back on
/// its own.
pub struct DatabaseLayer {
    primary: Box<dyn DatabaseAdapterDyn>,
    secondary: Option<Box<dyn DatabaseAdapterDyn>>,
    active: Mutex<ActiveAdapter>,
}

impl DatabaseLayer {
    pub fn new<P: DatabaseAdapter + 'static>(primary: P) -> Self {
        Self {
            primary: Box::new(primary),
            secondary: None,
            active: Mutex::new(ActiveAdapter::Primary),
        }
    }

    /// Attach a degraded-mode secondary adapter.
    pub fn with_secondary<S: DatabaseAdapter + 'static>(mut self, secondary: S) -> Self {
        self.secondary = Some(Box::new(secondary));
        self
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }

    pub fn active(&self) -> ActiveAdapter {
        *self.active.lock().expect("adapter selector poisoned")
    }

    /// Name of the adapter currently serving traffic.
    pub fn active_name(&self) -> String {
        match self.active() {
            ActiveAdapter::Primary => self.primary.name().to_string(),
            ActiveAdapter::Secondary => self
                .secondary
                .as_ref()
                .map(|s| s.name().to_string())
                .unwrap_or_else(|| self.primary.name().to_string()),
        }
    }

    fn active_adapter(&self) -> &dyn DatabaseAdapterDyn {
        match self.active() {
            ActiveAdapter::Primary => self.primary.as_ref(),
            ActiveAdapter::Secondary => self
                .secondary
                .as_deref()
                .unwrap_or(self.primary.as_ref()),
        }
    }

    /// Reinitialize the active connection: reconnect, then ping.
    pub async fn reinitialize(&self) -> Result<(), DatabaseError> {
        let adapter = self.active_adapter();
        adapter.reconnect_boxed().await?;
        adapter.ping_boxed().await
    }

    /// Liveness probe against the active adapter.
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        self.active_adapter().ping_boxed().await
    }

    /// Switch to the secondary adapter. The switch is permanent until
    /// `promote_primary`.
    pub fn switch_to_secondary(&self) -> Result<String, DatabaseError> {
        let Some(secondary) = self.secondary.as_ref() else {
            return Err(DatabaseError::NoSecondary);
        };
        *self.active.lock().expect("adapter selector poisoned") = ActiveAdapter::Secondary;
        tracing::warn!(adapter = %secondary.name(), "Switched to secondary database adapter");
        Ok(secondary.name().to_string())
    }

    /// Explicit external promotion back to the primary adapter.
    pub fn promote_primary(&self) {
        *self.active.lock().expect("adapter selector poisoned") = ActiveAdapter::Primary;
        tracing::info!(adapter = %self.primary.name(), "Primary database adapter restored");
    }
}


#[cfg(test)]
mod tests {
    use super::test_db::TestAdapter;
    use super::*;

    #[tokio::test]
    async fn test_reinitialize_reconnects_then_pings() {
        let layer = DatabaseLayer::new(TestAdapter::named("mongo"));
        layer.reinitialize().await.unwrap();
        assert_eq!(layer.active(), ActiveAdapter::Primary);
    }

    #[tokio::test]
    async fn test_switch_without_secondary_fails() {
        let layer = DatabaseLayer::new(TestAdapter::named("mongo"));
        assert!(matches!(
            layer.switch_to_secondary(),
            Err(DatabaseError::NoSecondary)
        ));
    }

    #[tokio::test]
    async fn test_switch_is_permanent_until_promotion() {
        let layer = DatabaseLayer::new(TestAdapter::failing("mongo"))
            .with_secondary(TestAdapter::named("sqlite-degraded"));

        let adapter = layer.switch_to_secondary().unwrap();
        assert_eq!(adapter, "sqlite-degraded");
        assert_eq!(layer.active(), ActiveAdapter::Secondary);
        assert_eq!(layer.active_name(), "sqlite-degraded");

        // The secondary works even while the primary is down.
        layer.ping().await.unwrap();

        layer.promote_primary();
        assert_eq!(layer.active(), ActiveAdapter::Primary);
    }

    #[tokio::test]
    async fn test_reinitialize_failure_surfaces() {
        let layer = DatabaseLayer::new(TestAdapter::failing("mongo"));
        assert!(layer.reinitialize().await.is_err());
    }
}
