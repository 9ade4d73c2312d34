//! In-memory `DatabaseAdapter` implementation.
//!
//! Stand-in for a real store in tests and single-node demos. A toggle
//! simulates a lost connection so the recovery and chaos paths can be
//! exercised end to end.

use std::sync::atomic::{AtomicBool, Ordering};

use rampart_core::db::{DatabaseAdapter, DatabaseError};

pub struct InMemoryDbAdapter {
    name: String,
    connected: AtomicBool,
    /// When set, `reconnect` keeps failing, simulating a hard outage.
    outage: AtomicBool,
}

impl InMemoryDbAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connected: AtomicBool::new(true),
            outage: AtomicBool::new(false),
        }
    }

    /// Drop the simulated connection. Recoverable via `reconnect` unless
    /// `set_outage(true)` as well.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn set_outage(&self, outage: bool) {
        self.outage.store(outage, Ordering::SeqCst);
        if outage {
            self.connected.store(false, Ordering::SeqCst);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl DatabaseAdapter for InMemoryDbAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DatabaseError::Ping(format!("{} not connected", self.name)))
        }
    }

    async fn reconnect(&self) -> Result<(), DatabaseError> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(DatabaseError::Connection(format!(
                "{} is unreachable",
                self.name
            )));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rampart_core::db::DatabaseLayer;

    #[tokio::test]
    async fn test_reconnect_restores_ping() {
        let adapter = InMemoryDbAdapter::new("mongo");
        adapter.disconnect();
        assert!(adapter.ping().await.is_err());

        adapter.reconnect().await.unwrap();
        assert!(adapter.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_outage_defeats_reconnect() {
        let adapter = InMemoryDbAdapter::new("mongo");
        adapter.set_outage(true);
        assert!(adapter.reconnect().await.is_err());
        assert!(!adapter.is_connected());
    }

    #[tokio::test]
    async fn test_layer_reinitialize_through_adapter() {
        let adapter = InMemoryDbAdapter::new("mongo");
        adapter.disconnect();
        let layer = DatabaseLayer::new(adapter);

        layer.reinitialize().await.unwrap();
        assert!(layer.ping().await.is_ok());
    }
}
