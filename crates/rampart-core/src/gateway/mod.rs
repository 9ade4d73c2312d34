//! Multi-provider text-generation gateway.
//!
//! - `TextProvider`: RPITIT trait for concrete provider backends
//! - `BoxTextProvider`: object-safe wrapper for dynamic dispatch
//! - `ProviderRecord`: per-provider health state and cooldown tracking
//! - `ProviderGateway`: selection, failover, probing, and promotion

pub mod box_provider;
pub mod health;
pub mod provider;
pub mod router;

pub use box_provider::BoxTextProvider;
pub use health::{ProbeOutcome, ProviderRecord};
pub use provider::TextProvider;
pub use router::{ProviderGateway, SharedGateway};
