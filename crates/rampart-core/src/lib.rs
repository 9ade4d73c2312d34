//! Resilience substrate shared by the grant-discovery backend.
//!
//! This crate is the only part of the system with real failure-handling
//! machinery: a multi-provider gateway with health-based routing and circuit
//! breaking, a recovery orchestrator that classifies failures and dispatches
//! repair strategies, a queue health monitor that detects failing background
//! work, and a chaos injector used to validate all of the above.
//!
//! The crate defines the "ports" (collaborator traits) that the
//! infrastructure layer implements: `JobQueue`, `DatabaseAdapter`, and
//! `AlertSink`. It depends only on `rampart-types` -- never on any
//! database/HTTP crate.

pub mod alert;
pub mod chaos;
pub mod db;
pub mod gateway;
pub mod queue;
pub mod recovery;
