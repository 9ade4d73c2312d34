//! Infrastructure layer for Rampart.
//!
//! Contains implementations of the ports defined in `rampart-core`: the
//! in-memory job queue and database adapters used by tests and single-node
//! deployments, the webhook alert sink, and the `rampart.toml` loader.

pub mod config;
pub mod memory_db;
pub mod memory_queue;
pub mod webhook_alert;
