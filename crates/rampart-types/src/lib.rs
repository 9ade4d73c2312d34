//! Shared domain types for Rampart.
//!
//! Rampart is the resilience substrate of the grant-discovery backend: the
//! provider gateway, recovery orchestrator, queue health monitor, and chaos
//! harness all exchange the types defined here. This crate has no I/O and
//! no async code -- only data shapes and error enums.

pub mod chaos;
pub mod config;
pub mod failure;
pub mod gateway;
pub mod queue;
