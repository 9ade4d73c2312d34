//! Chaos engineering scaffold.
//!
//! - `KillSwitch`: suppresses injections after too many consecutive hits
//! - `ChaosInjector`: probabilistic injection of the five failure kinds

pub mod injector;
pub mod kill_switch;

pub use injector::ChaosInjector;
pub use kill_switch::KillSwitch;
