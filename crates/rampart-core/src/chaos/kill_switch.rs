//! Chaos kill switch.
//!
//! Counts consecutive triggered experiments; at the configured threshold
//! the switch engages and suppresses further injections for a cooldown
//! window, after which it resets itself. A quiet sampling tick (no
//! injection drawn) resets the consecutive counter.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rampart_types::chaos::KillSwitchState;

#[derive(Debug)]
pub struct KillSwitch {
    threshold: u32,
    cooldown: Duration,
    consecutive: u32,
    engaged_at: Option<Instant>,
    engaged_at_wall: Option<DateTime<Utc>>,
}

impl KillSwitch {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            consecutive: 0,
            engaged_at: None,
            engaged_at_wall: None,
        }
    }

    /// Whether an injection may proceed right now.
    ///
    /// An engaged switch whose cooldown has elapsed resets itself here, so
    /// callers never observe a stale suppression.
    pub fn permits(&mut self) -> bool {
        if let Some(engaged) = self.engaged_at {
            if engaged.elapsed() >= self.cooldown {
                tracing::info!("Chaos kill switch cooldown elapsed, re-arming");
                self.reset();
            } else {
                return false;
            }
        }
        true
    }

    /// Record one triggered experiment; engages the switch at the threshold.
    pub fn record_experiment(&mut self) {
        self.consecutive += 1;
        if self.consecutive >= self.threshold && self.engaged_at.is_none() {
            self.engaged_at = Some(Instant::now());
            self.engaged_at_wall = Some(Utc::now());
            tracing::warn!(
                consecutive = self.consecutive,
                cooldown_secs = self.cooldown.as_secs(),
                "Chaos kill switch engaged"
            );
        }
    }

    /// Record a sampling tick that drew no injection.
    pub fn record_quiet_tick(&mut self) {
        if self.engaged_at.is_none() {
            self.consecutive = 0;
        }
    }

    fn reset(&mut self) {
        self.consecutive = 0;
        self.engaged_at = None;
        self.engaged_at_wall = None;
    }

    pub fn state(&self) -> KillSwitchState {
        KillSwitchState {
            active: self.engaged_at.is_some(),
            activated_at: self.engaged_at_wall,
            consecutive: self.consecutive,
        }
    }
}
