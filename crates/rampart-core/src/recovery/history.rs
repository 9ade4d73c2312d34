//! Bounded per-kind failure history with cluster detection.
//!
//! Each failure kind keeps its most recent events in a fixed-capacity
//! ring; a "cluster" is `cluster_size` or more events of one kind within
//! the trailing `cluster_window`. Escalation latches per kind so a
//! sustained burst alerts once, not once per event.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use chrono::Utc;

use rampart_types::config::EscalationPolicy;
use rampart_types::failure::{FailureEvent, FailureKind};

/// Maximum events retained per failure kind; the oldest is evicted first.
pub const HISTORY_CAP: usize = 10;

/// Per-kind bounded failure history, owned by the orchestrator.
#[derive(Debug, Default)]
pub struct FailureHistory {
    events: HashMap<FailureKind, VecDeque<FailureEvent>>,
    escalated: HashSet<FailureKind>,
}

impl FailureHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to its kind's ring, evicting the oldest at capacity.
    pub fn record(&mut self, event: FailureEvent) {
        let ring = self.events.entry(event.kind.clone()).or_default();
        if ring.len() == HISTORY_CAP {
            ring.pop_front();
        }
        ring.push_back(event);
    }

    /// Events currently stored for a kind, oldest first.
    pub fn events_for(&self, kind: &FailureKind) -> impl Iterator<Item = &FailureEvent> {
        self.events.get(kind).into_iter().flatten()
    }

    pub fn len_for(&self, kind: &FailureKind) -> usize {
        self.events.get(kind).map_or(0, VecDeque::len)
    }

    /// True when at least `cluster_size` events of this kind fall within
    /// the trailing window.
    pub fn is_recent_cluster(&self, kind: &FailureKind, policy: &EscalationPolicy) -> bool {
        let Some(ring) = self.events.get(kind) else {
            return false;
        };
        let window = Duration::from_secs(policy.cluster_window_secs);
        let cutoff = Utc::now()
            - chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::seconds(0));
        let recent = ring.iter().filter(|e| e.at >= cutoff).count();
        recent >= policy.cluster_size
    }

    /// Decide whether this kind should escalate right now.
    ///
    /// Escalation requires the ring at capacity AND a recent cluster, and
    /// fires once per qualifying burst: the kind stays latched until the
    /// cluster condition lapses, at which point a future burst may escalate
    /// again.
    pub fn should_escalate(&mut self, kind: &FailureKind, policy: &EscalationPolicy) -> bool {
        let qualifies =
            self.len_for(kind) >= HISTORY_CAP && self.is_recent_cluster(kind, policy);

        if !qualifies {
            self.escalated.remove(kind);
            return false;
        }
        self.escalated.insert(kind.clone())
    }
}
