//! Server metrics: cheap atomic counters, reported as a JSON line.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct Metrics {
    packets_received: AtomicU64,
    packets_rate_limited: AtomicU64,
    packets_malformed: AtomicU64,
    protocol_violations: AtomicU64,
    joins_accepted: AtomicU64,
    joins_rejected: AtomicU64,
    players_left: AtomicU64,
    inputs_enqueued: AtomicU64,
    inputs_dropped: AtomicU64,
    snapshots_sent: AtomicU64,
    rooms_created: AtomicU64,
    rooms_finished: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub packets_received: u64,
    pub packets_rate_limited: u64,
    pub packets_malformed: u64,
    pub protocol_violations: u64,
    pub joins_accepted: u64,
    pub joins_rejected: u64,
    pub players_left: u64,
    pub inputs_enqueued: u64,
    pub inputs_dropped: u64,
    pub snapshots_sent: u64,
    pub rooms_created: u64,
    pub rooms_finished: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inc_packets_received(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_packets_rate_limited(&self) {
        self.packets_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_packets_malformed(&self) {
        self.packets_malformed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_protocol_violations(&self) {
        self.protocol_violations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_joins_accepted(&self) {
        self.joins_accepted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_joins_rejected(&self) {
        self.joins_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_players_left(&self) {
        self.players_left.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_inputs_enqueued(&self) {
        self.inputs_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_inputs_dropped(&self) {
        self.inputs_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_snapshots_sent(&self, n: u64) {
        self.snapshots_sent.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_rooms_created(&self) {
        self.rooms_created.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_rooms_finished(&self) {
        self.rooms_finished.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_rate_limited: self.packets_rate_limited.load(Ordering::Relaxed),
            packets_malformed: self.packets_malformed.load(Ordering::Relaxed),
            protocol_violations: self.protocol_violations.load(Ordering::Relaxed),
            joins_accepted: self.joins_accepted.load(Ordering::Relaxed),
            joins_rejected: self.joins_rejected.load(Ordering::Relaxed),
            players_left: self.players_left.load(Ordering::Relaxed),
            inputs_enqueued: self.inputs_enqueued.load(Ordering::Relaxed),
            inputs_dropped: self.inputs_dropped.load(Ordering::Relaxed),
            snapshots_sent: self.snapshots_sent.load(Ordering::Relaxed),
            rooms_created: self.rooms_created.load(Ordering::Relaxed),
            rooms_finished: self.rooms_finished.load(Ordering::Relaxed),
        }
    }

    /// Serialized snapshot for the periodic report line.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = Metrics::new();
        metrics.inc_packets_received();
        metrics.inc_packets_received();
        metrics.inc_packets_malformed();
        metrics.add_snapshots_sent(4);

        let snap = metrics.snapshot();
        assert_eq!(snap.packets_received, 2);
        assert_eq!(snap.packets_malformed, 1);
        assert_eq!(snap.snapshots_sent, 4);
        assert_eq!(snap.rooms_created, 0);
    }

    #[test]
    fn test_json_report_contains_fields() {
        let metrics = Metrics::new();
        metrics.inc_joins_accepted();
        let json = metrics.to_json();
        assert!(json.contains("\"joins_accepted\":1"));
        assert!(json.contains("\"snapshots_sent\":0"));
    }
}
