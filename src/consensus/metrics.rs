use std::{collections::HashMap, time::Duration};

/// Per-replica counters reported to the harness.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReplicaMetrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub latency_samples: u64,
    pub total_latency: Duration,
    pub reached_consensus: bool,
}

impl ReplicaMetrics {
    pub fn average_latency(&self) -> Duration {
        if self.latency_samples == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_latency.as_nanos() / u128::from(self.latency_samples);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// Send timestamps keyed by block hash, matched against later receipts.
#[derive(Debug, Default)]
pub struct LatencyTracker {
    sent: HashMap<String, Duration>,
}

impl LatencyTracker {
    pub fn log_sent(&mut self, key: &str, now: Duration) {
        self.sent.insert(key.to_string(), now);
    }

    /// Elapsed time since `key` was logged as sent, if it was.
    pub fn log_received(&mut self, key: &str, now: Duration) -> Option<Duration> {
        self.sent
            .get(key)
            .map(|sent_at| now.saturating_sub(*sent_at))
    }
}
