//! Write and messaging metrics
//!
//! Counters for the replicated write path and the request/response path,
//! plus a latency histogram for write verdicts. Rendered in Prometheus
//! text format.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Histogram bucket boundaries for latency measurements (in milliseconds)
const LATENCY_BUCKETS: [f64; 11] = [
    1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0,
];

/// A simple histogram implementation for latency tracking
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<AtomicU64>,
    boundaries: Vec<f64>,
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    /// Create a new histogram with default latency buckets
    pub fn new() -> Self {
        Self::with_buckets(&LATENCY_BUCKETS)
    }

    /// Create a histogram with custom bucket boundaries
    pub fn with_buckets(boundaries: &[f64]) -> Self {
        let buckets = (0..=boundaries.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            boundaries: boundaries.to_vec(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Record a value in the histogram
    pub fn observe(&self, value: f64) {
        let bucket_idx = self
            .boundaries
            .iter()
            .position(|&boundary| value <= boundary)
            .unwrap_or(self.boundaries.len());

        self.buckets[bucket_idx].fetch_add(1, Ordering::Relaxed);
        self.sum
            .fetch_add((value * 1000.0) as u64, Ordering::Relaxed); // Store as microseconds for precision
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Cumulative bucket counts, `+Inf` last
    pub fn get_buckets(&self) -> Vec<(f64, u64)> {
        let mut cumulative = 0u64;
        let mut result = Vec::with_capacity(self.boundaries.len() + 1);

        for (i, &boundary) in self.boundaries.iter().enumerate() {
            cumulative += self.buckets[i].load(Ordering::Relaxed);
            result.push((boundary, cumulative));
        }

        cumulative += self.buckets[self.boundaries.len()].load(Ordering::Relaxed);
        result.push((f64::INFINITY, cumulative));

        result
    }

    /// Get sum of all observed values
    pub fn sum(&self) -> f64 {
        self.sum.load(Ordering::Relaxed) as f64 / 1000.0
    }

    /// Get count of observations
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Metrics shared by coordinators and correlators of one node
#[derive(Debug, Default)]
pub struct Metrics {
    pub puts_attempted: Counter,
    pub puts_accepted: Counter,
    pub puts_exhausted: Counter,
    pub compensations: Counter,
    pub compensations_failed: Counter,
    pub messages_sent: Counter,
    pub messages_rejected: Counter,
    pub responses_received: Counter,
    pub response_timeouts: Counter,
    /// Time from submission to verdict, in milliseconds
    pub write_latency: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_verdict(&self, accepted: bool, elapsed: Duration) {
        if accepted {
            self.puts_accepted.inc();
        } else {
            self.puts_exhausted.inc();
        }
        self.write_latency.observe(elapsed.as_secs_f64() * 1000.0);
    }

    /// Generate Prometheus-compatible metrics output
    pub fn to_prometheus(&self) -> String {
        let mut out = String::new();

        let counters = [
            ("puts_attempted_total", "Put attempts issued", &self.puts_attempted),
            ("puts_accepted_total", "Puts that reached quorum", &self.puts_accepted),
            ("puts_exhausted_total", "Puts that ran out of retries", &self.puts_exhausted),
            ("compensations_total", "Compensating removals issued", &self.compensations),
            (
                "compensations_failed_total",
                "Compensating removals that failed",
                &self.compensations_failed,
            ),
            ("messages_sent_total", "Messages accepted by the transport", &self.messages_sent),
            ("messages_rejected_total", "Messages refused by the transport", &self.messages_rejected),
            ("responses_received_total", "Responses matched to a request", &self.responses_received),
            ("response_timeouts_total", "Requests that timed out", &self.response_timeouts),
        ];

        // Writing into a String cannot fail
        for (name, help, counter) in counters {
            let _ = writeln!(out, "# HELP hivesync_{} {}", name, help);
            let _ = writeln!(out, "# TYPE hivesync_{} counter", name);
            let _ = writeln!(out, "hivesync_{} {}", name, counter.get());
        }

        out.push_str("# HELP hivesync_write_duration_ms Time from submission to verdict\n");
        out.push_str("# TYPE hivesync_write_duration_ms histogram\n");
        for (le, count) in self.write_latency.get_buckets() {
            if le.is_infinite() {
                let _ = writeln!(out, "hivesync_write_duration_ms_bucket{{le=\"+Inf\"}} {}", count);
            } else {
                let _ = writeln!(
                    out,
                    "hivesync_write_duration_ms_bucket{{le=\"{}\"}} {}",
                    le, count
                );
            }
        }
        let _ = writeln!(
            out,
            "hivesync_write_duration_ms_sum {}",
            self.write_latency.sum()
        );
        let _ = writeln!(
            out,
            "hivesync_write_duration_ms_count {}",
            self.write_latency.count()
        );

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram() {
        let hist = Histogram::new();

        hist.observe(5.0);
        hist.observe(50.0);
        hist.observe(50_000.0);

        assert_eq!(hist.count(), 3);

        let buckets = hist.get_buckets();
        assert_eq!(buckets.first(), Some(&(1.0, 0)));
        assert_eq!(buckets.last().map(|b| b.1), Some(3));
    }

    #[test]
    fn test_record_verdict() {
        let metrics = Metrics::new();
        metrics.record_verdict(true, Duration::from_millis(20));
        metrics.record_verdict(false, Duration::from_millis(2000));

        assert_eq!(metrics.puts_accepted.get(), 1);
        assert_eq!(metrics.puts_exhausted.get(), 1);
        assert_eq!(metrics.write_latency.count(), 2);

        let text = metrics.to_prometheus();
        assert!(text.contains("hivesync_puts_accepted_total 1"));
        assert!(text.contains("hivesync_write_duration_ms_count 2"));
    }
}
