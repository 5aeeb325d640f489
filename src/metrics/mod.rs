// Metrics module - Prometheus-compatible counters for the image proxy
// Counters are atomics or mutex-guarded maps, exported as Prometheus text

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Most recent request durations kept for percentile export
const MAX_DURATION_SAMPLES: usize = 10_000;

/// Percentile statistics for request latency, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Histogram {
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
}

/// Thread-safe metrics shared by all requests
pub struct Metrics {
    request_count: AtomicU64,

    // Response status counters (200, 302, 403, 415, ...)
    status_counts: Mutex<HashMap<u16, u64>>,

    // Pipeline steps executed, by operation name
    step_counts: Mutex<HashMap<String, u64>>,

    // Multi-image steps skipped, by reason (disallowed, upstream_status, ...)
    skipped_steps: Mutex<HashMap<String, u64>>,

    // Processing faults, by class (decode, unknown_operation, optimize, ...)
    fault_counts: Mutex<HashMap<String, u64>>,

    bytes_sent: AtomicU64,

    // Request durations in microseconds
    durations: Mutex<VecDeque<u64>>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            request_count: AtomicU64::new(0),
            status_counts: Mutex::new(HashMap::new()),
            step_counts: Mutex::new(HashMap::new()),
            skipped_steps: Mutex::new(HashMap::new()),
            fault_counts: Mutex::new(HashMap::new()),
            bytes_sent: AtomicU64::new(0),
            durations: Mutex::new(VecDeque::new()),
        }
    }

    pub fn increment_request_count(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn increment_status_count(&self, status: u16) {
        increment(&self.status_counts, status);
    }

    pub fn get_status_count(&self, status: u16) -> u64 {
        read(&self.status_counts, &status)
    }

    pub fn increment_step(&self, operation: &str) {
        increment(&self.step_counts, operation.to_string());
    }

    pub fn get_step_count(&self, operation: &str) -> u64 {
        read(&self.step_counts, operation)
    }

    pub fn increment_skipped_step(&self, reason: &str) {
        increment(&self.skipped_steps, reason.to_string());
    }

    pub fn get_skipped_step_count(&self, reason: &str) -> u64 {
        read(&self.skipped_steps, reason)
    }

    pub fn increment_fault(&self, class: &str) {
        increment(&self.fault_counts, class.to_string());
    }

    pub fn get_fault_count(&self, class: &str) -> u64 {
        read(&self.fault_counts, class)
    }

    pub fn add_bytes_sent(&self, bytes: u64) {
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn get_bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Record one request duration in milliseconds
    pub fn record_duration(&self, duration_ms: f64) {
        let micros = (duration_ms * 1000.0).max(0.0) as u64;
        if let Ok(mut durations) = self.durations.lock() {
            if durations.len() == MAX_DURATION_SAMPLES {
                durations.pop_front();
            }
            durations.push_back(micros);
        }
    }

    /// Latency percentiles over the retained samples; `None` when empty
    pub fn get_duration_histogram(&self) -> Option<Histogram> {
        let durations = self.durations.lock().ok()?;
        if durations.is_empty() {
            return None;
        }

        let mut sorted: Vec<u64> = durations.iter().copied().collect();
        sorted.sort_unstable();

        Some(Histogram {
            p50: percentile(&sorted, 0.50),
            p90: percentile(&sorted, 0.90),
            p99: percentile(&sorted, 0.99),
        })
    }

    /// Export all metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str("# HELP edgepix_requests_total Total number of image requests received\n");
        output.push_str("# TYPE edgepix_requests_total counter\n");
        output.push_str(&format!(
            "edgepix_requests_total {}\n",
            self.request_count.load(Ordering::Relaxed)
        ));

        output.push_str("\n# HELP edgepix_responses_by_status_total Responses by status code\n");
        output.push_str("# TYPE edgepix_responses_by_status_total counter\n");
        for (status, count) in sorted_entries(&self.status_counts) {
            output.push_str(&format!(
                "edgepix_responses_by_status_total{{status=\"{}\"}} {}\n",
                status, count
            ));
        }

        output.push_str("\n# HELP edgepix_pipeline_steps_total Pipeline steps executed by operation\n");
        output.push_str("# TYPE edgepix_pipeline_steps_total counter\n");
        for (operation, count) in sorted_entries(&self.step_counts) {
            output.push_str(&format!(
                "edgepix_pipeline_steps_total{{operation=\"{}\"}} {}\n",
                operation, count
            ));
        }

        output.push_str("\n# HELP edgepix_skipped_steps_total Multi-image steps skipped by reason\n");
        output.push_str("# TYPE edgepix_skipped_steps_total counter\n");
        for (reason, count) in sorted_entries(&self.skipped_steps) {
            output.push_str(&format!(
                "edgepix_skipped_steps_total{{reason=\"{}\"}} {}\n",
                reason, count
            ));
        }

        output.push_str("\n# HELP edgepix_processing_faults_total Processing faults by class\n");
        output.push_str("# TYPE edgepix_processing_faults_total counter\n");
        for (class, count) in sorted_entries(&self.fault_counts) {
            output.push_str(&format!(
                "edgepix_processing_faults_total{{class=\"{}\"}} {}\n",
                class, count
            ));
        }

        output.push_str("\n# HELP edgepix_bytes_sent_total Response body bytes sent\n");
        output.push_str("# TYPE edgepix_bytes_sent_total counter\n");
        output.push_str(&format!(
            "edgepix_bytes_sent_total {}\n",
            self.bytes_sent.load(Ordering::Relaxed)
        ));

        if let Some(histogram) = self.get_duration_histogram() {
            output.push_str("\n# HELP edgepix_request_duration_ms Request duration percentiles\n");
            output.push_str("# TYPE edgepix_request_duration_ms summary\n");
            for (quantile, value) in [
                ("0.5", histogram.p50),
                ("0.9", histogram.p90),
                ("0.99", histogram.p99),
            ] {
                output.push_str(&format!(
                    "edgepix_request_duration_ms{{quantile=\"{}\"}} {:.3}\n",
                    quantile, value
                ));
            }
        }

        output
    }
}

fn increment<K: std::hash::Hash + Eq>(map: &Mutex<HashMap<K, u64>>, key: K) {
    if let Ok(mut counts) = map.lock() {
        *counts.entry(key).or_insert(0) += 1;
    }
}

fn read<K, Q>(map: &Mutex<HashMap<K, u64>>, key: &Q) -> u64
where
    K: std::borrow::Borrow<Q> + std::hash::Hash + Eq,
    Q: std::hash::Hash + Eq + ?Sized,
{
    map.lock()
        .ok()
        .and_then(|counts| counts.get(key).copied())
        .unwrap_or(0)
}

fn sorted_entries<K: Clone + Ord>(map: &Mutex<HashMap<K, u64>>) -> Vec<(K, u64)> {
    let mut entries: Vec<(K, u64)> = match map.lock() {
        Ok(counts) => counts.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        Err(_) => Vec::new(),
    };
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

/// Nearest-rank percentile of sorted microsecond samples, in milliseconds
fn percentile(sorted: &[u64], p: f64) -> f64 {
    let rank = ((sorted.len() as f64) * p).ceil() as usize;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted[index] as f64 / 1000.0
}
