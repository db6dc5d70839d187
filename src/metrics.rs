//! Request metrics and statistics for the fraud check service.

use crate::types::verdict::Verdict;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Keep at most this many recent latencies
const LATENCY_WINDOW: usize = 10_000;

/// Metrics collector for analysis requests
pub struct AnalysisMetrics {
    /// Successful classifications
    analyses: AtomicU64,
    fraud: AtomicU64,
    safe: AtomicU64,
    /// Classifier failures reported to the user
    prediction_errors: AtomicU64,
    /// Requests refused because the model never loaded
    rejected_unavailable: AtomicU64,
    /// Submissions that failed field validation
    invalid_submissions: AtomicU64,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    start_time: Instant,
}

impl AnalysisMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            analyses: AtomicU64::new(0),
            fraud: AtomicU64::new(0),
            safe: AtomicU64::new(0),
            prediction_errors: AtomicU64::new(0),
            rejected_unavailable: AtomicU64::new(0),
            invalid_submissions: AtomicU64::new(0),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a classified transaction
    pub fn record_verdict(&self, verdict: Verdict, processing_time: Duration) {
        self.analyses.fetch_add(1, Ordering::Relaxed);
        match verdict {
            Verdict::Fraud => self.fraud.fetch_add(1, Ordering::Relaxed),
            Verdict::Safe => self.safe.fetch_add(1, Ordering::Relaxed),
        };

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            if times.len() > LATENCY_WINDOW {
                times.drain(0..LATENCY_WINDOW / 2);
            }
        }
    }

    pub fn record_prediction_error(&self) {
        self.prediction_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unavailable(&self) {
        self.rejected_unavailable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid(&self) {
        self.invalid_submissions.fetch_add(1, Ordering::Relaxed);
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let Ok(times) = self.processing_times.read() else {
            return ProcessingStats::default();
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();
        let pct = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: pct(0.95),
            p99_us: pct(0.99),
            max_us: sorted[count - 1],
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            analyses: self.analyses.load(Ordering::Relaxed),
            fraud: self.fraud.load(Ordering::Relaxed),
            safe: self.safe.load(Ordering::Relaxed),
            prediction_errors: self.prediction_errors.load(Ordering::Relaxed),
            rejected_unavailable: self.rejected_unavailable.load(Ordering::Relaxed),
            invalid_submissions: self.invalid_submissions.load(Ordering::Relaxed),
            uptime_secs: self.uptime().as_secs(),
            processing: self.get_processing_stats(),
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let s = self.snapshot();
        let fraud_rate = if s.analyses > 0 {
            (s.fraud as f64 / s.analyses as f64) * 100.0
        } else {
            0.0
        };

        info!(
            analyses = s.analyses,
            fraud = s.fraud,
            safe = s.safe,
            fraud_rate = format!("{:.1}%", fraud_rate),
            prediction_errors = s.prediction_errors,
            rejected_unavailable = s.rejected_unavailable,
            invalid_submissions = s.invalid_submissions,
            uptime_secs = s.uptime_secs,
            "Analysis summary"
        );
        if s.processing.count > 0 {
            info!(
                mean_us = s.processing.mean_us,
                p50_us = s.processing.p50_us,
                p95_us = s.processing.p95_us,
                p99_us = s.processing.p99_us,
                max_us = s.processing.max_us,
                "Inference latency"
            );
        }
    }
}

impl Default for AnalysisMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub analyses: u64,
    pub fraud: u64,
    pub safe: u64,
    pub prediction_errors: u64,
    pub rejected_unavailable: u64,
    pub invalid_submissions: u64,
    pub uptime_secs: u64,
    pub processing: ProcessingStats,
}

/// Logs a metrics summary at a fixed interval
pub struct MetricsReporter {
    metrics: Arc<AnalysisMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<AnalysisMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
