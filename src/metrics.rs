//! Scan statistics tracking for the engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector shared across concurrent scans
pub struct EngineMetrics {
    /// Total scans processed
    pub scans_processed: AtomicU64,
    /// How often the reference-matching fallback ran
    pub fallback_invocations: AtomicU64,
    /// Verdicts by recommendation band
    verdicts_by_recommendation: RwLock<HashMap<String, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Authenticity score distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl EngineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            scans_processed: AtomicU64::new(0),
            fallback_invocations: AtomicU64::new(0),
            verdicts_by_recommendation: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a completed scan
    pub fn record_scan(&self, processing_time: Duration, authenticity_score: f64) {
        self.scans_processed.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only recent samples for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = (authenticity_score * 10.0).clamp(0.0, 9.0) as usize;
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a fallback invocation
    pub fn record_fallback(&self) {
        self.fallback_invocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the recommendation band of a verdict
    pub fn record_verdict(&self, recommendation: &str) {
        if let Ok(mut by_band) = self.verdicts_by_recommendation.write() {
            *by_band.entry(recommendation.to_string()).or_insert(0) += 1;
        }
    }

    /// Scans per second since collector creation
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.scans_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Processing time statistics over the recent sample window
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = match self.processing_times.read() {
            Ok(times) => times,
            Err(_) => return ProcessingStats::default(),
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();

        ProcessingStats {
            count,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p99_us: sorted[(count * 99 / 100).min(count - 1)],
            max_us: sorted[count - 1],
        }
    }

    /// Verdict counts by recommendation band
    pub fn get_verdict_counts(&self) -> HashMap<String, u64> {
        self.verdicts_by_recommendation
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Score distribution over ten equal buckets
    pub fn get_score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or([0; 10])
    }

    /// Log a summary of all collected statistics
    pub fn print_summary(&self) {
        let stats = self.get_processing_stats();
        info!(
            scans = self.scans_processed.load(Ordering::Relaxed),
            fallbacks = self.fallback_invocations.load(Ordering::Relaxed),
            throughput = format!("{:.1}/s", self.get_throughput()),
            mean_us = stats.mean_us,
            p99_us = stats.p99_us,
            verdicts = ?self.get_verdict_counts(),
            "Engine metrics summary"
        );
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics in microseconds
#[derive(Debug, Clone, Default)]
pub struct ProcessingStats {
    pub count: usize,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}
