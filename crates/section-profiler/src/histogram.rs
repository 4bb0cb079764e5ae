use hdrhistogram::Histogram as HdrHistogram;
use std::time::Duration;
use serde::{Deserialize, Serialize};

const DEFAULT_SIGFIG: u8 = 3;

/// Distribution of elapsed times for one section, recorded in nanoseconds
#[derive(Debug, Clone)]
pub struct SectionHistogram {
    inner: HdrHistogram<u64>,
    count: u64,
}

impl SectionHistogram {
    #[inline]
    pub fn new() -> Self {
        Self::with_sigfig(DEFAULT_SIGFIG)
    }

    /// Auto-resizing histogram with `sigfig` significant digits (clamped to 0..=5)
    pub fn with_sigfig(sigfig: u8) -> Self {
        Self {
            inner: HdrHistogram::<u64>::new(sigfig.min(5)).expect("Failed to create histogram"),
            count: 0,
        }
    }

    #[inline]
    pub fn record(&mut self, value: u64) {
        if self.inner.record(value).is_ok() {
            self.count += 1;
        }
    }

    #[inline]
    pub fn record_seconds(&mut self, seconds: f64) {
        self.record_duration(crate::clock::seconds_to_duration(seconds));
    }

    #[inline]
    pub fn record_duration(&mut self, duration: Duration) {
        self.record(duration.as_nanos() as u64);
    }

    #[inline]
    pub fn percentile(&self, percentile: f64) -> u64 {
        self.inner.value_at_percentile(percentile)
    }

    #[inline]
    pub fn percentile_duration(&self, percentile: f64) -> Duration {
        Duration::from_nanos(self.percentile(percentile))
    }

    #[inline]
    pub fn min(&self) -> u64 {
        self.inner.min()
    }

    #[inline]
    pub fn max(&self) -> u64 {
        self.inner.max()
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.inner.mean()
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn merge(&mut self, other: &SectionHistogram) {
        if self.inner.add(&other.inner).is_ok() {
            self.count += other.count;
        }
    }

    pub fn percentiles(&self) -> SectionPercentiles {
        let ms = |p: f64| self.percentile(p) as f64 / 1_000_000.0;
        SectionPercentiles {
            p50: ms(50.0),
            p90: ms(90.0),
            p95: ms(95.0),
            p99: ms(99.0),
            p99_9: ms(99.9),
        }
    }
}

impl Default for SectionHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentiles of a section's elapsed time, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionPercentiles {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub p99_9: f64,
}
