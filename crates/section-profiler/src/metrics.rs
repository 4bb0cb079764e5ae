use std::borrow::Cow;
use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::seconds_to_duration;

/// Where a section was closed in the instrumented source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    pub file: &'static str,
    pub function: Option<&'static str>,
    pub line: u32,
}

impl SourceLocation {
    #[inline]
    pub const fn new(file: &'static str, function: &'static str, line: u32) -> Self {
        Self {
            file,
            function: Some(function),
            line,
        }
    }

    /// Location of the caller, without a function name
    #[inline]
    #[track_caller]
    pub fn caller() -> Self {
        let location = std::panic::Location::caller();
        Self {
            file: location.file(),
            function: None,
            line: location.line(),
        }
    }
}

/// Aggregated timing statistics for one section name. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionStat {
    name: Cow<'static, str>,
    count: u64,
    total_time: f64,
    min_time: f64,
    max_time: f64,
    avg_time: f64,
    location: Option<SourceLocation>,
}

impl SectionStat {
    /// Start statistics from the first observed sample
    #[inline]
    pub fn first(name: Cow<'static, str>, elapsed: f64, location: Option<SourceLocation>) -> Self {
        Self {
            name,
            count: 1,
            total_time: elapsed,
            min_time: elapsed,
            max_time: elapsed,
            avg_time: elapsed,
            location,
        }
    }

    /// Fold another sample in. Location is only ever set by `first`.
    #[inline]
    pub fn record(&mut self, elapsed: f64) {
        self.count += 1;
        self.total_time += elapsed;
        self.min_time = self.min_time.min(elapsed);
        self.max_time = self.max_time.max(elapsed);
        self.avg_time = self.total_time / self.count as f64;
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    #[inline]
    pub fn min_time(&self) -> f64 {
        self.min_time
    }

    #[inline]
    pub fn max_time(&self) -> f64 {
        self.max_time
    }

    #[inline]
    pub fn avg_time(&self) -> f64 {
        self.avg_time
    }

    #[inline]
    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    #[inline]
    pub fn total(&self) -> Duration {
        seconds_to_duration(self.total_time)
    }

    #[inline]
    pub fn min(&self) -> Duration {
        seconds_to_duration(self.min_time)
    }

    #[inline]
    pub fn max(&self) -> Duration {
        seconds_to_duration(self.max_time)
    }

    #[inline]
    pub fn mean(&self) -> Duration {
        seconds_to_duration(self.avg_time)
    }
}

/// Counters for enter/exit protocol violations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomalies {
    pub unbalanced_exits: u64,
    pub name_mismatches: u64,
}

impl Anomalies {
    #[inline]
    pub fn total(&self) -> u64 {
        self.unbalanced_exits + self.name_mismatches
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub sections: usize,
    pub total_calls: u64,
    pub total_time: Duration,
    pub slowest_section: Option<String>,
    pub open_sections: usize,
    pub anomalies: Anomalies,
    pub generated_at: DateTime<Utc>,
}

impl ProfileSummary {
    pub fn from_stats<'a>(
        stats: impl IntoIterator<Item = &'a SectionStat>,
        open_sections: usize,
        anomalies: Anomalies,
    ) -> Self {
        let mut sections = 0;
        let mut total_calls = 0;
        let mut total_time = 0.0;
        let mut slowest: Option<&SectionStat> = None;

        for stat in stats {
            sections += 1;
            total_calls += stat.count;
            total_time += stat.total_time;
            if slowest.map_or(true, |s| stat.avg_time > s.avg_time) {
                slowest = Some(stat);
            }
        }

        Self {
            sections,
            total_calls,
            total_time: seconds_to_duration(total_time),
            slowest_section: slowest.map(|s| s.name().to_string()),
            open_sections,
            anomalies,
            generated_at: Utc::now(),
        }
    }

    #[inline]
    pub fn total_time_ms(&self) -> f64 {
        self.total_time.as_secs_f64() * 1000.0
    }

    #[inline]
    pub fn calls_per_second(&self, window_duration: Duration) -> f64 {
        if window_duration.is_zero() {
            0.0
        } else {
            self.total_calls as f64 / window_duration.as_secs_f64()
        }
    }
}
