//! Utility functions and helpers

use std::time::Duration;
use section_profiler::SectionStat;

pub fn format_duration_ns(nanos: u64) -> String {
    if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2}μs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2}s", nanos as f64 / 1_000_000_000.0)
    }
}

#[inline]
pub fn format_duration(duration: Duration) -> String {
    format_duration_ns(duration.as_nanos().min(u128::from(u64::MAX)) as u64)
}

/// Short human-readable line for one section
pub fn describe_section(stat: &SectionStat) -> String {
    format!(
        "{}: {} calls, avg {}, min {}, max {}",
        stat.name(),
        stat.count(),
        format_duration(stat.mean()),
        format_duration(stat.min()),
        format_duration(stat.max()),
    )
}
