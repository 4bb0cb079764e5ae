pub mod clock;
pub mod config;
pub mod error;
pub mod histogram;
pub mod metrics;
pub mod profiler;
pub mod report;
pub mod stack;
pub mod timeline;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::ProfilerConfig;
pub use error::ProfilerError;
pub use histogram::{SectionHistogram, SectionPercentiles};
pub use metrics::{Anomalies, ProfileSummary, SectionStat, SourceLocation};
pub use profiler::{global, ScopedSection, SectionProfiler};
pub use report::{ExportedSection, ProfileReport, SortKey};
pub use stack::{OpenSection, SectionStack, StackMode};
pub use timeline::SectionRecord;

pub type Result<T> = anyhow::Result<T>;
