//! # sectionprof: in-process section timing profiler
//!
//! Callers mark the start and end of named sections and get per-section
//! statistics back:
//! - Stack-based enter/exit with per-thread nesting
//! - Scope guards that close sections on every exit path
//! - Call count, total, min, max and average time per section
//! - Console, CSV and JSON reports

pub mod config;
pub mod utils;
pub mod workload;

pub use section_profiler;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
