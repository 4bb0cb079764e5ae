//! Configuration management

use serde::{Deserialize, Serialize};
use anyhow::Result;
use section_profiler::ProfilerConfig;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Workload needs at least one table entry")]
    EmptyWorkload,

    #[error("Workload needs at least one iteration")]
    NoIterations,

    #[error("Unknown log level {0:?}")]
    UnknownLogLevel(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    pub workload: WorkloadConfig,
    pub output: OutputConfig,
    pub profiler: ProfilerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Random angles generated per trig run
    pub entries: usize,
    /// Sequential repetitions of each instrumentation style
    pub iterations: usize,
    /// Concurrent workers for the parallel pass, 0 skips it
    pub parallel_workers: usize,
    pub seed: u64,
}

/// Report destinations; an empty path skips that report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub print_console: bool,
    pub json_path: String,
    pub csv_path: String,
    pub timeline_path: String,
}

impl OutputConfig {
    pub fn json_path(&self) -> Option<&str> {
        non_empty(&self.json_path)
    }

    pub fn csv_path(&self) -> Option<&str> {
        non_empty(&self.csv_path)
    }

    pub fn timeline_path(&self) -> Option<&str> {
        non_empty(&self.timeline_path)
    }
}

fn non_empty(path: &str) -> Option<&str> {
    let path = path.trim();
    (!path.is_empty()).then_some(path)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            workload: WorkloadConfig::default(),
            output: OutputConfig::default(),
            profiler: ProfilerConfig::default(),
        }
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            entries: 100_000,
            iterations: 1,
            parallel_workers: 4,
            seed: 0x5eed,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            print_console: true,
            json_path: "profiler_stats.json".to_string(),
            csv_path: "profiler_stats.csv".to_string(),
            timeline_path: String::new(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.workload.entries == 0 {
            return Err(ConfigError::EmptyWorkload);
        }
        if self.workload.iterations == 0 {
            return Err(ConfigError::NoIterations);
        }
        match self.log_level.to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" | "off" => Ok(()),
            _ => Err(ConfigError::UnknownLogLevel(self.log_level.clone())),
        }
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        config.profiler.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
