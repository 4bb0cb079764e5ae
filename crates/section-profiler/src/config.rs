//! Profiler configuration

use serde::{Deserialize, Serialize};

use crate::error::ProfilerError;
use crate::stack::StackMode;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Start with recording switched on
    pub enabled: bool,
    pub stack_mode: StackMode,
    /// Initial capacity reserved for each section stack
    pub stack_capacity: usize,
    /// Keep a per-section latency histogram
    pub histograms: bool,
    /// Significant digits for the histograms (0..=5)
    pub histogram_sigfig: u8,
    /// Completed sections kept for the timeline, 0 disables it
    pub timeline_capacity: usize,
    /// Mirror every exit into the `metrics` facade
    pub publish_metrics: bool,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stack_mode: StackMode::PerThread,
            stack_capacity: 100,
            histograms: true,
            histogram_sigfig: 3,
            timeline_capacity: 0,
            publish_metrics: false,
        }
    }
}

impl ProfilerConfig {
    pub fn validate(&self) -> std::result::Result<(), ProfilerError> {
        if self.histogram_sigfig > 5 {
            return Err(ProfilerError::Config(format!(
                "histogram_sigfig must be between 0 and 5, got {}",
                self.histogram_sigfig
            )));
        }
        Ok(())
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ProfilerConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
