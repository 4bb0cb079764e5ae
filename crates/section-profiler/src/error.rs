use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfilerError {
    #[error("No sections to exit (exit called for \"{name}\" with an empty stack)")]
    UnbalancedExit { name: String },

    #[error("Exiting section \"{found}\" does not match the last entered section \"{expected}\"")]
    NameMismatch { expected: String, found: String },

    #[error("Unable to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid profiler configuration: {0}")]
    Config(String),
}

impl ProfilerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Protocol anomalies are reported and counted but never stop profiling
    pub fn is_protocol_anomaly(&self) -> bool {
        matches!(self, Self::UnbalancedExit { .. } | Self::NameMismatch { .. })
    }
}
