//! Error taxonomy for analysis runs.
//!
//! Malformed field values never surface here: bad dates, times, and amounts
//! degrade to absent features inside the pipeline. What is fatal: invalid
//! configuration (caught before any stage runs), unreadable or structurally
//! invalid input files, and any unexpected failure inside a stage, which is
//! attributed to that stage and aborts the run with nothing exported.

use std::path::PathBuf;
use thiserror::Error;

/// The pipeline stage an error is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageName {
    Join,
    Features,
    Rules,
    Anomaly,
    Combine,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Join => "join",
            StageName::Features => "feature derivation",
            StageName::Rules => "rule scoring",
            StageName::Anomaly => "anomaly detection",
            StageName::Combine => "risk combination",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for audit analysis operations.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Invalid configuration, rejected before the pipeline starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// File system failure on an input or output path.
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Structurally invalid input data (missing columns, unreadable rows).
    #[error("invalid input {}: {message}", path.display())]
    Input { path: PathBuf, message: String },

    /// A pipeline stage failed; remaining stages were skipped.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: StageName,
        #[source]
        source: anyhow::Error,
    },
}

impl AuditError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn input(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Input {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn stage(stage: StageName, source: anyhow::Error) -> Self {
        Self::Stage { stage, source }
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
