// Export modules for library usage
pub mod cli;
pub mod config;
pub mod core;
pub mod errors;
pub mod io;
pub mod pipeline;
pub mod progress;

// Re-export commonly used types
pub use crate::core::{
    AnalysisReport, DocumentKey, FeatureRecord, HeaderRecord, LineItemRecord, ReportSummary,
    RiskRule, ScoredRecord, Transaction,
};

pub use crate::config::{AnalysisMode, AuditConfig, DetectorSettings, RuleWeights};

pub use crate::errors::{AuditError, StageName};

pub use crate::pipeline::AnalysisPipeline;

pub use crate::progress::{NullSink, ProgressEvent, ProgressSink};

pub use crate::io::output::{create_writer, ReportFormat, ReportWriter};
