//! Command-line interface definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "auditmap")]
#[command(about = "Journal-entry audit-risk analyzer", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score journal entries for audit-risk indicators
    Analyze {
        /// Document header extract (CSV)
        #[arg(long)]
        headers: PathBuf,

        /// Line-item extract (CSV)
        #[arg(long)]
        lines: PathBuf,

        /// Analysis mode
        #[arg(short, long, value_enum, default_value = "complete")]
        mode: ModeArg,

        /// Report format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: FormatArg,

        /// Report file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Input field delimiter
        #[arg(long, default_value = ",")]
        delimiter: char,

        /// Configuration file (defaults to .auditmap.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Detector seed override for reproducing a specific run
        #[arg(long)]
        seed: Option<u64>,

        /// Suppress progress output
        #[arg(short, long, env = "AUDITMAP_QUIET")]
        quiet: bool,

        /// Increase verbosity level (can be repeated: -v, -vv)
        #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
        verbosity: u8,
    },

    /// Join the extracts and report match counts without scoring
    Preview {
        /// Document header extract (CSV)
        #[arg(long)]
        headers: PathBuf,

        /// Line-item extract (CSV)
        #[arg(long)]
        lines: PathBuf,

        /// Input field delimiter
        #[arg(long, default_value = ",")]
        delimiter: char,
    },
}

/// Analysis mode as a CLI argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Rule engine plus anomaly detector, combined final score
    Complete,
    /// Rules only; the anomaly detector is skipped
    Separate,
}

impl From<ModeArg> for crate::config::AnalysisMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Complete => crate::config::AnalysisMode::Complete,
            ModeArg::Separate => crate::config::AnalysisMode::Separate,
        }
    }
}

/// Report format as a CLI argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Csv,
    Json,
    Terminal,
}

impl From<FormatArg> for crate::io::output::ReportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Csv => crate::io::output::ReportFormat::Csv,
            FormatArg::Json => crate::io::output::ReportFormat::Json,
            FormatArg::Terminal => crate::io::output::ReportFormat::Terminal,
        }
    }
}
