//! Analysis configuration.
//!
//! Rule weights, the manual-entry code set, the off-hours threshold, the
//! large-amount percentile, and the detector settings are all named
//! configuration with fixed audit-standard defaults. They load from an
//! optional `.auditmap.toml` and are validated before the pipeline starts.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::OnceLock;

/// Which analyses to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Rule engine plus anomaly detector, combined final score.
    #[default]
    Complete,
    /// Rule engine only; the detector is skipped entirely.
    Separate,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Complete => "complete",
            AnalysisMode::Separate => "separate",
        }
    }
}

impl std::str::FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "complete" => Ok(AnalysisMode::Complete),
            "separate" => Ok(AnalysisMode::Separate),
            other => Err(format!(
                "unrecognized analysis mode '{}', expected 'complete' or 'separate'",
                other
            )),
        }
    }
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Additive weights for the audit-risk rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleWeights {
    /// Weight added when the posting used a manual-entry transaction code
    #[serde(default = "default_manual_posting_weight")]
    pub manual_posting: u32,

    /// Weight added when the entry hour is past the off-hours threshold
    #[serde(default = "default_off_hours_weight")]
    pub off_hours: u32,

    /// Weight added when the posting date falls on a weekend
    #[serde(default = "default_weekend_weight")]
    pub weekend: u32,

    /// Weight added when the amount reaches the large-amount percentile
    #[serde(default = "default_large_amount_weight")]
    pub large_amount: u32,

    /// Weight added for expense postings with no cost center
    #[serde(default = "default_missing_cost_center_weight")]
    pub missing_cost_center: u32,
}

impl Default for RuleWeights {
    fn default() -> Self {
        Self {
            manual_posting: default_manual_posting_weight(),
            off_hours: default_off_hours_weight(),
            weekend: default_weekend_weight(),
            large_amount: default_large_amount_weight(),
            missing_cost_center: default_missing_cost_center_weight(),
        }
    }
}

// Default weights per the SA315-style risk factor catalogue
fn default_manual_posting_weight() -> u32 {
    3
}
fn default_off_hours_weight() -> u32 {
    2
}
fn default_weekend_weight() -> u32 {
    2
}
fn default_large_amount_weight() -> u32 {
    3
}
fn default_missing_cost_center_weight() -> u32 {
    2
}

/// Settings for the statistical outlier model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorSettings {
    /// Expected fraction of outliers in the dataset (0, 0.5]
    #[serde(default = "default_contamination")]
    pub contamination: f64,

    /// RNG seed; fixed so repeated runs flag the same rows
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Number of trees in the isolation forest
    #[serde(default = "default_tree_count")]
    pub trees: usize,

    /// Per-tree subsample size
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            contamination: default_contamination(),
            seed: default_seed(),
            trees: default_tree_count(),
            sample_size: default_sample_size(),
        }
    }
}

fn default_contamination() -> f64 {
    0.02
}
fn default_seed() -> u64 {
    42
}
fn default_tree_count() -> usize {
    100
}
fn default_sample_size() -> usize {
    256
}

/// Full analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub mode: AnalysisMode,

    #[serde(default)]
    pub weights: RuleWeights,

    /// Transaction codes treated as manual entry
    #[serde(default = "default_manual_codes")]
    pub manual_codes: Vec<String>,

    /// Entries strictly after this hour count as off-hours
    #[serde(default = "default_off_hours_after")]
    pub off_hours_after: u32,

    /// Percentile of the batch amount distribution above which the
    /// large-amount rule fires
    #[serde(default = "default_large_amount_percentile")]
    pub large_amount_percentile: f64,

    /// Contribution of an anomaly flag to the final score in complete mode
    #[serde(default = "default_anomaly_weight")]
    pub anomaly_weight: u32,

    #[serde(default)]
    pub detector: DetectorSettings,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            mode: AnalysisMode::default(),
            weights: RuleWeights::default(),
            manual_codes: default_manual_codes(),
            off_hours_after: default_off_hours_after(),
            large_amount_percentile: default_large_amount_percentile(),
            anomaly_weight: default_anomaly_weight(),
            detector: DetectorSettings::default(),
        }
    }
}

fn default_manual_codes() -> Vec<String> {
    vec!["FB01".to_string(), "FB50".to_string(), "F-02".to_string()]
}
fn default_off_hours_after() -> u32 {
    20
}
fn default_large_amount_percentile() -> f64 {
    0.99
}
fn default_anomaly_weight() -> u32 {
    3
}

impl AuditConfig {
    /// Validate the configuration before any pipeline stage runs.
    pub fn validate(&self) -> Result<(), String> {
        if self.large_amount_percentile <= 0.0 || self.large_amount_percentile >= 1.0 {
            return Err(format!(
                "large_amount_percentile must be in (0, 1), got {}",
                self.large_amount_percentile
            ));
        }
        if self.off_hours_after > 23 {
            return Err(format!(
                "off_hours_after must be an hour 0-23, got {}",
                self.off_hours_after
            ));
        }
        if self.detector.contamination <= 0.0 || self.detector.contamination > 0.5 {
            return Err(format!(
                "detector.contamination must be in (0, 0.5], got {}",
                self.detector.contamination
            ));
        }
        if self.detector.trees == 0 {
            return Err("detector.trees must be at least 1".to_string());
        }
        if self.detector.sample_size < 2 {
            return Err("detector.sample_size must be at least 2".to_string());
        }
        Ok(())
    }

    /// Normalized manual-code set for membership tests.
    pub fn manual_code_set(&self) -> std::collections::HashSet<String> {
        self.manual_codes
            .iter()
            .map(|c| c.trim().to_uppercase())
            .collect()
    }
}

/// Cache the configuration for the process lifetime
static CONFIG: OnceLock<AuditConfig> = OnceLock::new();

fn read_config_file(path: &Path) -> Result<String, std::io::Error> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    Ok(contents)
}

fn parse_config(contents: &str) -> Result<AuditConfig, String> {
    toml::from_str::<AuditConfig>(contents)
        .map_err(|e| format!("failed to parse config file: {}", e))
}

/// Load configuration from an explicit path.
pub fn load_config_from(path: &Path) -> Result<AuditConfig, String> {
    let contents =
        read_config_file(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    let config = parse_config(&contents)?;
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

/// Load configuration from `.auditmap.toml` in the working directory if it
/// exists, falling back to defaults. Parse failures warn and fall back
/// rather than abort; an explicitly passed config file (`load_config_from`)
/// is fatal on error instead.
pub fn load_config() -> AuditConfig {
    CONFIG
        .get_or_init(|| {
            let path = Path::new(".auditmap.toml");
            match read_config_file(path) {
                Ok(contents) => match parse_config(&contents) {
                    Ok(config) => {
                        log::debug!("loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("{}; using defaults", e);
                        AuditConfig::default()
                    }
                },
                Err(e) => {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        log::warn!("failed to read {}: {}; using defaults", path.display(), e);
                    }
                    AuditConfig::default()
                }
            }
        })
        .clone()
}
