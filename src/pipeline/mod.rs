//! The analysis pipeline.
//!
//! Strictly sequential: join, feature derivation, rule scoring, optional
//! anomaly detection, score combination. Each stage fully consumes its
//! input and returns a new record set; nothing is mutated in place. The
//! pipeline holds no shared state and is safe to run on a worker thread.
//!
//! A failure inside any stage is fatal to the run and attributed to that
//! stage; remaining stages are skipped and nothing is exported.

pub mod anomaly;
pub mod combiner;
pub mod features;
pub mod joiner;
pub mod rules;

use crate::config::{AnalysisMode, AuditConfig};
use crate::core::{HeaderRecord, LineItemRecord, ScoredRecord};
use crate::errors::{AuditError, StageName};
use crate::progress::{ProgressEvent, ProgressSink};
use rules::RuleEngine;

/// One analysis run over a header set and a line-item set.
pub struct AnalysisPipeline {
    config: AuditConfig,
}

impl AnalysisPipeline {
    /// Validates the configuration up front; an invalid mode or threshold
    /// is rejected before any stage runs.
    pub fn new(config: AuditConfig) -> Result<Self, AuditError> {
        config.validate().map_err(AuditError::config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Number of stages this run will execute; the detector stage only
    /// exists in complete mode.
    pub fn stage_count(&self) -> usize {
        match self.config.mode {
            AnalysisMode::Complete => 5,
            AnalysisMode::Separate => 4,
        }
    }

    /// Run the full pipeline. Inputs are consumed; the scored record set
    /// is the only output.
    pub fn run(
        &self,
        headers: Vec<HeaderRecord>,
        line_items: Vec<LineItemRecord>,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<ScoredRecord>, AuditError> {
        let total = self.stage_count();
        let mut index = 0;
        let mut stage_started = |stage: &'static str| {
            progress.report(ProgressEvent::StageStarted {
                stage,
                index,
                total,
            });
            index += 1;
        };

        log::debug!(
            "starting {} analysis: {} headers, {} line items",
            self.config.mode,
            headers.len(),
            line_items.len()
        );

        stage_started("joining headers and line items");
        let transactions = joiner::join_transactions(&headers, line_items);
        progress.report(ProgressEvent::StageFinished {
            stage: "join",
            rows: transactions.len(),
        });

        stage_started("deriving features");
        let features =
            features::derive_features_with(&self.config.manual_code_set(), transactions);
        progress.report(ProgressEvent::StageFinished {
            stage: "features",
            rows: features.len(),
        });

        stage_started("applying risk rules");
        let engine = RuleEngine::from_config(&self.config);
        let outcomes = engine.score_all(&features);
        if outcomes.len() != features.len() {
            return Err(AuditError::stage(
                StageName::Rules,
                anyhow::anyhow!(
                    "rule engine produced {} outcomes for {} records",
                    outcomes.len(),
                    features.len()
                ),
            ));
        }
        progress.report(ProgressEvent::StageFinished {
            stage: "rules",
            rows: outcomes.len(),
        });

        // In rules-only mode the detector is skipped outright, not
        // run-and-ignored.
        let anomaly_flags = match self.config.mode {
            AnalysisMode::Complete => {
                stage_started("detecting outliers");
                let flags = anomaly::detect_outliers(&self.config.detector, &features);
                if flags.len() != features.len() {
                    return Err(AuditError::stage(
                        StageName::Anomaly,
                        anyhow::anyhow!(
                            "detector produced {} flags for {} records",
                            flags.len(),
                            features.len()
                        ),
                    ));
                }
                progress.report(ProgressEvent::StageFinished {
                    stage: "anomaly",
                    rows: flags.len(),
                });
                Some(flags)
            }
            AnalysisMode::Separate => None,
        };

        stage_started("combining risk scores");
        let scored = combiner::combine_scores(&self.config, features, outcomes, anomaly_flags);
        progress.report(ProgressEvent::StageFinished {
            stage: "combine",
            rows: scored.len(),
        });

        progress.report(ProgressEvent::Completed { rows: scored.len() });
        log::debug!("analysis complete: {} rows scored", scored.len());
        Ok(scored)
    }
}
