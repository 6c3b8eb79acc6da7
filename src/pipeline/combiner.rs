//! Final risk score combination.
//!
//! In complete mode the anomaly flag contributes a fixed weight on top of
//! the rule score; in rules-only mode the final score is the rule score and
//! no flag exists. Missing inputs count as zero — the final score is never
//! absent.

use crate::config::{AnalysisMode, AuditConfig};
use crate::core::{FeatureRecord, ScoredRecord};
use crate::pipeline::rules::RuleOutcome;

/// Combine rule outcomes and optional anomaly flags into scored records.
///
/// `anomaly_flags` must be `None` exactly when the detector was skipped;
/// a missing flag for an individual row contributes zero.
pub fn combine_scores(
    config: &AuditConfig,
    records: Vec<FeatureRecord>,
    outcomes: Vec<RuleOutcome>,
    anomaly_flags: Option<Vec<u8>>,
) -> Vec<ScoredRecord> {
    records
        .into_iter()
        .zip(outcomes)
        .enumerate()
        .map(|(index, (record, outcome))| {
            let anomaly_flag = anomaly_flags
                .as_ref()
                .map(|flags| flags.get(index).copied().unwrap_or(0));
            let final_score = final_score(config, outcome.score, anomaly_flag);

            ScoredRecord {
                record,
                rule_score: outcome.score,
                triggered_rules: outcome.triggered,
                anomaly_flag,
                final_score,
            }
        })
        .collect()
}

fn final_score(config: &AuditConfig, rule_score: u32, anomaly_flag: Option<u8>) -> f64 {
    match config.mode {
        AnalysisMode::Complete => {
            rule_score as f64 + anomaly_flag.unwrap_or(0) as f64 * config.anomaly_weight as f64
        }
        AnalysisMode::Separate => rule_score as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DocumentKey, Transaction};
    use pretty_assertions::assert_eq;

    fn feature_record() -> FeatureRecord {
        FeatureRecord {
            transaction: Transaction {
                key: DocumentKey::new("1000", "100", "2024"),
                line_number: "001".to_string(),
                account: None,
                cost_center: None,
                amount: None,
                header: None,
            },
            posting_date: None,
            entry_hour: None,
            is_manual: 0,
            line_count: 1,
        }
    }

    fn outcome(score: u32) -> RuleOutcome {
        RuleOutcome {
            score,
            triggered: vec![],
        }
    }

    #[test]
    fn complete_mode_adds_weighted_anomaly_flag() {
        let config = AuditConfig::default(); // complete
        let scored = combine_scores(
            &config,
            vec![feature_record(), feature_record()],
            vec![outcome(5), outcome(5)],
            Some(vec![1, 0]),
        );

        assert_eq!(scored[0].final_score, 8.0);
        assert_eq!(scored[1].final_score, 5.0);
        assert_eq!(scored[0].anomaly_flag, Some(1));
    }

    #[test]
    fn separate_mode_passes_the_rule_score_through() {
        let mut config = AuditConfig::default();
        config.mode = AnalysisMode::Separate;

        let scored = combine_scores(&config, vec![feature_record()], vec![outcome(7)], None);

        assert_eq!(scored[0].final_score, 7.0);
        assert_eq!(scored[0].anomaly_flag, None);
    }

    #[test]
    fn missing_flag_rows_default_to_zero() {
        let config = AuditConfig::default();
        let scored = combine_scores(
            &config,
            vec![feature_record(), feature_record()],
            vec![outcome(2), outcome(2)],
            Some(vec![1]), // short flag vector
        );

        assert_eq!(scored[1].anomaly_flag, Some(0));
        assert_eq!(scored[1].final_score, 2.0);
    }

    #[test]
    fn anomaly_weight_is_configurable() {
        let mut config = AuditConfig::default();
        config.anomaly_weight = 5;

        let scored = combine_scores(&config, vec![feature_record()], vec![outcome(0)], Some(vec![1]));
        assert_eq!(scored[0].final_score, 5.0);
    }
}
