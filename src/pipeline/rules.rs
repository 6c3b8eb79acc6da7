//! Deterministic audit-risk rule engine.
//!
//! Five independently evaluated boolean rules, each adding a fixed weight
//! when triggered. Scoring is two-pass: the large-amount threshold is a
//! batch statistic computed over the whole dataset first, then every row is
//! evaluated against it. A record whose relevant feature is absent is
//! excluded from that rule — the rule does not apply, it does not fail.
//!
//! Because the threshold is dataset-relative, the same transaction can score
//! differently depending on what else is in the batch.

use crate::config::{AuditConfig, RuleWeights};
use crate::core::{FeatureRecord, RiskRule};
use chrono::{Datelike, Weekday};
use std::collections::HashSet;

/// Outcome of rule evaluation for one record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleOutcome {
    pub score: u32,
    pub triggered: Vec<RiskRule>,
}

/// Stateless rule scorer configured with weights and thresholds.
pub struct RuleEngine {
    weights: RuleWeights,
    manual_codes: HashSet<String>,
    off_hours_after: u32,
    large_amount_percentile: f64,
}

impl RuleEngine {
    pub fn from_config(config: &AuditConfig) -> Self {
        Self {
            weights: config.weights.clone(),
            manual_codes: config.manual_code_set(),
            off_hours_after: config.off_hours_after,
            large_amount_percentile: config.large_amount_percentile,
        }
    }

    /// Score every record. Pass 1 computes the batch amount threshold,
    /// pass 2 applies all rules per row.
    pub fn score_all(&self, records: &[FeatureRecord]) -> Vec<RuleOutcome> {
        let threshold = self.large_amount_threshold(records);
        records
            .iter()
            .map(|record| self.evaluate(record, threshold))
            .collect()
    }

    /// Batch statistic for the large-amount rule: the configured percentile
    /// of the non-missing amounts, linearly interpolated. `None` when the
    /// batch has no amounts at all.
    fn large_amount_threshold(&self, records: &[FeatureRecord]) -> Option<f64> {
        let mut amounts: Vec<f64> = records
            .iter()
            .filter_map(|r| r.transaction.amount)
            .filter(|a| a.is_finite())
            .collect();
        if amounts.is_empty() {
            return None;
        }
        amounts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Some(percentile(&amounts, self.large_amount_percentile))
    }

    fn evaluate(&self, record: &FeatureRecord, threshold: Option<f64>) -> RuleOutcome {
        let mut score = 0;
        let mut triggered = Vec::new();
        let mut fire = |rule: RiskRule, weight: u32| {
            score += weight;
            triggered.push(rule);
        };

        if record.is_manual == 1 {
            fire(RiskRule::ManualPosting, self.weights.manual_posting);
        }

        if let Some(hour) = record.entry_hour {
            if hour > self.off_hours_after {
                fire(RiskRule::OffHoursPosting, self.weights.off_hours);
            }
        }

        if let Some(date) = record.posting_date {
            if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                fire(RiskRule::WeekendPosting, self.weights.weekend);
            }
        }

        if let (Some(amount), Some(threshold)) = (record.transaction.amount, threshold) {
            // Inclusive so a single-row batch, whose amount is its own
            // 99th percentile, still flags.
            if amount >= threshold {
                fire(RiskRule::UnusuallyLargeAmount, self.weights.large_amount);
            }
        }

        if let Some(account) = record.transaction.account.as_deref() {
            if account.trim().starts_with('5') && record.transaction.cost_center.is_none() {
                fire(
                    RiskRule::ExpenseWithoutCostCenter,
                    self.weights.missing_cost_center,
                );
            }
        }

        RuleOutcome { score, triggered }
    }

    // Used by tests to cross-check the manual set wiring.
    #[cfg(test)]
    fn is_manual_code(&self, code: &str) -> bool {
        self.manual_codes.contains(&code.trim().to_uppercase())
    }
}

/// Linear-interpolated percentile of an ascending-sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }
    let position = (sorted.len() - 1) as f64 * q;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}
