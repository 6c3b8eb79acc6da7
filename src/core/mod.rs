//! Core record types for the analysis pipeline.
//!
//! Each pipeline stage consumes one record set and produces a new, extended
//! one: line items and headers join into [`Transaction`]s, features are
//! derived into [`FeatureRecord`]s, and scoring yields [`ScoredRecord`]s.
//! Records are immutable snapshots scoped to a single analysis run.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Natural key identifying a journal document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentKey {
    pub company_code: String,
    pub document_number: String,
    pub fiscal_year: String,
}

impl DocumentKey {
    pub fn new(
        company_code: impl Into<String>,
        document_number: impl Into<String>,
        fiscal_year: impl Into<String>,
    ) -> Self {
        Self {
            company_code: company_code.into(),
            document_number: document_number.into(),
            fiscal_year: fiscal_year.into(),
        }
    }
}

/// One row per journal document (document-level attributes).
///
/// Date and time are kept as raw strings here; parsing happens during
/// feature derivation so malformed values degrade to absent features
/// instead of failing ingestion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeaderRecord {
    pub key: DocumentKey,
    pub transaction_code: Option<String>,
    pub posting_date: Option<String>,
    pub entry_time: Option<String>,
}

/// One row per posting line within a document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItemRecord {
    pub key: DocumentKey,
    pub line_number: String,
    pub account: Option<String>,
    pub cost_center: Option<String>,
    pub amount: Option<f64>,
}

/// Header attributes attached to a joined transaction.
///
/// Grouping the header side keeps line and header provenance distinct
/// without column renaming.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeaderAttributes {
    pub transaction_code: Option<String>,
    pub posting_date: Option<String>,
    pub entry_time: Option<String>,
}

impl From<&HeaderRecord> for HeaderAttributes {
    fn from(header: &HeaderRecord) -> Self {
        Self {
            transaction_code: header.transaction_code.clone(),
            posting_date: header.posting_date.clone(),
            entry_time: header.entry_time.clone(),
        }
    }
}

/// A line item with its document header attached.
///
/// `header` is `None` when no header shares the document key; the line
/// row itself is always preserved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub key: DocumentKey,
    pub line_number: String,
    pub account: Option<String>,
    pub cost_center: Option<String>,
    pub amount: Option<f64>,
    pub header: Option<HeaderAttributes>,
}

impl Transaction {
    pub fn transaction_code(&self) -> Option<&str> {
        self.header
            .as_ref()
            .and_then(|h| h.transaction_code.as_deref())
    }

    pub fn posting_date_raw(&self) -> Option<&str> {
        self.header.as_ref().and_then(|h| h.posting_date.as_deref())
    }

    pub fn entry_time_raw(&self) -> Option<&str> {
        self.header.as_ref().and_then(|h| h.entry_time.as_deref())
    }
}

/// Transaction extended with derived behavioral features.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(flatten)]
    pub transaction: Transaction,
    /// Parsed posting date; `None` when the raw value was missing or
    /// unparseable.
    pub posting_date: Option<NaiveDate>,
    /// Hour of day (0-23) the entry was captured; `None` when the raw
    /// time was missing or unparseable. Distinct from hour 0.
    pub entry_hour: Option<u32>,
    /// 1 when the transaction code belongs to the manual-entry code set.
    pub is_manual: u8,
    /// Number of line items sharing this document key.
    pub line_count: u32,
}

/// An audit-risk rule evaluated by the rule engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskRule {
    ManualPosting,
    OffHoursPosting,
    WeekendPosting,
    UnusuallyLargeAmount,
    ExpenseWithoutCostCenter,
}

impl RiskRule {
    pub const ALL: [RiskRule; 5] = [
        RiskRule::ManualPosting,
        RiskRule::OffHoursPosting,
        RiskRule::WeekendPosting,
        RiskRule::UnusuallyLargeAmount,
        RiskRule::ExpenseWithoutCostCenter,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RiskRule::ManualPosting => "manual posting",
            RiskRule::OffHoursPosting => "off-hours posting",
            RiskRule::WeekendPosting => "weekend posting",
            RiskRule::UnusuallyLargeAmount => "unusually large amount",
            RiskRule::ExpenseWithoutCostCenter => "expense without cost center",
        }
    }
}

impl std::fmt::Display for RiskRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Feature record extended with rule and model scores.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    #[serde(flatten)]
    pub record: FeatureRecord,
    /// Sum of the weights of all triggered rules.
    pub rule_score: u32,
    /// Which rules fired, for explainability in the report.
    pub triggered_rules: Vec<RiskRule>,
    /// Outlier flag from the anomaly detector; `None` when the detector
    /// did not run (rules-only mode).
    pub anomaly_flag: Option<u8>,
    /// Combined risk score per the configured analysis mode.
    pub final_score: f64,
}

/// Per-rule trigger count across a scored record set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleTally {
    pub rule: RiskRule,
    pub count: usize,
}

/// Aggregate figures for a scored record set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub transactions: usize,
    pub documents: usize,
    pub rule_triggers: Vec<RuleTally>,
    /// Flagged-outlier count; `None` in rules-only mode.
    pub anomalies: Option<usize>,
    pub max_final_score: f64,
    pub mean_final_score: f64,
}

/// Final analysis output handed to the report writers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub timestamp: DateTime<Utc>,
    pub mode: String,
    pub summary: ReportSummary,
    pub records: Vec<ScoredRecord>,
}

impl AnalysisReport {
    pub fn new(mode: &str, records: Vec<ScoredRecord>) -> Self {
        let summary = summarize(&records);
        Self {
            timestamp: Utc::now(),
            mode: mode.to_string(),
            summary,
            records,
        }
    }
}

fn summarize(records: &[ScoredRecord]) -> ReportSummary {
    let documents = records
        .iter()
        .map(|r| &r.record.transaction.key)
        .collect::<std::collections::HashSet<_>>()
        .len();

    let rule_triggers = RiskRule::ALL
        .iter()
        .map(|rule| RuleTally {
            rule: *rule,
            count: records
                .iter()
                .filter(|r| r.triggered_rules.contains(rule))
                .count(),
        })
        .collect();

    let anomalies = if records.iter().any(|r| r.anomaly_flag.is_some()) {
        Some(
            records
                .iter()
                .filter(|r| r.anomaly_flag == Some(1))
                .count(),
        )
    } else {
        None
    };

    let max_final_score = records.iter().map(|r| r.final_score).fold(0.0, f64::max);
    let mean_final_score = if records.is_empty() {
        0.0
    } else {
        records.iter().map(|r| r.final_score).sum::<f64>() / records.len() as f64
    };

    ReportSummary {
        transactions: records.len(),
        documents,
        rule_triggers,
        anomalies,
        max_final_score,
        mean_final_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scored(doc: &str, rule_score: u32, flag: Option<u8>) -> ScoredRecord {
        ScoredRecord {
            record: FeatureRecord {
                transaction: Transaction {
                    key: DocumentKey::new("1000", doc, "2024"),
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
            },
            rule_score,
            triggered_rules: vec![],
            anomaly_flag: flag,
            final_score: rule_score as f64,
        }
    }

    #[test]
    fn summary_counts_distinct_documents() {
        let records = vec![
            scored("100", 0, None),
            scored("100", 2, None),
            scored("200", 5, None),
        ];
        let summary = summarize(&records);
        assert_eq!(summary.transactions, 3);
        assert_eq!(summary.documents, 2);
        assert_eq!(summary.anomalies, None);
    }

    #[test]
    fn summary_reports_anomaly_count_when_detector_ran() {
        let records = vec![scored("100", 0, Some(1)), scored("200", 0, Some(0))];
        let summary = summarize(&records);
        assert_eq!(summary.anomalies, Some(1));
    }

    #[test]
    fn summary_of_empty_set_is_all_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.transactions, 0);
        assert_eq!(summary.mean_final_score, 0.0);
        assert_eq!(summary.max_final_score, 0.0);
    }
}
