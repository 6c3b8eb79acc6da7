//! Property tests for the join and scoring laws.

use auditmap::config::AuditConfig;
use auditmap::core::{DocumentKey, HeaderRecord, LineItemRecord};
use auditmap::pipeline::joiner::join_transactions;
use auditmap::pipeline::{features, rules::RuleEngine};
use proptest::prelude::*;

fn doc_key_strategy() -> impl Strategy<Value = DocumentKey> {
    ("[0-9]{4}", "[0-9]{1,3}", "202[0-9]")
        .prop_map(|(company, doc, year)| DocumentKey::new(company, doc, year))
}

fn header_strategy() -> impl Strategy<Value = HeaderRecord> {
    (
        doc_key_strategy(),
        proptest::option::of("[A-Z]{2}[0-9]{2}"),
    )
        .prop_map(|(key, tcode)| HeaderRecord {
            key,
            transaction_code: tcode,
            posting_date: None,
            entry_time: None,
        })
}

fn line_strategy() -> impl Strategy<Value = LineItemRecord> {
    (
        doc_key_strategy(),
        "[0-9]{3}",
        proptest::option::of(0.0f64..1_000_000.0),
    )
        .prop_map(|(key, seq, amount)| LineItemRecord {
            key,
            line_number: seq,
            account: None,
            cost_center: None,
            amount,
        })
}

proptest! {
    /// The join never drops or invents line items.
    #[test]
    fn join_cardinality_equals_line_item_count(
        headers in proptest::collection::vec(header_strategy(), 0..40),
        lines in proptest::collection::vec(line_strategy(), 0..60),
    ) {
        let joined = join_transactions(&headers, lines.clone());
        prop_assert_eq!(joined.len(), lines.len());
    }

    /// Header fields are present iff some header shares the key.
    #[test]
    fn header_fields_absent_iff_unmatched(
        headers in proptest::collection::vec(header_strategy(), 0..40),
        lines in proptest::collection::vec(line_strategy(), 0..60),
    ) {
        let keys: std::collections::HashSet<_> =
            headers.iter().map(|h| h.key.clone()).collect();
        let joined = join_transactions(&headers, lines);

        for txn in &joined {
            prop_assert_eq!(txn.header.is_some(), keys.contains(&txn.key));
        }
    }

    /// Scores are always sums over the weight subset {3, 2, 2, 3, 2}.
    #[test]
    fn rule_score_is_a_weight_subset_sum(
        headers in proptest::collection::vec(header_strategy(), 0..20),
        lines in proptest::collection::vec(line_strategy(), 1..40),
    ) {
        let config = AuditConfig::default();
        let engine = RuleEngine::from_config(&config);
        let records = features::derive_features_with(
            &config.manual_code_set(),
            join_transactions(&headers, lines),
        );

        for outcome in engine.score_all(&records) {
            let recomputed: u32 = outcome
                .triggered
                .iter()
                .map(|rule| match rule {
                    auditmap::RiskRule::ManualPosting => 3,
                    auditmap::RiskRule::OffHoursPosting => 2,
                    auditmap::RiskRule::WeekendPosting => 2,
                    auditmap::RiskRule::UnusuallyLargeAmount => 3,
                    auditmap::RiskRule::ExpenseWithoutCostCenter => 2,
                })
                .sum();
            prop_assert_eq!(outcome.score, recomputed);
            prop_assert!(outcome.score <= 12);
        }
    }

    /// Turning a record manual raises its score by exactly the manual
    /// weight, holding everything else fixed.
    #[test]
    fn manual_indicator_raises_score_by_its_weight(
        hour in proptest::option::of(0u32..24),
        amount in proptest::option::of(1.0f64..10_000.0),
    ) {
        let config = AuditConfig::default();
        let engine = RuleEngine::from_config(&config);

        let base = auditmap::FeatureRecord {
            transaction: auditmap::Transaction {
                key: DocumentKey::new("1000", "1", "2024"),
                line_number: "001".to_string(),
                account: None,
                cost_center: None,
                amount,
                header: None,
            },
            posting_date: None,
            entry_hour: hour,
            is_manual: 0,
            line_count: 1,
        };
        let mut manual = base.clone();
        manual.is_manual = 1;

        // Score both variants inside one batch so the amount threshold
        // is identical for the pair.
        let outcomes = engine.score_all(&[base, manual]);
        prop_assert_eq!(outcomes[1].score, outcomes[0].score + 3);
    }
}
