//! End-to-end pipeline scenarios over in-memory record sets.

use auditmap::config::{AnalysisMode, AuditConfig};
use auditmap::core::{DocumentKey, HeaderRecord, LineItemRecord, RiskRule};
use auditmap::pipeline::AnalysisPipeline;
use auditmap::progress::NullSink;
use pretty_assertions::assert_eq;

fn header(doc: &str, tcode: &str, date: &str, time: &str) -> HeaderRecord {
    HeaderRecord {
        key: DocumentKey::new("1000", doc, "2024"),
        transaction_code: Some(tcode.to_string()),
        posting_date: Some(date.to_string()),
        entry_time: Some(time.to_string()),
    }
}

fn line(doc: &str, seq: &str, account: &str, cost_center: Option<&str>, amount: f64) -> LineItemRecord {
    LineItemRecord {
        key: DocumentKey::new("1000", doc, "2024"),
        line_number: seq.to_string(),
        account: Some(account.to_string()),
        cost_center: cost_center.map(str::to_string),
        amount: Some(amount),
    }
}

fn pipeline(mode: AnalysisMode) -> AnalysisPipeline {
    let mut config = AuditConfig::default();
    config.mode = mode;
    AnalysisPipeline::new(config).unwrap()
}

#[test]
fn worst_case_single_transaction_triggers_every_rule() {
    // Manual FB50 entry at 22:00 on a Saturday, expense account with no
    // cost center, and the only amount in the batch (so it sits at its own
    // 99th percentile).
    let headers = vec![header("100", "FB50", "2024-03-02", "22:00:00")];
    let lines = vec![line("100", "001", "500000", None, 100_000.0)];

    let scored = pipeline(AnalysisMode::Separate)
        .run(headers, lines, &NullSink)
        .unwrap();

    assert_eq!(scored.len(), 1);
    let record = &scored[0];
    assert_eq!(record.record.is_manual, 1);
    assert_eq!(record.record.entry_hour, Some(22));
    assert_eq!(record.record.line_count, 1);
    assert_eq!(record.rule_score, 3 + 2 + 2 + 3 + 2);
    assert_eq!(record.final_score, 12.0);
    assert_eq!(record.triggered_rules.len(), 5);
    assert!(record.triggered_rules.contains(&RiskRule::WeekendPosting));
    assert!(record
        .triggered_rules
        .contains(&RiskRule::ExpenseWithoutCostCenter));
}

#[test]
fn complete_mode_final_score_is_rule_score_plus_weighted_flag() {
    let headers: Vec<HeaderRecord> = (0..100)
        .map(|i| header(&format!("{}", i), "SA01", "2024-03-04", "10:00:00"))
        .collect();
    let mut lines: Vec<LineItemRecord> = (0..99)
        .map(|i| {
            line(
                &format!("{}", i),
                "001",
                "400000",
                Some("CC10"),
                100.0 + (i % 5) as f64,
            )
        })
        .collect();
    // one wild row
    lines.push(line("99", "001", "400000", Some("CC10"), 9_000_000.0));

    let scored = pipeline(AnalysisMode::Complete)
        .run(headers, lines, &NullSink)
        .unwrap();

    for record in &scored {
        let flag = record.anomaly_flag.expect("complete mode always flags") as f64;
        assert_eq!(record.final_score, record.rule_score as f64 + 3.0 * flag);
    }

    let flagged = scored.iter().filter(|r| r.anomaly_flag == Some(1)).count();
    assert_eq!(flagged, 2); // round(0.02 * 100)
}

#[test]
fn separate_mode_skips_the_detector_entirely() {
    let headers = vec![header("100", "SA01", "2024-03-04", "10:00:00")];
    let lines = vec![line("100", "001", "400000", Some("CC10"), 50.0)];

    let scored = pipeline(AnalysisMode::Separate)
        .run(headers, lines, &NullSink)
        .unwrap();

    assert_eq!(scored[0].anomaly_flag, None);
    assert_eq!(scored[0].final_score, scored[0].rule_score as f64);
}

#[test]
fn unmatched_line_items_score_without_header_features() {
    // No header at all: no manual/off-hours/weekend features, but the
    // line-side rules still apply.
    let lines = vec![line("777", "001", "500000", None, 10.0)];

    let scored = pipeline(AnalysisMode::Separate)
        .run(vec![], lines, &NullSink)
        .unwrap();

    assert_eq!(scored.len(), 1);
    let record = &scored[0];
    assert_eq!(record.record.transaction.header, None);
    assert_eq!(record.record.is_manual, 0);
    assert_eq!(record.record.posting_date, None);
    // expense-without-cost-center and the (single-row) large-amount rule
    assert_eq!(record.rule_score, 2 + 3);
}

#[test]
fn malformed_dates_and_times_degrade_to_absent_features() {
    let headers = vec![header("100", "SA01", "someday", "late evening")];
    let lines = vec![line("100", "001", "400000", Some("CC10"), 50.0)];

    let scored = pipeline(AnalysisMode::Separate)
        .run(headers, lines, &NullSink)
        .unwrap();

    let record = &scored[0];
    assert_eq!(record.record.posting_date, None);
    assert_eq!(record.record.entry_hour, None);
    // neither the weekend nor the off-hours rule fires
    assert!(!record.triggered_rules.contains(&RiskRule::WeekendPosting));
    assert!(!record.triggered_rules.contains(&RiskRule::OffHoursPosting));
}

#[test]
fn line_counts_are_broadcast_across_multi_line_documents() {
    let headers = vec![header("100", "SA01", "2024-03-04", "10:00:00")];
    let lines = vec![
        line("100", "001", "400000", Some("CC10"), 10.0),
        line("100", "002", "400000", Some("CC10"), 20.0),
        line("100", "003", "400000", Some("CC10"), 30.0),
    ];

    let scored = pipeline(AnalysisMode::Separate)
        .run(headers, lines, &NullSink)
        .unwrap();

    assert!(scored.iter().all(|r| r.record.line_count == 3));
}

#[test]
fn anomaly_selection_is_stable_across_runs() {
    let headers: Vec<HeaderRecord> = (0..200)
        .map(|i| header(&format!("{}", i), "SA01", "2024-03-04", "10:00:00"))
        .collect();
    let lines: Vec<LineItemRecord> = (0..200)
        .map(|i| {
            line(
                &format!("{}", i),
                "001",
                "400000",
                Some("CC10"),
                (100 + 13 * (i % 17)) as f64,
            )
        })
        .collect();

    let first = pipeline(AnalysisMode::Complete)
        .run(headers.clone(), lines.clone(), &NullSink)
        .unwrap();
    let second = pipeline(AnalysisMode::Complete)
        .run(headers, lines, &NullSink)
        .unwrap();

    let flags = |scored: &[auditmap::ScoredRecord]| {
        scored
            .iter()
            .map(|r| r.anomaly_flag.unwrap())
            .collect::<Vec<u8>>()
    };
    assert_eq!(flags(&first), flags(&second));
    assert_eq!(
        flags(&first).iter().filter(|&&f| f == 1).count(),
        4 // round(0.02 * 200)
    );
}

#[test]
fn empty_inputs_produce_an_empty_report() {
    let scored = pipeline(AnalysisMode::Complete)
        .run(vec![], vec![], &NullSink)
        .unwrap();
    assert!(scored.is_empty());
}
