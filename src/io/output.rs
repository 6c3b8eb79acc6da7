//! Report export.
//!
//! The scored record set is handed to a [`ReportWriter`]: CSV for
//! spreadsheet work, JSON for downstream tooling, or a colored terminal
//! summary for a quick look. Format and destination are the exporter's
//! concern; the pipeline itself never writes.

use crate::core::{AnalysisReport, RiskRule, ScoredRecord};
use colored::*;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Json,
    Terminal,
}

pub trait ReportWriter {
    fn write_report(&mut self, report: &AnalysisReport) -> anyhow::Result<()>;
}

pub fn create_writer<W: Write + 'static>(format: ReportFormat, writer: W) -> Box<dyn ReportWriter> {
    match format {
        ReportFormat::Csv => Box::new(CsvWriter::new(writer)),
        ReportFormat::Json => Box::new(JsonWriter::new(writer)),
        ReportFormat::Terminal => Box::new(TerminalWriter::new(writer)),
    }
}

pub struct JsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> ReportWriter for JsonWriter<W> {
    fn write_report(&mut self, report: &AnalysisReport) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        self.writer.write_all(json.as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

pub struct CsvWriter<W: Write> {
    writer: W,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> ReportWriter for CsvWriter<W> {
    fn write_report(&mut self, report: &AnalysisReport) -> anyhow::Result<()> {
        let mut csv_writer = csv::Writer::from_writer(&mut self.writer);
        csv_writer.write_record([
            "COMPANY_CODE",
            "DOCUMENT_NUMBER",
            "FISCAL_YEAR",
            "LINE_NUMBER",
            "ACCOUNT",
            "COST_CENTER",
            "AMOUNT",
            "TRANSACTION_CODE",
            "POSTING_DATE",
            "ENTRY_HOUR",
            "IS_MANUAL",
            "LINE_COUNT",
            "RULE_SCORE",
            "TRIGGERED_RULES",
            "ANOMALY_FLAG",
            "FINAL_RISK_SCORE",
        ])?;

        for record in &report.records {
            csv_writer.write_record(record_row(record))?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

fn record_row(record: &ScoredRecord) -> Vec<String> {
    let txn = &record.record.transaction;
    let triggered = record
        .triggered_rules
        .iter()
        .map(RiskRule::label)
        .collect::<Vec<_>>()
        .join("; ");

    vec![
        txn.key.company_code.clone(),
        txn.key.document_number.clone(),
        txn.key.fiscal_year.clone(),
        txn.line_number.clone(),
        txn.account.clone().unwrap_or_default(),
        txn.cost_center.clone().unwrap_or_default(),
        txn.amount.map(|a| a.to_string()).unwrap_or_default(),
        txn.transaction_code().unwrap_or_default().to_string(),
        record
            .record
            .posting_date
            .map(|d| d.to_string())
            .unwrap_or_default(),
        record
            .record
            .entry_hour
            .map(|h| h.to_string())
            .unwrap_or_default(),
        record.record.is_manual.to_string(),
        record.record.line_count.to_string(),
        record.rule_score.to_string(),
        triggered,
        record
            .anomaly_flag
            .map(|f| f.to_string())
            .unwrap_or_default(),
        format_score(record.final_score),
    ]
}

fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{}", score as i64)
    } else {
        format!("{:.2}", score)
    }
}

/// Human-readable summary plus the highest-risk rows.
pub struct TerminalWriter<W: Write> {
    writer: W,
    top: usize,
}

impl<W: Write> TerminalWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, top: 10 }
    }

    fn write_summary(&mut self, report: &AnalysisReport) -> anyhow::Result<()> {
        let summary = &report.summary;
        writeln!(self.writer, "{}", "Audit Risk Analysis".bold())?;
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "  Mode:          {}",
            report.mode.as_str().cyan()
        )?;
        writeln!(self.writer, "  Transactions:  {}", summary.transactions)?;
        writeln!(self.writer, "  Documents:     {}", summary.documents)?;
        if let Some(anomalies) = summary.anomalies {
            writeln!(self.writer, "  Outliers:      {}", anomalies)?;
        }
        writeln!(
            self.writer,
            "  Final score:   max {:.1}, mean {:.2}",
            summary.max_final_score, summary.mean_final_score
        )?;
        writeln!(self.writer)?;

        writeln!(self.writer, "{}", "Rule triggers".bold())?;
        for tally in &summary.rule_triggers {
            writeln!(self.writer, "  {:<28} {}", tally.rule.label(), tally.count)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_top_risks(&mut self, report: &AnalysisReport) -> anyhow::Result<()> {
        let mut ranked: Vec<&ScoredRecord> = report.records.iter().collect();
        ranked.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        writeln!(self.writer, "{}", "Highest risk".bold())?;
        for record in ranked.iter().take(self.top) {
            if record.final_score <= 0.0 {
                break;
            }
            let txn = &record.record.transaction;
            let score = format!("{:>5.1}", record.final_score);
            let colored_score = if record.final_score >= 8.0 {
                score.red()
            } else if record.final_score >= 4.0 {
                score.yellow()
            } else {
                score.normal()
            };
            writeln!(
                self.writer,
                "  {} doc {}/{}/{} line {} - {}",
                colored_score,
                txn.key.company_code,
                txn.key.document_number,
                txn.key.fiscal_year,
                txn.line_number,
                record
                    .triggered_rules
                    .iter()
                    .map(RiskRule::label)
                    .collect::<Vec<_>>()
                    .join(", "),
            )?;
        }
        Ok(())
    }
}

impl<W: Write> ReportWriter for TerminalWriter<W> {
    fn write_report(&mut self, report: &AnalysisReport) -> anyhow::Result<()> {
        self.write_summary(report)?;
        self.write_top_risks(report)?;
        Ok(())
    }
}
