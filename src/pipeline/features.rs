//! Behavioral feature derivation.
//!
//! Pure function over the joined transaction set: adds parsed posting date,
//! entry hour, the manual-entry indicator, and per-document line counts.
//! Raw field values that fail to parse become absent features; derivation
//! itself never fails.

use crate::core::{DocumentKey, FeatureRecord, Transaction};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::collections::{HashMap, HashSet};

/// Date layouts journal extracts actually contain.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y%m%d", "%d.%m.%Y", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const TIME_FORMATS: [&str; 3] = ["%H:%M:%S", "%H:%M", "%H%M%S"];

/// Derive features for every transaction, preserving all existing fields.
pub fn derive_features(transactions: Vec<Transaction>) -> Vec<FeatureRecord> {
    derive_features_with(&default_manual_codes(), transactions)
}

/// Derive features with an explicit manual-entry code set.
pub fn derive_features_with(
    manual_codes: &HashSet<String>,
    transactions: Vec<Transaction>,
) -> Vec<FeatureRecord> {
    let line_counts = count_document_lines(&transactions);

    transactions
        .into_iter()
        .map(|txn| {
            let posting_date = txn.posting_date_raw().and_then(parse_posting_date);
            let entry_hour = txn.entry_time_raw().and_then(parse_entry_hour);
            let is_manual = manual_indicator(manual_codes, txn.transaction_code());
            let line_count = *line_counts.get(&txn.key).unwrap_or(&1);

            FeatureRecord {
                transaction: txn,
                posting_date,
                entry_hour,
                is_manual,
                line_count,
            }
        })
        .collect()
}

fn default_manual_codes() -> HashSet<String> {
    crate::config::AuditConfig::default().manual_code_set()
}

/// Parse a raw posting date. Malformed or missing input yields `None`,
/// never an error.
pub fn parse_posting_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.date());
        }
    }
    None
}

/// Extract the hour of day (0-23) from a raw entry time. Only a parseable
/// timestamp produces an hour; anything else is `None`, which downstream
/// rules treat as "does not apply" rather than midnight.
pub fn parse_entry_hour(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in TIME_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(trimmed, format) {
            return Some(time.hour());
        }
    }
    // Full timestamps also carry an entry hour
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.hour());
        }
    }
    None
}

/// 1 iff the code is in the manual-entry set. Missing and unknown codes
/// are non-manual.
fn manual_indicator(manual_codes: &HashSet<String>, code: Option<&str>) -> u8 {
    match code {
        Some(code) if manual_codes.contains(&code.trim().to_uppercase()) => 1,
        _ => 0,
    }
}

/// Line items per document key, broadcast to every row of the document.
fn count_document_lines(transactions: &[Transaction]) -> HashMap<DocumentKey, u32> {
    let mut counts: HashMap<DocumentKey, u32> = HashMap::new();
    for txn in transactions {
        *counts.entry(txn.key.clone()).or_insert(0) += 1;
    }
    counts
}
