//! Delimited-text ingestion.
//!
//! Reads header and line-item extracts into records. Column names are
//! normalized (trim, upper-case, space to underscore) and matched against
//! the standard journal-extract names with generic aliases. Blank cells
//! become absent values; unparseable amounts degrade to absent and are
//! handled downstream. Missing key columns are fatal.

use crate::core::{DocumentKey, HeaderRecord, LineItemRecord};
use crate::errors::AuditError;
use csv::StringRecord;
use std::collections::HashMap;
use std::path::Path;

/// Normalize a raw column name the way extracts are cleaned: trimmed,
/// upper-cased, spaces to underscores.
pub fn normalize_column(name: &str) -> String {
    name.trim().to_uppercase().replace(' ', "_")
}

/// Logical input fields and their accepted normalized column names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Field {
    CompanyCode,
    DocumentNumber,
    FiscalYear,
    TransactionCode,
    PostingDate,
    EntryTime,
    LineNumber,
    Account,
    CostCenter,
    Amount,
}

impl Field {
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::CompanyCode => &["BUKRS", "COMPANY_CODE"],
            Field::DocumentNumber => &["BELNR", "DOCUMENT_NUMBER"],
            Field::FiscalYear => &["GJAHR", "FISCAL_YEAR"],
            Field::TransactionCode => &["TCODE", "TRANSACTION_CODE"],
            Field::PostingDate => &["BUDAT", "POSTING_DATE"],
            Field::EntryTime => &["CPUTM", "ENTRY_TIME"],
            Field::LineNumber => &["BUZEI", "LINE_NUMBER"],
            Field::Account => &["HKONT", "ACCOUNT"],
            Field::CostCenter => &["KOSTL", "COST_CENTER"],
            Field::Amount => &["DMBTR", "AMOUNT"],
        }
    }

    fn describe(&self) -> &'static str {
        // First alias is the canonical extract name
        self.aliases()[0]
    }
}

/// Column positions resolved from a normalized header row.
struct ColumnMap {
    positions: HashMap<Field, usize>,
}

impl ColumnMap {
    fn resolve(
        path: &Path,
        headers: &StringRecord,
        required: &[Field],
        optional: &[Field],
    ) -> Result<Self, AuditError> {
        let normalized: Vec<String> = headers.iter().map(normalize_column).collect();
        let mut positions = HashMap::new();

        for field in required.iter().chain(optional) {
            let position = normalized
                .iter()
                .position(|name| field.aliases().contains(&name.as_str()));
            match position {
                Some(position) => {
                    positions.insert(*field, position);
                }
                None if required.contains(field) => {
                    return Err(AuditError::input(
                        path,
                        format!("missing required column {}", field.describe()),
                    ));
                }
                None => {
                    log::warn!(
                        "{}: column {} not found, values will be absent",
                        path.display(),
                        field.describe()
                    );
                }
            }
        }

        Ok(Self { positions })
    }

    fn get<'a>(&self, row: &'a StringRecord, field: Field) -> Option<&'a str> {
        self.positions
            .get(&field)
            .and_then(|&position| row.get(position))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    fn key(&self, row: &StringRecord) -> DocumentKey {
        DocumentKey::new(
            self.get(row, Field::CompanyCode).unwrap_or_default(),
            self.get(row, Field::DocumentNumber).unwrap_or_default(),
            self.get(row, Field::FiscalYear).unwrap_or_default(),
        )
    }
}

fn open_reader(path: &Path, delimiter: u8) -> Result<csv::Reader<std::fs::File>, AuditError> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(|e| match e.kind() {
            csv::ErrorKind::Io(_) => AuditError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            ),
            _ => AuditError::input(path, e.to_string()),
        })
}

/// Load journal-document headers from a delimited file.
pub fn load_headers(path: &Path, delimiter: u8) -> Result<Vec<HeaderRecord>, AuditError> {
    let mut reader = open_reader(path, delimiter)?;
    let headers = reader
        .headers()
        .map_err(|e| AuditError::input(path, e.to_string()))?
        .clone();
    let columns = ColumnMap::resolve(
        path,
        &headers,
        &[Field::CompanyCode, Field::DocumentNumber, Field::FiscalYear],
        &[Field::TransactionCode, Field::PostingDate, Field::EntryTime],
    )?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| AuditError::input(path, e.to_string()))?;
        records.push(HeaderRecord {
            key: columns.key(&row),
            transaction_code: columns.get(&row, Field::TransactionCode).map(String::from),
            posting_date: columns.get(&row, Field::PostingDate).map(String::from),
            entry_time: columns.get(&row, Field::EntryTime).map(String::from),
        });
    }
    log::debug!("loaded {} headers from {}", records.len(), path.display());
    Ok(records)
}

/// Load posting line items from a delimited file.
pub fn load_line_items(path: &Path, delimiter: u8) -> Result<Vec<LineItemRecord>, AuditError> {
    let mut reader = open_reader(path, delimiter)?;
    let headers = reader
        .headers()
        .map_err(|e| AuditError::input(path, e.to_string()))?
        .clone();
    let columns = ColumnMap::resolve(
        path,
        &headers,
        &[Field::CompanyCode, Field::DocumentNumber, Field::FiscalYear],
        &[
            Field::LineNumber,
            Field::Account,
            Field::CostCenter,
            Field::Amount,
        ],
    )?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| AuditError::input(path, e.to_string()))?;
        records.push(LineItemRecord {
            key: columns.key(&row),
            line_number: columns
                .get(&row, Field::LineNumber)
                .unwrap_or_default()
                .to_string(),
            account: columns.get(&row, Field::Account).map(String::from),
            cost_center: columns.get(&row, Field::CostCenter).map(String::from),
            amount: columns.get(&row, Field::Amount).and_then(parse_amount),
        });
    }
    log::debug!(
        "loaded {} line items from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

/// Parse a local-currency amount. Accepts thousands separators; an
/// unparseable value is absent, not fatal.
fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned = raw.replace(',', "");
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            log::warn!("unparseable amount '{}', treating as missing", raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn normalizes_column_names() {
        assert_eq!(normalize_column("  posting date "), "POSTING_DATE");
        assert_eq!(normalize_column("bukrs"), "BUKRS");
        assert_eq!(normalize_column("Company Code"), "COMPANY_CODE");
    }

    #[test]
    fn loads_headers_with_extract_column_names() {
        let file = write_csv(indoc! {"
            BUKRS,BELNR,GJAHR,TCODE,BUDAT,CPUTM
            1000,100,2024,FB50,2024-03-02,22:00:00
            1000,200,2024,SA01,2024-03-04,
        "});

        let headers = load_headers(file.path(), b',').unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].key, DocumentKey::new("1000", "100", "2024"));
        assert_eq!(headers[0].transaction_code.as_deref(), Some("FB50"));
        assert_eq!(headers[1].entry_time, None);
    }

    #[test]
    fn loads_headers_with_generic_column_names() {
        let file = write_csv(indoc! {"
            company code,document number,fiscal year,transaction code,posting date,entry time
            1000,100,2024,FB01,20240302,221500
        "});

        let headers = load_headers(file.path(), b',').unwrap();
        assert_eq!(headers[0].key, DocumentKey::new("1000", "100", "2024"));
        assert_eq!(headers[0].transaction_code.as_deref(), Some("FB01"));
    }

    #[test]
    fn loads_line_items_and_parses_amounts() {
        let file = write_csv(indoc! {"
            BUKRS,BELNR,GJAHR,BUZEI,HKONT,KOSTL,DMBTR
            1000,100,2024,001,500000,,100000
            1000,100,2024,002,400000,CC10,\"1,250.50\"
            1000,100,2024,003,400000,CC10,garbage
        "});

        let lines = load_line_items(file.path(), b',').unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].amount, Some(100000.0));
        assert_eq!(lines[0].cost_center, None);
        assert_eq!(lines[1].amount, Some(1250.50));
        assert_eq!(lines[2].amount, None);
    }

    #[test]
    fn missing_key_column_is_fatal() {
        let file = write_csv(indoc! {"
            BELNR,GJAHR
            100,2024
        "});

        let err = load_headers(file.path(), b',').unwrap_err();
        assert!(err.to_string().contains("missing required column BUKRS"));
    }

    #[test]
    fn missing_optional_column_yields_absent_values() {
        let file = write_csv(indoc! {"
            BUKRS,BELNR,GJAHR
            1000,100,2024
        "});

        let headers = load_headers(file.path(), b',').unwrap();
        assert_eq!(headers[0].transaction_code, None);
        assert_eq!(headers[0].posting_date, None);
    }

    #[test]
    fn semicolon_delimited_extracts_load() {
        let file = write_csv(indoc! {"
            BUKRS;BELNR;GJAHR;BUZEI;DMBTR
            1000;100;2024;001;42.5
        "});

        let lines = load_line_items(file.path(), b';').unwrap();
        assert_eq!(lines[0].amount, Some(42.5));
    }

    #[test]
    fn unknown_columns_are_ignored() {
        let file = write_csv(indoc! {"
            BUKRS,BELNR,GJAHR,WAERS,EXTRA
            1000,100,2024,EUR,x
        "});

        let headers = load_headers(file.path(), b',').unwrap();
        assert_eq!(headers.len(), 1);
    }
}
