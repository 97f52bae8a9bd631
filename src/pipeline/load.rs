use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use tracing::info;

use crate::frame::{ColumnType, Frame, Value};

/// Number of report-framing rows preceding the header row.
const FRAMING_ROWS: usize = 9;

/// Identifier columns whose raw values arrive wrapped in brackets
/// (`"[482910]"`); they are stripped and coerced to nullable integers.
const BRACKETED_ID_COLUMNS: [&str; 2] = ["Ad group ID", "Ad ID"];

/// Parse the raw report at `path` into a typed table.
///
/// The first nine rows are framing and skipped; the row after them names the
/// columns; the final row is a summary footer and dropped by position.
/// Columns named in `file_types` are coerced to their declared type, the
/// bracketed identifier columns are stripped and coerced, and everything
/// else stays a raw string. Any read or coercion failure aborts the run.
#[tracing::instrument(level = "info", skip(path, file_types), fields(path = %path.display()))]
pub fn load(path: &Path, file_types: &BTreeMap<String, ColumnType>) -> Result<Frame> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening report file {}", path.display()))?;

    let mut records = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error at line {}", i + 1))?;
        records.push(record);
    }

    if records.len() < FRAMING_ROWS + 2 {
        bail!(
            "report too short: {} rows, expected at least {} framing rows, a header row and a footer row",
            records.len(),
            FRAMING_ROWS
        );
    }

    let mut data = records.split_off(FRAMING_ROWS);
    let header = data.remove(0);
    let columns: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();

    // The last row is the report footer; drop it by position, never by content.
    data.pop();

    for name in file_types.keys() {
        if !columns.iter().any(|c| c == name) {
            bail!("typed column `{}` is missing from the report header", name);
        }
    }

    let mut table = Frame::new(columns.clone());
    for (row_idx, record) in data.iter().enumerate() {
        if record.len() != columns.len() {
            bail!(
                "data row {} has {} fields, expected {}",
                row_idx + 1,
                record.len(),
                columns.len()
            );
        }
        let mut row = Vec::with_capacity(columns.len());
        for (name, raw) in columns.iter().zip(record.iter()) {
            let value = if BRACKETED_ID_COLUMNS.contains(&name.as_str()) {
                Value::coerce_bracketed(name, raw)
            } else if let Some(&ty) = file_types.get(name) {
                Value::coerce(name, raw, ty)
            } else {
                Ok(Value::Str(raw.to_string()))
            };
            row.push(value.with_context(|| format!("coercing data row {}", row_idx + 1))?);
        }
        table.push_row(row)?;
    }

    info!(
        rows = table.n_rows(),
        columns = table.columns().len(),
        "report loaded"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_report(rows: &[&str]) -> NamedTempFile {
        let mut framing = String::new();
        framing.push_str("Report name: Ad performance report\n");
        framing.push_str("Report time: 1/1/2023 - 1/31/2023\n");
        for i in 3..=9 {
            framing.push_str(&format!("Framing line {}\n", i));
        }
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(framing.as_bytes()).unwrap();
        for row in rows {
            writeln!(tmp, "{}", row).unwrap();
        }
        tmp.flush().unwrap();
        tmp
    }

    fn types() -> BTreeMap<String, ColumnType> {
        [
            ("Gregorian date".to_string(), ColumnType::Date),
            ("Account number".to_string(), ColumnType::Integer),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn skips_framing_and_drops_footer() {
        let tmp = write_report(&[
            "Gregorian date,Account number,Ad ID,Clicks",
            "2023-01-05,42,[482910],10",
            "2023-01-02,42,[],3",
            "Total,,,13",
        ]);
        let table = load(tmp.path(), &types()).unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(
            table.rows()[0][0],
            Value::Date(NaiveDate::from_ymd_opt(2023, 1, 5).unwrap())
        );
        assert_eq!(table.rows()[0][1], Value::Int(42));
        assert_eq!(table.rows()[0][2], Value::Int(482910));
        assert_eq!(table.rows()[1][2], Value::Null);
        // Untyped measure columns stay raw strings.
        assert_eq!(table.rows()[0][3], Value::Str("10".to_string()));
    }

    #[test]
    fn coercion_failure_names_column_and_value() {
        let tmp = write_report(&[
            "Gregorian date,Account number,Ad ID,Clicks",
            "2023-01-05,not-a-number,[1],10",
            "Total,,,10",
        ]);
        let err = load(tmp.path(), &types()).unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("Account number"), "{}", msg);
        assert!(msg.contains("not-a-number"), "{}", msg);
    }

    #[test]
    fn missing_typed_column_is_fatal() {
        let tmp = write_report(&[
            "Gregorian date,Ad ID,Clicks",
            "2023-01-05,[1],10",
            "Total,,10",
        ]);
        let err = load(tmp.path(), &types()).unwrap_err();
        assert!(format!("{:#}", err).contains("Account number"));
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = load(Path::new("/no/such/report.csv"), &types()).unwrap_err();
        assert!(format!("{:#}", err).contains("report.csv"));
    }
}
