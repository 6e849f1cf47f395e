//! Ground-truth import from CSV or XLSX
//!
//! An upload has one row per call: a `Call ID` column plus one column per KPI
//! of the persona. A CSV is read as is; an XLSX workbook is read from its
//! `Parameters` sheet. Every row becomes a JSON object of header to typed
//! cell and is stored as the persona's ground truth for that call. Rows
//! without a usable call id (empty, or `not found` as written by the human
//! reviewers) are skipped and reported.

use std::io::{Read, Seek};

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use callscore_common::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::{debug, info, warn};

use crate::loader::{FsStore, RecordLoader};
use crate::scoring::merge::{is_call_id_key, CALL_ID_FIELD};

/// Call id placeholder for calls the reviewers could not match
const NOT_FOUND_ID: &str = "not found";

/// Worksheet holding the ground truth in an XLSX upload
pub const GROUND_TRUTH_SHEET: &str = "Parameters";

/// MIME type of an XLSX workbook
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Zip local file header; every XLSX file starts with it
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Upload file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroundTruthFormat {
    Csv,
    Xlsx,
}

impl GroundTruthFormat {
    /// Pick the format from a content type, falling back to the leading bytes
    pub fn detect(content_type: Option<&str>, body: &[u8]) -> Self {
        let declared_xlsx = content_type
            .and_then(|value| value.split(';').next())
            .map(|mime| mime.trim().eq_ignore_ascii_case(XLSX_CONTENT_TYPE))
            .unwrap_or(false);
        if declared_xlsx || body.starts_with(ZIP_MAGIC) {
            GroundTruthFormat::Xlsx
        } else {
            GroundTruthFormat::Csv
        }
    }

    /// Pick the format from a file extension (`.xlsx`, otherwise CSV)
    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xlsx") => GroundTruthFormat::Xlsx,
            _ => GroundTruthFormat::Csv,
        }
    }
}

/// A data row that was not imported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRow {
    /// 1-based data row number (header excluded)
    pub row: usize,
    pub reason: String,
}

/// Records parsed from a ground-truth upload
#[derive(Debug, Clone, Default)]
pub struct ParsedGroundTruth {
    /// (call id, record) in file order
    pub records: Vec<(String, Value)>,
    pub skipped: Vec<SkippedRow>,
}

/// Result of importing ground truth for a persona
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub persona: String,
    /// Call ids stored, in file order
    pub imported: Vec<String>,
    pub skipped: Vec<SkippedRow>,
}

/// Parse a ground-truth CSV, checking that every KPI column and the call id
/// column are present
pub fn parse_ground_truth_csv<R, S>(reader: R, kpis: &[S]) -> Result<ParsedGroundTruth>
where
    R: Read,
    S: AsRef<str>,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(str::to_string)
        .collect();
    let id_column = required_id_column(&headers, kpis)?;

    let mut parsed = ParsedGroundTruth::default();

    for (index, row) in csv_reader.records().enumerate() {
        let row_number = index + 1;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                parsed.skipped.push(SkippedRow {
                    row: row_number,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let call_id = row.get(id_column).unwrap_or("").trim();
        push_row(&mut parsed, &headers, id_column, row_number, call_id, |column| {
            typed_cell(row.get(column).unwrap_or(""))
        });
    }

    Ok(parsed)
}

/// Parse the `Parameters` sheet of an XLSX workbook; the first row holds the
/// headers
pub fn parse_ground_truth_xlsx<R, S>(reader: R, kpis: &[S]) -> Result<ParsedGroundTruth>
where
    R: Read + Seek,
    S: AsRef<str>,
{
    let mut workbook: Xlsx<R> = open_workbook_from_rs(reader).map_err(xlsx_error)?;
    if !workbook
        .sheet_names()
        .iter()
        .any(|name| name == GROUND_TRUTH_SHEET)
    {
        return Err(Error::InvalidInput(format!(
            "workbook has no '{}' sheet",
            GROUND_TRUTH_SHEET
        )));
    }
    let range = workbook
        .worksheet_range(GROUND_TRUTH_SHEET)
        .map_err(xlsx_error)?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|header_row| {
            header_row
                .iter()
                .map(|cell| cell_text(cell).trim().to_string())
                .collect()
        })
        .unwrap_or_default();
    let id_column = required_id_column(&headers, kpis)?;
    debug!(columns = headers.len(), "Read XLSX ground-truth headers");

    let mut parsed = ParsedGroundTruth::default();

    for (index, row) in rows.enumerate() {
        let call_id = row.get(id_column).map(cell_text).unwrap_or_default();
        push_row(
            &mut parsed,
            &headers,
            id_column,
            index + 1,
            call_id.trim(),
            |column| row.get(column).map(typed_xlsx_cell).unwrap_or(Value::Null),
        );
    }

    Ok(parsed)
}

/// Import a ground-truth CSV for a persona and store one record per call
pub fn import_ground_truth_csv<R: Read>(
    store: &FsStore,
    persona: &str,
    reader: R,
) -> Result<ImportOutcome> {
    let kpis = persona_kpis(store, persona)?;
    let parsed = parse_ground_truth_csv(reader, &kpis)?;
    store_parsed(store, persona, parsed)
}

/// Import the `Parameters` sheet of an XLSX workbook for a persona
pub fn import_ground_truth_xlsx<R: Read + Seek>(
    store: &FsStore,
    persona: &str,
    reader: R,
) -> Result<ImportOutcome> {
    let kpis = persona_kpis(store, persona)?;
    let parsed = parse_ground_truth_xlsx(reader, &kpis)?;
    store_parsed(store, persona, parsed)
}

/// Import an upload held in memory in the given format
pub fn import_ground_truth(
    store: &FsStore,
    persona: &str,
    format: GroundTruthFormat,
    content: &[u8],
) -> Result<ImportOutcome> {
    match format {
        GroundTruthFormat::Csv => import_ground_truth_csv(store, persona, content),
        GroundTruthFormat::Xlsx => {
            import_ground_truth_xlsx(store, persona, std::io::Cursor::new(content))
        }
    }
}

fn persona_kpis(store: &FsStore, persona: &str) -> Result<Vec<String>> {
    let kpis = store.list_kpis(persona)?;
    if kpis.is_empty() {
        return Err(Error::InvalidInput(format!(
            "persona '{}' has no KPIs defined",
            persona
        )));
    }
    Ok(kpis)
}

fn store_parsed(store: &FsStore, persona: &str, parsed: ParsedGroundTruth) -> Result<ImportOutcome> {
    for row in &parsed.skipped {
        warn!(persona = %persona, row = row.row, reason = %row.reason, "Skipping ground-truth row");
    }

    let mut imported = Vec::with_capacity(parsed.records.len());
    for (call_id, record) in &parsed.records {
        store.save_ground_truth(persona, call_id, record)?;
        imported.push(call_id.clone());
    }

    info!(
        persona = %persona,
        imported = imported.len(),
        skipped = parsed.skipped.len(),
        "Ground truth imported"
    );

    Ok(ImportOutcome {
        persona: persona.to_string(),
        imported,
        skipped: parsed.skipped,
    })
}

/// Index of the call id column; errors name every missing required column
fn required_id_column<S: AsRef<str>>(headers: &[String], kpis: &[S]) -> Result<usize> {
    let id_column = headers.iter().position(|header| is_call_id_key(header));

    let mut missing: Vec<String> = kpis
        .iter()
        .map(|kpi| kpi.as_ref())
        .filter(|kpi| !headers.iter().any(|header| header.as_str() == *kpi))
        .map(str::to_string)
        .collect();
    if id_column.is_none() {
        missing.push(CALL_ID_FIELD.to_string());
    }

    match id_column {
        Some(index) if missing.is_empty() => Ok(index),
        _ => Err(Error::InvalidInput(format!(
            "upload is missing required columns: {}",
            missing.join(", ")
        ))),
    }
}

/// Check the call id and append the row as a record or a skip
fn push_row<F>(
    parsed: &mut ParsedGroundTruth,
    headers: &[String],
    id_column: usize,
    row_number: usize,
    call_id: &str,
    cell: F,
) where
    F: Fn(usize) -> Value,
{
    if call_id.is_empty() || call_id.eq_ignore_ascii_case(NOT_FOUND_ID) {
        parsed.skipped.push(SkippedRow {
            row: row_number,
            reason: format!("no call id ({:?})", call_id),
        });
        return;
    }
    if call_id.starts_with('.') || call_id.contains(|c: char| c == '/' || c == '\\') {
        parsed.skipped.push(SkippedRow {
            row: row_number,
            reason: format!("call id {:?} is not a valid record name", call_id),
        });
        return;
    }

    let mut record = Map::new();
    for (column, header) in headers.iter().enumerate() {
        let value = if column == id_column {
            Value::String(call_id.to_string())
        } else {
            cell(column)
        };
        record.insert(header.clone(), value);
    }
    parsed.records.push((call_id.to_string(), Value::Object(record)));
}

/// Type a CSV cell: empty → null, true/false → bool, then integer, float, text
fn typed_cell(raw: &str) -> Value {
    let text = raw.trim();
    if text.is_empty() {
        return Value::Null;
    }
    if text.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(n) = text.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = text.parse::<f64>() {
        // NaN and infinities have no JSON form
        return Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null);
    }
    Value::String(text.to_string())
}

/// Type a worksheet cell; text cells follow the CSV rules
fn typed_xlsx_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::Bool(b) => Value::Bool(*b),
        Data::Int(n) => Value::from(*n),
        Data::Float(f) => float_value(*f),
        Data::String(text) => typed_cell(text),
        other => Value::String(other.to_string()),
    }
}

/// Workbooks store every number as a float; whole numbers come back as integers
fn float_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        return Value::from(f as i64);
    }
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// Cell as text, for headers and call ids
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            (*f as i64).to_string()
        }
        other => other.to_string(),
    }
}

fn csv_error(e: csv::Error) -> Error {
    Error::InvalidInput(format!("invalid CSV: {}", e))
}

fn xlsx_error(e: calamine::XlsxError) -> Error {
    Error::InvalidInput(format!("invalid XLSX: {}", e))
}
