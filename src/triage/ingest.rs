//! Upload parsing, structural validation and message cleaning.
//!
//! Records are kept as open-ended JSON objects so arbitrary metadata
//! survives untouched; only `message` is normalized.

use crate::core::{IngestError, Limits};
use serde_json::{Map, Number, Value};

/// One complaint as uploaded: arbitrary fields plus `message`.
pub type ComplaintRecord = Map<String, Value>;

/// CSV columns that may hold the complaint text, in preference order.
pub const TEXT_COLUMNS: [&str; 4] = ["message", "text", "complaint", "description"];

const MESSAGE_FIELD: &str = "message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Json,
    Csv,
}

impl UploadFormat {
    /// Pick the parser from the uploaded filename's extension.
    pub fn from_filename(filename: &str) -> Result<Self, IngestError> {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".json") {
            Ok(UploadFormat::Json)
        } else if lower.ends_with(".csv") {
            Ok(UploadFormat::Csv)
        } else {
            Err(IngestError::UnsupportedFormat)
        }
    }
}

/// A record that survived cleaning, paired with its normalized message.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedComplaint {
    pub record: ComplaintRecord,
    pub message: String,
}

impl CleanedComplaint {
    /// The record's `id`, or `null` when it has none.
    pub fn id(&self) -> Value {
        self.record.get("id").cloned().unwrap_or(Value::Null)
    }
}

/// Parse, validate and clean an upload in one step.
pub fn ingest(
    filename: &str,
    bytes: &[u8],
    limits: &Limits,
) -> Result<Vec<CleanedComplaint>, IngestError> {
    let records = parse_upload(filename, bytes, limits)?;
    let parsed = records.len();
    let cleaned = clean_records(records, limits)?;
    tracing::info!(
        filename,
        parsed,
        kept = cleaned.len(),
        dropped = parsed - cleaned.len(),
        "ingested complaint upload"
    );
    Ok(cleaned)
}

/// Parse the upload into records and enforce the record-count limits.
pub fn parse_upload(
    filename: &str,
    bytes: &[u8],
    limits: &Limits,
) -> Result<Vec<ComplaintRecord>, IngestError> {
    let bytes = strip_bom(bytes);
    let records = match UploadFormat::from_filename(filename)? {
        UploadFormat::Json => parse_json(bytes)?,
        UploadFormat::Csv => parse_csv(bytes)?,
    };

    if records.is_empty() {
        return Err(IngestError::EmptyInput);
    }
    if records.len() > limits.max_records {
        return Err(IngestError::TooLarge {
            count: records.len(),
            max: limits.max_records,
        });
    }
    Ok(records)
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}

fn parse_json(bytes: &[u8]) -> Result<Vec<ComplaintRecord>, IngestError> {
    let document: Value =
        serde_json::from_slice(bytes).map_err(|e| IngestError::InvalidJson(e.to_string()))?;

    let Value::Array(items) = document else {
        return Err(IngestError::InvalidSchema);
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(record) => Ok(record),
            _ => Err(IngestError::InvalidSchema),
        })
        .collect()
}

fn parse_csv(bytes: &[u8]) -> Result<Vec<ComplaintRecord>, IngestError> {
    // Short rows are allowed; their missing trailing cells become null.
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| IngestError::InvalidCsv(e.to_string()))?
        .clone();

    let text_column = TEXT_COLUMNS
        .iter()
        .find_map(|candidate| headers.iter().position(|h| h == *candidate))
        .ok_or(IngestError::MissingTextColumn)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| IngestError::InvalidCsv(e.to_string()))?;
        if row.len() > headers.len() {
            return Err(IngestError::InvalidCsv(format!(
                "line {}: found {} fields, but the header has {}",
                row.position().map_or(0, |p| p.line()),
                row.len(),
                headers.len()
            )));
        }

        let record = headers
            .iter()
            .enumerate()
            .map(|(index, header)| match (index == text_column, row.get(index)) {
                (true, Some(cell)) => (MESSAGE_FIELD.to_string(), Value::String(cell.to_string())),
                (true, None) => (MESSAGE_FIELD.to_string(), Value::Null),
                (false, Some(cell)) => (header.to_string(), infer_cell(cell)),
                (false, None) => (header.to_string(), Value::Null),
            })
            .collect();
        records.push(record);
    }
    Ok(records)
}

/// Give non-text CSV cells a JSON type: empty is null, numbers are numbers.
fn infer_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(n) = cell.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(n) = cell.parse::<u64>() {
        return Value::Number(n.into());
    }
    if let Some(n) = cell.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(cell.to_string())
}

/// Keep records whose `message` is a non-blank string, trimmed and cut to
/// `limits.max_message_chars`. Input order is preserved.
pub fn clean_records(
    records: Vec<ComplaintRecord>,
    limits: &Limits,
) -> Result<Vec<CleanedComplaint>, IngestError> {
    let cleaned: Vec<CleanedComplaint> = records
        .into_iter()
        .filter_map(|mut record| {
            let message = clean_message(record.get(MESSAGE_FIELD), limits.max_message_chars)?;
            record.insert(MESSAGE_FIELD.to_string(), Value::String(message.clone()));
            Some(CleanedComplaint { record, message })
        })
        .collect();

    if cleaned.is_empty() {
        return Err(IngestError::NoValidMessages);
    }
    Ok(cleaned)
}

/// Normalize a raw `message` value. `None` means the record is dropped.
pub fn clean_message(value: Option<&Value>, max_chars: usize) -> Option<String> {
    match value {
        Some(Value::String(raw)) => normalize_text(raw, max_chars),
        _ => None,
    }
}

/// Trim surrounding whitespace and cut to `max_chars`; blank text is `None`.
pub fn normalize_text(raw: &str, max_chars: usize) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(truncate_chars(trimmed, max_chars).to_string())
}

/// Hard cut at `max_chars` characters (not bytes), no ellipsis.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
