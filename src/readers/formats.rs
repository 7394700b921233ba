use crate::error::{EtlError, Result};
use crate::models::RawTable;
use crate::utils::constants::NA_VALUES;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Cursor;

/// Source file formats, chosen by key extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Excel,
    NdJson,
}

impl SourceFormat {
    pub fn from_key(key: &str) -> Result<Self> {
        let lower = key.to_lowercase();
        [SourceFormat::Csv, SourceFormat::Excel, SourceFormat::NdJson]
            .into_iter()
            .find(|format| format.matches(&lower))
            .ok_or_else(|| EtlError::UnsupportedFormat(key.to_string()))
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            SourceFormat::Csv => &[".csv"],
            SourceFormat::Excel => &[".xlsx", ".xls"],
            SourceFormat::NdJson => &[".json", ".jsonl", ".ndjson"],
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        let lower = key.to_lowercase();
        self.extensions().iter().any(|ext| lower.ends_with(ext))
    }

    pub fn parse(&self, bytes: &[u8]) -> Result<RawTable> {
        match self {
            SourceFormat::Csv => parse_csv(bytes),
            SourceFormat::Excel => parse_excel(bytes),
            SourceFormat::NdJson => parse_ndjson(bytes),
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extensions()[0])
    }
}

pub fn is_na(raw: &str) -> bool {
    let trimmed = raw.trim();
    NA_VALUES.contains(&trimmed)
}

/// Infer a scalar from a text cell: null, integer, float, boolean or string.
pub fn typed_cell(raw: &str) -> Value {
    if is_na(raw) {
        return Value::Null;
    }

    let trimmed = raw.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    if let Some(n) = trimmed
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
    {
        return Value::Number(n);
    }
    match trimmed {
        "true" | "True" | "TRUE" => Value::Bool(true),
        "false" | "False" | "FALSE" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

pub fn parse_csv(bytes: &[u8]) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let columns = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mut table = RawTable::new(columns);

    for record in reader.records() {
        let record = record?;
        table.push_row(record.iter().map(typed_cell).collect());
    }

    Ok(table)
}

/// First worksheet of an xls/xlsx workbook, header on the first row.
pub fn parse_excel(bytes: &[u8]) -> Result<RawTable> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| EtlError::InvalidFormat("Workbook has no sheets".to_string()))?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows = range.rows();
    let columns = match rows.next() {
        Some(header) => header
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell {
                Data::String(s) => s.trim().to_string(),
                Data::Empty => format!("column_{}", i),
                other => other.to_string(),
            })
            .collect(),
        None => return Ok(RawTable::default()),
    };

    let mut table = RawTable::new(columns);
    for row in rows {
        table.push_row(row.iter().map(excel_cell).collect());
    }

    Ok(table)
}

fn excel_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) if is_na(s) => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|naive| Value::String(naive.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .unwrap_or(Value::Null),
        other => Value::String(other.to_string()),
    }
}

/// Line-delimited JSON objects; the column set is the union of keys in first-seen order.
pub fn parse_ndjson(bytes: &[u8]) -> Result<RawTable> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| EtlError::InvalidFormat(format!("Invalid UTF-8: {}", e)))?;

    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut objects = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let parsed = serde_json::from_str::<Value>(line).map_err(|e| {
            EtlError::InvalidFormat(format!("Line {} is not valid JSON: {}", line_no + 1, e))
        })?;
        let object = match parsed {
            Value::Object(map) => map,
            _ => {
                return Err(EtlError::InvalidFormat(format!(
                    "Line {} is not a JSON object",
                    line_no + 1
                )))
            }
        };

        for key in object.keys() {
            if !positions.contains_key(key) {
                positions.insert(key.clone(), columns.len());
                columns.push(key.clone());
            }
        }
        objects.push(object);
    }

    let mut table = RawTable::new(columns);
    for object in objects {
        let mut row = vec![Value::Null; table.columns.len()];
        for (key, value) in object {
            if let Some(&idx) = positions.get(&key) {
                row[idx] = value;
            }
        }
        table.push_row(row);
    }

    Ok(table)
}
