use crate::models::{canonical_key, Document, RawTable};
use crate::utils::constants::{
    HUMIDITY_PATH, INTERNAL_FIELD_PREFIX, MAX_VALID_HUMIDITY, MAX_VALID_TEMP, MIN_VALID_HUMIDITY,
    MIN_VALID_TEMP, MONGO_ID_FIELD, REQUIRED_FIELDS, TEMPERATURE_PATH,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ops::RangeInclusive;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub total_documents: usize,
    pub missing_counts: BTreeMap<String, usize>,
    pub missing_rates: BTreeMap<String, f64>,
    pub duplicate_documents: usize,
    pub temperature_out_of_range: usize,
    pub humidity_out_of_range: usize,
    pub invalid_documents: usize,
    pub invalid_rate: f64,
    pub documents_with_nulls: usize,
    pub null_error_rate: f64,
}

impl QualityReport {
    /// Flat metric name to value map, for logging or `--json` output.
    pub fn metrics(&self) -> BTreeMap<String, Value> {
        let mut metrics = BTreeMap::new();
        metrics.insert("total_documents".to_string(), json!(self.total_documents));
        for (field, count) in &self.missing_counts {
            metrics.insert(format!("missing_count.{field}"), json!(count));
        }
        for (field, rate) in &self.missing_rates {
            metrics.insert(format!("missing_rate.{field}"), json!(rate));
        }
        metrics.insert("duplicate_documents".to_string(), json!(self.duplicate_documents));
        metrics.insert(
            "temperature_out_of_range".to_string(),
            json!(self.temperature_out_of_range),
        );
        metrics.insert(
            "humidity_out_of_range".to_string(),
            json!(self.humidity_out_of_range),
        );
        metrics.insert("invalid_documents".to_string(), json!(self.invalid_documents));
        metrics.insert("invalid_rate".to_string(), json!(self.invalid_rate));
        metrics.insert("documents_with_nulls".to_string(), json!(self.documents_with_nulls));
        metrics.insert("null_error_rate".to_string(), json!(self.null_error_rate));
        metrics
    }

    /// Human-readable report.
    pub fn render(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Data Quality Report ===\n");
        summary.push_str(&format!("Total Documents: {}\n", self.total_documents));

        summary.push_str("\nMissing Values:\n");
        let incomplete: Vec<_> = self
            .missing_counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .collect();
        if incomplete.is_empty() {
            summary.push_str("  none\n");
        }
        for (field, count) in incomplete {
            summary.push_str(&format!(
                "  {}: {} ({:.2}%)\n",
                field,
                count,
                self.missing_rates.get(field).copied().unwrap_or_default()
            ));
        }

        summary.push_str(&format!(
            "\nDuplicate Documents: {}\n",
            self.duplicate_documents
        ));
        summary.push_str(&format!(
            "Temperature Out Of Range [{}, {}] °C: {}\n",
            MIN_VALID_TEMP, MAX_VALID_TEMP, self.temperature_out_of_range
        ));
        summary.push_str(&format!(
            "Humidity Out Of Range [{}, {}] %: {}\n",
            MIN_VALID_HUMIDITY, MAX_VALID_HUMIDITY, self.humidity_out_of_range
        ));
        summary.push_str(&format!(
            "Invalid Documents: {} ({:.2}%)\n",
            self.invalid_documents, self.invalid_rate
        ));
        summary.push_str(&format!(
            "Documents With Nulls: {} ({:.2}%)\n",
            self.documents_with_nulls, self.null_error_rate
        ));

        summary
    }
}

/// Read-only checks over a set of persisted documents.
pub struct QualityReporter {
    temperature_path: String,
    humidity_path: String,
    temperature_range: RangeInclusive<f64>,
    humidity_range: RangeInclusive<f64>,
    required_fields: Vec<String>,
}

impl QualityReporter {
    pub fn new() -> Self {
        Self {
            temperature_path: TEMPERATURE_PATH.to_string(),
            humidity_path: HUMIDITY_PATH.to_string(),
            temperature_range: MIN_VALID_TEMP..=MAX_VALID_TEMP,
            humidity_range: MIN_VALID_HUMIDITY..=MAX_VALID_HUMIDITY,
            required_fields: REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Dotted paths of the temperature and humidity readings.
    pub fn with_measurement_paths(mut self, temperature: &str, humidity: &str) -> Self {
        self.temperature_path = temperature.to_string();
        self.humidity_path = humidity.to_string();
        self
    }

    pub fn with_required_fields(mut self, fields: Vec<String>) -> Self {
        self.required_fields = fields;
        self
    }

    pub fn check(&self, documents: &[Document]) -> QualityReport {
        let total = documents.len();

        let fields: BTreeSet<&String> = documents
            .iter()
            .flat_map(|doc| doc.keys())
            .filter(|field| !field.starts_with(INTERNAL_FIELD_PREFIX))
            .collect();

        let mut missing_counts = BTreeMap::new();
        let mut missing_rates = BTreeMap::new();
        for field in fields {
            let missing = documents
                .iter()
                .filter(|doc| doc.get(field).map_or(true, Value::is_null))
                .count();
            missing_counts.insert(field.clone(), missing);
            missing_rates.insert(field.clone(), percentage(missing, total));
        }

        let temperature_out_of_range =
            count_out_of_range(documents, &self.temperature_path, &self.temperature_range);
        let humidity_out_of_range =
            count_out_of_range(documents, &self.humidity_path, &self.humidity_range);

        let invalid_documents = documents
            .iter()
            .filter(|doc| {
                self.required_fields
                    .iter()
                    .any(|field| doc.get(field).map_or(true, Value::is_null))
            })
            .count();
        let invalid_rate = if total == 0 {
            100.0
        } else {
            percentage(invalid_documents, total)
        };

        let documents_with_nulls = documents
            .iter()
            .filter(|doc| doc.values().any(Value::is_null))
            .count();

        QualityReport {
            total_documents: total,
            missing_counts,
            missing_rates,
            duplicate_documents: count_duplicates(documents),
            temperature_out_of_range,
            humidity_out_of_range,
            invalid_documents,
            invalid_rate,
            documents_with_nulls,
            null_error_rate: percentage(documents_with_nulls, total),
        }
    }
}

impl Default for QualityReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * count as f64 / total as f64
    }
}

/// Follow a dotted path through nested objects.
fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = document.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn count_out_of_range(documents: &[Document], path: &str, range: &RangeInclusive<f64>) -> usize {
    documents
        .iter()
        .filter_map(|doc| lookup(doc, path).and_then(Value::as_f64))
        .filter(|value| !range.contains(value))
        .count()
}

/// `n - distinct`, comparing every field except the store's `_id`.
fn count_duplicates(documents: &[Document]) -> usize {
    let distinct: HashSet<String> = documents
        .iter()
        .map(|doc| {
            let mut content = doc.clone();
            content.remove(MONGO_ID_FIELD);
            canonical_key(&Value::Object(content))
        })
        .collect();
    documents.len() - distinct.len()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: &'static str,
    pub nulls: usize,
}

/// Shape of a raw source table before normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableProfile {
    pub rows: usize,
    pub columns: Vec<ColumnProfile>,
    pub rows_with_nulls: usize,
    pub duplicate_rows: usize,
}

impl TableProfile {
    pub fn render(&self) -> String {
        let mut summary = String::new();
        summary.push_str(&format!(
            "Rows: {}\nColumns: {}\nRows with nulls: {}\nDuplicate rows: {}\n\n",
            self.rows,
            self.columns.len(),
            self.rows_with_nulls,
            self.duplicate_rows
        ));

        let width = self
            .columns
            .iter()
            .map(|c| c.name.chars().count())
            .max()
            .unwrap_or(0);
        for column in &self.columns {
            summary.push_str(&format!(
                "  {:<width$}  {:<8}  {} null\n",
                column.name,
                column.kind,
                column.nulls,
                width = width
            ));
        }
        summary
    }
}

pub fn profile_table(table: &RawTable) -> TableProfile {
    let columns = table
        .columns
        .iter()
        .enumerate()
        .map(|(idx, name)| ColumnProfile {
            name: name.clone(),
            kind: column_kind(table.rows.iter().map(|row| &row[idx])),
            nulls: table.rows.iter().filter(|row| row[idx].is_null()).count(),
        })
        .collect();

    let distinct: HashSet<String> = table
        .rows
        .iter()
        .map(|row| canonical_key(&Value::Array(row.clone())))
        .collect();

    TableProfile {
        rows: table.len(),
        columns,
        rows_with_nulls: table
            .rows
            .iter()
            .filter(|row| row.iter().any(Value::is_null))
            .count(),
        duplicate_rows: table.len() - distinct.len(),
    }
}

fn value_kind(value: &Value) -> Option<&'static str> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some("boolean"),
        Value::Number(n) if n.is_f64() => Some("float"),
        Value::Number(_) => Some("integer"),
        Value::String(_) => Some("string"),
        Value::Array(_) | Value::Object(_) => Some("nested"),
    }
}

/// Integers widen to float; any other mix is `mixed`.
fn column_kind<'a>(values: impl Iterator<Item = &'a Value>) -> &'static str {
    let mut kind: Option<&'static str> = None;
    for value_kind in values.filter_map(value_kind) {
        kind = Some(match (kind, value_kind) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some("integer"), "float") | (Some("float"), "integer") => "float",
            _ => return "mixed",
        });
    }
    kind.unwrap_or("empty")
}
