use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A flat JSON document as written to the intermediate file and the store.
pub type Document = Map<String, Value>;

/// Untyped tabular data as read from a source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RawTable {
    /// Repeated column names get a `.1`, `.2`, ... suffix in order of appearance.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns: unique_column_names(columns),
            rows: Vec::new(),
        }
    }

    /// Append a row, padding short rows with nulls and dropping surplus cells.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Add a column holding the same value on every row.
    pub fn add_constant_column(&mut self, name: &str, value: Value) {
        match self.column_index(name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = value.clone();
                }
            }
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(value.clone());
                }
            }
        }
    }

    /// One document per row, keyed by column name.
    pub fn into_documents(self) -> Vec<Document> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|row| columns.iter().cloned().zip(row).collect())
            .collect()
    }
}

/// Serialized form of a value with object keys sorted at every level, so
/// values equal as maps produce the same string.
pub fn canonical_key(value: &Value) -> String {
    with_sorted_keys(value).to_string()
}

fn with_sorted_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(k, v)| (k.clone(), with_sorted_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(with_sorted_keys).collect()),
        other => other.clone(),
    }
}

fn unique_column_names(columns: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = columns.iter().cloned().collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut counters: HashMap<String, usize> = HashMap::new();

    columns
        .into_iter()
        .map(|name| {
            if seen.insert(name.clone()) {
                return name;
            }
            let counter = counters.entry(name.clone()).or_insert(0);
            loop {
                *counter += 1;
                let candidate = format!("{}.{}", name, counter);
                if taken.insert(candidate.clone()) {
                    seen.insert(candidate.clone());
                    return candidate;
                }
            }
        })
        .collect()
}
