use crate::models::{canonical_key, RawTable};
use crate::readers::StationRegistry;
use crate::utils::constants::{DATE_TIME_TOKENS, STATION_FOLDER_COLUMN};
use crate::utils::timestamps::canonicalize_timestamp;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub input_rows: usize,
    pub timestamp_columns: Vec<String>,
    pub null_rows_dropped: usize,
    pub duplicate_rows_dropped: usize,
    pub output_rows: usize,
    pub metadata_attached: bool,
}

/// Cleans one station's raw table and stamps it with the station's metadata.
///
/// Order of operations: timestamp coercion, null-row removal, duplicate
/// removal, then metadata and folder tagging. A timestamp that fails to parse
/// becomes null and so removes its row in the same pass. Metadata columns are
/// added after the null filter, so a placeholder station's null metadata
/// survives.
pub struct Normalizer<'a> {
    registry: &'a StationRegistry,
}

impl<'a> Normalizer<'a> {
    pub fn new(registry: &'a StationRegistry) -> Self {
        Self { registry }
    }

    pub fn normalize(&self, mut table: RawTable, folder: &str) -> (RawTable, NormalizeStats) {
        let mut stats = NormalizeStats {
            input_rows: table.len(),
            ..Default::default()
        };

        stats.timestamp_columns = coerce_timestamps(&mut table);
        stats.null_rows_dropped = drop_null_rows(&mut table);
        stats.duplicate_rows_dropped = drop_duplicate_rows(&mut table);

        match self.registry.get(folder) {
            Some(station) => {
                for (name, value) in station.metadata_columns() {
                    table.add_constant_column(name, value);
                }
                stats.metadata_attached = true;
            }
            None => warn!(folder, "No station metadata registered for folder"),
        }
        table.add_constant_column(STATION_FOLDER_COLUMN, Value::from(folder));

        stats.output_rows = table.len();
        debug!(
            folder,
            input = stats.input_rows,
            nulls = stats.null_rows_dropped,
            duplicates = stats.duplicate_rows_dropped,
            output = stats.output_rows,
            "Normalized station table"
        );

        (table, stats)
    }
}

pub fn is_date_time_column(name: &str) -> bool {
    let lower = name.to_lowercase();
    DATE_TIME_TOKENS.iter().any(|token| lower.contains(token))
}

/// Rewrite every date/time column as canonical UTC timestamps. Returns the columns touched.
pub fn coerce_timestamps(table: &mut RawTable) -> Vec<String> {
    let indices: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, name)| is_date_time_column(name))
        .map(|(idx, _)| idx)
        .collect();

    for row in &mut table.rows {
        for &idx in &indices {
            row[idx] = canonicalize_timestamp(&row[idx]);
        }
    }

    indices.iter().map(|&idx| table.columns[idx].clone()).collect()
}

/// Remove rows holding a null in any column. Returns the number removed.
pub fn drop_null_rows(table: &mut RawTable) -> usize {
    let before = table.len();
    table.rows.retain(|row| !row.iter().any(Value::is_null));
    before - table.len()
}

/// Remove exact-duplicate rows, keeping the first occurrence. Returns the number removed.
pub fn drop_duplicate_rows(table: &mut RawTable) -> usize {
    let before = table.len();
    let mut seen = HashSet::with_capacity(before);
    table
        .rows
        .retain(|row| seen.insert(canonical_key(&Value::Array(row.clone()))));
    before - table.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn raw_table() -> RawTable {
        let mut table = RawTable::new(vec![
            "_airbyte_extracted_at".to_string(),
            "obsTimeLocal".to_string(),
            "temperature".to_string(),
        ]);
        table.push_row(vec![json!(1745688137182_i64), json!("2025-04-26 10:00:00"), json!(12.5)]);
        table.push_row(vec![json!(1745688137182_i64), json!("2025-04-26 10:00:00"), json!(12.5)]);
        table.push_row(vec![json!(1745688137182_i64), json!("2025-04-26 10:05:00"), Value::Null]);
        table.push_row(vec![json!(1745688137182_i64), json!("not a date"), json!(13.0)]);
        table.push_row(vec![json!(1745688137182_i64), json!("2025-04-26 10:10:00"), json!(13.5)]);
        table
    }

    #[test]
    fn test_date_time_column_detection() {
        assert!(is_date_time_column("Date"));
        assert!(is_date_time_column("obsTimeLocal"));
        assert!(!is_date_time_column("_airbyte_extracted_at"));
        assert!(!is_date_time_column("temperature"));
    }

    #[test]
    fn test_normalize_known_station() {
        let registry = StationRegistry::builtin();
        let normalizer = Normalizer::new(&registry);

        let (table, stats) = normalizer.normalize(raw_table(), "Station_Amateur_Ichtegem");

        assert_eq!(stats.input_rows, 5);
        assert_eq!(stats.timestamp_columns, vec!["obsTimeLocal".to_string()]);
        assert_eq!(stats.null_rows_dropped, 2);
        assert_eq!(stats.duplicate_rows_dropped, 1);
        assert_eq!(stats.output_rows, 2);
        assert!(stats.metadata_attached);

        let docs = table.into_documents();
        assert_eq!(docs[0]["obsTimeLocal"], json!("2025-04-26T10:00:00.000Z"));
        assert_eq!(docs[0]["StationID"], json!("IICHTE19"));
        assert_eq!(docs[0]["City"], json!("Ichtegem"));
        assert_eq!(docs[1]["StationFolder"], json!("Station_Amateur_Ichtegem"));
    }

    #[test]
    fn test_normalize_unregistered_folder_only_tags() {
        let registry = StationRegistry::builtin();
        let normalizer = Normalizer::new(&registry);

        let (table, stats) = normalizer.normalize(raw_table(), "Station_Unknown");

        assert!(!stats.metadata_attached);
        assert_eq!(
            table.columns.last().map(String::as_str),
            Some(STATION_FOLDER_COLUMN)
        );
        assert!(table.column_index("StationID").is_none());
    }

    #[test]
    fn test_normalized_rows_have_no_nulls_or_duplicates() {
        let registry = StationRegistry::builtin();
        let normalizer = Normalizer::new(&registry);
        let (table, _) = normalizer.normalize(raw_table(), "Station_Amateur_Weather_La_Madelaine");

        let observation_columns = 3;
        for row in &table.rows {
            assert!(row[..observation_columns].iter().all(|v| !v.is_null()));
        }

        let distinct: HashSet<String> = table
            .rows
            .iter()
            .map(|row| Value::Array(row.clone()).to_string())
            .collect();
        assert_eq!(distinct.len(), table.len());
    }

    #[test]
    fn test_duplicates_collapsed_after_coercion() {
        let mut table = RawTable::new(vec!["Date".to_string(), "value".to_string()]);
        table.push_row(vec![json!("2024-03-01"), json!(1)]);
        table.push_row(vec![json!("2024-03-01 00:00:00"), json!(1)]);

        coerce_timestamps(&mut table);
        assert_eq!(drop_duplicate_rows(&mut table), 1);
    }
}
