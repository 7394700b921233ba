use std::path::PathBuf;

/// Last path segment of an object key (`airbyte/Station/2025_04_26_0.csv` -> `2025_04_26_0.csv`)
pub fn file_name_of(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Default output for a converted legacy spreadsheet: output/output_{file name}.json
pub fn legacy_output_path(key: &str) -> PathBuf {
    let filename = format!("output_{}.json", file_name_of(key));
    PathBuf::from("output").join(filename)
}
