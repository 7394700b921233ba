use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use station_etl::config::{KeyVariant, StationSource};
use station_etl::processors::{
    IdempotentLoader, LoadGate, LoadPipeline, Normalizer, QualityReporter, TransformPipeline,
};
use station_etl::readers::{LocalObjectStore, SourceReader, StationRegistry};
use station_etl::store::{DocumentStore, InMemoryStore};
use station_etl::writers::read_documents;
use station_etl::EtlError;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const ICHTEGEM: &str = "Station_Amateur_Ichtegem";
const LA_MADELAINE: &str = "Station_Amateur_Weather_La_Madelaine";

/// Ten distinct readings followed by two repeats of the first two.
fn station_csv(extracted_base: i64) -> String {
    let mut csv = String::from("_airbyte_extracted_at,obsTimeLocal,tempAvg,humidityAvg\n");
    for i in 0..10 {
        csv.push_str(&format!(
            "{},2025-04-26 {:02}:00:00,{}.5,{}\n",
            extracted_base + i,
            i,
            10 + i,
            60 + i
        ));
    }
    for i in 0..2 {
        csv.push_str(&format!(
            "{},2025-04-26 {:02}:00:00,{}.5,{}\n",
            extracted_base + i,
            i,
            10 + i,
            60 + i
        ));
    }
    csv
}

fn write_export(root: &Path, key: &str, contents: &str) {
    let path = root.join(key);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn two_station_bucket() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    write_export(
        temp_dir.path(),
        "airbyte/Station_Amateur_Ichtegem/2025_04_26_1745686582564_0.csv",
        &station_csv(1745686582564),
    );
    write_export(
        temp_dir.path(),
        "airbyte/Station_Amateur_Weather_La_Madelaine/2025_04_26_1745688137182_0.csv",
        &station_csv(1745688137182),
    );
    temp_dir
}

fn folder_sources() -> Vec<StationSource> {
    [ICHTEGEM, LA_MADELAINE]
        .iter()
        .map(|folder| StationSource {
            folder: folder.to_string(),
            key: None,
            prefix: None,
            extension: "csv".to_string(),
        })
        .collect()
}

fn transform_pipeline(root: &Path) -> TransformPipeline {
    let reader = SourceReader::new(Arc::new(LocalObjectStore::new(root)));
    TransformPipeline::new(reader, StationRegistry::builtin()).with_source_prefix("airbyte")
}

fn load_pipeline() -> LoadPipeline {
    LoadPipeline::new(
        LoadGate::new(Duration::from_secs(1), Duration::from_millis(10)),
        IdempotentLoader::new(KeyVariant::StationExtraction.natural_key()),
    )
}

#[tokio::test]
async fn test_two_stations_end_to_end() {
    let bucket = two_station_bucket();
    let work_dir = TempDir::new().unwrap();
    let output = work_dir.path().join("output").join("transformed_data.json");

    let report = transform_pipeline(bucket.path())
        .run(&folder_sources(), &output, None)
        .await
        .unwrap();

    assert_eq!(report.written.documents, 20);
    assert_eq!(report.failed().count(), 0);
    for station in &report.stations {
        let stats = station.stats.as_ref().unwrap();
        assert_eq!(stats.input_rows, 12);
        assert_eq!(stats.duplicate_rows_dropped, 2);
        assert_eq!(stats.output_rows, 10);
    }

    let documents = read_documents(&output).unwrap();
    assert_eq!(documents.len(), 20);
    assert_eq!(documents[0]["StationID"], json!("IICHTE19"));
    assert_eq!(documents[0]["StationFolder"], json!(ICHTEGEM));
    assert_eq!(documents[0]["obsTimeLocal"], json!("2025-04-26T00:00:00.000Z"));
    assert_eq!(documents[19]["StationID"], json!("ILAMAD25"));
    assert_eq!(documents[19]["City"], json!("La Madeleine"));

    let store = InMemoryStore::new();
    let load = load_pipeline();

    let first = load.run(&store, &output, None).await.unwrap();
    assert_eq!((first.inserted, first.skipped), (20, 0));

    let second = load.run(&store, &output, None).await.unwrap();
    assert_eq!((second.inserted, second.skipped), (0, 20));
    assert_eq!(store.count().await.unwrap(), 20);

    let quality = QualityReporter::new().check(&store.find_all().await.unwrap());
    assert_eq!(quality.total_documents, 20);
    assert_eq!(quality.duplicate_documents, 0);
    assert_eq!(quality.invalid_documents, 0);
    assert_eq!(quality.documents_with_nulls, 0);
}

#[tokio::test]
async fn test_ambiguous_station_is_skipped_and_others_load() {
    let bucket = two_station_bucket();
    write_export(
        bucket.path(),
        "airbyte/Station_Amateur_Ichtegem/2025_04_27_1745770000000_0.csv",
        &station_csv(1745770000000),
    );
    let work_dir = TempDir::new().unwrap();
    let output = work_dir.path().join("transformed_data.json");

    let report = transform_pipeline(bucket.path())
        .run(&folder_sources(), &output, None)
        .await
        .unwrap();

    assert_eq!(report.written.documents, 10);
    let failed: Vec<_> = report.failed().map(|s| s.folder.as_str()).collect();
    assert_eq!(failed, vec![ICHTEGEM]);
}

#[tokio::test]
async fn test_unregistered_folder_keeps_only_the_tag() {
    let bucket = TempDir::new().unwrap();
    write_export(bucket.path(), "airbyte/Rooftop/export.csv", &station_csv(1));
    let work_dir = TempDir::new().unwrap();
    let output = work_dir.path().join("transformed_data.json");

    let source = StationSource::with_prefix("Rooftop", "airbyte/Rooftop/", "csv");
    transform_pipeline(bucket.path())
        .run(&[source], &output, None)
        .await
        .unwrap();

    let documents = read_documents(&output).unwrap();
    assert_eq!(documents.len(), 10);
    assert_eq!(documents[0]["StationFolder"], json!("Rooftop"));
    assert!(!documents[0].contains_key("StationID"));

    let quality = QualityReporter::new().check(&documents);
    assert_eq!(quality.invalid_documents, 10);
    assert_eq!(quality.invalid_rate, 100.0);
}

#[tokio::test]
async fn test_load_without_intermediate_file_times_out() {
    let work_dir = TempDir::new().unwrap();
    let store = InMemoryStore::new();
    let load = LoadPipeline::new(
        LoadGate::new(Duration::from_millis(30), Duration::from_millis(10)),
        IdempotentLoader::new(KeyVariant::RawId.natural_key()),
    );

    let err = load
        .run(&store, &work_dir.path().join("transformed_data.json"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EtlError::HandoffTimeout { .. }));
    assert!(err.to_string().starts_with("Source unavailable"));
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_excel_export_reads_and_normalizes() {
    let data_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("data");
    let reader = SourceReader::new(Arc::new(LocalObjectStore::new(&data_dir)));

    let table = reader.read_table("station_readings.xlsx").await.unwrap();
    assert_eq!(table.columns, vec!["obsTimeLocal", "tempAvg", "column_2", "note"]);
    assert_eq!(table.len(), 2);
    assert_eq!(
        table.rows[0],
        vec![json!("2025-04-26T12:00:00"), json!(12.5), json!(7.0), json!("ok")]
    );
    assert_eq!(
        table.rows[1],
        vec![json!("2025-04-26T18:00:00"), Value::Null, Value::Null, json!("ok")]
    );

    let registry = StationRegistry::builtin();
    let (normalized, stats) = Normalizer::new(&registry).normalize(table, ICHTEGEM);
    assert_eq!(stats.timestamp_columns, vec!["obsTimeLocal".to_string()]);
    assert_eq!(stats.null_rows_dropped, 1);

    let documents = normalized.into_documents();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0]["obsTimeLocal"], json!("2025-04-26T12:00:00.000Z"));
    assert_eq!(documents[0]["StationID"], json!("IICHTE19"));
}
