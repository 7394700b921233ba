use crate::config::StationSource;
use crate::error::{EtlError, Result};
use crate::models::Document;
use crate::processors::loader::{IdempotentLoader, LoadReport};
use crate::processors::normalizer::{NormalizeStats, Normalizer};
use crate::processors::LoadGate;
use crate::readers::{SourceLocation, SourceReader, StationRegistry};
use crate::store::DocumentStore;
use crate::utils::progress::ProgressReporter;
use crate::writers::{read_documents, BatchWriter, WriteSummary};
use std::path::Path;
use tracing::{info, warn};

/// What happened to one station during a transform run.
#[derive(Debug, Clone, PartialEq)]
pub struct StationOutcome {
    pub folder: String,
    pub key: Option<String>,
    pub stats: Option<NormalizeStats>,
    pub error: Option<String>,
}

impl StationOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct TransformReport {
    pub stations: Vec<StationOutcome>,
    pub written: WriteSummary,
}

impl TransformReport {
    pub fn failed(&self) -> impl Iterator<Item = &StationOutcome> {
        self.stations.iter().filter(|s| !s.succeeded())
    }

    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str("=== Transform Summary ===\n");
        for station in &self.stations {
            match (&station.stats, &station.error) {
                (Some(stats), _) => summary.push_str(&format!(
                    "  {}: {} rows read, {} with nulls dropped, {} duplicates dropped, {} kept\n",
                    station.folder,
                    stats.input_rows,
                    stats.null_rows_dropped,
                    stats.duplicate_rows_dropped,
                    stats.output_rows
                )),
                (None, Some(error)) => {
                    summary.push_str(&format!("  {}: skipped ({})\n", station.folder, error))
                }
                (None, None) => {}
            }
        }
        summary.push('\n');
        summary.push_str(&self.written.summary());
        summary.push('\n');
        summary
    }
}

/// Read, normalize and tag each configured station, then write one batch.
///
/// Station-scoped failures are logged and the station is left out of the
/// batch. Anything else aborts the run, and so does every station failing.
pub struct TransformPipeline {
    reader: SourceReader,
    registry: StationRegistry,
    writer: BatchWriter,
    source_prefix: String,
}

impl TransformPipeline {
    pub fn new(reader: SourceReader, registry: StationRegistry) -> Self {
        Self {
            reader,
            registry,
            writer: BatchWriter::new(),
            source_prefix: String::new(),
        }
    }

    pub fn with_writer(mut self, writer: BatchWriter) -> Self {
        self.writer = writer;
        self
    }

    /// Prefix used for stations configured by folder only.
    pub fn with_source_prefix(mut self, prefix: &str) -> Self {
        self.source_prefix = prefix.to_string();
        self
    }

    pub async fn transform_station(
        &self,
        folder: &str,
        location: &SourceLocation,
    ) -> Result<(String, Vec<Document>, NormalizeStats)> {
        let (key, table) = self.reader.read_location(location).await?;
        let (table, stats) = Normalizer::new(&self.registry).normalize(table, folder);
        Ok((key, table.into_documents(), stats))
    }

    pub async fn run(
        &self,
        stations: &[StationSource],
        output: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<TransformReport> {
        if stations.is_empty() {
            return Err(EtlError::MissingData("No stations configured".to_string()));
        }

        let mut outcomes = Vec::with_capacity(stations.len());
        let mut batches = Vec::with_capacity(stations.len());

        for station in stations {
            if let Some(p) = progress {
                p.set_message(&format!("Transforming {}", station.folder));
            }

            let result = match station.location(&self.source_prefix) {
                Ok(location) => self.transform_station(&station.folder, &location).await,
                Err(e) => Err(e),
            };

            match result {
                Ok((key, documents, stats)) => {
                    info!(
                        folder = %station.folder,
                        key = %key,
                        documents = documents.len(),
                        "Station transformed"
                    );
                    batches.push(documents);
                    outcomes.push(StationOutcome {
                        folder: station.folder.clone(),
                        key: Some(key),
                        stats: Some(stats),
                        error: None,
                    });
                }
                Err(e) if e.is_station_scoped() => {
                    warn!(folder = %station.folder, error = %e, "Skipping station");
                    outcomes.push(StationOutcome {
                        folder: station.folder.clone(),
                        key: None,
                        stats: None,
                        error: Some(e.to_string()),
                    });
                }
                Err(e) => return Err(e),
            }

            if let Some(p) = progress {
                p.increment(1);
            }
        }

        if batches.is_empty() {
            return Err(EtlError::MissingData(format!(
                "None of the {} configured stations could be transformed",
                stations.len()
            )));
        }

        let written = self.writer.write_batches(batches, output)?;
        if let Some(p) = progress {
            p.finish_with_message(&format!("Wrote {} documents", written.documents));
        }

        Ok(TransformReport {
            stations: outcomes,
            written,
        })
    }
}

/// Wait for the intermediate file, read it whole, then load it idempotently.
pub struct LoadPipeline {
    gate: LoadGate,
    loader: IdempotentLoader,
}

impl LoadPipeline {
    pub fn new(gate: LoadGate, loader: IdempotentLoader) -> Self {
        Self { gate, loader }
    }

    pub async fn run(
        &self,
        store: &dyn DocumentStore,
        input: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<LoadReport> {
        self.gate.wait_for(input).await?;

        let documents = read_documents(input)?;
        info!(path = %input.display(), documents = documents.len(), "Read intermediate file");
        if let Some(p) = progress {
            p.set_message(&format!("Loading {} documents", documents.len()));
        }

        let report = self.loader.load(store, &documents, progress).await?;
        if let Some(p) = progress {
            p.finish_with_message(&report.summary());
        }
        Ok(report)
    }
}
