use crate::cli::args::{Cli, Commands};
use crate::config::{KeyVariant, PipelineConfig, SourceConfig, SourceKind};
use crate::error::Result;
use crate::models::Document;
use crate::processors::{
    profile_table, IdempotentLoader, LegacyConverter, LoadPipeline, LoadReport, QualityReport,
    TransformPipeline,
};
use crate::readers::{LocalObjectStore, ObjectStore, S3ObjectStore, SourceReader};
use crate::store::{DocumentStore, MongoStore};
use crate::utils::filename::{file_name_of, legacy_output_path};
use crate::utils::progress::ProgressReporter;
use crate::writers::{read_documents, BatchWriter};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn run(cli: Cli) -> Result<()> {
    let config = PipelineConfig::load(cli.config.as_deref())?;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Transform { output, local_root } => {
            let output = output.unwrap_or_else(|| config.output.path.clone());
            transform(&config, local_root.as_deref(), &output, quiet).await?;
        }

        Commands::Load {
            input,
            key,
            timeout,
            quality,
        } => {
            let input = input.unwrap_or_else(|| config.output.path.clone());
            let mut config = config;
            if let Some(secs) = timeout {
                config.gate.timeout_secs = secs;
            }

            let store = connect(&config).await?;
            let result = load(&config, &store, &input, key, quiet).await;
            let result = match result {
                Ok(_) if quality => report_quality(&config, &store, false).await,
                other => other.map(|_| ()),
            };
            store.shutdown().await;
            result?;
        }

        Commands::Run { local_root, key } => {
            let output = config.output.path.clone();
            transform(&config, local_root.as_deref(), &output, quiet).await?;

            let store = connect(&config).await?;
            let result = match load(&config, &store, &output, key, quiet).await {
                Ok(_) => report_quality(&config, &store, false).await,
                Err(e) => Err(e),
            };
            store.shutdown().await;
            result?;
        }

        Commands::Quality { json, file } => match file {
            Some(path) => {
                let documents = read_documents(&path)?;
                print_quality(&config.quality.reporter().check(&documents), json)?;
            }
            None => {
                let store = connect(&config).await?;
                let result = report_quality(&config, &store, json).await;
                store.shutdown().await;
                result?;
            }
        },

        Commands::Inspect {
            key,
            local_root,
            sample,
        } => {
            let store = object_store(&config.source, local_root.as_deref()).await?;
            let reader = SourceReader::new(store);
            let table = reader.read_table(&key).await?;
            let profile = profile_table(&table);

            println!("Source: {}", key);
            println!("{}", profile.render());

            if sample > 0 && !table.is_empty() {
                println!("Sample Rows (showing up to {}):", sample);
                for (i, document) in table.into_documents().iter().take(sample).enumerate() {
                    println!("{}. {}", i + 1, serde_json::to_string(document)?);
                }
            }
        }

        Commands::ConvertLegacy {
            key,
            local_root,
            output,
        } => {
            let store = object_store(&config.source, local_root.as_deref()).await?;
            let reader = SourceReader::new(store);
            let table = reader.read_table(&key).await?;

            let registry = config.registry()?;
            let documents = LegacyConverter::new(&registry).convert(&table, file_name_of(&key))?;

            let output = output.unwrap_or_else(|| legacy_output_path(&key));
            let written = BatchWriter::new()
                .with_pretty(config.output.pretty)
                .write_documents(&documents, &output)?;
            println!("{}", written.summary());
        }
    }

    Ok(())
}

/// Local directory if one was given on the command line, otherwise the configured store.
async fn object_store(
    source: &SourceConfig,
    local_root: Option<&Path>,
) -> Result<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match (local_root, source.kind) {
        (Some(root), _) => Arc::new(LocalObjectStore::new(root)),
        (None, SourceKind::Local) => Arc::new(LocalObjectStore::new(source.local_root.clone())),
        (None, SourceKind::S3) => {
            Arc::new(S3ObjectStore::connect(source.bucket()?, &source.region).await)
        }
    };
    Ok(store)
}

async fn connect(config: &PipelineConfig) -> Result<MongoStore> {
    MongoStore::connect(
        &config.store.uri,
        &config.store.database,
        &config.store.collection,
    )
    .await
}

async fn transform(
    config: &PipelineConfig,
    local_root: Option<&Path>,
    output: &Path,
    quiet: bool,
) -> Result<()> {
    let reader = SourceReader::new(object_store(&config.source, local_root).await?);
    let pipeline = TransformPipeline::new(reader, config.registry()?)
        .with_writer(BatchWriter::new().with_pretty(config.output.pretty))
        .with_source_prefix(&config.source.prefix);

    let progress = ProgressReporter::new(
        config.stations.len() as u64,
        "Transforming stations...",
        quiet,
    );
    let report = pipeline.run(&config.stations, output, Some(&progress)).await?;

    for failed in report.failed() {
        warn!(folder = %failed.folder, "Station left out of this batch");
    }
    println!("\n{}", report.summary());
    Ok(())
}

async fn load(
    config: &PipelineConfig,
    store: &MongoStore,
    input: &Path,
    key: Option<KeyVariant>,
    quiet: bool,
) -> Result<LoadReport> {
    let key = key.unwrap_or(config.store.key).natural_key();
    info!(store = %store.namespace(), key = %key, "Loading intermediate file");

    let pipeline = LoadPipeline::new(config.gate.gate(), IdempotentLoader::new(key));
    let progress = ProgressReporter::new_spinner("Waiting for intermediate file...", quiet);
    let report = pipeline.run(store, input, Some(&progress)).await?;

    println!("{}", report.summary());
    if report.race_skips > 0 {
        println!(
            "{} of the skipped documents were inserted concurrently by another loader",
            report.race_skips
        );
    }
    Ok(report)
}

async fn report_quality(
    config: &PipelineConfig,
    store: &dyn DocumentStore,
    json: bool,
) -> Result<()> {
    let documents: Vec<Document> = store.find_all().await?;
    info!(documents = documents.len(), "Checking data quality");
    print_quality(&config.quality.reporter().check(&documents), json)
}

fn print_quality(report: &QualityReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&report.metrics())?);
    } else {
        println!("\n{}", report.render());
    }
    Ok(())
}
