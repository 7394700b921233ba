use crate::config::KeyVariant;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "station-etl")]
#[command(about = "Batch ETL for weather-station exports: object store to JSON to MongoDB")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short,
        long,
        global = true,
        help = "Configuration file [default: station-etl.toml if present]"
    )]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Suppress progress output")]
    pub quiet: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read every configured station export, normalize it and write the intermediate file
    Transform {
        #[arg(short, long, help = "Intermediate file [default: from configuration]")]
        output: Option<PathBuf>,

        #[arg(long, help = "Read exports from this directory instead of the configured store")]
        local_root: Option<PathBuf>,
    },

    /// Wait for the intermediate file and load it into the document store
    Load {
        #[arg(short, long, help = "Intermediate file [default: from configuration]")]
        input: Option<PathBuf>,

        #[arg(short, long, value_enum, help = "Natural key [default: from configuration]")]
        key: Option<KeyVariant>,

        #[arg(long, help = "Gate timeout in seconds [default: from configuration]")]
        timeout: Option<u64>,

        #[arg(long, default_value = "false", help = "Print a quality report after loading")]
        quality: bool,
    },

    /// Transform, load and report in one go
    Run {
        #[arg(long, help = "Read exports from this directory instead of the configured store")]
        local_root: Option<PathBuf>,

        #[arg(short, long, value_enum, help = "Natural key [default: from configuration]")]
        key: Option<KeyVariant>,
    },

    /// Report data quality over the whole collection
    Quality {
        #[arg(long, default_value = "false", help = "Print metrics as JSON")]
        json: bool,

        #[arg(short, long, help = "Check an intermediate file instead of the collection")]
        file: Option<PathBuf>,
    },

    /// Profile one source export before normalization
    Inspect {
        #[arg(short, long, help = "Object key of the export")]
        key: String,

        #[arg(long, help = "Read from this directory instead of the configured store")]
        local_root: Option<PathBuf>,

        #[arg(short, long, default_value = "5", help = "Sample rows to print")]
        sample: usize,
    },

    /// Convert an older unit-suffixed spreadsheet into nested documents
    ConvertLegacy {
        #[arg(short, long, help = "Object key of the spreadsheet")]
        key: String,

        #[arg(long, help = "Read from this directory instead of the configured store")]
        local_root: Option<PathBuf>,

        #[arg(
            short,
            long,
            help = "Output file [default: output/output_{name}.json]"
        )]
        output: Option<PathBuf>,
    },
}
