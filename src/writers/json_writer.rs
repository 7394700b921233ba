use crate::error::{EtlError, Result};
use crate::models::Document;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub documents: usize,
    pub bytes: u64,
}

impl WriteSummary {
    pub fn summary(&self) -> String {
        format!(
            "Intermediate file: {}\nDocuments: {}\nSize: {:.1} KB",
            self.path.display(),
            self.documents,
            self.bytes as f64 / 1024.0
        )
    }
}

/// Writes the merged batch as one JSON array, all or nothing.
///
/// The array goes to a temporary file next to the target which is flushed,
/// synced and then renamed over it, so a reader polling for the target never
/// sees a partial file.
pub struct BatchWriter {
    pretty: bool,
}

impl BatchWriter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Concatenate per-station batches in order and write them.
    pub fn write_batches(&self, batches: Vec<Vec<Document>>, path: &Path) -> Result<WriteSummary> {
        let documents: Vec<Document> = batches.into_iter().flatten().collect();
        self.write_documents(&documents, path)
    }

    pub fn write_documents(&self, documents: &[Document], path: &Path) -> Result<WriteSummary> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let temp = NamedTempFile::new_in(&parent)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            if self.pretty {
                serde_json::to_writer_pretty(&mut writer, documents)?;
            } else {
                serde_json::to_writer(&mut writer, documents)?;
            }
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        debug!(temp = %temp.path().display(), "Flushed intermediate file");

        temp.persist(path).map_err(|e| EtlError::Io(e.error))?;

        let bytes = fs::metadata(path)?.len();
        info!(path = %path.display(), documents = documents.len(), bytes, "Wrote intermediate file");

        Ok(WriteSummary {
            path: path.to_path_buf(),
            documents: documents.len(),
            bytes,
        })
    }
}

impl Default for BatchWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Read an intermediate file back as documents.
pub fn read_documents(path: &Path) -> Result<Vec<Document>> {
    let file = File::open(path)?;
    let documents: Vec<Document> = serde_json::from_reader(BufReader::new(file))?;
    Ok(documents)
}
