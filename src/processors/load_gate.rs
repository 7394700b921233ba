use crate::error::{EtlError, Result};
use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// Blocks the load stage until the intermediate file exists.
///
/// This is a polling handoff between processes, not a completion signal: a
/// file that exists may still be mid-write unless its producer writes to a
/// temporary path and renames on success, as `BatchWriter` does. The file's
/// content is not read here.
#[derive(Debug, Clone)]
pub struct LoadGate {
    timeout: Duration,
    interval: Duration,
    startup_delay: Duration,
}

impl LoadGate {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval,
            startup_delay: Duration::ZERO,
        }
    }

    pub fn with_startup_delay(mut self, startup_delay: Duration) -> Self {
        self.startup_delay = startup_delay;
        self
    }

    pub async fn wait_for(&self, path: &Path) -> Result<()> {
        if !self.startup_delay.is_zero() {
            debug!(delay = ?self.startup_delay, "Waiting before polling");
            sleep(self.startup_delay).await;
        }

        let started = Instant::now();
        loop {
            if path.is_file() {
                info!(path = %path.display(), waited = ?started.elapsed(), "Intermediate file available");
                return Ok(());
            }

            let waited = started.elapsed();
            if waited >= self.timeout {
                return Err(EtlError::HandoffTimeout {
                    path: path.to_path_buf(),
                    waited,
                });
            }

            debug!(path = %path.display(), "Intermediate file not there yet");
            sleep(self.interval.min(self.timeout - waited)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_existing_file_passes_immediately() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ready.json");
        std::fs::write(&path, "[]").unwrap();

        let gate = LoadGate::new(Duration::from_millis(10), Duration::from_millis(5));
        assert!(gate.wait_for(&path).await.is_ok());
    }

    #[tokio::test]
    async fn test_times_out() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("never.json");

        let gate = LoadGate::new(Duration::from_millis(50), Duration::from_millis(10));
        let err = gate.wait_for(&path).await.unwrap_err();
        match err {
            EtlError::HandoffTimeout { waited, .. } => assert!(waited >= Duration::from_millis(50)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_file_appearing_while_polling() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("late.json");

        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            sleep(Duration::from_millis(30)).await;
            std::fs::write(writer_path, "[]").unwrap();
        });

        let gate = LoadGate::new(Duration::from_secs(2), Duration::from_millis(10))
            .with_startup_delay(Duration::from_millis(5));
        assert!(gate.wait_for(&path).await.is_ok());
        writer.await.unwrap();
    }
}
