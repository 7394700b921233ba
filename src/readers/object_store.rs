use crate::error::{EtlError, Result};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use std::path::PathBuf;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Read-only access to raw exports: fetch by key, list by prefix.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// All keys starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Human-readable location for log lines
    fn describe(&self, key: &str) -> String;
}

/// Objects in an S3 bucket; credentials come from the standard AWS chain.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub async fn connect(bucket: &str, region: &str) -> Self {
        let region_provider =
            RegionProviderChain::default_provider().or_else(Region::new(region.to_string()));
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        debug!(bucket, "Connected S3 object store");
        Self::with_client(Client::new(&shared_config), bucket)
    }

    pub fn with_client(client: Client, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let obj = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| EtlError::ObjectStore(format!("get {}: {}", key, DisplayErrorContext(&e))))?;

        let data = obj
            .body
            .collect()
            .await
            .map_err(|e| EtlError::ObjectStore(format!("read body of {}: {}", key, e)))?
            .into_bytes();

        trace!(key, bytes = data.len(), "Fetched object");
        Ok(data.to_vec())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| {
                    EtlError::ObjectStore(format!("list {}: {}", prefix, DisplayErrorContext(&e)))
                })?;

            keys.extend(
                resp.contents()
                    .iter()
                    .filter_map(|obj| obj.key())
                    .map(str::to_string),
            );

            match resp.next_continuation_token() {
                Some(token) if resp.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn describe(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

/// A directory tree laid out like the bucket; keys use `/` separators.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key);
        let data = tokio::fs::read(&path).await?;
        trace!(key, bytes = data.len(), "Read local object");
        Ok(data)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = entry.map_err(|e| EtlError::ObjectStore(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|e| EtlError::ObjectStore(e.to_string()))?;
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if key.starts_with(prefix) {
                keys.push(key);
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn describe(&self, key: &str) -> String {
        self.path_for(key).display().to_string()
    }
}
