use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

/// Prefix shared by every offline log file.
pub const OFFLINE_LOG_PREFIX: &str = "log-";

/// The part of a persisted entry needed to replay it.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct OfflineLog {
    pub status: String,
    pub message: String,
}

/// Directory of entries whose delivery failed.
///
/// Each failed delivery becomes one JSON file; replay reads the files
/// back and removes them once re-enqueued.
#[derive(Debug)]
pub struct OfflineStore {
    dir: PathBuf,
    seq: AtomicU64,
}

impl OfflineStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seq: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `log-<RFC3339Nano>-<seq>.json`. The sequence keeps two failures in
    /// the same nanosecond from overwriting each other.
    pub fn next_filename(&self, now: DateTime<Utc>) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}{}-{}.json",
            OFFLINE_LOG_PREFIX,
            now.to_rfc3339_opts(SecondsFormat::Nanos, true),
            seq
        )
    }

    /// Write `bytes` under `filename`, creating the directory if needed.
    /// Colons are replaced since some filesystems reject them. An existing
    /// file with the same name is overwritten.
    pub async fn persist(&self, bytes: &[u8], filename: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::persistence(&self.dir, e))?;

        let path = self.dir.join(sanitize_filename(filename));
        fs::write(&path, bytes)
            .await
            .map_err(|e| Error::persistence(&path, e))?;

        tracing::debug!(target: "logpet", path = %path.display(), "saved offline log");
        Ok(path)
    }

    /// Offline log files currently on disk, oldest name first.
    ///
    /// A directory that does not exist yet holds no logs.
    pub async fn list(&self) -> Result<Vec<PathBuf>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::persistence(&self.dir, e)),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::persistence(&self.dir, e))?
        {
            let is_log = entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with(OFFLINE_LOG_PREFIX))
                .unwrap_or(false);
            if is_log {
                paths.push(entry.path());
            }
        }

        paths.sort();
        Ok(paths)
    }

    pub async fn load(&self, path: &Path) -> Result<OfflineLog> {
        let bytes = fs::read(path).await.map_err(|e| Error::persistence(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| Error::decode(path, e))
    }

    pub async fn remove(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)
            .await
            .map_err(|e| Error::persistence(path, e))
    }
}

fn sanitize_filename(filename: &str) -> String {
    filename.replace(':', "-")
}
