#![allow(dead_code)]

use async_trait::async_trait;
use logpet::{Error, LogEntry, LogSink, Result};
use parking_lot::Mutex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration, Instant};

/// Records every entry; rejects them all while `online` is false.
#[derive(Default)]
pub struct SwitchSink {
    pub online: AtomicBool,
    pub entries: Mutex<Vec<LogEntry>>,
    pub attempts: Mutex<usize>,
}

impl SwitchSink {
    pub fn offline() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn online() -> Arc<Self> {
        let sink = Self::default();
        sink.online.store(true, Ordering::SeqCst);
        Arc::new(sink)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

#[async_trait]
impl LogSink for SwitchSink {
    async fn send(&self, entry: &LogEntry) -> Result<()> {
        *self.attempts.lock() += 1;
        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Delivery {
                status: "503 Service Unavailable".to_string(),
                body: String::new(),
            });
        }
        self.entries.lock().push(entry.clone());
        Ok(())
    }
}

/// In-memory console shared with the logger.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn offline_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<_> = match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    };
    files.sort();
    files
}

/// Wait until `dir` holds exactly `count` complete JSON files.
pub async fn wait_for_files(dir: &Path, count: usize) -> Vec<PathBuf> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let files = offline_files(dir);
        let complete = files.iter().all(|path| {
            std::fs::read(path)
                .map(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).is_ok())
                .unwrap_or(false)
        });
        if (files.len() == count && complete) || Instant::now() > deadline {
            return files;
        }
        sleep(Duration::from_millis(10)).await;
    }
}

pub fn read_json(path: &Path) -> serde_json::Value {
    let bytes = std::fs::read(path).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
