//! Append-only JSON-lines history file.
//!
//! One attempt per line, with the column names of the spreadsheet log
//! (`timestamp`, `user`, `word`, `action`, `score`, `is_correct`, `detail`).
//! Lines that cannot be read are skipped with a warning so one bad write
//! never hides the rest of a learner's history.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use speakdrill_core::model::AttemptRecord;
use speakdrill_core::parser::parse_history_line;
use speakdrill_core::traits::HistoryStore;

pub struct JsonlHistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every readable record in file order. A missing file is an empty log.
    pub async fn read_all(&self) -> Result<Vec<AttemptRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read history: {}", self.path.display()))
            }
        };

        let mut records = Vec::new();
        for (i, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match parse_history_line(line) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    line = i + 1,
                    "skipping history line: {e:#}"
                ),
            }
        }
        Ok(records)
    }

    /// Append several records with one write. Returns how many were written.
    pub async fn append_all(&self, records: &[AttemptRecord]) -> Result<usize> {
        let mut buf = String::new();
        for record in records {
            buf.push_str(&serde_json::to_string(record)?);
            buf.push('\n');
        }
        self.write(buf.as_bytes()).await?;
        Ok(records.len())
    }

    async fn write(&self, bytes: &[u8]) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("failed to open history: {}", self.path.display()))?;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for JsonlHistoryStore {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn query(&self, learner: &str) -> Result<Vec<AttemptRecord>> {
        let mut records = self.read_all().await?;
        records.retain(|r| r.learner == learner);
        Ok(records)
    }

    async fn append(&self, record: &AttemptRecord) -> Result<()> {
        self.append_all(std::slice::from_ref(record)).await?;
        Ok(())
    }

    async fn learners(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for r in self.read_all().await? {
            if !names.contains(&r.learner) {
                names.push(r.learner);
            }
        }
        Ok(names)
    }
}
