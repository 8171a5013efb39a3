//! Background persistence of attempt records.
//!
//! The session never waits on the store: records go into a channel and a
//! tokio task appends them one by one. Store failures are logged and
//! counted here and never reach the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::model::AttemptRecord;
use crate::traits::HistoryStore;

/// Counters for one writer's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriterStats {
    pub written: u64,
    pub failed: u64,
}

/// Fire-and-forget appender in front of a [`HistoryStore`].
pub struct HistoryWriter {
    tx: mpsc::UnboundedSender<AttemptRecord>,
    handle: JoinHandle<()>,
    written: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl HistoryWriter {
    /// Spawn the writer task. Must be called inside a tokio runtime.
    pub fn spawn(store: Arc<dyn HistoryStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<AttemptRecord>();
        let written = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));

        let handle = {
            let written = Arc::clone(&written);
            let failed = Arc::clone(&failed);
            tokio::spawn(async move {
                while let Some(record) = rx.recv().await {
                    match store.append(&record).await {
                        Ok(()) => {
                            written.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(
                                store = store.name(),
                                learner = %record.learner,
                                word = %record.word,
                                "failed to persist attempt: {e:#}"
                            );
                        }
                    }
                }
                tracing::debug!(store = store.name(), "history writer drained");
            })
        };

        Self {
            tx,
            handle,
            written,
            failed,
        }
    }

    /// Queue a record for persistence. Never blocks.
    pub fn record(&self, record: AttemptRecord) {
        if self.tx.send(record).is_err() {
            self.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("history writer has stopped; attempt not persisted");
        }
    }

    /// Counts so far. Records still queued are in neither count.
    pub fn stats(&self) -> WriterStats {
        WriterStats {
            written: self.written.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Close the queue and wait until every queued record has been handled.
    pub async fn shutdown(self) -> WriterStats {
        let Self {
            tx,
            handle,
            written,
            failed,
        } = self;
        drop(tx);
        if let Err(e) = handle.await {
            tracing::warn!("history writer task ended abnormally: {e}");
        }
        WriterStats {
            written: written.load(Ordering::Relaxed),
            failed: failed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActionKind, RecordedAt};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct VecStore {
        records: Mutex<Vec<AttemptRecord>>,
        fail_words: Vec<String>,
    }

    #[async_trait]
    impl HistoryStore for VecStore {
        fn name(&self) -> &str {
            "vec"
        }

        async fn query(&self, learner: &str) -> anyhow::Result<Vec<AttemptRecord>> {
            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .filter(|r| r.learner == learner)
                .cloned()
                .collect())
        }

        async fn append(&self, record: &AttemptRecord) -> anyhow::Result<()> {
            if self.fail_words.contains(&record.word) {
                anyhow::bail!("disk full");
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn learners(&self) -> anyhow::Result<Vec<String>> {
            Ok(vec![])
        }
    }

    fn record(word: &str) -> AttemptRecord {
        AttemptRecord {
            timestamp: RecordedAt::Unparsed(String::new()),
            learner: "Kai".into(),
            word: word.into(),
            action: ActionKind::SelfRating,
            score: 100.0,
            passed: true,
            detail: "Easy".into(),
        }
    }

    #[tokio::test]
    async fn shutdown_drains_queue_in_order() {
        let store = Arc::new(VecStore::default());
        let writer = HistoryWriter::spawn(store.clone());
        for word in ["A", "B", "C"] {
            writer.record(record(word));
        }
        let stats = writer.shutdown().await;
        assert_eq!(stats, WriterStats { written: 3, failed: 0 });

        let words: Vec<String> = store
            .query("Kai")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.word)
            .collect();
        assert_eq!(words, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn store_failures_are_counted_not_returned() {
        let store = Arc::new(VecStore {
            fail_words: vec!["Bad".into()],
            ..Default::default()
        });
        let writer = HistoryWriter::spawn(store.clone());
        writer.record(record("Good"));
        writer.record(record("Bad"));
        writer.record(record("Good"));
        let stats = writer.shutdown().await;
        assert_eq!(stats, WriterStats { written: 2, failed: 1 });
    }
}
