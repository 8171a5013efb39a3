//! In-memory history store.

use std::sync::Mutex;

use async_trait::async_trait;

use speakdrill_core::model::AttemptRecord;
use speakdrill_core::traits::HistoryStore;

/// History kept in a vector. Used for guest sessions and tests.
#[derive(Default)]
pub struct MemoryHistoryStore {
    records: Mutex<Vec<AttemptRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records.
    pub fn with_records(records: Vec<AttemptRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    /// Every record, in append order.
    pub fn snapshot(&self) -> Vec<AttemptRecord> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<AttemptRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn query(&self, learner: &str) -> anyhow::Result<Vec<AttemptRecord>> {
        Ok(self
            .lock()
            .iter()
            .filter(|r| r.learner == learner)
            .cloned()
            .collect())
    }

    async fn append(&self, record: &AttemptRecord) -> anyhow::Result<()> {
        self.lock().push(record.clone());
        Ok(())
    }

    async fn learners(&self) -> anyhow::Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for r in self.lock().iter() {
            if !names.contains(&r.learner) {
                names.push(r.learner.clone());
            }
        }
        Ok(names)
    }
}
