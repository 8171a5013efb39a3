//! Mastery estimation from attempt history.
//!
//! A word's mastery is the run of consecutive passes counted back from the
//! most recent attempt, across every action kind logged for it, plus the
//! time of that most recent attempt.
//!
//! Records whose timestamp could not be read are left out entirely: they
//! neither extend nor break a streak and never count as the last attempt.
//! A word whose only records are undated is therefore treated as unseen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::AttemptRecord;

/// Due interval in days for a given streak.
///
/// Fixed curve: 0, 1, 3, 7, 14, then 30 for every streak of 5 or more.
pub fn due_interval_days(streak: u32) -> u32 {
    match streak {
        0 => 0,
        1 => 1,
        2 => 3,
        3 => 7,
        4 => 14,
        _ => 30,
    }
}

/// Derived per-word mastery. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MasteryState {
    /// Consecutive most-recent passes.
    pub streak: u32,
    /// Most recent dated attempt, if any.
    pub last_attempt: Option<DateTime<Utc>>,
}

impl MasteryState {
    /// Mastery from records that already belong to one learner and one word.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a AttemptRecord>,
    {
        let mut dated: Vec<(DateTime<Utc>, &AttemptRecord)> = records
            .into_iter()
            .filter_map(|r| r.timestamp.instant().map(|ts| (ts, r)))
            .collect();

        // Newest first; equal timestamps keep log order.
        dated.sort_by(|a, b| b.0.cmp(&a.0));

        let Some(&(last_attempt, _)) = dated.first() else {
            return Self::default();
        };

        let streak = dated
            .iter()
            .take_while(|(_, r)| r.counts_as_pass())
            .count() as u32;

        Self {
            streak,
            last_attempt: Some(last_attempt),
        }
    }

    pub fn due_interval_days(&self) -> u32 {
        due_interval_days(self.streak)
    }

    /// When the word is next due, if it has been attempted.
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.last_attempt
            .map(|last| last + chrono::Duration::days(i64::from(self.due_interval_days())))
    }

    /// Days since the last attempt minus the due interval.
    ///
    /// Positive means overdue, negative means not yet due, `None` means the
    /// word has no dated history.
    pub fn lateness_days(&self, now: DateTime<Utc>) -> Option<f64> {
        self.last_attempt.map(|last| {
            let elapsed = (now - last).num_milliseconds() as f64 / MILLIS_PER_DAY;
            elapsed - f64::from(self.due_interval_days())
        })
    }
}

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Mastery of `word` for `learner`, scanning the full history.
pub fn estimate(history: &[AttemptRecord], learner: &str, word: &str) -> MasteryState {
    MasteryState::from_records(
        history
            .iter()
            .filter(|r| r.learner == learner && r.word == word),
    )
}
