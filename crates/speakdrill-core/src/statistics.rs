//! Per-learner summaries of the attempt log.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::mastery::MasteryState;
use crate::model::{ActionKind, AttemptRecord};

/// One point of the pronunciation score series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScorePoint {
    pub at: DateTime<Utc>,
    pub word: String,
    pub score: f64,
}

/// Mastery figures for one word.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordSummary {
    pub word: String,
    pub attempts: usize,
    pub streak: u32,
    pub last_attempt: Option<DateTime<Utc>>,
    pub due_interval_days: u32,
    /// `None` when the word has no dated attempts.
    pub lateness_days: Option<f64>,
}

/// Summary of one learner's history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySummary {
    pub learner: String,
    pub total_activities: usize,
    /// Mean over dated and undated pronunciation attempts; `None` without any.
    pub average_pronunciation_score: Option<f64>,
    pub total_passes: usize,
    /// Pronunciation scores in time order. Undated attempts are left out.
    pub pronunciation_scores: Vec<ScorePoint>,
    /// Sorted by lateness, most overdue first, then words without dates.
    pub words: Vec<WordSummary>,
    /// Every record, newest first. Undated records come last in log order.
    pub records: Vec<AttemptRecord>,
}

impl HistorySummary {
    pub fn compute(history: &[AttemptRecord], learner: &str, now: DateTime<Utc>) -> Self {
        let records: Vec<&AttemptRecord> =
            history.iter().filter(|r| r.learner == learner).collect();

        let pronunciation: Vec<&AttemptRecord> = records
            .iter()
            .copied()
            .filter(|r| r.action == ActionKind::Pronunciation)
            .collect();

        let average_pronunciation_score = if pronunciation.is_empty() {
            None
        } else {
            Some(pronunciation.iter().map(|r| r.score).sum::<f64>() / pronunciation.len() as f64)
        };

        let mut pronunciation_scores: Vec<ScorePoint> = pronunciation
            .iter()
            .filter_map(|r| {
                r.timestamp.instant().map(|at| ScorePoint {
                    at,
                    word: r.word.clone(),
                    score: r.score,
                })
            })
            .collect();
        pronunciation_scores.sort_by_key(|p| p.at);

        let mut by_word: HashMap<&str, Vec<&AttemptRecord>> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        for r in records.iter().copied() {
            by_word
                .entry(r.word.as_str())
                .or_insert_with(|| {
                    order.push(r.word.as_str());
                    Vec::new()
                })
                .push(r);
        }

        let mut words: Vec<WordSummary> = order
            .into_iter()
            .map(|word| {
                let word_records = &by_word[word];
                let mastery = MasteryState::from_records(word_records.iter().copied());
                WordSummary {
                    word: word.to_string(),
                    attempts: word_records.len(),
                    streak: mastery.streak,
                    last_attempt: mastery.last_attempt,
                    due_interval_days: mastery.due_interval_days(),
                    lateness_days: mastery.lateness_days(now),
                }
            })
            .collect();

        words.sort_by(|a, b| match (a.lateness_days, b.lateness_days) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        let mut newest_first: Vec<AttemptRecord> = records.iter().copied().cloned().collect();
        newest_first.sort_by(|a, b| b.timestamp.instant().cmp(&a.timestamp.instant()));

        Self {
            learner: learner.to_string(),
            total_activities: records.len(),
            average_pronunciation_score,
            total_passes: records.iter().filter(|r| r.passed).count(),
            pronunciation_scores,
            words,
            records: newest_first,
        }
    }
}
