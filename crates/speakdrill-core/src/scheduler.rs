//! Priority scheduling of the question set.
//!
//! Every question gets a priority from the highest tier it qualifies for:
//!
//! 1. the recommended word (case-insensitive match) gets [`RECOMMENDED_PRIORITY`];
//! 2. a word with no dated history gets `1000 + U[0, 1)`, so unseen words
//!    surface early but in a different order on each pass;
//! 3. anything else gets its lateness: days since the last attempt minus
//!    the due interval for its streak.
//!
//! The result is sorted by priority, highest first, with a stable sort so
//! equal priorities keep input order. Priorities only mean something
//! relative to the other questions of the same pass.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use crate::mastery::MasteryState;
use crate::model::{AttemptRecord, Question};

/// Priority of the recommended word; above anything the other tiers produce.
pub const RECOMMENDED_PRIORITY: f64 = f64::MAX;

/// Base priority of words without dated history.
pub const UNSEEN_PRIORITY: f64 = 1000.0;

/// Which rule produced a priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    Recommended,
    Unseen,
    Review,
}

/// A question with the priority attached by one scheduling pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledQuestion {
    pub question: Question,
    pub priority: f64,
    pub tier: PriorityTier,
    pub mastery: MasteryState,
}

/// Rank `questions` for `learner` using the thread-local RNG for jitter.
pub fn schedule<I>(
    questions: I,
    history: &[AttemptRecord],
    learner: &str,
    recommended_word: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<ScheduledQuestion>
where
    I: IntoIterator<Item = Question>,
{
    schedule_with_rng(
        questions,
        history,
        learner,
        recommended_word,
        now,
        &mut rand::rng(),
    )
}

/// Rank `questions` for `learner`, drawing unseen-word jitter from `rng`.
pub fn schedule_with_rng<I, R>(
    questions: I,
    history: &[AttemptRecord],
    learner: &str,
    recommended_word: Option<&str>,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<ScheduledQuestion>
where
    I: IntoIterator<Item = Question>,
    R: Rng + ?Sized,
{
    let mut by_word: HashMap<&str, Vec<&AttemptRecord>> = HashMap::new();
    for record in history.iter().filter(|r| r.learner == learner) {
        by_word.entry(record.word.as_str()).or_default().push(record);
    }

    let recommended = recommended_word
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase);

    let mut scheduled: Vec<ScheduledQuestion> = questions
        .into_iter()
        .map(|question| {
            let mastery = by_word
                .get(question.word.as_str())
                .map(|records| MasteryState::from_records(records.iter().copied()))
                .unwrap_or_default();

            let is_recommended = recommended
                .as_deref()
                .is_some_and(|w| question.word.to_lowercase() == w);

            let (tier, priority) = if is_recommended {
                (PriorityTier::Recommended, RECOMMENDED_PRIORITY)
            } else {
                match mastery.lateness_days(now) {
                    Some(lateness) => (PriorityTier::Review, lateness),
                    None => (
                        PriorityTier::Unseen,
                        UNSEEN_PRIORITY + rng.random::<f64>(),
                    ),
                }
            };

            ScheduledQuestion {
                question,
                priority,
                tier,
                mastery,
            }
        })
        .collect();

    // `sort_by` is stable.
    scheduled.sort_by(|a, b| b.priority.total_cmp(&a.priority));

    tracing::debug!(
        learner,
        questions = scheduled.len(),
        recommended = recommended.as_deref().unwrap_or(""),
        head = scheduled.first().map(|s| s.question.word.as_str()).unwrap_or(""),
        "scheduled question set"
    );

    scheduled
}

/// Strip a scheduled queue back to plain questions, keeping its order.
pub fn into_questions(scheduled: Vec<ScheduledQuestion>) -> Vec<Question> {
    scheduled.into_iter().map(|s| s.question).collect()
}
