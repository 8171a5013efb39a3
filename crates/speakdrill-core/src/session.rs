//! One learner's practice session.
//!
//! The session owns the scheduled queue and the learner's in-memory
//! history. Every judged answer and every self rating appends a record,
//! re-schedules the whole question set and moves back to the head, so the
//! queue is always a fresh ranking rather than a fixed sequence.
//!
//! ```text
//! Presenting ──submit──▶ AwaitingJudgment ──verdict──▶ (record, re-sort) ──▶ Presenting
//!     │                        └──judge error──▶ Presenting (nothing recorded)
//!     ├──rate──▶ (record, re-sort) ──▶ Presenting
//!     └──skip──▶ Presenting(next) | Completed ──restart──▶ Presenting
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::seq::SliceRandom;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::error::JudgeError;
use crate::history::{HistoryWriter, WriterStats};
use crate::model::{AttemptRecord, Question, SelfRating, Skill};
use crate::parser::default_bank;
use crate::scheduler::{schedule, ScheduledQuestion};
use crate::traits::{AudioClip, HintRequest, HistoryStore, Judge, JudgeRequest, Rubric, Verdict};

/// Tuning for a session's judge calls.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Model identifier passed to the judge.
    pub model: String,
    pub temperature: f64,
    /// Retries on transient judge errors.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_delay: Duration,
    /// After an Easy rating, recommend a related word from the bank.
    pub chain_related_words: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash-lite".into(),
            temperature: 0.0,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            chain_related_words: false,
        }
    }
}

/// Where the session is in its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// The question at the current position is on screen.
    Presenting,
    /// A recording is with the judge.
    AwaitingJudgment,
    /// The queue is exhausted.
    Completed,
}

/// Errors from session operations. None of them end the session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session completed: no current question")]
    Completed,

    #[error("\"{word}\" has no {skill} exercise")]
    SkillUnavailable { word: String, skill: Skill },

    #[error("judge call failed: {0:#}")]
    Judge(anyhow::Error),
}

/// The result of a self rating.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingOutcome {
    pub record: AttemptRecord,
    /// Word moved to the head of the queue, if any.
    pub recommended: Option<String>,
}

/// Session context for one learner.
pub struct Session {
    id: Uuid,
    learner: String,
    bank: Vec<Question>,
    queue: Vec<ScheduledQuestion>,
    position: usize,
    turn: u64,
    state: SessionState,
    history: Vec<AttemptRecord>,
    judge: Arc<dyn Judge>,
    store: Arc<dyn HistoryStore>,
    writer: HistoryWriter,
    config: SessionConfig,
}

impl Session {
    /// Load the learner's history and schedule the bank.
    ///
    /// An empty bank is replaced by the built-in one. A history that cannot
    /// be read is treated as empty.
    pub async fn start(
        learner: &str,
        bank: Vec<Question>,
        judge: Arc<dyn Judge>,
        store: Arc<dyn HistoryStore>,
        config: SessionConfig,
    ) -> Self {
        let bank = if bank.is_empty() {
            tracing::warn!("empty question bank, using built-in bank");
            default_bank()
        } else {
            bank
        };

        let history = load_history(store.as_ref(), learner).await;
        let writer = HistoryWriter::spawn(Arc::clone(&store));

        let mut session = Self {
            id: Uuid::new_v4(),
            learner: learner.to_string(),
            bank,
            queue: Vec::new(),
            position: 0,
            turn: 0,
            state: SessionState::Presenting,
            history,
            judge,
            store,
            writer,
            config,
        };
        session.reschedule(None);

        tracing::info!(
            session = %session.id,
            learner,
            questions = session.bank.len(),
            history = session.history.len(),
            "session started"
        );
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn learner(&self) -> &str {
        &self.learner
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of recorded events so far.
    pub fn turn(&self) -> u64 {
        self.turn
    }

    /// The current ranking, head first.
    pub fn queue(&self) -> &[ScheduledQuestion] {
        &self.queue
    }

    /// The learner's history as the scheduler sees it.
    pub fn history(&self) -> &[AttemptRecord] {
        &self.history
    }

    pub fn writer_stats(&self) -> WriterStats {
        self.writer.stats()
    }

    pub fn current(&self) -> Option<&Question> {
        if self.state == SessionState::Completed {
            return None;
        }
        self.queue.get(self.position).map(|s| &s.question)
    }

    /// Send a recording for the current question to the judge.
    ///
    /// On success the verdict is recorded and the queue re-sorted. On
    /// failure nothing is recorded and the same question stays current.
    pub async fn submit(&mut self, skill: Skill, audio: AudioClip) -> Result<Verdict, SessionError> {
        let question = self.current().ok_or(SessionError::Completed)?.clone();
        let rubric =
            Rubric::for_question(&question, skill).ok_or_else(|| SessionError::SkillUnavailable {
                word: question.word.clone(),
                skill,
            })?;

        let request = JudgeRequest {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            audio,
            rubric,
        };

        self.state = SessionState::AwaitingJudgment;
        let verdict = match self.evaluate_with_retry(&request).await {
            Ok(verdict) => verdict,
            Err(e) => {
                self.state = SessionState::Presenting;
                tracing::warn!(word = %question.word, %skill, "judge failed: {e:#}");
                return Err(SessionError::Judge(e));
            }
        };

        let record =
            AttemptRecord::judged(&self.learner, &question.word, skill, &verdict, Utc::now());
        self.commit(record, None);
        Ok(verdict)
    }

    /// Record a self rating for the current question.
    pub async fn rate(&mut self, rating: SelfRating) -> Result<RatingOutcome, SessionError> {
        let word = self.current().ok_or(SessionError::Completed)?.word.clone();

        let recommended = if rating == SelfRating::Easy && self.config.chain_related_words {
            self.related_in_bank(&word).await
        } else {
            None
        };

        let record = AttemptRecord::self_rated(&self.learner, &word, rating, Utc::now());
        self.commit(record.clone(), recommended.as_deref());
        Ok(RatingOutcome {
            record,
            recommended,
        })
    }

    /// Move to the next question without recording anything.
    pub fn skip(&mut self) -> Result<SessionState, SessionError> {
        if self.state == SessionState::Completed {
            return Err(SessionError::Completed);
        }
        self.position += 1;
        if self.position >= self.queue.len() {
            self.state = SessionState::Completed;
        }
        Ok(self.state)
    }

    /// Shuffle the queue and start again from its head.
    pub fn restart(&mut self) {
        self.queue.shuffle(&mut rand::rng());
        self.position = 0;
        self.state = if self.queue.is_empty() {
            SessionState::Completed
        } else {
            SessionState::Presenting
        };
        tracing::debug!(session = %self.id, "queue reshuffled");
    }

    /// Keywords that help explain the current word.
    pub async fn hint(&self) -> Result<String, SessionError> {
        let question = self.current().ok_or(SessionError::Completed)?;
        let request = HintRequest {
            model: self.config.model.clone(),
            word: question.word.clone(),
            definition: question
                .definition
                .clone()
                .or_else(|| question.translation.clone())
                .unwrap_or_default(),
        };
        self.judge
            .hint(&request)
            .await
            .map_err(SessionError::Judge)
    }

    /// Continue with another learner's history on the same bank.
    pub async fn switch_learner(&mut self, learner: &str) {
        self.learner = learner.to_string();
        self.history = load_history(self.store.as_ref(), learner).await;
        self.reschedule(None);
        tracing::info!(session = %self.id, learner, "switched learner");
    }

    /// Wait for queued records to reach the store.
    pub async fn finish(self) -> WriterStats {
        let stats = self.writer.shutdown().await;
        tracing::info!(
            session = %self.id,
            turns = self.turn,
            written = stats.written,
            failed = stats.failed,
            "session finished"
        );
        stats
    }

    fn commit(&mut self, record: AttemptRecord, recommended: Option<&str>) {
        self.history.push(record.clone());
        self.writer.record(record);
        self.turn += 1;
        self.reschedule(recommended);
    }

    fn reschedule(&mut self, recommended: Option<&str>) {
        self.queue = schedule(
            self.bank.iter().cloned(),
            &self.history,
            &self.learner,
            recommended,
            Utc::now(),
        );
        self.position = 0;
        self.state = if self.queue.is_empty() {
            SessionState::Completed
        } else {
            SessionState::Presenting
        };
    }

    async fn related_in_bank(&self, word: &str) -> Option<String> {
        let related = match self.judge.related_words(&self.config.model, word).await {
            Ok(words) => words,
            Err(e) => {
                tracing::warn!(word, "related-word lookup failed: {e:#}");
                return None;
            }
        };
        related.iter().find_map(|candidate| {
            self.bank
                .iter()
                .find(|q| {
                    q.word.eq_ignore_ascii_case(candidate) && !q.word.eq_ignore_ascii_case(word)
                })
                .map(|q| q.word.clone())
        })
    }

    async fn evaluate_with_retry(&self, request: &JudgeRequest) -> anyhow::Result<Verdict> {
        let mut delay = self.config.retry_delay;
        let mut attempt = 0;
        loop {
            match self.judge.evaluate(request).await {
                Ok(verdict) => return Ok(verdict),
                Err(e) => {
                    let judge_error = e.downcast_ref::<JudgeError>();
                    if attempt >= self.config.max_retries
                        || judge_error.is_some_and(JudgeError::is_permanent)
                    {
                        return Err(e);
                    }
                    if let Some(ms) = judge_error.and_then(JudgeError::retry_after_ms) {
                        delay = Duration::from_millis(ms);
                    }
                    attempt += 1;
                    tracing::debug!(
                        judge = self.judge.name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying judge call: {e:#}"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(Duration::from_secs(60));
                }
            }
        }
    }
}

async fn load_history(store: &dyn HistoryStore, learner: &str) -> Vec<AttemptRecord> {
    match store.query(learner).await {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(store = store.name(), learner, "could not read history: {e:#}");
            Vec::new()
        }
    }
}
