//! Core data model types for speakdrill.
//!
//! Questions come from a static bank loaded at session start; attempt
//! records are the append-only log the scheduler reads back.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::traits::Verdict;

/// Pronunciation scores below this count as a failure.
pub const PRONUNCIATION_PASS_SCORE: f64 = 80.0;

/// A single practice item.
///
/// `word` is the key within one bank; history records refer back to it by
/// plain string equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// The vocabulary word.
    pub word: String,
    /// Expected Japanese meaning of the word.
    #[serde(default)]
    pub translation: Option<String>,
    /// English definition of the word.
    #[serde(default)]
    pub definition: Option<String>,
    /// Example sentence the learner reads aloud.
    pub sentence: String,
    /// Translation of the example sentence.
    #[serde(default)]
    pub sentence_translation: Option<String>,
}

impl Question {
    /// Skills that can be practised for this question, in presentation order.
    ///
    /// Missing optional fields simply drop the matching skill.
    pub fn skills(&self) -> Vec<Skill> {
        let mut skills = Vec::with_capacity(3);
        if has_text(&self.translation) {
            skills.push(Skill::JapaneseMeaning);
        }
        if has_text(&self.definition) {
            skills.push(Skill::EnglishDefinition);
        }
        skills.push(Skill::Pronunciation);
        skills
    }

    pub fn supports(&self, skill: Skill) -> bool {
        self.skills().contains(&skill)
    }
}

fn has_text(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// A skill the external judge can evaluate from a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    /// Read the example sentence aloud.
    Pronunciation,
    /// Say the Japanese meaning of the word.
    JapaneseMeaning,
    /// Explain the word in English.
    EnglishDefinition,
}

impl Skill {
    /// The action logged for an attempt at this skill.
    pub fn action(self) -> ActionKind {
        match self {
            Skill::Pronunciation => ActionKind::Pronunciation,
            Skill::JapaneseMeaning => ActionKind::JapaneseMeaning,
            Skill::EnglishDefinition => ActionKind::EnglishDefinition,
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.action(), f)
    }
}

/// What kind of event an attempt record logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    #[serde(rename = "Pronunciation")]
    Pronunciation,
    #[serde(rename = "Japanese Meaning", alias = "JapaneseMeaning")]
    JapaneseMeaning,
    #[serde(rename = "English Definition", alias = "EnglishDefinition")]
    EnglishDefinition,
    #[serde(rename = "SelfRating", alias = "Self Rating")]
    SelfRating,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Pronunciation => write!(f, "Pronunciation"),
            ActionKind::JapaneseMeaning => write!(f, "Japanese Meaning"),
            ActionKind::EnglishDefinition => write!(f, "English Definition"),
            ActionKind::SelfRating => write!(f, "SelfRating"),
        }
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "pronunciation" => Ok(ActionKind::Pronunciation),
            "japanesemeaning" => Ok(ActionKind::JapaneseMeaning),
            "englishdefinition" => Ok(ActionKind::EnglishDefinition),
            "selfrating" => Ok(ActionKind::SelfRating),
            _ => Err(format!("unknown action: {s}")),
        }
    }
}

/// The learner's own judgement after practising a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfRating {
    /// "Got it", move on.
    Easy,
    /// "Still unsure", bring it back soon.
    Hard,
}

impl SelfRating {
    /// Label stored in the record's `detail` field.
    pub fn label(self) -> &'static str {
        match self {
            SelfRating::Easy => "Easy",
            SelfRating::Hard => "Hard",
        }
    }
}

impl FromStr for SelfRating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(SelfRating::Easy),
            "hard" => Ok(SelfRating::Hard),
            other => Err(format!("unknown self rating: {other}")),
        }
    }
}

/// When an attempt happened, as far as the log can tell.
///
/// Histories come from loosely typed sources; a value that cannot be read
/// as a point in time is kept verbatim instead of being dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedAt {
    At(DateTime<Utc>),
    Unparsed(String),
}

impl RecordedAt {
    /// Parse a timestamp string.
    ///
    /// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff]`, `YYYY-MM-DDTHH:MM:SS[.fff]`
    /// and bare dates. Values without an offset are read as UTC.
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
            return RecordedAt::At(ts.with_timezone(&Utc));
        }
        for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return RecordedAt::At(naive.and_utc());
            }
        }
        if let Some(naive) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return RecordedAt::At(naive.and_utc());
        }
        RecordedAt::Unparsed(raw.to_string())
    }

    /// The instant, if the timestamp was readable.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            RecordedAt::At(ts) => Some(*ts),
            RecordedAt::Unparsed(_) => None,
        }
    }
}

impl From<DateTime<Utc>> for RecordedAt {
    fn from(ts: DateTime<Utc>) -> Self {
        RecordedAt::At(ts)
    }
}

impl fmt::Display for RecordedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordedAt::At(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            RecordedAt::Unparsed(raw) => write!(f, "{raw}"),
        }
    }
}

impl Serialize for RecordedAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RecordedAt::At(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            RecordedAt::Unparsed(raw) => serializer.serialize_str(raw),
        }
    }
}

impl<'de> Deserialize<'de> for RecordedAt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(RecordedAt::parse(&raw))
    }
}

/// One logged learner event. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub timestamp: RecordedAt,
    #[serde(rename = "user")]
    pub learner: String,
    /// Matches `Question::word` by string equality; may name a word that is
    /// no longer in the bank.
    pub word: String,
    pub action: ActionKind,
    /// 0–100; 0 when the action carries no score.
    #[serde(default)]
    pub score: f64,
    #[serde(rename = "is_correct")]
    pub passed: bool,
    #[serde(default)]
    pub detail: String,
}

impl AttemptRecord {
    /// Build the record for a judged recording.
    pub fn judged(
        learner: &str,
        word: &str,
        skill: Skill,
        verdict: &Verdict,
        at: DateTime<Utc>,
    ) -> Self {
        let detail = match skill {
            Skill::Pronunciation => format!("Transcription: {}", verdict.transcript),
            Skill::JapaneseMeaning | Skill::EnglishDefinition => verdict.transcript.clone(),
        };
        Self {
            timestamp: RecordedAt::At(at),
            learner: learner.to_string(),
            word: word.to_string(),
            action: skill.action(),
            score: verdict.score(),
            passed: verdict.passed(),
            detail,
        }
    }

    /// Build the record for a self rating.
    pub fn self_rated(learner: &str, word: &str, rating: SelfRating, at: DateTime<Utc>) -> Self {
        let passed = rating == SelfRating::Easy;
        Self {
            timestamp: RecordedAt::At(at),
            learner: learner.to_string(),
            word: word.to_string(),
            action: ActionKind::SelfRating,
            score: if passed { 100.0 } else { 0.0 },
            passed,
            detail: rating.label().to_string(),
        }
    }

    /// Whether this attempt extends a streak.
    ///
    /// Automatically scored actions apply stricter rules than the stored
    /// flag: a pronunciation below the pass score and a "Hard" self rating
    /// are failures whatever `passed` says.
    pub fn counts_as_pass(&self) -> bool {
        match self.action {
            ActionKind::Pronunciation if self.score < PRONUNCIATION_PASS_SCORE => false,
            ActionKind::SelfRating if self.detail == SelfRating::Hard.label() => false,
            _ => self.passed,
        }
    }
}
