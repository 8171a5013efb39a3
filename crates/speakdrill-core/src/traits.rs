//! Core trait definitions for judges and history stores.
//!
//! These async traits are implemented by the `speakdrill-judges` and
//! `speakdrill-store` crates respectively.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::JudgeError;
use crate::model::{AttemptRecord, Question, Skill, PRONUNCIATION_PASS_SCORE};

// ---------------------------------------------------------------------------
// Judge trait
// ---------------------------------------------------------------------------

/// Trait for AI backends that judge spoken answers.
#[async_trait]
pub trait Judge: Send + Sync {
    /// Human-readable judge name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Evaluate a recording against a rubric.
    async fn evaluate(&self, request: &JudgeRequest) -> anyhow::Result<Verdict>;

    /// Suggest a few keywords that help explain a word without naming it.
    async fn hint(&self, request: &HintRequest) -> anyhow::Result<String>;

    /// Synonyms and antonyms of a word, lower-cased.
    async fn related_words(&self, model: &str, word: &str) -> anyhow::Result<Vec<String>>;

    /// List available models for this judge.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// A recorded answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    /// MIME type, e.g. `audio/wav`.
    pub mime_type: String,
}

impl AudioClip {
    pub fn wav(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: "audio/wav".to_string(),
        }
    }

    /// Read a recording from disk, guessing the MIME type from the extension.
    pub async fn from_file(path: &Path) -> anyhow::Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read recording: {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("wav")
            .to_lowercase();
        let mime_type = match ext.as_str() {
            "mp3" => "audio/mp3",
            "ogg" => "audio/ogg",
            "flac" => "audio/flac",
            "webm" => "audio/webm",
            "m4a" | "aac" => "audio/aac",
            _ => "audio/wav",
        };
        Ok(Self {
            bytes,
            mime_type: mime_type.to_string(),
        })
    }

    /// Short container name (`wav`, `mp3`, ...).
    pub fn format(&self) -> &str {
        self.mime_type
            .strip_prefix("audio/")
            .unwrap_or(&self.mime_type)
    }
}

/// What the judge should check a recording against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rubric {
    /// Reading a sentence aloud, scored 0–100.
    Pronunciation { sentence: String },
    /// Saying the Japanese meaning of a word, pass/fail.
    Translation {
        word: String,
        expected_meaning: String,
    },
    /// Explaining a word in English, pass/fail.
    Definition { word: String, definition: String },
}

impl Rubric {
    /// The rubric for practising `skill` on `question`, if the question
    /// carries the fields that skill needs.
    pub fn for_question(question: &Question, skill: Skill) -> Option<Rubric> {
        let present = |field: &Option<String>| {
            field
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        match skill {
            Skill::Pronunciation => Some(Rubric::Pronunciation {
                sentence: question.sentence.clone(),
            }),
            Skill::JapaneseMeaning => {
                present(&question.translation).map(|expected_meaning| Rubric::Translation {
                    word: question.word.clone(),
                    expected_meaning,
                })
            }
            Skill::EnglishDefinition => {
                present(&question.definition).map(|definition| Rubric::Definition {
                    word: question.word.clone(),
                    definition,
                })
            }
        }
    }

    pub fn skill(&self) -> Skill {
        match self {
            Rubric::Pronunciation { .. } => Skill::Pronunciation,
            Rubric::Translation { .. } => Skill::JapaneseMeaning,
            Rubric::Definition { .. } => Skill::EnglishDefinition,
        }
    }

    /// The text the learner is aiming for.
    pub fn target(&self) -> &str {
        match self {
            Rubric::Pronunciation { sentence } => sentence,
            Rubric::Translation {
                expected_meaning, ..
            } => expected_meaning,
            Rubric::Definition { definition, .. } => definition,
        }
    }

    /// Instruction sent to the judge alongside the recording.
    pub fn prompt(&self) -> String {
        match self {
            Rubric::Pronunciation { sentence } => format!(
                "You are an English pronunciation coach with a strict native-speaker standard.\n\
                 The learner read this sentence aloud: \"{sentence}\"\n\
                 Do not overlook small slips in sounds, stress or intonation.\n\
                 Reply with JSON only:\n\
                 {{\"transcription\": \"what you heard\", \"score\": <0-100, judged strictly>, \
                 \"advice\": \"concrete points to improve, written in Japanese\"}}"
            ),
            Rubric::Translation {
                word,
                expected_meaning,
            } => format!(
                "You are a strict English teacher.\n\
                 The learner said the Japanese meaning of the English word \"{word}\".\n\
                 The expected answer is \"{expected_meaning}\".\n\
                 Synonyms and answers that capture the core meaning are correct. \
                 Vague answers or answers with a different nuance are incorrect.\n\
                 Reply with JSON only:\n\
                 {{\"transcription\": \"the Japanese you heard\", \"is_correct\": true or false, \
                 \"comment\": \"short reason, in Japanese\"}}"
            ),
            Rubric::Definition { word, definition } => format!(
                "You are a strict English teacher.\n\
                 The learner tried to explain the English word \"{word}\" in English.\n\
                 Reference definition: \"{definition}\"\n\
                 The explanation does not need to match word for word, but it must capture \
                 the core meaning. Vague explanations, or grammar mistakes that hide the \
                 meaning, are incorrect.\n\
                 Reply with JSON only:\n\
                 {{\"transcription\": \"the English you heard\", \"is_correct\": true or false, \
                 \"comment\": \"feedback on what to improve, in Japanese\"}}"
            ),
        }
    }
}

/// Request to judge a recording.
#[derive(Debug, Clone)]
pub struct JudgeRequest {
    /// Model identifier (e.g. "gemini-2.5-flash-lite").
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    pub audio: AudioClip,
    pub rubric: Rubric,
}

/// Request for an explanation hint.
#[derive(Debug, Clone)]
pub struct HintRequest {
    pub model: String,
    pub word: String,
    pub definition: String,
}

impl HintRequest {
    pub fn prompt(&self) -> String {
        format!(
            "Word: \"{}\"\nDefinition: \"{}\"\n\n\
             Give 3 simple English keywords or concepts related to this word that would help \
             someone explain it. Do not use the word itself or its direct derivatives.\n\
             For example, for 'Apple' the keywords could be 'Fruit, Red, Pie'.\n\
             Output format: Keyword1, Keyword2, Keyword3",
            self.word, self.definition
        )
    }
}

/// Prompt asking for synonyms and antonyms of a word.
pub fn related_words_prompt(word: &str) -> String {
    format!(
        "List 5 synonyms and 5 antonyms for the word \"{word}\".\n\
         Output ONLY the words, separated by commas. No labels like 'Synonyms:'.\n\
         Simple format: word1, word2, word3..."
    )
}

/// Split a comma or newline separated word list, lower-cased and de-duplicated.
pub fn parse_word_list(text: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for item in text.split([',', '\n']) {
        let item = item
            .rsplit(':')
            .next()
            .unwrap_or(item)
            .trim_matches(|c: char| {
                c.is_whitespace() || matches!(c, '-' | '*' | '.' | '"' | '\'' | '[' | ']' | '{' | '}')
            })
            .to_lowercase();
        if !item.is_empty() && !words.contains(&item) {
            words.push(item);
        }
    }
    words
}

/// Structured result of a judged recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// What the judge heard.
    pub transcript: String,
    pub outcome: VerdictOutcome,
    /// Advice or comment for the learner.
    pub feedback: String,
}

/// A numeric score or a plain pass/fail, depending on the rubric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictOutcome {
    Score(f64),
    Pass(bool),
}

impl Verdict {
    pub fn passed(&self) -> bool {
        match self.outcome {
            VerdictOutcome::Score(score) => score >= PRONUNCIATION_PASS_SCORE,
            VerdictOutcome::Pass(passed) => passed,
        }
    }

    /// Score on the 0–100 scale; pass/fail verdicts map to 100 or 0.
    pub fn score(&self) -> f64 {
        match self.outcome {
            VerdictOutcome::Score(score) => score,
            VerdictOutcome::Pass(true) => 100.0,
            VerdictOutcome::Pass(false) => 0.0,
        }
    }
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Judge name.
    pub provider: String,
    /// Maximum context window size in tokens.
    pub max_context: u32,
    /// Cost per 1K input tokens in USD.
    pub cost_per_1k_input: f64,
    /// Cost per 1K output tokens in USD.
    pub cost_per_1k_output: f64,
}

// ---------------------------------------------------------------------------
// History store trait
// ---------------------------------------------------------------------------

/// Trait for the append-only attempt log.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Human-readable store name (e.g. "jsonl").
    fn name(&self) -> &str;

    /// All records for one learner, in no particular order.
    async fn query(&self, learner: &str) -> anyhow::Result<Vec<AttemptRecord>>;

    /// Append one record.
    async fn append(&self, record: &AttemptRecord) -> anyhow::Result<()>;

    /// Distinct learner names, in first-seen order.
    async fn learners(&self) -> anyhow::Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// Verdict parsing
// ---------------------------------------------------------------------------

/// Default system prompt for judges.
pub const JUDGE_SYSTEM_PROMPT: &str = "You are an English speaking coach. Respond ONLY with the JSON object requested. Do not add explanations or markdown outside the JSON.";

#[derive(Deserialize)]
struct RawVerdict {
    #[serde(default, alias = "transcript")]
    transcription: Option<String>,
    #[serde(default)]
    score: Option<serde_json::Value>,
    #[serde(default)]
    is_correct: Option<serde_json::Value>,
    #[serde(default)]
    advice: Option<String>,
    #[serde(default)]
    comment: Option<String>,
}

/// Parse a judge's text response into a verdict for `skill`.
pub fn parse_verdict(response: &str, skill: Skill) -> Result<Verdict, JudgeError> {
    let json = extract_json_from_markdown(response);
    let raw: RawVerdict = serde_json::from_str(&json)
        .map_err(|e| JudgeError::MalformedVerdict(format!("{e}: {}", truncate(response))))?;

    let transcript = raw
        .transcription
        .ok_or_else(|| JudgeError::MalformedVerdict("missing transcription".into()))?;

    let outcome = match skill {
        Skill::Pronunciation => {
            let score = raw
                .score
                .as_ref()
                .and_then(number_from_json)
                .ok_or_else(|| JudgeError::MalformedVerdict("missing numeric score".into()))?;
            VerdictOutcome::Score(score.clamp(0.0, 100.0))
        }
        Skill::JapaneseMeaning | Skill::EnglishDefinition => {
            let passed = raw
                .is_correct
                .as_ref()
                .and_then(bool_from_json)
                .ok_or_else(|| JudgeError::MalformedVerdict("missing is_correct".into()))?;
            VerdictOutcome::Pass(passed)
        }
    };

    let feedback = raw.advice.or(raw.comment).unwrap_or_default();

    Ok(Verdict {
        transcript,
        outcome,
        feedback,
    })
}

fn number_from_json(value: &serde_json::Value) -> Option<f64> {
    let n = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn bool_from_json(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn truncate(s: &str) -> String {
    s.chars().take(120).collect()
}

/// Extract a JSON payload from a markdown-formatted LLM response.
///
/// Handles:
/// - ```json``` blocks (first one wins)
/// - Generic ``` blocks (if no json-specific block found)
/// - Raw text, trimmed to the outermost `{ ... }` when surrounded by prose
pub fn extract_json_from_markdown(response: &str) -> String {
    let mut json_block = None;
    let mut generic_block = None;
    let mut in_block = false;
    let mut is_json_block = false;
    let mut current_block = String::new();

    for line in response.lines() {
        let trimmed = line.trim();

        if !in_block && trimmed.starts_with("```") {
            in_block = true;
            let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
            is_json_block = lang == "json";
            current_block.clear();
            continue;
        }

        if in_block && trimmed.starts_with("```") {
            in_block = false;
            if is_json_block && json_block.is_none() {
                json_block = Some(current_block.clone());
            } else if generic_block.is_none() {
                generic_block = Some(current_block.clone());
            }
            continue;
        }

        if in_block {
            if !current_block.is_empty() {
                current_block.push('\n');
            }
            current_block.push_str(line);
        }
    }

    // Truncated (unclosed) block
    if in_block && !current_block.is_empty() {
        if is_json_block && json_block.is_none() {
            json_block = Some(current_block);
        } else if generic_block.is_none() {
            generic_block = Some(current_block);
        }
    }

    let body = json_block
        .or(generic_block)
        .unwrap_or_else(|| response.to_string());

    match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => body[start..=end].to_string(),
        _ => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_block() {
        let input = "```json\n{\"transcription\": \"hi\", \"score\": 90}\n```";
        assert_eq!(
            extract_json_from_markdown(input),
            "{\"transcription\": \"hi\", \"score\": 90}"
        );
    }

    #[test]
    fn extract_json_surrounded_by_prose() {
        let input = "Sure! Here is my verdict: {\"is_correct\": true} Hope it helps.";
        assert_eq!(extract_json_from_markdown(input), "{\"is_correct\": true}");
    }

    #[test]
    fn extract_prefers_json_over_generic() {
        let input = "```\n{\"a\": 1}\n```\n\n```json\n{\"b\": 2}\n```";
        assert_eq!(extract_json_from_markdown(input), "{\"b\": 2}");
    }

    #[test]
    fn extract_truncated_block() {
        let input = "```json\n{\"transcription\": \"cut\", \"score\": 40}";
        assert!(extract_json_from_markdown(input).contains("\"score\": 40"));
    }

    #[test]
    fn parse_pronunciation_verdict() {
        let v = parse_verdict(
            r#"{"transcription": "I'd like to make an appointment.", "score": 86, "advice": "良いです"}"#,
            Skill::Pronunciation,
        )
        .unwrap();
        assert_eq!(v.outcome, VerdictOutcome::Score(86.0));
        assert!(v.passed());
        assert_eq!(v.feedback, "良いです");
    }

    #[test]
    fn parse_score_as_string_and_clamp() {
        let v = parse_verdict(
            r#"{"transcription": "x", "score": "120"}"#,
            Skill::Pronunciation,
        )
        .unwrap();
        assert_eq!(v.score(), 100.0);
    }

    #[test]
    fn parse_meaning_verdict() {
        let v = parse_verdict(
            "```json\n{\"transcription\": \"予約\", \"is_correct\": \"false\", \"comment\": \"惜しい\"}\n```",
            Skill::JapaneseMeaning,
        )
        .unwrap();
        assert!(!v.passed());
        assert_eq!(v.score(), 0.0);
        assert_eq!(v.transcript, "予約");
    }

    #[test]
    fn malformed_verdicts_are_errors() {
        assert!(matches!(
            parse_verdict("I could not hear anything.", Skill::Pronunciation),
            Err(JudgeError::MalformedVerdict(_))
        ));
        assert!(matches!(
            parse_verdict(r#"{"transcription": "x"}"#, Skill::Pronunciation),
            Err(JudgeError::MalformedVerdict(_))
        ));
        assert!(matches!(
            parse_verdict(r#"{"score": 90}"#, Skill::Pronunciation),
            Err(JudgeError::MalformedVerdict(_))
        ));
        assert!(matches!(
            parse_verdict(r#"{"transcription": "x", "score": 90}"#, Skill::EnglishDefinition),
            Err(JudgeError::MalformedVerdict(_))
        ));
    }

    #[test]
    fn word_list_parsing() {
        let words = parse_word_list("Meeting, Reservation,\nengagement, - Booking, meeting");
        assert_eq!(words, vec!["meeting", "reservation", "engagement", "booking"]);
        assert_eq!(parse_word_list("Synonyms: calm"), vec!["calm"]);
    }

    #[test]
    fn word_list_from_quoted_or_json_reply() {
        let words = parse_word_list(r#"{"synonyms": ["trip", "voyage"], "antonyms": ["stay"]}"#);
        assert_eq!(words, vec!["trip", "voyage", "stay"]);
        assert_eq!(
            parse_word_list(r#""Trip", "voyage", 'stay'"#),
            vec!["trip", "voyage", "stay"]
        );
    }

    #[test]
    fn rubric_requires_optional_fields() {
        let q = Question {
            word: "Appointment".into(),
            translation: None,
            definition: Some("an arrangement to meet".into()),
            sentence: "I'd like to make an appointment.".into(),
            sentence_translation: None,
        };
        assert!(Rubric::for_question(&q, Skill::JapaneseMeaning).is_none());
        let rubric = Rubric::for_question(&q, Skill::EnglishDefinition).unwrap();
        assert_eq!(rubric.skill(), Skill::EnglishDefinition);
        assert_eq!(rubric.target(), "an arrangement to meet");
        assert!(rubric.prompt().contains("Appointment"));
    }

    #[test]
    fn audio_format_from_mime() {
        let clip = AudioClip::wav(vec![0, 1, 2]);
        assert_eq!(clip.format(), "wav");
    }

    #[tokio::test]
    async fn audio_from_file_guesses_mime_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answer.MP3");
        std::fs::write(&path, b"ID3").unwrap();

        let clip = AudioClip::from_file(&path).await.unwrap();
        assert_eq!(clip.bytes, b"ID3");
        assert_eq!(clip.mime_type, "audio/mp3");

        assert!(AudioClip::from_file(&dir.path().join("missing.wav"))
            .await
            .is_err());
    }
}
