//! Question bank and history row parsing.
//!
//! Loads question banks from JSON or TOML files, and turns loosely typed
//! history rows into validated [`AttemptRecord`]s.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::model::{ActionKind, AttemptRecord, Question, RecordedAt};

// ---------------------------------------------------------------------------
// Question bank
// ---------------------------------------------------------------------------

/// One entry of a JSON question bank.
#[derive(Debug, Deserialize)]
struct JsonQuestion {
    #[serde(default)]
    word: Option<String>,
    #[serde(default)]
    word_jp: Option<String>,
    #[serde(default)]
    word_en: Option<String>,
    #[serde(default)]
    en: Option<String>,
    #[serde(default)]
    jp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlBank {
    #[serde(default)]
    questions: Vec<Question>,
}

/// Built-in bank used when no usable bank file is available.
pub fn default_bank() -> Vec<Question> {
    vec![
        Question {
            word: "Photography".into(),
            translation: Some("写真撮影".into()),
            definition: Some("the art or practice of taking and processing photographs".into()),
            sentence: "I am interested in photography.".into(),
            sentence_translation: Some("私は写真に興味があります。".into()),
        },
        Question {
            word: "Appointment".into(),
            translation: Some("予約".into()),
            definition: Some(
                "an arrangement to meet someone at a particular time and place".into(),
            ),
            sentence: "I'd like to make an appointment.".into(),
            sentence_translation: Some("予約を取りたいのですが。".into()),
        },
    ]
}

/// Parse a question bank file. `.toml` files use the `[[questions]]` layout,
/// anything else is read as a JSON array.
pub fn load_bank(path: &Path) -> Result<Vec<Question>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    if path.extension().is_some_and(|ext| ext == "toml") {
        parse_bank_toml(&content, path)
    } else {
        parse_bank_json(&content)
            .with_context(|| format!("failed to parse question bank: {}", path.display()))
    }
}

/// Load a bank, falling back to [`default_bank`] when the file is missing,
/// unreadable, or yields no usable questions.
pub fn load_bank_or_default(path: Option<&Path>) -> Vec<Question> {
    let Some(path) = path else {
        return default_bank();
    };
    if !path.exists() {
        tracing::info!("question bank {} not found, using built-in bank", path.display());
        return default_bank();
    }
    match load_bank(path) {
        Ok(questions) if !questions.is_empty() => questions,
        Ok(_) => {
            tracing::warn!("question bank {} is empty, using built-in bank", path.display());
            default_bank()
        }
        Err(e) => {
            tracing::warn!("{e:#}; using built-in bank");
            default_bank()
        }
    }
}

/// Parse a JSON array of `{word, word_jp, word_en, en, jp}` objects.
///
/// Entries without a word or an example sentence are skipped.
pub fn parse_bank_json(content: &str) -> Result<Vec<Question>> {
    let entries: Vec<JsonQuestion> = serde_json::from_str(content)?;
    let questions = entries
        .into_iter()
        .filter_map(|q| {
            let word = non_empty(q.word)?;
            let sentence = non_empty(q.en)?;
            Some(Question {
                word,
                translation: non_empty(q.word_jp),
                definition: non_empty(q.word_en),
                sentence,
                sentence_translation: non_empty(q.jp),
            })
        })
        .collect();
    Ok(questions)
}

/// Parse a TOML bank with `[[questions]]` tables.
pub fn parse_bank_toml(content: &str, source_path: &Path) -> Result<Vec<Question>> {
    let parsed: TomlBank = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;
    Ok(parsed
        .questions
        .into_iter()
        .filter(|q| !q.word.trim().is_empty() && !q.sentence.trim().is_empty())
        .collect())
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.trim().is_empty())
}

/// A warning from question bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The word (if applicable).
    pub word: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a question bank for common issues.
pub fn validate_bank(questions: &[Question]) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if questions.is_empty() {
        warnings.push(ValidationWarning {
            word: None,
            message: "bank has no usable questions; the built-in bank will be used".into(),
        });
    }

    // Recommendations match case-insensitively, so case-only duplicates collide.
    let mut seen = std::collections::HashSet::new();
    for q in questions {
        if !seen.insert(q.word.to_lowercase()) {
            warnings.push(ValidationWarning {
                word: Some(q.word.clone()),
                message: format!("duplicate word: {}", q.word),
            });
        }
    }

    for q in questions {
        if q.sentence.trim().is_empty() {
            warnings.push(ValidationWarning {
                word: Some(q.word.clone()),
                message: "sentence is empty".into(),
            });
        }
        if q.translation.is_none() && q.definition.is_none() {
            warnings.push(ValidationWarning {
                word: Some(q.word.clone()),
                message: "no translation or definition; only pronunciation will be practised"
                    .into(),
            });
        }
    }

    warnings
}

// ---------------------------------------------------------------------------
// History rows
// ---------------------------------------------------------------------------

/// Column names of the attempt log, in spreadsheet order.
pub const HISTORY_HEADERS: [&str; 7] = [
    "timestamp",
    "user",
    "word",
    "action",
    "score",
    "is_correct",
    "detail",
];

/// A history row as read from a loosely typed source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAttemptRow {
    #[serde(default)]
    pub timestamp: Value,
    #[serde(default)]
    pub user: Value,
    #[serde(default)]
    pub word: Value,
    #[serde(default)]
    pub action: Value,
    #[serde(default)]
    pub score: Value,
    #[serde(default)]
    pub is_correct: Value,
    #[serde(default)]
    pub detail: Value,
}

impl RawAttemptRow {
    /// Validate into a typed record, or explain why the row is unusable.
    ///
    /// Unreadable timestamps are kept as [`RecordedAt::Unparsed`]; unreadable
    /// scores become 0.
    pub fn validate(self) -> Result<AttemptRecord, String> {
        let learner = text(&self.user).ok_or("missing user")?;
        let word = text(&self.word).ok_or("missing word")?;
        let action: ActionKind = text(&self.action)
            .ok_or_else(|| "missing action".to_string())?
            .parse()?;

        let timestamp = match text(&self.timestamp) {
            Some(raw) => RecordedAt::parse(&raw),
            None => RecordedAt::Unparsed(String::new()),
        };

        Ok(AttemptRecord {
            timestamp,
            learner,
            word,
            action,
            score: score(&self.score),
            passed: flag(&self.is_correct),
            detail: text(&self.detail).unwrap_or_default(),
        })
    }
}

fn text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn score(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "1"),
        _ => false,
    }
}

/// Validate rows, dropping the unusable ones with a warning.
pub fn parse_history_rows<I>(rows: I) -> Vec<AttemptRecord>
where
    I: IntoIterator<Item = RawAttemptRow>,
{
    rows.into_iter()
        .enumerate()
        .filter_map(|(i, row)| match row.validate() {
            Ok(record) => Some(record),
            Err(reason) => {
                tracing::warn!("skipping history row {}: {reason}", i + 1);
                None
            }
        })
        .collect()
}

/// Parse one JSON object line of the attempt log.
pub fn parse_history_line(line: &str) -> Result<AttemptRecord> {
    let row: RawAttemptRow = serde_json::from_str(line).context("invalid JSON")?;
    row.validate().map_err(|reason| anyhow::anyhow!(reason))
}

/// Parse a spreadsheet-shaped table of string cells.
///
/// The first row is skipped when it is the header row; otherwise every row
/// is data. Cells are taken in [`HISTORY_HEADERS`] order.
pub fn parse_history_table(rows: &[Vec<String>]) -> Vec<AttemptRecord> {
    let is_header = |row: &Vec<String>| {
        row.len() >= HISTORY_HEADERS.len()
            && row
                .iter()
                .zip(HISTORY_HEADERS)
                .all(|(cell, header)| cell.trim().eq_ignore_ascii_case(header))
    };

    let data = match rows.first() {
        Some(first) if is_header(first) => &rows[1..],
        _ => rows,
    };

    parse_history_rows(data.iter().map(|row| {
        let cell = |i: usize| {
            row.get(i)
                .map(|s| Value::String(s.clone()))
                .unwrap_or(Value::Null)
        };
        RawAttemptRow {
            timestamp: cell(0),
            user: cell(1),
            word: cell(2),
            action: cell(3),
            score: cell(4),
            is_correct: cell(5),
            detail: cell(6),
        }
    }))
}
