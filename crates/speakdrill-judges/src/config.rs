//! Configuration loading and judge factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use speakdrill_core::session::SessionConfig;
use speakdrill_core::traits::Judge;

use crate::gemini::GeminiJudge;
use crate::mock::MockJudge;
use crate::openai::OpenAiJudge;

/// Configuration for a single judge backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JudgeConfig {
    Gemini {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    /// Offline judge that accepts every answer.
    Mock,
}

impl std::fmt::Debug for JudgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JudgeConfig::Gemini {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Gemini")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            JudgeConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            JudgeConfig::Mock => f.write_str("Mock"),
        }
    }
}

/// Top-level speakdrill configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakdrillConfig {
    /// Judge configurations keyed by name.
    #[serde(default)]
    pub judges: HashMap<String, JudgeConfig>,
    /// Judge to use when none is named.
    #[serde(default = "default_judge")]
    pub default_judge: String,
    /// Model passed to the judge.
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default)]
    pub temperature: f64,
    /// Max retries on transient judge errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Attempt log location.
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
    /// Question bank location (`.json` or `.toml`).
    #[serde(default = "default_question_bank")]
    pub question_bank: PathBuf,
    /// Recommend a related bank word after an Easy rating.
    #[serde(default)]
    pub chain_related_words: bool,
}

fn default_judge() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}
fn default_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_history_path() -> PathBuf {
    PathBuf::from("speakdrill-history.jsonl")
}
fn default_question_bank() -> PathBuf {
    PathBuf::from("questions.json")
}

impl Default for SpeakdrillConfig {
    fn default() -> Self {
        Self {
            judges: HashMap::new(),
            default_judge: default_judge(),
            default_model: default_model(),
            temperature: 0.0,
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            history_path: default_history_path(),
            question_bank: default_question_bank(),
            chain_related_words: false,
        }
    }
}

impl SpeakdrillConfig {
    /// Session tuning derived from this configuration.
    pub fn session_config(&self, model: Option<&str>) -> SessionConfig {
        SessionConfig {
            model: model.unwrap_or(&self.default_model).to_string(),
            temperature: self.temperature,
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            chain_related_words: self.chain_related_words,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_judge_config(config: &JudgeConfig) -> JudgeConfig {
    match config {
        JudgeConfig::Gemini { api_key, base_url } => JudgeConfig::Gemini {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_deref().map(resolve_env_vars),
        },
        JudgeConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => JudgeConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_deref().map(resolve_env_vars),
            org_id: org_id.as_deref().map(resolve_env_vars),
        },
        JudgeConfig::Mock => JudgeConfig::Mock,
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `speakdrill.toml` in the current directory
/// 2. `~/.config/speakdrill/config.toml`
///
/// Environment variable overrides: `SPEAKDRILL_GEMINI_KEY`, `SPEAKDRILL_OPENAI_KEY`.
pub fn load_config() -> Result<SpeakdrillConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<SpeakdrillConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("speakdrill.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => SpeakdrillConfig::default(),
    };

    if let Ok(key) = std::env::var("SPEAKDRILL_GEMINI_KEY") {
        let entry = config
            .judges
            .entry("gemini".into())
            .or_insert(JudgeConfig::Gemini {
                api_key: String::new(),
                base_url: None,
            });
        if let JudgeConfig::Gemini { api_key, .. } = entry {
            *api_key = key;
        }
    }

    if let Ok(key) = std::env::var("SPEAKDRILL_OPENAI_KEY") {
        let entry = config
            .judges
            .entry("openai".into())
            .or_insert(JudgeConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let JudgeConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }

    Ok(config)
}

/// Parse a configuration document and resolve `${VAR}` references.
pub fn parse_config(content: &str) -> Result<SpeakdrillConfig> {
    let mut config: SpeakdrillConfig = toml::from_str(content)?;
    config.judges = config
        .judges
        .iter()
        .map(|(k, v)| (k.clone(), resolve_judge_config(v)))
        .collect();
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("speakdrill"))
}

/// Create a judge instance from its configuration.
pub fn create_judge(name: &str, config: &JudgeConfig) -> Result<Box<dyn Judge>> {
    match config {
        JudgeConfig::Gemini { api_key, base_url } => {
            if api_key.is_empty() {
                anyhow::bail!("judge '{name}' has no API key; set SPEAKDRILL_GEMINI_KEY");
            }
            Ok(Box::new(GeminiJudge::new(api_key, base_url.clone())))
        }
        JudgeConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => {
            if api_key.is_empty() {
                anyhow::bail!("judge '{name}' has no API key; set SPEAKDRILL_OPENAI_KEY");
            }
            Ok(Box::new(OpenAiJudge::new(
                api_key,
                base_url.clone(),
                org_id.clone(),
            )))
        }
        JudgeConfig::Mock => Ok(Box::new(MockJudge::new(HashMap::new()))),
    }
}

/// Look up `name` (or the default judge) and build it.
///
/// `mock` always resolves, even when not configured.
pub fn judge_from_config(config: &SpeakdrillConfig, name: Option<&str>) -> Result<Box<dyn Judge>> {
    let name = name.unwrap_or(&config.default_judge);
    match config.judges.get(name) {
        Some(judge_config) => create_judge(name, judge_config),
        None if name == "mock" => create_judge(name, &JudgeConfig::Mock),
        None => anyhow::bail!(
            "judge '{name}' not configured; add [judges.{name}] to speakdrill.toml or set its API key"
        ),
    }
}
