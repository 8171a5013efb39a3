//! Subcommand implementations.

use std::path::{Path, PathBuf};

use anyhow::Result;

use speakdrill_core::model::Question;
use speakdrill_core::parser::load_bank_or_default;
use speakdrill_judges::config::load_config_from;
use speakdrill_judges::SpeakdrillConfig;
use speakdrill_store::JsonlHistoryStore;

pub mod history;
pub mod import;
pub mod init;
pub mod learners;
pub mod list_models;
pub mod practice;
pub mod queue;
pub mod validate;

pub(crate) fn load_config(path: Option<&Path>) -> Result<SpeakdrillConfig> {
    load_config_from(path)
}

pub(crate) fn open_store(config: &SpeakdrillConfig, history: Option<PathBuf>) -> JsonlHistoryStore {
    JsonlHistoryStore::new(history.unwrap_or_else(|| config.history_path.clone()))
}

pub(crate) fn load_bank(config: &SpeakdrillConfig, bank: Option<PathBuf>) -> Vec<Question> {
    let path = bank.unwrap_or_else(|| config.question_bank.clone());
    load_bank_or_default(Some(&path))
}
