//! speakdrill-judges — AI judge integrations.
//!
//! Implements the `Judge` trait for Gemini and OpenAI audio models, plus a
//! mock judge, so a practice session can grade spoken answers.

pub mod config;
pub mod gemini;
mod http;
pub mod mock;
pub mod openai;

pub use config::{
    create_judge, judge_from_config, load_config, load_config_from, JudgeConfig, SpeakdrillConfig,
};
pub use speakdrill_core::error::JudgeError;
