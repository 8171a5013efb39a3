//! The `speakdrill learners` command.

use std::path::PathBuf;

use anyhow::Result;

use speakdrill_core::traits::HistoryStore;

pub async fn execute(history: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config_path.as_deref())?;
    let store = super::open_store(&config, history);

    let learners = store.learners().await?;
    if learners.is_empty() {
        println!("No learners in {}.", store.path().display());
    }
    for name in learners {
        println!("{name}");
    }
    Ok(())
}
