//! The `speakdrill import` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use speakdrill_core::parser::parse_history_table;

pub async fn execute(
    tsv: PathBuf,
    history: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = super::load_config(config_path.as_deref())?;
    let store = super::open_store(&config, history);

    let content = std::fs::read_to_string(&tsv)
        .with_context(|| format!("failed to read {}", tsv.display()))?;
    let rows: Vec<Vec<String>> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split('\t').map(|cell| cell.to_string()).collect())
        .collect();

    let records = parse_history_table(&rows);
    let imported = store.append_all(&records).await?;
    tracing::info!(
        rows = rows.len(),
        imported,
        "imported history rows"
    );

    println!(
        "Imported {imported} record(s) into {}",
        store.path().display()
    );
    Ok(())
}
