//! The `speakdrill validate` command.

use std::path::PathBuf;

use anyhow::Result;

use speakdrill_core::parser::{load_bank, validate_bank};

pub fn execute(bank_path: PathBuf) -> Result<()> {
    let bank = load_bank(&bank_path)?;
    println!(
        "Question bank: {} ({} questions)",
        bank_path.display(),
        bank.len()
    );

    let warnings = validate_bank(&bank);
    for w in &warnings {
        let prefix = w
            .word
            .as_ref()
            .map(|word| format!("  [{word}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Question bank valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
