//! The `speakdrill list-models` command.

use std::path::PathBuf;

use anyhow::Result;

use speakdrill_judges::create_judge;

pub fn execute(judge_filter: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config_path.as_deref())?;

    let mut names: Vec<&String> = config.judges.keys().collect();
    names.sort();

    let mut found_any = false;

    for name in names {
        if judge_filter.as_ref().is_some_and(|filter| filter != name) {
            continue;
        }

        let judge = match create_judge(name, &config.judges[name]) {
            Ok(judge) => judge,
            Err(e) => {
                eprintln!("Skipping judge {name}: {e:#}");
                continue;
            }
        };
        let models = judge.available_models();

        if !models.is_empty() {
            found_any = true;
            println!("Judge: {name}");
            for model in &models {
                println!(
                    "  {} - {} ({}K context, ${:.4}/{:.4} per 1K tokens)",
                    model.id,
                    model.name,
                    model.max_context / 1000,
                    model.cost_per_1k_input,
                    model.cost_per_1k_output,
                );
            }
            println!();
        }
    }

    if !found_any {
        println!("No judges configured. Run `speakdrill init` to create a config file.");
    }

    Ok(())
}
