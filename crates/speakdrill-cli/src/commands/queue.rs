//! The `speakdrill queue` command.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use comfy_table::{Cell, Table};

use speakdrill_core::scheduler::{schedule, PriorityTier, ScheduledQuestion};
use speakdrill_core::traits::HistoryStore;

pub async fn execute(
    learner: String,
    recommend: Option<String>,
    bank: Option<PathBuf>,
    history: Option<PathBuf>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = super::load_config(config_path.as_deref())?;
    let questions = super::load_bank(&config, bank);
    let store = super::open_store(&config, history);
    let records = store.query(&learner).await?;

    let scheduled = schedule(
        questions,
        &records,
        &learner,
        recommend.as_deref(),
        Utc::now(),
    );

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&scheduled)?),
        "table" => print_table(&learner, &scheduled),
        other => anyhow::bail!("unknown format: {other} (expected table or json)"),
    }
    Ok(())
}

fn print_table(learner: &str, scheduled: &[ScheduledQuestion]) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Word", "Tier", "Priority", "Streak", "Last attempt"]);

    for (i, s) in scheduled.iter().enumerate() {
        let priority = match s.tier {
            PriorityTier::Recommended => "max".to_string(),
            PriorityTier::Unseen => format!("{:.3}", s.priority),
            PriorityTier::Review => format!("{:+.2}", s.priority),
        };
        let tier = match s.tier {
            PriorityTier::Recommended => "recommended",
            PriorityTier::Unseen => "unseen",
            PriorityTier::Review => "review",
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&s.question.word),
            Cell::new(tier),
            Cell::new(priority),
            Cell::new(s.mastery.streak),
            Cell::new(
                s.mastery
                    .last_attempt
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }

    println!("Queue for {learner} ({} questions)", scheduled.len());
    println!("{table}");
}
