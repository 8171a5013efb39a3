//! The `speakdrill history` command.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use comfy_table::{Cell, Table};

use speakdrill_core::statistics::HistorySummary;
use speakdrill_core::traits::HistoryStore;

pub async fn execute(
    learner: String,
    history: Option<PathBuf>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = super::load_config(config_path.as_deref())?;
    let store = super::open_store(&config, history);
    let records = store.query(&learner).await?;
    let summary = HistorySummary::compute(&records, &learner, Utc::now());

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        "table" => print_summary(&summary),
        other => anyhow::bail!("unknown format: {other} (expected table or json)"),
    }
    Ok(())
}

fn print_summary(summary: &HistorySummary) {
    if summary.total_activities == 0 {
        println!("No history for {}.", summary.learner);
        return;
    }

    println!("Learner: {}", summary.learner);
    println!("Total activities: {}", summary.total_activities);
    match summary.average_pronunciation_score {
        Some(avg) => println!("Average pronunciation score: {avg:.1}"),
        None => println!("Average pronunciation score: -"),
    }
    println!("Passes: {}", summary.total_passes);

    let mut table = Table::new();
    table.set_header(vec![
        "Word",
        "Attempts",
        "Streak",
        "Last attempt",
        "Interval",
        "Lateness",
    ]);
    for w in &summary.words {
        table.add_row(vec![
            Cell::new(&w.word),
            Cell::new(w.attempts),
            Cell::new(w.streak),
            Cell::new(
                w.last_attempt
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(format!("{}d", w.due_interval_days)),
            Cell::new(
                w.lateness_days
                    .map(|l| format!("{l:+.1}d"))
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }
    println!("\n{table}");

    if !summary.pronunciation_scores.is_empty() {
        println!("\nPronunciation scores:");
        for point in &summary.pronunciation_scores {
            println!(
                "  {}  {:>3.0} {:<20} {}",
                point.at.format("%Y-%m-%d %H:%M"),
                point.score,
                "#".repeat((point.score / 5.0).round() as usize),
                point.word
            );
        }
    }

    let mut records = Table::new();
    records.set_header(vec!["Time", "Word", "Action", "Score", "Correct", "Detail"]);
    for r in &summary.records {
        records.add_row(vec![
            Cell::new(&r.timestamp),
            Cell::new(&r.word),
            Cell::new(r.action),
            Cell::new(format!("{:.0}", r.score)),
            Cell::new(if r.passed { "yes" } else { "no" }),
            Cell::new(&r.detail),
        ]);
    }
    println!("\nDetailed history (newest first):\n{records}");
}
