//! speakdrill CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "speakdrill",
    version,
    about = "Spoken vocabulary practice coach with adaptive review"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Practise interactively on the terminal
    Practice {
        /// Learner name
        #[arg(long)]
        learner: String,

        /// Judge to use (default from config)
        #[arg(long)]
        judge: Option<String>,

        /// Model to use (default from config)
        #[arg(long)]
        model: Option<String>,

        /// Question bank (.json or .toml)
        #[arg(long)]
        bank: Option<PathBuf>,

        /// History file (.jsonl)
        #[arg(long)]
        history: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show the scheduled question order for a learner
    Queue {
        /// Learner name
        #[arg(long)]
        learner: String,

        /// Word to put first
        #[arg(long)]
        recommend: Option<String>,

        /// Question bank (.json or .toml)
        #[arg(long)]
        bank: Option<PathBuf>,

        /// History file (.jsonl)
        #[arg(long)]
        history: Option<PathBuf>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Summarise a learner's history
    History {
        /// Learner name
        #[arg(long)]
        learner: String,

        /// History file (.jsonl)
        #[arg(long)]
        history: Option<PathBuf>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List learners found in the history
    Learners {
        /// History file (.jsonl)
        #[arg(long)]
        history: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Import a tab-separated spreadsheet export into the history
    Import {
        /// TSV file with timestamp, user, word, action, score, is_correct, detail
        #[arg(long)]
        tsv: PathBuf,

        /// History file (.jsonl)
        #[arg(long)]
        history: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a question bank
    Validate {
        /// Question bank (.json or .toml)
        #[arg(long)]
        bank: PathBuf,
    },

    /// List available models
    ListModels {
        /// Filter to specific judge
        #[arg(long)]
        judge: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and question bank
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("speakdrill=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Practice {
            learner,
            judge,
            model,
            bank,
            history,
            config,
        } => {
            commands::practice::execute(
                learner,
                judge,
                model,
                bank,
                history,
                config,
            )
            .await
        }
        Commands::Queue {
            learner,
            recommend,
            bank,
            history,
            format,
            config,
        } => commands::queue::execute(learner, recommend, bank, history, format, config).await,
        Commands::History {
            learner,
            history,
            format,
            config,
        } => commands::history::execute(learner, history, format, config).await,
        Commands::Learners { history, config } => {
            commands::learners::execute(history, config).await
        }
        Commands::Import {
            tsv,
            history,
            config,
        } => commands::import::execute(tsv, history, config).await,
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::ListModels { judge, config } => commands::list_models::execute(judge, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
