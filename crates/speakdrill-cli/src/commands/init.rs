//! The `speakdrill init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("speakdrill.toml").exists() {
        println!("speakdrill.toml already exists, skipping.");
    } else {
        std::fs::write("speakdrill.toml", SAMPLE_CONFIG)?;
        println!("Created speakdrill.toml");
    }

    if std::path::Path::new("questions.json").exists() {
        println!("questions.json already exists, skipping.");
    } else {
        std::fs::write("questions.json", SAMPLE_BANK)?;
        println!("Created questions.json");
    }

    println!("\nNext steps:");
    println!("  1. Set GEMINI_API_KEY (or edit speakdrill.toml)");
    println!("  2. Run: speakdrill validate --bank questions.json");
    println!("  3. Run: speakdrill practice --learner <name>");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# speakdrill configuration

default_judge = "gemini"
default_model = "gemini-2.5-flash-lite"
max_retries = 3
retry_delay_ms = 1000
history_path = "speakdrill-history.jsonl"
question_bank = "questions.json"
chain_related_words = false

[judges.gemini]
type = "gemini"
api_key = "${GEMINI_API_KEY}"

[judges.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[judges.mock]
type = "mock"
"#;

const SAMPLE_BANK: &str = r#"[
  {
    "word": "Photography",
    "word_jp": "写真撮影",
    "word_en": "the art or practice of taking and processing photographs",
    "en": "I am interested in photography.",
    "jp": "私は写真に興味があります。"
  },
  {
    "word": "Appointment",
    "word_jp": "予約",
    "word_en": "an arrangement to meet someone at a particular time and place",
    "en": "I'd like to make an appointment.",
    "jp": "予約を取りたいのですが。"
  },
  {
    "word": "Schedule",
    "word_jp": "予定",
    "word_en": "a plan of things that will be done and the times they will be done",
    "en": "My schedule is full this week.",
    "jp": "今週は予定がいっぱいです。"
  },
  {
    "word": "Journey",
    "word_jp": "旅",
    "word_en": "an act of travelling from one place to another",
    "en": "The journey took three hours.",
    "jp": "その旅は三時間かかりました。"
  },
  {
    "word": "Trip",
    "word_jp": "旅行",
    "word_en": "a short journey to a place and back",
    "en": "We went on a trip to Kyoto.",
    "jp": "私たちは京都へ旅行に行きました。"
  }
]
"#;
