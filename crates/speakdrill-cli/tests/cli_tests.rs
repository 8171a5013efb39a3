//! CLI integration tests using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn speakdrill(dir: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("speakdrill").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env_remove("SPEAKDRILL_GEMINI_KEY")
        .env_remove("SPEAKDRILL_OPENAI_KEY")
        .env_remove("RUST_LOG");
    cmd
}

const BANK: &str = r#"[
  {"word": "Schedule", "word_jp": "予定", "word_en": "a plan of when things happen",
   "en": "My schedule is full.", "jp": "予定がいっぱいです。"},
  {"word": "Atmosphere", "en": "The atmosphere was relaxed."}
]"#;

fn history() -> String {
    let at = |days: i64| (chrono::Utc::now() - chrono::Duration::days(days)).to_rfc3339();
    format!(
        concat!(
            r#"{{"timestamp":"{}","user":"Kai","word":"Schedule","action":"Pronunciation","score":90,"is_correct":true,"detail":"Transcription: my schedule is full"}}"#,
            "\n",
            r#"{{"timestamp":"{}","user":"Mio","word":"Atmosphere","action":"SelfRating","score":0,"is_correct":false,"detail":"Hard"}}"#,
            "\n",
        ),
        at(10),
        at(9)
    )
}

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("questions.json"), BANK).unwrap();
    std::fs::write(dir.path().join("speakdrill-history.jsonl"), history()).unwrap();
    dir
}

#[test]
fn help_output() {
    let dir = TempDir::new().unwrap();
    speakdrill(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Spoken vocabulary practice coach"));
}

#[test]
fn version_output() {
    let dir = TempDir::new().unwrap();
    speakdrill(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("speakdrill"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    speakdrill(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created speakdrill.toml"))
        .stdout(predicate::str::contains("Created questions.json"));

    assert!(dir.path().join("speakdrill.toml").exists());
    assert!(dir.path().join("questions.json").exists());
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    speakdrill(dir.path()).arg("init").assert().success();

    speakdrill(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn init_bank_is_valid() {
    let dir = TempDir::new().unwrap();
    speakdrill(dir.path()).arg("init").assert().success();

    speakdrill(dir.path())
        .args(["validate", "--bank", "questions.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5 questions"))
        .stdout(predicate::str::contains("Question bank valid"));
}

#[test]
fn validate_reports_warnings() {
    let dir = workspace();
    speakdrill(dir.path())
        .args(["validate", "--bank", "questions.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 questions"))
        .stdout(predicate::str::contains("[Atmosphere] WARNING"));
}

#[test]
fn validate_nonexistent_file() {
    let dir = TempDir::new().unwrap();
    speakdrill(dir.path())
        .args(["validate", "--bank", "nonexistent.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn queue_puts_unseen_words_first() {
    let dir = workspace();
    let output = speakdrill(dir.path())
        .args(["queue", "--learner", "Kai", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let queue: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let queue = queue.as_array().unwrap();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0]["question"]["word"], "Atmosphere");
    assert_eq!(queue[0]["tier"], "unseen");
    assert_eq!(queue[1]["tier"], "review");
    assert_eq!(queue[1]["mastery"]["streak"], 1);
}

#[test]
fn queue_recommendation_goes_first() {
    let dir = workspace();
    speakdrill(dir.path())
        .args(["queue", "--learner", "Kai", "--recommend", "schedule"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Queue for Kai (2 questions)"))
        .stdout(predicate::str::contains("recommended"));
}

#[test]
fn queue_without_bank_uses_built_in_questions() {
    let dir = TempDir::new().unwrap();
    speakdrill(dir.path())
        .args(["queue", "--learner", "Guest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Photography"))
        .stdout(predicate::str::contains("Appointment"));
}

#[test]
fn history_summary() {
    let dir = workspace();
    speakdrill(dir.path())
        .args(["history", "--learner", "Kai"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total activities: 1"))
        .stdout(predicate::str::contains("Average pronunciation score: 90.0"))
        .stdout(predicate::str::contains("Schedule"));
}

#[test]
fn history_lists_records_newest_first_and_score_series() {
    let dir = TempDir::new().unwrap();
    let history = concat!(
        r#"{"timestamp":"2024-05-01T09:00:00+00:00","user":"Kai","word":"Schedule","action":"Pronunciation","score":70,"is_correct":false,"detail":"Transcription: my shedule"}"#,
        "\n",
        r#"{"timestamp":"2024-05-03T09:00:00+00:00","user":"Kai","word":"Journey","action":"Japanese Meaning","score":100,"is_correct":true,"detail":"旅"}"#,
        "\n",
    );
    std::fs::write(dir.path().join("speakdrill-history.jsonl"), history).unwrap();

    let output = speakdrill(dir.path())
        .args(["history", "--learner", "Kai"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pronunciation scores:"))
        .stdout(predicate::str::contains("2024-05-01 09:00   70"))
        .stdout(predicate::str::contains("Detailed history (newest first)"))
        .stdout(predicate::str::contains("Japanese Meaning"))
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).unwrap();
    let details = &stdout[stdout.find("Detailed history").unwrap()..];
    let newer = details.find("2024-05-03 09:00:00").unwrap();
    let older = details.find("2024-05-01 09:00:00").unwrap();
    assert!(newer < older);
}

#[test]
fn learners_lists_names() {
    let dir = workspace();
    speakdrill(dir.path())
        .arg("learners")
        .assert()
        .success()
        .stdout(predicate::str::contains("Kai"))
        .stdout(predicate::str::contains("Mio"));
}

#[test]
fn import_tsv_with_header() {
    let dir = TempDir::new().unwrap();
    let tsv = "timestamp\tuser\tword\taction\tscore\tis_correct\tdetail\n\
               2024-05-01 09:00:00\tRen\tJourney\tEnglish Definition\t100\tTRUE\ta long trip\n\
               2024-05-01 09:05:00\t\tJourney\tPronunciation\t80\tTRUE\t\n\
               2024-05-01 09:10:00\tRen\tTrip\tSelfRating\t0\tFALSE\tHard\n";
    std::fs::write(dir.path().join("export.tsv"), tsv).unwrap();

    speakdrill(dir.path())
        .args(["import", "--tsv", "export.tsv", "--history", "imported.jsonl"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 record(s)"));

    speakdrill(dir.path())
        .args(["learners", "--history", "imported.jsonl"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ren"));
}

#[test]
fn practice_with_mock_judge() {
    let dir = workspace();
    std::fs::write(dir.path().join("answer.wav"), b"RIFF....WAVE").unwrap();

    speakdrill(dir.path())
        .args(["practice", "--learner", "Kai", "--judge", "mock"])
        .write_stdin("p answer.wav\nhint\neasy\nskip\nskip\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Score: 100"))
        .stdout(predicate::str::contains("Hint:"))
        .stdout(predicate::str::contains("Rated Easy."))
        .stdout(predicate::str::contains("All questions done"))
        .stdout(predicate::str::contains("Saved 2 of 2 attempt(s)."));

    let history = std::fs::read_to_string(dir.path().join("speakdrill-history.jsonl")).unwrap();
    assert_eq!(history.lines().count(), 4);
}

#[test]
fn practice_answer_reveals_meaning_and_definition() {
    let dir = workspace();
    speakdrill(dir.path())
        .args(["practice", "--learner", "Mio", "--judge", "mock"])
        .write_stdin("answer\nskip\nanswer\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Meaning: 予定"))
        .stdout(predicate::str::contains("Definition: a plan of when things happen"))
        .stdout(predicate::str::contains("No stored answer for Atmosphere."))
        .stdout(predicate::str::contains("Saved 0 of 0 attempt(s)."));
}

#[test]
fn practice_unknown_judge_fails() {
    let dir = workspace();
    speakdrill(dir.path())
        .args(["practice", "--learner", "Kai", "--judge", "nowhere"])
        .write_stdin("quit\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not configured"));
}

#[test]
fn list_models_without_config() {
    let dir = TempDir::new().unwrap();
    speakdrill(dir.path())
        .arg("list-models")
        .assert()
        .success()
        .stdout(predicate::str::contains("No judges configured"));
}
