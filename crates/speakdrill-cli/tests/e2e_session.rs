//! End-to-end session tests across the judge, store and scheduler.
//!
//! A mock judge grades answers and a JSON-lines file keeps the history, so
//! these runs exercise the same path as `speakdrill practice`.

use std::sync::Arc;

use speakdrill_core::model::{ActionKind, Question, SelfRating, Skill};
use speakdrill_core::parser::default_bank;
use speakdrill_core::scheduler::PriorityTier;
use speakdrill_core::session::{Session, SessionConfig, SessionState};
use speakdrill_core::traits::{AudioClip, HistoryStore};
use speakdrill_judges::mock::MockJudge;
use speakdrill_store::JsonlHistoryStore;

fn question(word: &str, translation: &str) -> Question {
    Question {
        word: word.into(),
        translation: Some(translation.into()),
        definition: Some(format!("the meaning of {word}")),
        sentence: format!("I said {word}."),
        sentence_translation: None,
    }
}

fn bank() -> Vec<Question> {
    vec![
        question("Schedule", "予定"),
        question("Atmosphere", "雰囲気"),
        question("Journey", "旅"),
        question("Trip", "旅行"),
    ]
}

fn config() -> SessionConfig {
    SessionConfig {
        model: "mock-model".into(),
        retry_delay: std::time::Duration::from_millis(1),
        ..Default::default()
    }
}

#[tokio::test]
async fn e2e_answers_persist_and_reorder() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.jsonl");
    let store = Arc::new(JsonlHistoryStore::new(&path));

    let judge = Arc::new(MockJudge::scripted([
        r#"{"transcription": "I said it", "score": 91, "advice": "Great"}"#,
        r#"{"transcription": "旅", "is_correct": false, "comment": "惜しい"}"#,
    ]));

    let mut session = Session::start("Kai", bank(), judge.clone(), store.clone(), config()).await;
    assert!(session.queue().iter().all(|s| s.tier == PriorityTier::Unseen));

    let first = session.current().unwrap().word.clone();
    let verdict = session
        .submit(Skill::Pronunciation, AudioClip::wav(vec![1, 2, 3]))
        .await
        .unwrap();
    assert!(verdict.passed());
    // A pass pushes the word behind every unseen word.
    assert_eq!(session.queue().last().unwrap().question.word, first);

    let second = session.current().unwrap().word.clone();
    let verdict = session
        .submit(Skill::JapaneseMeaning, AudioClip::wav(vec![]))
        .await
        .unwrap();
    assert!(!verdict.passed());
    assert_eq!(judge.call_count(), 2);

    // Failed just now: due immediately, lateness ~0, still behind unseen words.
    let tiers: Vec<PriorityTier> = session.queue().iter().map(|s| s.tier).collect();
    assert_eq!(
        tiers,
        vec![
            PriorityTier::Unseen,
            PriorityTier::Unseen,
            PriorityTier::Review,
            PriorityTier::Review
        ]
    );
    assert_eq!(session.queue()[2].question.word, second);

    let stats = session.finish().await;
    assert_eq!(stats.written, 2);

    let stored = store.query("Kai").await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].action, ActionKind::Pronunciation);
    assert_eq!(stored[0].detail, "Transcription: I said it");
    assert_eq!(stored[1].action, ActionKind::JapaneseMeaning);
    assert!(!stored[1].passed);
}

#[tokio::test]
async fn e2e_history_survives_restart_of_the_program() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.jsonl");

    {
        let store = Arc::new(JsonlHistoryStore::new(&path));
        let mut session = Session::start(
            "Kai",
            bank(),
            Arc::new(MockJudge::with_fixed_response("{}")),
            store,
            config(),
        )
        .await;
        for _ in 0..4 {
            session.rate(SelfRating::Easy).await.unwrap();
        }
        session.finish().await;
    }

    let store = Arc::new(JsonlHistoryStore::new(&path));
    let session = Session::start(
        "Kai",
        bank(),
        Arc::new(MockJudge::with_fixed_response("{}")),
        store,
        config(),
    )
    .await;
    assert_eq!(session.history().len(), 4);
    // Every word was rated Easy once, so nothing is unseen any more.
    assert!(session.queue().iter().all(|s| s.tier == PriorityTier::Review));
    assert!(session.queue().iter().all(|s| s.mastery.streak == 1));
}

#[tokio::test]
async fn e2e_chained_recommendation() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonlHistoryStore::new(dir.path().join("h.jsonl")));
    let judge = Arc::new(MockJudge::with_fixed_response("{}").with_related_words(&["voyage", "trip"]));
    let config = SessionConfig {
        chain_related_words: true,
        ..config()
    };

    let mut session = Session::start("Kai", bank(), judge, store, config).await;
    while session.current().unwrap().word == "Trip" {
        session.restart();
    }
    let outcome = session.rate(SelfRating::Easy).await.unwrap();
    assert_eq!(outcome.recommended.as_deref(), Some("Trip"));
    assert_eq!(session.queue()[0].tier, PriorityTier::Recommended);

    // The recommendation lasts for one re-sort only.
    session.rate(SelfRating::Hard).await.unwrap();
    assert!(session
        .queue()
        .iter()
        .all(|s| s.tier != PriorityTier::Recommended));
}

#[tokio::test]
async fn e2e_empty_bank_walks_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonlHistoryStore::new(dir.path().join("h.jsonl")));
    let mut session = Session::start(
        "Guest",
        vec![],
        Arc::new(MockJudge::with_fixed_response("{}")),
        store,
        config(),
    )
    .await;

    assert_eq!(session.len(), default_bank().len());
    for _ in 0..session.len() {
        session.skip().unwrap();
    }
    assert_eq!(session.state(), SessionState::Completed);
    assert!(session.current().is_none());
    assert_eq!(session.finish().await.written, 0);
}
