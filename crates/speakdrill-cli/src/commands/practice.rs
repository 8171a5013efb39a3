//! The `speakdrill practice` command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use speakdrill_core::model::{Question, SelfRating, Skill};
use speakdrill_core::session::{Session, SessionError, SessionState};
use speakdrill_core::traits::{AudioClip, HistoryStore, Judge, Verdict};
use speakdrill_judges::judge_from_config;

const HELP: &str = "\
Commands:
  p <audio>   read the sentence aloud (pronunciation)
  j <audio>   say the Japanese meaning
  e <audio>   explain the word in English
  easy | hard rate yourself and move on
  skip        next question without recording
  hint        keywords that help explain the word
  answer      show the expected meaning and definition
  restart     shuffle and start over
  learner <n> switch learner
  quit        save and exit";

pub async fn execute(
    learner: String,
    judge_name: Option<String>,
    model: Option<String>,
    bank: Option<PathBuf>,
    history: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(!learner.trim().is_empty(), "learner name must not be empty");

    let config = super::load_config(config_path.as_deref())?;
    let judge: Arc<dyn Judge> = Arc::from(judge_from_config(&config, judge_name.as_deref())?);
    let questions = super::load_bank(&config, bank);
    let store: Arc<dyn HistoryStore> = Arc::new(super::open_store(&config, history));

    let mut session = Session::start(
        learner.trim(),
        questions,
        judge,
        store,
        config.session_config(model.as_deref()),
    )
    .await;

    println!("{HELP}\n");
    present(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };

        let outcome = match command {
            "quit" | "q" | "exit" => break,
            "help" | "?" => {
                println!("{HELP}");
                Ok(())
            }
            "p" => submit(&mut session, Skill::Pronunciation, arg).await,
            "j" => submit(&mut session, Skill::JapaneseMeaning, arg).await,
            "e" => submit(&mut session, Skill::EnglishDefinition, arg).await,
            "easy" | "hard" => {
                let rating = if command == "easy" {
                    SelfRating::Easy
                } else {
                    SelfRating::Hard
                };
                session.rate(rating).await.map(|outcome| {
                    println!("Rated {}.", rating.label());
                    if let Some(word) = outcome.recommended {
                        println!("Up next, a related word: {word}");
                    }
                })
            }
            "skip" => session.skip().map(|_| ()),
            "hint" => session.hint().await.map(|hint| println!("Hint: {hint}")),
            "answer" => session
                .current()
                .map(print_answer)
                .ok_or(SessionError::Completed),
            "restart" => {
                session.restart();
                println!("Shuffled.");
                Ok(())
            }
            "learner" if !arg.is_empty() => {
                session.switch_learner(arg).await;
                println!("Now practising as {arg}.");
                Ok(())
            }
            _ => {
                println!("Unknown command. Type `help` for the list.");
                continue;
            }
        };

        if let Err(e) = outcome {
            println!("{e}");
        }
        present(&session);
    }

    let turns = session.turn();
    let stats = session.finish().await;
    println!(
        "Saved {} of {turns} attempt(s).{}",
        stats.written,
        if stats.failed > 0 {
            format!(" {} could not be saved.", stats.failed)
        } else {
            String::new()
        }
    );
    Ok(())
}

async fn submit(session: &mut Session, skill: Skill, arg: &str) -> Result<(), SessionError> {
    if arg.is_empty() {
        println!("Give the path of a recording, e.g. `p answer.wav`.");
        return Ok(());
    }
    let audio = match AudioClip::from_file(Path::new(arg)).await {
        Ok(audio) => audio,
        Err(e) => {
            println!("{e:#}");
            return Ok(());
        }
    };
    let verdict = session.submit(skill, audio).await?;
    print_verdict(skill, &verdict);
    Ok(())
}

fn print_verdict(skill: Skill, verdict: &Verdict) {
    println!("Heard: {}", verdict.transcript);
    match skill {
        Skill::Pronunciation => println!("Score: {:.0}", verdict.score()),
        Skill::JapaneseMeaning | Skill::EnglishDefinition => {
            println!("{}", if verdict.passed() { "Correct!" } else { "Not quite." })
        }
    }
    if !verdict.feedback.is_empty() {
        println!("Feedback: {}", verdict.feedback);
    }
}

fn print_answer(question: &Question) {
    if question.translation.is_none() && question.definition.is_none() {
        println!("No stored answer for {}.", question.word);
        return;
    }
    if let Some(t) = &question.translation {
        println!("Meaning: {t}");
    }
    if let Some(d) = &question.definition {
        println!("Definition: {d}");
    }
}

fn present(session: &Session) {
    if session.state() == SessionState::Completed {
        println!("\nAll questions done. Type `restart` to go again or `quit`.");
        return;
    }
    let Some(question) = session.current() else {
        return;
    };
    println!(
        "\n[{}/{}] {}  ({})",
        session.position() + 1,
        session.len(),
        question.word,
        session.learner()
    );
    println!("  Say: {}", question.sentence);
    if let Some(t) = &question.sentence_translation {
        println!("       {t}");
    }
    let skills: Vec<String> = question.skills().iter().map(|s| s.to_string()).collect();
    println!("  Exercises: {}", skills.join(", "));
}
