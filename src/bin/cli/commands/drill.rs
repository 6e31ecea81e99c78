use std::io::{self, BufRead, Write};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Local;

use lexidrill::{PersistenceBackend, Question, QuestionMode, SchedulerError, Trainer, TrainerError};

use crate::app::App;

enum Reply {
    Answer(char),
    Bookmark,
    Quit,
}

pub fn run(app: &App, mode: QuestionMode, level: Option<u8>, count: Option<usize>) -> Result<()> {
    let mut trainer = app.trainer(level)?;
    let count = count.unwrap_or(app.config.questions_per_session);

    println!("Answer with the option letter, '*' to bookmark the word, 'q' to stop.");

    // Answers given before an error are still saved
    let asked = ask_questions(&mut trainer, mode, count);
    let session = trainer
        .finish_session(Local::now().date_naive())
        .context("Failed to save session statistics");
    let closed = trainer.close().context("Failed to close backend");
    asked?;
    let session = session?;
    closed?;

    if session.total() > 0 {
        println!();
        println!("Correct: {}", session.correct_count());
        println!("Wrong:   {}", session.wrong_count());
        println!("Accuracy: {:.0}%", session.accuracy());
        println!("Total time: {:.2}s", session.total_time().as_secs_f64());
        println!("Average time: {:.2}s", session.average_time().as_secs_f64());
    }

    Ok(())
}

fn ask_questions<B: PersistenceBackend>(
    trainer: &mut Trainer<B>,
    mode: QuestionMode,
    count: usize,
) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    for number in 1..=count {
        let question = match trainer.next_question(mode) {
            Ok(question) => question,
            Err(TrainerError::Scheduler(SchedulerError::EmptyCollection(what))) => {
                println!("Nothing to {}: the {} is empty.", mode, what);
                break;
            }
            Err(e) => return Err(anyhow::Error::new(e).context("Failed to prepare a question")),
        };

        print_question(number, count, &question);
        let started = Instant::now();

        let key = loop {
            print!("> ");
            io::stdout().flush()?;
            let Some(line) = lines.next() else {
                break None;
            };
            match parse_reply(&line?) {
                Some(Reply::Quit) => break None,
                Some(Reply::Bookmark) => {
                    if trainer.bookmark(&question.word)? {
                        println!("Bookmarked.");
                    } else {
                        println!("Already bookmarked.");
                    }
                }
                Some(Reply::Answer(key)) if question.has_option(key) => break Some(key),
                _ => println!(
                    "Choose one of {}.",
                    question.options.keys().map(char::to_string).collect::<Vec<_>>().join(", ")
                ),
            }
        };

        let Some(key) = key else {
            break;
        };

        let correct = question.is_correct(key);
        trainer
            .record_answer(&question, correct, started.elapsed())
            .context("Failed to record answer")?;

        if correct {
            println!("Correct!");
        } else {
            println!(
                "Wrong, the answer is {}. {}",
                question.correct_key,
                question.correct_text()
            );
        }
    }

    Ok(())
}

fn print_question(number: usize, count: usize, question: &Question) {
    println!();
    println!("[{}/{}] {}", number, count, question.prompt);
    for (key, text) in &question.options {
        println!("  {}. {}", key, text);
    }
}

fn parse_reply(line: &str) -> Option<Reply> {
    let line = line.trim();
    if line.eq_ignore_ascii_case("q") {
        return Some(Reply::Quit);
    }
    if line == "*" {
        return Some(Reply::Bookmark);
    }
    let mut chars = line.chars();
    match (chars.next(), chars.next()) {
        (Some(key), None) => Some(Reply::Answer(key.to_ascii_uppercase())),
        _ => None,
    }
}
