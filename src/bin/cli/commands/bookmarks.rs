use anyhow::{Context, Result};

use lexidrill::Language;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, remove: Option<u32>, format: &OutputFormat) -> Result<()> {
    let mut trainer = app.trainer(None)?;

    if let Some(vocab_id) = remove {
        let removed = trainer
            .remove_bookmark(vocab_id)
            .context("Failed to remove bookmark")?;
        if !removed {
            println!("Word {} was not bookmarked.", vocab_id);
        }
    }

    let words = trainer.bookmarked_words();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&words)?);
        }
        OutputFormat::Plain => {
            if words.is_empty() {
                println!("No bookmarks.");
            } else {
                for word in &words {
                    let texts: Vec<&str> = Language::ALL
                        .iter()
                        .filter_map(|lang| word.text(*lang))
                        .collect();
                    println!("{:>5}  {}  (level {})", word.id, texts.join(" / "), word.level);
                }
                println!("\n{} bookmarks total", words.len());
            }
        }
    }

    drop(words);
    trainer.close()?;
    Ok(())
}
