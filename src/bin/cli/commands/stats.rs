use anyhow::Result;
use chrono::{Local, NaiveDate};

use lexidrill::{PersistenceBackend, StatsSummary};

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, date: Option<NaiveDate>, format: &OutputFormat) -> Result<()> {
    let backend = app.backend()?;
    let today = Local::now().date_naive();

    if let Some(date) = date {
        let day = StatsSummary::stats_for(&backend.get_daily_stats(app.user()), date);
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&day)?),
            OutputFormat::Plain => match day {
                Some(day) => println!(
                    "{}: {} answered, {} correct, {} wrong",
                    day.date, day.total, day.correct, day.wrong
                ),
                None => println!("No answers recorded on {}.", date),
            },
        }
        return Ok(());
    }

    let summary = StatsSummary::for_user(&backend, app.user(), today);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Plain => {
            println!("Statistics for {}", app.user());
            println!("  Days practiced:  {}", summary.total_days);
            println!("  Answered:        {}", summary.total_answered);
            println!("  Correct:         {}", summary.total_correct);
            println!("  Wrong:           {}", summary.total_wrong);
            println!("  Accuracy:        {:.1}%", summary.accuracy);
            println!("  Current streak:  {} days", summary.current_streak);
            println!("  Longest streak:  {} days", summary.longest_streak);
            println!("  Mastered words:  {}", summary.mastered_count);
            println!("  In review:       {}", summary.review_count);
            println!("  Bookmarked:      {}", summary.bookmark_count);
        }
    }

    Ok(())
}
