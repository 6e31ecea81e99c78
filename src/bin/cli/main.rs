mod app;
mod commands;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use lexidrill::QuestionMode;

#[derive(Parser)]
#[command(name = "lexidrill", about = "Adaptive vocabulary drills", version)]
struct Cli {
    /// Config file (default: platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Study as this user instead of the configured one
    #[arg(long, global = true)]
    user: Option<String>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum BackendKind {
    FlatFile,
    Relational,
}

#[derive(Subcommand)]
enum Command {
    /// Add vocabulary from a CSV file (columns: id, level, chinese, english, japanese)
    Import {
        /// CSV file to read
        csv: PathBuf,
    },

    /// Drill words, favouring ones you know least
    Drill {
        /// Difficulty level 1-3 (default: configured level)
        #[arg(long)]
        level: Option<u8>,
        /// Number of questions (default: configured session length)
        #[arg(long)]
        count: Option<usize>,
    },

    /// Review previously missed words
    Review {
        /// Number of questions (default: configured session length)
        #[arg(long)]
        count: Option<usize>,
    },

    /// List bookmarked words
    Bookmarks {
        /// Remove the bookmark on this vocabulary id
        #[arg(long)]
        remove: Option<u32>,
    },

    /// Show learning statistics
    Stats {
        /// Show only this day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Write all of the user's data to a JSON file
    Export {
        /// Output file
        output: PathBuf,
    },

    /// Copy all data into another backend
    Migrate {
        /// Kind of backend to copy into
        #[arg(long, value_enum)]
        to_type: BackendKind,
        /// Data directory or database file of the target
        #[arg(long)]
        to_path: PathBuf,
    },

    /// Write a config file with default settings
    InitConfig {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    if let Command::InitConfig { force } = cli.command {
        return commands::init_config::run(cli.config.as_deref(), cli.user.as_deref(), force);
    }

    let app = app::App::new(cli.config.as_deref(), cli.user.as_deref())?;

    let result = match cli.command {
        Command::Import { csv } => commands::import::run(&app, &csv, &cli.format),
        Command::Drill { level, count } => {
            commands::drill::run(&app, QuestionMode::Drill, level, count)
        }
        Command::Review { count } => commands::drill::run(&app, QuestionMode::Review, None, count),
        Command::Bookmarks { remove } => commands::bookmarks::run(&app, remove, &cli.format),
        Command::Stats { date } => commands::stats::run(&app, date, &cli.format),
        Command::Export { output } => commands::export::run(&app, &output),
        Command::Migrate { to_type, to_path } => {
            commands::migrate::run(&app, to_type, to_path, &cli.format)
        }
        Command::InitConfig { .. } => Ok(()),
    };

    app.close()?;
    result
}
