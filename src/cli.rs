use crate::config::DEFAULT_INSTRUMENTS_DIR;
use crate::progress::DEFAULT_STORE_DIR;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "psyscore",
    version,
    about = "Score Likert-scale personality and interest inventories"
)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Directory searched when an instrument is given by id
    #[arg(long, global = true, default_value = DEFAULT_INSTRUMENTS_DIR)]
    pub instruments_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score an answer sheet and print the report
    Score(ScoreCommand),
    /// Load and validate an instrument definition
    Validate(ValidateCommand),
    /// List instrument definitions
    List(ListCommand),
    /// Record one answer into the saved progress
    Answer(AnswerCommand),
    /// Show saved progress for an instrument
    Progress(ProgressCommand),
    /// Discard saved progress for an instrument
    Reset(ResetCommand),
}

#[derive(Args)]
pub struct ScoreCommand {
    /// Instrument id or path to its definition file
    #[arg(short, long)]
    pub instrument: String,
    /// JSON answers file; saved progress is scored when omitted
    #[arg(short, long)]
    pub answers: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: ReportFormat,
    #[arg(long)]
    pub norm_set: Option<String>,
    /// Score even when some questions are unanswered
    #[arg(long)]
    pub allow_incomplete: bool,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Fixed completion timestamp (RFC 3339), for reproducible output
    #[arg(long)]
    pub completed_at: Option<DateTime<Utc>>,
    #[arg(long, default_value = DEFAULT_STORE_DIR)]
    pub store: PathBuf,
}

#[derive(Args)]
pub struct ValidateCommand {
    pub instrument: String,
}

#[derive(Args)]
pub struct ListCommand {
    /// Directory to search instead of --instruments-dir
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct AnswerCommand {
    #[arg(short, long)]
    pub instrument: String,
    pub question: u32,
    pub score: u8,
    #[arg(long, default_value = DEFAULT_STORE_DIR)]
    pub store: PathBuf,
}

#[derive(Args)]
pub struct ProgressCommand {
    #[arg(short, long)]
    pub instrument: String,
    #[arg(long, default_value = DEFAULT_STORE_DIR)]
    pub store: PathBuf,
}

#[derive(Args)]
pub struct ResetCommand {
    #[arg(short, long)]
    pub instrument: String,
    #[arg(long, default_value = DEFAULT_STORE_DIR)]
    pub store: PathBuf,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ReportFormat {
    Json,
    Csv,
    Text,
    Md,
}
