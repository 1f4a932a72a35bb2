mod cli;
mod config;
mod engine;
mod error;
mod progress;
mod report;
mod telemetry;
mod types;

use crate::error::ScoreError;
use crate::progress::{FileProgressStore, ProgressStore};
use crate::types::answer::{parse_answers, Answer, AnswerSheet};
use crate::types::instrument::Instrument;
use clap::Parser;
use std::path::Path;
use tracing::info;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const INCOMPLETE: i32 = 1;
    pub const RUNTIME_FAILURE: i32 = 3;
}

fn load(reference: &str, instruments_dir: &Path) -> Result<Instrument, ScoreError> {
    let path = config::resolve_instrument_path(reference, instruments_dir)?;
    config::load_instrument(&path)
}

fn run() -> Result<i32, ScoreError> {
    let cli = cli::Cli::parse();
    telemetry::init(cli.verbose, cli.quiet);

    match cli.command {
        cli::Commands::Score(cmd) => {
            let instrument = load(&cmd.instrument, &cli.instruments_dir)?;
            let id = instrument.instrument.id.clone();
            let store = FileProgressStore::new(&cmd.store);

            let (answers, from_store) = match &cmd.answers {
                Some(path) => (parse_answers(&std::fs::read_to_string(path)?)?, false),
                None => {
                    let saved = store.load(&id)?.map(|progress| progress.answers);
                    (saved.unwrap_or_default(), true)
                }
            };

            let options = engine::ScoreOptions {
                missing: if cmd.allow_incomplete {
                    engine::MissingAnswers::Partial
                } else {
                    engine::MissingAnswers::Reject
                },
                norm_set: cmd.norm_set.clone(),
                completed_at: cmd.completed_at,
            };
            let sheet = AnswerSheet::from(answers.as_slice());
            if sheet.is_empty() {
                eprintln!("warning: no answers to score for {id}");
            }
            let result = engine::calculate_scores(&sheet, &instrument, &options)?;

            let output_format = match cmd.format {
                cli::ReportFormat::Json => report::OutputFormat::Json,
                cli::ReportFormat::Csv => report::OutputFormat::Csv,
                cli::ReportFormat::Text => report::OutputFormat::Text,
                cli::ReportFormat::Md => report::OutputFormat::Md,
            };
            let rendered = report::render(&result, output_format)?;
            match &cmd.output {
                Some(path) => {
                    std::fs::write(path, &rendered)?;
                    info!(path = %path.display(), "wrote report");
                }
                None => println!("{}", rendered.trim_end()),
            }

            if !result.complete {
                eprintln!(
                    "warning: {} of {} questions answered; unanswered items scored as 0",
                    sheet.len(),
                    instrument.question_count()
                );
                return Ok(exit_code::INCOMPLETE);
            }
            if from_store {
                store.clear(&id)?;
            }
            Ok(exit_code::SUCCESS)
        }
        cli::Commands::Validate(cmd) => {
            let instrument = load(&cmd.instrument, &cli.instruments_dir)?;
            println!(
                "ok: {} ({}) {} groups, {} questions, sha256 {}",
                instrument.instrument.id,
                instrument.instrument.name,
                instrument.groups.len(),
                instrument.question_count(),
                instrument.source_sha256
            );
            Ok(exit_code::SUCCESS)
        }
        cli::Commands::List(cmd) => {
            let dir = cmd.dir.unwrap_or(cli.instruments_dir);
            let paths = config::discover(&dir);
            if paths.is_empty() {
                println!("no instruments found in {}", dir.display());
                return Ok(exit_code::SUCCESS);
            }
            for path in paths {
                match config::load_instrument(&path) {
                    Ok(instrument) => println!(
                        "{}\t{}\t{} questions\t{}",
                        instrument.instrument.id,
                        instrument.instrument.name,
                        instrument.question_count(),
                        path.display()
                    ),
                    Err(e) => eprintln!("warning: skipping {}: {e}", path.display()),
                }
            }
            Ok(exit_code::SUCCESS)
        }
        cli::Commands::Answer(cmd) => {
            let instrument = load(&cmd.instrument, &cli.instruments_dir)?;
            let id = &instrument.instrument.id;
            let answer = Answer::new(cmd.question, cmd.score);
            engine::aggregate::check_answers(
                &AnswerSheet::from([answer].as_slice()),
                &instrument,
            )?;

            let store = FileProgressStore::new(&cmd.store);
            let mut progress = store.load(id)?.unwrap_or_default();
            progress.record(answer, &instrument);
            store.save(id, &progress)?;

            println!(
                "recorded question {} = {} ({}/{} answered)",
                cmd.question,
                cmd.score,
                progress.answers.len(),
                instrument.question_count()
            );
            match instrument.question_bank().get(progress.current_index) {
                Some(next) => match &next.text {
                    Some(text) => println!("next question: {} {text}", next.number),
                    None => println!("next question: {}", next.number),
                },
                None => println!("all questions answered; run `psyscore score -i {id}`"),
            }
            Ok(exit_code::SUCCESS)
        }
        cli::Commands::Progress(cmd) => {
            let instrument = load(&cmd.instrument, &cli.instruments_dir)?;
            let id = &instrument.instrument.id;
            let store = FileProgressStore::new(&cmd.store);
            match store.load(id)? {
                None => println!("no saved progress for {id}"),
                Some(progress) => {
                    let next = instrument
                        .question_bank()
                        .get(progress.current_index)
                        .map(|question| question.number.to_string())
                        .unwrap_or_else(|| "none".to_string());
                    println!(
                        "{id}: {}/{} answered, next question {next}, saved {}",
                        progress.answers.len(),
                        instrument.question_count(),
                        progress.saved_at.to_rfc3339()
                    );
                }
            }
            Ok(exit_code::SUCCESS)
        }
        cli::Commands::Reset(cmd) => {
            let instrument = load(&cmd.instrument, &cli.instruments_dir)?;
            let id = &instrument.instrument.id;
            FileProgressStore::new(&cmd.store).clear(id)?;
            println!("cleared saved progress for {id}");
            Ok(exit_code::SUCCESS)
        }
    }
}

fn main() {
    match run() {
        Ok(code) => {
            if code != 0 {
                std::process::exit(code);
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(exit_code::RUNTIME_FAILURE);
        }
    }
}
