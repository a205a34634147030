mod commands;
mod config;
mod diagnostics;
mod engine;
mod error;
mod grammar;
mod oracle;
mod planner;
mod prompts;
mod rewriter;
mod selector;
mod types;
mod units;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;

use crate::commands::RunSettings;
use crate::config::Config;
use crate::error::Error;
use crate::oracle::OllamaOracle;
use crate::types::Modes;

/// Command-line interface for docsmith.
#[allow(
    clippy::struct_excessive_bools,
    reason = "each flag is an independent toggle"
)]
#[derive(Parser)]
#[command(
    name = "docsmith",
    about = "Create, update, validate, and strip docstrings with a local LLM"
)]
struct Cli {
    /// Retry budget for each oracle call, 1-100 [default: 5]
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=100))]
    attempts: Option<u32>,

    /// Create docstrings for units that lack one
    #[arg(short, long)]
    create: bool,

    /// Maximum unit depth when walking a whole file, 1-100
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=100))]
    depth: u32,

    /// Files to process, each optionally decorated with colon-separated
    /// filters, as in `sample.py:foo:Config.validate`
    files: Vec<String>,

    /// Ollama server hostname [default: localhost]
    #[arg(long)]
    host: Option<String>,

    /// Pull a model onto the Ollama server, then exit
    #[arg(long, value_name = "MODEL")]
    install_model: Option<String>,

    /// List the models installed on the Ollama server, then exit
    #[arg(long)]
    list: bool,

    /// Logging verbosity: 0 errors only, 1 progress, 2 debug
    #[arg(short = 'l', long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=2))]
    log_level: u8,

    /// Model used for generation and validation [default: llama3]
    #[arg(long)]
    model: Option<String>,

    /// Write accepted modifications back to disk
    #[arg(short, long)]
    modify: bool,

    /// Ollama server port [default: 11434]
    #[arg(long)]
    port: Option<u16>,

    /// Print the modified source text
    #[arg(short, long)]
    preview: bool,

    /// Print a per-unit report and a diff of the planned edits
    #[arg(short, long)]
    report: bool,

    /// Remove existing docstrings
    #[arg(short, long, conflicts_with_all = ["create", "update"])]
    strip: bool,

    /// Replace existing docstrings that fail validation
    #[arg(short, long)]
    update: bool,

    /// Validate existing docstrings against their code
    #[arg(short = 'v', long)]
    validate: bool,
}

/// Render a management command's result as a process exit code.
fn finish(result: Result<(), Error>) -> ExitCode {
    if let Err(err) = result {
        diagnostics::print_error(&err);
        return ExitCode::from(2);
    }
    return ExitCode::SUCCESS;
}

/// Route tracing output to stderr at the requested verbosity.
fn init_logging(log_level: u8) {
    let level = match log_level {
        0 => LevelFilter::ERROR,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
    return;
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let config = match Config::load(Path::new(".")) {
        Ok(config) => config,
        Err(err) => {
            diagnostics::print_error(&err);
            return ExitCode::from(2);
        }
    };

    // Resolution order: flag > .docsmith.toml > built-in default.
    let attempts = cli.attempts.or(config.attempts).unwrap_or(5).clamp(1, 100);
    let host = cli
        .host
        .or(config.host)
        .unwrap_or_else(|| String::from("localhost"));
    let model = cli
        .model
        .or(config.model)
        .unwrap_or_else(|| String::from("llama3"));
    let port = cli.port.or(config.port).unwrap_or(11434);

    let oracle = match OllamaOracle::new(&host, port, &model) {
        Ok(oracle) => oracle,
        Err(err) => {
            diagnostics::print_error(&Error::Oracle(err));
            return ExitCode::from(2);
        }
    };

    if cli.list {
        return finish(commands::list_models(&oracle));
    }
    if let Some(name) = cli.install_model.as_deref() {
        return finish(commands::install_model(&oracle, name));
    }

    let settings = RunSettings {
        attempts,
        depth: cli.depth,
        files: cli.files,
        modes: Modes {
            create: cli.create,
            strip: cli.strip,
            update: cli.update,
            validate: cli.validate,
        },
        modify: cli.modify,
        preview: cli.preview,
        report: cli.report,
    };
    return commands::run(&settings, &oracle);
}
