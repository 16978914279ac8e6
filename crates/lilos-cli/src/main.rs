use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lilos_core::report::{model::ToolInfo, render};
use lilos_core::{Engine, EngineConfig, EngineError, Report};

mod args;

use args::{Command, OutputFormat};

/// Exit status when the run aborts before a report exists.
const EXIT_ENGINE_ERROR: u8 = 2;

fn main() -> ExitCode {
    let args = args::Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("lilos: {e:#}");
            ExitCode::from(EXIT_ENGINE_ERROR)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("LILOS_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: &args::Args) -> Result<u8> {
    let run_args = args.command.run_args();
    if run_args.no_color {
        colored::control::set_override(false);
    }

    let mut config = EngineConfig::load(&run_args.root, run_args.config.as_deref())?;
    if let Some(ms) = run_args.timeout_ms {
        config.runtime.timeout_ms = Some(ms);
    }
    let engine = Engine::new(config)?;

    let tool = ToolInfo {
        name: lilos_core::TOOL_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: run_args.commit.clone(),
    };
    let today = run_args
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let report: Result<Report, EngineError> = match &args.command {
        Command::Lint(_) => engine.lint(&run_args.root, today, tool),
        Command::Check(_) => engine.check(&run_args.root, today, tool),
    };
    let report = report?;

    let output = match run_args.format {
        OutputFormat::Json => render::render_json(&report).context("serializing report")?,
        OutputFormat::Text => render::render_text(&report),
    };

    match &run_args.out {
        Some(path) => std::fs::write(path, &output)
            .with_context(|| format!("writing report to {}", path.display()))?,
        None => print!("{output}"),
    }

    Ok(u8::try_from(report.exit_code).unwrap_or(EXIT_ENGINE_ERROR))
}
