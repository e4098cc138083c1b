mod actions;
mod engine;
mod env;
mod progress;
mod seed;

use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::actions::Handlers;
use crate::engine::{Engine, RunOutcome};
use crate::env::ProcessEnv;
use crate::progress::PrettyProgressLayer;
use crate::seed::SeedOptions;
use slop_ast::{Action, Program, parse_source};

/// JSON output for `--list --format json`
#[derive(Serialize)]
struct ListOutput<'a> {
    tasks: Vec<TaskInfo<'a>>,
    default: &'a [Action],
}

#[derive(Serialize)]
struct TaskInfo<'a> {
    name: &'a str,
    actions: &'a [Action],
}

impl<'a> ListOutput<'a> {
    fn from_program(program: &'a Program) -> Self {
        let tasks = program
            .tasks
            .iter()
            .map(|(name, actions)| TaskInfo {
                name,
                actions: actions.as_slice(),
            })
            .collect();
        ListOutput {
            tasks,
            default: &program.default_queue,
        }
    }
}

#[derive(Parser)]
#[command(name = "slop")]
#[command(about = "Run database seeding tasks declared in a Slopfile", long_about = None)]
struct Cli {
    /// Task to run; without one the top-level actions run
    tasks: Vec<String>,

    /// Path to the Slopfile
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// List declared tasks instead of running
    #[arg(long)]
    list: bool,

    /// Output format for --list: text or json
    #[arg(long, default_value = "text")]
    format: String,

    /// Parse and validate the Slopfile without running anything
    #[arg(long)]
    check: bool,

    /// Timeout for each database client invocation
    #[arg(long, default_value = "5m", value_parser = humantime::parse_duration)]
    timeout: Duration,

    /// Database client binary used by seed actions
    #[arg(long, default_value = seed::DEFAULT_CLIENT)]
    db_client: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "✗".red(), e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // progress events are rendered by their own layer
    let log_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter)
        .with_filter(filter_fn(|meta| meta.fields().field("progress").is_none()));

    tracing_subscriber::registry()
        .with(log_layer)
        .with(PrettyProgressLayer::new())
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let path = cli.file.unwrap_or_else(find_slopfile);
    let source = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;

    let mut env = ProcessEnv;
    let parsed = parse_source(&source, &mut env)?;
    for diagnostic in &parsed.diagnostics {
        warn!(
            line = diagnostic.line,
            character = %diagnostic.character,
            "unexpected character"
        );
    }
    let program = parsed.program;

    if cli.list {
        return list(&program, &cli.format);
    }

    if cli.check {
        println!("{} Slopfile is valid!", "✓".green());
        println!("  {} tasks defined", program.tasks.len());
        println!("  {} top-level actions", program.default_queue.len());
        println!("  {} config values", program.config.len());
        if !program.sourced.is_empty() {
            println!("  env files: {}", program.sourced.join(", "));
        }
        return Ok(());
    }

    let handlers = Handlers::standard(SeedOptions {
        client: cli.db_client,
        timeout: cli.timeout,
    });
    let mut engine = Engine::new(program, handlers);

    match engine.run(&cli.tasks, &env).await? {
        RunOutcome::NothingToRun => {
            println!(
                "{} nothing to run: add run:: actions at the top level or pass a task name",
                "○".yellow()
            );
        }
        RunOutcome::Completed { actions } => {
            println!("{} {} actions completed", "✓".green(), actions);
        }
    }

    Ok(())
}

fn list(program: &Program, format: &str) -> anyhow::Result<()> {
    match format {
        "json" => {
            let output = ListOutput::from_program(program);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        "text" => {
            println!("{}", "Tasks:".bold());
            for (name, actions) in &program.tasks {
                println!(
                    "  {} {}{}",
                    "•".cyan(),
                    name,
                    format!(" ({} actions)", actions.len()).dimmed()
                );
                for action in actions {
                    println!("      {}", action);
                }
            }
            if !program.default_queue.is_empty() {
                println!("{}", "Top-level:".bold());
                for action in &program.default_queue {
                    println!("  {} {}", "·".dimmed(), action);
                }
            }
        }
        _ => anyhow::bail!("Unknown format: {}. Use text or json", format),
    }
    Ok(())
}

fn find_slopfile() -> PathBuf {
    for name in ["Slopfile", "slopfile", ".slopfile"] {
        let path = PathBuf::from(name);
        if path.exists() {
            return path;
        }
    }
    PathBuf::from("Slopfile")
}
