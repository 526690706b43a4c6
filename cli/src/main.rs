//! CLI entrypoint for Reasoning Mesh
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod commands;
mod output;
mod wiring;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use commands::{ActionsCommand, Cli, Command, OutputFormat, RunArgs};
use futures::StreamExt;
use mesh_application::{Mesh, ReviewActionInput, RunMeshInput};
use mesh_domain::{ActionId, AgentMessage, ContextHandle, ContextLimits};
use mesh_infrastructure::{ConfigLoader, FileConfig, FileLogConfig};
use output::ConsoleFormatter;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use wiring::{CorpusSource, build_mesh};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).context("loading configuration")?
    };

    // Keep the guard alive so the file writer flushes on exit
    let _log_guard = init_logging(cli.verbose, &config.log);

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{} {}", "config error:".red().bold(), e);
        }
        bail!("invalid configuration ({} problem(s))", errors.len());
    }

    info!("Starting Reasoning Mesh");

    match cli.command {
        Command::Run(args) => {
            let mesh = build_mesh(&config, CorpusSource::Configured(args.corpus.as_deref()))?;
            run(&mesh, &config, args).await
        }
        Command::Actions(cmd) => {
            let mesh = build_mesh(&config, CorpusSource::Skip)?;
            actions(&mesh, cmd).await
        }
        Command::Config => {
            show_config(&cli, &config);
            Ok(())
        }
    }
}

/// Initialize logging based on verbosity level, plus an optional
/// daily-rotated file log.
fn init_logging(verbose: u8, log: &FileLogConfig) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };

    let stderr = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match log.resolved_dir() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &log.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(level))
        .with(stderr)
        .with(file_layer)
        .init();

    guard
}

async fn run(mesh: &Mesh, config: &FileConfig, args: RunArgs) -> Result<()> {
    for feedback in &args.feedback {
        let weight = mesh.retrieval.ingest_feedback(feedback);
        info!("Feedback on {}: weight now {:.2}", feedback.target, weight);
    }

    let limits = ContextLimits::new(
        args.tokens.unwrap_or(config.budget.tokens),
        args.latency_ms.unwrap_or(config.budget.latency_ms),
    );
    let session = args
        .session
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let mut ctx = ContextHandle::new(&args.user, session, &args.goal, limits)
        .with_hints(args.hints.clone())
        .with_cluster_ids(args.clusters.clone());
    if let Some(project) = &args.project {
        ctx = ctx.with_project(project);
    }

    let input = RunMeshInput::new(ctx.clone()).with_initial(AgentMessage::task(&args.goal));
    let use_case = mesh.run_mesh();
    let streaming = !args.no_stream && args.output == OutputFormat::Full;

    let result = if streaming {
        let mut stream = use_case.start_streaming(&input);
        let token = stream.cancellation_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });

        let mut hop = 0;
        {
            let mut messages = stream.messages();
            while let Some(msg) = messages.next().await {
                hop += 1;
                print!("{}", ConsoleFormatter::message(hop, &msg));
            }
        }
        let run = stream.finish().await?;
        use_case.settle(run, &ctx).await
    } else {
        use_case.execute(input).await
    };

    match args.output {
        OutputFormat::Full => {
            if !streaming {
                for (i, entry) in result.run.trace.entries().iter().enumerate() {
                    print!("{}", ConsoleFormatter::message(i + 1, &entry.message));
                }
            }
            println!("{}", ConsoleFormatter::summary(&result));
        }
        OutputFormat::Final => println!("{}", ConsoleFormatter::final_answer(&result)),
        OutputFormat::Json => println!("{}", ConsoleFormatter::format_json(&result)),
    }

    Ok(())
}

async fn actions(mesh: &Mesh, cmd: ActionsCommand) -> Result<()> {
    let use_case = mesh.review_action();

    match cmd {
        ActionsCommand::List { status } => {
            let records = use_case.list(status).await?;
            if records.is_empty() {
                println!("{}", "No actions.".dimmed());
            }
            for record in &records {
                println!("{}", ConsoleFormatter::action_row(record));
            }
        }
        ActionsCommand::Show { id } => {
            let record = use_case.get(&ActionId::new(id)).await?;
            print!("{}", ConsoleFormatter::action_detail(&record));
        }
        ActionsCommand::Review {
            id,
            decision,
            actor,
            execute,
        } => {
            let mut input = ReviewActionInput::new(ActionId::new(id), decision, actor);
            if execute {
                input = input.and_execute();
            }
            match use_case.execute(input).await {
                Ok(record) => print!("{}", ConsoleFormatter::action_detail(&record)),
                Err(e) if e.is_invalid_transition() => {
                    bail!("review rejected: {}", e)
                }
                Err(e) => return Err(e.into()),
            }
        }
        ActionsCommand::Expire => {
            let expired = use_case.expire_stale(Utc::now()).await?;
            println!("Expired {} action(s)", expired.len());
            for id in expired {
                println!("  {}", id);
            }
        }
        ActionsCommand::Execute { id } => {
            let record = use_case
                .execute_action(&ActionId::new(id), Utc::now())
                .await?;
            print!("{}", ConsoleFormatter::action_detail(&record));
        }
    }

    Ok(())
}

fn show_config(cli: &Cli, config: &FileConfig) {
    println!("Configuration sources (in priority order):");
    println!("  [ENV  ] {}*", mesh_infrastructure::config::ENV_PREFIX);
    for source in ConfigLoader::sources(cli.config.as_deref()) {
        let mark = if source.found { "FOUND" } else { "     " };
        println!("  [{}] {:<9}{}", mark, format!("{}:", source.label), source.path.display());
    }
    println!("  [     ] Default: built-in defaults");
    if cli.no_config {
        println!("  (--no-config: files and environment ignored)");
    }

    println!();
    match toml::to_string_pretty(config) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("could not render configuration: {}", e),
    }
}
