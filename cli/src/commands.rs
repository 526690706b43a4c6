//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use mesh_domain::{ApprovalStatus, Feedback, Outcome, ReviewDecision, Thumb};
use std::path::PathBuf;

/// Output format for a mesh run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Every trace message, then the run summary
    Full,
    /// Only the final answer and its citations
    Final,
    /// JSON document with trace, validations and the proposed action
    Json,
}

/// CLI arguments for reasoning-mesh
#[derive(Parser, Debug)]
#[command(name = "reasoning-mesh")]
#[command(author, version, about = "Multi-agent reasoning mesh with grounded answers")]
#[command(long_about = r#"
Reasoning Mesh answers a goal with a small team of agents:

1. Planner: splits the goal into subtasks
2. Researcher: retrieves evidence for each subtask
3. Critic: assesses each candidate answer
4. Synthesizer: merges candidates into a FINAL answer

The FINAL answer is validated, and any action it implies passes through the
safety gate, where risky actions wait for human review.

Configuration files are loaded from (in priority order):
1. MESH_* environment variables (MESH_RETRIEVAL__K=8)
2. --config <path>     Explicit config file
3. ./mesh.toml         Project-level config
4. ~/.config/reasoning-mesh/config.toml   Global config

Example:
  reasoning-mesh run --corpus docs.jsonl "summarize document X"
  reasoning-mesh actions list --status pending
  reasoning-mesh actions review <ID> approved --actor alice --execute
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the mesh on a goal
    Run(RunArgs),

    /// Inspect and review pending actions
    #[command(subcommand)]
    Actions(ActionsCommand),

    /// Show configuration sources and the effective configuration
    Config,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// The goal to work on
    pub goal: String,

    /// JSONL corpus to search (overrides [corpus] path)
    #[arg(long, value_name = "PATH")]
    pub corpus: Option<PathBuf>,

    /// User id recorded in telemetry
    #[arg(long, env = "USER", default_value = "cli")]
    pub user: String,

    /// Session id (random if omitted)
    #[arg(long)]
    pub session: Option<String>,

    /// Project whose plan records this run's subtasks
    #[arg(long)]
    pub project: Option<String>,

    /// Extra retrieval terms (repeatable)
    #[arg(long = "hint", value_name = "TERM")]
    pub hints: Vec<String>,

    /// Restrict retrieval to these clusters (repeatable)
    #[arg(long = "cluster", value_name = "ID")]
    pub clusters: Vec<String>,

    /// Token budget (overrides [budget] tokens)
    #[arg(long)]
    pub tokens: Option<u64>,

    /// Latency budget in milliseconds (overrides [budget] latency_ms)
    #[arg(long)]
    pub latency_ms: Option<u64>,

    /// Ranking feedback applied before the run: TARGET=up|down[:success|failure]
    #[arg(long = "feedback", value_name = "FEEDBACK", value_parser = parse_feedback)]
    pub feedback: Vec<Feedback>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "full")]
    pub output: OutputFormat,

    /// Wait for the run to finish instead of printing messages as they arrive
    #[arg(long)]
    pub no_stream: bool,
}

#[derive(Subcommand, Debug)]
pub enum ActionsCommand {
    /// List action records
    List {
        /// Only records in this status
        #[arg(long)]
        status: Option<ApprovalStatus>,
    },

    /// Show one record with its status history
    Show { id: String },

    /// Approve or reject a pending action
    Review {
        id: String,
        /// approved or rejected
        decision: ReviewDecision,
        /// Who is deciding
        #[arg(long, env = "USER")]
        actor: String,
        /// Execute immediately after an approval
        #[arg(long)]
        execute: bool,
    },

    /// Expire pending actions whose review window has passed
    Expire,

    /// Execute an approved action
    Execute { id: String },
}

/// Parse `TARGET=up|down[:success|failure]`.
pub fn parse_feedback(s: &str) -> Result<Feedback, String> {
    let (target, rest) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected TARGET=up|down[:outcome], got '{}'", s))?;
    if target.trim().is_empty() {
        return Err("feedback target cannot be empty".to_string());
    }

    let (thumb, outcome) = match rest.split_once(':') {
        Some((t, o)) => (t, Some(o)),
        None => (rest, None),
    };
    let thumb = match thumb.to_lowercase().as_str() {
        "up" => Thumb::Up,
        "down" => Thumb::Down,
        other => return Err(format!("unknown thumb '{}': use up or down", other)),
    };

    let mut feedback = Feedback::new(target.trim(), thumb);
    if let Some(outcome) = outcome {
        feedback = feedback.with_outcome(match outcome.to_lowercase().as_str() {
            "success" => Outcome::Success,
            "failure" => Outcome::Failure,
            other => return Err(format!("unknown outcome '{}': use success or failure", other)),
        });
    }
    Ok(feedback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "reasoning-mesh",
            "-vv",
            "run",
            "summarize document X",
            "--hint",
            "billing",
            "--feedback",
            "c1=up:success",
            "--tokens",
            "500",
            "-o",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.goal, "summarize document X");
        assert_eq!(args.hints, vec!["billing".to_string()]);
        assert_eq!(args.tokens, Some(500));
        assert_eq!(args.output, OutputFormat::Json);
        assert_eq!(
            args.feedback,
            vec![Feedback::new("c1", Thumb::Up).with_outcome(Outcome::Success)]
        );
    }

    #[test]
    fn test_parse_review() {
        let cli = Cli::try_parse_from([
            "reasoning-mesh",
            "actions",
            "review",
            "a-1",
            "approved",
            "--actor",
            "alice",
            "--execute",
        ])
        .unwrap();

        match cli.command {
            Command::Actions(ActionsCommand::Review {
                id,
                decision,
                actor,
                execute,
            }) => {
                assert_eq!(id, "a-1");
                assert_eq!(decision, ReviewDecision::Approved);
                assert_eq!(actor, "alice");
                assert!(execute);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_list_status_filter() {
        let cli =
            Cli::try_parse_from(["reasoning-mesh", "actions", "list", "--status", "pending"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Actions(ActionsCommand::List {
                status: Some(ApprovalStatus::Pending)
            })
        ));
    }

    #[test]
    fn test_parse_feedback() {
        assert_eq!(
            parse_feedback("doc-1=down").unwrap(),
            Feedback::new("doc-1", Thumb::Down)
        );
        assert_eq!(
            parse_feedback("a=b=up:failure").unwrap(),
            Feedback::new("a=b", Thumb::Up).with_outcome(Outcome::Failure)
        );
        assert!(parse_feedback("doc-1").is_err());
        assert!(parse_feedback("=up").is_err());
        assert!(parse_feedback("doc-1=sideways").is_err());
        assert!(parse_feedback("doc-1=up:maybe").is_err());
    }
}
