//! Console output for mesh runs and action records

use colored::Colorize;
use mesh_application::RunMeshOutput;
use mesh_domain::{AgentMessage, ApprovalStatus, Citation, MessageType, PendingAction, RiskLevel};

/// Longest content shown for a streamed message, in bytes.
const PREVIEW_LEN: usize = 400;

pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// One trace message, as printed while a run streams.
    pub fn message(hop: usize, msg: &AgentMessage) -> String {
        let kind = Self::kind_label(msg.kind);
        let to = if msg.to.is_empty() {
            String::new()
        } else {
            let roles: Vec<_> = msg.to.iter().map(|r| r.to_string()).collect();
            format!(" -> {}", roles.join(", "))
        };
        let mut out = format!(
            "{} {} {}{}",
            format!("[{:>2}]", hop).dimmed(),
            kind,
            msg.from.cyan(),
            to.dimmed()
        );
        if let Some(c) = msg.meta.confidence {
            out.push_str(&format!(" {}", format!("({:.2})", c).dimmed()));
        }
        if let Some(reason) = &msg.meta.degraded {
            out.push_str(&format!(" {}", format!("degraded: {}", reason).yellow()));
        }
        out.push('\n');

        for line in mesh_domain::core::string::truncate(&msg.content, PREVIEW_LEN).lines() {
            out.push_str(&format!("     {}\n", line));
        }
        for citation in &msg.evidence {
            out.push_str(&format!("     {}\n", Self::citation(citation).dimmed()));
        }
        out
    }

    /// Status, validation, answer, plan and action of a finished run.
    pub fn summary(output: &RunMeshOutput) -> String {
        let run = &output.run;
        let mut out = String::new();

        out.push_str(&Self::section_header("Result"));
        let status = if run.is_resolved() {
            "Resolved".green().bold()
        } else {
            "Unresolved".red().bold()
        };
        out.push_str(&format!(
            "{} {}  {} hops, {} tokens, {} ms\n",
            "Status:".cyan().bold(),
            status,
            run.trace.stats.hops,
            run.trace.stats.tokens,
            run.trace.stats.ms
        ));
        if let Some(exhaustion) = &run.trace.truncated {
            out.push_str(&format!(
                "{} {}\n",
                "Budget exceeded:".yellow().bold(),
                exhaustion
            ));
        }
        if run.was_cancelled() {
            out.push_str(&format!("{}\n", "Cancelled".yellow().bold()));
        }

        for report in &run.validations {
            let verdict = if report.passed {
                "pass".green()
            } else {
                "fail".red()
            };
            out.push_str(&format!(
                "{} {:.3} {} (strategy {}, attempt {}, weights {})\n",
                "Validation:".cyan().bold(),
                report.score,
                verdict,
                report.strategy.as_str(),
                report.attempt,
                report.weights_version
            ));
            let s = &report.subscores;
            out.push_str(&format!(
                "  citation {:.2}  context {:.2}  source {:.2}  relevance {:.2}\n",
                s.citation, s.context, s.source, s.relevance
            ));
        }

        out.push_str(&Self::final_answer(output));

        if let Some(phase) = &output.phase {
            let (done, total) = phase.progress();
            out.push_str(&Self::section_header(&format!(
                "Plan {} ({}/{} done)",
                phase.id, done, total
            )));
            for task in &phase.tasks {
                out.push_str(&format!(
                    "  [{}] {} {}\n",
                    task.status.as_str(),
                    task.id.as_str().dimmed(),
                    task.description
                ));
            }
        }

        if let Some(action) = &output.action {
            out.push_str(&Self::section_header("Proposed Action"));
            out.push_str(&Self::action_detail(action));
        }

        let problems: Vec<String> = run
            .errors
            .iter()
            .map(|e| e.to_string())
            .chain(output.warnings.iter().map(|w| w.to_string()))
            .collect();
        if !problems.is_empty() {
            out.push_str(&format!("\n{}\n", "Warnings:".yellow().bold()));
            for p in problems {
                out.push_str(&format!("  * {}\n", p));
            }
        }

        out
    }

    /// The FINAL answer and its citations, or a note that there is none.
    pub fn final_answer(output: &RunMeshOutput) -> String {
        let mut out = Self::section_header("Answer");
        match output.run.final_message() {
            Some(msg) => {
                out.push_str(&format!("\n{}\n", msg.content));
                if !msg.evidence.is_empty() {
                    out.push_str(&format!("\n{}\n", "Citations:".cyan().bold()));
                    for c in &msg.evidence {
                        out.push_str(&format!("  * {}\n", Self::citation(c)));
                    }
                }
            }
            None => out.push_str(&format!("\n{}\n", "No final answer.".dimmed())),
        }
        out
    }

    /// Format as JSON
    pub fn format_json(output: &RunMeshOutput) -> String {
        let value = serde_json::json!({
            "resolved": output.run.is_resolved(),
            "trace": output.run.trace,
            "validations": output.run.validations,
            "errors": output.run.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
            "phase": output.phase,
            "action": output.action,
            "warnings": output.warnings.iter().map(|w| w.to_string()).collect::<Vec<_>>(),
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    /// One line per record for `actions list`.
    pub fn action_row(action: &PendingAction) -> String {
        let target = action.target.as_deref().unwrap_or("-");
        format!(
            "{}  {:<13} {:<6} {}{}  {}",
            action.id.as_str().dimmed(),
            Self::status_label(action.approval_status),
            Self::risk_label(action.risk),
            action.action.bold(),
            if action.executed { " (executed)".green().to_string() } else { String::new() },
            target
        )
    }

    pub fn action_detail(action: &PendingAction) -> String {
        let mut out = String::new();
        let field = |name: &str, value: String| format!("  {:<14}{}\n", format!("{}:", name).cyan(), value);

        out.push_str(&field("id", action.id.to_string()));
        out.push_str(&field(
            "action",
            format!("{} {}", action.action, action.target.as_deref().unwrap_or("")).trim_end().to_string(),
        ));
        out.push_str(&field("risk", Self::risk_label(action.risk).to_string()));
        out.push_str(&field("status", Self::status_label(action.approval_status).to_string()));
        out.push_str(&field("executed", action.executed.to_string()));
        if !action.user_id.is_empty() {
            out.push_str(&field("proposed by", action.user_id.clone()));
        }
        out.push_str(&field("confidence", format!("{:.2}", action.confidence)));
        out.push_str(&field("expected gain", format!("{:.2}", action.expected_gain)));
        if let Some(reward) = action.reward {
            out.push_str(&field("reward", format!("{:.2}", reward)));
        }
        out.push_str(&field("expires", action.expires_at.to_rfc3339()));
        out.push_str(&field("explanation", action.explanation.clone()));
        if let Some(task) = &action.task_ref {
            out.push_str(&field("task", format!("{}/{}", task.project_id, task.task_id)));
        }
        out.push_str(&format!("  {}\n", "history:".cyan()));
        for change in &action.history {
            out.push_str(&format!(
                "    {} {}{} by {}\n",
                change.at.to_rfc3339(),
                change.status,
                if change.executed { " (executed)" } else { "" },
                change.actor
            ));
        }
        out
    }

    fn citation(c: &Citation) -> String {
        let mut s = format!("{} ({:.2})", c.doc_id, c.score);
        if let Some((start, end)) = c.lines {
            s.push_str(&format!(" lines {}-{}", start, end));
        }
        if let Some(url) = &c.url {
            s.push_str(&format!(" {}", url));
        }
        s
    }

    fn kind_label(kind: MessageType) -> colored::ColoredString {
        let label = kind.as_str().to_uppercase();
        match kind {
            MessageType::Final => label.green().bold(),
            MessageType::Fact => label.blue().bold(),
            MessageType::Hypothesis => label.yellow().bold(),
            MessageType::Critique => label.magenta().bold(),
            _ => label.bold(),
        }
    }

    fn status_label(status: ApprovalStatus) -> colored::ColoredString {
        match status {
            ApprovalStatus::Pending => status.as_str().yellow(),
            ApprovalStatus::Approved | ApprovalStatus::AutoApproved => status.as_str().green(),
            ApprovalStatus::Rejected | ApprovalStatus::Expired => status.as_str().red(),
        }
    }

    fn risk_label(risk: RiskLevel) -> colored::ColoredString {
        match risk {
            RiskLevel::High => risk.as_str().red().bold(),
            RiskLevel::Medium => risk.as_str().yellow(),
            RiskLevel::Low => risk.as_str().normal(),
        }
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n", format!("── {} ──", title).cyan().bold())
    }
}
