//! Heuristic subscore computation.

use super::report::Subscores;
use crate::core::string::{coverage, keywords};
use crate::message::{AgentMessage, CritiqueVerdict};
use std::collections::{BTreeSet, HashSet};

/// Number of citations at which the citation subscore stops growing.
const TARGET_CITATIONS: usize = 3;

/// Single-pass heuristic scoring of an answer against its goal and hints.
pub fn heuristic_subscores(message: &AgentMessage, goal: &str, hints: &[String]) -> Subscores {
    let evidence = &message.evidence;
    let n = evidence.len();

    let reference = reference_keywords(goal, hints);
    let mut answer = keywords(&message.content);
    for snippet in evidence.iter().filter_map(|c| c.snippet.as_deref()) {
        answer.extend(keywords(snippet));
    }
    let context = coverage(&reference, &answer);

    if n == 0 {
        return Subscores::new(0.0, context, 0.0, 0.0);
    }

    let mean_score = evidence.iter().map(|c| c.score).sum::<f64>() / n as f64;
    let volume = (n as f64 / TARGET_CITATIONS as f64).min(1.0);
    let citation = mean_score * volume;

    let distinct: HashSet<&str> = evidence.iter().map(|c| c.doc_id.as_str()).collect();
    let traceable = evidence
        .iter()
        .filter(|c| c.url.is_some() || c.lines.is_some())
        .count();
    let source =
        (distinct.len() as f64 / n as f64) * (0.5 + 0.5 * traceable as f64 / n as f64);

    let goal_words = keywords(goal);
    let top = &evidence[0];
    let top_match = top
        .snippet
        .as_deref()
        .map(|s| coverage(&goal_words, &keywords(s)))
        .unwrap_or(top.score);
    let relevance = 0.5 * top.score + 0.5 * top_match;

    Subscores::new(citation, context, source, relevance)
}

/// Temper evidence-related subscores with a critic's verdict.
///
/// A supported verdict pulls `citation` and `relevance` toward the critic's
/// confidence; an unsupported one scales them down by it.
pub fn apply_critique(base: Subscores, verdict: &CritiqueVerdict) -> Subscores {
    let adjust = |s: f64| {
        if verdict.supported {
            (s + verdict.confidence) / 2.0
        } else {
            s * verdict.confidence
        }
    };
    Subscores::new(
        adjust(base.citation),
        base.context,
        base.source,
        adjust(base.relevance),
    )
}

/// Per-subscore fraction of samples that clear `threshold`.
///
/// An empty sample set scores zero everywhere.
pub fn majority_subscores(samples: &[Subscores], threshold: f64) -> Subscores {
    if samples.is_empty() {
        return Subscores::default();
    }
    let n = samples.len() as f64;
    let frac = |pick: fn(&Subscores) -> f64| {
        samples.iter().filter(|s| pick(s) >= threshold).count() as f64 / n
    };
    Subscores::new(
        frac(|s| s.citation),
        frac(|s| s.context),
        frac(|s| s.source),
        frac(|s| s.relevance),
    )
}

/// Keywords of the goal plus hints.
pub fn reference_keywords(goal: &str, hints: &[String]) -> BTreeSet<String> {
    let mut reference = keywords(goal);
    for hint in hints {
        reference.extend(keywords(hint));
    }
    reference
}
