//! The inline predictor: propose a continuation of the line being typed.
//!
//! Blends two candidate sources — the static catalogue at the walk
//! position and the knowledge graph for the command-key — and falls back
//! to workflow transitions when the command is unknown or the line is
//! empty. Everything runs in memory under a hard deadline; when the
//! deadline passes mid-computation the best candidate found so far wins.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::catalog::dynamic::ProbeContext;
use crate::engine::CompletionEngine;
use crate::history::CommandHistory;
use crate::knowledge::KnowledgeGraph;
use crate::workflow::{self, WorkflowLearner};

/// Hard deadline per prediction call.
pub const PREDICTION_DEADLINE: Duration = Duration::from_millis(20);

/// Baseline score assigned to catalogue candidates in the blend.
const CATALOG_BASELINE: f64 = 0.5;

/// How many candidates each source contributes before blending.
const TOP_N: usize = 5;

/// Where the winning candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionSource {
    Catalog,
    Learned,
    Workflow,
}

/// A single-line continuation proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// The full replacement line.
    pub line: String,
    pub score: f64,
    pub source: PredictionSource,
}

/// In-memory predictor over the engine, graph, workflow, and history.
pub struct Predictor {
    engine: Arc<CompletionEngine>,
    knowledge: Arc<KnowledgeGraph>,
    workflow: Arc<WorkflowLearner>,
    history: Arc<CommandHistory>,
}

impl Predictor {
    pub fn new(
        engine: Arc<CompletionEngine>,
        knowledge: Arc<KnowledgeGraph>,
        workflow: Arc<WorkflowLearner>,
        history: Arc<CommandHistory>,
    ) -> Self {
        Self {
            engine,
            knowledge,
            workflow,
            history,
        }
    }

    /// Predict a continuation for `partial_line`, or `None`.
    pub fn predict(&self, partial_line: &str, ctx: &ProbeContext) -> Option<Prediction> {
        let deadline = Instant::now() + PREDICTION_DEADLINE;
        self.predict_with_deadline(partial_line, ctx, deadline)
    }

    fn predict_with_deadline(
        &self,
        partial_line: &str,
        ctx: &ProbeContext,
        deadline: Instant,
    ) -> Option<Prediction> {
        if partial_line.trim().is_empty() {
            return self.predict_next_command("");
        }

        // Dynamic probes stay off the prediction path; only the walk and
        // in-memory scoring run here.
        let Some(walk) = self.engine.walk(partial_line, false, ctx) else {
            return self.fallback_unknown(partial_line);
        };

        let mut blended: HashMap<String, (f64, PredictionSource)> = HashMap::new();

        let catalogue = self
            .engine
            .catalog()
            .list_matching(walk.node, &walk.search_term, false, ctx);
        for candidate in catalogue.into_iter().take(TOP_N) {
            blended.insert(candidate.text, (CATALOG_BASELINE, PredictionSource::Catalog));
        }

        if Instant::now() < deadline {
            let key = self.knowledge_key(partial_line, &walk.command, &walk.search_term);
            for suggestion in self
                .knowledge
                .get_suggestions(&key, &walk.search_term)
                .into_iter()
                .take(TOP_N)
            {
                blended
                    .entry(suggestion.argument)
                    .and_modify(|(score, source)| {
                        if suggestion.score > *score {
                            *score = suggestion.score;
                            *source = PredictionSource::Learned;
                        }
                    })
                    .or_insert((suggestion.score, PredictionSource::Learned));
            }
        }

        let (literal, (score, source)) = blended.into_iter().max_by(|a, b| {
            a.1.0
                .partial_cmp(&b.1.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                // Deterministic tie-break, alphabetical.
                .then_with(|| b.0.cmp(&a.0))
        })?;

        let line = concatenate(partial_line, &literal);
        trace!(line = line.as_str(), score, "prediction");
        Some(Prediction { line, score, source })
    }

    /// Knowledge key for the line: `{command} {first_sub}` when the
    /// subcommand is already committed, falling back to the bare command
    /// when the two-token key has no data.
    fn knowledge_key(&self, partial_line: &str, command: &str, search_term: &str) -> String {
        let completed: Vec<String> = partial_line
            .split_whitespace()
            .skip(1)
            .filter(|t| *t != search_term)
            .map(str::to_string)
            .collect();
        let key = workflow::derive_key(command, &completed);
        if self.knowledge.get_command_knowledge(&key).is_some() {
            key
        } else {
            command.to_string()
        }
    }

    /// Unknown command: suggest from learned data keyed by the bare
    /// command, then from workflow transitions.
    fn fallback_unknown(&self, partial_line: &str) -> Option<Prediction> {
        let mut tokens = partial_line.split_whitespace();
        let command = tokens.next()?;
        let search = if partial_line.ends_with(char::is_whitespace) {
            ""
        } else {
            tokens.last().unwrap_or("")
        };

        let suggestions = self.knowledge.get_suggestions(command, search);
        if let Some(best) = suggestions.first() {
            return Some(Prediction {
                line: concatenate(partial_line, &best.argument),
                score: best.score,
                source: PredictionSource::Learned,
            });
        }
        self.predict_next_command(partial_line.trim())
    }

    /// Propose the next command from workflow transitions out of the most
    /// recent history entry. `partial` (possibly empty) filters targets.
    fn predict_next_command(&self, partial: &str) -> Option<Prediction> {
        let last = self.history.last()?;
        let from_key = workflow::derive_key(&last.command, &last.arguments);
        let transitions = self.workflow.next_commands(&from_key);
        let best = transitions
            .iter()
            .find(|t| partial.is_empty() || t.to_key.starts_with(partial))?;
        Some(Prediction {
            line: best.to_key.clone(),
            score: best.confidence,
            source: PredictionSource::Workflow,
        })
    }
}

/// Join `partial_line` and `literal` at a word boundary.
///
/// If the last token is a non-empty prefix of the literal, the token is
/// replaced; otherwise the literal is appended after a single space.
/// Absolute-path literals always replace the last token.
fn concatenate(partial_line: &str, literal: &str) -> String {
    let ends_with_space = partial_line.ends_with(char::is_whitespace);
    let trimmed = partial_line.trim_end();

    if ends_with_space || trimmed.is_empty() {
        return format!("{trimmed} {literal}").trim_start().to_string();
    }

    let last = trimmed.split_whitespace().last().unwrap_or("");
    let replace = is_absolute_path(literal)
        || (!last.is_empty()
            && literal.len() >= last.len()
            && literal[..last.len()].eq_ignore_ascii_case(last));

    if replace {
        let head = &trimmed[..trimmed.len() - last.len()];
        format!("{head}{literal}")
    } else {
        format!("{trimmed} {literal}")
    }
}

fn is_absolute_path(literal: &str) -> bool {
    std::path::Path::new(literal).is_absolute() || literal.starts_with('~')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use std::path::PathBuf;

    const T0: i64 = 1_700_000_000_000;

    fn predictor() -> Predictor {
        Predictor::new(
            Arc::new(CompletionEngine::new(Arc::new(Catalog::builtin()))),
            Arc::new(KnowledgeGraph::new()),
            Arc::new(WorkflowLearner::default()),
            Arc::new(CommandHistory::default()),
        )
    }

    fn ctx() -> ProbeContext {
        ProbeContext::default()
    }

    #[test]
    fn word_boundary_replaces_prefix() {
        assert_eq!(concatenate("git ch", "checkout"), "git checkout");
        assert_eq!(concatenate("git CH", "checkout"), "git checkout");
    }

    #[test]
    fn word_boundary_appends_non_prefix() {
        // The regression the boundary rule exists for: no "pluginstall".
        assert_eq!(concatenate("claude plugin", "install"), "claude plugin install");
    }

    #[test]
    fn word_boundary_appends_after_trailing_space() {
        assert_eq!(concatenate("git commit ", "--all"), "git commit --all");
    }

    #[test]
    fn absolute_paths_always_replace() {
        assert_eq!(concatenate("cd pro", "/home/u/proj"), "cd /home/u/proj");
        assert_eq!(concatenate("cd xyz", "~/proj"), "cd ~/proj");
    }

    #[test]
    fn predicts_catalogue_continuation() {
        let p = predictor();
        let prediction = p.predict("claude plugin inst", &ctx()).unwrap();
        assert_eq!(prediction.line, "claude plugin install");
        assert_eq!(prediction.source, PredictionSource::Catalog);
    }

    #[test]
    fn learned_argument_outranks_catalogue_baseline() {
        let p = predictor();
        let cwd = PathBuf::from("/home/u");
        // Heavy fresh usage pushes score above the 0.5 baseline.
        let now = chrono::Utc::now().timestamp_millis();
        for _ in 0..20 {
            p.knowledge
                .record_usage_at("git commit", &["--amend".to_string()], &cwd, now);
        }
        let prediction = p.predict("git commit ", &ctx()).unwrap();
        assert_eq!(prediction.line, "git commit --amend");
        assert_eq!(prediction.source, PredictionSource::Learned);
    }

    #[test]
    fn unknown_command_falls_back_to_learned_data() {
        let p = predictor();
        let cwd = PathBuf::from("/home/u");
        let now = chrono::Utc::now().timestamp_millis();
        p.knowledge
            .record_usage_at("terraform", &["apply".to_string()], &cwd, now);

        let prediction = p.predict("terraform ap", &ctx()).unwrap();
        assert_eq!(prediction.line, "terraform apply");
        assert_eq!(prediction.source, PredictionSource::Learned);
    }

    #[test]
    fn empty_line_predicts_next_command_from_workflow() {
        let p = predictor();
        let now = chrono::Utc::now().timestamp_millis();
        p.history.append(
            "git add .",
            "git",
            vec!["add".to_string(), ".".to_string()],
            now,
            "/home/u",
            true,
        );
        for _ in 0..5 {
            p.workflow.observe("git add", now, "git commit", now + 1000);
        }

        let prediction = p.predict("", &ctx()).unwrap();
        assert_eq!(prediction.line, "git commit");
        assert_eq!(prediction.source, PredictionSource::Workflow);
    }

    #[test]
    fn no_signal_means_no_prediction() {
        let p = predictor();
        assert!(p.predict("frobnicate xy", &ctx()).is_none());
        assert!(p.predict("", &ctx()).is_none());
    }

    #[test]
    fn two_token_key_is_preferred_when_known() {
        let p = predictor();
        let cwd = PathBuf::from("/home/u");
        let now = chrono::Utc::now().timestamp_millis();
        for _ in 0..20 {
            p.knowledge
                .record_usage_at("git push", &["--force-with-lease".to_string()], &cwd, now);
        }
        let prediction = p.predict("git push --f", &ctx()).unwrap();
        assert_eq!(prediction.line, "git push --force-with-lease");
    }

    #[test]
    fn stale_rare_learned_data_loses_to_catalogue() {
        let p = predictor();
        let cwd = PathBuf::from("/home/u");
        // One year-old use out of ten invocations: frequency factor 0.1
        // and recency near zero land well below the 0.5 baseline.
        let year_ago = chrono::Utc::now().timestamp_millis() - 365 * 24 * 60 * 60 * 1000;
        p.knowledge.record_usage_at(
            "git commit",
            &["--no-verify".to_string()],
            &cwd,
            year_ago,
        );
        for _ in 0..9 {
            p.knowledge.record_usage_at("git commit", &[], &cwd, year_ago);
        }
        let _ = T0;

        let prediction = p.predict("git commit ", &ctx()).unwrap();
        assert_eq!(prediction.source, PredictionSource::Catalog);
    }
}
