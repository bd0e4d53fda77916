//! The workflow learner: which command tends to follow which.
//!
//! Consecutive successful commands closer together than the transition
//! window feed an adjacency map from command-key to command-key with a
//! frequency and cumulative time delta. Gaps longer than the window are
//! discarded — the user had moved on to something else.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::knowledge::recency_factor;

/// Commands keyed as `{command} {first_sub}` rather than bare.
pub const MULTI_PART_COMMANDS: &[&str] = &[
    "git", "docker", "kubectl", "npm", "dotnet", "cargo", "gh", "az",
];

/// Maximum gap between two commands for a transition to count.
pub const DEFAULT_TRANSITION_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Frequency at which a transition reaches full confidence.
const CONFIDENCE_THRESHOLD: f64 = 5.0;
/// Recency decay window in days.
const DECAY_DAYS: f64 = 30.0;

/// Derive the workflow key for a command and its arguments.
///
/// Multi-part commands (`git`, `docker`, …) use the first non-flag
/// argument as a subcommand: `git add x` → `git add`. Everything else is
/// keyed by the bare command.
pub fn derive_key(command: &str, arguments: &[String]) -> String {
    let command_lower = command.to_ascii_lowercase();
    if MULTI_PART_COMMANDS.contains(&command_lower.as_str())
        && let Some(sub) = arguments.iter().find(|a| !a.starts_with('-'))
    {
        return format!("{command_lower} {}", sub.to_ascii_lowercase());
    }
    command_lower
}

/// Statistics for one `from → to` transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionStats {
    pub frequency: u64,
    /// Sum of elapsed milliseconds across observations.
    pub total_time_delta_ms: i64,
    pub first_seen: i64,
    pub last_seen: i64,
}

/// A transition surfaced to callers, with its confidence at query time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTransition {
    pub from_key: String,
    pub to_key: String,
    pub frequency: u64,
    /// Mean observed gap in milliseconds.
    pub mean_delta_ms: i64,
    pub confidence: f64,
}

/// Flat record used by persistence and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from_key: String,
    pub to_key: String,
    #[serde(flatten)]
    pub stats: TransitionStats,
}

/// Thread-safe command→next-command adjacency map.
pub struct WorkflowLearner {
    transitions: RwLock<HashMap<String, HashMap<String, TransitionStats>>>,
    window: Duration,
}

impl Default for WorkflowLearner {
    fn default() -> Self {
        Self::with_window(DEFAULT_TRANSITION_WINDOW)
    }
}

impl WorkflowLearner {
    pub fn with_window(window: Duration) -> Self {
        Self {
            transitions: RwLock::new(HashMap::new()),
            window,
        }
    }

    /// Observe a consecutive command pair.
    ///
    /// `prev_at` / `next_at` are epoch milliseconds. Returns the recorded
    /// delta when the transition was inside the window, `None` when it was
    /// discarded.
    pub fn observe(
        &self,
        prev_key: &str,
        prev_at: i64,
        next_key: &str,
        next_at: i64,
    ) -> Option<i64> {
        let delta_ms = next_at - prev_at;
        if delta_ms < 0 || delta_ms as u128 > self.window.as_millis() {
            trace!(
                prev_key,
                next_key,
                delta_ms,
                "transition outside window, discarded"
            );
            return None;
        }

        let mut transitions = self.transitions.write().expect("workflow lock poisoned");
        let stats = transitions
            .entry(prev_key.to_string())
            .or_default()
            .entry(next_key.to_string())
            .or_insert_with(|| TransitionStats {
                frequency: 0,
                total_time_delta_ms: 0,
                first_seen: next_at,
                last_seen: next_at,
            });
        stats.frequency += 1;
        stats.total_time_delta_ms += delta_ms;
        stats.first_seen = stats.first_seen.min(next_at);
        stats.last_seen = stats.last_seen.max(next_at);
        Some(delta_ms)
    }

    /// Transitions out of `from_key`, ranked by confidence.
    pub fn next_commands(&self, from_key: &str) -> Vec<RankedTransition> {
        self.next_commands_at(from_key, chrono::Utc::now().timestamp_millis())
    }

    /// [`Self::next_commands`] with an explicit "now" timestamp.
    pub fn next_commands_at(&self, from_key: &str, now: i64) -> Vec<RankedTransition> {
        let transitions = self.transitions.read().expect("workflow lock poisoned");
        let Some(targets) = transitions.get(from_key) else {
            return Vec::new();
        };
        let mut ranked: Vec<RankedTransition> = targets
            .iter()
            .map(|(to_key, stats)| RankedTransition {
                from_key: from_key.to_string(),
                to_key: to_key.clone(),
                frequency: stats.frequency,
                mean_delta_ms: stats.total_time_delta_ms / stats.frequency.max(1) as i64,
                confidence: confidence(stats, now),
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.to_key.cmp(&b.to_key))
        });
        ranked
    }

    /// All transitions as flat records, sorted for stable output.
    pub fn snapshot(&self) -> Vec<TransitionRecord> {
        let transitions = self.transitions.read().expect("workflow lock poisoned");
        let mut records: Vec<TransitionRecord> = transitions
            .iter()
            .flat_map(|(from, targets)| {
                targets.iter().map(|(to, stats)| TransitionRecord {
                    from_key: from.clone(),
                    to_key: to.clone(),
                    stats: stats.clone(),
                })
            })
            .collect();
        records.sort_by(|a, b| {
            a.from_key
                .cmp(&b.from_key)
                .then_with(|| a.to_key.cmp(&b.to_key))
        });
        records
    }

    /// Replace all state (import-replace).
    pub fn replace(&self, records: Vec<TransitionRecord>) {
        let mut transitions = self.transitions.write().expect("workflow lock poisoned");
        transitions.clear();
        for record in records {
            transitions
                .entry(record.from_key)
                .or_default()
                .insert(record.to_key, record.stats);
        }
    }

    /// Additively merge records (import-merge): frequencies and deltas are
    /// summed, `first_seen` takes the minimum, `last_seen` the maximum.
    pub fn merge(&self, records: Vec<TransitionRecord>) {
        let mut transitions = self.transitions.write().expect("workflow lock poisoned");
        for record in records {
            let entry = transitions
                .entry(record.from_key)
                .or_default()
                .entry(record.to_key);
            match entry {
                std::collections::hash_map::Entry::Vacant(v) => {
                    v.insert(record.stats);
                }
                std::collections::hash_map::Entry::Occupied(mut o) => {
                    let mine = o.get_mut();
                    mine.frequency += record.stats.frequency;
                    mine.total_time_delta_ms += record.stats.total_time_delta_ms;
                    mine.first_seen = mine.first_seen.min(record.stats.first_seen);
                    mine.last_seen = mine.last_seen.max(record.stats.last_seen);
                }
            }
        }
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.transitions
            .write()
            .expect("workflow lock poisoned")
            .clear();
    }

    /// Number of distinct `from → to` edges.
    pub fn len(&self) -> usize {
        self.transitions
            .read()
            .expect("workflow lock poisoned")
            .values()
            .map(|targets| targets.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `min(1, frequency / threshold) · exp(-age_days / 30)`.
fn confidence(stats: &TransitionStats, now: i64) -> f64 {
    let frequency_factor = (stats.frequency as f64 / CONFIDENCE_THRESHOLD).min(1.0);
    frequency_factor * recency_factor(stats.last_seen, now, DECAY_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn key_derivation_uses_first_subcommand_for_multi_part() {
        assert_eq!(derive_key("git", &strings(&["add", "x"])), "git add");
        assert_eq!(derive_key("docker", &strings(&["ps"])), "docker ps");
        assert_eq!(derive_key("ls", &strings(&["-la"])), "ls");
        assert_eq!(derive_key("git", &[]), "git");
        assert_eq!(derive_key("GIT", &strings(&["Add"])), "git add");
    }

    #[test]
    fn key_derivation_skips_leading_flags() {
        assert_eq!(
            derive_key("cargo", &strings(&["--quiet", "build"])),
            "cargo build"
        );
        assert_eq!(derive_key("git", &strings(&["-C", "commit"])), "git commit");
    }

    #[test]
    fn transitions_inside_window_are_recorded() {
        let learner = WorkflowLearner::default();
        let recorded = learner.observe("git add", T0, "git commit", T0 + 10_000);
        assert_eq!(recorded, Some(10_000));

        let ranked = learner.next_commands_at("git add", T0 + 10_000);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].to_key, "git commit");
        assert_eq!(ranked[0].frequency, 1);
        assert_eq!(ranked[0].mean_delta_ms, 10_000);
    }

    #[test]
    fn transitions_past_window_are_discarded() {
        let learner = WorkflowLearner::default();
        let two_hours = 2 * 60 * 60 * 1000;
        assert_eq!(learner.observe("git commit", T0, "git push", T0 + two_hours), None);
        assert!(learner.next_commands_at("git commit", T0).is_empty());
    }

    #[test]
    fn negative_gaps_are_discarded() {
        let learner = WorkflowLearner::default();
        assert_eq!(learner.observe("a", T0, "b", T0 - 1), None);
    }

    #[test]
    fn confidence_saturates_at_threshold() {
        let learner = WorkflowLearner::default();
        for i in 0..10 {
            learner.observe("make", T0 + i, "make test", T0 + i + 1000);
        }
        let ranked = learner.next_commands_at("make", T0 + 1010);
        assert!((ranked[0].confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn confidence_decays_with_age() {
        let learner = WorkflowLearner::default();
        for _ in 0..5 {
            learner.observe("make", T0, "make test", T0 + 1000);
        }
        let day_ms = 24 * 60 * 60 * 1000;
        let fresh = learner.next_commands_at("make", T0 + 1000)[0].confidence;
        let aged = learner.next_commands_at("make", T0 + 1000 + 60 * day_ms)[0].confidence;
        assert!(aged < fresh);
    }

    #[test]
    fn ranked_order_prefers_frequent_targets() {
        let learner = WorkflowLearner::default();
        for _ in 0..3 {
            learner.observe("git add", T0, "git commit", T0 + 1000);
        }
        learner.observe("git add", T0, "git status", T0 + 1000);

        let ranked = learner.next_commands_at("git add", T0 + 1000);
        assert_eq!(ranked[0].to_key, "git commit");
        assert_eq!(ranked[1].to_key, "git status");
    }

    #[test]
    fn merge_doubles_like_a_doubled_snapshot() {
        let learner = WorkflowLearner::default();
        learner.observe("a", T0, "b", T0 + 500);
        let snapshot = learner.snapshot();

        let twice = WorkflowLearner::default();
        twice.merge(snapshot.clone());
        twice.merge(snapshot.clone());

        let mut doubled = snapshot.clone();
        for record in &mut doubled {
            record.stats.frequency *= 2;
            record.stats.total_time_delta_ms *= 2;
        }
        let once = WorkflowLearner::default();
        once.merge(doubled);

        assert_eq!(twice.snapshot(), once.snapshot());
    }

    #[test]
    fn replace_overwrites_existing_state() {
        let learner = WorkflowLearner::default();
        learner.observe("a", T0, "b", T0 + 500);
        learner.replace(vec![TransitionRecord {
            from_key: "x".to_string(),
            to_key: "y".to_string(),
            stats: TransitionStats {
                frequency: 7,
                total_time_delta_ms: 700,
                first_seen: T0,
                last_seen: T0,
            },
        }]);
        assert!(learner.next_commands_at("a", T0).is_empty());
        assert_eq!(learner.next_commands_at("x", T0)[0].frequency, 7);
    }
}
