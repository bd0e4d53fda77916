//! The knowledge graph: per-command argument-usage statistics.
//!
//! Every successful command feeds this graph. For each command-key it
//! tracks total usage and per-argument counts with first-seen/last-used
//! timestamps (epoch milliseconds). Navigation-command arguments are
//! normalized to canonical absolute paths before recording, so the three
//! spellings of the same directory land on one key.
//!
//! Reads take a consistent snapshot per command-key; writes are additive
//! and safe from any number of threads.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::paths;

/// Usage statistics for a single argument of a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentKnowledge {
    /// The argument literal (normalized for navigation commands).
    pub argument: String,
    pub usage_count: u64,
    /// Epoch milliseconds.
    pub first_seen: i64,
    /// Epoch milliseconds.
    pub last_used: i64,
    /// Literal begins with `-`.
    pub is_flag: bool,
}

/// Usage statistics for one command-key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandKnowledge {
    pub command_key: String,
    /// Invocation count; a command used with no arguments still counts.
    pub total_usage: u64,
    pub first_seen: i64,
    pub last_used: i64,
    /// Argument literal → statistics.
    pub arguments: HashMap<String, ArgumentKnowledge>,
}

impl CommandKnowledge {
    fn new(command_key: &str, now: i64) -> Self {
        Self {
            command_key: command_key.to_string(),
            total_usage: 0,
            first_seen: now,
            last_used: now,
            arguments: HashMap::new(),
        }
    }
}

/// A ranked suggestion drawn from learned data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub argument: String,
    pub usage_count: u64,
    pub last_used: i64,
    pub score: f64,
}

/// Recency factor `exp(-age_days / decay_days)`, clamped for clock skew.
pub fn recency_factor(last_used_ms: i64, now_ms: i64, decay_days: f64) -> f64 {
    let age_ms = (now_ms - last_used_ms).max(0) as f64;
    let age_days = age_ms / (24.0 * 60.0 * 60.0 * 1000.0);
    (-age_days / decay_days).exp()
}

/// Weight of the frequency factor in suggestion scoring.
const FREQUENCY_WEIGHT: f64 = 0.6;
/// Weight of the recency factor in suggestion scoring.
const RECENCY_WEIGHT: f64 = 0.4;
/// Recency decay window in days.
const DECAY_DAYS: f64 = 30.0;

/// Thread-safe per-command usage statistics.
#[derive(Default)]
pub struct KnowledgeGraph {
    commands: RwLock<HashMap<String, CommandKnowledge>>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful invocation of `command_key` with `arguments`.
    ///
    /// Navigation-command arguments are normalized against
    /// `working_directory`. Duplicate literals within a single invocation
    /// count once. Returns the literals as recorded (post-normalization),
    /// for the caller's delta buffer.
    pub fn record_usage(
        &self,
        command_key: &str,
        arguments: &[String],
        working_directory: &Path,
    ) -> Vec<String> {
        self.record_usage_at(
            command_key,
            arguments,
            working_directory,
            chrono::Utc::now().timestamp_millis(),
        )
    }

    /// [`Self::record_usage`] with an explicit timestamp.
    pub fn record_usage_at(
        &self,
        command_key: &str,
        arguments: &[String],
        working_directory: &Path,
        now: i64,
    ) -> Vec<String> {
        let command = base_command(command_key);
        let is_nav = paths::is_navigation_command(command);

        let mut recorded: Vec<String> = Vec::new();
        for raw in arguments {
            let literal = if is_nav && !raw.starts_with('-') {
                paths::normalize(raw, working_directory)
                    .display()
                    .to_string()
            } else {
                raw.clone()
            };
            if !recorded.contains(&literal) {
                recorded.push(literal);
            }
        }

        let mut commands = self.commands.write().expect("knowledge lock poisoned");
        let entry = commands
            .entry(command_key.to_string())
            .or_insert_with(|| CommandKnowledge::new(command_key, now));
        entry.total_usage += 1;
        entry.last_used = entry.last_used.max(now);
        entry.first_seen = entry.first_seen.min(now);

        for literal in &recorded {
            let arg = entry
                .arguments
                .entry(literal.clone())
                .or_insert_with(|| ArgumentKnowledge {
                    argument: literal.clone(),
                    usage_count: 0,
                    first_seen: now,
                    last_used: now,
                    is_flag: literal.starts_with('-'),
                });
            arg.usage_count += 1;
            arg.last_used = arg.last_used.max(now);
            arg.first_seen = arg.first_seen.min(now);
        }

        trace!(
            command_key,
            arguments = recorded.len(),
            "recorded usage"
        );
        recorded
    }

    /// Snapshot of one command's knowledge.
    pub fn get_command_knowledge(&self, command_key: &str) -> Option<CommandKnowledge> {
        self.commands
            .read()
            .expect("knowledge lock poisoned")
            .get(command_key)
            .cloned()
    }

    /// Ranked argument suggestions for `command_key`.
    ///
    /// `partial` filters by case-insensitive prefix (empty matches all).
    /// Score is `0.6·(usage/total) + 0.4·exp(-age_days/30)`, descending.
    pub fn get_suggestions(&self, command_key: &str, partial: &str) -> Vec<Suggestion> {
        self.get_suggestions_at(command_key, partial, chrono::Utc::now().timestamp_millis())
    }

    /// [`Self::get_suggestions`] with an explicit "now" timestamp.
    pub fn get_suggestions_at(&self, command_key: &str, partial: &str, now: i64) -> Vec<Suggestion> {
        let commands = self.commands.read().expect("knowledge lock poisoned");
        let Some(knowledge) = commands.get(command_key) else {
            return Vec::new();
        };
        let total = knowledge.total_usage.max(1) as f64;
        let partial_lower = partial.to_ascii_lowercase();

        let mut suggestions: Vec<Suggestion> = knowledge
            .arguments
            .values()
            .filter(|arg| {
                partial.is_empty()
                    || arg
                        .argument
                        .to_ascii_lowercase()
                        .starts_with(&partial_lower)
            })
            .map(|arg| {
                let frequency = arg.usage_count as f64 / total;
                let recency = recency_factor(arg.last_used, now, DECAY_DAYS);
                Suggestion {
                    argument: arg.argument.clone(),
                    usage_count: arg.usage_count,
                    last_used: arg.last_used,
                    score: FREQUENCY_WEIGHT * frequency + RECENCY_WEIGHT * recency,
                }
            })
            .collect();

        suggestions.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.argument.cmp(&b.argument))
        });
        suggestions
    }

    /// All command-keys with recorded usage.
    pub fn command_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .commands
            .read()
            .expect("knowledge lock poisoned")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Full snapshot for export and persistence.
    pub fn snapshot(&self) -> Vec<CommandKnowledge> {
        let mut all: Vec<CommandKnowledge> = self
            .commands
            .read()
            .expect("knowledge lock poisoned")
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| a.command_key.cmp(&b.command_key));
        all
    }

    /// Replace all state with `records` (import-replace).
    pub fn replace(&self, records: Vec<CommandKnowledge>) {
        let mut commands = self.commands.write().expect("knowledge lock poisoned");
        commands.clear();
        for record in records {
            commands.insert(record.command_key.clone(), record);
        }
    }

    /// Additively merge `records` into the graph (import-merge).
    ///
    /// Counts are summed, `first_seen` takes the minimum, `last_used` the
    /// maximum — the same conflict rules the store applies, so merging is
    /// commutative and associative.
    pub fn merge(&self, records: Vec<CommandKnowledge>) {
        let mut commands = self.commands.write().expect("knowledge lock poisoned");
        for incoming in records {
            match commands.get_mut(&incoming.command_key) {
                None => {
                    commands.insert(incoming.command_key.clone(), incoming);
                }
                Some(existing) => {
                    existing.total_usage += incoming.total_usage;
                    existing.first_seen = existing.first_seen.min(incoming.first_seen);
                    existing.last_used = existing.last_used.max(incoming.last_used);
                    for (literal, arg) in incoming.arguments {
                        match existing.arguments.get_mut(&literal) {
                            None => {
                                existing.arguments.insert(literal, arg);
                            }
                            Some(mine) => {
                                mine.usage_count += arg.usage_count;
                                mine.first_seen = mine.first_seen.min(arg.first_seen);
                                mine.last_used = mine.last_used.max(arg.last_used);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Drop one command's data, or everything.
    pub fn clear(&self, command_key: Option<&str>) {
        let mut commands = self.commands.write().expect("knowledge lock poisoned");
        match command_key {
            Some(key) => {
                commands.remove(key);
            }
            None => commands.clear(),
        }
    }

    /// Number of command-keys tracked.
    pub fn len(&self) -> usize {
        self.commands.read().expect("knowledge lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// First token of a command-key (`git add` → `git`).
fn base_command(command_key: &str) -> &str {
    command_key
        .split_whitespace()
        .next()
        .unwrap_or(command_key)
}
