//! Smart directory navigation: learned paths, fuzzy matching, frecency.
//!
//! Serves the directory-change commands. Candidates come from the
//! knowledge graph (normalized absolute paths learned from past `cd`s)
//! plus an optional bounded filesystem scan below the current directory.
//! Each candidate is classified by how it matched and scored by a weighted
//! sum of frequency, recency, and directory distance.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::NavigationConfig;
use crate::knowledge::{KnowledgeGraph, recency_factor};
use crate::paths::{self, NAVIGATION_COMMANDS};

/// Default number of candidates returned by a completion request.
pub const DEFAULT_TOP_K: usize = 10;

/// How a candidate matched the input word, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum MatchType {
    /// `~`, `..`, `.` typed literally.
    WellKnown,
    /// Basename equals the input word.
    Exact,
    /// Basename starts with the input word.
    Prefix,
    /// Input word is an in-order subsequence of the basename.
    Fuzzy,
    /// Discovered by the filesystem scan, not matched by name.
    Filesystem,
}

/// A scored navigation candidate.
#[derive(Debug, Clone, Serialize)]
pub struct NavigationCandidate {
    /// Display path relative to the current directory, trailing separator
    /// included.
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub match_type: MatchType,
    pub tooltip: String,
    pub score: f64,
}

/// Learned statistics folded across all navigation commands.
struct LearnedPath {
    usage_count: u64,
    last_used: i64,
}

/// The navigation engine.
pub struct NavigationEngine {
    knowledge: Arc<KnowledgeGraph>,
    config: NavigationConfig,
}

impl NavigationEngine {
    pub fn new(knowledge: Arc<KnowledgeGraph>, config: NavigationConfig) -> Self {
        Self { knowledge, config }
    }

    /// Complete `word` from `current_dir`: top-K scored candidates.
    pub fn complete(&self, word: &str, current_dir: &Path) -> Vec<NavigationCandidate> {
        self.complete_at(
            word,
            current_dir,
            chrono::Utc::now().timestamp_millis(),
            DEFAULT_TOP_K,
        )
    }

    /// [`Self::complete`] with explicit clock and result bound.
    pub fn complete_at(
        &self,
        word: &str,
        current_dir: &Path,
        now: i64,
        top_k: usize,
    ) -> Vec<NavigationCandidate> {
        let learned = self.learned_paths();
        let total_usage: u64 = learned.values().map(|l| l.usage_count).sum();

        let mut candidates: Vec<NavigationCandidate> = Vec::new();

        for well_known in ["~", "..", "."] {
            if !word.is_empty() && well_known.starts_with(word) {
                let absolute = paths::normalize(well_known, current_dir);
                candidates.push(self.scored(
                    well_known.to_string(),
                    absolute,
                    MatchType::WellKnown,
                    None,
                    total_usage,
                    current_dir,
                    now,
                ));
            }
        }

        for (path, stats) in &learned {
            let Some(match_type) = classify(word, path, &self.config) else {
                continue;
            };
            candidates.push(self.scored(
                paths::relative_display(path, current_dir),
                path.clone(),
                match_type,
                Some(stats),
                total_usage,
                current_dir,
                now,
            ));
        }

        if self.config.recursive_search {
            for path in self.scan_filesystem(current_dir) {
                if learned.contains_key(&path) {
                    continue;
                }
                let match_type = classify(word, &path, &self.config)
                    .unwrap_or(MatchType::Filesystem);
                // Unmatched scan hits only surface when nothing was typed.
                if match_type == MatchType::Filesystem && !word.is_empty() {
                    continue;
                }
                candidates.push(self.scored(
                    paths::relative_display(&path, current_dir),
                    path,
                    MatchType::Filesystem.min(match_type),
                    None,
                    total_usage,
                    current_dir,
                    now,
                ));
            }
        }

        // The current directory is never a useful navigation target.
        candidates.retain(|c| c.absolute_path != current_dir);

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.match_type.cmp(&b.match_type))
                .then_with(|| a.relative_path.cmp(&b.relative_path))
        });
        candidates.truncate(top_k);
        candidates
    }

    /// Resolve `word` to a navigable directory.
    ///
    /// When `word` already names an existing directory there is nothing to
    /// fix and `None` is returned. Otherwise the highest-scoring candidate
    /// whose absolute path exists on disk is proposed.
    pub fn best_match(&self, word: &str, current_dir: &Path) -> Option<PathBuf> {
        let literal = paths::normalize(word, current_dir);
        if literal.is_dir() {
            return None;
        }
        let candidates = self.complete_at(
            word,
            current_dir,
            chrono::Utc::now().timestamp_millis(),
            usize::MAX,
        );
        let target = candidates
            .into_iter()
            .find(|c| c.absolute_path.is_dir())
            .map(|c| c.absolute_path)?;
        debug!(word, target = %target.display(), "best-match navigation");
        Some(target)
    }

    #[allow(clippy::too_many_arguments)]
    fn scored(
        &self,
        relative_path: String,
        absolute_path: PathBuf,
        match_type: MatchType,
        learned: Option<&LearnedPath>,
        total_usage: u64,
        current_dir: &Path,
        now: i64,
    ) -> NavigationCandidate {
        let cfg = &self.config;
        let (frequency, recency) = match learned {
            Some(stats) if total_usage > 0 => (
                stats.usage_count as f64 / total_usage as f64,
                recency_factor(stats.last_used, now, cfg.score_decay_days),
            ),
            _ => (0.0, 0.0),
        };
        let distance = 1.0 / (1.0 + paths::depth_delta(current_dir, &absolute_path) as f64);

        let mut score = cfg.frequency_weight * frequency
            + cfg.recency_weight * recency
            + cfg.distance_weight * distance;
        if match_type == MatchType::Exact {
            score *= cfg.exact_match_boost;
        }

        let tooltip = match learned {
            Some(stats) => format!(
                "{} (used {} times)",
                absolute_path.display(),
                stats.usage_count
            ),
            None => absolute_path.display().to_string(),
        };

        NavigationCandidate {
            relative_path: with_trailing_separator(relative_path),
            absolute_path,
            match_type,
            tooltip,
            score,
        }
    }

    /// Learned absolute paths across all navigation commands, stats summed.
    fn learned_paths(&self) -> HashMap<PathBuf, LearnedPath> {
        let mut merged: HashMap<PathBuf, LearnedPath> = HashMap::new();
        for command in NAVIGATION_COMMANDS {
            let Some(knowledge) = self.knowledge.get_command_knowledge(command) else {
                continue;
            };
            for arg in knowledge.arguments.values() {
                if arg.is_flag {
                    continue;
                }
                let path = PathBuf::from(&arg.argument);
                if !path.is_absolute() {
                    continue;
                }
                let entry = merged.entry(path).or_insert(LearnedPath {
                    usage_count: 0,
                    last_used: arg.last_used,
                });
                entry.usage_count += arg.usage_count;
                entry.last_used = entry.last_used.max(arg.last_used);
            }
        }
        merged
    }

    /// Bounded scan for directories below `root`.
    fn scan_filesystem(&self, root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .min_depth(1)
            .max_depth(self.config.max_depth)
            .into_iter()
            .filter_entry(|e| {
                // Only prune hidden entries below the root; the root itself
                // may legitimately be dot-prefixed.
                e.depth() == 0
                    || !e
                        .file_name()
                        .to_str()
                        .is_some_and(|name| name.starts_with('.'))
            })
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.into_path())
            .collect()
    }
}

/// Classify how `word` matches the basename of `path`.
fn classify(word: &str, path: &Path, config: &NavigationConfig) -> Option<MatchType> {
    if word.is_empty() {
        return Some(MatchType::Filesystem);
    }
    let basename = path.file_name()?.to_string_lossy();
    if basename.eq_ignore_ascii_case(word) {
        return Some(MatchType::Exact);
    }
    if basename.len() >= word.len() && basename[..word.len()].eq_ignore_ascii_case(word) {
        return Some(MatchType::Prefix);
    }
    if fuzzy_match_percentage(word, &basename) >= config.fuzzy_min_match_percentage {
        return Some(MatchType::Fuzzy);
    }
    None
}

/// Percentage of `word`'s characters found in order within `target`.
fn fuzzy_match_percentage(word: &str, target: &str) -> f64 {
    if word.is_empty() {
        return 0.0;
    }
    let target_lower = target.to_ascii_lowercase();
    let mut target_chars = target_lower.chars();
    let mut matched = 0usize;
    for w in word.to_ascii_lowercase().chars() {
        if target_chars.any(|t| t == w) {
            matched += 1;
        }
    }
    matched as f64 * 100.0 / word.chars().count() as f64
}

fn with_trailing_separator(mut path: String) -> String {
    if !path.ends_with(std::path::MAIN_SEPARATOR) {
        path.push(std::path::MAIN_SEPARATOR);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    fn engine_with_learned(paths_used: &[(&str, u64, i64)]) -> NavigationEngine {
        let knowledge = Arc::new(KnowledgeGraph::new());
        for (path, count, at) in paths_used {
            for _ in 0..*count {
                knowledge.record_usage_at("cd", &[path.to_string()], Path::new("/"), *at);
            }
        }
        NavigationEngine::new(knowledge, NavigationConfig::default())
    }

    #[test]
    fn fuzzy_percentage_counts_in_order_matches() {
        assert_eq!(fuzzy_match_percentage("dotnet", "dd-trace-dotnet"), 100.0);
        assert!(fuzzy_match_percentage("xyz", "dd-trace-dotnet") < 50.0);
        assert_eq!(fuzzy_match_percentage("", "anything"), 0.0);
    }

    #[test]
    fn classify_priority_order() {
        let cfg = NavigationConfig::default();
        assert_eq!(
            classify("proj", Path::new("/src/proj"), &cfg),
            Some(MatchType::Exact)
        );
        assert_eq!(
            classify("pro", Path::new("/src/proj"), &cfg),
            Some(MatchType::Prefix)
        );
        assert_eq!(
            classify("dotnet", Path::new("/src/dd-trace-dotnet"), &cfg),
            Some(MatchType::Fuzzy)
        );
        assert_eq!(classify("zzz", Path::new("/src/proj"), &cfg), None);
    }

    #[test]
    fn learned_fuzzy_match_prefers_frequent_recent_path() {
        let engine = engine_with_learned(&[
            ("/src/datadog/dd-trace-dotnet", 5, T0),
            ("/src/datadog/dd-continuous-profiler", 2, T0 - 10_000),
        ]);
        let candidates = engine.complete_at("dotnet", Path::new("/home/u"), T0, 10);
        assert!(!candidates.is_empty());
        let top = &candidates[0];
        assert_eq!(
            top.absolute_path,
            PathBuf::from("/src/datadog/dd-trace-dotnet")
        );
        assert!(matches!(top.match_type, MatchType::Fuzzy | MatchType::Prefix));
    }

    #[test]
    fn current_directory_is_filtered_out() {
        let engine = engine_with_learned(&[("/home/u", 10, T0), ("/home/u/proj", 1, T0)]);
        let candidates = engine.complete_at("u", Path::new("/home/u"), T0, 10);
        assert!(
            candidates
                .iter()
                .all(|c| c.absolute_path != Path::new("/home/u"))
        );
    }

    #[test]
    fn display_paths_carry_trailing_separator() {
        let engine = engine_with_learned(&[("/home/u/proj", 3, T0)]);
        let candidates = engine.complete_at("proj", Path::new("/home/u"), T0, 10);
        assert!(!candidates.is_empty());
        assert!(candidates[0].relative_path.ends_with(std::path::MAIN_SEPARATOR));
    }

    #[test]
    fn exact_match_gets_boosted_over_prefix() {
        let engine = engine_with_learned(&[
            ("/src/app", 3, T0),
            ("/src/apps-legacy", 3, T0),
        ]);
        let candidates = engine.complete_at("app", Path::new("/src"), T0, 10);
        assert_eq!(candidates[0].absolute_path, PathBuf::from("/src/app"));
        assert_eq!(candidates[0].match_type, MatchType::Exact);
    }

    #[test]
    fn filesystem_scan_discovers_directories() {
        let dir = tempfile::tempdir().expect("tmpdir");
        std::fs::create_dir_all(dir.path().join("alpha/nested")).expect("mkdir");
        std::fs::create_dir(dir.path().join(".hidden")).expect("mkdir");

        let engine = NavigationEngine::new(
            Arc::new(KnowledgeGraph::new()),
            NavigationConfig::default(),
        );
        let candidates = engine.complete_at("", dir.path(), T0, 20);
        let found: Vec<&Path> = candidates.iter().map(|c| c.absolute_path.as_path()).collect();
        assert!(found.contains(&dir.path().join("alpha").as_path()));
        assert!(found.contains(&dir.path().join("alpha/nested").as_path()));
        assert!(!found.iter().any(|p| p.ends_with(".hidden")));
    }

    #[test]
    fn scan_respects_max_depth() {
        let dir = tempfile::tempdir().expect("tmpdir");
        std::fs::create_dir_all(dir.path().join("a/b/c/d")).expect("mkdir");

        let config = NavigationConfig {
            max_depth: 2,
            ..NavigationConfig::default()
        };
        let engine = NavigationEngine::new(Arc::new(KnowledgeGraph::new()), config);
        let candidates = engine.complete_at("", dir.path(), T0, 50);
        let deepest = candidates
            .iter()
            .map(|c| c.absolute_path.components().count())
            .max()
            .unwrap();
        let base = dir.path().components().count();
        assert!(deepest <= base + 2);
    }

    #[test]
    fn best_match_redirects_to_existing_candidate() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let target = dir.path().join("projects");
        std::fs::create_dir(&target).expect("mkdir");

        let knowledge = Arc::new(KnowledgeGraph::new());
        knowledge.record_usage_at(
            "cd",
            &[target.display().to_string()],
            Path::new("/"),
            T0,
        );
        let engine = NavigationEngine::new(knowledge, NavigationConfig::default());

        // `proj` does not exist below cwd; the learned `projects` does.
        let best = engine.best_match("proj", dir.path());
        assert_eq!(best, Some(target));
    }

    #[test]
    fn best_match_leaves_existing_paths_alone() {
        let dir = tempfile::tempdir().expect("tmpdir");
        std::fs::create_dir(dir.path().join("real")).expect("mkdir");
        let engine = NavigationEngine::new(
            Arc::new(KnowledgeGraph::new()),
            NavigationConfig::default(),
        );
        assert_eq!(engine.best_match("real", dir.path()), None);
    }
}
