//! The long-lived learning host.
//!
//! Owns the catalogue, the knowledge graph, the history ring, the workflow
//! learner, the predictor, and the persistence plumbing. The shell's
//! feedback receiver, the prediction subsystem, and the management surface
//! all talk to this one object; it is safe to share behind an `Arc` across
//! threads.
//!
//! Learned changes go to memory immediately and into a delta buffer; a
//! background timer (or an explicit save, or shutdown) flushes the buffer
//! to the store. A failed flush keeps the delta for the next tick.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::cache::CompletionCache;
use crate::catalog::dynamic::ProbeContext;
use crate::catalog::{Candidate, Catalog};
use crate::config::CueConfig;
use crate::engine::CompletionEngine;
use crate::error::CueError;
use crate::history::CommandHistory;
use crate::knowledge::KnowledgeGraph;
use crate::navigation::NavigationEngine;
use crate::predictor::{Prediction, Predictor};
use crate::snapshot::{ImportMode, Snapshot};
use crate::store::{Delta, Store, TransitionEvent, UsageEvent};
use crate::workflow::{self, RankedTransition, WorkflowLearner};

/// Default interval between automatic flushes.
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Diagnostics summary surfaced by the management `status` operation.
#[derive(Debug, Serialize)]
pub struct ModuleStatus {
    pub command_count: usize,
    pub history_len: usize,
    pub transition_count: usize,
    pub pending_delta: usize,
    pub store_path: Option<PathBuf>,
    pub quarantined_store: Option<PathBuf>,
    pub last_save_at: Option<i64>,
    pub learning_disabled: bool,
    pub debug_logging: bool,
    pub catalog_nodes: usize,
}

struct Autosave {
    stop_tx: mpsc::Sender<()>,
    join: Option<JoinHandle<()>>,
}

/// The host. One per process; cheap to share via `Arc`.
pub struct LearningHost {
    config: CueConfig,
    engine: Arc<CompletionEngine>,
    knowledge: Arc<KnowledgeGraph>,
    history: Arc<CommandHistory>,
    workflow: Arc<WorkflowLearner>,
    predictor: Predictor,
    navigation: NavigationEngine,
    cache: Arc<CompletionCache>,
    store: Option<Arc<Store>>,
    quarantined: Option<PathBuf>,
    delta: Arc<Mutex<Delta>>,
    last_save_at: Mutex<Option<i64>>,
    autosave: Mutex<Option<Autosave>>,
}

impl LearningHost {
    /// Initialize with the default store path and auto-save interval.
    pub fn init(config: CueConfig) -> Self {
        Self::with_options(config, &Store::default_path(), Some(DEFAULT_AUTOSAVE_INTERVAL))
    }

    /// Initialize against an explicit store path; `autosave` of `None`
    /// disables the background timer (saves still happen on shutdown and
    /// on explicit request).
    pub fn with_options(
        config: CueConfig,
        store_path: &Path,
        autosave: Option<Duration>,
    ) -> Self {
        let catalog = Arc::new(Catalog::builtin());
        let engine = Arc::new(CompletionEngine::new(Arc::clone(&catalog)));
        let knowledge = Arc::new(KnowledgeGraph::new());
        let history = Arc::new(CommandHistory::with_capacity(
            config.effective_history_size(),
        ));
        let workflow = Arc::new(WorkflowLearner::default());

        let (store, quarantined) = match Store::open_with_recovery(store_path) {
            Ok((store, quarantined)) => (Some(Arc::new(store)), quarantined),
            Err(e) => {
                // Memory-only operation; completion still works, learning
                // just won't survive the session.
                error!(error = %e, "store unavailable, running without persistence");
                (None, None)
            }
        };

        if let Some(store) = &store {
            match store.load() {
                Ok(snapshot) => {
                    debug!(
                        commands = snapshot.commands.len(),
                        history = snapshot.history.len(),
                        transitions = snapshot.transitions.len(),
                        "loaded learned data"
                    );
                    knowledge.replace(snapshot.commands);
                    workflow.replace(snapshot.transitions);
                    let capacity = history.capacity();
                    let skip = snapshot.history.len().saturating_sub(capacity);
                    for entry in snapshot.history.into_iter().skip(skip) {
                        history.append(
                            &entry.command_line,
                            &entry.command,
                            entry.arguments,
                            entry.timestamp,
                            &entry.working_directory,
                            entry.success,
                        );
                    }
                }
                Err(e) => warn!(error = %e, "failed to load store, starting empty"),
            }
        }

        let predictor = Predictor::new(
            Arc::clone(&engine),
            Arc::clone(&knowledge),
            Arc::clone(&workflow),
            Arc::clone(&history),
        );
        let navigation = NavigationEngine::new(Arc::clone(&knowledge), config.navigation.clone());

        let host = Self {
            config,
            engine,
            knowledge,
            history,
            workflow,
            predictor,
            navigation,
            cache: Arc::new(CompletionCache::default()),
            store,
            quarantined,
            delta: Arc::new(Mutex::new(Delta::default())),
            last_save_at: Mutex::new(None),
            autosave: Mutex::new(None),
        };

        if let (Some(interval), Some(store)) = (autosave, host.store.clone()) {
            host.start_autosave(interval, store);
        }
        host
    }

    fn start_autosave(&self, interval: Duration, store: Arc<Store>) {
        let delta = Arc::clone(&self.delta);
        let cache = Arc::clone(&self.cache);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let join = std::thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(interval) {
                    Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        if let Err(e) = flush_delta(&store, &delta) {
                            // Delta is retained; the next tick retries.
                            warn!(error = %e, "auto-save failed, will retry");
                        }
                        let evicted = cache.evict_expired();
                        if evicted > 0 {
                            debug!(evicted, "swept expired completion cache entries");
                        }
                    }
                }
            }
        });
        *self.autosave.lock().expect("autosave lock poisoned") = Some(Autosave {
            stop_tx,
            join: Some(join),
        });
    }

    // -----------------------------------------------------------------------
    // Completion and prediction
    // -----------------------------------------------------------------------

    /// Tab-completion through the engine, memoized in the TTL cache.
    pub fn complete(
        &self,
        line: &str,
        word_to_complete: &str,
        include_dynamic: bool,
        ctx: &ProbeContext,
    ) -> Vec<Candidate> {
        let command = line.split_whitespace().next().unwrap_or("");
        // The word matters independently of the line (cursor-mid-token
        // requests share a line prefix but not a word).
        let key =
            CompletionCache::fingerprint(command, &format!("{line}\u{1f}{word_to_complete}"));
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }
        let results = self
            .engine
            .get_completions(line, word_to_complete, include_dynamic, ctx);
        self.cache.put(key, results.clone());
        results
    }

    /// Inline prediction for a partial line.
    pub fn predict(&self, partial_line: &str, ctx: &ProbeContext) -> Option<Prediction> {
        self.predictor.predict(partial_line, ctx)
    }

    /// Smart-navigation completion for directory-change commands.
    pub fn navigate(&self, word: &str, current_dir: &Path) -> Vec<crate::navigation::NavigationCandidate> {
        self.navigation.complete(word, current_dir)
    }

    /// Best-match directory for a path that does not exist as typed.
    pub fn navigate_best_match(&self, word: &str, current_dir: &Path) -> Option<PathBuf> {
        self.navigation.best_match(word, current_dir)
    }

    // -----------------------------------------------------------------------
    // Feedback
    // -----------------------------------------------------------------------

    /// Record an executed command.
    ///
    /// Called by the shell after every command with its success flag.
    /// History records everything; the knowledge graph and workflow
    /// learner only learn from successes. Honors `PSCUE_DISABLE_LEARNING`
    /// and the ignore patterns.
    pub fn record_feedback(&self, command_line: &str, success: bool, working_directory: &Path) {
        self.record_feedback_at(
            command_line,
            success,
            working_directory,
            chrono::Utc::now().timestamp_millis(),
        )
    }

    /// [`Self::record_feedback`] with an explicit timestamp.
    pub fn record_feedback_at(
        &self,
        command_line: &str,
        success: bool,
        working_directory: &Path,
        now: i64,
    ) {
        if self.config.disable_learning {
            return;
        }
        let trimmed = command_line.trim();
        if trimmed.is_empty() {
            return;
        }
        if self.config.is_ignored(trimmed) {
            debug!(command_line = trimmed, "ignored by pattern, not learning");
            return;
        }

        let mut tokens = trimmed.split_whitespace();
        let Some(command) = tokens.next() else {
            return;
        };
        let arguments: Vec<String> = tokens.map(str::to_string).collect();
        let key = workflow::derive_key(command, &arguments);

        let previous = self.history.last();
        let entry = self.history.append(
            trimmed,
            command,
            arguments.clone(),
            now,
            &working_directory.display().to_string(),
            success,
        );

        let mut delta = Delta::default();
        delta.history.push(entry);

        if success {
            // For a two-token key the subcommand is part of the key, not
            // an argument of it.
            let knowledge_args: Vec<String> = if key.contains(' ') {
                let sub = key.split_whitespace().nth(1).unwrap_or("");
                let mut skipped_sub = false;
                arguments
                    .iter()
                    .filter(|a| {
                        if !skipped_sub && a.eq_ignore_ascii_case(sub) {
                            skipped_sub = true;
                            false
                        } else {
                            true
                        }
                    })
                    .cloned()
                    .collect()
            } else {
                arguments.clone()
            };

            let recorded =
                self.knowledge
                    .record_usage_at(&key, &knowledge_args, working_directory, now);
            delta.usage.push(UsageEvent {
                command_key: key.clone(),
                arguments: recorded
                    .into_iter()
                    .map(|literal| {
                        let is_flag = literal.starts_with('-');
                        (literal, is_flag)
                    })
                    .collect(),
                timestamp: now,
            });

            if let Some(prev) = previous.filter(|p| p.success) {
                let prev_key = workflow::derive_key(&prev.command, &prev.arguments);
                if let Some(delta_ms) =
                    self.workflow.observe(&prev_key, prev.timestamp, &key, now)
                {
                    delta.transitions.push(TransitionEvent {
                        from_key: prev_key,
                        to_key: key,
                        delta_ms,
                        timestamp: now,
                    });
                }
            }
        }

        let mut pending = self.delta.lock().expect("delta lock poisoned");
        pending.usage.extend(delta.usage);
        pending.history.extend(delta.history);
        pending.transitions.extend(delta.transitions);
    }

    // -----------------------------------------------------------------------
    // Management surface
    // -----------------------------------------------------------------------

    /// Flush the delta buffer now.
    pub fn save(&self) -> Result<usize, CueError> {
        let Some(store) = &self.store else {
            return Ok(0);
        };
        let flushed = flush_delta(store, &self.delta)?;
        *self.last_save_at.lock().expect("save lock poisoned") =
            Some(chrono::Utc::now().timestamp_millis());
        Ok(flushed)
    }

    /// Export learned data to a JSON document.
    pub fn export(&self, path: &Path) -> Result<(), CueError> {
        Snapshot::capture(&self.knowledge, &self.workflow).write_to(path)
    }

    /// Import a JSON document, replacing or merging.
    ///
    /// On success the store is rewritten to match memory, so a crash right
    /// after an import cannot resurrect pre-import counts.
    pub fn import(&self, path: &Path, mode: ImportMode) -> Result<(), CueError> {
        let snapshot = Snapshot::read_from(path)?;
        snapshot.apply(&self.knowledge, &self.workflow, mode);
        if let Some(store) = &self.store {
            store.replace_all(&self.knowledge.snapshot(), &self.workflow.snapshot())?;
        }
        info!(path = %path.display(), ?mode, "imported learned data");
        Ok(())
    }

    /// Clear learned knowledge (one command or all) and/or workflows.
    pub fn clear(&self, command_key: Option<&str>, workflows: bool) -> Result<(), CueError> {
        if workflows {
            self.workflow.clear();
            if let Some(store) = &self.store {
                store.clear_transitions()?;
            }
        } else {
            self.knowledge.clear(command_key);
            if let Some(store) = &self.store {
                store.clear_knowledge(command_key)?;
            }
        }
        self.cache.clear();
        Ok(())
    }

    /// Learned knowledge for one command.
    pub fn show(&self, command_key: &str) -> Result<crate::knowledge::CommandKnowledge, CueError> {
        self.knowledge
            .get_command_knowledge(command_key)
            .ok_or_else(|| CueError::UnknownCommand {
                command: command_key.to_string(),
            })
    }

    /// All command-keys with learned data.
    pub fn known_commands(&self) -> Vec<String> {
        self.knowledge.command_keys()
    }

    /// All workflow transitions, ranked per from-key.
    pub fn workflows(&self) -> Vec<RankedTransition> {
        let mut all: Vec<RankedTransition> = Vec::new();
        let records = self.workflow.snapshot();
        let mut seen_from: Vec<String> = Vec::new();
        for record in records {
            if !seen_from.contains(&record.from_key) {
                seen_from.push(record.from_key.clone());
                all.extend(self.workflow.next_commands(&record.from_key));
            }
        }
        all
    }

    /// Persisted history, newest first.
    pub fn persisted_history(&self, limit: usize) -> Result<Vec<crate::history::HistoryEntry>, CueError> {
        match &self.store {
            Some(store) => store.recent_history(limit),
            None => Ok(self.history.get_recent(limit)),
        }
    }

    /// Diagnostics summary.
    pub fn status(&self) -> ModuleStatus {
        ModuleStatus {
            command_count: self.knowledge.len(),
            history_len: self.history.len(),
            transition_count: self.workflow.len(),
            pending_delta: self.delta.lock().expect("delta lock poisoned").len(),
            store_path: self.store.as_ref().map(|s| s.path().to_path_buf()),
            quarantined_store: self.quarantined.clone(),
            last_save_at: *self.last_save_at.lock().expect("save lock poisoned"),
            learning_disabled: self.config.disable_learning,
            debug_logging: self.config.debug,
            catalog_nodes: self.engine.catalog().len(),
        }
    }

    /// Direct access for read-mostly collaborators (tests, binaries).
    pub fn knowledge(&self) -> &KnowledgeGraph {
        &self.knowledge
    }

    pub fn engine(&self) -> &CompletionEngine {
        &self.engine
    }

    pub fn workflow(&self) -> &WorkflowLearner {
        &self.workflow
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }
}

impl Drop for LearningHost {
    fn drop(&mut self) {
        if let Some(autosave) = self.autosave.lock().expect("autosave lock poisoned").take() {
            let _ = autosave.stop_tx.send(());
            if let Some(join) = autosave.join {
                let _ = join.join();
            }
        }
        if let Some(store) = &self.store
            && let Err(e) = flush_delta(store, &self.delta)
        {
            error!(error = %e, "final flush on shutdown failed");
        }
    }
}

/// Take the current delta and flush it; on failure, put it back in front.
fn flush_delta(store: &Store, delta: &Mutex<Delta>) -> Result<usize, CueError> {
    let taken = std::mem::take(&mut *delta.lock().expect("delta lock poisoned"));
    if taken.is_empty() {
        return Ok(0);
    }
    let count = taken.len();
    match store.flush(&taken) {
        Ok(()) => Ok(count),
        Err(e) => {
            let mut pending = delta.lock().expect("delta lock poisoned");
            let newer = std::mem::take(&mut *pending);
            let mut restored = taken;
            restored.usage.extend(newer.usage);
            restored.history.extend(newer.history);
            restored.transitions.extend(newer.transitions);
            *pending = restored;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    fn host_in(dir: &tempfile::TempDir) -> LearningHost {
        LearningHost::with_options(
            CueConfig::default(),
            &dir.path().join("learned-data.db"),
            None,
        )
    }

    #[test]
    fn feedback_updates_graph_history_and_workflow() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let host = host_in(&dir);
        let cwd = Path::new("/home/u");

        host.record_feedback_at("git add .", true, cwd, T0);
        host.record_feedback_at("git commit -m fix", true, cwd, T0 + 10_000);

        let k = host.knowledge().get_command_knowledge("git commit").unwrap();
        assert_eq!(k.total_usage, 1);
        assert!(k.arguments.contains_key("-m"));
        // The subcommand itself is the key, not an argument.
        assert!(!k.arguments.contains_key("commit"));

        assert_eq!(host.history.len(), 2);
        let transitions = host.workflow.next_commands_at("git add", T0 + 10_000);
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].to_key, "git commit");
        assert_eq!(transitions[0].mean_delta_ms, 10_000);
    }

    #[test]
    fn transition_window_cuts_off_long_gaps() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let host = host_in(&dir);
        let cwd = Path::new("/home/u");
        let two_hours = 2 * 60 * 60 * 1000;

        host.record_feedback_at("git add x", true, cwd, T0);
        host.record_feedback_at("git commit -m m", true, cwd, T0 + 10_000);
        host.record_feedback_at("git push", true, cwd, T0 + 10_000 + two_hours);

        assert_eq!(
            host.workflow.next_commands_at("git add", T0)[0].frequency,
            1
        );
        assert!(host.workflow.next_commands_at("git commit", T0).is_empty());
    }

    #[test]
    fn failed_commands_reach_history_but_not_knowledge() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let host = host_in(&dir);
        host.record_feedback_at("git push --force", false, Path::new("/home/u"), T0);

        assert_eq!(host.history.len(), 1);
        assert!(!host.history.last().unwrap().success);
        assert!(host.knowledge().get_command_knowledge("git push").is_none());
    }

    #[test]
    fn disabled_learning_is_a_noop() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let config = CueConfig {
            disable_learning: true,
            ..CueConfig::default()
        };
        let host = LearningHost::with_options(config, &dir.path().join("db"), None);
        host.record_feedback_at("git status", true, Path::new("/"), T0);

        assert_eq!(host.history.len(), 0);
        assert!(host.knowledge().is_empty());
    }

    #[test]
    fn ignore_patterns_skip_matching_commands() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let config = CueConfig {
            ignore_patterns: vec![glob::Pattern::new("vault*").unwrap()],
            ..CueConfig::default()
        };
        let host = LearningHost::with_options(config, &dir.path().join("db"), None);
        host.record_feedback_at("vault login -token=s.abc", true, Path::new("/"), T0);
        host.record_feedback_at("git status", true, Path::new("/"), T0);

        assert_eq!(host.history.len(), 1);
        assert!(host.knowledge().get_command_knowledge("vault login").is_none());
    }

    #[test]
    fn save_then_reload_roundtrips_state() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let path = dir.path().join("learned-data.db");
        {
            let host =
                LearningHost::with_options(CueConfig::default(), &path, None);
            host.record_feedback_at("git add .", true, Path::new("/home/u"), T0);
            host.record_feedback_at("git commit -m x", true, Path::new("/home/u"), T0 + 5000);
            host.save().expect("save");
        }

        let reloaded = LearningHost::with_options(CueConfig::default(), &path, None);
        assert!(
            reloaded
                .knowledge()
                .get_command_knowledge("git commit")
                .is_some()
        );
        assert_eq!(reloaded.history.len(), 2);
        assert_eq!(
            reloaded.workflow.next_commands_at("git add", T0 + 5000)[0].to_key,
            "git commit"
        );
    }

    #[test]
    fn shutdown_flushes_without_explicit_save() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let path = dir.path().join("learned-data.db");
        {
            let host =
                LearningHost::with_options(CueConfig::default(), &path, None);
            host.record_feedback_at("npm install", true, Path::new("/home/u"), T0);
            // Dropped without save(); Drop flushes.
        }

        let reloaded = LearningHost::with_options(CueConfig::default(), &path, None);
        assert!(
            reloaded
                .knowledge()
                .get_command_knowledge("npm install")
                .is_some()
        );
    }

    #[test]
    fn save_drains_the_delta_buffer() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let host = host_in(&dir);
        host.record_feedback_at("git status", true, Path::new("/"), T0);
        assert!(host.status().pending_delta > 0);

        let flushed = host.save().expect("save");
        assert!(flushed > 0);
        assert_eq!(host.status().pending_delta, 0);
        // Nothing new: saving again is a no-op.
        assert_eq!(host.save().expect("save"), 0);
    }

    #[test]
    fn import_merge_after_export_doubles_counts() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let host = host_in(&dir);
        host.record_feedback_at("git commit --amend", true, Path::new("/"), T0);

        let export_path = dir.path().join("export.json");
        host.export(&export_path).expect("export");
        host.import(&export_path, ImportMode::Merge).expect("import");

        let k = host.knowledge().get_command_knowledge("git commit").unwrap();
        assert_eq!(k.total_usage, 2);
        assert_eq!(k.arguments["--amend"].usage_count, 2);
    }

    #[test]
    fn clear_scoped_by_command_and_workflows() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let host = host_in(&dir);
        host.record_feedback_at("git add .", true, Path::new("/"), T0);
        host.record_feedback_at("git commit -m x", true, Path::new("/"), T0 + 1000);

        host.clear(Some("git add"), false).expect("clear one");
        assert!(host.knowledge().get_command_knowledge("git add").is_none());
        assert!(host.knowledge().get_command_knowledge("git commit").is_some());

        host.clear(None, true).expect("clear workflows");
        assert!(host.workflow.is_empty());
    }

    #[test]
    fn status_reflects_module_state() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let host = host_in(&dir);
        host.record_feedback_at("git status", true, Path::new("/"), T0);

        let status = host.status();
        assert_eq!(status.command_count, 1);
        assert_eq!(status.history_len, 1);
        assert!(status.store_path.is_some());
        assert!(status.quarantined_store.is_none());
        assert!(!status.learning_disabled);
        assert!(status.catalog_nodes > 0);
    }

    #[test]
    fn history_capacity_follows_config() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let config = CueConfig {
            history_size: Some(2),
            ..CueConfig::default()
        };
        let host = LearningHost::with_options(config, &dir.path().join("db"), None);
        for i in 0..5 {
            host.record_feedback_at(&format!("echo {i}"), true, Path::new("/"), T0 + i);
        }
        assert_eq!(host.history.len(), 2);
    }
}
