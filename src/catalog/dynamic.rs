//! Dynamic-argument probes.
//!
//! Some completions cannot live in the static catalogue: git branches,
//! running containers, npm scripts, directory listings. Each probe yields a
//! finite argument list on demand and runs under a per-call time budget —
//! a probe that blocks past its budget is abandoned and treated as empty,
//! so a hung `git` never stalls tab-completion.

use std::path::PathBuf;
use std::process::Command;
use std::sync::mpsc;
use std::time::Duration;

use tracing::{debug, trace};

use super::Argument;

/// Default per-probe time budget.
pub const DEFAULT_PROBE_BUDGET: Duration = Duration::from_millis(150);

/// Context handed to each probe invocation.
#[derive(Debug, Clone)]
pub struct ProbeContext {
    /// Directory the completion request originated from.
    pub working_directory: PathBuf,
    /// Budget after which the probe is abandoned.
    pub budget: Duration,
}

impl Default for ProbeContext {
    fn default() -> Self {
        Self {
            working_directory: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            budget: DEFAULT_PROBE_BUDGET,
        }
    }
}

impl ProbeContext {
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
            budget: DEFAULT_PROBE_BUDGET,
        }
    }
}

/// The fixed set of probes the catalogue can attach to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicSource {
    /// Local git branch names.
    GitBranches,
    /// Configured git remotes.
    GitRemotes,
    /// Names of running docker containers.
    DockerContainers,
    /// Locally available docker images (`repo:tag`).
    DockerImages,
    /// Script names from `package.json` in the working directory.
    NpmScripts,
    /// Immediate subdirectories of the working directory.
    Directories,
}

impl DynamicSource {
    /// Run the probe under the context's budget.
    ///
    /// Failures — missing binary, crashed probe, exceeded budget — all
    /// collapse to an empty list with a debug log; dynamic arguments are
    /// best-effort garnish on top of the static catalogue.
    pub fn produce(&self, ctx: &ProbeContext) -> Vec<Argument> {
        let source = *self;
        let cwd = ctx.working_directory.clone();
        run_bounded(ctx.budget, move || source.produce_unbounded(&cwd))
    }

    fn produce_unbounded(&self, cwd: &std::path::Path) -> Vec<Argument> {
        match self {
            DynamicSource::GitBranches => {
                run_tool(
                    cwd,
                    "git",
                    &["branch", "--list", "--format=%(refname:short)"],
                    "git branch",
                )
            }
            DynamicSource::GitRemotes => run_tool(cwd, "git", &["remote"], "git remote"),
            DynamicSource::DockerContainers => run_tool(
                cwd,
                "docker",
                &["ps", "--format", "{{.Names}}"],
                "running container",
            ),
            DynamicSource::DockerImages => run_tool(
                cwd,
                "docker",
                &["images", "--format", "{{.Repository}}:{{.Tag}}"],
                "local image",
            ),
            DynamicSource::NpmScripts => npm_scripts(cwd),
            DynamicSource::Directories => subdirectories(cwd),
        }
    }
}

/// Run `work` on a worker thread, abandoning it after `budget`.
fn run_bounded<F>(budget: Duration, work: F) -> Vec<Argument>
where
    F: FnOnce() -> Vec<Argument> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        // Receiver may be gone if the budget expired; ignore the send error.
        let _ = tx.send(work());
    });
    match rx.recv_timeout(budget) {
        Ok(args) => args,
        Err(_) => {
            debug!(budget_ms = budget.as_millis() as u64, "probe exceeded budget, abandoned");
            Vec::new()
        }
    }
}

/// Shell out to an external tool and map each stdout line to an argument.
fn run_tool(cwd: &std::path::Path, bin: &str, args: &[&str], tooltip: &str) -> Vec<Argument> {
    if which::which(bin).is_err() {
        trace!(bin, "probe binary not found in PATH");
        return Vec::new();
    }
    let output = match Command::new(bin).args(args).current_dir(cwd).output() {
        Ok(out) => out,
        Err(e) => {
            debug!(bin, error = %e, "probe failed to spawn");
            return Vec::new();
        }
    };
    if !output.status.success() {
        debug!(bin, status = ?output.status.code(), "probe exited nonzero");
        return Vec::new();
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| Argument::with_tooltip(l, tooltip))
        .collect()
}

/// Read script names from `package.json` without spawning npm.
fn npm_scripts(cwd: &std::path::Path) -> Vec<Argument> {
    let manifest = cwd.join("package.json");
    let Ok(content) = std::fs::read_to_string(&manifest) else {
        return Vec::new();
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&content) else {
        debug!(path = %manifest.display(), "unparseable package.json");
        return Vec::new();
    };
    let Some(scripts) = value.get("scripts").and_then(|s| s.as_object()) else {
        return Vec::new();
    };
    scripts
        .iter()
        .map(|(name, cmd)| {
            let tooltip = cmd.as_str().unwrap_or("npm script").to_string();
            Argument {
                text: name.clone(),
                tooltip: Some(tooltip),
            }
        })
        .collect()
}

/// Immediate subdirectories of `cwd`, hidden entries excluded.
fn subdirectories(cwd: &std::path::Path) -> Vec<Argument> {
    let Ok(entries) = std::fs::read_dir(cwd) else {
        return Vec::new();
    };
    let mut dirs: Vec<Argument> = entries
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                None
            } else {
                Some(Argument::with_tooltip(name, "directory"))
            }
        })
        .collect();
    dirs.sort_by(|a, b| a.text.cmp(&b.text));
    dirs
}
