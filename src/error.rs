//! Actionable typed errors for pscue.
//!
//! Each error variant includes enough context for the user to understand
//! what went wrong and what to do next. Internal propagation uses `anyhow`;
//! the public API exposes these `thiserror` types.
//!
//! Not everything that looks like a failure is one: an unknown command or a
//! timed-out dynamic probe produces an *empty candidate list*, never an
//! error. These variants cover the cases that must surface to a caller —
//! persistence faults, import problems, malformed management input.

use std::path::PathBuf;

/// Errors that pscue surfaces to the user.
///
/// Completion and prediction paths swallow their failures (log + empty
/// result); these errors come from the persistence layer and the
/// management surface, where silence would lose data or mislead.
#[derive(Debug, thiserror::Error)]
pub enum CueError {
    /// The store could not be opened or a statement failed.
    ///
    /// Transient for flushes (the delta buffer is retained and retried on
    /// the next timer tick); fatal for loads (the file is quarantined and
    /// the graph starts empty).
    #[error("Store error at {}: {detail}", path.display())]
    Store { path: PathBuf, detail: String },

    /// The store file was unreadable on load and has been set aside.
    #[error(
        "Store at {} was corrupt and has been moved to {}. Starting with empty learned data.",
        path.display(),
        quarantined.display()
    )]
    StoreCorrupt {
        path: PathBuf,
        quarantined: PathBuf,
    },

    /// An export document could not be written.
    #[error("Failed to export learned data to {}: {detail}", path.display())]
    ExportError { path: PathBuf, detail: String },

    /// An import document could not be parsed. State is untouched.
    #[error(
        "Failed to import {}: {detail}. No learned data was modified.",
        path.display()
    )]
    ImportError { path: PathBuf, detail: String },

    /// Management input that cannot be acted on (bad line, bad cursor).
    #[error("Malformed input: {detail}")]
    MalformedInput { detail: String },

    /// A named command has no learned data to show or clear.
    #[error("No learned data for '{command}'. Run 'pscue show' to list known commands.")]
    UnknownCommand { command: String },
}

impl CueError {
    /// Build a [`CueError::Store`] from a rusqlite error.
    pub fn store(path: &std::path::Path, err: rusqlite::Error) -> Self {
        CueError::Store {
            path: path.to_path_buf(),
            detail: err.to_string(),
        }
    }
}
