//! Neutral-format export and import of learned data.
//!
//! A snapshot is a single JSON document capturing the knowledge graph and
//! the workflow learner. Import either replaces state wholesale or merges
//! additively using the same conflict rules as the store, which makes
//! repeated merges well-defined. A snapshot deliberately excludes command
//! history — it describes what was learned, not what was typed.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::CueError;
use crate::knowledge::{CommandKnowledge, KnowledgeGraph};
use crate::workflow::{TransitionRecord, WorkflowLearner};

/// Current snapshot document version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// How an import is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Overwrite existing state.
    Replace,
    /// Add counts into existing state.
    Merge,
}

/// The exported document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// Epoch milliseconds at export time.
    pub exported_at: i64,
    pub commands: Vec<CommandKnowledge>,
    pub transitions: Vec<TransitionRecord>,
}

impl Snapshot {
    /// Capture the current learned state.
    pub fn capture(knowledge: &KnowledgeGraph, workflow: &WorkflowLearner) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            exported_at: chrono::Utc::now().timestamp_millis(),
            commands: knowledge.snapshot(),
            transitions: workflow.snapshot(),
        }
    }

    /// Serialize to pretty JSON and write to `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), CueError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| CueError::ExportError {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| CueError::ExportError {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        info!(path = %path.display(), commands = self.commands.len(), "exported learned data");
        Ok(())
    }

    /// Parse a snapshot document from `path`.
    ///
    /// Parse failures leave all state untouched by construction — nothing
    /// is applied until a document parses completely.
    pub fn read_from(path: &Path) -> Result<Self, CueError> {
        let content = std::fs::read_to_string(path).map_err(|e| CueError::ImportError {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let snapshot: Snapshot =
            serde_json::from_str(&content).map_err(|e| CueError::ImportError {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(CueError::ImportError {
                path: path.to_path_buf(),
                detail: format!(
                    "snapshot version {} is newer than supported version {SNAPSHOT_VERSION}",
                    snapshot.version
                ),
            });
        }
        Ok(snapshot)
    }

    /// Apply this snapshot to the in-memory state.
    pub fn apply(self, knowledge: &KnowledgeGraph, workflow: &WorkflowLearner, mode: ImportMode) {
        match mode {
            ImportMode::Replace => {
                knowledge.replace(self.commands);
                workflow.replace(self.transitions);
            }
            ImportMode::Merge => {
                knowledge.merge(self.commands);
                workflow.merge(self.transitions);
            }
        }
    }
}
