//! Path normalization for navigation-command arguments.
//!
//! Navigation commands (`cd`, `set-location`, `sl`, `chdir`) record their
//! argument as a single canonical absolute path so that `cd ~/proj`,
//! `cd ../proj` and `cd /home/u/proj` all land on the same knowledge-graph
//! key. Normalization is purely lexical (no filesystem access, no symlink
//! resolution) and idempotent.

use std::path::{Component, Path, PathBuf};

/// Commands whose arguments are directory paths and get normalized.
pub const NAVIGATION_COMMANDS: &[&str] = &["cd", "set-location", "sl", "chdir"];

/// True when `command` is a navigation command (case-insensitive).
pub fn is_navigation_command(command: &str) -> bool {
    NAVIGATION_COMMANDS
        .iter()
        .any(|c| c.eq_ignore_ascii_case(command))
}

/// Normalize `raw` into a canonical absolute path.
///
/// Steps, in order:
/// 1. Expand a leading `~` to the user's home directory.
/// 2. Join relative paths against `working_directory`.
/// 3. Collapse `.` and `..` components lexically.
/// 4. Strip any trailing separator.
///
/// `..` at the root stays at the root. Idempotent: normalizing an already
/// normalized path returns it unchanged.
pub fn normalize(raw: &str, working_directory: &Path) -> PathBuf {
    let expanded = expand_home(raw);
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        working_directory.join(expanded)
    };
    collapse(&absolute)
}

/// Expand a leading `~` or `~/` to the user's home directory.
///
/// A bare `~` becomes the home directory itself; `~user` forms are not
/// supported and pass through unchanged.
fn expand_home(raw: &str) -> PathBuf {
    if raw == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(raw));
    }
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        return dirs::home_dir()
            .map(|h| h.join(rest))
            .unwrap_or_else(|| PathBuf::from(raw));
    }
    PathBuf::from(raw)
}

/// Collapse `.` and `..` components without touching the filesystem.
fn collapse(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root prefix.
                if !out.pop() {
                    out.push(Component::RootDir);
                }
            }
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(Component::RootDir);
    }
    out
}

/// Depth of the common-ancestor walk between two absolute paths.
///
/// Counts the components that differ on both sides: `depth_delta(/a/b,
/// /a/c/d)` is 3 (up one from `b`, down two into `c/d`). Used by the
/// smart-navigation distance factor.
pub fn depth_delta(a: &Path, b: &Path) -> usize {
    let a_parts: Vec<_> = a.components().collect();
    let b_parts: Vec<_> = b.components().collect();
    let common = a_parts
        .iter()
        .zip(b_parts.iter())
        .take_while(|(x, y)| x == y)
        .count();
    (a_parts.len() - common) + (b_parts.len() - common)
}

/// Render `path` relative to `base` when it lives underneath it.
///
/// Falls back to the absolute form otherwise. Display helper for the
/// navigation engine.
pub fn relative_display(path: &Path, base: &Path) -> String {
    match path.strip_prefix(base) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.display().to_string(),
        Err(_) => path.display().to_string(),
    }
}
