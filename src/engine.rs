//! The completion engine: parse a command line, walk the catalogue, emit
//! ordered candidates.
//!
//! The walk is the heart of tab-completion. It starts at the root command
//! node and consumes tokens left to right, descending into subcommands and
//! parameters as they match, until it either runs out of tokens (complete
//! from the node it reached) or hits an unmatched token (complete using
//! that token as the search term).

use std::sync::Arc;

use tracing::{debug, warn};

use crate::catalog::dynamic::ProbeContext;
use crate::catalog::{Candidate, Catalog, FoundChild, NodeId};

/// Where a walk ended up: the node to complete from and the term to filter
/// with.
#[derive(Debug)]
pub struct WalkResult {
    /// Node the completion request resolves against.
    pub node: NodeId,
    /// Filter term (empty means "everything at this node").
    pub search_term: String,
    /// The root command name as found on the line (lowercased, `.exe`
    /// stripped).
    pub command: String,
}

/// Stateless completion engine over an immutable catalogue.
pub struct CompletionEngine {
    catalog: Arc<Catalog>,
}

impl CompletionEngine {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Produce ordered completions for `line` with the cursor at its end.
    ///
    /// `word_to_complete` is the token under the cursor (possibly empty);
    /// `include_dynamic` gates external probes. Unknown commands yield an
    /// empty list — that is not an error.
    pub fn get_completions(
        &self,
        line: &str,
        word_to_complete: &str,
        include_dynamic: bool,
        ctx: &ProbeContext,
    ) -> Vec<Candidate> {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            return Vec::new();
        }

        // A bare known command with no trailing space completes to itself.
        if !trimmed.contains(char::is_whitespace) {
            return match self.catalog.find_root(strip_exe(trimmed)) {
                Some(id) => {
                    let node = self.catalog.node(id);
                    vec![Candidate {
                        text: node.name.clone(),
                        tooltip: node.tooltip.clone(),
                    }]
                }
                None => Vec::new(),
            };
        }

        let Some(walk) = self.walk(line, include_dynamic, ctx) else {
            return Vec::new();
        };

        // Cursor mid-token: the walker consumed the whole line but the
        // shell says a word is still being typed. Only applies when the
        // word is not itself the line's last token (trailing space) — a
        // consumed last token, e.g. a unique alias, must not re-filter
        // the node it descended into.
        let search = if walk.search_term.is_empty()
            && !word_to_complete.is_empty()
            && line.ends_with(char::is_whitespace)
        {
            word_to_complete
        } else {
            walk.search_term.as_str()
        };

        let mut candidates = self
            .catalog
            .list_matching(walk.node, search, include_dynamic, ctx);
        candidates.sort_by(|a, b| a.text.to_ascii_lowercase().cmp(&b.text.to_ascii_lowercase()));
        candidates
    }

    /// Walk the catalogue for `line`, returning the node and search term.
    ///
    /// Returns `None` when the command is unknown or the line is malformed.
    pub fn walk(&self, line: &str, include_dynamic: bool, ctx: &ProbeContext) -> Option<WalkResult> {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            return None;
        }

        let (command_raw, remainder) = match trimmed.find(char::is_whitespace) {
            Some(idx) => (&trimmed[..idx], &trimmed[idx..]),
            None => (trimmed, ""),
        };
        let command = strip_exe(command_raw).to_ascii_lowercase();

        let Some(root) = self.catalog.find_root(&command) else {
            debug!(command = command.as_str(), "unknown command, no completions");
            return None;
        };

        let ends_with_space = line.ends_with(char::is_whitespace);
        let tokens: Vec<&str> = remainder.split_whitespace().collect();

        let mut current = root;
        let mut search_term = String::new();

        let mut i = 0;
        while i < tokens.len() {
            let token = tokens[i];
            let is_last = i == tokens.len() - 1 && !ends_with_space;

            match self.catalog.find_child(current, token, include_dynamic, ctx) {
                None => {
                    if self.catalog.node(current).requires_value() && !is_last {
                        // The parameter binds this token as its value; hand
                        // control back to the owning command.
                        current = self
                            .catalog
                            .parent(current)
                            .expect("parameter always has a parent");
                        i += 1;
                        continue;
                    }
                    search_term = token.to_string();
                    break;
                }
                Some(FoundChild::Node { id, via_alias }) => {
                    if is_last
                        && via_alias
                        && self.catalog.prefix_match_count(current, token) > 1
                    {
                        // Alias also prefix-matches siblings; offer the
                        // prefix set instead of committing to the alias.
                        search_term = token.to_string();
                        break;
                    }
                    let found = self.catalog.node(id);
                    if found.is_inert_parameter() {
                        // Value-less flag: consume the token, keep the
                        // parent so sibling parameters stay suggestible.
                        i += 1;
                        continue;
                    }
                    current = id;
                    i += 1;
                }
                Some(FoundChild::Argument(_)) => {
                    if self.catalog.node(current).requires_value() {
                        // The argument satisfied the parameter's value.
                        current = self
                            .catalog
                            .parent(current)
                            .expect("parameter always has a parent");
                    }
                    i += 1;
                }
            }
        }

        Some(WalkResult {
            node: current,
            search_term,
            command,
        })
    }
}

/// Strip a trailing `.exe` (any case) from a command token.
fn strip_exe(command: &str) -> &str {
    if command.len() > 4 {
        let (stem, suffix) = command.split_at(command.len() - 4);
        if suffix.eq_ignore_ascii_case(".exe") {
            return stem;
        }
    }
    command
}

/// Validate a raw cursor position argument from the shell.
///
/// The shell passes the cursor as a separate argument; a negative or
/// unparseable value means the request is malformed and completion returns
/// nothing.
pub fn parse_cursor(raw: &str) -> Option<usize> {
    match raw.trim().parse::<i64>() {
        Ok(n) if n >= 0 => Some(n as usize),
        Ok(n) => {
            warn!(cursor = n, "negative cursor position");
            None
        }
        Err(_) => {
            warn!(cursor = raw, "unparseable cursor position");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn engine() -> CompletionEngine {
        CompletionEngine::new(Arc::new(Catalog::builtin()))
    }

    fn ctx() -> ProbeContext {
        ProbeContext::default()
    }

    fn texts(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn empty_line_yields_nothing() {
        let e = engine();
        assert!(e.get_completions("", "", false, &ctx()).is_empty());
        assert!(e.get_completions("   ", "", false, &ctx()).is_empty());
    }

    #[test]
    fn unknown_command_yields_nothing() {
        let e = engine();
        assert!(e.get_completions("frobnicate ", "", false, &ctx()).is_empty());
    }

    #[test]
    fn bare_known_command_returns_itself() {
        let e = engine();
        let out = e.get_completions("git", "git", false, &ctx());
        assert_eq!(texts(&out), vec!["git"]);
    }

    #[test]
    fn exe_suffix_is_stripped() {
        let e = engine();
        let out = e.get_completions("git.exe comm", "comm", false, &ctx());
        assert_eq!(texts(&out), vec!["commit"]);
    }

    #[test]
    fn subcommand_prefix_filters() {
        let e = engine();
        let out = e.get_completions("git ch", "ch", false, &ctx());
        assert_eq!(texts(&out), vec!["checkout"]);
    }

    #[test]
    fn trailing_space_lists_children() {
        let e = engine();
        let out = e.get_completions("git commit ", "", false, &ctx());
        let names = texts(&out);
        assert!(names.contains(&"--message"));
        assert!(names.contains(&"--amend"));
    }

    #[test]
    fn inert_parameter_keeps_siblings_suggestible() {
        let e = engine();
        let out = e.get_completions("git commit --all ", "", false, &ctx());
        let names = texts(&out);
        assert!(names.contains(&"--message"), "expected siblings of --all: {names:?}");
        assert!(names.contains(&"--amend"));
    }

    #[test]
    fn value_parameter_binds_next_token_and_returns_to_command() {
        let e = engine();
        let out = e.get_completions("git commit --message fix-typo --a", "--a", false, &ctx());
        let names = texts(&out);
        assert!(names.contains(&"--all"), "got {names:?}");
        assert!(names.contains(&"--amend"));
    }

    #[test]
    fn value_parameter_with_choices_completes_them() {
        let e = engine();
        let out = e.get_completions("kubectl get --output ", "", false, &ctx());
        assert_eq!(texts(&out), vec!["json", "wide", "yaml"]);
    }

    #[test]
    fn ambiguous_alias_stays_at_parent() {
        let e = engine();
        // `s` is the alias of `gt submit` but also prefixes `sync`.
        let out = e.get_completions("gt s", "s", false, &ctx());
        let names = texts(&out);
        assert!(names.contains(&"submit"));
        assert!(names.contains(&"sync"));
    }

    #[test]
    fn unique_alias_descends() {
        let e = engine();
        // `sp` uniquely names `wt spawn`; completion happens inside it.
        let out = e.get_completions("wt sp", "sp", false, &ctx());
        let names = texts(&out);
        assert!(names.contains(&"--branch"), "got {names:?}");
        assert!(names.contains(&"--path"));
    }

    #[test]
    fn results_are_alphabetical() {
        let e = engine();
        let out = e.get_completions("gt s", "s", false, &ctx());
        let names = texts(&out);
        let mut sorted = names.clone();
        sorted.sort_by_key(|s| s.to_ascii_lowercase());
        assert_eq!(names, sorted);
    }

    #[test]
    fn mid_token_falls_back_to_word_to_complete() {
        let e = engine();
        // Walk consumes everything; the shell still reports a word in
        // progress.
        let out = e.get_completions("git commit ", "--am", false, &ctx());
        assert_eq!(texts(&out), vec!["--amend"]);
    }

    #[test]
    fn walk_reports_command_name() {
        let e = engine();
        let walk = e.walk("git commit ", false, &ctx()).unwrap();
        assert_eq!(walk.command, "git");
        assert!(walk.search_term.is_empty());
    }

    #[test]
    fn cursor_parsing_rejects_garbage() {
        assert_eq!(parse_cursor("12"), Some(12));
        assert_eq!(parse_cursor(" 0 "), Some(0));
        assert_eq!(parse_cursor("-3"), None);
        assert_eq!(parse_cursor("abc"), None);
    }

    #[test]
    fn strip_exe_variants() {
        assert_eq!(strip_exe("git.exe"), "git");
        assert_eq!(strip_exe("git.EXE"), "git");
        assert_eq!(strip_exe("git"), "git");
        assert_eq!(strip_exe(".exe"), ".exe");
    }
}
