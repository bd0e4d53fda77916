//! The completion catalogue — the immutable tree of known commands.
//!
//! Built once per process, never mutated afterwards. Nodes live in a
//! contiguous arena and reference each other by [`NodeId`] index, which
//! keeps walks cache-friendly and makes the whole structure trivially
//! shareable across threads without locks.
//!
//! Three things live in the tree:
//! - *command* nodes — have subcommands, parameters, and optionally a
//!   dynamic-argument probe;
//! - *parameter* nodes — flags with an optional short alias, static
//!   arguments, an optional probe, and a `requires_value` marker;
//! - *arguments* — plain literals with a tooltip, either stored statically
//!   on their owning node or produced on demand by a probe.
//!
//! Name and alias comparison is case-insensitive throughout.

pub mod builder;
pub mod builtins;
pub mod dynamic;

use std::collections::HashMap;

use dynamic::{DynamicSource, ProbeContext};
use tracing::debug;

/// Index of a node in the catalogue arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

/// What kind of node this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A command or subcommand.
    Command,
    /// A flag-style parameter. `requires_value` means the next token on the
    /// line is bound as this parameter's value.
    Parameter { requires_value: bool },
}

/// A completion argument: literal text plus an optional tooltip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub text: String,
    pub tooltip: Option<String>,
}

impl Argument {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tooltip: None,
        }
    }

    pub fn with_tooltip(text: impl Into<String>, tooltip: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tooltip: Some(tooltip.into()),
        }
    }
}

/// A single node in the catalogue arena.
#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    /// Primary name (`commit`, `--message`).
    pub name: String,
    /// Optional short alias (`co`, `-m`).
    pub alias: Option<String>,
    pub tooltip: Option<String>,
    pub(crate) parent: Option<NodeId>,
    /// Child subcommands, in catalogue order. Empty for parameters.
    pub(crate) subcommands: Vec<NodeId>,
    /// Parameters, in catalogue order. Empty for parameters.
    pub(crate) parameters: Vec<NodeId>,
    /// Static arguments (parameter values, fixed choices).
    pub(crate) arguments: Vec<Argument>,
    /// Probe producing arguments on demand (branches, directories, …).
    pub(crate) dynamic: Option<DynamicSource>,
}

impl Node {
    /// True when `word` equals the primary name (case-insensitive).
    fn name_matches(&self, word: &str) -> bool {
        self.name.eq_ignore_ascii_case(word)
    }

    /// True when `word` equals the alias (case-insensitive).
    fn alias_matches(&self, word: &str) -> bool {
        self.alias
            .as_deref()
            .is_some_and(|a| a.eq_ignore_ascii_case(word))
    }

    /// True when the primary name or alias starts with `prefix`.
    fn prefix_matches(&self, prefix: &str) -> bool {
        starts_with_ignore_case(&self.name, prefix)
            || self
                .alias
                .as_deref()
                .is_some_and(|a| starts_with_ignore_case(a, prefix))
    }

    /// A parameter that consumes nothing: no value, no own arguments.
    pub fn is_inert_parameter(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Parameter {
                requires_value: false
            }
        ) && self.arguments.is_empty()
            && self.dynamic.is_none()
    }

    /// True for `NodeKind::Parameter { requires_value: true }`.
    pub fn requires_value(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Parameter {
                requires_value: true
            }
        )
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Result of [`Catalog::find_child`].
#[derive(Debug, Clone, PartialEq)]
pub enum FoundChild {
    /// A subcommand or parameter node; `via_alias` records whether the
    /// match was on the alias rather than the primary name.
    Node { id: NodeId, via_alias: bool },
    /// A static or dynamic argument literal was matched. Arguments have no
    /// node to descend into; the walker consumes the token and stays put.
    Argument(String),
}

/// One candidate completion offered to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub text: String,
    pub tooltip: Option<String>,
}

impl Candidate {
    fn from_node(node: &Node) -> Self {
        Self {
            text: node.name.clone(),
            tooltip: node.tooltip.clone(),
        }
    }

    fn from_argument(arg: &Argument) -> Self {
        Self {
            text: arg.text.clone(),
            tooltip: arg.tooltip.clone(),
        }
    }
}

/// The immutable command catalogue.
pub struct Catalog {
    nodes: Vec<Node>,
    /// Root command lookup, keyed by lowercased name and alias.
    roots: HashMap<String, NodeId>,
}

impl Catalog {
    pub(crate) fn from_parts(nodes: Vec<Node>, roots: HashMap<String, NodeId>) -> Self {
        Self { nodes, roots }
    }

    /// The catalogue of built-in command trees.
    pub fn builtin() -> Self {
        builtins::build()
    }

    /// Borrow a node by id.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    /// Parent of a node, if any.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Names of all root commands, in catalogue order of registration.
    pub fn root_names(&self) -> Vec<&str> {
        let mut ids: Vec<&NodeId> = self.roots.values().collect();
        ids.sort_by_key(|id| id.0);
        ids.dedup();
        ids.iter().map(|id| self.node(**id).name.as_str()).collect()
    }

    /// Look up a root command by name or alias (case-insensitive).
    pub fn find_root(&self, name: &str) -> Option<NodeId> {
        self.roots.get(&name.to_ascii_lowercase()).copied()
    }

    /// Find the child of `id` that `word` names.
    ///
    /// Resolution order: subcommand or parameter by primary name, then by
    /// alias, then a matching static argument, then a dynamic argument
    /// (only when `include_dynamic`). Returns `None` when nothing matches.
    pub fn find_child(
        &self,
        id: NodeId,
        word: &str,
        include_dynamic: bool,
        ctx: &ProbeContext,
    ) -> Option<FoundChild> {
        let node = self.node(id);

        for child_id in node.subcommands.iter().chain(node.parameters.iter()) {
            if self.node(*child_id).name_matches(word) {
                return Some(FoundChild::Node {
                    id: *child_id,
                    via_alias: false,
                });
            }
        }
        for child_id in node.subcommands.iter().chain(node.parameters.iter()) {
            if self.node(*child_id).alias_matches(word) {
                return Some(FoundChild::Node {
                    id: *child_id,
                    via_alias: true,
                });
            }
        }
        if let Some(arg) = node
            .arguments
            .iter()
            .find(|a| a.text.eq_ignore_ascii_case(word))
        {
            return Some(FoundChild::Argument(arg.text.clone()));
        }
        if include_dynamic
            && let Some(source) = &node.dynamic
        {
            let produced = source.produce(ctx);
            if let Some(arg) = produced.iter().find(|a| a.text.eq_ignore_ascii_case(word)) {
                return Some(FoundChild::Argument(arg.text.clone()));
            }
        }
        None
    }

    /// All children of `id` matching `prefix`, in catalogue order:
    /// subcommands, then parameters, then static arguments, then dynamic
    /// arguments. Duplicate literals are dropped, first occurrence wins.
    ///
    /// An empty `prefix` matches everything.
    pub fn list_matching(
        &self,
        id: NodeId,
        prefix: &str,
        include_dynamic: bool,
        ctx: &ProbeContext,
    ) -> Vec<Candidate> {
        let node = self.node(id);
        let mut out: Vec<Candidate> = Vec::new();
        let mut seen: Vec<String> = Vec::new();

        let mut push = |candidate: Candidate| {
            let key = candidate.text.to_ascii_lowercase();
            if !seen.contains(&key) {
                seen.push(key);
                out.push(candidate);
            }
        };

        for child_id in &node.subcommands {
            let child = self.node(*child_id);
            if child.prefix_matches(prefix) {
                push(Candidate::from_node(child));
            }
        }
        for child_id in &node.parameters {
            let child = self.node(*child_id);
            if child.prefix_matches(prefix) {
                push(Candidate::from_node(child));
            }
        }
        for arg in &node.arguments {
            if starts_with_ignore_case(&arg.text, prefix) {
                push(Candidate::from_argument(arg));
            }
        }
        if include_dynamic
            && let Some(source) = &node.dynamic
        {
            let produced = source.produce(ctx);
            debug!(
                node = node.name.as_str(),
                count = produced.len(),
                "dynamic arguments produced"
            );
            for arg in produced {
                if starts_with_ignore_case(&arg.text, prefix) {
                    push(Candidate::from_argument(&arg));
                }
            }
        }
        out
    }

    /// Count of prefix matches for `word` at `id`, static children only.
    ///
    /// Used by the alias-descent rule: a last-token alias match only
    /// descends when it is the *sole* candidate.
    pub fn prefix_match_count(&self, id: NodeId, word: &str) -> usize {
        let node = self.node(id);
        node.subcommands
            .iter()
            .chain(node.parameters.iter())
            .filter(|child_id| self.node(**child_id).prefix_matches(word))
            .count()
            + node
                .arguments
                .iter()
                .filter(|a| starts_with_ignore_case(&a.text, word))
                .count()
    }
}
