//! Fluent construction API for catalogue command trees.
//!
//! Trees are described top-down with [`CommandBuilder`] / [`ParameterBuilder`]
//! and flattened into the arena by [`CatalogBuilder::build`]. Construction
//! happens once at startup; nothing here is on a hot path.

use std::collections::HashMap;

use super::dynamic::DynamicSource;
use super::{Argument, Catalog, Node, NodeId, NodeKind};

/// Start describing a command or subcommand.
pub fn command(name: impl Into<String>) -> CommandBuilder {
    CommandBuilder::new(name)
}

/// Start describing a parameter.
pub fn parameter(name: impl Into<String>) -> ParameterBuilder {
    ParameterBuilder::new(name)
}

/// Builder for a command node and its subtree.
pub struct CommandBuilder {
    name: String,
    alias: Option<String>,
    tooltip: Option<String>,
    subcommands: Vec<CommandBuilder>,
    parameters: Vec<ParameterBuilder>,
    arguments: Vec<Argument>,
    dynamic: Option<DynamicSource>,
}

impl CommandBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            tooltip: None,
            subcommands: Vec::new(),
            parameters: Vec::new(),
            arguments: Vec::new(),
            dynamic: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn subcommand(mut self, sub: CommandBuilder) -> Self {
        self.subcommands.push(sub);
        self
    }

    pub fn parameter(mut self, param: ParameterBuilder) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn argument(mut self, arg: Argument) -> Self {
        self.arguments.push(arg);
        self
    }

    pub fn dynamic(mut self, source: DynamicSource) -> Self {
        self.dynamic = Some(source);
        self
    }
}

/// Builder for a parameter node.
pub struct ParameterBuilder {
    name: String,
    alias: Option<String>,
    tooltip: Option<String>,
    requires_value: bool,
    arguments: Vec<Argument>,
    dynamic: Option<DynamicSource>,
}

impl ParameterBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            tooltip: None,
            requires_value: false,
            arguments: Vec::new(),
            dynamic: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    /// Mark this parameter as binding the next token as its value.
    pub fn requires_value(mut self) -> Self {
        self.requires_value = true;
        self
    }

    pub fn argument(mut self, arg: Argument) -> Self {
        self.arguments.push(arg);
        self
    }

    /// Static argument choices given as plain literals.
    pub fn choices<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments
            .extend(values.into_iter().map(|v| Argument::new(v)));
        self
    }

    pub fn dynamic(mut self, source: DynamicSource) -> Self {
        self.dynamic = Some(source);
        self
    }
}

/// Accumulates root commands and flattens them into a [`Catalog`].
#[derive(Default)]
pub struct CatalogBuilder {
    roots: Vec<CommandBuilder>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(mut self, root: CommandBuilder) -> Self {
        self.roots.push(root);
        self
    }

    /// Flatten all registered trees into the arena.
    pub fn build(self) -> Catalog {
        let mut nodes: Vec<Node> = Vec::new();
        let mut roots: HashMap<String, NodeId> = HashMap::new();

        for root in self.roots {
            let name_key = root.name.to_ascii_lowercase();
            let alias_key = root.alias.as_ref().map(|a| a.to_ascii_lowercase());
            let id = flatten_command(root, None, &mut nodes);
            roots.insert(name_key, id);
            if let Some(alias) = alias_key {
                roots.entry(alias).or_insert(id);
            }
        }

        Catalog::from_parts(nodes, roots)
    }
}

fn flatten_command(cmd: CommandBuilder, parent: Option<NodeId>, nodes: &mut Vec<Node>) -> NodeId {
    let id = NodeId(nodes.len() as u32);
    nodes.push(Node {
        kind: NodeKind::Command,
        name: cmd.name,
        alias: cmd.alias,
        tooltip: cmd.tooltip,
        parent,
        subcommands: Vec::new(),
        parameters: Vec::new(),
        arguments: cmd.arguments,
        dynamic: cmd.dynamic,
    });

    let subcommands: Vec<NodeId> = cmd
        .subcommands
        .into_iter()
        .map(|sub| flatten_command(sub, Some(id), nodes))
        .collect();
    let parameters: Vec<NodeId> = cmd
        .parameters
        .into_iter()
        .map(|param| flatten_parameter(param, id, nodes))
        .collect();

    let node = &mut nodes[id.0 as usize];
    node.subcommands = subcommands;
    node.parameters = parameters;
    id
}

fn flatten_parameter(param: ParameterBuilder, parent: NodeId, nodes: &mut Vec<Node>) -> NodeId {
    let id = NodeId(nodes.len() as u32);
    nodes.push(Node {
        kind: NodeKind::Parameter {
            requires_value: param.requires_value,
        },
        name: param.name,
        alias: param.alias,
        tooltip: param.tooltip,
        parent: Some(parent),
        subcommands: Vec::new(),
        parameters: Vec::new(),
        arguments: param.arguments,
        dynamic: param.dynamic,
    });
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_alias_resolves_to_same_node() {
        let cat = CatalogBuilder::new()
            .command(command("kubectl").alias("k"))
            .build();
        assert_eq!(cat.find_root("kubectl"), cat.find_root("k"));
    }

    #[test]
    fn parent_links_point_upward() {
        let cat = CatalogBuilder::new()
            .command(command("git").subcommand(command("commit").parameter(parameter("--all"))))
            .build();
        let git = cat.find_root("git").unwrap();
        let commit = cat.node(git).subcommands[0];
        let all = cat.node(commit).parameters[0];
        assert_eq!(cat.parent(commit), Some(git));
        assert_eq!(cat.parent(all), Some(commit));
        assert_eq!(cat.parent(git), None);
    }

    #[test]
    fn catalogue_order_is_registration_order() {
        let cat = CatalogBuilder::new()
            .command(
                command("tool")
                    .subcommand(command("zeta"))
                    .subcommand(command("alpha")),
            )
            .build();
        let root = cat.find_root("tool").unwrap();
        let names: Vec<&str> = cat
            .node(root)
            .subcommands
            .iter()
            .map(|id| cat.node(*id).name.as_str())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }
}
