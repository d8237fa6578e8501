//! Tree structure rendering utilities for blend tree visualization

use console::Style;

/// Represents a node in a tree structure
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub name: String,
    pub node_type: NodeType,
    pub children: Vec<TreeNode>,
    pub metadata: Vec<(String, String)>,
}

/// Types of nodes in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Scene,
    Clip,
    Blend,
    Add,
    Switch,
    StateMachine,
    State,
    Edge,
    Exit,
    /// A node already being printed higher up the same branch
    Cycle,
}

/// Options for tree rendering
#[derive(Debug, Clone)]
pub struct TreeOptions {
    pub max_depth: Option<usize>,
    pub no_color: bool,
    pub show_metadata: bool,
    pub compact: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            no_color: false,
            show_metadata: true,
            compact: false,
        }
    }
}

impl TreeNode {
    /// Create a new tree node
    pub fn new(name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            name: name.into(),
            node_type,
            children: Vec::new(),
            metadata: Vec::new(),
        }
    }

    /// Add a child node
    pub fn add_child(mut self, child: TreeNode) -> Self {
        self.children.push(child);
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.push((key.to_string(), value.to_string()));
        self
    }
}

impl NodeType {
    /// Get icon for node type
    pub fn icon(self) -> &'static str {
        match self {
            NodeType::Scene => "📁",
            NodeType::Clip => "🎞️",
            NodeType::Blend => "🔀",
            NodeType::Add => "➕",
            NodeType::Switch => "🎚️",
            NodeType::StateMachine => "🧭",
            NodeType::State => "📍",
            NodeType::Edge => "↪",
            NodeType::Exit => "🚪",
            NodeType::Cycle => "🔁",
        }
    }

    /// Get color style for node type
    pub fn style(self, no_color: bool) -> Style {
        if no_color {
            Style::new()
        } else {
            match self {
                NodeType::Scene => Style::new().bold().cyan(),
                NodeType::Clip => Style::new().green(),
                NodeType::Blend | NodeType::Add => Style::new().blue(),
                NodeType::Switch => Style::new().magenta(),
                NodeType::StateMachine => Style::new().bold().yellow(),
                NodeType::State => Style::new().yellow(),
                NodeType::Edge => Style::new().dim(),
                NodeType::Exit => Style::new().cyan(),
                NodeType::Cycle => Style::new().red(),
            }
        }
    }
}

/// Render a tree structure to string
pub fn render_tree(root: &TreeNode, options: &TreeOptions) -> String {
    let mut output = String::new();
    render_node(root, &mut output, "", true, 0, options);
    output
}

/// Render a single node and its children
fn render_node(
    node: &TreeNode,
    output: &mut String,
    prefix: &str,
    is_last: bool,
    depth: usize,
    options: &TreeOptions,
) {
    if let Some(max_depth) = options.max_depth
        && depth > max_depth
    {
        return;
    }

    let icon = node.node_type.icon();
    let style = node.node_type.style(options.no_color);
    let connector = if depth == 0 {
        ""
    } else if is_last {
        "└── "
    } else {
        "├── "
    };

    let mut line = format!(
        "{}{}{} {}",
        prefix,
        connector,
        icon,
        style.apply_to(&node.name)
    );

    if options.show_metadata && options.compact && !node.metadata.is_empty() {
        let parts: Vec<String> = node
            .metadata
            .iter()
            .map(|(key, value)| format!("{key}:{value}"))
            .collect();
        line.push_str(&format!(" [{}]", parts.join(", ")));
    }

    output.push_str(&line);
    output.push('\n');

    let child_prefix = if depth == 0 {
        String::new()
    } else {
        format!("{}{}", prefix, if is_last { "    " } else { "│   " })
    };

    if options.show_metadata && !options.compact {
        let meta_style = if options.no_color {
            Style::new()
        } else {
            Style::new().dim()
        };
        for (key, value) in &node.metadata {
            output.push_str(&format!(
                "{}    · {}: {}\n",
                child_prefix,
                meta_style.apply_to(key),
                value
            ));
        }
    }

    for (i, child) in node.children.iter().enumerate() {
        let is_last_child = i == node.children.len() - 1;
        render_node(
            child,
            output,
            &child_prefix,
            is_last_child,
            depth + 1,
            options,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TreeNode {
        TreeNode::new("scene.yaml", NodeType::Scene)
            .with_metadata("nodes", 3)
            .add_child(
                TreeNode::new("locomotion", NodeType::StateMachine)
                    .with_metadata("states", 2)
                    .add_child(
                        TreeNode::new("idle", NodeType::State)
                            .add_child(TreeNode::new("idle_clip", NodeType::Clip)),
                    )
                    .add_child(TreeNode::new("walk", NodeType::State)),
            )
    }

    #[test]
    fn test_tree_rendering() {
        let options = TreeOptions {
            no_color: true,
            ..TreeOptions::default()
        };
        let output = render_tree(&sample(), &options);

        assert!(output.contains("scene.yaml"));
        assert!(output.contains("├── 📍 idle"));
        assert!(output.contains("│   └── 🎞️ idle_clip"));
        assert!(output.contains("└── 📍 walk"));
        assert!(output.contains("· states: 2"));
    }

    #[test]
    fn test_compact_and_depth() {
        let options = TreeOptions {
            no_color: true,
            compact: true,
            max_depth: Some(1),
            ..TreeOptions::default()
        };
        let output = render_tree(&sample(), &options);

        assert!(output.contains("locomotion [states:2]"));
        assert!(!output.contains("idle"));
    }
}
