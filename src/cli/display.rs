//! Render a node hierarchy as a text tree.

use colored::Colorize;
use termtree::Tree;
use tracing::instrument;

use crate::domain::Node;

/// Tree of node names below `node`; with `values`, each node's keys become leaves.
#[instrument(level = "debug", skip(node), fields(path = %node.path()))]
pub fn node_tree(node: &Node, values: bool) -> Tree<String> {
    let label = if node.is_root() {
        node.path().to_string()
    } else {
        node.name().to_string()
    };
    let mut tree = Tree::new(label.bold().to_string());

    if values {
        for key in node.keys() {
            if let Some(value) = node.get(&key) {
                tree.push(Tree::new(format!("{} = {value}", key.cyan())));
            }
        }
    }
    for child in &node.children() {
        tree.push(node_tree(child, values));
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Preferences;

    #[test]
    fn given_nested_nodes_when_rendering_then_children_are_indented() {
        colored::control::set_override(false);
        let prefs = Preferences::new();
        prefs.node("app.ui").unwrap().put("theme", "dark");
        prefs.node("net").unwrap();

        let rendered = node_tree(prefs.root(), true).to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "/");
        assert!(lines[1].ends_with("app"));
        assert!(lines[2].ends_with("ui"));
        assert!(lines[3].ends_with("theme = dark"));
        assert!(lines[4].ends_with("net"));
    }
}
