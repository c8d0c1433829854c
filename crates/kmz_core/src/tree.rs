use serde::Serialize;

/// Name of the synthetic node at the top of every navigation tree.
pub const ROOT_NAME: &str = "Root";
/// Name given to linked documents whose NetworkLink has no usable `name`.
pub const UNNAMED_LINK: &str = "Unnamed Link";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Has children; clicking toggles their visibility.
    Folder,
    /// No children but a path; clicking zooms to the linked document.
    Leaf,
    /// Neither children nor path (an empty root).
    Empty,
}

/// One node of the navigation tree built from NetworkLink chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub name: String,
    /// Archive path of the linked document. Always set on linked nodes, only
    /// meaningful for interaction when the node is a leaf.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Synthetic root with no path and no children yet.
    pub fn root() -> Self {
        Self {
            name: ROOT_NAME.to_string(),
            path: None,
            children: Vec::new(),
        }
    }

    pub fn linked(name: impl Into<String>, path: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
            children,
        }
    }

    pub fn kind(&self) -> NodeKind {
        if !self.children.is_empty() {
            NodeKind::Folder
        } else if self.path.is_some() {
            NodeKind::Leaf
        } else {
            NodeKind::Empty
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.children.iter());
        }
        count
    }

    /// Pre-order walk yielding `(depth, node)` pairs, `self` at depth 0.
    pub fn walk(&self) -> Vec<(usize, &TreeNode)> {
        let mut out = Vec::with_capacity(self.node_count());
        let mut pending = vec![(0usize, self)];
        while let Some((depth, node)) = pending.pop() {
            out.push((depth, node));
            for child in node.children.iter().rev() {
                pending.push((depth + 1, child));
            }
        }
        out
    }
}
