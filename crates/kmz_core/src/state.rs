use std::collections::BTreeSet;

use crate::view_model::{AppViewModel, Notice, TreeRowView};
use crate::{GeoBounds, NodeKind, TreeNode};

/// Load counter. Bumped on every file selection so completions for an
/// abandoned file can be recognized and dropped.
pub type Generation = u64;
/// Pre-order index of a node in the current tree.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Empty,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FlatNode {
    name: String,
    path: Option<String>,
    kind: NodeKind,
    depth: usize,
    parent: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    generation: Generation,
    file_name: Option<String>,
    load: LoadState,
    nodes: Vec<FlatNode>,
    expanded: BTreeSet<NodeId>,
    viewport: Option<GeoBounds>,
    notice: Option<Notice>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn load_state(&self) -> LoadState {
        self.load
    }

    /// First node whose linked document lives at `path`.
    pub fn node_for_path(&self, path: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.path.as_deref() == Some(path))
    }

    pub fn node_kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(id).map(|node| node.kind)
    }

    pub fn view(&self) -> AppViewModel {
        let rows = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(id, _)| self.is_visible(*id))
            .map(|(id, node)| TreeRowView {
                node_id: id,
                depth: node.depth,
                name: node.name.clone(),
                kind: node.kind,
                expanded: self.expanded.contains(&id),
                path: node.path.clone(),
            })
            .collect();

        AppViewModel {
            generation: self.generation,
            file_name: self.file_name.clone(),
            load: self.load,
            rows,
            node_count: self.nodes.len(),
            viewport: self.viewport,
            notice: self.notice,
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn begin_load(&mut self, file_name: String) -> Generation {
        self.generation += 1;
        self.file_name = Some(file_name);
        self.load = LoadState::Loading;
        self.nodes.clear();
        self.expanded.clear();
        self.viewport = None;
        self.notice = None;
        self.dirty = true;
        self.generation
    }

    pub(crate) fn is_current_load(&self, generation: Generation) -> bool {
        generation == self.generation && self.load == LoadState::Loading
    }

    pub(crate) fn apply_tree(&mut self, tree: &TreeNode) {
        let mut nodes: Vec<FlatNode> = Vec::with_capacity(tree.node_count());
        // Parent of the next node at each depth.
        let mut parents: Vec<NodeId> = Vec::new();
        for (depth, node) in tree.walk() {
            parents.truncate(depth);
            let id = nodes.len();
            nodes.push(FlatNode {
                name: node.name.clone(),
                path: node.path.clone(),
                kind: node.kind(),
                depth,
                parent: parents.last().copied(),
            });
            parents.push(id);
        }
        self.nodes = nodes;
        self.expanded.clear();
        self.load = LoadState::Ready;
        self.dirty = true;
    }

    pub(crate) fn apply_failure(&mut self, notice: Notice) {
        self.load = LoadState::Failed;
        self.notice = Some(notice);
        self.dirty = true;
    }

    pub(crate) fn node_target(&self, id: NodeId) -> Option<(NodeKind, Option<&str>)> {
        self.nodes
            .get(id)
            .map(|node| (node.kind, node.path.as_deref()))
    }

    pub(crate) fn toggle(&mut self, id: NodeId) {
        if !self.expanded.remove(&id) {
            self.expanded.insert(id);
        }
        self.dirty = true;
    }

    pub(crate) fn set_viewport(&mut self, bounds: GeoBounds) {
        self.viewport = Some(bounds);
        self.dirty = true;
    }

    fn is_visible(&self, id: NodeId) -> bool {
        let mut current = self.nodes[id].parent;
        while let Some(parent) = current {
            if !self.expanded.contains(&parent) {
                return false;
            }
            current = self.nodes[parent].parent;
        }
        true
    }
}
