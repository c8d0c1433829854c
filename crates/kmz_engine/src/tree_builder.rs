use kmz_core::{directory_of, TreeNode};

use crate::archive::ArchiveReader;
use crate::document::ParsedDocument;
use crate::kml::{network_links, NetworkLink};
use crate::traversal::{Ancestry, LinkOutcome, LinkWalker, TraversalReport, TraversalSettings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltTree {
    pub root: TreeNode,
    pub report: TraversalReport,
}

/// Builds the navigation tree by following NetworkLinks through the archive.
///
/// Links are resolved against the directory of the document that contains
/// them. The walk uses an explicit stack; a link back to a document on its
/// own chain is skipped instead of followed. A link to an entry that exists
/// but does not parse still becomes a leaf.
pub struct TreeBuilder<'a> {
    archive: &'a dyn ArchiveReader,
    settings: TraversalSettings,
}

struct Frame {
    document: String,
    links: std::vec::IntoIter<NetworkLink>,
    base: String,
    node: usize,
    ancestry: Ancestry,
}

impl Frame {
    fn open(document: &ParsedDocument, base: String, node: usize, ancestry: Ancestry) -> Self {
        Self {
            document: document.path().to_string(),
            links: network_links(document).into_iter(),
            base,
            node,
            ancestry,
        }
    }
}

struct ArenaNode {
    name: String,
    path: Option<String>,
    children: Vec<usize>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(archive: &'a dyn ArchiveReader, settings: TraversalSettings) -> Self {
        Self { archive, settings }
    }

    /// Build from a top-level document; its links resolve from the archive root.
    pub async fn build(&self, document: &ParsedDocument) -> BuiltTree {
        self.build_from(document, "").await
    }

    pub async fn build_from(&self, document: &ParsedDocument, parent_path: &str) -> BuiltTree {
        let mut walker = LinkWalker::new(self.archive, self.settings);
        let mut report = TraversalReport::default();
        let root = TreeNode::root();
        let mut arena = vec![ArenaNode {
            name: root.name,
            path: None,
            children: Vec::new(),
        }];
        let mut stack = vec![Frame::open(
            document,
            parent_path.to_string(),
            0,
            Ancestry::root(document.path()),
        )];

        while let Some(frame) = stack.last_mut() {
            let Some(link) = frame.links.next() else {
                stack.pop();
                continue;
            };
            let parent = frame.node;
            let base = frame.base.clone();
            let ancestry = frame.ancestry.clone();
            let origin = frame.document.clone();

            match walker.follow(&link, &base, &ancestry).await {
                LinkOutcome::Followed { path, document } => {
                    let node = arena.len();
                    arena.push(ArenaNode {
                        name: link.name,
                        path: Some(path.clone()),
                        children: Vec::new(),
                    });
                    arena[parent].children.push(node);
                    stack.push(Frame::open(
                        &document,
                        directory_of(&path).to_string(),
                        node,
                        ancestry.extend(&path),
                    ));
                }
                LinkOutcome::Broken { path, reason } => {
                    let node = arena.len();
                    arena.push(ArenaNode {
                        name: link.name,
                        path: Some(path),
                        children: Vec::new(),
                    });
                    arena[parent].children.push(node);
                    report.record(&origin, reason);
                }
                LinkOutcome::Skipped(reason) => report.record(&origin, reason),
            }
        }

        report.followed = walker.followed();
        BuiltTree {
            root: assemble(arena),
            report,
        }
    }
}

/// Turn the arena into owned nodes. Children always sit after their parent,
/// so a reverse pass sees every child before it is needed.
fn assemble(arena: Vec<ArenaNode>) -> TreeNode {
    let mut built: Vec<Option<TreeNode>> = Vec::with_capacity(arena.len());
    built.resize_with(arena.len(), || None);
    for (index, node) in arena.into_iter().enumerate().rev() {
        let children = node
            .children
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[index] = Some(TreeNode {
            name: node.name,
            path: node.path,
            children,
        });
    }
    built
        .into_iter()
        .next()
        .flatten()
        .unwrap_or_else(TreeNode::root)
}
