#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User picked a new archive file.
    FileChosen { file_name: String },
    /// Engine finished the tree and the initial map layers for a load.
    ArchiveLoaded {
        generation: crate::Generation,
        tree: crate::TreeNode,
        overlays: Vec<crate::ImageOverlay>,
    },
    /// Engine aborted a load.
    LoadFailed {
        generation: crate::Generation,
        notice: crate::Notice,
    },
    /// User clicked a row in the tree.
    NodeClicked { node_id: crate::NodeId },
    /// Engine finished looking up bounds for a leaf.
    ZoomResolved {
        generation: crate::Generation,
        bounds: Option<crate::GeoBounds>,
    },
    /// Fallback for placeholder wiring.
    NoOp,
}
