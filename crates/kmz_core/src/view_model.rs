use std::fmt;

use crate::{GeoBounds, Generation, LoadState, NodeId, NodeKind};

/// User-facing notice for a load that was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    NoDocument,
    LoadFailed,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NoDocument => write!(f, "No KML file found in the KMZ archive."),
            Notice::LoadFailed => write!(
                f,
                "Failed to process KMZ file. Please check the log for details."
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub generation: Generation,
    pub file_name: Option<String>,
    pub load: LoadState,
    /// Visible rows in display order.
    pub rows: Vec<TreeRowView>,
    pub node_count: usize,
    pub viewport: Option<GeoBounds>,
    pub notice: Option<Notice>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRowView {
    pub node_id: NodeId,
    pub depth: usize,
    pub name: String,
    pub kind: NodeKind,
    pub expanded: bool,
    pub path: Option<String>,
}
