#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Drop every layer placed for the previous file.
    ClearMap,
    /// Open the bytes of the chosen file and build tree and layers.
    LoadArchive { generation: crate::Generation },
    ShowOverlays { overlays: Vec<crate::ImageOverlay> },
    /// Re-open the archive and look up bounds for the document at `path`.
    ZoomToLeaf {
        generation: crate::Generation,
        path: String,
    },
    FitBounds { bounds: crate::GeoBounds },
}
