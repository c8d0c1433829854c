use bytes::Bytes;
use kmz_core::{GeoBounds, ImageOverlay, MapView, Notice, TreeNode};
use kmz_logging::{kmz_debug, kmz_info};

use crate::archive::{ArchiveError, ArchiveReader, KmzArchive};
use crate::bounds::document_bounds;
use crate::decode::decode_text;
use crate::document::{DocumentError, ParsedDocument};
use crate::render::{LinkResolution, MapRenderer};
use crate::traversal::{load_document, TraversalReport, TraversalSettings};
use crate::tree_builder::TreeBuilder;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSettings {
    pub traversal: TraversalSettings,
    pub link_resolution: LinkResolution,
}

/// Everything a successful load produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub root_document: String,
    pub tree: TreeNode,
    pub overlays: Vec<ImageOverlay>,
    pub tree_report: TraversalReport,
    pub map_report: TraversalReport,
}

/// Failures that abort a whole load.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot open archive: {0}")]
    Archive(#[from] ArchiveError),
    #[error("no KML document in archive")]
    NoDocument,
    #[error("cannot parse {path}: {source}")]
    Document {
        path: String,
        #[source]
        source: DocumentError,
    },
    #[error("root document {0} could not be read")]
    Unreadable(String),
}

impl LoadError {
    /// The notice shown to the user for this failure.
    pub fn notice(&self) -> Notice {
        match self {
            LoadError::NoDocument => Notice::NoDocument,
            _ => Notice::LoadFailed,
        }
    }
}

/// Open an archive, build its navigation tree and collect its overlays.
pub async fn load_kmz(bytes: Bytes, settings: &LoadSettings) -> Result<LoadOutcome, LoadError> {
    let archive = KmzArchive::open(bytes)?;
    let root_path = archive
        .root_document()
        .ok_or(LoadError::NoDocument)?
        .to_string();
    kmz_info!("Loading root document {}", root_path);
    let root = read_root(&archive, &root_path).await?;

    let builder = TreeBuilder::new(&archive, settings.traversal);
    let renderer = MapRenderer::new(&archive, settings.traversal, settings.link_resolution);
    let mut map = MapView::default();
    let (built, map_report) = tokio::join!(
        builder.build(&root),
        renderer.render(&root, &mut map)
    );

    kmz_debug!(
        "Loaded {}: {} nodes, {} overlays, {} skipped links, {} skipped while rendering",
        root_path,
        built.root.node_count(),
        map.overlays().len(),
        built.report.skipped.len(),
        map_report.skipped.len()
    );

    Ok(LoadOutcome {
        root_document: root_path,
        tree: built.root,
        overlays: map.into_overlays(),
        tree_report: built.report,
        map_report,
    })
}

/// Bounds of the first LatLonBox in the document at `path`.
///
/// The archive is reopened from `bytes`. Anything short of a readable,
/// parseable document with a valid box yields `Ok(None)`.
pub async fn resolve_zoom(bytes: Bytes, path: &str) -> Result<Option<GeoBounds>, LoadError> {
    let archive = KmzArchive::open(bytes)?;
    match load_document(&archive, path).await {
        Ok(document) => Ok(document_bounds(&document)),
        Err(reason) => {
            kmz_debug!("No zoom target for {}: {}", path, reason);
            Ok(None)
        }
    }
}

async fn read_root(archive: &KmzArchive, path: &str) -> Result<ParsedDocument, LoadError> {
    let bytes = archive
        .read(path)
        .await?
        .ok_or_else(|| LoadError::Unreadable(path.to_string()))?;
    let decoded = decode_text(&bytes);
    ParsedDocument::parse(path, &decoded.text).map_err(|source| LoadError::Document {
        path: path.to_string(),
        source,
    })
}
