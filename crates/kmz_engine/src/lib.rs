//! KMZ viewer engine: archive access, document traversal, rendering and the
//! upload endpoint.
mod archive;
mod bounds;
mod decode;
mod document;
mod engine;
mod filename;
mod kml;
mod loader;
mod persist;
mod render;
mod traversal;
mod tree_builder;
mod types;
mod upload;

pub use archive::{ArchiveEntry, ArchiveError, ArchiveReader, KmzArchive};
pub use bounds::{document_bounds, extract_bounds};
pub use decode::{decode_text, DecodedText};
pub use document::{DocumentError, Element, ParsedDocument, XmlNode};
pub use engine::EngineHandle;
pub use filename::{validate_upload_name, InvalidFileName};
pub use kml::{ground_overlays, network_links, GroundOverlay, LatLonBoxState, NetworkLink};
pub use loader::{load_kmz, resolve_zoom, LoadError, LoadOutcome, LoadSettings};
pub use persist::{ensure_storage_dir, AtomicFileWriter, PersistError, StagedFile};
pub use render::{data_uri, image_mime, LinkResolution, MapRenderer};
pub use traversal::{
    Skip, SkipReason, TraversalReport, TraversalSettings, DEFAULT_MAX_DEPTH, DEFAULT_MAX_LINKS,
};
pub use tree_builder::{BuiltTree, TreeBuilder};
pub use types::EngineEvent;
pub use upload::{
    serve, serve_on, upload_router, UploadError, UploadSettings, DEFAULT_BIND, DEFAULT_MAX_BYTES,
    DEFAULT_UPLOAD_DIR,
};
