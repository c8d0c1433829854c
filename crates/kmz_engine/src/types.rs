use kmz_core::{GeoBounds, Generation};

use crate::loader::{LoadError, LoadOutcome};

/// Completion reported by the engine thread, tagged with the generation of
/// the file it was started for.
#[derive(Debug)]
pub enum EngineEvent {
    ArchiveLoaded {
        generation: Generation,
        result: Result<LoadOutcome, LoadError>,
    },
    ZoomResolved {
        generation: Generation,
        path: String,
        bounds: Option<GeoBounds>,
    },
}

impl EngineEvent {
    pub fn generation(&self) -> Generation {
        match self {
            EngineEvent::ArchiveLoaded { generation, .. }
            | EngineEvent::ZoomResolved { generation, .. } => *generation,
        }
    }
}
