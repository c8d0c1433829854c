//! Optional RON configuration, read once at startup.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use kmz_core::MapView;
use kmz_engine::{
    LinkResolution, LoadSettings, TraversalSettings, UploadSettings, DEFAULT_BIND,
    DEFAULT_MAX_BYTES, DEFAULT_MAX_DEPTH, DEFAULT_MAX_LINKS, DEFAULT_UPLOAD_DIR,
};
use serde::Deserialize;

use super::logging::LogDestination;

pub const DEFAULT_CONFIG_PATH: &str = "./kmz_viewer.ron";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub log: LogSection,
    pub traversal: TraversalSection,
    pub map: MapSection,
    pub upload: UploadSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub destination: LogDestination,
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            destination: LogDestination::Terminal,
            level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TraversalSection {
    pub max_depth: usize,
    pub max_links: usize,
}

impl Default for TraversalSection {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_links: DEFAULT_MAX_LINKS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapSection {
    /// Initial `(lat, lon)`.
    pub center: (f64, f64),
    pub zoom: u8,
    pub link_resolution: LinkResolution,
}

impl Default for MapSection {
    fn default() -> Self {
        Self {
            center: (0.0, 0.0),
            zoom: 2,
            link_resolution: LinkResolution::ArchiveRoot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    pub dir: PathBuf,
    pub bind: String,
    pub max_bytes: usize,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            bind: DEFAULT_BIND.into(),
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl ViewerConfig {
    pub fn load_settings(&self) -> LoadSettings {
        LoadSettings {
            traversal: TraversalSettings {
                max_depth: self.traversal.max_depth,
                max_links: self.traversal.max_links,
            },
            link_resolution: self.map.link_resolution,
        }
    }

    pub fn upload_settings(&self) -> UploadSettings {
        UploadSettings {
            dir: self.upload.dir.clone(),
            bind: self.upload.bind.clone(),
            max_bytes: self.upload.max_bytes,
        }
    }

    pub fn map_view(&self) -> MapView {
        MapView::new(self.map.center, self.map.zoom)
    }
}

/// Read the configuration at `path`. A missing file means defaults.
pub fn load_config(path: &Path) -> anyhow::Result<ViewerConfig> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ViewerConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read config {}", path.display()))
        }
    };
    ron::from_str(&content).with_context(|| format!("failed to parse config {}", path.display()))
}
