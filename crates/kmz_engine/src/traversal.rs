use std::fmt;
use std::sync::Arc;

use kmz_core::resolve_path;
use kmz_logging::kmz_debug;
use serde::Serialize;

use crate::archive::ArchiveReader;
use crate::decode::decode_text;
use crate::document::ParsedDocument;
use crate::kml::NetworkLink;

pub const DEFAULT_MAX_DEPTH: usize = 64;
pub const DEFAULT_MAX_LINKS: usize = 5_000;

/// Limits for one walk over a NetworkLink graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalSettings {
    /// Longest chain of links followed from the start document.
    pub max_depth: usize,
    /// Most linked documents loaded in one walk.
    pub max_links: usize,
}

impl Default for TraversalSettings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_links: DEFAULT_MAX_LINKS,
        }
    }
}

/// Why a link or overlay contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    MissingHref { name: String },
    EntryMissing { path: String },
    Unreadable { path: String, message: String },
    Unparsable { path: String, message: String },
    Cycle { path: String },
    DepthLimit { path: String },
    LinkLimit { path: String },
    MissingIcon,
    MissingLatLonBox { icon: String },
    InvalidBounds { icon: String },
    ImageMissing { path: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingHref { name } => write!(f, "link {name:?} has no href"),
            SkipReason::EntryMissing { path } => write!(f, "no archive entry {path}"),
            SkipReason::Unreadable { path, message } => write!(f, "cannot read {path}: {message}"),
            SkipReason::Unparsable { path, message } => write!(f, "cannot parse {path}: {message}"),
            SkipReason::Cycle { path } => write!(f, "link back to ancestor {path}"),
            SkipReason::DepthLimit { path } => write!(f, "depth limit reached at {path}"),
            SkipReason::LinkLimit { path } => write!(f, "link limit reached at {path}"),
            SkipReason::MissingIcon => write!(f, "overlay has no icon href"),
            SkipReason::MissingLatLonBox { icon } => write!(f, "overlay {icon} has no LatLonBox"),
            SkipReason::InvalidBounds { icon } => write!(f, "overlay {icon} has invalid bounds"),
            SkipReason::ImageMissing { path } => write!(f, "no overlay image {path}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skip {
    /// Document the skipped link or overlay appears in.
    pub document: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// What one walk followed and what it left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraversalReport {
    pub followed: usize,
    pub skipped: Vec<Skip>,
}

impl TraversalReport {
    pub(crate) fn record(&mut self, document: &str, reason: SkipReason) {
        kmz_debug!("Skipping in {}: {}", document, reason);
        self.skipped.push(Skip {
            document: document.to_string(),
            reason,
        });
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn cycles(&self) -> usize {
        self.skipped
            .iter()
            .filter(|skip| matches!(skip.reason, SkipReason::Cycle { .. }))
            .count()
    }
}

/// Archive paths of the documents on the chain leading to a frame.
#[derive(Debug, Clone, Default)]
pub(crate) struct Ancestry {
    paths: Arc<Vec<String>>,
    depth: usize,
}

impl Ancestry {
    pub(crate) fn root(path: &str) -> Self {
        let paths = if path.is_empty() {
            Vec::new()
        } else {
            vec![path.to_string()]
        };
        Self {
            paths: Arc::new(paths),
            depth: 0,
        }
    }

    pub(crate) fn extend(&self, path: &str) -> Self {
        let mut paths = Vec::with_capacity(self.paths.len() + 1);
        paths.extend(self.paths.iter().cloned());
        paths.push(path.to_string());
        Self {
            paths: Arc::new(paths),
            depth: self.depth + 1,
        }
    }

    pub(crate) fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }
}

pub(crate) enum LinkOutcome {
    Followed {
        path: String,
        document: ParsedDocument,
    },
    /// The entry exists but is not a usable document. It still counts as a
    /// followed link, with nothing below it.
    Broken {
        path: String,
        reason: SkipReason,
    },
    Skipped(SkipReason),
}

/// Resolves and loads linked documents while enforcing the walk's limits.
pub(crate) struct LinkWalker<'a> {
    archive: &'a dyn ArchiveReader,
    settings: TraversalSettings,
    followed: usize,
}

impl<'a> LinkWalker<'a> {
    pub(crate) fn new(archive: &'a dyn ArchiveReader, settings: TraversalSettings) -> Self {
        Self {
            archive,
            settings,
            followed: 0,
        }
    }

    pub(crate) fn followed(&self) -> usize {
        self.followed
    }

    pub(crate) async fn follow(
        &mut self,
        link: &NetworkLink,
        base: &str,
        ancestry: &Ancestry,
    ) -> LinkOutcome {
        let Some(href) = link.href.as_deref() else {
            return LinkOutcome::Skipped(SkipReason::MissingHref {
                name: link.name.clone(),
            });
        };
        let path = resolve_path(base, href);
        if ancestry.contains(&path) {
            return LinkOutcome::Skipped(SkipReason::Cycle { path });
        }
        if ancestry.depth() >= self.settings.max_depth {
            return LinkOutcome::Skipped(SkipReason::DepthLimit { path });
        }
        if self.followed >= self.settings.max_links {
            return LinkOutcome::Skipped(SkipReason::LinkLimit { path });
        }

        match load_document(self.archive, &path).await {
            Ok(document) => {
                self.followed += 1;
                LinkOutcome::Followed { path, document }
            }
            Err(reason @ SkipReason::Unparsable { .. }) => {
                self.followed += 1;
                LinkOutcome::Broken { path, reason }
            }
            Err(reason) => LinkOutcome::Skipped(reason),
        }
    }
}

/// Read, decode and parse the document at `path`. Only a missing or
/// unreadable entry and a parse failure are errors; decoding is lossy.
pub(crate) async fn load_document(
    archive: &dyn ArchiveReader,
    path: &str,
) -> Result<ParsedDocument, SkipReason> {
    let bytes = match archive.read(path).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            return Err(SkipReason::EntryMissing {
                path: path.to_string(),
            })
        }
        Err(err) => {
            return Err(SkipReason::Unreadable {
                path: path.to_string(),
                message: err.to_string(),
            })
        }
    };
    let decoded = decode_text(&bytes);
    if decoded.lossy {
        kmz_debug!("{} is not valid {}", path, decoded.encoding_label);
    }
    ParsedDocument::parse(path, &decoded.text).map_err(|err| SkipReason::Unparsable {
        path: path.to_string(),
        message: err.to_string(),
    })
}
