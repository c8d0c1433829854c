use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use kmz_core::{resolve_path, ImageOverlay, MapSink};
use serde::{Deserialize, Serialize};

use crate::archive::ArchiveReader;
use crate::document::ParsedDocument;
use crate::kml::{ground_overlays, network_links, LatLonBoxState, NetworkLink};
use crate::traversal::{
    Ancestry, LinkOutcome, LinkWalker, SkipReason, TraversalReport, TraversalSettings,
};

/// Base used for hrefs found while rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkResolution {
    /// Link hrefs resolve from the archive root; icon hrefs are used as written.
    #[default]
    ArchiveRoot,
    /// Both resolve against the directory of the document containing them.
    DocumentRelative,
}

/// Places every ground overlay reachable from a document onto a map sink.
pub struct MapRenderer<'a> {
    archive: &'a dyn ArchiveReader,
    settings: TraversalSettings,
    resolution: LinkResolution,
}

struct Frame {
    document: ParsedDocument,
    links: std::vec::IntoIter<NetworkLink>,
    ancestry: Ancestry,
}

impl<'a> MapRenderer<'a> {
    pub fn new(
        archive: &'a dyn ArchiveReader,
        settings: TraversalSettings,
        resolution: LinkResolution,
    ) -> Self {
        Self {
            archive,
            settings,
            resolution,
        }
    }

    /// Overlays are placed in document order: a document's own first, then
    /// each linked document in link order.
    pub async fn render(
        &self,
        document: &ParsedDocument,
        sink: &mut dyn MapSink,
    ) -> TraversalReport {
        let mut walker = LinkWalker::new(self.archive, self.settings);
        let mut report = TraversalReport::default();

        self.place_overlays(document, sink, &mut report).await;
        let mut stack = vec![Frame {
            links: network_links(document).into_iter(),
            ancestry: Ancestry::root(document.path()),
            document: document.clone(),
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(link) = frame.links.next() else {
                stack.pop();
                continue;
            };
            let base = self.link_base(&frame.document).to_string();
            let ancestry = frame.ancestry.clone();
            let origin = frame.document.path().to_string();

            match walker.follow(&link, &base, &ancestry).await {
                LinkOutcome::Followed { path, document } => {
                    self.place_overlays(&document, sink, &mut report).await;
                    stack.push(Frame {
                        links: network_links(&document).into_iter(),
                        ancestry: ancestry.extend(&path),
                        document,
                    });
                }
                LinkOutcome::Broken { reason, .. } | LinkOutcome::Skipped(reason) => {
                    report.record(&origin, reason)
                }
            }
        }

        report.followed = walker.followed();
        report
    }

    async fn place_overlays(
        &self,
        document: &ParsedDocument,
        sink: &mut dyn MapSink,
        report: &mut TraversalReport,
    ) {
        for overlay in ground_overlays(document) {
            let Some(icon) = overlay.icon_href else {
                report.record(document.path(), SkipReason::MissingIcon);
                continue;
            };
            let bounds = match overlay.lat_lon_box {
                LatLonBoxState::Valid(bounds) => bounds,
                LatLonBoxState::Missing => {
                    report.record(document.path(), SkipReason::MissingLatLonBox { icon });
                    continue;
                }
                LatLonBoxState::Invalid => {
                    report.record(document.path(), SkipReason::InvalidBounds { icon });
                    continue;
                }
            };

            let path = match self.resolution {
                LinkResolution::ArchiveRoot => icon,
                LinkResolution::DocumentRelative => resolve_path(document.directory(), &icon),
            };
            let bytes = match self.archive.read(&path).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    report.record(document.path(), SkipReason::ImageMissing { path });
                    continue;
                }
                Err(err) => {
                    report.record(
                        document.path(),
                        SkipReason::Unreadable {
                            message: err.to_string(),
                            path,
                        },
                    );
                    continue;
                }
            };

            sink.add_image_overlay(ImageOverlay {
                data_uri: data_uri(&path, &bytes),
                source: path,
                bounds,
            });
        }
    }

    fn link_base<'d>(&self, document: &'d ParsedDocument) -> &'d str {
        match self.resolution {
            LinkResolution::ArchiveRoot => "",
            LinkResolution::DocumentRelative => document.directory(),
        }
    }
}

pub fn data_uri(path: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", image_mime(path), STANDARD.encode(bytes))
}

/// MIME type from the file extension; unknown extensions are treated as PNG.
pub fn image_mime(path: &str) -> &'static str {
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        _ => "image/png",
    }
}
