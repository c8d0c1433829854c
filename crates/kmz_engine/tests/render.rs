mod common;

use common::{init_logging, kml, link, overlay, parse, CountingArchive, KmzBuilder};
use kmz_core::{GeoBounds, ImageOverlay, MapSink, MapView};
use kmz_engine::{ArchiveReader, LinkResolution, MapRenderer, SkipReason, TraversalSettings};
use pretty_assertions::assert_eq;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

#[derive(Default)]
struct RecordingSink {
    fitted: Vec<GeoBounds>,
    overlays: Vec<ImageOverlay>,
}

impl MapSink for RecordingSink {
    fn fit_bounds(&mut self, bounds: GeoBounds) {
        self.fitted.push(bounds);
    }

    fn add_image_overlay(&mut self, overlay: ImageOverlay) {
        self.overlays.push(overlay);
    }
}

fn renderer(archive: &dyn ArchiveReader, resolution: LinkResolution) -> MapRenderer<'_> {
    MapRenderer::new(archive, TraversalSettings::default(), resolution)
}

#[tokio::test]
async fn single_overlay_is_placed_once() {
    init_logging();
    let body = overlay("img.png", 10.0, 20.0, 15.0, 25.0);
    let archive = KmzBuilder::new()
        .file("doc.kml", kml(&body))
        .file("img.png", PNG)
        .archive();
    let doc = parse("doc.kml", &kml(&body));
    let mut sink = RecordingSink::default();

    let report = renderer(&archive, LinkResolution::default())
        .render(&doc, &mut sink)
        .await;

    assert!(report.is_clean());
    assert_eq!(sink.overlays.len(), 1);
    assert_eq!(sink.overlays[0].bounds, GeoBounds::new(10.0, 20.0, 15.0, 25.0));
    assert_eq!(sink.overlays[0].source, "img.png");
    assert!(sink.overlays[0]
        .data_uri
        .starts_with("data:image/png;base64,iVBORw0K"));
    assert!(sink.fitted.is_empty());
}

#[tokio::test]
async fn incomplete_overlays_are_skipped() {
    init_logging();
    let body = [
        "<GroundOverlay><LatLonBox><north>1</north><south>0</south><east>1</east><west>0</west></LatLonBox></GroundOverlay>".to_string(),
        "<GroundOverlay><Icon><href>img.png</href></Icon></GroundOverlay>".to_string(),
        "<GroundOverlay><Icon><href>img.png</href></Icon><LatLonBox><north>n</north><south>0</south><east>1</east><west>0</west></LatLonBox></GroundOverlay>".to_string(),
        overlay("absent.png", 0.0, 0.0, 1.0, 1.0),
        overlay("img.png", 0.0, 0.0, 1.0, 1.0),
    ]
    .concat();
    let archive = KmzBuilder::new()
        .file("doc.kml", kml(&body))
        .file("img.png", PNG)
        .archive();
    let doc = parse("doc.kml", &kml(&body));
    let mut sink = RecordingSink::default();

    let report = renderer(&archive, LinkResolution::default())
        .render(&doc, &mut sink)
        .await;

    assert_eq!(sink.overlays.len(), 1);
    let reasons: Vec<_> = report.skipped.into_iter().map(|skip| skip.reason).collect();
    assert_eq!(
        reasons,
        vec![
            SkipReason::MissingIcon,
            SkipReason::MissingLatLonBox {
                icon: "img.png".into()
            },
            SkipReason::InvalidBounds {
                icon: "img.png".into()
            },
            SkipReason::ImageMissing {
                path: "absent.png".into()
            },
        ]
    );
}

#[tokio::test]
async fn linked_overlays_follow_document_order() {
    init_logging();
    let top = overlay("top.png", 0.0, 0.0, 1.0, 1.0) + &link("A", "a.kml") + &link("B", "b.kml");
    let archive = KmzBuilder::new()
        .file("doc.kml", kml(&top))
        .file("a.kml", kml(&overlay("a.png", 1.0, 1.0, 2.0, 2.0)))
        .file("b.kml", kml(&overlay("b.png", 2.0, 2.0, 3.0, 3.0)))
        .file("top.png", PNG)
        .file("a.png", PNG)
        .file("b.png", PNG)
        .archive();
    let doc = parse("doc.kml", &kml(&top));
    let mut map = MapView::default();

    renderer(&archive, LinkResolution::default())
        .render(&doc, &mut map)
        .await;

    let sources: Vec<_> = map.overlays().iter().map(|o| o.source.as_str()).collect();
    assert_eq!(sources, vec!["top.png", "a.png", "b.png"]);
}

#[tokio::test]
async fn archive_root_policy_ignores_document_directory() {
    init_logging();
    let nested = overlay("img.png", 0.0, 0.0, 1.0, 1.0) + &link("B", "b.kml");
    let archive = KmzBuilder::new()
        .file("doc.kml", kml(&link("A", "files/sub/a.kml")))
        .file("files/sub/a.kml", kml(&nested))
        .file("files/sub/b.kml", kml(&overlay("b.png", 0.0, 0.0, 1.0, 1.0)))
        .file("files/sub/img.png", PNG)
        .file("files/sub/b.png", PNG)
        .archive();
    let doc = parse("doc.kml", &kml(&link("A", "files/sub/a.kml")));

    let mut root_map = RecordingSink::default();
    let report = renderer(&archive, LinkResolution::ArchiveRoot)
        .render(&doc, &mut root_map)
        .await;
    assert!(root_map.overlays.is_empty());
    let reasons: Vec<_> = report.skipped.into_iter().map(|skip| skip.reason).collect();
    assert_eq!(
        reasons,
        vec![
            SkipReason::ImageMissing {
                path: "img.png".into()
            },
            SkipReason::EntryMissing {
                path: "b.kml".into()
            },
        ]
    );

    let mut relative_map = RecordingSink::default();
    let report = renderer(&archive, LinkResolution::DocumentRelative)
        .render(&doc, &mut relative_map)
        .await;
    assert!(report.is_clean());
    let sources: Vec<_> = relative_map
        .overlays
        .iter()
        .map(|o| o.source.as_str())
        .collect();
    assert_eq!(sources, vec!["files/sub/img.png", "files/sub/b.png"]);
}

#[tokio::test]
async fn cyclic_links_render_each_document_once_per_chain() {
    init_logging();
    let a = overlay("a.png", 0.0, 0.0, 1.0, 1.0) + &link("B", "b.kml");
    let archive = CountingArchive::new(
        KmzBuilder::new()
            .file("a.kml", kml(&a))
            .file("b.kml", kml(&link("A", "a.kml")))
            .file("a.png", PNG)
            .archive(),
    );
    let doc = parse("a.kml", &kml(&a));
    let mut sink = RecordingSink::default();

    let report = renderer(&archive, LinkResolution::default())
        .render(&doc, &mut sink)
        .await;

    assert_eq!(sink.overlays.len(), 1);
    assert_eq!(report.cycles(), 1);
    // one image read, one linked document
    assert_eq!(archive.reads(), 2);
}
