//! KML vocabulary: the few elements the viewer understands, lifted out of a
//! parsed document into owned values.

use kmz_core::{GeoBounds, UNNAMED_LINK};

use crate::bounds::{extract_bounds, LAT_LON_BOX};
use crate::document::{Element, ParsedDocument};

const NETWORK_LINK: &str = "NetworkLink";
const GROUND_OVERLAY: &str = "GroundOverlay";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkLink {
    pub name: String,
    pub href: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroundOverlay {
    pub icon_href: Option<String>,
    pub lat_lon_box: LatLonBoxState,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LatLonBoxState {
    Missing,
    Invalid,
    Valid(GeoBounds),
}

/// Every NetworkLink in document order, nested ones included.
pub fn network_links(document: &ParsedDocument) -> Vec<NetworkLink> {
    document
        .elements_by_tag(NETWORK_LINK)
        .map(|link| NetworkLink {
            name: link_name(link),
            href: link.first_text("href"),
        })
        .collect()
}

/// Only an absent or empty `<name>` falls back to the default; a name of
/// pure whitespace stays a (blank) name.
fn link_name(link: Element<'_>) -> String {
    match link.first_by_tag("name").map(|name| name.text()) {
        Some(text) if !text.is_empty() => text.trim().to_string(),
        _ => UNNAMED_LINK.to_string(),
    }
}

/// Every GroundOverlay in document order with its icon reference and box.
pub fn ground_overlays(document: &ParsedDocument) -> Vec<GroundOverlay> {
    document
        .elements_by_tag(GROUND_OVERLAY)
        .map(|overlay| GroundOverlay {
            icon_href: overlay
                .first_by_tag("Icon")
                .and_then(|icon| icon.first_text("href")),
            lat_lon_box: match overlay.first_by_tag(LAT_LON_BOX) {
                None => LatLonBoxState::Missing,
                Some(element) => match extract_bounds(element) {
                    Some(bounds) => LatLonBoxState::Valid(bounds),
                    None => LatLonBoxState::Invalid,
                },
            },
        })
        .collect()
}
