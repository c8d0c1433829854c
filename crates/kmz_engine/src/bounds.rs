use kmz_core::GeoBounds;

use crate::document::{Element, ParsedDocument};

pub const LAT_LON_BOX: &str = "LatLonBox";

/// Read `north`/`south`/`east`/`west` from a LatLonBox element.
///
/// Returns `None` unless all four are present and parse as finite numbers.
/// Ranges are not checked.
pub fn extract_bounds(lat_lon_box: Element<'_>) -> Option<GeoBounds> {
    let north = coordinate(lat_lon_box, "north")?;
    let south = coordinate(lat_lon_box, "south")?;
    let east = coordinate(lat_lon_box, "east")?;
    let west = coordinate(lat_lon_box, "west")?;
    Some(GeoBounds::new(south, west, north, east))
}

/// Bounds of the first LatLonBox anywhere in the document.
pub fn document_bounds(document: &ParsedDocument) -> Option<GeoBounds> {
    document.first_by_tag(LAT_LON_BOX).and_then(extract_bounds)
}

// Whole-value parse: "12.5deg" is rejected, not read as 12.5.
fn coordinate(lat_lon_box: Element<'_>, tag: &str) -> Option<f64> {
    lat_lon_box
        .first_by_tag(tag)?
        .text()
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::{document_bounds, extract_bounds, LAT_LON_BOX};
    use crate::document::ParsedDocument;
    use kmz_core::GeoBounds;

    fn lat_lon_box(north: &str, south: &str, east: &str, west: &str) -> ParsedDocument {
        let xml = format!(
            "<kml><LatLonBox><north>{north}</north><south>{south}</south>\
             <east>{east}</east><west>{west}</west></LatLonBox></kml>"
        );
        ParsedDocument::parse("box.kml", &xml).unwrap()
    }

    fn bounds_of(doc: &ParsedDocument) -> Option<GeoBounds> {
        extract_bounds(doc.first_by_tag(LAT_LON_BOX).unwrap())
    }

    #[test]
    fn all_four_values_produce_bounds() {
        let doc = lat_lon_box("15", "10", "25", "20");
        assert_eq!(bounds_of(&doc), Some(GeoBounds::new(10.0, 20.0, 15.0, 25.0)));
    }

    #[test]
    fn out_of_range_latitude_is_kept() {
        let doc = lat_lon_box("91.0", "10", "25", "20");
        assert_eq!(bounds_of(&doc).map(|b| b.north), Some(91.0));
    }

    #[test]
    fn inverted_rectangle_is_kept() {
        let doc = lat_lon_box("-5", "5", "-10", "10");
        assert_eq!(bounds_of(&doc), Some(GeoBounds::new(5.0, 10.0, -5.0, -10.0)));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let doc = lat_lon_box(" 1.5\n", "\t-1.5", "2e1", "-20 ");
        assert_eq!(bounds_of(&doc), Some(GeoBounds::new(-1.5, -20.0, 1.5, 20.0)));
    }

    #[test]
    fn non_numeric_or_non_finite_values_yield_none() {
        assert_eq!(bounds_of(&lat_lon_box("north", "10", "25", "20")), None);
        assert_eq!(bounds_of(&lat_lon_box("", "10", "25", "20")), None);
        assert_eq!(bounds_of(&lat_lon_box("inf", "10", "25", "20")), None);
        assert_eq!(bounds_of(&lat_lon_box("15", "NaN", "25", "20")), None);
        assert_eq!(bounds_of(&lat_lon_box("12.5deg", "10", "25", "20")), None);
    }

    #[test]
    fn missing_value_yields_none() {
        let xml = "<kml><LatLonBox><north>1</north><south>0</south><east>1</east></LatLonBox></kml>";
        let doc = ParsedDocument::parse("box.kml", xml).unwrap();
        assert_eq!(bounds_of(&doc), None);
    }

    #[test]
    fn document_bounds_uses_first_box() {
        let xml = "<kml>\
            <GroundOverlay><LatLonBox><north>2</north><south>1</south><east>2</east><west>1</west></LatLonBox></GroundOverlay>\
            <GroundOverlay><LatLonBox><north>9</north><south>8</south><east>9</east><west>8</west></LatLonBox></GroundOverlay>\
            </kml>";
        let doc = ParsedDocument::parse("two.kml", xml).unwrap();
        assert_eq!(document_bounds(&doc), Some(GeoBounds::new(1.0, 1.0, 2.0, 2.0)));

        let empty = ParsedDocument::parse("none.kml", "<kml/>").unwrap();
        assert_eq!(document_bounds(&empty), None);
    }
}
