use serde::Serialize;

use crate::GeoBounds;

/// Georeferenced image ready for placement on a map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageOverlay {
    /// Archive path the image was read from.
    pub source: String,
    /// `data:` URI carrying the encoded image.
    #[serde(skip)]
    pub data_uri: String,
    pub bounds: GeoBounds,
}

/// Receiver for map operations. Renderers and zoom handling take it as an
/// explicit `&mut` context instead of reaching for a shared map.
pub trait MapSink: Send {
    fn fit_bounds(&mut self, bounds: GeoBounds);
    fn add_image_overlay(&mut self, overlay: ImageOverlay);
}

/// In-memory map state: the current viewport and the image layers placed so far.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    center: (f64, f64),
    zoom: u8,
    fitted: Option<GeoBounds>,
    overlays: Vec<ImageOverlay>,
}

impl Default for MapView {
    fn default() -> Self {
        Self::new((0.0, 0.0), 2)
    }
}

impl MapView {
    pub fn new(center: (f64, f64), zoom: u8) -> Self {
        Self {
            center,
            zoom,
            fitted: None,
            overlays: Vec::new(),
        }
    }

    /// Initial center as `(lat, lon)`, used until a bound has been fitted.
    pub fn center(&self) -> (f64, f64) {
        self.fitted.map(|b| b.center()).unwrap_or(self.center)
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn fitted(&self) -> Option<GeoBounds> {
        self.fitted
    }

    pub fn overlays(&self) -> &[ImageOverlay] {
        &self.overlays
    }

    pub fn into_overlays(self) -> Vec<ImageOverlay> {
        self.overlays
    }

    pub fn clear_overlays(&mut self) {
        self.overlays.clear();
    }
}

impl MapSink for MapView {
    fn fit_bounds(&mut self, bounds: GeoBounds) {
        self.fitted = Some(bounds);
    }

    fn add_image_overlay(&mut self, overlay: ImageOverlay) {
        self.overlays.push(overlay);
    }
}

#[cfg(test)]
mod tests {
    use super::{ImageOverlay, MapSink, MapView};
    use crate::GeoBounds;

    #[test]
    fn fitting_moves_the_center() {
        let mut map = MapView::default();
        assert_eq!(map.center(), (0.0, 0.0));
        map.fit_bounds(GeoBounds::new(10.0, 20.0, 20.0, 40.0));
        assert_eq!(map.center(), (15.0, 30.0));
    }

    #[test]
    fn overlays_accumulate_until_cleared() {
        let mut map = MapView::default();
        let overlay = ImageOverlay {
            source: "img.png".into(),
            data_uri: "data:image/png;base64,".into(),
            bounds: GeoBounds::new(0.0, 0.0, 1.0, 1.0),
        };
        map.add_image_overlay(overlay.clone());
        map.add_image_overlay(overlay);
        assert_eq!(map.overlays().len(), 2);
        map.clear_overlays();
        assert!(map.overlays().is_empty());
    }
}
