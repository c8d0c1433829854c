use serde::Serialize;

/// Geographic rectangle in degrees.
///
/// Values are finite but otherwise unchecked: latitudes beyond ±90 and
/// inverted or degenerate rectangles are kept as given.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Midpoint as `(lat, lon)`.
    pub fn center(&self) -> (f64, f64) {
        ((self.south + self.north) / 2.0, (self.west + self.east) / 2.0)
    }
}
