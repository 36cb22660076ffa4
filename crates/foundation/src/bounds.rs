/// A longitude/latitude pair in degrees, ordered `[lng, lat]` as on the wire.
pub type LngLat = [f64; 2];

/// Geographic bounding box of the visible map area.
///
/// Compared by exact value: two snapshots taken without the map moving are
/// bitwise identical, and anything else counts as a change.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoBounds {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl GeoBounds {
    pub fn new(min_lng: f64, min_lat: f64, max_lng: f64, max_lat: f64) -> Self {
        Self {
            min_lng,
            min_lat,
            max_lng,
            max_lat,
        }
    }

    pub fn center(&self) -> LngLat {
        [
            (self.min_lng + self.max_lng) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        ]
    }

    /// Parses `minLng,minLat,maxLng,maxLat`.
    pub fn parse_bbox(bbox: &str) -> Result<Self, String> {
        let parts: Vec<_> = bbox.split(',').collect();
        if parts.len() != 4 {
            return Err("bbox must be minLng,minLat,maxLng,maxLat".to_string());
        }
        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .trim()
                .parse()
                .map_err(|e| format!("invalid bbox component {part:?}: {e}"))?;
        }
        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }
}

#[cfg(test)]
mod tests {
    use super::GeoBounds;

    #[test]
    fn center_is_midpoint() {
        let b = GeoBounds::new(-120.0, 25.0, -70.0, 50.0);
        assert_eq!(b.center(), [-95.0, 37.5]);
    }

    #[test]
    fn parses_bbox_argument() {
        let b = GeoBounds::parse_bbox("-125.5, 24.0,-66.9,49.4").unwrap();
        assert_eq!(b, GeoBounds::new(-125.5, 24.0, -66.9, 49.4));
        assert!(GeoBounds::parse_bbox("1,2,3").is_err());
        assert!(GeoBounds::parse_bbox("a,2,3,4").is_err());
    }
}
