use foundation::LngLat;
use streaming::ClusterPoint;

use crate::layer::{Layer, LayerId};
use crate::symbology::ClusterStyle;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClusterMarker {
    pub position: LngLat,
    /// Radius before `radius_scale` and pixel clamping.
    pub radius: f64,
}

/// Scatter layer with one marker per cluster or point.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterLayer {
    style: ClusterStyle,
    markers: Vec<ClusterMarker>,
}

impl ClusterLayer {
    pub fn new(points: &[ClusterPoint], style: ClusterStyle) -> Self {
        let markers = points
            .iter()
            .map(|p| ClusterMarker {
                position: p.coordinates,
                radius: p.size as f64,
            })
            .collect();
        Self { style, markers }
    }

    pub fn style(&self) -> &ClusterStyle {
        &self.style
    }

    pub fn markers(&self) -> &[ClusterMarker] {
        &self.markers
    }
}

impl Layer for ClusterLayer {
    fn id(&self) -> LayerId {
        LayerId::Cluster
    }
}

#[cfg(test)]
mod tests {
    use super::ClusterLayer;
    use crate::layer::{Layer, LayerId};
    use crate::symbology::ClusterStyle;
    use streaming::ClusterPoint;

    #[test]
    fn marker_radius_is_cluster_size() {
        let points = [
            ClusterPoint {
                coordinates: [-100.0, 40.0],
                size: 12,
            },
            ClusterPoint {
                coordinates: [-90.0, 35.0],
                size: 1,
            },
        ];
        let layer = ClusterLayer::new(&points, ClusterStyle::default());
        assert_eq!(layer.id(), LayerId::Cluster);
        assert_eq!(layer.markers().len(), 2);
        assert_eq!(layer.markers()[0].position, [-100.0, 40.0]);
        assert_eq!(layer.markers()[0].radius, 12.0);
        assert_eq!(layer.markers()[1].radius, 1.0);
    }

    #[test]
    fn default_style() {
        let layer = ClusterLayer::new(&[], ClusterStyle::default());
        let style = layer.style();
        assert_eq!(style.fill, [0, 0, 0]);
        assert_eq!(style.opacity, 0.8);
        assert_eq!(style.radius_scale, 100.0);
        assert_eq!(style.radius_min_px, 1.0);
        assert_eq!(style.radius_max_px, 25.0);
        assert!(layer.markers().is_empty());
    }
}
