use foundation::LngLat;
use streaming::ClusterPoint;

use crate::layer::{Layer, LayerId};
use crate::symbology::label_size;

#[derive(Debug, Clone, PartialEq)]
pub struct LabelAnchor {
    pub position: LngLat,
    pub text: String,
    pub size_px: u32,
}

/// Text layer printing each cluster's size on top of its marker.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LabelLayer {
    labels: Vec<LabelAnchor>,
}

impl LabelLayer {
    pub fn new(points: &[ClusterPoint]) -> Self {
        let labels = points
            .iter()
            .map(|p| LabelAnchor {
                position: p.coordinates,
                text: p.size.to_string(),
                size_px: label_size(p.size),
            })
            .collect();
        Self { labels }
    }

    pub fn labels(&self) -> &[LabelAnchor] {
        &self.labels
    }
}

impl Layer for LabelLayer {
    fn id(&self) -> LayerId {
        LayerId::Label
    }
}
