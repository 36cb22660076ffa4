use foundation::LngLat;
use streaming::RawEdge;

use crate::layer::{Layer, LayerId};
use crate::symbology::{DEFAULT_EDGE_COLOR, edge_width};

/// One straight segment ready for an edge layer.
///
/// `width` is the edge weight; the layer turns it into pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderedEdge {
    pub from: LngLat,
    pub to: LngLat,
    pub width: f64,
    pub color: Option<[u8; 3]>,
}

impl RenderedEdge {
    /// Segment of a bundled polyline: uniform unit weight, default color.
    pub fn segment(from: LngLat, to: LngLat) -> Self {
        Self {
            from,
            to,
            width: 1.0,
            color: None,
        }
    }
}

impl From<RawEdge> for RenderedEdge {
    fn from(e: RawEdge) -> Self {
        Self {
            from: e.from,
            to: e.to,
            width: e.width,
            color: e.color,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EdgeLine {
    pub from: LngLat,
    pub to: LngLat,
    pub width_px: u32,
    pub color: [u8; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeLayer {
    id: LayerId,
    opacity: f32,
    lines: Vec<EdgeLine>,
}

impl EdgeLayer {
    pub fn new(id: LayerId, edges: &[RenderedEdge], opacity: f32) -> Self {
        let lines = edges
            .iter()
            .map(|e| EdgeLine {
                from: e.from,
                to: e.to,
                width_px: edge_width(e.width),
                color: e.color.unwrap_or(DEFAULT_EDGE_COLOR),
            })
            .collect();
        Self { id, opacity, lines }
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn lines(&self) -> &[EdgeLine] {
        &self.lines
    }
}

impl Layer for EdgeLayer {
    fn id(&self) -> LayerId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::{EdgeLayer, RenderedEdge};
    use crate::layer::{Layer, LayerId};
    use streaming::RawEdge;

    #[test]
    fn lines_take_scaled_width_and_color() {
        let raw = RawEdge {
            from: [0.0, 0.0],
            to: [1.0, 1.0],
            width: 100.0,
            color: Some([255, 0, 0]),
        };
        let edges = [RenderedEdge::from(raw), RenderedEdge::segment([1.0, 1.0], [2.0, 2.0])];
        let layer = EdgeLayer::new(LayerId::Edge(3), &edges, 0.5);
        assert_eq!(layer.id(), LayerId::Edge(3));
        assert_eq!(layer.lines()[0].width_px, 10);
        assert_eq!(layer.lines()[0].color, [255, 0, 0]);
        assert_eq!(layer.lines()[1].width_px, 1);
        assert_eq!(layer.lines()[1].color, [0, 0, 0]);
        assert_eq!(layer.opacity(), 0.5);
    }
}
