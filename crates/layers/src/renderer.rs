use streaming::ClusterPoint;
use tracing::debug;

use crate::clusters::ClusterLayer;
use crate::edges::{EdgeLayer, RenderedEdge};
use crate::labels::LabelLayer;
use crate::layer::{LayerId, LayerSpec, MapSurface};
use crate::registry::LayerRegistry;
use crate::symbology::ClusterStyle;

/// Default edge opacity before the user touches the slider.
pub const DEFAULT_EDGE_OPACITY: f32 = 0.8;

/// Owns the bookkeeping for every layer the viewer puts on the map.
///
/// The map itself is passed in per call so the same surface can also serve
/// viewport queries.
#[derive(Debug, Clone)]
pub struct LayerRenderer {
    registry: LayerRegistry,
    edge_opacity: f32,
    cluster_style: ClusterStyle,
}

impl Default for LayerRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerRenderer {
    pub fn new() -> Self {
        Self {
            registry: LayerRegistry::new(),
            edge_opacity: DEFAULT_EDGE_OPACITY,
            cluster_style: ClusterStyle::default(),
        }
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn edge_opacity(&self) -> f32 {
        self.edge_opacity
    }

    /// Applies to edge layers created from now on.
    pub fn set_edge_opacity(&mut self, opacity: f32) {
        self.edge_opacity = opacity.clamp(0.0, 1.0);
    }

    /// Adds one new edge layer holding `edges`.
    pub fn render_edges<M: MapSurface + ?Sized>(
        &mut self,
        map: &mut M,
        edges: &[RenderedEdge],
    ) -> LayerId {
        let id = self.registry.allocate_edge();
        debug!(layer = %id, edges = edges.len(), "add edge layer");
        map.add_layer(LayerSpec::Edges(EdgeLayer::new(id, edges, self.edge_opacity)));
        id
    }

    /// Replaces the cluster and label layers.
    pub fn render_clusters<M: MapSurface + ?Sized>(
        &mut self,
        map: &mut M,
        points: &[ClusterPoint],
    ) {
        self.remove_cluster_layers(map);
        debug!(points = points.len(), "add cluster layer");
        map.add_layer(LayerSpec::Clusters(ClusterLayer::new(
            points,
            self.cluster_style,
        )));
        map.add_layer(LayerSpec::Labels(LabelLayer::new(points)));
    }

    /// Removes every edge layer, newest first. Returns how many were removed.
    pub fn remove_edge_layers<M: MapSurface + ?Sized>(&mut self, map: &mut M) -> usize {
        let ids = self.registry.drain_reverse();
        for id in &ids {
            map.remove_layer(*id);
        }
        if !ids.is_empty() {
            debug!(removed = ids.len(), "removed edge layers");
        }
        ids.len()
    }

    pub fn remove_cluster_layers<M: MapSurface + ?Sized>(&mut self, map: &mut M) {
        for id in [LayerId::Cluster, LayerId::Label] {
            if map.has_layer(id) {
                map.remove_layer(id);
            }
        }
    }

    pub fn remove_all<M: MapSurface + ?Sized>(&mut self, map: &mut M) {
        self.remove_edge_layers(map);
        self.remove_cluster_layers(map);
    }
}
