//! Client-side edge bundling: runs a layout over the server's raw graph and
//! flattens the resulting polylines into straight segments for an edge layer.

use std::collections::BTreeMap;
use std::fmt;

use layers::RenderedEdge;
use runtime::Metrics;
use streaming::{BundleGraph, EdgeRef, NodePosition};
use tracing::{debug, warn};

use crate::fdeb::ForceEdgeBundling;

/// Step size the viewer runs the force layout with.
pub const DEFAULT_STEP_SIZE: f64 = 0.02;

/// A bundling layout: for each edge it can place, an ordered polyline from
/// source to target through its intermediate vertices.
pub trait BundleLayout {
    fn layout(
        &self,
        nodes: &BTreeMap<String, NodePosition>,
        edges: &[EdgeRef],
    ) -> Vec<Vec<NodePosition>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleError {
    UnknownNode { edge: usize, node: String },
}

impl fmt::Display for BundleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleError::UnknownNode { edge, node } => {
                write!(f, "edge {edge} references unknown node {node:?}")
            }
        }
    }
}

impl std::error::Error for BundleError {}

/// Looks up edge endpoints, skipping (and logging) edges with a dangling id.
pub fn resolve_edges(
    nodes: &BTreeMap<String, NodePosition>,
    edges: &[EdgeRef],
) -> Vec<(NodePosition, NodePosition)> {
    let lookup = |edge: usize, id: &str| {
        nodes.get(id).copied().ok_or_else(|| BundleError::UnknownNode {
            edge,
            node: id.to_string(),
        })
    };

    let mut out = Vec::with_capacity(edges.len());
    for (i, e) in edges.iter().enumerate() {
        match (lookup(i, &e.source), lookup(i, &e.target)) {
            (Ok(s), Ok(t)) => out.push((s, t)),
            (Err(err), _) | (_, Err(err)) => warn!("skipping edge: {err}"),
        }
    }
    out
}

/// Splits each polyline of `n` vertices into `n - 1` unit-width segments.
pub fn format_polylines(polylines: &[Vec<NodePosition>]) -> Vec<RenderedEdge> {
    polylines
        .iter()
        .flat_map(|line| {
            line.windows(2).map(|pair| {
                RenderedEdge::segment([pair[0].x, pair[0].y], [pair[1].x, pair[1].y])
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct EdgeBundler<L = ForceEdgeBundling> {
    layout: L,
}

impl Default for EdgeBundler {
    fn default() -> Self {
        Self::new(ForceEdgeBundling::with_step_size(DEFAULT_STEP_SIZE))
    }
}

impl<L: BundleLayout> EdgeBundler<L> {
    pub fn new(layout: L) -> Self {
        Self { layout }
    }

    /// Bundles `graph` and returns the segments to draw. Layout and
    /// formatting time are recorded in `metrics`.
    pub fn bundle(&self, graph: &BundleGraph, metrics: &mut Metrics) -> Vec<RenderedEdge> {
        if graph.is_empty() {
            return Vec::new();
        }
        let polylines = metrics.time("bundling.layout", || {
            self.layout.layout(&graph.nodes, &graph.edges)
        });
        let segments = metrics.time("bundling.format", || format_polylines(&polylines));
        debug!(
            edges = graph.edges.len(),
            polylines = polylines.len(),
            segments = segments.len(),
            "bundled edges"
        );
        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> NodePosition {
        NodePosition { x, y }
    }

    /// Returns a fixed polyline per edge, ignoring the input geometry.
    struct Canned(Vec<Vec<NodePosition>>);

    impl BundleLayout for Canned {
        fn layout(
            &self,
            _nodes: &BTreeMap<String, NodePosition>,
            _edges: &[EdgeRef],
        ) -> Vec<Vec<NodePosition>> {
            self.0.clone()
        }
    }

    fn graph() -> BundleGraph {
        let mut nodes = BTreeMap::new();
        nodes.insert("0".to_string(), p(0.0, 0.0));
        nodes.insert("1".to_string(), p(3.0, 0.0));
        BundleGraph {
            nodes,
            edges: vec![EdgeRef {
                source: "0".to_string(),
                target: "1".to_string(),
            }],
        }
    }

    #[test]
    fn four_vertices_make_three_segments() {
        let line = vec![p(0.0, 0.0), p(1.0, 0.5), p(2.0, 0.5), p(3.0, 0.0)];
        let bundler = EdgeBundler::new(Canned(vec![line]));
        let out = bundler.bundle(&graph(), &mut Metrics::new());
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|e| e.width == 1.0 && e.color.is_none()));
        assert_eq!(out[0].from, [0.0, 0.0]);
        assert_eq!(out[0].to, [1.0, 0.5]);
        assert_eq!(out[1].from, [1.0, 0.5]);
        assert_eq!(out[2].to, [3.0, 0.0]);
    }

    #[test]
    fn empty_graph_gives_empty_output() {
        let bundler = EdgeBundler::new(Canned(vec![vec![p(0.0, 0.0), p(1.0, 1.0)]]));
        let mut metrics = Metrics::new();
        assert!(bundler.bundle(&BundleGraph::default(), &mut metrics).is_empty());
        assert!(format_polylines(&[]).is_empty());
        assert!(metrics.timing("bundling.layout").is_none());
    }

    #[test]
    fn records_timings() {
        let bundler = EdgeBundler::new(Canned(vec![vec![p(0.0, 0.0), p(1.0, 1.0)]]));
        let mut metrics = Metrics::new();
        bundler.bundle(&graph(), &mut metrics);
        assert_eq!(metrics.timing("bundling.layout").map(|t| t.count), Some(1));
        assert_eq!(metrics.timing("bundling.format").map(|t| t.count), Some(1));
    }

    #[test]
    fn dangling_ids_are_skipped() {
        let mut g = graph();
        g.edges.push(EdgeRef {
            source: "0".to_string(),
            target: "7".to_string(),
        });
        let resolved = resolve_edges(&g.nodes, &g.edges);
        assert_eq!(resolved, vec![(p(0.0, 0.0), p(3.0, 0.0))]);
    }

    #[test]
    fn error_names_the_node() {
        let err = BundleError::UnknownNode {
            edge: 2,
            node: "x".to_string(),
        };
        assert_eq!(err.to_string(), "edge 2 references unknown node \"x\"");
    }

    #[test]
    fn default_bundler_runs_force_layout() {
        let bundler: EdgeBundler = EdgeBundler::default();
        let out = bundler.bundle(&graph(), &mut Metrics::new());
        assert!(!out.is_empty());
        assert_eq!(out.first().map(|e| e.from), Some([0.0, 0.0]));
        assert_eq!(out.last().map(|e| e.to), Some([3.0, 0.0]));
    }
}
