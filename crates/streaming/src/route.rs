use view::BundlingAlgorithm;

use crate::protocol::{
    BundleGraph, ClusterPoint, ProtocolError, RawEdge, ResponseFrame, ResponseStats,
};

/// What a decoded response asks the renderer to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Raw graph for the local bundler; replaces the edge layers.
    ClientBundle {
        graph: BundleGraph,
        stats: ResponseStats,
    },
    /// Server-computed layers. `None` leaves that layer untouched.
    Direct {
        points: Option<Vec<ClusterPoint>>,
        edges: Option<Vec<RawEdge>>,
        stats: ResponseStats,
    },
}

/// Decodes the payloads a frame needs under the selected bundling mode.
///
/// Any decode failure rejects the whole frame so nothing half-rendered
/// reaches the map.
pub fn route(
    frame: &ResponseFrame,
    bundling: BundlingAlgorithm,
) -> Result<Dispatch, ProtocolError> {
    if bundling.is_client_side() {
        return Ok(Dispatch::ClientBundle {
            graph: frame.bundle_graph()?,
            stats: frame.stats,
        });
    }

    let points = if frame.has_points() {
        Some(frame.points()?)
    } else {
        None
    };
    let edges = if frame.has_edges() {
        Some(frame.edges()?)
    } else {
        None
    };
    Ok(Dispatch::Direct {
        points,
        edges,
        stats: frame.stats,
    })
}
