//! Wire format between the viewer and the cluster/edge backend.
//!
//! Every frame is a JSON text message on one persistent connection:
//! - [`RequestPayload`] (client → server) describes the viewport and options
//! - [`ResponseFrame`] (server → client) carries one batch of results whose
//!   point and edge lists are themselves JSON-encoded strings
//! - an empty text frame is a keep-alive and carries nothing

use std::collections::BTreeMap;
use std::fmt;

use foundation::LngLat;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Keep-alive frame. The server accepts and ignores it.
pub const HEARTBEAT_FRAME: &str = "";

/// Marker the server puts in `flag` on the last batch of a query.
pub const FINISHED_FLAG: &str = "Y";

/// Encodes a checkbox as the 0/1 integer the backend expects.
pub fn flag(on: bool) -> u8 {
    u8::from(on)
}

/// Request sent whenever a layer is stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    pub query: String,
    pub lower_longitude: f64,
    pub upper_longitude: f64,
    pub lower_latitude: f64,
    pub upper_latitude: f64,
    pub clustering_algorithm: u8,
    pub bundling_algorithm: u8,
    pub bundling: u8,
    pub tree_cut: u8,
    pub clustering: u8,
    pub zoom: i32,
    pub point_status: u8,
    pub edge_status: u8,
    /// Tells the server to drop incremental state and start over.
    pub new_query: bool,
    pub radius: u32,
}

impl RequestPayload {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

/// Counters attached to every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseStats {
    #[serde(default)]
    pub replies_cnt: i64,
    #[serde(default)]
    pub points_cnt: i64,
    #[serde(default)]
    pub clusters_cnt: i64,
    #[serde(default)]
    pub edges_cnt: i64,
    #[serde(default)]
    pub isolated_edges_cnt: i64,
}

impl ResponseStats {
    /// Edges that ended up in some bundle.
    pub fn bundled_edges(&self) -> i64 {
        self.edges_cnt - self.isolated_edges_cnt
    }
}

/// One batch from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseFrame {
    #[serde(default)]
    pub point_status: u8,
    #[serde(default)]
    pub edge_status: u8,
    #[serde(default)]
    pub point_data: Option<String>,
    #[serde(default)]
    pub edge_data: Option<String>,
    /// `"Y"` on the final batch of a query, `"N"` while more follow.
    #[serde(default)]
    pub flag: Option<String>,
    #[serde(flatten)]
    pub stats: ResponseStats,
}

impl ResponseFrame {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Frame)
    }

    pub fn has_points(&self) -> bool {
        self.point_status == 1
    }

    pub fn has_edges(&self) -> bool {
        self.edge_status == 1
    }

    pub fn is_final(&self) -> bool {
        self.flag.as_deref() == Some(FINISHED_FLAG)
    }

    pub fn points(&self) -> Result<Vec<ClusterPoint>, ProtocolError> {
        decode_embedded("pointData", self.point_data.as_deref())
    }

    pub fn edges(&self) -> Result<Vec<RawEdge>, ProtocolError> {
        decode_embedded("edgeData", self.edge_data.as_deref())
    }

    /// Node table and edge list sent when the client bundles locally.
    pub fn bundle_graph(&self) -> Result<BundleGraph, ProtocolError> {
        Ok(BundleGraph {
            nodes: decode_embedded("pointData", self.point_data.as_deref())?,
            edges: decode_embedded("edgeData", self.edge_data.as_deref())?,
        })
    }
}

// Absent, empty and `null` payloads all mean "nothing in this batch".
fn decode_embedded<T>(field: &'static str, data: Option<&str>) -> Result<T, ProtocolError>
where
    T: DeserializeOwned + Default,
{
    match data.map(str::trim) {
        None | Some("") | Some("null") => Ok(T::default()),
        Some(json) => {
            serde_json::from_str(json).map_err(|source| ProtocolError::Payload { field, source })
        }
    }
}

/// A point or cluster marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterPoint {
    pub coordinates: LngLat,
    pub size: u64,
}

/// An edge as drawn by the server, before any client-side styling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawEdge {
    pub from: LngLat,
    pub to: LngLat,
    /// Edge weight; the renderer derives a line width from it.
    #[serde(default = "unit_weight")]
    pub width: f64,
    #[serde(default)]
    pub color: Option<[u8; 3]>,
}

fn unit_weight() -> f64 {
    1.0
}

/// Node position in the client-side bundling input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
}

/// Edge between two node ids of a [`BundleGraph`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRef {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BundleGraph {
    pub nodes: BTreeMap<String, NodePosition>,
    pub edges: Vec<EdgeRef>,
}

impl BundleGraph {
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[derive(Debug)]
pub enum ProtocolError {
    Encode(serde_json::Error),
    Frame(serde_json::Error),
    Payload {
        field: &'static str,
        source: serde_json::Error,
    },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Encode(err) => write!(f, "request encode error: {err}"),
            ProtocolError::Frame(err) => write!(f, "response frame decode error: {err}"),
            ProtocolError::Payload { field, source } => {
                write!(f, "response {field} decode error: {source}")
            }
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Encode(err) | ProtocolError::Frame(err) => Some(err),
            ProtocolError::Payload { source, .. } => Some(source),
        }
    }
}
