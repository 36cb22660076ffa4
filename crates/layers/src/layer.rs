use std::fmt;

use crate::clusters::ClusterLayer;
use crate::edges::EdgeLayer;
use crate::labels::LabelLayer;

/// Name of a rendering layer on the map.
///
/// Edge layers are numbered per batch; the cluster and label layers are
/// singletons that are replaced in place.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerId {
    Edge(u64),
    Cluster,
    Label,
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerId::Edge(n) => write!(f, "edge{n}"),
            LayerId::Cluster => f.write_str("cluster"),
            LayerId::Label => f.write_str("label"),
        }
    }
}

pub trait Layer {
    fn id(&self) -> LayerId;
}

/// A fully built layer handed to the map widget.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerSpec {
    Edges(EdgeLayer),
    Clusters(ClusterLayer),
    Labels(LabelLayer),
}

impl LayerSpec {
    /// Number of drawn primitives, for logging.
    pub fn len(&self) -> usize {
        match self {
            LayerSpec::Edges(l) => l.lines().len(),
            LayerSpec::Clusters(l) => l.markers().len(),
            LayerSpec::Labels(l) => l.labels().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Layer for LayerSpec {
    fn id(&self) -> LayerId {
        match self {
            LayerSpec::Edges(l) => l.id(),
            LayerSpec::Clusters(l) => l.id(),
            LayerSpec::Labels(l) => l.id(),
        }
    }
}

/// Layer management side of the map widget.
pub trait MapSurface {
    fn add_layer(&mut self, layer: LayerSpec);

    fn remove_layer(&mut self, id: LayerId);

    fn has_layer(&self, id: LayerId) -> bool;
}
