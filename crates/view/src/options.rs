use std::fmt;
use std::str::FromStr;

use crate::reconcile::Correction;

/// Server-side clustering strategy; wire codes are fixed by the backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum ClusteringAlgorithm {
    /// Hierarchical greedy clustering, precomputed for every zoom level.
    #[default]
    Hgc,
    IncrementalKMeans,
    KMeans,
}

impl ClusteringAlgorithm {
    pub fn code(self) -> u8 {
        match self {
            Self::Hgc => 0,
            Self::IncrementalKMeans => 1,
            Self::KMeans => 2,
        }
    }

    /// Whether a viewport change must make the server drop its accumulated
    /// state and recompute from scratch.
    ///
    /// HGC keeps one hierarchy for all zoom levels and bounds, so it can be
    /// re-sliced cheaply. The k-means variants cluster for one view only.
    pub fn restarts_on_viewport_change(self) -> bool {
        !matches!(self, Self::Hgc)
    }
}

impl FromStr for ClusteringAlgorithm {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HGC" => Ok(Self::Hgc),
            "I-KMeans" => Ok(Self::IncrementalKMeans),
            "KMeans" => Ok(Self::KMeans),
            _ => Err(UnknownOption::new("clustering algorithm", s)),
        }
    }
}

/// Edge bundling strategy; only `ForceEdgeBundlingClientSide` runs locally.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum BundlingAlgorithm {
    #[default]
    Fdeb,
    Ifdeb,
    ForceEdgeBundlingClientSide,
}

impl BundlingAlgorithm {
    pub fn code(self) -> u8 {
        match self {
            Self::Fdeb => 0,
            Self::Ifdeb => 1,
            Self::ForceEdgeBundlingClientSide => 2,
        }
    }

    pub fn is_client_side(self) -> bool {
        matches!(self, Self::ForceEdgeBundlingClientSide)
    }
}

impl FromStr for BundlingAlgorithm {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FDEB" => Ok(Self::Fdeb),
            "IFDEB" => Ok(Self::Ifdeb),
            "FE" => Ok(Self::ForceEdgeBundlingClientSide),
            _ => Err(UnknownOption::new("bundling algorithm", s)),
        }
    }
}

/// Clustering search radius in pixels, from the `rad40`/`rad80` selector.
pub fn parse_radius(s: &str) -> Result<u32, UnknownOption> {
    match s {
        "rad40" => Ok(40),
        "rad80" => Ok(80),
        _ => Err(UnknownOption::new("radius", s)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOption {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownOption {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for UnknownOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownOption {}

/// The display-mode checkboxes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Toggle {
    Point,
    Cluster,
    Edge,
    Bundle,
    TreeCut,
}

impl Toggle {
    pub const ALL: [Toggle; 5] = [
        Toggle::Point,
        Toggle::Cluster,
        Toggle::Edge,
        Toggle::Bundle,
        Toggle::TreeCut,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Toggle::Point => "point",
            Toggle::Cluster => "cluster",
            Toggle::Edge => "edge",
            Toggle::Bundle => "bundle",
            Toggle::TreeCut => "treeCut",
        }
    }
}

impl FromStr for Toggle {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Toggle::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownOption::new("toggle", s))
    }
}

/// Everything the option panel currently shows.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OptionState {
    pub point: bool,
    pub cluster: bool,
    pub edge: bool,
    pub bundle: bool,
    pub tree_cut: bool,
    pub clustering_algorithm: ClusteringAlgorithm,
    pub bundling_algorithm: BundlingAlgorithm,
    pub radius: u32,
}

impl Default for OptionState {
    fn default() -> Self {
        Self {
            point: true,
            cluster: false,
            edge: true,
            bundle: false,
            tree_cut: false,
            clustering_algorithm: ClusteringAlgorithm::default(),
            bundling_algorithm: BundlingAlgorithm::default(),
            radius: 40,
        }
    }
}

impl OptionState {
    pub fn get(&self, toggle: Toggle) -> bool {
        match toggle {
            Toggle::Point => self.point,
            Toggle::Cluster => self.cluster,
            Toggle::Edge => self.edge,
            Toggle::Bundle => self.bundle,
            Toggle::TreeCut => self.tree_cut,
        }
    }

    pub fn set(&mut self, toggle: Toggle, value: bool) {
        let slot = match toggle {
            Toggle::Point => &mut self.point,
            Toggle::Cluster => &mut self.cluster,
            Toggle::Edge => &mut self.edge,
            Toggle::Bundle => &mut self.bundle,
            Toggle::TreeCut => &mut self.tree_cut,
        };
        *slot = value;
    }
}

/// Write side of the UI toggles, as the viewer needs it.
pub trait OptionPanel {
    fn options(&self) -> OptionState;

    /// Free-text query keyword.
    fn query(&self) -> String;

    /// Programmatically clears a checkbox.
    fn uncheck(&mut self, toggle: Toggle);

    /// Shows a blocking warning to the user.
    fn warn(&mut self, message: &str);
}

/// Pushes reconciler corrections back into the widgets, one warning each.
pub fn apply_corrections<P: OptionPanel + ?Sized>(panel: &mut P, corrections: &[Correction]) {
    for c in corrections {
        panel.warn(c.warning.message());
        panel.uncheck(c.toggle);
    }
}
