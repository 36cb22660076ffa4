//! Decides, for every map or checkbox event, what the viewer has to redraw
//! and what it must ask the server for.
//!
//! The decision is a pure function of the event, the last sent viewport, the
//! current viewport, the last recorded zoom level and the option panel. It
//! never touches widgets: invalid option combinations come back as
//! [`Correction`]s for the caller to apply.

use std::fmt;
use std::str::FromStr;

use crate::options::{OptionState, Toggle, UnknownOption};
use crate::viewport::{MapEvent, ViewportSnapshot};

/// Zoom sent for unclustered point requests unless configured otherwise.
pub const DEFAULT_MAX_ZOOM: i32 = 18;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ChangeEvent {
    Move,
    Zoom,
    Point,
    Cluster,
    Edge,
    Bundle,
    TreeCut,
}

impl ChangeEvent {
    fn touches_points(self) -> bool {
        matches!(self, Self::Point | Self::Cluster | Self::TreeCut)
    }

    fn touches_edges(self) -> bool {
        matches!(self, Self::Edge | Self::Bundle | Self::TreeCut)
    }
}

impl From<Toggle> for ChangeEvent {
    fn from(t: Toggle) -> Self {
        match t {
            Toggle::Point => Self::Point,
            Toggle::Cluster => Self::Cluster,
            Toggle::Edge => Self::Edge,
            Toggle::Bundle => Self::Bundle,
            Toggle::TreeCut => Self::TreeCut,
        }
    }
}

impl From<MapEvent> for ChangeEvent {
    fn from(e: MapEvent) -> Self {
        match e {
            MapEvent::MoveEnd => Self::Move,
            MapEvent::ZoomEnd => Self::Zoom,
        }
    }
}

impl FromStr for ChangeEvent {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "move" => Ok(Self::Move),
            "zoom" => Ok(Self::Zoom),
            other => other.parse::<Toggle>().map(Self::from),
        }
    }
}

/// User-facing explanation for an option the reconciler switched off.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Warning {
    ClusterNeedsPoint,
    TreeCutNeedsClusterAndEdge,
    BundleNeedsEdge,
}

impl Warning {
    pub fn message(self) -> &'static str {
        match self {
            Warning::ClusterNeedsPoint => "Please check cluster with points.",
            Warning::TreeCutNeedsClusterAndEdge => "Please select tree cut with cluster and edge.",
            Warning::BundleNeedsEdge => "Please check bundle with edge.",
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A checkbox that must be cleared, and why.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Correction {
    pub toggle: Toggle,
    pub warning: Warning,
}

/// Effects of one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Options after corrections; redraw decisions are based on these.
    pub options: OptionState,
    pub corrections: Vec<Correction>,
    pub point_draw: bool,
    pub edge_draw: bool,
    /// The cluster and label layers must be removed.
    pub clear_clusters: bool,
    /// Every edge layer must be removed.
    pub clear_edges: bool,
    pub zoom_override: Option<i32>,
    pub new_query: bool,
    /// Zoom level to remember for the next `Zoom` event.
    pub zoom_level: i32,
}

impl Reconciliation {
    fn unchanged(options: &OptionState, zoom_level: i32) -> Self {
        Self {
            options: *options,
            corrections: Vec::new(),
            point_draw: false,
            edge_draw: false,
            clear_clusters: false,
            clear_edges: false,
            zoom_override: None,
            new_query: false,
            zoom_level,
        }
    }

    /// A request goes out only when some layer is stale.
    pub fn should_send(&self) -> bool {
        self.point_draw || self.edge_draw
    }

    pub fn is_noop(&self) -> bool {
        !self.should_send()
            && self.corrections.is_empty()
            && !self.clear_clusters
            && !self.clear_edges
    }

    pub fn warnings(&self) -> impl Iterator<Item = Warning> + '_ {
        self.corrections.iter().map(|c| c.warning)
    }

    fn correct(&mut self, toggle: Toggle, warning: Warning) {
        self.options.set(toggle, false);
        self.corrections.push(Correction { toggle, warning });
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Reconciler {
    max_zoom: i32,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ZOOM)
    }
}

impl Reconciler {
    pub fn new(max_zoom: i32) -> Self {
        Self { max_zoom }
    }

    pub fn max_zoom(&self) -> i32 {
        self.max_zoom
    }

    /// `previous` is the viewport of the last request that went out and
    /// `zoom_level` the last level recorded by a viewport event.
    pub fn reconcile(
        &self,
        event: ChangeEvent,
        previous: &ViewportSnapshot,
        current: &ViewportSnapshot,
        zoom_level: i32,
        options: &OptionState,
    ) -> Reconciliation {
        let mut out = Reconciliation::unchanged(options, zoom_level);

        if event == ChangeEvent::Move && current == previous {
            return out;
        }

        if event.touches_points() {
            if out.options.cluster && !out.options.point {
                out.correct(Toggle::Cluster, Warning::ClusterNeedsPoint);
            }
            if out.options.tree_cut && !out.options.cluster {
                out.correct(Toggle::TreeCut, Warning::TreeCutNeedsClusterAndEdge);
            }

            // Switching between points and clusters changes which edges are
            // visible, so edges follow along.
            out.point_draw = out.options.cluster || out.options.point;
            out.clear_clusters = !out.point_draw;
            out.edge_draw = out.options.edge;
            out.clear_edges = !out.edge_draw;
        }

        if event.touches_edges() {
            if out.options.bundle && !out.options.edge {
                out.correct(Toggle::Bundle, Warning::BundleNeedsEdge);
            }
            if out.options.tree_cut && !out.options.edge {
                out.correct(Toggle::TreeCut, Warning::TreeCutNeedsClusterAndEdge);
            }

            out.edge_draw = out.options.bundle || out.options.edge || out.options.tree_cut;
            out.clear_edges = !out.edge_draw;
        }

        let zoom_changed = event == ChangeEvent::Zoom && zoom_level != current.current_zoom;
        if event == ChangeEvent::Move || zoom_changed {
            if out.options.point {
                out.point_draw = true;
            }
            if out.options.edge {
                out.edge_draw = true;
            }
            out.zoom_level = current.current_zoom;
            if out.options.clustering_algorithm.restarts_on_viewport_change() {
                out.new_query = true;
            }
        }

        // Raw points are always requested at full detail.
        if out.point_draw && !out.options.cluster {
            out.zoom_override = Some(self.max_zoom);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ClusteringAlgorithm;
    use foundation::GeoBounds;
    use pretty_assertions::assert_eq;

    fn view(zoom: f64, min_lng: f64) -> ViewportSnapshot {
        ViewportSnapshot::capture(zoom, GeoBounds::new(min_lng, 20.0, min_lng + 40.0, 50.0))
    }

    fn opts() -> OptionState {
        OptionState {
            point: false,
            cluster: false,
            edge: false,
            bundle: false,
            tree_cut: false,
            ..OptionState::default()
        }
    }

    #[test]
    fn identical_move_is_a_noop() {
        let r = Reconciler::default();
        let v = view(5.0, -100.0);
        let o = OptionState {
            point: true,
            edge: true,
            ..opts()
        };
        let out = r.reconcile(ChangeEvent::Move, &v, &v, 5, &o);
        assert!(out.is_noop());
        assert!(!out.should_send());
        assert_eq!(out.options, o);
        assert_eq!(out.zoom_level, 5);
    }

    #[test]
    fn cluster_without_point_is_unchecked() {
        let r = Reconciler::default();
        let v = view(5.0, -100.0);
        let o = OptionState {
            cluster: true,
            edge: true,
            bundle: true,
            ..opts()
        };
        let out = r.reconcile(ChangeEvent::Cluster, &v, &v, 5, &o);
        assert!(!out.options.cluster);
        assert_eq!(out.warnings().collect::<Vec<_>>(), vec![Warning::ClusterNeedsPoint]);
        assert!(!out.point_draw);
        assert!(out.clear_clusters);
        assert!(out.edge_draw);
        // Bundle is only validated by edge-family events.
        assert!(out.options.bundle);
    }

    #[test]
    fn tree_cut_without_cluster_is_unchecked_once() {
        let r = Reconciler::default();
        let v = view(5.0, -100.0);
        let o = OptionState {
            point: true,
            tree_cut: true,
            ..opts()
        };
        let out = r.reconcile(ChangeEvent::TreeCut, &v, &v, 5, &o);
        assert!(!out.options.tree_cut);
        assert_eq!(
            out.corrections,
            vec![Correction {
                toggle: Toggle::TreeCut,
                warning: Warning::TreeCutNeedsClusterAndEdge,
            }]
        );
        assert!(out.point_draw);
        assert!(!out.edge_draw);
        assert!(out.clear_edges);
    }

    #[test]
    fn tree_cut_with_cluster_but_no_edge_is_unchecked() {
        let r = Reconciler::default();
        let v = view(5.0, -100.0);
        let o = OptionState {
            point: true,
            cluster: true,
            tree_cut: true,
            ..opts()
        };
        let out = r.reconcile(ChangeEvent::TreeCut, &v, &v, 5, &o);
        assert!(!out.options.tree_cut);
        assert!(out.options.cluster);
        assert_eq!(out.corrections.len(), 1);
        assert!(out.point_draw);
        assert_eq!(out.zoom_override, None);
    }

    #[test]
    fn valid_tree_cut_redraws_both_layers() {
        let r = Reconciler::default();
        let v = view(5.0, -100.0);
        let o = OptionState {
            point: true,
            cluster: true,
            edge: true,
            tree_cut: true,
            ..opts()
        };
        let out = r.reconcile(ChangeEvent::TreeCut, &v, &v, 5, &o);
        assert!(out.corrections.is_empty());
        assert!(out.point_draw);
        assert!(out.edge_draw);
        assert!(!out.clear_clusters && !out.clear_edges);
    }

    #[test]
    fn bundle_requires_edge() {
        let r = Reconciler::default();
        let v = view(5.0, -100.0);
        let o = OptionState {
            bundle: true,
            ..opts()
        };
        let out = r.reconcile(ChangeEvent::Bundle, &v, &v, 5, &o);
        assert!(!out.options.bundle);
        assert_eq!(out.warnings().collect::<Vec<_>>(), vec![Warning::BundleNeedsEdge]);
        assert!(!out.should_send());
        assert!(out.clear_edges);
    }

    #[test]
    fn unchecking_point_tears_down_clusters() {
        let r = Reconciler::default();
        let v = view(5.0, -100.0);
        let out = r.reconcile(ChangeEvent::Point, &v, &v, 5, &opts());
        assert!(out.clear_clusters);
        assert!(out.clear_edges);
        assert!(!out.should_send());
        assert!(!out.is_noop());
    }

    #[test]
    fn edge_toggle_only_redraws_edges() {
        let r = Reconciler::default();
        let v = view(5.0, -100.0);
        let o = OptionState {
            point: true,
            edge: true,
            ..opts()
        };
        let out = r.reconcile(ChangeEvent::Edge, &v, &v, 5, &o);
        assert!(out.edge_draw);
        assert!(!out.point_draw);
        assert_eq!(out.zoom_override, None);
        assert!(!out.new_query);
    }

    #[test]
    fn unclustered_points_request_max_zoom() {
        let r = Reconciler::new(17);
        let prev = view(5.0, -100.0);
        let cur = view(5.0, -90.0);
        let o = OptionState {
            point: true,
            ..opts()
        };
        let out = r.reconcile(ChangeEvent::Move, &prev, &cur, 5, &o);
        assert!(out.point_draw);
        assert_eq!(out.zoom_override, Some(17));

        let clustered = OptionState { cluster: true, ..o };
        let out = r.reconcile(ChangeEvent::Move, &prev, &cur, 5, &clustered);
        assert_eq!(out.zoom_override, None);
    }

    #[test]
    fn zoom_within_same_level_is_ignored() {
        let r = Reconciler::default();
        let prev = view(5.2, -100.0);
        let cur = view(5.8, -95.0);
        let o = OptionState {
            point: true,
            edge: true,
            ..opts()
        };
        let out = r.reconcile(ChangeEvent::Zoom, &prev, &cur, 5, &o);
        assert!(out.is_noop());

        let cur = view(6.1, -95.0);
        let out = r.reconcile(ChangeEvent::Zoom, &prev, &cur, 5, &o);
        assert!(out.point_draw && out.edge_draw);
        assert_eq!(out.zoom_level, 6);
    }

    #[test]
    fn viewport_change_new_query_depends_on_algorithm() {
        let r = Reconciler::default();
        let prev = view(5.0, -100.0);
        let cur = view(5.0, -80.0);
        let base = OptionState {
            edge: true,
            ..opts()
        };

        let hgc = OptionState {
            clustering_algorithm: ClusteringAlgorithm::Hgc,
            ..base
        };
        assert!(!r.reconcile(ChangeEvent::Move, &prev, &cur, 5, &hgc).new_query);

        for algo in [ClusteringAlgorithm::KMeans, ClusteringAlgorithm::IncrementalKMeans] {
            let o = OptionState {
                clustering_algorithm: algo,
                ..base
            };
            assert!(r.reconcile(ChangeEvent::Move, &prev, &cur, 5, &o).new_query);
        }
    }

    #[test]
    fn move_with_nothing_checked_sends_nothing() {
        let r = Reconciler::default();
        let out = r.reconcile(
            ChangeEvent::Move,
            &view(5.0, -100.0),
            &view(7.0, -90.0),
            5,
            &opts(),
        );
        assert!(!out.should_send());
        assert_eq!(out.zoom_level, 7);
    }

    #[test]
    fn events_parse_from_names() {
        assert_eq!("move".parse::<ChangeEvent>(), Ok(ChangeEvent::Move));
        assert_eq!("treeCut".parse::<ChangeEvent>(), Ok(ChangeEvent::TreeCut));
        assert_eq!(ChangeEvent::from(MapEvent::ZoomEnd), ChangeEvent::Zoom);
        assert!("pan".parse::<ChangeEvent>().is_err());
    }
}
