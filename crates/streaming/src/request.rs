use view::{OptionState, ViewportSnapshot};

use crate::protocol::{RequestPayload, flag};

/// Builds the request for the given view and options.
///
/// Pure: the same inputs always give the same payload, so requests can be
/// checked without a connection. `zoom_override` replaces the viewport zoom
/// when present.
pub fn compose_request(
    view: &ViewportSnapshot,
    options: &OptionState,
    zoom_override: Option<i32>,
    new_query: bool,
    query: &str,
) -> RequestPayload {
    RequestPayload {
        query: query.to_string(),
        lower_longitude: view.bounds.min_lng,
        upper_longitude: view.bounds.max_lng,
        lower_latitude: view.bounds.min_lat,
        upper_latitude: view.bounds.max_lat,
        clustering_algorithm: options.clustering_algorithm.code(),
        bundling_algorithm: options.bundling_algorithm.code(),
        bundling: flag(options.bundle),
        tree_cut: flag(options.tree_cut),
        clustering: flag(options.cluster),
        zoom: zoom_override.unwrap_or(view.current_zoom),
        point_status: flag(options.point),
        edge_status: flag(options.edge),
        new_query,
        radius: options.radius,
    }
}

#[cfg(test)]
mod tests {
    use super::compose_request;
    use foundation::GeoBounds;
    use view::{
        BundlingAlgorithm, ChangeEvent, ClusteringAlgorithm, OptionState, Reconciler,
        ViewportSnapshot,
    };

    fn view(zoom: f64) -> ViewportSnapshot {
        ViewportSnapshot::capture(zoom, GeoBounds::new(-125.0, 24.0, -66.0, 49.0))
    }

    #[test]
    fn maps_viewport_and_options() {
        let options = OptionState {
            point: true,
            cluster: true,
            edge: false,
            bundle: false,
            tree_cut: true,
            clustering_algorithm: ClusteringAlgorithm::KMeans,
            bundling_algorithm: BundlingAlgorithm::Ifdeb,
            radius: 80,
        };
        let req = compose_request(&view(4.7), &options, None, false, "flu");
        assert_eq!(req.query, "flu");
        assert_eq!(req.lower_longitude, -125.0);
        assert_eq!(req.upper_longitude, -66.0);
        assert_eq!(req.lower_latitude, 24.0);
        assert_eq!(req.upper_latitude, 49.0);
        assert_eq!(req.zoom, 4);
        assert_eq!(req.clustering_algorithm, 2);
        assert_eq!(req.bundling_algorithm, 1);
        assert_eq!((req.clustering, req.tree_cut, req.bundling), (1, 1, 0));
        assert_eq!((req.point_status, req.edge_status), (1, 0));
        assert_eq!(req.radius, 80);
        assert!(!req.new_query);
    }

    #[test]
    fn is_referentially_transparent() {
        let o = OptionState::default();
        let a = compose_request(&view(3.0), &o, Some(9), true, "q");
        let b = compose_request(&view(3.0), &o, Some(9), true, "q");
        assert_eq!(a, b);
        assert_eq!(a.zoom, 9);
    }

    #[test]
    fn unclustered_point_request_uses_max_zoom() {
        let reconciler = Reconciler::new(17);
        let options = OptionState {
            point: true,
            cluster: false,
            edge: false,
            ..OptionState::default()
        };
        let previous = view(5.0);
        let current = ViewportSnapshot::capture(5.0, GeoBounds::new(-120.0, 24.0, -60.0, 49.0));
        let out = reconciler.reconcile(ChangeEvent::Move, &previous, &current, 5, &options);
        let req = compose_request(&current, &out.options, out.zoom_override, out.new_query, "");
        assert_eq!(current.current_zoom, 5);
        assert_eq!(req.zoom, 17);
    }
}
