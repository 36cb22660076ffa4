use std::time::{Duration, Instant};

use compute::EdgeBundler;
use layers::symbology::opacity_from_slider;
use layers::{LayerRenderer, MapSurface, RenderedEdge};
use runtime::{DEFAULT_KEEP_ALIVE, Metrics};
use streaming::{
    BundleGraph, ConnectionSession, Dispatch, ResponseStats, SessionTicket, compose_request,
    route,
};
use tracing::{debug, info, warn};
use view::{
    ChangeEvent, DEFAULT_MAX_ZOOM, OptionPanel, OptionState, Reconciler, Reconciliation,
    ViewportSnapshot, ViewportTracker, apply_corrections,
};

/// Knobs the controller needs from configuration.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AppSettings {
    pub max_zoom: i32,
    pub keep_alive: Duration,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            max_zoom: DEFAULT_MAX_ZOOM,
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }
}

/// Client-side bundling for one frame. Built on the event loop, run
/// wherever the transport likes.
#[derive(Debug, Clone)]
pub struct BundleJob {
    pub generation: u64,
    pub sequence: u64,
    graph: BundleGraph,
    stats: ResponseStats,
    bundler: EdgeBundler,
}

impl BundleJob {
    pub fn run(self) -> BundleOutput {
        let mut metrics = Metrics::new();
        let edges = self.bundler.bundle(&self.graph, &mut metrics);
        BundleOutput {
            generation: self.generation,
            sequence: self.sequence,
            edges,
            stats: self.stats,
            metrics,
        }
    }
}

/// Bundled segments on their way back to [`ViewerApp::on_bundled`].
#[derive(Debug, Clone)]
pub struct BundleOutput {
    pub generation: u64,
    pub sequence: u64,
    pub edges: Vec<RenderedEdge>,
    pub stats: ResponseStats,
    pub metrics: Metrics,
}

/// Ties the map, the option panel, the connection and the renderer
/// together. Everything here is synchronous; the transport feeds it
/// connection events and drains `take_outbound`.
pub struct ViewerApp<M, P> {
    map: M,
    panel: P,
    renderer: LayerRenderer,
    reconciler: Reconciler,
    session: ConnectionSession,
    bundler: EdgeBundler,
    metrics: Metrics,
    previous: ViewportSnapshot,
    zoom_level: i32,
    bundle_jobs: Vec<BundleJob>,
    bundle_sequence: u64,
    bundle_applied: u64,
}

impl<M, P> ViewerApp<M, P>
where
    M: ViewportTracker + MapSurface,
    P: OptionPanel,
{
    pub fn new(map: M, panel: P, settings: AppSettings) -> Self {
        let previous = map.snapshot();
        Self {
            zoom_level: previous.current_zoom,
            previous,
            map,
            panel,
            renderer: LayerRenderer::new(),
            reconciler: Reconciler::new(settings.max_zoom),
            session: ConnectionSession::new(settings.keep_alive),
            bundler: EdgeBundler::default(),
            metrics: Metrics::new(),
            bundle_jobs: Vec::new(),
            bundle_sequence: 0,
            bundle_applied: 0,
        }
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut P {
        &mut self.panel
    }

    pub fn session(&self) -> &ConnectionSession {
        &self.session
    }

    pub fn renderer(&self) -> &LayerRenderer {
        &self.renderer
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Viewport sent with the last request.
    pub fn previous(&self) -> ViewportSnapshot {
        self.previous
    }

    pub fn zoom_level(&self) -> i32 {
        self.zoom_level
    }

    /// Starts a fresh query: clears the map and opens a new session that
    /// supersedes any existing one.
    pub fn draw(&mut self) -> SessionTicket {
        let query = self.panel.query();
        self.renderer.remove_all(&mut self.map);
        self.metrics.clear();
        self.bundle_jobs.clear();
        self.session.start(query)
    }

    /// The transport finished the handshake for `generation`. Sends the
    /// initial request for the current view.
    pub fn on_connected(&mut self, generation: u64, now: Instant) -> bool {
        if !self.session.on_opened(generation, now) {
            return false;
        }
        let view = self.map.snapshot();
        let options = self.panel.options();
        self.zoom_level = view.current_zoom;
        self.send(view, &options, None, true)
    }

    /// Handles a map or option change end to end.
    pub fn on_change(&mut self, event: ChangeEvent) -> Reconciliation {
        let current = self.map.snapshot();
        let options = self.panel.options();
        let outcome = self.reconciler.reconcile(
            event,
            &self.previous,
            &current,
            self.zoom_level,
            &options,
        );

        apply_corrections(&mut self.panel, &outcome.corrections);
        if outcome.clear_clusters {
            self.renderer.remove_cluster_layers(&mut self.map);
        }
        if outcome.clear_edges {
            self.renderer.remove_edge_layers(&mut self.map);
            // In-flight bundles must not bring the edges back.
            self.bundle_jobs.clear();
            self.bundle_applied = self.bundle_sequence;
        }
        self.zoom_level = outcome.zoom_level;

        if outcome.should_send() {
            self.send(
                current,
                &outcome.options,
                outcome.zoom_override,
                outcome.new_query,
            );
        } else if !outcome.is_noop() {
            debug!(?event, "change handled locally");
        }
        outcome
    }

    fn send(
        &mut self,
        view: ViewportSnapshot,
        options: &OptionState,
        zoom_override: Option<i32>,
        new_query: bool,
    ) -> bool {
        let payload = compose_request(
            &view,
            options,
            zoom_override,
            new_query,
            self.session.query(),
        );
        if !self.session.send(&payload) {
            return false;
        }
        self.previous = view;
        self.metrics.inc_counter("requests");
        true
    }

    /// Handles one text frame from the server.
    pub fn on_frame(&mut self, generation: u64, text: &str) {
        let frame = match self.session.on_message(generation, text) {
            None => return,
            Some(Ok(frame)) => frame,
            Some(Err(err)) => {
                warn!("skipping frame: {err}");
                self.metrics.inc_counter("frames.rejected");
                return;
            }
        };
        self.metrics.inc_counter("batches");

        let bundling = self.panel.options().bundling_algorithm;
        match route(&frame, bundling) {
            Ok(dispatch) => self.apply(dispatch),
            Err(err) => {
                warn!("skipping frame: {err}");
                self.metrics.inc_counter("frames.rejected");
                return;
            }
        }

        if frame.is_final() {
            info!(
                batches = self.session.frames_received(),
                replies = frame.stats.replies_cnt,
                "query complete"
            );
        }
    }

    fn apply(&mut self, dispatch: Dispatch) {
        match dispatch {
            Dispatch::ClientBundle { graph, stats } => {
                self.bundle_sequence += 1;
                self.bundle_jobs.push(BundleJob {
                    generation: self.session.generation(),
                    sequence: self.bundle_sequence,
                    graph,
                    stats,
                    bundler: self.bundler.clone(),
                });
            }
            Dispatch::Direct {
                points,
                edges,
                stats,
            } => {
                if let Some(points) = points {
                    self.record_point_stats(&stats);
                    self.renderer.render_clusters(&mut self.map, &points);
                }
                if let Some(edges) = edges {
                    let edges: Vec<RenderedEdge> =
                        edges.into_iter().map(RenderedEdge::from).collect();
                    self.renderer.remove_edge_layers(&mut self.map);
                    self.record_edge_stats(&stats);
                    self.renderer.render_edges(&mut self.map, &edges);
                }
            }
        }
    }

    /// Bundling work queued by client-bundle frames since the last call.
    pub fn take_bundle_jobs(&mut self) -> Vec<BundleJob> {
        std::mem::take(&mut self.bundle_jobs)
    }

    /// Renders a finished bundle unless its session was superseded or a
    /// newer bundle already landed.
    pub fn on_bundled(&mut self, output: BundleOutput) -> bool {
        if !self.session.is_current(output.generation) {
            debug!(generation = output.generation, "dropping bundle of superseded session");
            return false;
        }
        if output.sequence <= self.bundle_applied {
            debug!(sequence = output.sequence, "dropping outdated bundle");
            return false;
        }
        self.bundle_applied = output.sequence;
        self.metrics.merge(&output.metrics);
        self.renderer.remove_edge_layers(&mut self.map);
        self.record_point_stats(&output.stats);
        self.record_edge_stats(&output.stats);
        self.renderer.render_edges(&mut self.map, &output.edges);
        true
    }

    fn record_point_stats(&mut self, stats: &ResponseStats) {
        self.metrics.set_gauge("replies", stats.replies_cnt);
        self.metrics.set_gauge("points", stats.points_cnt);
        self.metrics.set_gauge("clusters", stats.clusters_cnt);
    }

    fn record_edge_stats(&mut self, stats: &ResponseStats) {
        self.metrics.set_gauge("edges", stats.edges_cnt);
        self.metrics.set_gauge("bundled_edges", stats.bundled_edges());
    }

    pub fn heartbeat_deadline(&self) -> Option<Instant> {
        self.session.heartbeat_deadline()
    }

    pub fn on_heartbeat(&mut self, now: Instant) -> bool {
        self.session.on_heartbeat(now)
    }

    pub fn on_disconnected(&mut self, generation: u64) -> bool {
        self.session.on_closed(generation)
    }

    /// Frames waiting for the socket, oldest first.
    pub fn take_outbound(&mut self) -> Vec<String> {
        self.session.take_outbound()
    }

    /// Applies the opacity slider (0..=1000) to edge layers drawn from now on.
    pub fn set_edge_opacity(&mut self, slider: u32) -> f32 {
        self.renderer.set_edge_opacity(opacity_from_slider(slider));
        self.renderer.edge_opacity()
    }

    pub fn stats(&self) -> Vec<String> {
        self.metrics.report()
    }
}
