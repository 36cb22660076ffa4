//! Headless map and option panel driven by line commands on stdin.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use foundation::GeoBounds;
use layers::{Layer, LayerId, LayerSpec, MapSurface};
use streaming::SessionTicket;
use tracing::{info, warn};
use view::{
    BundlingAlgorithm, ChangeEvent, ClusteringAlgorithm, MapEvent, OptionPanel, OptionState,
    Toggle, UnknownOption, ViewportTracker, parse_radius,
};

use crate::app::ViewerApp;

/// Zoom range the headless map accepts.
pub const MIN_MAP_ZOOM: f64 = 0.0;
pub const MAX_MAP_ZOOM: f64 = 22.0;

/// Map widget stand-in: a viewport plus the layers currently shown.
#[derive(Debug, Clone)]
pub struct HeadlessMap {
    zoom: f64,
    bounds: GeoBounds,
    layers: BTreeMap<LayerId, LayerSpec>,
}

impl HeadlessMap {
    pub fn new(bounds: GeoBounds, zoom: f64) -> Self {
        Self {
            zoom: zoom.clamp(MIN_MAP_ZOOM, MAX_MAP_ZOOM),
            bounds,
            layers: BTreeMap::new(),
        }
    }

    /// Pans/resizes the view without changing zoom.
    pub fn set_bounds(&mut self, bounds: GeoBounds) {
        self.bounds = bounds;
    }

    /// Zooms around the center; each level halves the visible extent.
    pub fn set_zoom(&mut self, zoom: f64) {
        let zoom = zoom.clamp(MIN_MAP_ZOOM, MAX_MAP_ZOOM);
        let scale = 2f64.powf(self.zoom - zoom);
        let [cx, cy] = self.bounds.center();
        let half_w = (self.bounds.max_lng - self.bounds.min_lng) * scale / 2.0;
        let half_h = (self.bounds.max_lat - self.bounds.min_lat) * scale / 2.0;
        self.bounds = GeoBounds::new(
            (cx - half_w).max(-180.0),
            (cy - half_h).max(-90.0),
            (cx + half_w).min(180.0),
            (cy + half_h).min(90.0),
        );
        self.zoom = zoom;
    }

    pub fn layers(&self) -> impl Iterator<Item = &LayerSpec> {
        self.layers.values()
    }
}

impl ViewportTracker for HeadlessMap {
    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn bounds(&self) -> GeoBounds {
        self.bounds
    }
}

impl MapSurface for HeadlessMap {
    fn add_layer(&mut self, layer: LayerSpec) {
        info!(layer = %layer.id(), features = layer.len(), "layer added");
        self.layers.insert(layer.id(), layer);
    }

    fn remove_layer(&mut self, id: LayerId) {
        if self.layers.remove(&id).is_some() {
            info!(layer = %id, "layer removed");
        }
    }

    fn has_layer(&self, id: LayerId) -> bool {
        self.layers.contains_key(&id)
    }
}

/// Checkbox and dropdown state, edited through commands.
#[derive(Debug, Clone, Default)]
pub struct ConsolePanel {
    options: OptionState,
    query: String,
    warnings: Vec<String>,
}

impl ConsolePanel {
    pub fn new(options: OptionState, query: impl Into<String>) -> Self {
        Self {
            options,
            query: query.into(),
            warnings: Vec::new(),
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Flips a checkbox, returning its new state.
    pub fn toggle(&mut self, toggle: Toggle) -> bool {
        let value = !self.options.get(toggle);
        self.options.set(toggle, value);
        value
    }

    pub fn options_mut(&mut self) -> &mut OptionState {
        &mut self.options
    }

    /// Warnings shown since the last call.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

impl OptionPanel for ConsolePanel {
    fn options(&self) -> OptionState {
        self.options
    }

    fn query(&self) -> String {
        self.query.clone()
    }

    fn uncheck(&mut self, toggle: Toggle) {
        self.options.set(toggle, false);
    }

    fn warn(&mut self, message: &str) {
        warn!("{message}");
        self.warnings.push(message.to_string());
    }
}

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Start a query; `None` reuses the current keyword.
    Draw(Option<String>),
    Move(GeoBounds),
    Zoom(f64),
    Toggle(Toggle),
    Clustering(ClusteringAlgorithm),
    Bundling(BundlingAlgorithm),
    Radius(u32),
    Opacity(u32),
    Layers,
    Stats,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    Empty,
    Unknown(String),
    MissingArgument(&'static str),
    InvalidNumber(String),
    InvalidBounds(String),
    Option(UnknownOption),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "empty command"),
            CommandError::Unknown(c) => write!(f, "unknown command '{c}' (try 'help')"),
            CommandError::MissingArgument(what) => write!(f, "missing argument: {what}"),
            CommandError::InvalidNumber(s) => write!(f, "not a number: {s}"),
            CommandError::InvalidBounds(e) => write!(f, "invalid bounds: {e}"),
            CommandError::Option(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<UnknownOption> for CommandError {
    fn from(e: UnknownOption) -> Self {
        CommandError::Option(e)
    }
}

pub const HELP: &str = "\
commands:
  draw [query]              start a new query
  move <w,s,e,n>            pan to a bounding box
  zoom <level>              zoom around the center
  toggle <point|cluster|edge|bundle|treecut>
  clustering <HGC|I-KMeans|KMeans>
  bundling <FDEB|IFDEB|FE>
  radius <rad40|rad80>
  opacity <0-1000>
  layers | stats | help | quit";

fn required<'a>(arg: Option<&'a str>, what: &'static str) -> Result<&'a str, CommandError> {
    arg.ok_or(CommandError::MissingArgument(what))
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, Some(rest.trim()).filter(|r| !r.is_empty())),
            None => (line, None),
        };
        match head.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "draw" => Ok(Command::Draw(rest.map(str::to_string))),
            "move" => GeoBounds::parse_bbox(required(rest, "bounds")?)
                .map(Command::Move)
                .map_err(CommandError::InvalidBounds),
            "zoom" => {
                let raw = required(rest, "zoom level")?;
                raw.parse::<f64>()
                    .ok()
                    .filter(|z| z.is_finite())
                    .map(Command::Zoom)
                    .ok_or_else(|| CommandError::InvalidNumber(raw.to_string()))
            }
            "toggle" => Ok(Command::Toggle(required(rest, "checkbox")?.parse()?)),
            "clustering" => Ok(Command::Clustering(required(rest, "algorithm")?.parse()?)),
            "bundling" => Ok(Command::Bundling(required(rest, "algorithm")?.parse()?)),
            "radius" => Ok(Command::Radius(parse_radius(required(rest, "radius")?)?)),
            "opacity" => {
                let raw = required(rest, "slider value")?;
                raw.parse::<u32>()
                    .map(Command::Opacity)
                    .map_err(|_| CommandError::InvalidNumber(raw.to_string()))
            }
            "layers" => Ok(Command::Layers),
            "stats" => Ok(Command::Stats),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn describe_layer(layer: &LayerSpec) -> String {
    match layer {
        LayerSpec::Edges(l) => {
            format!("{} ({} lines, opacity {:.2})", layer.id(), l.lines().len(), l.opacity())
        }
        LayerSpec::Clusters(l) => format!(
            "{} ({} markers, opacity {:.2})",
            layer.id(),
            l.markers().len(),
            l.style().opacity
        ),
        LayerSpec::Labels(l) => format!("{} ({} labels)", layer.id(), l.labels().len()),
    }
}

/// What the transport has to do after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    Connect(SessionTicket),
    Quit,
}

/// Applies a command to the viewer. Output lines for the user are returned
/// rather than printed.
pub fn execute(
    app: &mut ViewerApp<HeadlessMap, ConsolePanel>,
    command: Command,
    out: &mut Vec<String>,
) -> Effect {
    let effect = match command {
        Command::Draw(query) => {
            if let Some(query) = query {
                app.panel_mut().set_query(query);
            }
            return Effect::Connect(app.draw());
        }
        Command::Move(bounds) => {
            app.map_mut().set_bounds(bounds);
            app.on_change(MapEvent::MoveEnd.into());
            Effect::None
        }
        // A zoom also moves the view, so the map reports both events.
        Command::Zoom(zoom) => {
            let before = app.map().bounds();
            app.map_mut().set_zoom(zoom);
            if app.map().bounds() != before {
                app.on_change(MapEvent::MoveEnd.into());
            }
            app.on_change(MapEvent::ZoomEnd.into());
            Effect::None
        }
        Command::Toggle(toggle) => {
            let checked = app.panel_mut().toggle(toggle);
            out.push(format!("{} {}", toggle.name(), if checked { "on" } else { "off" }));
            app.on_change(ChangeEvent::from(toggle));
            Effect::None
        }
        // Dropdowns only take effect with the next request.
        Command::Clustering(algorithm) => {
            app.panel_mut().options_mut().clustering_algorithm = algorithm;
            Effect::None
        }
        Command::Bundling(algorithm) => {
            app.panel_mut().options_mut().bundling_algorithm = algorithm;
            Effect::None
        }
        Command::Radius(radius) => {
            app.panel_mut().options_mut().radius = radius;
            Effect::None
        }
        Command::Opacity(slider) => {
            let opacity = app.set_edge_opacity(slider);
            out.push(format!("edge opacity {opacity:.3}"));
            Effect::None
        }
        Command::Layers => {
            out.extend(app.map().layers().map(describe_layer));
            Effect::None
        }
        Command::Stats => {
            out.extend(app.stats());
            Effect::None
        }
        Command::Help => {
            out.extend(HELP.lines().map(str::to_string));
            Effect::None
        }
        Command::Quit => Effect::Quit,
    };
    out.extend(
        app.panel_mut()
            .take_warnings()
            .into_iter()
            .map(|w| format!("warning: {w}")),
    );
    effect
}
