use std::env;
use std::fmt;
use std::time::Duration;

use clap::Parser;
use foundation::GeoBounds;
use view::{DEFAULT_MAX_ZOOM, OptionState, UnknownOption, parse_radius};

use crate::app::AppSettings;

pub const DEFAULT_SERVER_URL: &str = "ws://localhost:9000/replies";

#[derive(Parser, Debug)]
#[command(author, version, about = "Streaming cluster and edge-bundle map viewer")]
pub struct Args {
    /// WebSocket endpoint (falls back to VIEWER_SERVER_URL)
    #[arg(long)]
    pub server_url: Option<String>,

    /// Keep-alive interval in seconds
    #[arg(long, default_value_t = 200)]
    pub heartbeat_secs: u64,

    /// Zoom sent for raw point requests
    #[arg(long, default_value_t = DEFAULT_MAX_ZOOM)]
    pub max_zoom: i32,

    /// Initial view: minLon,minLat,maxLon,maxLat
    #[arg(long, default_value = "-125.0,24.0,-66.9,49.5", allow_hyphen_values = true)]
    pub bounds: String,

    /// Initial zoom
    #[arg(long, default_value_t = 3.5)]
    pub zoom: f64,

    /// HGC, I-KMeans or KMeans
    #[arg(long, default_value = "HGC")]
    pub clustering: String,

    /// FDEB, IFDEB or FE (client-side bundling)
    #[arg(long, default_value = "FDEB")]
    pub bundling: String,

    /// rad40 or rad80
    #[arg(long, default_value = "rad40")]
    pub radius: String,

    /// Draw this query right away
    #[arg(long)]
    pub query: Option<String>,
}

/// Validated viewer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub server_url: String,
    pub keep_alive: Duration,
    pub max_zoom: i32,
    pub bounds: GeoBounds,
    pub zoom: f64,
    pub options: OptionState,
    pub query: Option<String>,
}

impl ViewerConfig {
    pub fn settings(&self) -> AppSettings {
        AppSettings {
            max_zoom: self.max_zoom,
            keep_alive: self.keep_alive,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Bounds(String),
    Zoom(f64),
    MaxZoom(i32),
    Heartbeat,
    Option(UnknownOption),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Bounds(e) => write!(f, "--bounds: {e}"),
            ConfigError::Zoom(z) => write!(f, "--zoom must be between 0 and 22, got {z}"),
            ConfigError::MaxZoom(z) => write!(f, "--max-zoom must be between 0 and 22, got {z}"),
            ConfigError::Heartbeat => write!(f, "--heartbeat-secs must be positive"),
            ConfigError::Option(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<UnknownOption> for ConfigError {
    fn from(e: UnknownOption) -> Self {
        ConfigError::Option(e)
    }
}

impl Args {
    pub fn into_config(self) -> Result<ViewerConfig, ConfigError> {
        let bounds = GeoBounds::parse_bbox(&self.bounds).map_err(ConfigError::Bounds)?;
        if !(0.0..=22.0).contains(&self.zoom) {
            return Err(ConfigError::Zoom(self.zoom));
        }
        if !(0..=22).contains(&self.max_zoom) {
            return Err(ConfigError::MaxZoom(self.max_zoom));
        }
        if self.heartbeat_secs == 0 {
            return Err(ConfigError::Heartbeat);
        }

        let options = OptionState {
            clustering_algorithm: self.clustering.parse()?,
            bundling_algorithm: self.bundling.parse()?,
            radius: parse_radius(&self.radius)?,
            ..OptionState::default()
        };
        let server_url = self.server_url.unwrap_or_else(|| {
            env::var("VIEWER_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string())
        });

        Ok(ViewerConfig {
            server_url,
            keep_alive: Duration::from_secs(self.heartbeat_secs),
            max_zoom: self.max_zoom,
            bounds,
            zoom: self.zoom,
            options,
            query: self.query.filter(|q| !q.trim().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use view::{BundlingAlgorithm, ClusteringAlgorithm};

    fn parse(args: &[&str]) -> Result<ViewerConfig, ConfigError> {
        let argv = std::iter::once("viewer").chain(args.iter().copied());
        Args::try_parse_from(argv).unwrap().into_config()
    }

    #[test]
    fn defaults() {
        let config = parse(&["--server-url", "ws://example/replies"]).unwrap();
        assert_eq!(config.server_url, "ws://example/replies");
        assert_eq!(config.keep_alive, Duration::from_secs(200));
        assert_eq!(config.max_zoom, 18);
        assert_eq!(config.zoom, 3.5);
        assert_eq!(config.options, OptionState::default());
        assert_eq!(config.query, None);
    }

    #[test]
    fn options_by_ui_name() {
        let config = parse(&[
            "--clustering",
            "KMeans",
            "--bundling",
            "FE",
            "--radius",
            "rad80",
            "--bounds",
            "-10,-5,10,5",
            "--query",
            "tacos",
        ])
        .unwrap();
        assert_eq!(config.options.clustering_algorithm, ClusteringAlgorithm::KMeans);
        assert_eq!(
            config.options.bundling_algorithm,
            BundlingAlgorithm::ForceEdgeBundlingClientSide
        );
        assert_eq!(config.options.radius, 80);
        assert_eq!(config.bounds, GeoBounds::new(-10.0, -5.0, 10.0, 5.0));
        assert_eq!(config.query.as_deref(), Some("tacos"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(parse(&["--radius", "rad60"]), Err(ConfigError::Option(_))));
        assert!(matches!(parse(&["--bounds", "1,2,3"]), Err(ConfigError::Bounds(_))));
        assert_eq!(parse(&["--zoom", "30"]), Err(ConfigError::Zoom(30.0)));
        assert_eq!(parse(&["--heartbeat-secs", "0"]), Err(ConfigError::Heartbeat));
    }
}
