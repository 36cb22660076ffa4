pub mod app;
pub mod config;
pub mod console;
pub mod transport;

pub use app::*;
pub use config::*;
