pub mod heartbeat;
pub mod metrics;

pub use heartbeat::*;
pub use metrics::*;
