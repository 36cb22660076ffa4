pub mod options;
pub mod reconcile;
pub mod viewport;

pub use options::*;
pub use reconcile::*;
pub use viewport::*;
