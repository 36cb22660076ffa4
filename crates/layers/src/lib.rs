pub mod clusters;
pub mod edges;
pub mod labels;
pub mod layer;
pub mod registry;
pub mod renderer;
pub mod symbology;

pub use edges::RenderedEdge;
pub use layer::*;
pub use registry::*;
pub use renderer::*;
