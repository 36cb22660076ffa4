pub mod bundling;
pub mod fdeb;

pub use bundling::*;
pub use fdeb::*;
