pub mod protocol;
pub mod request;
pub mod route;
pub mod session;

pub use protocol::*;
pub use request::*;
pub use route::*;
pub use session::*;
