// Application layer: the data-access contract used by every front-end.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
