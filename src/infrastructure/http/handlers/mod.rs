//! HTTP Handlers

mod service;
mod voice;

pub use service::*;
pub use voice::*;
