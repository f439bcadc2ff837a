mod api;
mod api_path;
mod client;
pub mod domain;
mod error;
mod in_flight;
mod request;

pub use api::*;
pub use api_path::*;
pub use client::*;
pub use error::*;
pub use request::*;
