//! # Shared Request, Response and Result Types
//!
//! The shapes that travel across the handler boundary and the uniform result
//! the dispatcher hands back to its caller.
//!
//! - [`shard`] - shard descriptors and their compact string encoding
//! - [`params`] - logical query parameters
//! - [`request`] - wire-shape requests (range or instant)
//! - [`response`] - wire-shape responses, a closed set of kinds
//! - [`result`] - the uniform [`QueryResult`](result::QueryResult)

pub mod params;
pub mod request;
pub mod response;
pub mod result;
pub mod shard;

pub use params::*;
pub use request::*;
pub use response::*;
pub use result::*;
pub use shard::*;
