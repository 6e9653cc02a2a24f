//! Bounded fan-out of sub-queries to a downstream handler.
//!
//! ## Structure
//!
//! - [`factory`] - resolves the per-query concurrency bound and builds
//!   instances ([`DownstreamHandler`]).
//! - [`instance`] - runs one fan-out ([`Instance`]).

pub mod factory;
pub mod instance;

pub use factory::{DEFAULT_DOWNSTREAM_CONCURRENCY, DownstreamHandler};
pub use instance::Instance;
