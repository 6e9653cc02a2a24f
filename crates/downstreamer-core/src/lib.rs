//! Shared model and translators for the downstream query fan-out dispatcher.
//!
//! This crate holds everything that does not need a runtime: the logical
//! query parameters and shard descriptors, the wire shapes exchanged with a
//! downstream handler, the uniform [`QueryResult`](model::QueryResult), and the
//! pure translators between them. The dispatcher itself lives in the
//! `downstreamer` crate.

mod error;
pub mod model;
pub mod translate;

pub use error::*;
