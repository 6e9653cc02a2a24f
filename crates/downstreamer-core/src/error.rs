//! Error types for the downstream fan-out dispatcher.
//!
//! This module defines the central `Error` enum, which captures every failure
//! that can surface from translating, executing, or collecting a sub-query.
//! None of these errors are retried at this layer: a single failure aborts the
//! whole fan-out.
//!
//! ## Error Cases
//! - `UnsupportedResponse`: A response kind reached the result translator that
//!   it cannot decode.
//! - `Downstream`: The backend answered, but the answer carries an error.
//! - `Handler`: The downstream handler call itself failed.
//! - `Cancelled`: The execution scope was cancelled before all results were
//!   collected.
//! - `EmptySeries`: A vector-shaped response contained a series without any
//!   sample.
//! - `InvalidShard`: A shard encoding did not parse.
//! - `Tenant`: No single tenant could be resolved from the context.
//! - `ChannelError`: The result queue closed before every result arrived.

use std::sync::Arc;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the downstream fan-out dispatcher.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// The response kind is not one the result translator understands.
    #[error("cannot decode ({kind})")]
    UnsupportedResponse { kind: &'static str },

    /// The backend reported an error inside an otherwise valid response.
    #[error("{error_type}: {message}")]
    Downstream { error_type: String, message: String },

    /// The downstream handler failed (transport, decoding, ...). Displayed
    /// verbatim.
    #[error(transparent)]
    Handler(Arc<dyn std::error::Error + Send + Sync>),

    /// The execution scope was cancelled before all results were collected.
    #[error("operation cancelled before all results were collected")]
    Cancelled,

    /// A vector-shaped response contained a series with no sample to take.
    #[error("vector series {labels} has no samples")]
    EmptySeries { labels: String },

    /// A shard descriptor could not be parsed.
    #[error("invalid shard: {input:?}")]
    InvalidShard { input: String },

    /// No single tenant could be resolved from the execution context.
    #[error("tenant resolution failed: {reason}")]
    Tenant { reason: String },

    /// Internal channel failure between the collector and its workers.
    #[error("Channel error: {context}")]
    ChannelError { context: String },
}

impl Error {
    /// Wraps an arbitrary handler failure so it can travel through the
    /// dispatcher unchanged.
    pub fn handler<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Handler(Arc::new(err))
    }

    /// Returns `true` if this error reports an incomplete, cancelled
    /// operation.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
