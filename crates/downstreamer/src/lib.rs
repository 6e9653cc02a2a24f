//! Downstream query fan-out dispatcher.
//!
//! A query that has been split into independent sub-queries (by time interval
//! or label shard) is executed against a downstream [`Handler`] with a strict
//! per-query concurrency bound. Results come back in input order, and the
//! first failure cancels everything still outstanding.
//!
//! ```no_run
//! # use downstreamer::{DownstreamHandler, DownstreamQuery, Handler, QueryContext, TenantLimits};
//! # use std::sync::Arc;
//! # async fn run(backend: Arc<dyn Handler>, queries: Vec<DownstreamQuery>) -> downstreamer::Result<()> {
//! let factory = DownstreamHandler::new(Arc::new(TenantLimits::default()), backend);
//!
//! let ctx = QueryContext::new().with_org_id("tenant-a");
//! let results = factory.downstreamer(&ctx).downstream(&ctx, queries).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `tracing` (default): one span per sub-query plus debug events carrying
//!   the shards, query, step and handler.

mod context;
pub mod dispatch;
mod handler;
mod limits;
mod query;
pub mod tenant;

pub use context::QueryContext;
pub use dispatch::{DEFAULT_DOWNSTREAM_CONCURRENCY, DownstreamHandler, Instance};
pub use handler::Handler;
pub use limits::{Limits, TenantLimits, TenantOverrides};
pub use query::{DownstreamQuery, Expr};
pub use tenant::{OrgIdResolver, TenantResolver};

// Public re-export so dependents can reach the model and translators via
// `downstreamer::downstreamer_core`
pub use downstreamer_core;
pub use downstreamer_core::{Error, Result};
