//! Bounded, order-preserving fan-out for a single top-level query.
//!
//! An [`Instance`] owns a fixed pool of tokens (a [`Semaphore`]) that caps how
//! many sub-queries run at once. [`Instance::for_each_query`] drives the
//! fan-out with three roles:
//!
//! - a supervisor task acquires one token per sub-query, strictly in input
//!   order, and spawns a worker as soon as a token is available;
//! - each worker runs the unit of work, releases its token, and publishes an
//!   index-tagged result unless the scope is already cancelled;
//! - the collector (the calling task) reads exactly `n` results into their
//!   slots, failing fast on the first error.
//!
//! A single [`QueryContext`] child scope covers the call and is cancelled on
//! every exit path, so the supervisor stops dispatching and late workers drop
//! their results instead of blocking.

use crate::{context::QueryContext, handler::Handler, query::DownstreamQuery};
use downstreamer_core::{Error, Result, model::QueryResult, translate::response_to_result};
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};

/// Result of one unit of work, tagged with its input position.
struct Tagged<R> {
    index: usize,
    result: Result<R>,
}

/// Per-query dispatcher bound to a downstream [`Handler`].
///
/// Clones share the token pool, so concurrent fan-outs issued for the same
/// top-level query (e.g. both legs of a binary operation) draw from one
/// bound.
#[derive(Clone)]
pub struct Instance {
    parallelism: usize,
    locks: Arc<Semaphore>,
    handler: Arc<dyn Handler>,
}

impl Instance {
    /// Creates an instance whose pool is pre-filled with `parallelism`
    /// tokens. A bound of zero is raised to one.
    pub fn new(parallelism: usize, handler: Arc<dyn Handler>) -> Self {
        let parallelism = parallelism.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            parallelism,
            locks: Arc::new(Semaphore::new(parallelism)),
            handler,
        }
    }

    /// The concurrency bound of this instance.
    pub const fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Tokens currently in the pool, i.e. not held by a running worker.
    pub fn available_tokens(&self) -> usize {
        self.locks.available_permits()
    }

    /// Executes every sub-query against the handler and returns their results
    /// in input order.
    ///
    /// Each sub-query is translated into a downstream request carrying its
    /// stringified expression, executed, and the response translated back
    /// into a [`QueryResult`].
    ///
    /// # Errors
    ///
    /// Returns the first failure collected (handler, downstream or
    /// translation error), or [`Error::Cancelled`] if `ctx` is cancelled
    /// before every result arrived.
    pub async fn downstream(
        &self,
        ctx: &QueryContext,
        queries: impl Into<Arc<[DownstreamQuery]>>,
    ) -> Result<Vec<QueryResult>> {
        let handler = Arc::clone(&self.handler);
        let queries: Arc<[DownstreamQuery]> = queries.into();

        self.for_each_query(ctx, queries, move |ctx, qry: &DownstreamQuery| {
            let handler = Arc::clone(&handler);
            let fut = async move {
                let req = qry.to_request();

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    shards = %qry.shards,
                    query = req.query(),
                    step = req.step_ms(),
                    handler = handler.name(),
                    "executing sub-query"
                );

                let resp = handler.execute(&ctx, req).await?;
                response_to_result(resp)
            };

            #[cfg(feature = "tracing")]
            let fut = {
                use tracing::Instrument;
                fut.instrument(tracing::debug_span!("downstream_handler.instance"))
            };

            Box::pin(fut)
        })
        .await
    }

    /// Runs `f` against every query with at most [`Instance::parallelism`]
    /// invocations in flight, returning results such that `output[i]`
    /// belongs to `queries[i]`.
    ///
    /// `f` receives the cancellable scope of this call and should pass it on
    /// to anything it awaits.
    ///
    /// # Errors
    ///
    /// - The first error returned by `f`, in delivery order. With several
    ///   simultaneous failures any one of them may be reported.
    /// - [`Error::Cancelled`] if `ctx` is cancelled before all results were
    ///   collected.
    /// - [`Error::ChannelError`] if a worker died without reporting, e.g.
    ///   because `f` panicked.
    pub async fn for_each_query<Q, R, F>(
        &self,
        ctx: &QueryContext,
        queries: Arc<[Q]>,
        f: F,
    ) -> Result<Vec<R>>
    where
        Q: Send + Sync + 'static,
        R: Send + 'static,
        F: for<'a> Fn(QueryContext, &'a Q) -> BoxFuture<'a, Result<R>> + Send + Sync + 'static,
    {
        let n = queries.len();
        if n == 0 {
            return Ok(Vec::new());
        }

        let ctx = ctx.child();
        // Whatever way this call ends, outstanding work is cancelled.
        let _guard = ctx.cancellation_token().clone().drop_guard();

        let (tx, mut rx) = mpsc::channel::<Tagged<R>>(1);

        tokio::spawn(supervise(
            ctx.clone(),
            Arc::clone(&self.locks),
            queries,
            Arc::new(f),
            tx,
        ));

        let mut results: Vec<Option<R>> = (0..n).map(|_| None).collect();
        for _ in 0..n {
            tokio::select! {
                biased;
                () = ctx.cancelled() => return Err(Error::Cancelled),
                tagged = rx.recv() => match tagged {
                    Some(Tagged { index, result: Ok(res) }) => results[index] = Some(res),
                    Some(Tagged { result: Err(e), .. }) => return Err(e),
                    None => {
                        return Err(Error::ChannelError {
                            context: "result queue closed before all results were collected"
                                .to_string(),
                        });
                    }
                },
            }
        }

        results
            .into_iter()
            .enumerate()
            .map(|(i, res)| {
                res.ok_or_else(|| Error::ChannelError {
                    context: format!("no result collected for sub-query {i}"),
                })
            })
            .collect()
    }
}

/// Acquires a token for each query in order and spawns its worker.
async fn supervise<Q, R, F>(
    ctx: QueryContext,
    locks: Arc<Semaphore>,
    queries: Arc<[Q]>,
    f: Arc<F>,
    tx: mpsc::Sender<Tagged<R>>,
) where
    Q: Send + Sync + 'static,
    R: Send + 'static,
    F: for<'a> Fn(QueryContext, &'a Q) -> BoxFuture<'a, Result<R>> + Send + Sync + 'static,
{
    for index in 0..queries.len() {
        let permit = tokio::select! {
            biased;
            () = ctx.cancelled() => {
                #[cfg(feature = "tracing")]
                tracing::trace!(
                    dispatched = index,
                    total = queries.len(),
                    "fan-out cancelled, no further sub-queries dispatched"
                );
                return;
            }
            permit = Arc::clone(&locks).acquire_owned() => permit,
        };

        let Ok(permit) = permit else {
            let err = Error::ChannelError {
                context: "token pool closed".to_string(),
            };
            publish(&ctx, &tx, Tagged { index, result: Err(err) }).await;
            return;
        };

        tokio::spawn(work(
            index,
            ctx.clone(),
            permit,
            Arc::clone(&queries),
            Arc::clone(&f),
            tx.clone(),
        ));
    }
}

/// Runs one unit of work, returns its token to the pool, then publishes.
async fn work<Q, R, F>(
    index: usize,
    ctx: QueryContext,
    permit: OwnedSemaphorePermit,
    queries: Arc<[Q]>,
    f: Arc<F>,
    tx: mpsc::Sender<Tagged<R>>,
) where
    Q: Send + Sync + 'static,
    R: Send + 'static,
    F: for<'a> Fn(QueryContext, &'a Q) -> BoxFuture<'a, Result<R>> + Send + Sync + 'static,
{
    let result = f(ctx.clone(), &queries[index]).await;
    drop(permit);

    publish(&ctx, &tx, Tagged { index, result }).await;
}

/// Delivers `tagged` to the collector, or drops it once the scope is
/// cancelled.
async fn publish<R>(ctx: &QueryContext, tx: &mpsc::Sender<Tagged<R>>, tagged: Tagged<R>) {
    tokio::select! {
        biased;
        () = ctx.cancelled() => {}
        _ = tx.send(tagged) => {}
    }
}
