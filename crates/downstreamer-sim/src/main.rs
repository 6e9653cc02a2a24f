#![doc = include_str!("../README.md")]

mod backend;
mod config;
mod telemetry;

use anyhow::Context;
use backend::SimulatedBackend;
use clap::Parser;
use config::{CliArgs, SimConfig};
use downstreamer::{
    DownstreamHandler, DownstreamQuery, QueryContext, TenantLimits,
    downstreamer_core::model::{LiteralParams, Params, QueryResult, ResultValue, Shard, Statistics},
};
use std::{
    sync::Arc,
    time::{Instant, SystemTime},
};
use telemetry::{
    increment_fanout_errors, increment_subqueries, init_telemetry, record_fanout_duration,
    record_parallelism,
};
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = SimConfig::try_from(args)?;

    let providers = init_telemetry()?;
    let res = run(config).await;
    providers.shutdown();
    res
}

async fn run(config: SimConfig) -> anyhow::Result<()> {
    let limits = load_limits(&config)?;
    let backend = Arc::new(
        SimulatedBackend::new(config.min_latency, config.max_latency)
            .with_failing_shard(config.fail_shard)
            .with_logs(config.logs),
    );
    let factory = DownstreamHandler::new(Arc::new(limits), backend.clone());

    let ctx = QueryContext::new().with_org_id(config.org_id.as_str());
    let instance = factory.downstreamer(&ctx);
    record_parallelism(instance.parallelism() as u64);
    log_startup_info(&config, instance.parallelism());

    let queries = split_query(&config, SystemTime::now());
    increment_subqueries(queries.len() as u64);

    // Ctrl+C / SIGTERM cancel the query scope; the fan-out reports it.
    let watcher = tokio::spawn({
        let ctx = ctx.clone();
        async move {
            shutdown_signal().await;
            ctx.cancel();
        }
    });

    let started = Instant::now();
    let outcome = instance.downstream(&ctx, queries).await;
    let elapsed = started.elapsed();
    watcher.abort();
    record_fanout_duration(elapsed.as_secs_f64() * 1000.0);

    let results = match outcome {
        Ok(results) => results,
        Err(e) => {
            increment_fanout_errors();
            #[cfg(feature = "tracing")]
            tracing::error!(
                calls = backend.calls(),
                elapsed_ms = elapsed.as_millis() as u64,
                "fan-out failed: {e}"
            );
            return Err(e).context("fan-out failed");
        }
    };

    let stats = merge_statistics(&results);

    #[cfg(feature = "tracing")]
    tracing::info!(
        sub_queries = results.len(),
        elements = results.iter().map(|r| r.data.len()).sum::<usize>(),
        max_in_flight = backend.max_in_flight(),
        elapsed_ms = elapsed.as_millis() as u64,
        "fan-out complete"
    );

    println!("{}", serde_json::to_string_pretty(&Summary::new(&results, &stats))?);
    Ok(())
}

/// Reads the limits document, or falls back to a uniform per-tenant bound.
fn load_limits(config: &SimConfig) -> anyhow::Result<TenantLimits> {
    let Some(path) = &config.limits_file else {
        return Ok(TenantLimits::new(config.max_query_parallelism));
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read limits file {}", path.display()))?;
    TenantLimits::from_json(&raw)
        .with_context(|| format!("invalid limits file {}", path.display()))
}

/// Splits the configured query into `interval_splits` consecutive time
/// ranges, each sharded `shards` ways. Sub-queries are ordered by interval,
/// then by shard.
fn split_query(config: &SimConfig, now: SystemTime) -> Vec<DownstreamQuery> {
    let intervals: Vec<Arc<dyn Params>> = if config.instant {
        let params = LiteralParams::instant(config.query.as_str(), now, config.limit);
        vec![Arc::new(params) as Arc<dyn Params>]
    } else {
        let start = now - config.range;
        let width = config.range / config.interval_splits;
        (0..config.interval_splits)
            .map(|i| {
                let from = start + width * i;
                let to = if i + 1 == config.interval_splits {
                    now
                } else {
                    from + width
                };
                Arc::new(LiteralParams::range(
                    config.query.as_str(),
                    from,
                    to,
                    config.step,
                    config.limit,
                )) as Arc<dyn Params>
            })
            .collect()
    };

    intervals
        .iter()
        .flat_map(|params| {
            (0..config.shards).map(move |shard| {
                DownstreamQuery::new(
                    config.query.clone(),
                    Arc::clone(params),
                    vec![Shard::new(shard, config.shards)].into(),
                )
            })
        })
        .collect()
}

fn merge_statistics(results: &[QueryResult]) -> Statistics {
    results.iter().fold(Statistics::default(), |mut acc, r| {
        acc.merge(&r.statistics);
        acc
    })
}

/// What a run prints on success.
#[derive(Debug, serde::Serialize)]
struct Summary<'a> {
    sub_queries: usize,
    streams: usize,
    vector_samples: usize,
    series: usize,
    statistics: &'a Statistics,
}

impl<'a> Summary<'a> {
    fn new(results: &[QueryResult], statistics: &'a Statistics) -> Self {
        let (mut streams, mut vector_samples, mut series) = (0, 0, 0);
        for r in results {
            match &r.data {
                ResultValue::Streams(xs) => streams += xs.len(),
                ResultValue::Vector(xs) => vector_samples += xs.len(),
                ResultValue::Matrix(xs) => series += xs.len(),
            }
        }
        Self {
            sub_queries: results.len(),
            streams,
            vector_samples,
            series,
            statistics,
        }
    }
}

fn log_startup_info(_config: &SimConfig, _parallelism: usize) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Dispatching {} sub-queries with parallelism {} and full config: {:#?}",
            _config.sub_queries(),
            _parallelism,
            _config
        );
    } else {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Dispatching {} sub-queries with parallelism {}",
            _config.sub_queries(),
            _parallelism
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("failed to install SIGTERM handler: {_e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(_e) = signal::ctrl_c().await {
            #[cfg(feature = "tracing")]
            tracing::warn!("failed to install Ctrl+C handler: {_e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received Ctrl+C signal, cancelling query");
        },
        () = terminate => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received SIGTERM signal, cancelling query");
        },
    }
}
