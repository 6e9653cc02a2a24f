use async_trait::async_trait;
use core::{hint::black_box, time::Duration};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use downstreamer::{
    DownstreamQuery, Handler, Instance, QueryContext, Result,
    downstreamer_core::model::{
        DownstreamRequest, DownstreamResponse, LiteralParams, Params, PrometheusResponse,
        ResultType, STATUS_SUCCESS, SamplesData, SamplesResponse, Shard, Statistics,
    },
};
use futures::FutureExt;
use std::{
    sync::Arc,
    time::{Instant, UNIX_EPOCH},
};
use tokio::runtime::Builder;

const TOTAL_QUERIES: usize = 4096;

/// Answers immediately with an empty matrix.
struct NoopHandler;

#[async_trait]
impl Handler for NoopHandler {
    async fn execute(
        &self,
        _ctx: &QueryContext,
        _req: DownstreamRequest,
    ) -> Result<DownstreamResponse> {
        Ok(DownstreamResponse::Samples(SamplesResponse {
            response: PrometheusResponse {
                status: STATUS_SUCCESS.to_string(),
                data: SamplesData {
                    result_type: ResultType::Matrix,
                    result: Vec::new(),
                },
                error_type: String::new(),
                error: String::new(),
            },
            statistics: Statistics::default(),
            headers: Vec::new(),
        }))
    }
}

fn sharded_queries(of: u32) -> Arc<[DownstreamQuery]> {
    let start = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    let params: Arc<dyn Params> = Arc::new(LiteralParams::range(
        "sum(rate({app=\"foo\"}[1m]))",
        start,
        start + Duration::from_secs(3600),
        Duration::from_secs(15),
        1000,
    ));
    (0..of)
        .map(|i| {
            DownstreamQuery::new(
                "sum(rate({app=\"foo\"}[1m]))",
                Arc::clone(&params),
                vec![Shard::new(i, of)].into(),
            )
        })
        .collect()
}

/// Raw dispatcher overhead: a trivial unit of work per sub-query.
fn bench_for_each_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("for_each_query");
    group.sample_size(10);
    group.sampling_mode(criterion::SamplingMode::Flat);

    for parallelism in [1, 8, 32, 128, 512] {
        group.throughput(Throughput::Elements(TOTAL_QUERIES as u64));
        group.bench_function(
            format!("elems/{}/parallelism/{}", TOTAL_QUERIES, parallelism),
            |b| {
                let rt = Builder::new_multi_thread().enable_all().build().unwrap();
                let instance = Instance::new(parallelism, Arc::new(NoopHandler));
                let queries: Arc<[usize]> = (0..TOTAL_QUERIES).collect();

                b.to_async(&rt).iter_custom(|iters| {
                    let instance = instance.clone();
                    let queries = Arc::clone(&queries);
                    async move {
                        let ctx = QueryContext::new();
                        let start = Instant::now();
                        for _ in 0..iters {
                            let results = instance
                                .for_each_query(&ctx, Arc::clone(&queries), |_ctx, &i| {
                                    async move { Ok(i) }.boxed()
                                })
                                .await
                                .unwrap();
                            black_box(results);
                        }
                        start.elapsed()
                    }
                });
            },
        );
    }

    group.finish();
}

/// Full path: request translation, handler call and response translation.
fn bench_downstream(c: &mut Criterion) {
    let mut group = c.benchmark_group("downstream");
    group.sample_size(10);
    group.sampling_mode(criterion::SamplingMode::Flat);

    let queries = sharded_queries(TOTAL_QUERIES as u32);

    for parallelism in [1, 32, 128] {
        group.throughput(Throughput::Elements(TOTAL_QUERIES as u64));
        group.bench_function(
            format!("elems/{}/parallelism/{}", TOTAL_QUERIES, parallelism),
            |b| {
                let rt = Builder::new_multi_thread().enable_all().build().unwrap();
                let instance = Instance::new(parallelism, Arc::new(NoopHandler));

                b.to_async(&rt).iter_custom(|iters| {
                    let instance = instance.clone();
                    let queries = Arc::clone(&queries);
                    async move {
                        let ctx = QueryContext::new();
                        let start = Instant::now();
                        for _ in 0..iters {
                            let results = instance
                                .downstream(&ctx, Arc::clone(&queries))
                                .await
                                .unwrap();
                            black_box(results);
                        }
                        start.elapsed()
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_for_each_query, bench_downstream);
criterion_main!(benches);
