use async_trait::async_trait;
use core::time::Duration;
use downstreamer::{
    Error, Handler, QueryContext, Result,
    downstreamer_core::model::{
        Direction, DownstreamRequest, DownstreamResponse, Entry, Header, Label, LogStream,
        PrometheusResponse, ResultType, STATUS_ERROR, STATUS_SUCCESS, Sample, SampleStream,
        SamplesData, SamplesResponse, Shards, Statistics, StreamsData, StreamsResponse, Summary,
    },
};
use portable_atomic::{AtomicUsize, Ordering};
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Levels every simulated series is split by.
const LEVELS: [&str; 2] = ["info", "error"];

/// Upper bound on log lines produced per sub-query, before `limit`.
const MAX_LINES: usize = 8;

/// In-process stand-in for a querier.
///
/// Answers every request after a random latency drawn from
/// `[min_latency, max_latency]`, abandoning the wait as soon as the request
/// scope is cancelled. Responses are deterministic functions of the request.
#[derive(Debug)]
pub struct SimulatedBackend {
    min_latency_ms: u64,
    max_latency_ms: u64,
    fail_shard: Option<u32>,
    logs: bool,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SimulatedBackend {
    pub fn new(min_latency: Duration, max_latency: Duration) -> Self {
        let min_latency_ms = u64::try_from(min_latency.as_millis()).unwrap_or(u64::MAX);
        let max_latency_ms = u64::try_from(max_latency.as_millis()).unwrap_or(u64::MAX);
        Self {
            min_latency_ms,
            max_latency_ms: max_latency_ms.max(min_latency_ms),
            fail_shard: None,
            logs: false,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Answers requests touching `shard` with an error response.
    #[must_use]
    pub const fn with_failing_shard(mut self, shard: Option<u32>) -> Self {
        self.fail_shard = shard;
        self
    }

    /// Produces log-stream responses instead of sample-stream ones.
    #[must_use]
    pub const fn with_logs(mut self, logs: bool) -> Self {
        self.logs = logs;
        self
    }

    /// Requests received so far, including abandoned ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Highest number of requests observed executing at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::Relaxed)
    }

    fn latency(&self) -> Duration {
        let ms = rand::rng().random_range(self.min_latency_ms..=self.max_latency_ms);
        Duration::from_millis(ms)
    }

    fn respond(
        &self,
        req: &DownstreamRequest,
        shards: &Shards,
        latency: Duration,
    ) -> DownstreamResponse {
        let shard_label = req.shards().join(",");
        let headers = vec![Header {
            name: "X-Sim-Shards".to_string(),
            values: req.shards().to_vec(),
        }];

        let failed = self
            .fail_shard
            .is_some_and(|fail| shards.iter().any(|s| s.shard == fail));
        let (status, error_type, error) = if failed {
            (
                STATUS_ERROR.to_string(),
                "internal".to_string(),
                format!("shard {shard_label} unavailable"),
            )
        } else {
            (STATUS_SUCCESS.to_string(), String::new(), String::new())
        };

        // Deterministic per-shard magnitude.
        let weight = shards.iter().next().map_or(1, |s| s.shard + 1);
        let timestamps = timestamps(req);

        if self.logs {
            let result: Vec<LogStream> = if failed {
                Vec::new()
            } else {
                LEVELS
                    .iter()
                    .map(|level| LogStream {
                        labels: format!(
                            "{{app=\"api\", level=\"{level}\", shard=\"{shard_label}\"}}"
                        ),
                        entries: timestamps
                            .iter()
                            .take(MAX_LINES.min(req.limit() as usize))
                            .map(|&ts| Entry {
                                timestamp: ts,
                                line: format!("level={level} shard={shard_label} weight={weight}"),
                            })
                            .collect(),
                    })
                    .collect()
            };

            let lines: usize = result.iter().map(|s| s.entries.len()).sum();
            let bytes: usize = result
                .iter()
                .flat_map(|s| &s.entries)
                .map(|e| e.line.len())
                .sum();

            DownstreamResponse::Streams(StreamsResponse {
                status,
                data: StreamsData {
                    result_type: ResultType::Streams,
                    result,
                },
                error_type,
                error,
                direction: req.direction(),
                limit: req.limit(),
                statistics: statistics(lines, bytes, latency),
                headers,
            })
        } else {
            let result: Vec<SampleStream> = if failed {
                Vec::new()
            } else {
                LEVELS
                    .iter()
                    .enumerate()
                    .map(|(i, level)| SampleStream {
                        labels: vec![
                            Label::new("level", *level),
                            Label::new("shard", shard_label.clone()),
                        ],
                        samples: timestamps
                            .iter()
                            .map(|&ts| Sample {
                                timestamp_ms: millis(ts),
                                value: f64::from(weight) * (i as f64 + 1.0),
                            })
                            .collect(),
                    })
                    .collect()
            };

            let points: usize = result.iter().map(|s| s.samples.len()).sum();
            let result_type = if req.is_instant() {
                ResultType::Vector
            } else {
                ResultType::Matrix
            };

            DownstreamResponse::Samples(SamplesResponse {
                response: PrometheusResponse {
                    status,
                    data: SamplesData {
                        result_type,
                        result,
                    },
                    error_type,
                    error,
                },
                statistics: statistics(points, points * 16, latency),
                headers,
            })
        }
    }
}

#[async_trait]
impl Handler for SimulatedBackend {
    async fn execute(
        &self,
        ctx: &QueryContext,
        req: DownstreamRequest,
    ) -> Result<DownstreamResponse> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let _in_flight = InFlight::enter(self);

        let shards = Shards::parse(req.shards())?;
        let latency = self.latency();

        tokio::select! {
            biased;
            () = ctx.cancelled() => return Err(Error::Cancelled),
            () = tokio::time::sleep(latency) => {}
        }

        Ok(self.respond(&req, &shards, latency))
    }

    fn name(&self) -> &'static str {
        "SimulatedBackend"
    }
}

/// Tracks one executing request for the in-flight gauge.
struct InFlight<'a>(&'a SimulatedBackend);

impl<'a> InFlight<'a> {
    fn enter(backend: &'a SimulatedBackend) -> Self {
        let now = backend.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        backend.max_in_flight.fetch_max(now, Ordering::AcqRel);
        Self(backend)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Evaluation timestamps of `req`: every step of a range, newest first when
/// the direction is backward, or the single instant.
fn timestamps(req: &DownstreamRequest) -> Vec<SystemTime> {
    match req {
        DownstreamRequest::Instant(r) => vec![r.time],
        DownstreamRequest::Range(r) => {
            let step = Duration::from_millis(u64::try_from(r.step_ms).unwrap_or(0));
            if step.is_zero() {
                return vec![r.start];
            }

            let mut out = Vec::new();
            let mut ts = r.start;
            while ts <= r.end {
                out.push(ts);
                ts += step;
            }
            if r.direction == Direction::Backward {
                out.reverse();
            }
            out
        }
    }
}

fn statistics(lines: usize, bytes: usize, latency: Duration) -> Statistics {
    let lines = i64::try_from(lines).unwrap_or(i64::MAX);
    let bytes = i64::try_from(bytes).unwrap_or(i64::MAX);
    let exec_time = latency.as_secs_f64();
    let mut summary = Summary {
        total_bytes_processed: bytes,
        total_lines_processed: lines,
        total_entries_returned: lines,
        exec_time,
        subqueries: 1,
        ..Summary::default()
    };
    if exec_time > 0.0 {
        summary.bytes_processed_per_second = (bytes as f64 / exec_time) as i64;
        summary.lines_processed_per_second = (lines as f64 / exec_time) as i64;
    }
    Statistics { summary }
}

fn millis(ts: SystemTime) -> i64 {
    ts.duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}
