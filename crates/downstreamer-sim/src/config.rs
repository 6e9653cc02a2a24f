use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use std::path::PathBuf;

/// Runtime configuration for the `downstreamer-sim` binary.
///
/// Describes one top-level query, how it is split into sub-queries, and how
/// the simulated backend behaves while answering them. All values are parsed
/// from CLI arguments or environment variables (a `.env` file is honored).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "downstreamer-sim",
    version,
    about = "Fans a sharded query out to a simulated backend"
)]
pub struct CliArgs {
    /// Org id attached to the query context. Several tenants may be joined
    /// with `|`, in which case the default parallelism applies.
    ///
    /// Environment variable: `ORG_ID`
    #[arg(long, env = "ORG_ID", default_value_t = String::from("fake"))]
    pub org_id: String,

    /// Query text evaluated by every sub-query.
    ///
    /// Environment variable: `QUERY`
    #[arg(
        long,
        env = "QUERY",
        default_value_t = String::from("sum by (level) (count_over_time({app=\"api\"}[1m]))")
    )]
    pub query: String,

    /// Number of label shards each interval is split into.
    ///
    /// Environment variable: `SHARDS`
    #[arg(long, env = "SHARDS", default_value_t = 16)]
    pub shards: u32,

    /// Number of equal time intervals the range is split into. Must be 1 for
    /// instant queries.
    ///
    /// Environment variable: `INTERVAL_SPLITS`
    #[arg(long, env = "INTERVAL_SPLITS", default_value_t = 1)]
    pub interval_splits: u32,

    /// Evaluate at a single instant instead of over a range.
    #[arg(long, default_value_t = false)]
    pub instant: bool,

    /// Return log lines instead of samples.
    #[arg(long, default_value_t = false)]
    pub logs: bool,

    /// Length of the evaluated range, ending now.
    ///
    /// Environment variable: `RANGE_SECS`
    #[arg(long, env = "RANGE_SECS", default_value_t = 3600)]
    pub range_secs: u64,

    /// Evaluation step of range queries.
    ///
    /// Environment variable: `STEP_SECS`
    #[arg(long, env = "STEP_SECS", default_value_t = 60)]
    pub step_secs: u64,

    /// Maximum number of entries per sub-query.
    ///
    /// Environment variable: `LIMIT`
    #[arg(long, env = "LIMIT", default_value_t = 1000)]
    pub limit: u32,

    /// Lower bound of the simulated backend latency.
    ///
    /// Environment variable: `MIN_LATENCY_MS`
    #[arg(long, env = "MIN_LATENCY_MS", default_value_t = 5)]
    pub min_latency_ms: u64,

    /// Upper bound of the simulated backend latency.
    ///
    /// Environment variable: `MAX_LATENCY_MS`
    #[arg(long, env = "MAX_LATENCY_MS", default_value_t = 50)]
    pub max_latency_ms: u64,

    /// Make the backend answer every sub-query of this shard with an error.
    ///
    /// Environment variable: `FAIL_SHARD`
    #[arg(long, env = "FAIL_SHARD")]
    pub fail_shard: Option<u32>,

    /// JSON document with the default parallelism and per-tenant overrides.
    /// Takes precedence over `MAX_QUERY_PARALLELISM`.
    ///
    /// Environment variable: `LIMITS_FILE`
    #[arg(long, env = "LIMITS_FILE")]
    pub limits_file: Option<PathBuf>,

    /// Per-tenant parallelism used when no limits file is given.
    ///
    /// Environment variable: `MAX_QUERY_PARALLELISM`
    #[arg(long, env = "MAX_QUERY_PARALLELISM", default_value_t = 32)]
    pub max_query_parallelism: i64,
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub org_id: String,
    pub query: String,
    pub shards: u32,
    pub interval_splits: u32,
    pub instant: bool,
    pub logs: bool,
    pub range: Duration,
    pub step: Duration,
    pub limit: u32,
    pub min_latency: Duration,
    pub max_latency: Duration,
    pub fail_shard: Option<u32>,
    pub limits_file: Option<PathBuf>,
    pub max_query_parallelism: i64,
}

impl SimConfig {
    /// Total number of sub-queries the top-level query is split into.
    pub const fn sub_queries(&self) -> usize {
        self.shards as usize * self.interval_splits as usize
    }
}

impl TryFrom<CliArgs> for SimConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.shards == 0 {
            bail!("SHARDS must be greater than 0");
        }

        if args.interval_splits == 0 {
            bail!("INTERVAL_SPLITS must be greater than 0");
        }

        if args.instant && args.interval_splits > 1 {
            bail!(
                "INTERVAL_SPLITS ({}) must be 1 for instant queries",
                args.interval_splits
            );
        }

        if !args.instant {
            if args.step_secs == 0 {
                bail!("STEP_SECS must be greater than 0 for range queries");
            }
            if args.range_secs < u64::from(args.interval_splits) * args.step_secs {
                bail!(
                    "RANGE_SECS ({}) is too short for {} intervals of at least one step ({}s)",
                    args.range_secs,
                    args.interval_splits,
                    args.step_secs
                );
            }
        }

        if args.min_latency_ms > args.max_latency_ms {
            bail!(
                "MIN_LATENCY_MS ({}) exceeds MAX_LATENCY_MS ({})",
                args.min_latency_ms,
                args.max_latency_ms
            );
        }

        if let Some(shard) = args.fail_shard.filter(|&s| s >= args.shards) {
            bail!(
                "FAIL_SHARD ({}) is out of range for {} shards",
                shard,
                args.shards
            );
        }

        Ok(Self {
            org_id: args.org_id,
            query: args.query,
            shards: args.shards,
            interval_splits: args.interval_splits,
            instant: args.instant,
            logs: args.logs,
            range: Duration::from_secs(args.range_secs),
            step: if args.instant {
                Duration::ZERO
            } else {
                Duration::from_secs(args.step_secs)
            },
            limit: args.limit,
            min_latency: Duration::from_millis(args.min_latency_ms),
            max_latency: Duration::from_millis(args.max_latency_ms),
            fail_shard: args.fail_shard,
            limits_file: args.limits_file,
            max_query_parallelism: args.max_query_parallelism,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> anyhow::Result<SimConfig> {
        let args = CliArgs::try_parse_from(
            ["downstreamer-sim"].iter().chain(extra.iter()).copied(),
        )?;
        SimConfig::try_from(args)
    }

    #[test]
    fn defaults_are_valid() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.sub_queries(), 16);
        assert_eq!(config.step, Duration::from_secs(60));
        assert!(!config.instant);
    }

    #[test]
    fn instant_queries_have_no_step() {
        let config = parse(&["--instant"]).unwrap();
        assert_eq!(config.step, Duration::ZERO);
    }

    #[test]
    fn rejects_inconsistent_arguments() {
        assert!(parse(&["--shards", "0"]).is_err());
        assert!(parse(&["--interval-splits", "0"]).is_err());
        assert!(parse(&["--instant", "--interval-splits", "2"]).is_err());
        assert!(parse(&["--step-secs", "0"]).is_err());
        assert!(parse(&["--range-secs", "60", "--interval-splits", "4"]).is_err());
        assert!(parse(&["--min-latency-ms", "10", "--max-latency-ms", "5"]).is_err());
        assert!(parse(&["--shards", "4", "--fail-shard", "4"]).is_err());
    }

    #[test]
    fn counts_every_interval_and_shard() {
        let config = parse(&["--shards", "8", "--interval-splits", "3"]).unwrap();
        assert_eq!(config.sub_queries(), 24);
    }
}
