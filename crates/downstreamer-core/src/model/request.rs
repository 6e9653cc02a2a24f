use super::params::Direction;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Path tag carried by every range request.
pub const QUERY_RANGE_PATH: &str = "/loki/api/v1/query_range";

/// Path tag carried by every instant request.
pub const INSTANT_QUERY_PATH: &str = "/loki/api/v1/query";

/// Range evaluation over `[start, end]`. Step and interval are in
/// milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RangeRequest {
    pub query: String,
    pub limit: u32,
    pub step_ms: i64,
    pub interval_ms: i64,
    pub start: SystemTime,
    pub end: SystemTime,
    pub direction: Direction,
    pub path: String,
    pub shards: Vec<String>,
}

/// Single evaluation at `time`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstantRequest {
    pub query: String,
    pub limit: u32,
    pub time: SystemTime,
    pub direction: Direction,
    pub path: String,
    pub shards: Vec<String>,
}

/// Wire-shape request handed to the downstream handler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DownstreamRequest {
    Range(RangeRequest),
    Instant(InstantRequest),
}

impl DownstreamRequest {
    /// Replaces the query text, leaving every other field untouched.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        match &mut self {
            Self::Range(r) => r.query = query,
            Self::Instant(r) => r.query = query,
        }
        self
    }

    pub fn query(&self) -> &str {
        match self {
            Self::Range(r) => &r.query,
            Self::Instant(r) => &r.query,
        }
    }

    /// Step in milliseconds; always zero for instant requests.
    pub const fn step_ms(&self) -> i64 {
        match self {
            Self::Range(r) => r.step_ms,
            Self::Instant(_) => 0,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Range(r) => &r.path,
            Self::Instant(r) => &r.path,
        }
    }

    pub fn shards(&self) -> &[String] {
        match self {
            Self::Range(r) => &r.shards,
            Self::Instant(r) => &r.shards,
        }
    }

    pub const fn limit(&self) -> u32 {
        match self {
            Self::Range(r) => r.limit,
            Self::Instant(r) => r.limit,
        }
    }

    pub const fn direction(&self) -> Direction {
        match self {
            Self::Range(r) => r.direction,
            Self::Instant(r) => r.direction,
        }
    }

    pub const fn is_instant(&self) -> bool {
        matches!(self, Self::Instant(_))
    }
}
