use core::time::Duration;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Order in which log entries are returned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    #[default]
    Backward,
}

/// Whether a set of parameters describes a single evaluation or a range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeType {
    Instant,
    Range,
}

/// Logical query parameters shared by every sharded variant of a query.
///
/// Shards are not part of the parameters; one parameter object serves every
/// shard of a base query.
pub trait Params: Send + Sync {
    fn query(&self) -> &str;
    fn start(&self) -> SystemTime;
    fn end(&self) -> SystemTime;
    fn step(&self) -> Duration;
    fn interval(&self) -> Duration;
    fn direction(&self) -> Direction;
    fn limit(&self) -> u32;

    /// A query is instant when it covers a single point in time and has no
    /// step.
    fn range_type(&self) -> RangeType {
        if self.start() == self.end() && self.step().is_zero() {
            RangeType::Instant
        } else {
            RangeType::Range
        }
    }
}

/// Plain, immutable implementation of [`Params`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiteralParams {
    pub query: String,
    pub start: SystemTime,
    pub end: SystemTime,
    pub step: Duration,
    pub interval: Duration,
    pub direction: Direction,
    pub limit: u32,
}

impl LiteralParams {
    /// Parameters for an instant evaluation at `ts`.
    pub fn instant(query: impl Into<String>, ts: SystemTime, limit: u32) -> Self {
        Self {
            query: query.into(),
            start: ts,
            end: ts,
            step: Duration::ZERO,
            interval: Duration::ZERO,
            direction: Direction::default(),
            limit,
        }
    }

    /// Parameters for a range evaluation over `[start, end]`.
    pub fn range(
        query: impl Into<String>,
        start: SystemTime,
        end: SystemTime,
        step: Duration,
        limit: u32,
    ) -> Self {
        Self {
            query: query.into(),
            start,
            end,
            step,
            interval: Duration::ZERO,
            direction: Direction::default(),
            limit,
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub const fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }
}

impl Params for LiteralParams {
    fn query(&self) -> &str {
        &self.query
    }

    fn start(&self) -> SystemTime {
        self.start
    }

    fn end(&self) -> SystemTime {
        self.end
    }

    fn step(&self) -> Duration {
        self.step
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn limit(&self) -> u32 {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    #[test]
    fn classifies_instant_and_range() {
        let t0 = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let instant = LiteralParams::instant("rate({app=\"foo\"}[1m])", t0, 100);
        assert_eq!(instant.range_type(), RangeType::Instant);

        let range = LiteralParams::range(
            "{app=\"foo\"}",
            t0,
            t0 + Duration::from_secs(60),
            Duration::from_secs(1),
            100,
        );
        assert_eq!(range.range_type(), RangeType::Range);

        // Same start and end but a step still means a range evaluation.
        let stepped = LiteralParams::range("{app=\"foo\"}", t0, t0, Duration::from_secs(1), 100);
        assert_eq!(stepped.range_type(), RangeType::Range);
    }

    #[test]
    fn direction_deserializes_lowercase() {
        let d: Direction = serde_json::from_str("\"forward\"").unwrap();
        assert_eq!(d, Direction::Forward);
        assert_eq!(Direction::default(), Direction::Backward);
    }
}
