use super::response::{Header, Label, LogStream};
use serde::{Deserialize, Serialize};

/// Aggregated execution figures reported by the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Summary {
    pub bytes_processed_per_second: i64,
    pub lines_processed_per_second: i64,
    pub total_bytes_processed: i64,
    pub total_lines_processed: i64,
    pub total_entries_returned: i64,
    /// Execution time in seconds.
    pub exec_time: f64,
    /// Time spent queued in seconds.
    pub queue_time: f64,
    pub subqueries: i64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
    pub summary: Summary,
}

impl Statistics {
    /// Folds `other` into `self`. Totals are summed and throughput is
    /// recomputed from the combined totals.
    pub fn merge(&mut self, other: &Self) {
        let s = &mut self.summary;
        let o = &other.summary;

        s.total_bytes_processed += o.total_bytes_processed;
        s.total_lines_processed += o.total_lines_processed;
        s.total_entries_returned += o.total_entries_returned;
        s.exec_time += o.exec_time;
        s.queue_time += o.queue_time;
        s.subqueries += o.subqueries;

        if s.exec_time > 0.0 {
            s.bytes_processed_per_second = (s.total_bytes_processed as f64 / s.exec_time) as i64;
            s.lines_processed_per_second = (s.total_lines_processed as f64 / s.exec_time) as i64;
        }
    }
}

/// A point in time and its value. `t` is in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub t: i64,
    pub v: f64,
}

/// One element of an instant vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorSample {
    pub metric: Vec<Label>,
    pub point: Point,
}

/// One series of a range matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub metric: Vec<Label>,
    pub points: Vec<Point>,
}

/// Payload of a [`QueryResult`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result_type", content = "result", rename_all = "lowercase")]
pub enum ResultValue {
    Streams(Vec<LogStream>),
    Vector(Vec<VectorSample>),
    Matrix(Vec<Series>),
}

impl ResultValue {
    /// Number of top-level elements (streams, vector samples, or series).
    pub fn len(&self) -> usize {
        match self {
            Self::Streams(xs) => xs.len(),
            Self::Vector(xs) => xs.len(),
            Self::Matrix(xs) => xs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResultValue {
    fn default() -> Self {
        Self::Streams(Vec::new())
    }
}

/// Uniform result of one sub-query, independent of the backend's wire shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub statistics: Statistics,
    pub data: ResultValue,
    pub headers: Vec<Header>,
}
