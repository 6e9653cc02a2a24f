use super::{params::Direction, result::Statistics};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Status string reported by a backend that answered successfully.
pub const STATUS_SUCCESS: &str = "success";

/// Status string reported by a backend that answered with an error.
pub const STATUS_ERROR: &str = "error";

/// A single label pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A response header and all of its values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub values: Vec<String>,
}

/// One log line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub timestamp: SystemTime,
    pub line: String,
}

/// A label-stream and its entries, in backend order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStream {
    /// Label set in its canonical `{k="v", ...}` string form.
    pub labels: String,
    pub entries: Vec<Entry>,
}

/// One sample point, timestamp in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp_ms: i64,
    pub value: f64,
}

/// A series of samples sharing one label set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleStream {
    pub labels: Vec<Label>,
    pub samples: Vec<Sample>,
}

/// Declared shape of a response's payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    Streams,
    Vector,
    Matrix,
    Scalar,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamsData {
    pub result_type: ResultType,
    pub result: Vec<LogStream>,
}

/// Log-stream response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamsResponse {
    pub status: String,
    pub data: StreamsData,
    #[serde(default)]
    pub error_type: String,
    #[serde(default)]
    pub error: String,
    pub direction: Direction,
    pub limit: u32,
    #[serde(default)]
    pub statistics: Statistics,
    #[serde(default)]
    pub headers: Vec<Header>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplesData {
    pub result_type: ResultType,
    pub result: Vec<SampleStream>,
}

/// Prometheus-style payload embedded in a [`SamplesResponse`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrometheusResponse {
    pub status: String,
    pub data: SamplesData,
    #[serde(default)]
    pub error_type: String,
    #[serde(default)]
    pub error: String,
}

/// Sample-stream response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplesResponse {
    pub response: PrometheusResponse,
    #[serde(default)]
    pub statistics: Statistics,
    #[serde(default)]
    pub headers: Vec<Header>,
}

/// Response to a series lookup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesResponse {
    pub status: String,
    pub data: Vec<Vec<Label>>,
    #[serde(default)]
    pub headers: Vec<Header>,
}

/// Response to a label names lookup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelNamesResponse {
    pub status: String,
    pub data: Vec<String>,
    #[serde(default)]
    pub headers: Vec<Header>,
}

/// Every response shape a downstream handler can produce.
///
/// Only [`DownstreamResponse::Streams`] and [`DownstreamResponse::Samples`]
/// carry query results; the remaining kinds are answers to metadata requests
/// and cannot be turned into a query result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DownstreamResponse {
    Streams(StreamsResponse),
    Samples(SamplesResponse),
    Series(SeriesResponse),
    LabelNames(LabelNamesResponse),
}

impl DownstreamResponse {
    /// Stable name of the response kind, used in error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Streams(_) => "streams",
            Self::Samples(_) => "samples",
            Self::Series(_) => "series",
            Self::LabelNames(_) => "label_names",
        }
    }

    pub fn headers(&self) -> &[Header] {
        match self {
            Self::Streams(r) => &r.headers,
            Self::Samples(r) => &r.headers,
            Self::Series(r) => &r.headers,
            Self::LabelNames(r) => &r.headers,
        }
    }
}
