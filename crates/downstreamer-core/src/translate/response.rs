use crate::{
    error::{Error, Result},
    model::{
        DownstreamResponse, Point, QueryResult, ResultType, ResultValue, SampleStream, Series,
        VectorSample,
    },
};

/// Converts a downstream response into the uniform [`QueryResult`].
///
/// # Errors
///
/// - [`Error::Downstream`] if the response carries an error message.
/// - [`Error::EmptySeries`] if a vector-shaped response has a series with no
///   sample.
/// - [`Error::UnsupportedResponse`] for response kinds that do not carry query
///   results.
pub fn response_to_result(resp: DownstreamResponse) -> Result<QueryResult> {
    match resp {
        DownstreamResponse::Streams(r) => {
            check_error(r.error_type, r.error)?;
            Ok(QueryResult {
                statistics: r.statistics,
                data: ResultValue::Streams(r.data.result),
                headers: r.headers,
            })
        }
        DownstreamResponse::Samples(r) => {
            check_error(r.response.error_type, r.response.error)?;
            let data = if r.response.data.result_type == ResultType::Vector {
                ResultValue::Vector(sample_streams_to_vector(r.response.data.result)?)
            } else {
                ResultValue::Matrix(sample_streams_to_matrix(r.response.data.result))
            };
            Ok(QueryResult {
                statistics: r.statistics,
                data,
                headers: r.headers,
            })
        }
        other @ (DownstreamResponse::Series(_) | DownstreamResponse::LabelNames(_)) => {
            Err(Error::UnsupportedResponse { kind: other.kind() })
        }
    }
}

fn check_error(error_type: String, message: String) -> Result<()> {
    if message.is_empty() {
        return Ok(());
    }
    Err(Error::Downstream {
        error_type,
        message,
    })
}

/// Builds an instant vector: one entry per stream, holding the stream's first
/// sample.
///
/// # Errors
///
/// Returns [`Error::EmptySeries`] if a stream has no samples.
pub fn sample_streams_to_vector(streams: Vec<SampleStream>) -> Result<Vec<VectorSample>> {
    streams
        .into_iter()
        .map(|stream| {
            let Some(first) = stream.samples.first() else {
                return Err(Error::EmptySeries {
                    labels: format_labels(&stream),
                });
            };
            Ok(VectorSample {
                point: Point {
                    t: first.timestamp_ms,
                    v: first.value,
                },
                metric: stream.labels,
            })
        })
        .collect()
}

/// Builds a range matrix: one series per stream with every sample, in order.
pub fn sample_streams_to_matrix(streams: Vec<SampleStream>) -> Vec<Series> {
    streams
        .into_iter()
        .map(|stream| Series {
            points: stream
                .samples
                .iter()
                .map(|s| Point {
                    t: s.timestamp_ms,
                    v: s.value,
                })
                .collect(),
            metric: stream.labels,
        })
        .collect()
}

fn format_labels(stream: &SampleStream) -> String {
    let pairs: Vec<String> = stream
        .labels
        .iter()
        .map(|l| format!("{}={:?}", l.name, l.value))
        .collect();
    format!("{{{}}}", pairs.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Direction, Entry, Header, Label, LabelNamesResponse, LogStream, PrometheusResponse,
        STATUS_ERROR, STATUS_SUCCESS, Sample, SamplesData, SamplesResponse, SeriesResponse,
        Statistics, StreamsData, StreamsResponse, Summary,
    };
    use std::time::{Duration, UNIX_EPOCH};

    fn stream(app: &str, samples: &[(i64, f64)]) -> SampleStream {
        SampleStream {
            labels: vec![Label::new("app", app), Label::new("env", "prod")],
            samples: samples
                .iter()
                .map(|&(timestamp_ms, value)| Sample {
                    timestamp_ms,
                    value,
                })
                .collect(),
        }
    }

    fn samples_response(result_type: ResultType, result: Vec<SampleStream>) -> DownstreamResponse {
        DownstreamResponse::Samples(SamplesResponse {
            response: PrometheusResponse {
                status: STATUS_SUCCESS.to_string(),
                data: SamplesData {
                    result_type,
                    result,
                },
                error_type: String::new(),
                error: String::new(),
            },
            statistics: Statistics {
                summary: Summary {
                    subqueries: 1,
                    ..Summary::default()
                },
            },
            headers: vec![Header {
                name: "Results-Cache-Gen-Number".to_string(),
                values: vec!["7".to_string()],
            }],
        })
    }

    fn streams_response(error: &str) -> DownstreamResponse {
        let (status, error_type) = if error.is_empty() {
            (STATUS_SUCCESS, "")
        } else {
            (STATUS_ERROR, "internal")
        };
        DownstreamResponse::Streams(StreamsResponse {
            status: status.to_string(),
            data: StreamsData {
                result_type: ResultType::Streams,
                result: vec![
                    LogStream {
                        labels: "{app=\"a\"}".to_string(),
                        entries: vec![Entry {
                            timestamp: UNIX_EPOCH + Duration::from_secs(2),
                            line: "second".to_string(),
                        }],
                    },
                    LogStream {
                        labels: "{app=\"b\"}".to_string(),
                        entries: vec![Entry {
                            timestamp: UNIX_EPOCH + Duration::from_secs(1),
                            line: "first".to_string(),
                        }],
                    },
                ],
            },
            error_type: error_type.to_string(),
            error: error.to_string(),
            direction: Direction::Backward,
            limit: 100,
            statistics: Statistics::default(),
            headers: Vec::new(),
        })
    }

    #[test]
    fn log_streams_are_taken_verbatim() {
        let DownstreamResponse::Streams(expected) = streams_response("") else {
            unreachable!()
        };
        let res = response_to_result(streams_response("")).unwrap();
        assert_eq!(res.data, ResultValue::Streams(expected.data.result));
    }

    #[test]
    fn vector_shape_takes_the_first_sample_of_each_stream() {
        let streams = vec![
            stream("a", &[(1_000, 1.0)]),
            stream("b", &[(1_000, 2.0)]),
            stream("c", &[(1_000, 3.0)]),
        ];
        let res = response_to_result(samples_response(ResultType::Vector, streams)).unwrap();

        let ResultValue::Vector(vector) = &res.data else {
            panic!("expected a vector, got {:?}", res.data);
        };
        assert_eq!(vector.len(), 3);
        for (sample, (app, v)) in vector.iter().zip([("a", 1.0), ("b", 2.0), ("c", 3.0)]) {
            assert_eq!(sample.metric[0], Label::new("app", app));
            assert_eq!(sample.point, Point { t: 1_000, v });
        }
        assert_eq!(res.statistics.summary.subqueries, 1);
        assert_eq!(res.headers[0].values, vec!["7"]);
    }

    #[test]
    fn matrix_shape_keeps_every_sample_in_order() {
        let streams = vec![
            stream("a", &[(1_000, 1.0), (2_000, 1.5), (3_000, 2.0)]),
            stream("b", &[(1_000, 2.0)]),
            stream("c", &[(2_000, 3.0), (3_000, 4.0)]),
        ];
        let res =
            response_to_result(samples_response(ResultType::Matrix, streams.clone())).unwrap();

        let ResultValue::Matrix(matrix) = &res.data else {
            panic!("expected a matrix, got {:?}", res.data);
        };
        assert_eq!(matrix.len(), 3);
        for (series, stream) in matrix.iter().zip(&streams) {
            assert_eq!(series.metric, stream.labels);
            let expected: Vec<Point> = stream
                .samples
                .iter()
                .map(|s| Point {
                    t: s.timestamp_ms,
                    v: s.value,
                })
                .collect();
            assert_eq!(series.points, expected);
        }
    }

    #[test]
    fn empty_vector_series_is_an_error() {
        let streams = vec![stream("a", &[(1_000, 1.0)]), stream("b", &[])];
        let err = response_to_result(samples_response(ResultType::Vector, streams)).unwrap_err();
        assert!(matches!(err, Error::EmptySeries { .. }), "{err}");
    }

    #[test]
    fn errors_in_responses_are_never_results() {
        let err =
            response_to_result(streams_response("too many outstanding requests")).unwrap_err();
        assert_eq!(err.to_string(), "internal: too many outstanding requests");

        let DownstreamResponse::Samples(mut resp) = samples_response(ResultType::Matrix, Vec::new())
        else {
            unreachable!()
        };
        resp.response.status = STATUS_ERROR.to_string();
        resp.response.error_type = "bad_data".to_string();
        resp.response.error = "parse error".to_string();
        let err = response_to_result(DownstreamResponse::Samples(resp)).unwrap_err();
        assert_eq!(err.to_string(), "bad_data: parse error");
    }

    #[test]
    fn metadata_responses_cannot_be_decoded() {
        let series = DownstreamResponse::Series(SeriesResponse {
            status: STATUS_SUCCESS.to_string(),
            data: vec![vec![Label::new("app", "a")]],
            headers: Vec::new(),
        });
        let err = response_to_result(series).unwrap_err();
        assert_eq!(err.to_string(), "cannot decode (series)");

        let labels = DownstreamResponse::LabelNames(LabelNamesResponse {
            status: STATUS_SUCCESS.to_string(),
            data: vec!["app".to_string()],
            headers: Vec::new(),
        });
        assert!(matches!(
            response_to_result(labels),
            Err(Error::UnsupportedResponse {
                kind: "label_names"
            })
        ));
    }
}
