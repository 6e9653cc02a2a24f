use crate::{
    error::Result,
    model::{
        DownstreamRequest, INSTANT_QUERY_PATH, InstantRequest, LiteralParams, Params,
        QUERY_RANGE_PATH, RangeRequest, RangeType, Shards,
    },
};
use core::time::Duration;

/// Converts logical parameters and a shard set into a concrete downstream
/// request.
///
/// Instant parameters produce [`DownstreamRequest::Instant`], everything else
/// produces [`DownstreamRequest::Range`] with step and interval in
/// milliseconds. The query text is copied from `params`; callers that
/// dispatch a rewritten expression attach it afterwards with
/// [`DownstreamRequest::with_query`].
pub fn params_to_request(params: &dyn Params, shards: &Shards) -> DownstreamRequest {
    match params.range_type() {
        RangeType::Instant => DownstreamRequest::Instant(InstantRequest {
            query: params.query().to_string(),
            limit: params.limit(),
            time: params.start(),
            direction: params.direction(),
            path: INSTANT_QUERY_PATH.to_string(),
            shards: shards.encode(),
        }),
        RangeType::Range => DownstreamRequest::Range(RangeRequest {
            query: params.query().to_string(),
            limit: params.limit(),
            step_ms: millis(params.step()),
            interval_ms: millis(params.interval()),
            start: params.start(),
            end: params.end(),
            direction: params.direction(),
            path: QUERY_RANGE_PATH.to_string(),
            shards: shards.encode(),
        }),
    }
}

/// Recovers the logical parameters and shard set a request was built from.
///
/// # Errors
///
/// Returns [`Error::InvalidShard`](crate::Error::InvalidShard) if the
/// request carries a shard token that does not parse.
pub fn request_to_params(req: &DownstreamRequest) -> Result<(LiteralParams, Shards)> {
    let shards = Shards::parse(req.shards())?;
    let params = match req {
        DownstreamRequest::Instant(r) => LiteralParams::instant(r.query.clone(), r.time, r.limit)
            .with_direction(r.direction),
        DownstreamRequest::Range(r) => LiteralParams::range(
            r.query.clone(),
            r.start,
            r.end,
            from_millis(r.step_ms),
            r.limit,
        )
        .with_interval(from_millis(r.interval_ms))
        .with_direction(r.direction),
    };
    Ok((params, shards))
}

fn millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

fn from_millis(ms: i64) -> Duration {
    Duration::from_millis(u64::try_from(ms).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, Shard};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn ts(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn range_parameters_survive_translation() {
        let params = LiteralParams::range(
            "sum(count_over_time({app=\"foo\"}[1m]))",
            ts(1_700_000_000),
            ts(1_700_003_600),
            Duration::from_secs(15),
            500,
        )
        .with_interval(Duration::from_millis(250))
        .with_direction(Direction::Forward);
        let shards: Shards = vec![Shard::new(1, 4), Shard::new(3, 4)].into();

        let req = params_to_request(&params, &shards);
        let DownstreamRequest::Range(range) = &req else {
            panic!("expected a range request, got {req:?}");
        };
        assert_eq!(range.step_ms, 15_000);
        assert_eq!(range.interval_ms, 250);
        assert_eq!(range.path, QUERY_RANGE_PATH);
        assert_eq!(range.shards, vec!["1_of_4", "3_of_4"]);

        let (recovered, recovered_shards) = request_to_params(&req).unwrap();
        assert_eq!(recovered, params);
        assert_eq!(recovered_shards.encode(), shards.encode());
    }

    #[test]
    fn instant_parameters_produce_a_single_timestamp() {
        let params = LiteralParams::instant("rate({app=\"foo\"}[5m])", ts(1_700_000_000), 100);

        let req = params_to_request(&params, &Shards::none());
        let DownstreamRequest::Instant(instant) = &req else {
            panic!("expected an instant request, got {req:?}");
        };
        assert_eq!(instant.time, ts(1_700_000_000));
        assert_eq!(instant.path, INSTANT_QUERY_PATH);
        assert!(instant.shards.is_empty());
        assert_eq!(req.step_ms(), 0);

        let (recovered, _) = request_to_params(&req).unwrap();
        assert_eq!(recovered, params);
    }

    #[test]
    fn with_query_replaces_only_the_expression() {
        let params =
            LiteralParams::range("{app=\"foo\"}", ts(0), ts(60), Duration::from_secs(1), 10);
        let shards: Shards = vec![Shard::new(0, 2)].into();
        let req = params_to_request(&params, &shards).with_query("{app=\"bar\"}");

        assert_eq!(req.query(), "{app=\"bar\"}");
        assert_eq!(req.shards(), ["0_of_2"]);
        assert_eq!(req.limit(), 10);
        assert_eq!(req.step_ms(), 1_000);
    }
}
