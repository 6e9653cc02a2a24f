use downstreamer_core::{
    model::{DownstreamRequest, Params, Shards},
    translate::params_to_request,
};
use core::fmt;
use std::sync::Arc;

/// An opaque, stringifiable query expression.
pub trait Expr: fmt::Display + Send + Sync {}

impl<T: fmt::Display + Send + Sync + ?Sized> Expr for T {}

/// One independently executable fragment of a larger query.
///
/// Parameters are shared between every shard of the same base query.
#[derive(Clone)]
pub struct DownstreamQuery {
    pub expr: Arc<dyn Expr>,
    pub params: Arc<dyn Params>,
    pub shards: Shards,
}

impl DownstreamQuery {
    pub fn new(expr: impl Expr + 'static, params: Arc<dyn Params>, shards: Shards) -> Self {
        Self {
            expr: Arc::new(expr),
            params,
            shards,
        }
    }

    /// Translates this sub-query into the request sent downstream, carrying
    /// the stringified expression rather than the base query text.
    pub fn to_request(&self) -> DownstreamRequest {
        params_to_request(&*self.params, &self.shards).with_query(self.expr.to_string())
    }
}

impl fmt::Debug for DownstreamQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownstreamQuery")
            .field("expr", &self.expr.to_string())
            .field("query", &self.params.query())
            .field("shards", &self.shards)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use downstreamer_core::model::{LiteralParams, Shard};
    use std::time::UNIX_EPOCH;

    #[test]
    fn request_carries_the_expression_not_the_base_query() {
        let start = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let params: Arc<dyn Params> = Arc::new(LiteralParams::range(
            "sum(rate({app=\"foo\"}[1m]))",
            start,
            start + Duration::from_secs(3600),
            Duration::from_secs(60),
            1000,
        ));

        let queries: Vec<_> = (0..2)
            .map(|i| {
                DownstreamQuery::new(
                    "rate({app=\"foo\"}[1m])",
                    Arc::clone(&params),
                    vec![Shard::new(i, 2)].into(),
                )
            })
            .collect();

        for (i, qry) in queries.iter().enumerate() {
            let req = qry.to_request();
            assert_eq!(req.query(), "rate({app=\"foo\"}[1m])");
            assert_eq!(req.shards(), [format!("{i}_of_2")]);
            assert_eq!(req.step_ms(), 60_000);
        }
    }
}
