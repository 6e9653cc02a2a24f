use super::instance::Instance;
use crate::{
    context::QueryContext,
    handler::Handler,
    limits::Limits,
    tenant::{OrgIdResolver, TenantResolver},
};
use std::sync::Arc;

/// Concurrency bound used when no positive tenant override is available.
pub const DEFAULT_DOWNSTREAM_CONCURRENCY: usize = 128;

/// Builds one [`Instance`] per top-level query, bound to the `next` handler.
///
/// Upstream limits alone do not cap how many sub-queries a query can produce:
/// an expression like `a / a / a / ...` shards every leg independently. Each
/// instance therefore enforces its own token pool regardless of how many
/// sub-queries it is handed.
#[derive(Clone)]
pub struct DownstreamHandler {
    limits: Arc<dyn Limits>,
    tenants: Arc<dyn TenantResolver>,
    next: Arc<dyn Handler>,
}

impl DownstreamHandler {
    /// Creates a factory resolving tenants from the context's org id.
    pub fn new(limits: Arc<dyn Limits>, next: Arc<dyn Handler>) -> Self {
        Self {
            limits,
            tenants: Arc::new(OrgIdResolver),
            next,
        }
    }

    #[must_use]
    pub fn with_tenant_resolver(mut self, tenants: Arc<dyn TenantResolver>) -> Self {
        self.tenants = tenants;
        self
    }

    /// Resolves the concurrency bound for `ctx`.
    ///
    /// Starts from [`DEFAULT_DOWNSTREAM_CONCURRENCY`]; a positive per-tenant
    /// limit replaces it. Failing to resolve a tenant is not an error and
    /// keeps the default.
    pub fn parallelism(&self, ctx: &QueryContext) -> usize {
        let mut p = DEFAULT_DOWNSTREAM_CONCURRENCY;

        match self.tenants.tenant_id(ctx) {
            Ok(tenant) => {
                let x = self.limits.max_query_parallelism(ctx, &tenant);
                if x > 0 {
                    p = usize::try_from(x).unwrap_or(usize::MAX);
                }
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::trace!("using default parallelism: {_e}");
            }
        }

        p
    }

    /// Creates a dispatcher instance for one query evaluation, with a fully
    /// stocked token pool.
    pub fn downstreamer(&self, ctx: &QueryContext) -> Instance {
        Instance::new(self.parallelism(ctx), Arc::clone(&self.next))
    }
}
