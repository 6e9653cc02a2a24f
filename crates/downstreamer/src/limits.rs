use crate::context::QueryContext;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};

/// Per-tenant limits consumed by the dispatcher factory.
pub trait Limits: Send + Sync {
    /// Maximum number of sub-queries a single query of `tenant` may run
    /// concurrently. Non-positive values mean "no override".
    fn max_query_parallelism(&self, ctx: &QueryContext, tenant: &str) -> i64;
}

impl<L: Limits + ?Sized> Limits for Arc<L> {
    fn max_query_parallelism(&self, ctx: &QueryContext, tenant: &str) -> i64 {
        (**self).max_query_parallelism(ctx, tenant)
    }
}

/// Values a single tenant may override.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantOverrides {
    #[serde(default)]
    pub max_query_parallelism: Option<i64>,
}

/// Static limits: one default plus per-tenant overrides.
///
/// Deserializes from documents of the form:
///
/// ```json
/// {
///   "default_max_query_parallelism": 32,
///   "overrides": { "tenant-a": { "max_query_parallelism": 256 } }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantLimits {
    #[serde(default = "default_max_query_parallelism")]
    pub default_max_query_parallelism: i64,
    #[serde(default)]
    pub overrides: HashMap<String, TenantOverrides>,
}

const fn default_max_query_parallelism() -> i64 {
    32
}

impl Default for TenantLimits {
    fn default() -> Self {
        Self::new(default_max_query_parallelism())
    }
}

impl TenantLimits {
    pub fn new(default_max_query_parallelism: i64) -> Self {
        Self {
            default_max_query_parallelism,
            overrides: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_override(mut self, tenant: impl Into<String>, max_query_parallelism: i64) -> Self {
        self.overrides.insert(
            tenant.into(),
            TenantOverrides {
                max_query_parallelism: Some(max_query_parallelism),
            },
        );
        self
    }

    /// Parses a JSON limits document.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if `raw` is not a valid
    /// limits document.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

impl Limits for TenantLimits {
    fn max_query_parallelism(&self, _ctx: &QueryContext, tenant: &str) -> i64 {
        self.overrides
            .get(tenant)
            .and_then(|o| o.max_query_parallelism)
            .unwrap_or(self.default_max_query_parallelism)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_take_precedence_over_the_default() {
        let limits = TenantLimits::new(16).with_override("tenant-a", 256);
        let ctx = QueryContext::new();
        assert_eq!(limits.max_query_parallelism(&ctx, "tenant-a"), 256);
        assert_eq!(limits.max_query_parallelism(&ctx, "tenant-b"), 16);
    }

    #[test]
    fn parses_limits_documents() {
        let limits = TenantLimits::from_json(
            r#"{
                "default_max_query_parallelism": 8,
                "overrides": {
                    "tenant-a": { "max_query_parallelism": 64 },
                    "tenant-b": {}
                }
            }"#,
        )
        .unwrap();

        let ctx = QueryContext::new();
        assert_eq!(limits.max_query_parallelism(&ctx, "tenant-a"), 64);
        assert_eq!(limits.max_query_parallelism(&ctx, "tenant-b"), 8);
        assert_eq!(limits.max_query_parallelism(&ctx, "tenant-c"), 8);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let limits = TenantLimits::from_json("{}").unwrap();
        assert_eq!(limits, TenantLimits::default());
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(TenantLimits::from_json(r#"{"overrides": []}"#).is_err());
    }
}
