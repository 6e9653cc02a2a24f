//! Tenant resolution from an execution context.
//!
//! The dispatcher factory only needs a single tenant to look up its
//! parallelism limit; anything else is reported as an error and the factory
//! falls back to its default.

use crate::context::QueryContext;
use downstreamer_core::{Error, Result};

/// Separator between tenants in a multi-tenant org id.
pub const TENANT_SEPARATOR: char = '|';

const MAX_TENANT_ID_LENGTH: usize = 150;

/// Resolves the tenant a query runs on behalf of.
pub trait TenantResolver: Send + Sync {
    /// # Errors
    ///
    /// Returns [`Error::Tenant`] if no single valid tenant is present.
    fn tenant_id(&self, ctx: &QueryContext) -> Result<String>;
}

/// Resolves the tenant from the org id carried by the [`QueryContext`].
#[derive(Clone, Copy, Debug, Default)]
pub struct OrgIdResolver;

impl TenantResolver for OrgIdResolver {
    fn tenant_id(&self, ctx: &QueryContext) -> Result<String> {
        let org_id = ctx.org_id().ok_or_else(|| tenant_error("no org id"))?;

        let mut tenants: Vec<&str> = org_id.split(TENANT_SEPARATOR).collect();
        for tenant in &tenants {
            validate_tenant_id(tenant)?;
        }
        tenants.sort_unstable();
        tenants.dedup();

        match tenants.as_slice() {
            [tenant] => Ok((*tenant).to_string()),
            _ => Err(tenant_error("multiple org IDs present")),
        }
    }
}

fn validate_tenant_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(tenant_error("tenant ID is empty"));
    }
    if id.len() > MAX_TENANT_ID_LENGTH {
        return Err(tenant_error(format!(
            "tenant ID is too long: max {MAX_TENANT_ID_LENGTH} characters"
        )));
    }
    if id == "." || id == ".." {
        return Err(tenant_error(format!("tenant ID is '{id}'")));
    }
    if let Some(c) = id.chars().find(|c| !is_supported_char(*c)) {
        return Err(tenant_error(format!(
            "tenant ID '{id}' contains unsupported character '{c}'"
        )));
    }
    Ok(())
}

const fn is_supported_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '!' | '-' | '_' | '.' | '*' | '\'' | '(' | ')')
}

fn tenant_error(reason: impl Into<String>) -> Error {
    Error::Tenant {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(org_id: Option<&str>) -> Result<String> {
        let ctx = match org_id {
            Some(id) => QueryContext::new().with_org_id(id),
            None => QueryContext::new(),
        };
        OrgIdResolver.tenant_id(&ctx)
    }

    #[test]
    fn resolves_a_single_tenant() {
        assert_eq!(resolve(Some("tenant-a")).unwrap(), "tenant-a");
        // Repeating the same tenant is still a single tenant.
        assert_eq!(resolve(Some("tenant-a|tenant-a")).unwrap(), "tenant-a");
    }

    #[test]
    fn rejects_missing_or_multiple_tenants() {
        for org_id in [None, Some(""), Some("a|b"), Some("a||b")] {
            let err = resolve(org_id).unwrap_err();
            assert!(matches!(err, Error::Tenant { .. }), "{org_id:?}: {err}");
        }
    }

    #[test]
    fn rejects_invalid_tenant_ids() {
        let too_long = "a".repeat(MAX_TENANT_ID_LENGTH + 1);
        for org_id in [".", "..", "tenant/a", "tenant a", too_long.as_str()] {
            assert!(resolve(Some(org_id)).is_err(), "{org_id:?} should be rejected");
        }
    }
}
