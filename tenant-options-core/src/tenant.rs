//! Tenant identity as seen by the options pipeline.
//!
//! Resolving which tenant a request belongs to is the host's job. The
//! pipeline only needs a stable id to pick a cache partition and the tenant
//! value itself to hand to the per-tenant configurator.

use std::sync::Arc;

/// A tenant known to the host application.
pub trait TenantInfo: Send + Sync {
    /// Stable identifier used as the cache partition key.
    fn id(&self) -> &str;
}

/// Plain tenant record for hosts without their own tenant type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BasicTenantInfo {
    pub id: String,
    /// Human-facing identifier, e.g. the host name or route segment.
    pub identifier: String,
    pub name: Option<String>,
}

impl BasicTenantInfo {
    pub fn new(id: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            identifier: identifier.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl TenantInfo for BasicTenantInfo {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Supplies the tenant of the current logical context.
///
/// Returning `None` selects the shared "no tenant" options.
pub trait TenantContextAccessor<I>: Send + Sync {
    fn current_tenant(&self) -> Option<Arc<I>>;
}

impl<I, F> TenantContextAccessor<I> for F
where
    F: Fn() -> Option<Arc<I>> + Send + Sync,
{
    fn current_tenant(&self) -> Option<Arc<I>> {
        self()
    }
}

/// An accessor that always reports the same tenant.
#[derive(Debug)]
pub struct FixedTenant<I>(Option<Arc<I>>);

impl<I> FixedTenant<I> {
    pub fn new(tenant: I) -> Self {
        Self(Some(Arc::new(tenant)))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl<I> Clone for FixedTenant<I> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<I: Send + Sync> TenantContextAccessor<I> for FixedTenant<I> {
    fn current_tenant(&self) -> Option<Arc<I>> {
        self.0.clone()
    }
}
