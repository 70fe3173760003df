use crate::cache::TenantOptionsCache;
use crate::error::Result;
use crate::factory::OptionsFactory;
use crate::tenant::{TenantContextAccessor, TenantInfo};
use std::fmt;
use std::sync::Arc;

/// Options for a single request or unit of work.
///
/// A snapshot owns a private [`TenantOptionsCache`] and a fixed tenant.
/// Values are built on first access and then stay stable for the lifetime of
/// the snapshot: it subscribes to no change source and shares nothing with
/// other snapshots. Dropping it discards everything it built.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tenant_options_core::{BasicTenantInfo, OptionsFactory, OptionsSnapshot};
///
/// #[derive(Default)]
/// struct Theme {
///     color: String,
/// }
///
/// let factory = Arc::new(
///     OptionsFactory::<Theme, BasicTenantInfo>::builder()
///         .per_tenant(|o, t| o.color = format!("{}-blue", t.identifier))
///         .build(),
/// );
///
/// let tenant = Arc::new(BasicTenantInfo::new("1", "acme"));
/// let snapshot = OptionsSnapshot::new(factory, Some(tenant));
///
/// let first = snapshot.value().unwrap();
/// let second = snapshot.get(Some("")).unwrap();
/// assert_eq!(first.color, "acme-blue");
/// assert!(Arc::ptr_eq(&first, &second));
/// ```
pub struct OptionsSnapshot<T, I> {
    cache: TenantOptionsCache<T>,
    factory: Arc<OptionsFactory<T, I>>,
    tenant: Option<Arc<I>>,
}

impl<T, I> OptionsSnapshot<T, I>
where
    T: Default,
    I: TenantInfo,
{
    pub fn new(factory: Arc<OptionsFactory<T, I>>, tenant: Option<Arc<I>>) -> Self {
        Self {
            cache: TenantOptionsCache::new(),
            factory,
            tenant,
        }
    }

    /// Binds the snapshot to whatever tenant `accessor` reports right now.
    pub fn for_current_tenant(
        factory: Arc<OptionsFactory<T, I>>,
        accessor: &dyn TenantContextAccessor<I>,
    ) -> Self {
        Self::new(factory, accessor.current_tenant())
    }

    /// Returns the options named `name`, building them once per snapshot.
    pub fn get(&self, name: Option<&str>) -> Result<Arc<T>> {
        let tenant = self.tenant.as_deref();
        self.cache
            .try_get_or_add(tenant.map(TenantInfo::id), name, || {
                self.factory.create(tenant, name)
            })
    }

    /// Returns the default-named options.
    pub fn value(&self) -> Result<Arc<T>> {
        self.get(None)
    }

    pub fn tenant(&self) -> Option<&I> {
        self.tenant.as_deref()
    }
}

impl<T, I> fmt::Debug for OptionsSnapshot<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionsSnapshot")
            .field("cache", &self.cache)
            .field("has_tenant", &self.tenant.is_some())
            .finish()
    }
}
