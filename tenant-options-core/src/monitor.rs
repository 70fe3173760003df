use crate::cache::TenantOptionsCache;
use crate::change::{CallbackSet, ChangeRegistration, ChangeSource};
use crate::error::{Error, Result};
use crate::factory::OptionsFactory;
use crate::snapshot::OptionsSnapshot;
use crate::tenant::{TenantContextAccessor, TenantInfo};
use crate::normalize_name;
use std::fmt;
use std::sync::Arc;

type ChangeListener = dyn Fn(&str) + Send + Sync;

/// Long-lived, shared access to tenant-scoped options.
///
/// The monitor resolves the current tenant through its accessor, serves
/// values from a [`TenantOptionsCache`] and builds misses with its
/// [`OptionsFactory`]. Every change source given to the builder is
/// subscribed at build time; a change evicts the source's name from *all*
/// partitions, so every tenant rebuilds it on next access.
///
/// Subscriptions are owned by the monitor and released when it is dropped.
///
/// # Consistency
///
/// A change racing an in-flight build may leave either the old or the rebuilt
/// value in the cache. The next change or access converges; there is no
/// stronger ordering between notifications and lookups.
pub struct OptionsMonitor<T, I> {
    cache: Arc<TenantOptionsCache<T>>,
    factory: Arc<OptionsFactory<T, I>>,
    accessor: Arc<dyn TenantContextAccessor<I>>,
    listeners: Arc<CallbackSet<ChangeListener>>,
    registrations: Vec<ChangeRegistration>,
}

impl<T, I> OptionsMonitor<T, I>
where
    T: Default + Send + Sync + 'static,
    I: TenantInfo + 'static,
{
    /// Starts an [`OptionsMonitorBuilder`].
    pub fn builder() -> OptionsMonitorBuilder<T, I> {
        OptionsMonitorBuilder::default()
    }

    /// Returns the options named `name` for the current tenant.
    pub fn get(&self, name: Option<&str>) -> Result<Arc<T>> {
        let tenant = self.accessor.current_tenant();
        let tenant = tenant.as_deref();
        self.cache
            .try_get_or_add(tenant.map(TenantInfo::id), name, || {
                self.factory.create(tenant, name)
            })
    }

    /// Returns the default-named options for the current tenant.
    pub fn current_value(&self) -> Result<Arc<T>> {
        self.get(None)
    }

    /// Registers `listener` to be told the name evicted by each change.
    ///
    /// Listeners run on the notifying thread after the eviction. The listener
    /// stays registered until the returned [`ChangeRegistration`] is dropped or
    /// disposed.
    pub fn on_change<F>(&self, listener: F) -> ChangeRegistration
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.listeners.register(Arc::new(listener))
    }

    /// Opens a private snapshot bound to the current tenant.
    ///
    /// The snapshot shares this monitor's factory but has its own cache and
    /// no change subscriptions.
    pub fn snapshot(&self) -> OptionsSnapshot<T, I> {
        OptionsSnapshot::new(
            Arc::clone(&self.factory),
            self.accessor.current_tenant(),
        )
    }

    /// The shared cache, for hosts that evict per tenant (e.g. when a tenant
    /// record is updated).
    pub fn cache(&self) -> &TenantOptionsCache<T> {
        &self.cache
    }

    /// Number of live change-source subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.registrations.len()
    }
}

impl<T, I> Drop for OptionsMonitor<T, I> {
    fn drop(&mut self) {
        if !self.registrations.is_empty() {
            tracing::debug!(
                subscriptions = self.registrations.len(),
                "releasing options change subscriptions"
            );
        }
        self.registrations.clear();
    }
}

impl<T, I> fmt::Debug for OptionsMonitor<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionsMonitor")
            .field("cache", &self.cache)
            .field("subscriptions", &self.registrations.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Assembles an [`OptionsMonitor`].
///
/// A factory and a tenant accessor are required; change sources are
/// optional.
pub struct OptionsMonitorBuilder<T, I> {
    factory: Option<Arc<OptionsFactory<T, I>>>,
    accessor: Option<Arc<dyn TenantContextAccessor<I>>>,
    sources: Vec<Arc<dyn ChangeSource>>,
}

impl<T, I> Default for OptionsMonitorBuilder<T, I> {
    fn default() -> Self {
        Self {
            factory: None,
            accessor: None,
            sources: Vec::new(),
        }
    }
}

impl<T, I> OptionsMonitorBuilder<T, I>
where
    T: Default + Send + Sync + 'static,
    I: TenantInfo + 'static,
{
    /// Sets the factory used to build misses. Required.
    pub fn factory(mut self, factory: impl Into<Arc<OptionsFactory<T, I>>>) -> Self {
        self.factory = Some(factory.into());
        self
    }

    /// Sets how the current tenant is resolved on each lookup. Required.
    pub fn tenant_accessor<A>(mut self, accessor: A) -> Self
    where
        A: TenantContextAccessor<I> + 'static,
    {
        self.accessor = Some(Arc::new(accessor));
        self
    }

    /// Adds a change source. Each change evicts the source's name for every
    /// tenant. May be called any number of times.
    pub fn change_source<S>(mut self, source: S) -> Self
    where
        S: ChangeSource + 'static,
    {
        self.sources.push(Arc::new(source));
        self
    }

    /// Builds the monitor and subscribes to every change source.
    ///
    /// Fails with [`Error::InvalidArgument`] before subscribing anything when
    /// the factory or the accessor is missing.
    pub fn build(self) -> Result<OptionsMonitor<T, I>> {
        let factory = self.factory.ok_or(Error::InvalidArgument("factory"))?;
        let accessor = self
            .accessor
            .ok_or(Error::InvalidArgument("tenant_accessor"))?;

        let cache = Arc::new(TenantOptionsCache::new());
        let listeners: Arc<CallbackSet<ChangeListener>> = Arc::new(CallbackSet::new());

        let registrations = self
            .sources
            .iter()
            .map(|source| subscribe(source.as_ref(), &cache, &listeners))
            .collect();

        Ok(OptionsMonitor {
            cache,
            factory,
            accessor,
            listeners,
            registrations,
        })
    }
}

fn subscribe<T>(
    source: &dyn ChangeSource,
    cache: &Arc<TenantOptionsCache<T>>,
    listeners: &Arc<CallbackSet<ChangeListener>>,
) -> ChangeRegistration
where
    T: Send + Sync + 'static,
{
    let name = normalize_name(source.name()).to_string();
    let cache = Arc::downgrade(cache);
    let listeners = Arc::downgrade(listeners);

    source.subscribe(Arc::new(move || {
        let Some(cache) = cache.upgrade() else {
            return;
        };
        let evicted_everywhere = cache.try_remove_everywhere(Some(&name));
        tracing::debug!(name = %name, evicted_everywhere, "evicted options after source change");

        if let Some(listeners) = listeners.upgrade() {
            for listener in listeners.snapshot() {
                listener(&name);
            }
        }
    }))
}
