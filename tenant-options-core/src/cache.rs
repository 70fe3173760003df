use crate::partition::NamedPartition;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "stats")]
use crate::CacheStats;

/// A cache of named option values partitioned by tenant.
///
/// The cache holds one [`NamedPartition`] for "no tenant" (`tenant_id = None`)
/// and a concurrent map from tenant id to partition. Every operation selects
/// exactly one partition and delegates to it, except the broadcast forms
/// [`try_remove_everywhere`](Self::try_remove_everywhere) and
/// [`clear`](Self::clear).
///
/// Selecting a tenant creates its partition on first touch. Concurrent first
/// touches agree on a single partition through the map's entry API.
///
/// # Growth
///
/// Tenant partitions are never dropped from the outer map, only emptied.
/// Deployments with unbounded or rotating tenant ids grow this map for the
/// lifetime of the cache; [`tenant_count`](Self::tenant_count) exposes its
/// size.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tenant_options_core::TenantOptionsCache;
///
/// let cache: TenantOptionsCache<String> = TenantOptionsCache::new();
///
/// let acme = cache.get_or_add(Some("acme"), None, || "acme".to_string());
/// let globex = cache.get_or_add(Some("globex"), None, || "globex".to_string());
/// assert!(!Arc::ptr_eq(&acme, &globex));
///
/// assert!(cache.try_remove(Some("acme"), None));
/// assert!(cache.contains(Some("globex"), None));
/// ```
pub struct TenantOptionsCache<T> {
    no_tenant: Arc<NamedPartition<T>>,
    tenants: DashMap<String, Arc<NamedPartition<T>>>,
}

impl<T> TenantOptionsCache<T> {
    /// Creates an empty cache holding only the no-tenant partition.
    pub fn new() -> Self {
        Self {
            no_tenant: Arc::new(NamedPartition::new()),
            tenants: DashMap::new(),
        }
    }

    /// Selects the partition for `tenant_id`, creating a tenant partition on
    /// first touch.
    fn partition(&self, tenant_id: Option<&str>) -> Arc<NamedPartition<T>> {
        let Some(tenant_id) = tenant_id else {
            return Arc::clone(&self.no_tenant);
        };

        if let Some(partition) = self.tenants.get(tenant_id) {
            return Arc::clone(partition.value());
        }

        Arc::clone(
            self.tenants
                .entry(tenant_id.to_string())
                .or_insert_with(|| {
                    tracing::debug!(tenant_id, "creating options partition for tenant");
                    Arc::new(NamedPartition::new())
                })
                .value(),
        )
    }

    /// Looks up a partition without creating it.
    fn existing_partition(&self, tenant_id: Option<&str>) -> Option<Arc<NamedPartition<T>>> {
        match tenant_id {
            None => Some(Arc::clone(&self.no_tenant)),
            Some(id) => self.tenants.get(id).map(|p| Arc::clone(p.value())),
        }
    }

    /// Returns the value for `(tenant_id, name)`, building it on a miss.
    pub fn get_or_add<F>(&self, tenant_id: Option<&str>, name: Option<&str>, factory: F) -> Arc<T>
    where
        F: FnOnce() -> T,
    {
        self.partition(tenant_id).get_or_add(name, factory)
    }

    /// Fallible form of [`get_or_add`](Self::get_or_add); a failed build is not cached.
    pub fn try_get_or_add<F, E>(
        &self,
        tenant_id: Option<&str>,
        name: Option<&str>,
        factory: F,
    ) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.partition(tenant_id).try_get_or_add(name, factory)
    }

    /// Stores `value` under `(tenant_id, name)` unless a value is already
    /// cached there.
    ///
    /// Returns `false` and keeps the existing value otherwise. A concurrent
    /// in-flight build of the same name counts as present once it completes.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use tenant_options_core::TenantOptionsCache;
    ///
    /// let cache = TenantOptionsCache::new();
    /// assert!(cache.try_add(Some("acme"), None, Arc::new(1u32)));
    /// assert!(!cache.try_add(Some("acme"), None, Arc::new(2)));
    /// assert_eq!(cache.get(Some("acme"), None).as_deref(), Some(&1));
    /// ```
    pub fn try_add(&self, tenant_id: Option<&str>, name: Option<&str>, value: Arc<T>) -> bool {
        self.partition(tenant_id).try_add(name, value)
    }

    /// Removes `name` from the selected partition only.
    pub fn try_remove(&self, tenant_id: Option<&str>, name: Option<&str>) -> bool {
        self.partition(tenant_id).try_remove(name)
    }

    /// Removes `name` from the no-tenant partition and every tenant partition.
    ///
    /// Every partition is visited. The result is `true` only when *each* of
    /// them held the name, so a name cached for some tenants but not others
    /// yields `false` even though all copies are gone afterwards.
    pub fn try_remove_everywhere(&self, name: Option<&str>) -> bool {
        let mut removed = self.no_tenant.try_remove(name);
        for partition in self.tenants.iter() {
            removed &= partition.value().try_remove(name);
        }
        removed
    }

    /// Empties the selected partition, creating it empty if it did not exist.
    pub fn clear_tenant(&self, tenant_id: Option<&str>) {
        self.partition(tenant_id).clear();
    }

    /// Empties the no-tenant partition and every tenant partition.
    pub fn clear(&self) {
        self.no_tenant.clear();
        for partition in self.tenants.iter() {
            partition.value().clear();
        }
    }

    /// Returns the cached value without building it.
    ///
    /// Never creates a tenant partition, so probing unknown tenants does not
    /// grow the cache.
    pub fn get(&self, tenant_id: Option<&str>, name: Option<&str>) -> Option<Arc<T>> {
        self.existing_partition(tenant_id)?.get(name)
    }

    /// Whether `(tenant_id, name)` currently holds a value.
    pub fn contains(&self, tenant_id: Option<&str>, name: Option<&str>) -> bool {
        self.get(tenant_id, name).is_some()
    }

    /// Number of tenant partitions created so far, excluding "no tenant".
    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }

    /// Ids of every tenant partition, in no particular order.
    pub fn tenant_ids(&self) -> Vec<String> {
        self.tenants.iter().map(|p| p.key().clone()).collect()
    }

    /// Snapshot of one partition's counters, if that partition exists.
    #[cfg(feature = "stats")]
    pub fn stats(&self, tenant_id: Option<&str>) -> Option<CacheStats> {
        self.existing_partition(tenant_id)
            .map(|partition| partition.stats().clone())
    }
}

impl<T> Default for TenantOptionsCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TenantOptionsCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantOptionsCache")
            .field("no_tenant", &self.no_tenant)
            .field("tenants", &self.tenant_ids())
            .finish()
    }
}
