//! Tenant-less cache contract expected by hosts that predate tenants.
//!
//! [`NamedPartition`] supports every operation. [`TenantOptionsCache`] can
//! only honour the ones that make sense across all tenants: removal becomes
//! a broadcast and clear empties every partition, while adding or building a
//! value without a tenant is rejected with [`Error::Unsupported`].

use crate::cache::TenantOptionsCache;
use crate::error::{Error, Result};
use crate::partition::NamedPartition;
use std::sync::Arc;

/// A name-keyed options cache with no notion of tenants.
///
/// Names are normalized the same way as everywhere else in the crate:
/// `None` and `Some("")` address the default entry.
pub trait OptionsMonitorCache<T> {
    /// Returns the cached value for `name`, building it with `create` on a miss.
    fn get_or_add<F>(&self, name: Option<&str>, create: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> T;

    /// Stores `value` unless `name` already holds one; `Ok(false)` when it does.
    fn try_add(&self, name: Option<&str>, value: Arc<T>) -> Result<bool>;

    /// Evicts `name`, returning whether a value was removed.
    fn try_remove(&self, name: Option<&str>) -> bool;

    /// Evicts every entry.
    fn clear(&self);
}

impl<T> OptionsMonitorCache<T> for NamedPartition<T> {
    fn get_or_add<F>(&self, name: Option<&str>, create: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> T,
    {
        Ok(NamedPartition::get_or_add(self, name, create))
    }

    fn try_add(&self, name: Option<&str>, value: Arc<T>) -> Result<bool> {
        Ok(NamedPartition::try_add(self, name, value))
    }

    fn try_remove(&self, name: Option<&str>) -> bool {
        NamedPartition::try_remove(self, name)
    }

    fn clear(&self) {
        NamedPartition::clear(self);
    }
}

impl<T> OptionsMonitorCache<T> for TenantOptionsCache<T> {
    fn get_or_add<F>(&self, _name: Option<&str>, _create: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> T,
    {
        Err(Error::Unsupported("get_or_add requires a tenant id"))
    }

    fn try_add(&self, _name: Option<&str>, _value: Arc<T>) -> Result<bool> {
        Err(Error::Unsupported("try_add requires a tenant id"))
    }

    fn try_remove(&self, name: Option<&str>) -> bool {
        self.try_remove_everywhere(name)
    }

    fn clear(&self) {
        TenantOptionsCache::clear(self);
    }
}
