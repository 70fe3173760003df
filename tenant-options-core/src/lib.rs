//! # Tenant Options Core
//!
//! Core building blocks for tenant-scoped, named configuration objects
//! ("options").
//!
//! Option values are built lazily and cached per `(tenant, name)`. Each
//! tenant gets its own cache partition, so tenants never observe each other's
//! values, while configuration-source changes can still evict a name across
//! every tenant at once.
//!
//! ## Module Organization
//!
//! - [`NamedPartition`] - single-flight `name -> value` cache
//! - [`TenantOptionsCache`] - one partition per tenant plus a "no tenant" partition
//! - [`factory`] - layered construction: setup, per-tenant override, post-configure, validation
//! - [`change`] - change sources and scoped subscriptions
//! - [`OptionsMonitor`] - shared cache wired to change sources
//! - [`OptionsSnapshot`] - private per-request cache without change tracking
//!
//! ## Names
//!
//! Every operation that takes a name accepts `Option<&str>`. `None` and the
//! empty string both mean [`DEFAULT_NAME`].
mod cache;
mod contract;
mod error;
mod monitor;
mod partition;
mod snapshot;
mod tenant;

pub mod change;
pub mod factory;

#[cfg(feature = "stats")]
mod stats;

pub use cache::TenantOptionsCache;
pub use change::{ChangeCallback, ChangeNotifier, ChangeRegistration, ChangeSource};
pub use contract::OptionsMonitorCache;
pub use error::{BoxError, Error, Result};
pub use factory::{OptionsFactory, OptionsFactoryBuilder};
pub use monitor::{OptionsMonitor, OptionsMonitorBuilder};
pub use partition::NamedPartition;
pub use snapshot::OptionsSnapshot;
pub use tenant::{BasicTenantInfo, FixedTenant, TenantContextAccessor, TenantInfo};

#[cfg(feature = "stats")]
pub use stats::CacheStats;

/// Name of the default options instance.
pub const DEFAULT_NAME: &str = "";

/// Maps a missing name to [`DEFAULT_NAME`].
///
/// # Examples
///
/// ```
/// use tenant_options_core::{normalize_name, DEFAULT_NAME};
///
/// assert_eq!(normalize_name(None), DEFAULT_NAME);
/// assert_eq!(normalize_name(Some("")), DEFAULT_NAME);
/// assert_eq!(normalize_name(Some("smtp")), "smtp");
/// ```
#[inline]
pub fn normalize_name(name: Option<&str>) -> &str {
    name.unwrap_or(DEFAULT_NAME)
}
