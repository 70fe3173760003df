//! # Tenant Options
//!
//! Per-tenant, lazily built, named configuration objects for multi-tenant
//! services.
//!
//! ## Features
//!
//! - **Tenant isolation**: every tenant has its own cache partition
//! - **Single-flight construction**: concurrent misses for one `(tenant, name)` build once
//! - **Layered setup**: global setup, then the per-tenant override, then post-configure
//! - **Change tracking**: a source change evicts its name from every tenant
//! - **Snapshots**: private per-request caches with stable values
//! - **Statistics**: per-partition hit/miss counters (`stats` feature, on by default)
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use tenant_options::{
//!     BasicTenantInfo, ChangeNotifier, FixedTenant, OptionsFactory, OptionsMonitor,
//! };
//!
//! #[derive(Debug, Default)]
//! struct Branding {
//!     title: String,
//!     accent: String,
//! }
//!
//! let factory = OptionsFactory::<Branding, BasicTenantInfo>::builder()
//!     .configure(|b| b.accent = "#0050ff".into())
//!     .per_tenant(|b, t| b.title = format!("Welcome to {}", t.identifier))
//!     .build();
//!
//! let source = ChangeNotifier::new();
//! let monitor = OptionsMonitor::builder()
//!     .factory(factory)
//!     .tenant_accessor(FixedTenant::new(BasicTenantInfo::new("1", "acme")))
//!     .change_source(source.clone())
//!     .build()
//!     .unwrap();
//!
//! let first = monitor.current_value().unwrap();
//! assert_eq!(first.title, "Welcome to acme");
//! assert!(Arc::ptr_eq(&first, &monitor.current_value().unwrap()));
//!
//! // The configuration source changed: the next read rebuilds.
//! source.notify();
//! assert!(!Arc::ptr_eq(&first, &monitor.current_value().unwrap()));
//! ```
//!
//! ## Working With the Cache Directly
//!
//! ```rust
//! use std::sync::Arc;
//! use tenant_options::TenantOptionsCache;
//!
//! let cache: TenantOptionsCache<u32> = TenantOptionsCache::new();
//!
//! assert!(cache.try_add(Some("acme"), None, Arc::new(1)));
//! assert!(!cache.try_add(Some("acme"), None, Arc::new(2)));
//! assert!(cache.try_add(Some("globex"), None, Arc::new(1)));
//!
//! // Broadcast removal reports `true` only if every partition had the name.
//! assert!(!cache.try_remove_everywhere(None));
//! assert!(!cache.contains(Some("acme"), None));
//! assert!(!cache.contains(Some("globex"), None));
//! ```

pub use tenant_options_core::*;
