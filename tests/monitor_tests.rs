//! Integration tests for the options monitor, change sources and snapshots

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tenant_options::{
    BasicTenantInfo, ChangeNotifier, Error, FixedTenant, OptionsFactory, OptionsMonitor,
    OptionsMonitorCache, OptionsSnapshot, TenantOptionsCache,
};

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
});

#[derive(Debug, Default, Clone)]
struct ConnectionOptions {
    url: String,
    pool_size: u32,
}

type Factory = OptionsFactory<ConnectionOptions, BasicTenantInfo>;

fn factory(builds: &Arc<AtomicUsize>) -> Factory {
    let builds = Arc::clone(builds);
    Factory::builder()
        .configure(|o| o.url = "postgres://shared".into())
        .configure_with(move |_, o| {
            builds.fetch_add(1, Ordering::SeqCst);
            o.pool_size = 4;
        })
        .per_tenant(|o, t| o.url = format!("postgres://{}", t.identifier))
        .post_configure(|_, o| o.pool_size = o.pool_size.max(8))
        .build()
}

/// Accessor whose tenant can be switched between calls.
#[derive(Clone, Default)]
struct SwitchableTenant(Arc<Mutex<Option<Arc<BasicTenantInfo>>>>);

impl SwitchableTenant {
    fn set(&self, tenant: Option<BasicTenantInfo>) {
        *self.0.lock() = tenant.map(Arc::new);
    }

    fn accessor(&self) -> impl Fn() -> Option<Arc<BasicTenantInfo>> + Send + Sync + 'static {
        let current = Arc::clone(&self.0);
        move || current.lock().clone()
    }
}

#[test]
fn test_monitor_builds_per_tenant_and_caches() {
    Lazy::force(&TRACING);
    let builds = Arc::new(AtomicUsize::new(0));
    let tenant = SwitchableTenant::default();
    let monitor = OptionsMonitor::builder()
        .factory(factory(&builds))
        .tenant_accessor(tenant.accessor())
        .build()
        .unwrap();

    tenant.set(Some(BasicTenantInfo::new("1", "acme")));
    let acme = monitor.current_value().unwrap();
    assert_eq!(acme.url, "postgres://acme");
    assert_eq!(acme.pool_size, 8);

    tenant.set(Some(BasicTenantInfo::new("2", "globex")));
    let globex = monitor.current_value().unwrap();
    assert_eq!(globex.url, "postgres://globex");

    tenant.set(None);
    let shared = monitor.current_value().unwrap();
    assert_eq!(shared.url, "postgres://shared");

    tenant.set(Some(BasicTenantInfo::new("1", "acme")));
    assert!(Arc::ptr_eq(&acme, &monitor.current_value().unwrap()));
    assert_eq!(builds.load(Ordering::SeqCst), 3);
}

#[test]
fn test_named_options_skip_unnamed_setup() {
    let builds = Arc::new(AtomicUsize::new(0));
    let monitor = OptionsMonitor::builder()
        .factory(factory(&builds))
        .tenant_accessor(FixedTenant::<BasicTenantInfo>::none())
        .build()
        .unwrap();

    let replica = monitor.get(Some("replica")).unwrap();
    assert_eq!(replica.url, "");
    assert_eq!(replica.pool_size, 8);
}

#[test]
fn test_change_evicts_name_for_every_tenant() {
    Lazy::force(&TRACING);
    let builds = Arc::new(AtomicUsize::new(0));
    let notifier = ChangeNotifier::new();
    let other_source = ChangeNotifier::named("replica");
    let tenant = SwitchableTenant::default();

    let monitor = OptionsMonitor::builder()
        .factory(factory(&builds))
        .tenant_accessor(tenant.accessor())
        .change_source(notifier.clone())
        .change_source(other_source.clone())
        .build()
        .unwrap();

    tenant.set(Some(BasicTenantInfo::new("1", "acme")));
    let acme = monitor.current_value().unwrap();
    let acme_replica = monitor.get(Some("replica")).unwrap();
    tenant.set(Some(BasicTenantInfo::new("2", "globex")));
    let globex = monitor.current_value().unwrap();

    notifier.notify();

    assert!(!monitor.cache().contains(Some("1"), None));
    assert!(!monitor.cache().contains(Some("2"), None));
    // A different source's name is untouched.
    assert!(monitor.cache().contains(Some("1"), Some("replica")));

    let globex_after = monitor.current_value().unwrap();
    assert!(!Arc::ptr_eq(&globex, &globex_after));

    tenant.set(Some(BasicTenantInfo::new("1", "acme")));
    assert!(!Arc::ptr_eq(&acme, &monitor.current_value().unwrap()));

    other_source.notify();
    assert!(!Arc::ptr_eq(
        &acme_replica,
        &monitor.get(Some("replica")).unwrap()
    ));
}

#[test]
fn test_change_listeners_receive_evicted_name() {
    let notifier = ChangeNotifier::named("replica");
    let monitor = OptionsMonitor::builder()
        .factory(factory(&Arc::new(AtomicUsize::new(0))))
        .tenant_accessor(FixedTenant::<BasicTenantInfo>::none())
        .change_source(notifier.clone())
        .build()
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let listener = monitor.on_change(move |name| sink.lock().push(name.to_string()));

    notifier.notify();
    drop(listener);
    notifier.notify();

    assert_eq!(*seen.lock(), vec!["replica".to_string()]);
}

#[test]
fn test_dropping_monitor_releases_subscriptions() {
    let notifier = ChangeNotifier::new();
    let monitor = OptionsMonitor::builder()
        .factory(factory(&Arc::new(AtomicUsize::new(0))))
        .tenant_accessor(FixedTenant::<BasicTenantInfo>::none())
        .change_source(notifier.clone())
        .change_source(notifier.clone())
        .build()
        .unwrap();

    assert_eq!(notifier.subscriber_count(), 2);
    drop(monitor);
    assert_eq!(notifier.subscriber_count(), 0);
}

#[test]
fn test_missing_factory_is_invalid_argument() {
    let result = OptionsMonitor::<ConnectionOptions, BasicTenantInfo>::builder()
        .tenant_accessor(FixedTenant::none())
        .build();

    assert!(matches!(result, Err(Error::InvalidArgument("factory"))));
}

#[test]
fn test_validation_failure_is_not_cached() {
    let allow = Arc::new(AtomicUsize::new(0));
    let gate = Arc::clone(&allow);
    let factory = Factory::builder()
        .validate(move |_, _| {
            if gate.load(Ordering::SeqCst) == 0 {
                Err("config not ready".to_string())
            } else {
                Ok(())
            }
        })
        .build();
    let monitor = OptionsMonitor::builder()
        .factory(factory)
        .tenant_accessor(FixedTenant::new(BasicTenantInfo::new("1", "acme")))
        .build()
        .unwrap();

    let err = monitor.current_value().unwrap_err();
    assert!(matches!(err, Error::Validation { ref failures, .. } if failures == &["config not ready"]));
    assert!(!monitor.cache().contains(Some("1"), None));

    allow.store(1, Ordering::SeqCst);
    assert!(monitor.current_value().is_ok());
}

#[test]
fn test_snapshot_is_isolated_from_changes() {
    let notifier = ChangeNotifier::new();
    let builds = Arc::new(AtomicUsize::new(0));
    let monitor = OptionsMonitor::builder()
        .factory(factory(&builds))
        .tenant_accessor(FixedTenant::new(BasicTenantInfo::new("1", "acme")))
        .change_source(notifier.clone())
        .build()
        .unwrap();

    let snapshot = monitor.snapshot();
    let before = snapshot.value().unwrap();
    assert_eq!(before.url, "postgres://acme");

    notifier.notify();

    assert!(Arc::ptr_eq(&before, &snapshot.value().unwrap()));
    // The snapshot did not populate the shared cache.
    assert!(!monitor.cache().contains(Some("1"), None));
}

#[test]
fn test_snapshots_do_not_share_values() {
    let factory = Arc::new(factory(&Arc::new(AtomicUsize::new(0))));
    let tenant = Arc::new(BasicTenantInfo::new("1", "acme"));

    let first = OptionsSnapshot::new(Arc::clone(&factory), Some(Arc::clone(&tenant)));
    let second = OptionsSnapshot::new(factory, Some(tenant));

    assert!(!Arc::ptr_eq(
        &first.value().unwrap(),
        &second.value().unwrap()
    ));
}

#[test]
fn test_tenant_cache_rejects_tenantless_contract_calls() {
    let cache: TenantOptionsCache<ConnectionOptions> = TenantOptionsCache::new();

    let err = OptionsMonitorCache::get_or_add(&cache, None, ConnectionOptions::default)
        .unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)));

    let err = OptionsMonitorCache::try_add(&cache, Some("x"), Arc::new(ConnectionOptions::default()))
        .unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)));

    assert!(!cache.contains(None, None));
    assert!(!cache.contains(None, Some("x")));
}
