//! # Change Notification
//!
//! Configuration sources announce changes through a [`ChangeSource`]. A
//! subscriber hands over a callback and receives a [`ChangeRegistration`];
//! the callback stays registered until that handle is dropped (or
//! [`dispose`](ChangeRegistration::dispose)d).
//!
//! [`ChangeNotifier`] is an in-process source that fires every subscriber on
//! [`notify`](ChangeNotifier::notify).
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use tenant_options_core::{ChangeNotifier, ChangeSource};
//!
//! let notifier = ChangeNotifier::named("smtp");
//! let fired = Arc::new(AtomicUsize::new(0));
//!
//! let counter = Arc::clone(&fired);
//! let registration = notifier.subscribe(Arc::new(move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! }));
//!
//! notifier.notify();
//! drop(registration);
//! notifier.notify();
//!
//! assert_eq!(fired.load(Ordering::SeqCst), 1);
//! ```

use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Callback invoked when a source changes.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// A provider of change notifications for one configuration source.
pub trait ChangeSource: Send + Sync {
    /// Name of the options instance this source feeds. `None` means the
    /// default name.
    fn name(&self) -> Option<&str>;

    /// Registers `callback` to run on every change until the returned handle
    /// is dropped.
    fn subscribe(&self, callback: ChangeCallback) -> ChangeRegistration;
}

/// Scoped handle for a registered callback.
///
/// Dropping the handle unregisters the callback. Callbacks already running
/// on another thread are allowed to finish.
#[must_use = "dropping the registration unsubscribes immediately"]
pub struct ChangeRegistration {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ChangeRegistration {
    /// Wraps the action that undoes a subscription.
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A registration with nothing to release.
    pub fn empty() -> Self {
        Self { release: None }
    }

    /// Releases the subscription now.
    pub fn dispose(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for ChangeRegistration {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for ChangeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeRegistration")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Id-keyed set of callbacks, shared by notifiers and change listeners.
///
/// Callbacks are invoked on a snapshot taken outside the lock, so a callback
/// may subscribe or unsubscribe without deadlocking.
pub(crate) struct CallbackSet<F: ?Sized> {
    next_id: AtomicU64,
    callbacks: RwLock<Vec<(u64, Arc<F>)>>,
}

impl<F: ?Sized> CallbackSet<F> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            callbacks: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn insert(&self, callback: Arc<F>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks.write().push((id, callback));
        id
    }

    pub(crate) fn remove(&self, id: u64) -> bool {
        let mut callbacks = self.callbacks.write();
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        callbacks.len() != before
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<F>> {
        self.callbacks
            .read()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.callbacks.read().len()
    }
}

impl<F: ?Sized + Send + Sync + 'static> CallbackSet<F> {
    /// Registers `callback` and returns a handle that removes it on drop.
    pub(crate) fn register(self: &Arc<Self>, callback: Arc<F>) -> ChangeRegistration {
        let id = self.insert(callback);
        let set: Weak<Self> = Arc::downgrade(self);
        ChangeRegistration::new(move || {
            if let Some(set) = set.upgrade() {
                set.remove(id);
            }
        })
    }
}

/// In-process change source.
///
/// Clones share the same subscriber list.
#[derive(Clone)]
pub struct ChangeNotifier {
    name: Option<String>,
    subscribers: Arc<CallbackSet<dyn Fn() + Send + Sync>>,
}

impl ChangeNotifier {
    /// A notifier for the default-named options.
    pub fn new() -> Self {
        Self {
            name: None,
            subscribers: Arc::new(CallbackSet::new()),
        }
    }

    /// A notifier for the options instance called `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new()
        }
    }

    /// Fires every current subscriber on the calling thread.
    pub fn notify(&self) {
        let subscribers = self.subscribers.snapshot();
        tracing::debug!(
            source = self.name.as_deref().unwrap_or_default(),
            subscribers = subscribers.len(),
            "configuration source changed"
        );
        for callback in subscribers {
            callback();
        }
    }

    /// Number of live subscriptions; drops as their handles are released.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeSource for ChangeNotifier {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn subscribe(&self, callback: ChangeCallback) -> ChangeRegistration {
        self.subscribers.register(callback)
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("name", &self.name)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, ChangeCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (
            count,
            Arc::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn test_notify_fires_every_subscriber() {
        let notifier = ChangeNotifier::new();
        let (first, cb1) = counter();
        let (second, cb2) = counter();
        let _r1 = notifier.subscribe(cb1);
        let _r2 = notifier.subscribe(cb2);

        notifier.notify();
        notifier.notify();

        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_dispose_unsubscribes() {
        let notifier = ChangeNotifier::named("db");
        let (count, cb) = counter();
        let registration = notifier.subscribe(cb);
        assert_eq!(notifier.subscriber_count(), 1);

        registration.dispose();
        assert_eq!(notifier.subscriber_count(), 0);

        notifier.notify();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_clones_share_subscribers() {
        let notifier = ChangeNotifier::new();
        let clone = notifier.clone();
        let (count, cb) = counter();
        let _registration = clone.subscribe(cb);

        notifier.notify();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_registration_outliving_notifier_is_harmless() {
        let notifier = ChangeNotifier::new();
        let (_, cb) = counter();
        let registration = notifier.subscribe(cb);
        drop(notifier);
        drop(registration);
    }

    #[test]
    fn test_callback_may_unsubscribe_itself() {
        let notifier = ChangeNotifier::new();
        let slot: Arc<parking_lot::Mutex<Option<ChangeRegistration>>> =
            Arc::new(parking_lot::Mutex::new(None));

        let inner = Arc::clone(&slot);
        let registration = notifier.subscribe(Arc::new(move || {
            inner.lock().take();
        }));
        *slot.lock() = Some(registration);

        notifier.notify();
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn test_empty_registration() {
        let registration = ChangeRegistration::empty();
        assert_eq!(format!("{registration:?}"), "ChangeRegistration { active: false }");
    }
}
