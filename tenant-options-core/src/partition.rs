use crate::normalize_name;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "stats")]
use crate::CacheStats;

type Cell<T> = Arc<OnceCell<Arc<T>>>;

/// A thread-safe map from configuration name to a lazily built value.
///
/// Each name owns a cell that is either empty or holds one `Arc<T>`. The map
/// lock (a `DashMap` shard) is only held long enough to find or insert the
/// cell; the value itself is built outside of it through the cell's
/// single-flight initializer. A slow factory therefore blocks only callers
/// racing for the same name.
///
/// Names are normalized with [`normalize_name`] on every entry point, so
/// `None` and `Some("")` address the same cell.
///
/// # Thread Safety
///
/// - At most one factory wins per name until the name is removed or cleared.
/// - Losing callers block until the winner finishes and then receive its value.
/// - A factory that fails leaves the cell empty; the next caller retries.
///
/// A factory must not request its own name from the same partition: the
/// nested call would wait on itself.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tenant_options_core::NamedPartition;
///
/// let partition: NamedPartition<Vec<u8>> = NamedPartition::new();
///
/// let first = partition.get_or_add(None, || vec![1, 2, 3]);
/// let second = partition.get_or_add(Some(""), || unreachable!());
/// assert!(Arc::ptr_eq(&first, &second));
///
/// assert!(partition.try_remove(None));
/// assert!(!partition.try_remove(None));
/// ```
pub struct NamedPartition<T> {
    cells: DashMap<String, Cell<T>>,
    #[cfg(feature = "stats")]
    stats: CacheStats,
}

impl<T> NamedPartition<T> {
    /// Creates an empty partition.
    pub fn new() -> Self {
        Self {
            cells: DashMap::new(),
            #[cfg(feature = "stats")]
            stats: CacheStats::new(),
        }
    }

    /// Returns the value cached under `name`, if populated.
    pub fn get(&self, name: Option<&str>) -> Option<Arc<T>> {
        let name = normalize_name(name);
        self.cells
            .get(name)
            .and_then(|cell| cell.get().map(Arc::clone))
    }

    /// Returns the value for `name`, building it with `factory` on a miss.
    pub fn get_or_add<F>(&self, name: Option<&str>, factory: F) -> Arc<T>
    where
        F: FnOnce() -> T,
    {
        match self.try_get_or_add(name, || Ok::<T, Infallible>(factory())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Fallible form of [`get_or_add`](Self::get_or_add).
    ///
    /// The factory's error is returned to this caller and nothing is stored,
    /// so a later call runs construction again.
    pub fn try_get_or_add<F, E>(&self, name: Option<&str>, factory: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let name = normalize_name(name);

        if let Some(value) = self.get(Some(name)) {
            #[cfg(feature = "stats")]
            self.stats.record_hit();
            return Ok(value);
        }

        #[cfg(feature = "stats")]
        self.stats.record_miss();

        // Clone the cell out so the shard lock is released before building.
        let cell = Arc::clone(
            self.cells
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .value(),
        );

        let mut built = false;
        let value = cell.get_or_try_init(|| {
            built = true;
            factory().map(Arc::new)
        })?;

        if built {
            #[cfg(feature = "stats")]
            self.stats.record_construction();
            tracing::trace!(name, "built options value");
        }

        Ok(Arc::clone(value))
    }

    /// Stores `value` under `name` only if no value is present.
    ///
    /// Returns `false` and leaves the existing value in place otherwise. If a
    /// build for `name` is in flight, this waits for it and then returns
    /// `false`.
    pub fn try_add(&self, name: Option<&str>, value: Arc<T>) -> bool {
        let name = normalize_name(name);

        let cell = match self.cells.entry(name.to_string()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(OnceCell::with_value(value)));
                return true;
            }
        };

        // An empty cell left behind by a failed build counts as absent.
        cell.set(value).is_ok()
    }

    /// Removes `name`, returning whether a value was present.
    pub fn try_remove(&self, name: Option<&str>) -> bool {
        let name = normalize_name(name);
        self.cells
            .remove(name)
            .map_or(false, |(_, cell)| cell.get().is_some())
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.cells.clear();
    }

    /// Whether `name` holds a value. A build still in flight does not count.
    pub fn contains(&self, name: Option<&str>) -> bool {
        self.get(name).is_some()
    }

    /// Number of populated names.
    pub fn len(&self) -> usize {
        self.cells
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .count()
    }

    /// `true` when no name holds a value.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names that currently hold a value, in no particular order.
    pub fn names(&self) -> Vec<String> {
        self.cells
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .map(|entry| entry.key().clone())
            .collect()
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl<T> Default for NamedPartition<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for NamedPartition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedPartition")
            .field("names", &self.names())
            .finish()
    }
}
