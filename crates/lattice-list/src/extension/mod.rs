//! Pluggable adapter behaviors.
//!
//! An [`AdapterExtension`] observes every structural mutation (to keep its
//! own position-indexed state valid), may consume clicks, long-clicks and
//! touches, and may persist its state. Extensions are kept in registration
//! order and are keyed by [`AdapterExtension::key`], so registering a second
//! extension with the same key is a no-op.

mod expand;
mod select;
mod state;

use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;

use lattice_list_core::logging::targets;

pub use expand::{ExpandConfig, ExpandExtension};
pub use select::{SelectExtension, SelectionConfig};
pub use state::SavedState;

use crate::adapter::{ChangePayload, CompositeAdapter, RelativeInfo, TouchEvent};
use crate::error::AdapterResult;
use crate::provider::ProviderId;

/// A behavior plugged into a [`CompositeAdapter`].
///
/// Every method has a no-op default. Mutation callbacks run after the
/// adapter's state and position index have been updated, in registration
/// order, before the host is notified.
pub trait AdapterExtension: Send + Sync + 'static {
    /// Registry key; also the key under which state is persisted.
    fn key(&self) -> &'static str;

    /// Returns `true` to consume the click.
    fn on_click(&self, _adapter: &CompositeAdapter, _info: &RelativeInfo) -> bool {
        false
    }

    /// Returns `true` to consume the long-click.
    fn on_long_click(&self, _adapter: &CompositeAdapter, _info: &RelativeInfo) -> bool {
        false
    }

    /// Returns `true` to consume the touch.
    fn on_touch(&self, _adapter: &CompositeAdapter, _info: &RelativeInfo, _event: &TouchEvent) -> bool {
        false
    }

    fn on_items_inserted(&self, _adapter: &CompositeAdapter, _position: usize, _count: usize) {}

    fn on_items_removed(&self, _adapter: &CompositeAdapter, _position: usize, _count: usize) {}

    fn on_item_moved(&self, _adapter: &CompositeAdapter, _from: usize, _to: usize) {}

    fn on_items_changed(
        &self,
        _adapter: &CompositeAdapter,
        _position: usize,
        _count: usize,
        _payload: Option<&ChangePayload>,
    ) {
    }

    /// The contents were replaced wholesale. Recompute everything.
    fn on_reset(&self, _adapter: &CompositeAdapter) {}

    /// A provider's items were replaced through `set_items`.
    fn on_items_set(&self, _adapter: &CompositeAdapter, _provider: ProviderId) {}

    fn save_state(&self, _adapter: &CompositeAdapter) -> Option<serde_json::Value> {
        None
    }

    fn restore_state(&self, _adapter: &CompositeAdapter, _state: &serde_json::Value) -> AdapterResult<()> {
        Ok(())
    }
}

struct ExtensionEntry {
    extension: Arc<dyn AdapterExtension>,
    any: Arc<dyn Any + Send + Sync>,
}

/// Ordered set of extensions, keyed by [`AdapterExtension::key`].
#[derive(Default)]
pub(crate) struct ExtensionRegistry {
    entries: RwLock<Vec<ExtensionEntry>>,
}

impl ExtensionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add<E: AdapterExtension>(&self, extension: Arc<E>) -> bool {
        let mut entries = self.entries.write();
        if entries.iter().any(|entry| entry.extension.key() == extension.key()) {
            return false;
        }
        entries.push(ExtensionEntry {
            extension: extension.clone(),
            any: extension,
        });
        true
    }

    pub(crate) fn remove(&self, key: &str) -> Option<Arc<dyn AdapterExtension>> {
        let mut entries = self.entries.write();
        let index = entries.iter().position(|entry| entry.extension.key() == key)?;
        Some(entries.remove(index).extension)
    }

    pub(crate) fn get<E: AdapterExtension>(&self) -> Option<Arc<E>> {
        self.entries
            .read()
            .iter()
            .find_map(|entry| entry.any.clone().downcast::<E>().ok())
    }

    /// Extensions in registration order, cloned out of the lock.
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn AdapterExtension>> {
        self.entries
            .read()
            .iter()
            .map(|entry| entry.extension.clone())
            .collect()
    }

    pub(crate) fn keys(&self) -> Vec<&'static str> {
        self.entries
            .read()
            .iter()
            .map(|entry| entry.extension.key())
            .collect()
    }
}

impl CompositeAdapter {
    /// Registers an extension and lets it compute its state from the current contents.
    ///
    /// Returns `false` if an extension with the same key is already registered.
    pub fn add_extension<E: AdapterExtension>(&self, extension: Arc<E>) -> bool {
        let key = extension.key();
        if !self.inner.extensions.add(extension.clone()) {
            tracing::trace!(target: targets::EXTENSION, key, "extension already registered");
            return false;
        }
        tracing::debug!(target: targets::EXTENSION, key, "added extension");
        extension.on_reset(self);
        true
    }

    /// Unregisters the extension with `key`.
    pub fn remove_extension(&self, key: &str) -> bool {
        let removed = self.inner.extensions.remove(key).is_some();
        if removed {
            tracing::debug!(target: targets::EXTENSION, key, "removed extension");
        }
        removed
    }

    /// The registered extension of type `E`.
    pub fn extension<E: AdapterExtension>(&self) -> Option<Arc<E>> {
        self.inner.extensions.get::<E>()
    }

    /// The registered extension of type `E`, registering `create()` first if absent.
    pub fn get_or_add_extension<E, F>(&self, create: F) -> Arc<E>
    where
        E: AdapterExtension,
        F: FnOnce() -> E,
    {
        if let Some(extension) = self.extension::<E>() {
            return extension;
        }
        let extension = Arc::new(create());
        self.add_extension(extension.clone());
        extension
    }

    /// Keys of the registered extensions, in registration order.
    pub fn extension_keys(&self) -> Vec<&'static str> {
        self.inner.extensions.keys()
    }

    /// The selection extension, registering a default one if needed.
    pub fn select_extension(&self) -> Arc<SelectExtension> {
        self.get_or_add_extension(SelectExtension::new)
    }

    /// The expand extension, registering a default one if needed.
    pub fn expand_extension(&self) -> Arc<ExpandExtension> {
        self.get_or_add_extension(ExpandExtension::new)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::{Item, ItemProvider};

    struct Recorder {
        key: &'static str,
        consume: bool,
        clicks: AtomicUsize,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn new(key: &'static str, consume: bool, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                key,
                consume,
                clicks: AtomicUsize::new(0),
                log: log.clone(),
            })
        }
    }

    impl AdapterExtension for Recorder {
        fn key(&self) -> &'static str {
            self.key
        }

        fn on_click(&self, _adapter: &CompositeAdapter, _info: &RelativeInfo) -> bool {
            self.clicks.fetch_add(1, Ordering::SeqCst);
            self.consume
        }

        fn on_items_inserted(&self, _adapter: &CompositeAdapter, position: usize, count: usize) {
            self.log
                .lock()
                .push(format!("{}:inserted({position},{count})", self.key));
        }

        fn on_reset(&self, _adapter: &CompositeAdapter) {
            self.log.lock().push(format!("{}:reset", self.key));
        }
    }

    fn adapter_with_item() -> CompositeAdapter {
        let adapter = CompositeAdapter::new();
        let provider = ItemProvider::new();
        adapter.add_provider(0, &provider).unwrap();
        provider.add(vec![Item::new(0)]).unwrap();
        adapter
    }

    #[test]
    fn test_add_is_idempotent_by_key() {
        let adapter = CompositeAdapter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        assert!(adapter.add_extension(Recorder::new("a", false, &log)));
        assert!(!adapter.add_extension(Recorder::new("a", true, &log)));
        assert_eq!(adapter.extension_keys(), vec!["a"]);

        assert!(adapter.remove_extension("a"));
        assert!(!adapter.remove_extension("a"));
        assert!(adapter.extension_keys().is_empty());
    }

    #[test]
    fn test_mutations_reach_extensions_in_order() {
        let adapter = CompositeAdapter::new();
        let provider = ItemProvider::new();
        adapter.add_provider(0, &provider).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        adapter.add_extension(Recorder::new("first", false, &log));
        adapter.add_extension(Recorder::new("second", false, &log));

        provider.add(vec![Item::new(0); 2]).unwrap();
        assert_eq!(
            *log.lock(),
            vec![
                "first:reset",
                "second:reset",
                "first:inserted(0,2)",
                "second:inserted(0,2)",
            ]
        );
    }

    #[test]
    fn test_consuming_extension_short_circuits() {
        let adapter = adapter_with_item();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = Recorder::new("first", true, &log);
        let second = Recorder::new("second", false, &log);
        adapter.add_extension(first.clone());
        adapter.add_extension(second.clone());

        let global = Arc::new(AtomicUsize::new(0));
        let g = global.clone();
        adapter.set_on_click_listener(move |_, _| {
            g.fetch_add(1, Ordering::SeqCst);
            false
        });

        assert!(adapter.perform_click(0));
        assert_eq!(first.clicks.load(Ordering::SeqCst), 1);
        assert_eq!(second.clicks.load(Ordering::SeqCst), 0);
        assert_eq!(global.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_typed_lookup() {
        let adapter = CompositeAdapter::new();
        assert!(adapter.extension::<SelectExtension>().is_none());
        let select = adapter.select_extension();
        let again = adapter.select_extension();
        assert!(Arc::ptr_eq(&select, &again));
        assert!(adapter.extension::<ExpandExtension>().is_none());
    }
}
