//! The composition root.
//!
//! [`CompositeAdapter`] stitches any number of providers into one flat list,
//! owns every item through its arena, and routes mutations and interactions
//! to the registered extensions.
//!
//! # Locking
//!
//! The adapter's state sits behind a `parking_lot::RwLock` used purely for
//! interior mutability. The lock is always released before an extension,
//! listener, hook, or signal slot runs, so callbacks may freely query or
//! mutate the adapter they were called from.

mod events;
mod hooks;
mod notifier;
mod operations;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use lattice_list_core::logging::targets;

pub use events::{ItemListener, TouchAction, TouchEvent, TouchListener};
pub use hooks::{
    ClickHook, CustomHook, CustomListener, EventHook, HookCapability, LongClickHook, TouchHook,
    ViewHolder,
};
pub use notifier::{AdapterSignals, ChangePayload, Mutation};

use crate::arena::{ItemArena, ItemKey};
use crate::error::{AdapterError, AdapterResult};
use crate::extension::ExtensionRegistry;
use crate::id_allocator::StableIdAllocator;
use crate::item::{Item, ViewType};
use crate::provider::list::ProviderList;
use crate::provider::{ItemProvider, ProviderId};
use crate::type_registry::TypeRegistry;

use events::GlobalListeners;

/// Everything guarded by the adapter's state lock.
pub(crate) struct AdapterState {
    pub(crate) arena: ItemArena,
    pub(crate) providers: ProviderList,
    pub(crate) handles: HashMap<ProviderId, ItemProvider>,
    pub(crate) types: TypeRegistry,
    pub(crate) ids: StableIdAllocator,
}

impl AdapterState {
    fn new() -> Self {
        Self {
            arena: ItemArena::new(),
            providers: ProviderList::new(),
            handles: HashMap::new(),
            types: TypeRegistry::new(),
            ids: StableIdAllocator::new(),
        }
    }

    pub(crate) fn order_of(&self, id: ProviderId) -> AdapterResult<usize> {
        self.providers.order_of(id).ok_or_else(|| {
            tracing::warn!(target: targets::ADAPTER, provider = ?id, "unknown provider");
            AdapterError::ProviderNotRegistered(id)
        })
    }

    pub(crate) fn provider_len(&self, order: usize) -> usize {
        self.providers
            .slot(order)
            .map_or(0, |slot| slot.keys.len())
    }

    fn relative_info(&self, position: usize) -> RelativeInfo {
        let Some((order, local)) = self.providers.resolve_local(position) else {
            return RelativeInfo::unresolved(position);
        };
        let Some(slot) = self.providers.slot(order) else {
            return RelativeInfo::unresolved(position);
        };
        let key = slot.keys.get(local).copied();
        RelativeInfo {
            provider: self.handles.get(&slot.id).cloned(),
            item: key
                .and_then(|key| self.arena.item(key))
                .map(Item::shallow_clone),
            key,
            position,
            local_position: local,
        }
    }
}

pub(crate) struct AdapterInner {
    pub(crate) state: RwLock<AdapterState>,
    pub(crate) extensions: ExtensionRegistry,
    pub(crate) listeners: RwLock<GlobalListeners>,
    pub(crate) hooks: RwLock<Vec<Arc<dyn EventHook>>>,
    pub(crate) signals: AdapterSignals,
}

/// Resolution of a global position at one instant.
///
/// Never hold on to one across a mutation: positions, providers and items
/// may all have changed.
#[derive(Debug, Clone)]
pub struct RelativeInfo {
    /// The provider owning the position, `None` when out of range.
    pub provider: Option<ItemProvider>,
    /// Snapshot of the item, `None` when out of range.
    pub item: Option<Item>,
    /// Arena key of the item.
    pub key: Option<ItemKey>,
    /// The global position that was resolved.
    pub position: usize,
    /// Position within the provider.
    pub local_position: usize,
}

impl RelativeInfo {
    fn unresolved(position: usize) -> Self {
        Self {
            provider: None,
            item: None,
            key: None,
            position,
            local_position: 0,
        }
    }

    /// Whether the position mapped to an item.
    pub fn is_resolved(&self) -> bool {
        self.item.is_some()
    }
}

/// A flat list composed from several providers.
///
/// Cloning is cheap and yields another handle to the same adapter.
///
/// # Example
///
/// ```
/// use lattice_list::{CompositeAdapter, Item, ItemProvider};
///
/// let adapter = CompositeAdapter::new();
/// let (a, b, c) = (ItemProvider::new(), ItemProvider::new(), ItemProvider::new());
/// adapter.add_provider(0, &a).unwrap();
/// adapter.add_provider(1, &b).unwrap();
/// adapter.add_provider(2, &c).unwrap();
/// a.add(vec![Item::new(0); 2]).unwrap();
/// c.add(vec![Item::new(0); 5]).unwrap();
///
/// let info = adapter.relative_info(6);
/// assert_eq!(info.provider.as_ref(), Some(&c));
/// assert_eq!(info.local_position, 4);
/// ```
#[derive(Clone)]
pub struct CompositeAdapter {
    pub(crate) inner: Arc<AdapterInner>,
}

impl Default for CompositeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CompositeAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("CompositeAdapter")
            .field("providers", &state.providers.len())
            .field("item_count", &state.providers.total())
            .field("stored_items", &state.arena.len())
            .field("extensions", &self.inner.extensions.keys())
            .finish()
    }
}

impl CompositeAdapter {
    /// Creates an adapter with no providers and no extensions.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(AdapterInner {
                state: RwLock::new(AdapterState::new()),
                extensions: ExtensionRegistry::new(),
                listeners: RwLock::new(GlobalListeners::default()),
                hooks: RwLock::new(Vec::new()),
                signals: AdapterSignals::default(),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<AdapterInner>) -> Self {
        Self { inner }
    }

    /// Host-facing change notifications.
    pub fn signals(&self) -> &AdapterSignals {
        &self.inner.signals
    }

    /// Whether two handles refer to the same adapter.
    pub fn ptr_eq(&self, other: &CompositeAdapter) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // Providers
    // =========================================================================

    /// Inserts `provider` at rank `order_hint`, shifting later providers down.
    ///
    /// Hints past the end append. Adding a provider that is already present
    /// is a no-op returning its current rank.
    pub fn add_provider(&self, order_hint: usize, provider: &ItemProvider) -> AdapterResult<usize> {
        provider.attach(&self.inner)?;
        let mut state = self.inner.state.write();
        let (order, inserted) = state.providers.insert(order_hint, provider.id());
        if inserted {
            state.handles.insert(provider.id(), provider.clone());
            tracing::debug!(
                target: targets::ADAPTER,
                provider = ?provider.id(),
                order,
                "added provider"
            );
        }
        Ok(order)
    }

    /// Appends `provider` after every existing provider.
    pub fn push_provider(&self, provider: &ItemProvider) -> AdapterResult<usize> {
        self.add_provider(usize::MAX, provider)
    }

    /// Removes `provider` and frees its items, including any a filter hides.
    pub fn remove_provider(&self, provider: &ItemProvider) -> AdapterResult<Vec<Item>> {
        let id = provider.id();
        let removed = self.mutate(|state| {
            let Some((order, slot)) = state.providers.remove(id) else {
                tracing::warn!(target: targets::ADAPTER, provider = ?id, "unknown provider");
                return Err(AdapterError::ProviderNotRegistered(id));
            };
            state.handles.remove(&id);
            let position = state.providers.count_before_order(order);
            let items: Vec<Item> = slot
                .keys
                .iter()
                .filter_map(|&key| state.arena.item(key).map(Item::shallow_clone))
                .collect();
            for &key in &slot.keys {
                state.arena.set_visible(key, false);
            }
            for key in slot.keys {
                state.arena.remove_tree(key);
            }
            state.free_hidden(slot.hidden);
            let mutation = (!items.is_empty()).then(|| Mutation::Removed {
                position,
                count: items.len(),
            });
            Ok((items, mutation))
        })?;
        provider.detach();
        tracing::debug!(target: targets::ADAPTER, provider = ?id, "removed provider");
        Ok(removed)
    }

    /// Replaces the whole provider set.
    ///
    /// Every stored item, view-type prototype and synthetic identifier is
    /// discarded; the new providers start empty. Extensions see a reset.
    pub fn set_providers(&self, providers: &[ItemProvider]) -> AdapterResult<()> {
        for provider in providers {
            if let Ok(adapter) = provider.adapter() {
                if !adapter.ptr_eq(self) {
                    return Err(AdapterError::ProviderAttachedElsewhere(provider.id()));
                }
            }
        }
        for provider in providers {
            provider.attach(&self.inner)?;
        }

        let previous = self.mutate(|state| {
            state.providers.take_all();
            state.arena.clear();
            state.types.clear();
            state.ids.reset();
            let previous: Vec<ItemProvider> = state.handles.drain().map(|(_, p)| p).collect();
            for provider in providers {
                let (_, inserted) = state.providers.insert(usize::MAX, provider.id());
                if inserted {
                    state.handles.insert(provider.id(), provider.clone());
                }
            }
            Ok((previous, Some(Mutation::Reset)))
        })?;

        for provider in previous {
            if !providers.contains(&provider) {
                provider.detach();
            }
        }
        tracing::debug!(
            target: targets::ADAPTER,
            providers = providers.len(),
            "replaced provider set"
        );
        Ok(())
    }

    /// Providers in composition order.
    pub fn providers(&self) -> Vec<ItemProvider> {
        let state = self.inner.state.read();
        state
            .providers
            .slots()
            .iter()
            .filter_map(|slot| state.handles.get(&slot.id).cloned())
            .collect()
    }

    pub fn provider_count(&self) -> usize {
        self.inner.state.read().providers.len()
    }

    /// The provider ranked at `order`.
    pub fn provider_at_order(&self, order: usize) -> Option<ItemProvider> {
        let state = self.inner.state.read();
        let slot = state.providers.slot(order)?;
        state.handles.get(&slot.id).cloned()
    }

    pub(crate) fn provider_order(&self, id: ProviderId) -> AdapterResult<usize> {
        self.inner.state.read().order_of(id)
    }

    pub(crate) fn provider_item_count(&self, id: ProviderId) -> AdapterResult<usize> {
        let state = self.inner.state.read();
        let order = state.order_of(id)?;
        Ok(state.provider_len(order))
    }

    pub(crate) fn provider_items(&self, id: ProviderId) -> AdapterResult<Vec<Item>> {
        let state = self.inner.state.read();
        let order = state.order_of(id)?;
        Ok(state
            .providers
            .slot(order)
            .map(|slot| {
                slot.keys
                    .iter()
                    .filter_map(|&key| state.arena.item(key).map(Item::shallow_clone))
                    .collect()
            })
            .unwrap_or_default())
    }

    pub(crate) fn provider_keys(&self, id: ProviderId) -> AdapterResult<Vec<ItemKey>> {
        let state = self.inner.state.read();
        let order = state.order_of(id)?;
        Ok(state
            .providers
            .slot(order)
            .map(|slot| slot.keys.clone())
            .unwrap_or_default())
    }

    // =========================================================================
    // Position index
    // =========================================================================

    /// Total number of visible items.
    pub fn item_count(&self) -> usize {
        self.inner.state.read().providers.total()
    }

    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    /// Number of stored items, counting collapsed sub-items and items a
    /// filter hides.
    pub fn stored_item_count(&self) -> usize {
        self.inner.state.read().arena.len()
    }

    /// Translates a provider-local position to a global one.
    pub fn global_position(&self, provider: &ItemProvider, local: usize) -> AdapterResult<usize> {
        let state = self.inner.state.read();
        let order = state.order_of(provider.id())?;
        Ok(state.providers.global_position(order, local))
    }

    /// Resolves a global position to its provider, item and local position.
    ///
    /// Out-of-range positions yield an unresolved result rather than an error.
    pub fn relative_info(&self, position: usize) -> RelativeInfo {
        self.inner.state.read().relative_info(position)
    }

    /// Number of visible items in providers ranked before `order`.
    pub fn count_before_order(&self, order: usize) -> usize {
        self.inner.state.read().providers.count_before_order(order)
    }

    /// Snapshot of the item at a global position.
    pub fn item(&self, position: usize) -> Option<Item> {
        let state = self.inner.state.read();
        let key = state.providers.key_at(position)?;
        state.arena.item(key).map(Item::shallow_clone)
    }

    /// Snapshot of every visible item in global order.
    pub fn items(&self) -> Vec<Item> {
        let state = self.inner.state.read();
        state
            .providers
            .keys()
            .filter_map(|key| state.arena.item(key).map(Item::shallow_clone))
            .collect()
    }

    pub fn item_view_type(&self, position: usize) -> Option<ViewType> {
        self.with_item(position, Item::view_type)
    }

    pub fn item_id(&self, position: usize) -> Option<i64> {
        self.with_item(position, Item::identifier)
    }

    /// Global position of the visible item with `identifier`.
    pub fn position_of(&self, identifier: i64) -> Option<usize> {
        let state = self.inner.state.read();
        state.providers.keys().position(|key| {
            state
                .arena
                .item(key)
                .is_some_and(|item| item.identifier() == identifier)
        })
    }

    /// Global position of a visible item.
    pub fn position_of_key(&self, key: ItemKey) -> Option<usize> {
        self.inner.state.read().providers.position_of_key(key)
    }

    /// The stored sub-item hierarchy of the item at `position`.
    pub fn sub_items(&self, position: usize) -> Vec<Item> {
        let state = self.inner.state.read();
        state
            .providers
            .key_at(position)
            .map(|key| state.arena.subtree(key))
            .unwrap_or_default()
    }

    /// Whether the item at `position` has any sub-items.
    pub fn has_sub_items(&self, position: usize) -> bool {
        let state = self.inner.state.read();
        state
            .providers
            .key_at(position)
            .is_some_and(|key| !state.arena.children_of(key).is_empty())
    }

    /// Global positions of every visible item matching `predicate`, ascending.
    pub fn positions_where<F>(&self, predicate: F) -> Vec<usize>
    where
        F: Fn(&Item) -> bool,
    {
        let state = self.inner.state.read();
        state
            .providers
            .keys()
            .enumerate()
            .filter(|(_, key)| state.arena.item(*key).is_some_and(&predicate))
            .map(|(position, _)| position)
            .collect()
    }

    fn with_item<R>(&self, position: usize, f: impl FnOnce(&Item) -> R) -> Option<R> {
        let state = self.inner.state.read();
        let key = state.providers.key_at(position)?;
        state.arena.item(key).map(f)
    }

    /// Runs `f` on the stored item without reporting a change.
    ///
    /// Used by extensions to mirror their state into item flags before they
    /// notify the host themselves.
    pub(crate) fn update_item<R>(&self, key: ItemKey, f: impl FnOnce(&mut Item) -> R) -> Option<R> {
        let mut state = self.inner.state.write();
        state.arena.get_mut(key).map(|node| f(&mut node.item))
    }

    /// Stored children of `key` that no provider currently lists.
    pub(crate) fn hidden_children(&self, key: ItemKey) -> Vec<ItemKey> {
        let state = self.inner.state.read();
        state
            .arena
            .children_of(key)
            .iter()
            .copied()
            .filter(|&child| state.arena.get(child).is_some_and(|node| !node.visible))
            .collect()
    }

    pub(crate) fn child_count(&self, key: ItemKey) -> usize {
        self.inner.state.read().arena.children_of(key).len()
    }

    pub(crate) fn parent_key(&self, key: ItemKey) -> Option<ItemKey> {
        self.inner.state.read().arena.parent_of(key)
    }

    pub(crate) fn is_ancestor(&self, ancestor: ItemKey, key: ItemKey) -> bool {
        self.inner.state.read().arena.is_ancestor(ancestor, key)
    }

    pub(crate) fn visible_descendants(&self, key: ItemKey) -> Vec<ItemKey> {
        self.inner.state.read().arena.visible_descendants(key)
    }

    /// Clears the expanded flag of `key` and all of its descendants.
    pub(crate) fn collapse_subtree(&self, key: ItemKey) {
        let mut state = self.inner.state.write();
        if let Some(node) = state.arena.get_mut(key) {
            node.item.expanded = false;
        }
        state.arena.collapse_descendants(key);
    }

    // =========================================================================
    // Registries
    // =========================================================================

    /// The prototype registered for `view_type`.
    pub fn type_prototype(&self, view_type: ViewType) -> Option<Item> {
        self.inner
            .state
            .read()
            .types
            .get(view_type)
            .map(Item::shallow_clone)
    }

    /// Every view type seen so far, ascending.
    pub fn view_types(&self) -> Vec<ViewType> {
        self.inner.state.read().types.view_types()
    }
}
