//! Provider-scoped mutations.
//!
//! [`ItemProvider`](crate::ItemProvider) handles delegate here. Each
//! operation validates against the provider's current length before
//! touching anything, then goes through [`CompositeAdapter::mutate`].

use std::collections::HashSet;

use lattice_list_core::list_trace;

use super::{AdapterState, CompositeAdapter, Mutation};
use crate::arena::ItemKey;
use crate::error::{AdapterError, AdapterResult, check_range};
use crate::item::Item;
use crate::provider::ProviderId;

impl AdapterState {
    /// Stores `items` and marks them visible.
    fn store(&mut self, items: Vec<Item>) -> Vec<ItemKey> {
        let AdapterState {
            arena, types, ids, ..
        } = self;
        items
            .into_iter()
            .map(|item| {
                let key = arena.insert_tree(item, None, ids, types);
                arena.set_visible(key, true);
                key
            })
            .collect()
    }

    /// Snapshots then frees `keys`, which must already be out of every provider.
    fn release(&mut self, keys: &[ItemKey]) -> Vec<Item> {
        let items = keys
            .iter()
            .filter_map(|&key| self.arena.item(key).map(Item::shallow_clone))
            .collect();
        for &key in keys {
            self.arena.set_visible(key, false);
        }
        for &key in keys {
            self.arena.remove_tree(key);
        }
        items
    }

    /// Frees the keys a filter was hiding in the slot at `order`.
    pub(crate) fn release_hidden(&mut self, order: usize) {
        let hidden = match self.providers.slot_mut(order) {
            Some(slot) => std::mem::take(&mut slot.hidden),
            None => return,
        };
        self.free_hidden(hidden);
    }

    /// Frees `keys` that are still stored and out of view.
    pub(crate) fn free_hidden(&mut self, keys: Vec<ItemKey>) {
        for key in keys {
            if self.arena.get(key).is_some_and(|node| !node.visible) {
                self.arena.remove_tree(key);
            }
        }
    }
}

impl CompositeAdapter {
    pub(crate) fn provider_insert(
        &self,
        id: ProviderId,
        local: Option<usize>,
        items: Vec<Item>,
    ) -> AdapterResult<()> {
        self.mutate(|state| {
            let order = state.order_of(id)?;
            let len = state.provider_len(order);
            let local = local.unwrap_or(len);
            check_range(local, 0, len)?;
            if items.is_empty() {
                return Ok(((), None));
            }

            let count = items.len();
            let keys = state.store(items);
            if let Some(slot) = state.providers.slot_mut(order) {
                slot.keys.splice(local..local, keys);
            }
            let position = state.providers.global_position(order, local);
            Ok(((), Some(Mutation::Inserted { position, count })))
        })
    }

    pub(crate) fn provider_remove(
        &self,
        id: ProviderId,
        local: usize,
        count: usize,
    ) -> AdapterResult<Vec<Item>> {
        self.mutate(|state| {
            let order = state.order_of(id)?;
            check_range(local, count, state.provider_len(order))?;
            if count == 0 {
                return Ok((Vec::new(), None));
            }

            let keys: Vec<ItemKey> = match state.providers.slot_mut(order) {
                Some(slot) => slot.keys.drain(local..local + count).collect(),
                None => Vec::new(),
            };
            let items = state.release(&keys);
            let position = state.providers.global_position(order, local);
            Ok((items, Some(Mutation::Removed { position, count })))
        })
    }

    pub(crate) fn provider_move(&self, id: ProviderId, from: usize, to: usize) -> AdapterResult<()> {
        self.mutate(|state| {
            let order = state.order_of(id)?;
            let len = state.provider_len(order);
            if from >= len || to >= len {
                tracing::warn!(
                    target: lattice_list_core::logging::targets::MUTATION,
                    from,
                    to,
                    len,
                    "rejecting move"
                );
                return Err(AdapterError::InvalidMove { from, to, len });
            }
            if from == to {
                return Ok(((), None));
            }

            if let Some(slot) = state.providers.slot_mut(order) {
                let key = slot.keys.remove(from);
                slot.keys.insert(to, key);
            }
            let offset = state.providers.count_before_order(order);
            Ok((
                (),
                Some(Mutation::Moved {
                    from: offset + from,
                    to: offset + to,
                }),
            ))
        })
    }

    pub(crate) fn provider_set(&self, id: ProviderId, local: usize, item: Item) -> AdapterResult<()> {
        self.mutate(|state| {
            let order = state.order_of(id)?;
            check_range(local, 1, state.provider_len(order))?;

            let key = state.store(vec![item]);
            let old = match state.providers.slot_mut(order) {
                Some(slot) => std::mem::replace(&mut slot.keys[local], key[0]),
                None => return Ok(((), None)),
            };
            state.release(&[old]);
            let position = state.providers.global_position(order, local);
            Ok((
                (),
                Some(Mutation::Changed {
                    position,
                    count: 1,
                    payload: None,
                }),
            ))
        })
    }

    pub(crate) fn provider_modify<F, R>(&self, id: ProviderId, local: usize, f: F) -> AdapterResult<R>
    where
        F: FnOnce(&mut Item) -> R,
    {
        self.mutate(|state| {
            let order = state.order_of(id)?;
            let len = state.provider_len(order);
            check_range(local, 1, len)?;

            let key = state
                .providers
                .slot(order)
                .and_then(|slot| slot.keys.get(local).copied())
                .ok_or_else(|| AdapterError::out_of_bounds(local, 1, len))?;
            let node = state
                .arena
                .get_mut(key)
                .ok_or_else(|| AdapterError::out_of_bounds(local, 1, len))?;
            let result = f(&mut node.item);
            node.item.sub_items.clear();

            let position = state.providers.global_position(order, local);
            Ok((
                result,
                Some(Mutation::Changed {
                    position,
                    count: 1,
                    payload: None,
                }),
            ))
        })
    }

    /// Removes every item of a provider, including items a filter hides.
    pub(crate) fn provider_clear(&self, id: ProviderId) -> AdapterResult<Vec<Item>> {
        self.mutate(|state| {
            let order = state.order_of(id)?;
            let keys = match state.providers.slot_mut(order) {
                Some(slot) => {
                    slot.generation += 1;
                    std::mem::take(&mut slot.keys)
                }
                None => Vec::new(),
            };
            let items = state.release(&keys);
            state.release_hidden(order);

            let position = state.providers.count_before_order(order);
            let mutation = (!items.is_empty()).then(|| Mutation::Removed {
                position,
                count: items.len(),
            });
            Ok((items, mutation))
        })
    }

    /// Replaces every item of a provider.
    ///
    /// Equal lengths are reported as one in-place change, otherwise as a
    /// removal of the old run followed by an insertion of the new one.
    /// Items a filter was hiding are freed too, which drops the filter.
    pub(crate) fn provider_set_items(&self, id: ProviderId, items: Vec<Item>) -> AdapterResult<()> {
        let old_len = self.provider_item_count(id)?;
        if old_len == items.len() && old_len > 0 {
            self.mutate(|state| {
                let order = state.order_of(id)?;
                let keys = state.store(items);
                let old = match state.providers.slot_mut(order) {
                    Some(slot) => {
                        slot.generation += 1;
                        std::mem::replace(&mut slot.keys, keys)
                    }
                    None => Vec::new(),
                };
                state.release(&old);
                state.release_hidden(order);
                let position = state.providers.count_before_order(order);
                Ok((
                    (),
                    Some(Mutation::Changed {
                        position,
                        count: old_len,
                        payload: None,
                    }),
                ))
            })?;
        } else {
            self.provider_clear(id)?;
            self.provider_insert(id, Some(0), items)?;
        }

        for extension in self.inner.extensions.snapshot() {
            extension.on_items_set(self, id);
        }
        Ok(())
    }

    /// Content generation of a provider; changes on `set_items` and `clear`.
    pub(crate) fn provider_generation(&self, id: ProviderId) -> AdapterResult<u64> {
        let state = self.inner.state.read();
        let order = state.order_of(id)?;
        Ok(state.providers.slot(order).map_or(0, |slot| slot.generation))
    }

    /// Local positions of the visible `keys` in a provider, ascending.
    pub(crate) fn provider_local_positions(&self, id: ProviderId, keys: &[ItemKey]) -> AdapterResult<Vec<usize>> {
        let state = self.inner.state.read();
        let order = state.order_of(id)?;
        let mut positions: Vec<usize> = state
            .providers
            .slot(order)
            .map(|slot| {
                slot.keys
                    .iter()
                    .enumerate()
                    .filter(|(_, key)| keys.contains(key))
                    .map(|(local, _)| local)
                    .collect()
            })
            .unwrap_or_default();
        positions.sort_unstable();
        Ok(positions)
    }

    /// Reinserts already stored keys (e.g. sub-items being expanded).
    pub(crate) fn provider_show(
        &self,
        id: ProviderId,
        local: usize,
        keys: Vec<ItemKey>,
    ) -> AdapterResult<()> {
        self.mutate(|state| {
            let order = state.order_of(id)?;
            check_range(local, 0, state.provider_len(order))?;
            let keys: Vec<ItemKey> = keys
                .into_iter()
                .filter(|&key| state.arena.contains(key))
                .collect();
            if keys.is_empty() {
                return Ok(((), None));
            }

            let count = keys.len();
            for &key in &keys {
                state.arena.set_visible(key, true);
            }
            if let Some(slot) = state.providers.slot_mut(order) {
                slot.keys.splice(local..local, keys);
            }
            let position = state.providers.global_position(order, local);
            Ok(((), Some(Mutation::Inserted { position, count })))
        })
    }

    /// Takes keys out of a provider without freeing them.
    pub(crate) fn provider_hide(&self, id: ProviderId, local: usize, count: usize) -> AdapterResult<()> {
        self.mutate(|state| {
            let order = state.order_of(id)?;
            check_range(local, count, state.provider_len(order))?;
            if count == 0 {
                return Ok(((), None));
            }

            if let Some(slot) = state.providers.slot_mut(order) {
                for key in slot.keys.drain(local..local + count) {
                    state.arena.set_visible(key, false);
                }
            }
            let position = state.providers.global_position(order, local);
            Ok(((), Some(Mutation::Removed { position, count })))
        })
    }

    /// Swaps a provider's visible keys for `keys` and resets.
    ///
    /// Keys dropped from view stay stored, and recorded as hidden, so they
    /// can be shown again.
    pub(crate) fn provider_replace_keys(&self, id: ProviderId, keys: Vec<ItemKey>) -> AdapterResult<()> {
        self.mutate(|state| {
            let order = state.order_of(id)?;
            let keys: Vec<ItemKey> = keys
                .into_iter()
                .filter(|&key| state.arena.contains(key))
                .collect();
            let (old, previously_hidden) = match state.providers.slot_mut(order) {
                Some(slot) => (std::mem::take(&mut slot.keys), std::mem::take(&mut slot.hidden)),
                None => (Vec::new(), Vec::new()),
            };
            let mut seen: HashSet<ItemKey> = keys.iter().copied().collect();
            let hidden: Vec<ItemKey> = old
                .into_iter()
                .chain(previously_hidden)
                .filter(|&key| state.arena.contains(key) && seen.insert(key))
                .collect();
            for &key in &hidden {
                state.arena.set_visible(key, false);
            }
            for &key in &keys {
                state.arena.set_visible(key, true);
            }
            list_trace!(
                provider = ?id,
                visible = keys.len(),
                hidden = hidden.len(),
                "replaced visible keys"
            );
            if let Some(slot) = state.providers.slot_mut(order) {
                slot.keys = keys;
                slot.hidden = hidden;
            }
            Ok(((), Some(Mutation::Reset)))
        })
    }
}
