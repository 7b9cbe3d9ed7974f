//! Ordered provider slots and the cumulative-offset index.

use std::collections::BTreeMap;

use lattice_list_core::PerfSpan;
use lattice_list_core::logging::{span_names, targets};

use super::ProviderId;
use crate::arena::ItemKey;

/// One provider's share of the composed list.
#[derive(Debug)]
pub(crate) struct ProviderSlot {
    pub(crate) id: ProviderId,
    /// Visible item keys in local order.
    pub(crate) keys: Vec<ItemKey>,
    /// Stored keys a filter has taken out of view.
    pub(crate) hidden: Vec<ItemKey>,
    /// Bumped whenever the whole content is replaced or cleared.
    pub(crate) generation: u64,
}

/// Providers in composition order plus a floor index over their offsets.
///
/// A provider's order is its index in `slots`; every insertion or removal
/// re-ranks the providers that follow it. The offset map and the total are
/// only ever replaced together by [`ProviderList::rebuild`].
#[derive(Debug, Default)]
pub(crate) struct ProviderList {
    slots: Vec<ProviderSlot>,
    offsets: BTreeMap<usize, usize>,
    total: usize,
}

impl ProviderList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts a provider at `order_hint` (clamped to the end).
    ///
    /// A provider already present keeps its slot; returns its order and `false`.
    pub(crate) fn insert(&mut self, order_hint: usize, id: ProviderId) -> (usize, bool) {
        if let Some(order) = self.order_of(id) {
            return (order, false);
        }
        let order = order_hint.min(self.slots.len());
        self.slots.insert(
            order,
            ProviderSlot {
                id,
                keys: Vec::new(),
                hidden: Vec::new(),
                generation: 0,
            },
        );
        self.rebuild();
        (order, true)
    }

    /// Removes a provider, returning its slot.
    pub(crate) fn remove(&mut self, id: ProviderId) -> Option<(usize, ProviderSlot)> {
        let order = self.order_of(id)?;
        let slot = self.slots.remove(order);
        self.rebuild();
        Some((order, slot))
    }

    /// Removes every provider.
    pub(crate) fn take_all(&mut self) -> Vec<ProviderSlot> {
        let slots = std::mem::take(&mut self.slots);
        self.rebuild();
        slots
    }

    pub(crate) fn order_of(&self, id: ProviderId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.id == id)
    }

    pub(crate) fn slot(&self, order: usize) -> Option<&ProviderSlot> {
        self.slots.get(order)
    }

    /// Mutable access to a slot's keys. Callers must [`rebuild`](Self::rebuild) afterwards.
    pub(crate) fn slot_mut(&mut self, order: usize) -> Option<&mut ProviderSlot> {
        self.slots.get_mut(order)
    }

    pub(crate) fn slots(&self) -> &[ProviderSlot] {
        &self.slots
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Total number of visible items across all providers.
    pub(crate) fn total(&self) -> usize {
        self.total
    }

    /// Recomputes the offset map and the total from the slots.
    ///
    /// Empty providers get no entry, except that the first provider is
    /// indexed at offset zero when no provider has items.
    pub(crate) fn rebuild(&mut self) {
        let _span = PerfSpan::new(span_names::INDEX_REBUILD);
        let mut offsets = BTreeMap::new();
        let mut total = 0;
        for (order, slot) in self.slots.iter().enumerate() {
            if !slot.keys.is_empty() {
                offsets.insert(total, order);
                total += slot.keys.len();
            }
        }
        if offsets.is_empty() && !self.slots.is_empty() {
            offsets.insert(0, 0);
        }
        self.offsets = offsets;
        self.total = total;
        tracing::trace!(
            target: targets::ADAPTER,
            providers = self.slots.len(),
            total,
            "rebuilt position index"
        );
    }

    /// Maps a global position to `(order, local_position)`.
    pub(crate) fn resolve_local(&self, position: usize) -> Option<(usize, usize)> {
        if position >= self.total {
            return None;
        }
        let (&offset, &order) = self.offsets.range(..=position).next_back()?;
        Some((order, position - offset))
    }

    /// Sum of the item counts of every provider ranked before `order`.
    pub(crate) fn count_before_order(&self, order: usize) -> usize {
        self.slots
            .iter()
            .take(order)
            .map(|slot| slot.keys.len())
            .sum()
    }

    /// Maps a provider-local position to a global one.
    pub(crate) fn global_position(&self, order: usize, local: usize) -> usize {
        self.count_before_order(order) + local
    }

    /// The key shown at a global position.
    pub(crate) fn key_at(&self, position: usize) -> Option<ItemKey> {
        let (order, local) = self.resolve_local(position)?;
        self.slots.get(order)?.keys.get(local).copied()
    }

    /// Global position of a visible key.
    pub(crate) fn position_of_key(&self, key: ItemKey) -> Option<usize> {
        let mut offset = 0;
        for slot in &self.slots {
            if let Some(local) = slot.keys.iter().position(|&k| k == key) {
                return Some(offset + local);
            }
            offset += slot.keys.len();
        }
        None
    }

    /// Every visible key in global order.
    pub(crate) fn keys(&self) -> impl Iterator<Item = ItemKey> + '_ {
        self.slots.iter().flat_map(|slot| slot.keys.iter().copied())
    }
}
