//! Selection state.
//!
//! [`SelectExtension`] keeps the set of selected global positions and mirrors
//! it into each item's `selected` flag. The set is shifted after every
//! structural mutation before anyone can observe it, and recomputed from the
//! flags on reset.

use std::collections::BTreeSet;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use lattice_list_core::Signal;
use lattice_list_core::logging::targets;

use super::AdapterExtension;
use crate::adapter::{ChangePayload, CompositeAdapter, RelativeInfo};
use crate::arena::ItemKey;
use crate::error::{AdapterError, AdapterResult};
use crate::item::Item;
use crate::util;

/// Selection behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Master switch for selection through clicks.
    pub selectable: bool,
    /// Allow more than one selected item.
    pub multi_select: bool,
    /// Select on long-click instead of click.
    pub select_on_long_click: bool,
    /// Let a click deselect an already selected item.
    pub allow_deselection: bool,
    /// Report a [`ChangePayload::Selection`] change for every (de)selection.
    pub select_with_item_update: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            selectable: true,
            multi_select: false,
            select_on_long_click: false,
            allow_deselection: true,
            select_with_item_update: false,
        }
    }
}

impl SelectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selectable(mut self, selectable: bool) -> Self {
        self.selectable = selectable;
        self
    }

    pub fn with_multi_select(mut self, multi_select: bool) -> Self {
        self.multi_select = multi_select;
        self
    }

    pub fn with_select_on_long_click(mut self, select_on_long_click: bool) -> Self {
        self.select_on_long_click = select_on_long_click;
        self
    }

    pub fn with_allow_deselection(mut self, allow_deselection: bool) -> Self {
        self.allow_deselection = allow_deselection;
        self
    }

    pub fn with_select_with_item_update(mut self, select_with_item_update: bool) -> Self {
        self.select_with_item_update = select_with_item_update;
        self
    }
}

/// One persisted selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct SavedSelection {
    position: usize,
    identifier: i64,
}

/// Tracks which positions are selected.
///
/// # Example
///
/// ```
/// use lattice_list::{CompositeAdapter, Item, ItemProvider, SelectionConfig};
///
/// let adapter = CompositeAdapter::new();
/// let provider = ItemProvider::new();
/// adapter.add_provider(0, &provider).unwrap();
/// provider.add(vec![Item::new(0); 5]).unwrap();
///
/// let select = adapter.select_extension();
/// select.set_config(SelectionConfig::new().with_multi_select(true));
/// select.select(&adapter, 1, true, true);
/// select.select(&adapter, 3, true, true);
///
/// provider.add_at(0, vec![Item::new(0)]).unwrap();
/// assert_eq!(select.selected_positions(), vec![2, 4]);
/// ```
#[derive(Debug, Default)]
pub struct SelectExtension {
    config: RwLock<SelectionConfig>,
    selected: RwLock<BTreeSet<usize>>,
    /// Emitted with `(position, selected)` for every fired (de)selection.
    pub selection_changed: Signal<(usize, bool)>,
}

impl SelectExtension {
    /// Registry and persistence key.
    pub const KEY: &'static str = "select";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SelectionConfig) -> Self {
        Self {
            config: RwLock::new(config),
            ..Self::default()
        }
    }

    pub fn config(&self) -> SelectionConfig {
        *self.config.read()
    }

    pub fn set_config(&self, config: SelectionConfig) {
        *self.config.write() = config;
    }

    pub fn set_multi_select(&self, multi_select: bool) {
        self.config.write().multi_select = multi_select;
    }

    pub fn set_allow_deselection(&self, allow_deselection: bool) {
        self.config.write().allow_deselection = allow_deselection;
    }

    /// Selected positions, ascending.
    pub fn selected_positions(&self) -> Vec<usize> {
        self.selected.read().iter().copied().collect()
    }

    pub fn selections(&self) -> BTreeSet<usize> {
        self.selected.read().clone()
    }

    pub fn is_selected(&self, position: usize) -> bool {
        self.selected.read().contains(&position)
    }

    /// Snapshots of the selected items, in position order.
    pub fn selected_items(&self, adapter: &CompositeAdapter) -> Vec<Item> {
        self.selected_positions()
            .into_iter()
            .filter_map(|position| adapter.item(position))
            .collect()
    }

    /// Flips the selection of `position`.
    ///
    /// In single-select mode every other selected position is deselected
    /// first, in ascending order.
    pub fn toggle(&self, adapter: &CompositeAdapter, position: usize) {
        if !adapter.relative_info(position).is_resolved() {
            tracing::trace!(target: targets::SELECTION, position, "toggle out of range");
            return;
        }
        if !self.config().multi_select {
            self.deselect_others(adapter, Some(position));
        }
        if self.is_selected(position) {
            self.deselect(adapter, position);
        } else {
            self.select(adapter, position, true, false);
        }
    }

    /// Selects `position`. Returns whether anything changed.
    ///
    /// Out-of-range positions are ignored, as are unselectable items when
    /// `respect_selectable` is set.
    pub fn select(
        &self,
        adapter: &CompositeAdapter,
        position: usize,
        fire_event: bool,
        respect_selectable: bool,
    ) -> bool {
        let info = adapter.relative_info(position);
        let (Some(item), Some(key)) = (info.item, info.key) else {
            tracing::trace!(target: targets::SELECTION, position, "select out of range");
            return false;
        };
        if respect_selectable && !item.is_selectable() {
            tracing::trace!(target: targets::SELECTION, position, "item not selectable");
            return false;
        }
        if !self.config().multi_select {
            self.deselect_others(adapter, Some(position));
        }
        if self.is_selected(position) && item.is_selected() {
            return false;
        }
        self.apply(adapter, position, key, true, fire_event);
        true
    }

    /// Deselects `position`. Returns whether anything changed.
    pub fn deselect(&self, adapter: &CompositeAdapter, position: usize) -> bool {
        let info = adapter.relative_info(position);
        let (Some(item), Some(key)) = (info.item, info.key) else {
            tracing::trace!(target: targets::SELECTION, position, "deselect out of range");
            return false;
        };
        if !self.is_selected(position) && !item.is_selected() {
            return false;
        }
        self.apply(adapter, position, key, false, true);
        true
    }

    /// Selects every selectable item. Ignored in single-select mode.
    pub fn select_all(&self, adapter: &CompositeAdapter) {
        if !self.config().multi_select {
            tracing::trace!(target: targets::SELECTION, "select_all ignored in single-select mode");
            return;
        }
        for position in 0..adapter.item_count() {
            self.select(adapter, position, true, true);
        }
    }

    /// Deselects every selected position, ascending.
    pub fn deselect_all(&self, adapter: &CompositeAdapter) {
        self.deselect_others(adapter, None);
    }

    /// Selects the visible item with `identifier`.
    pub fn select_by_identifier(
        &self,
        adapter: &CompositeAdapter,
        identifier: i64,
        fire_event: bool,
        respect_selectable: bool,
    ) -> bool {
        adapter
            .position_of(identifier)
            .is_some_and(|position| self.select(adapter, position, fire_event, respect_selectable))
    }

    /// Removes every selected item from its provider. Returns them in position order.
    pub fn delete_all_selected_items(&self, adapter: &CompositeAdapter) -> AdapterResult<Vec<Item>> {
        let mut removed = Vec::new();
        for position in self.selected_positions().into_iter().rev() {
            let info = adapter.relative_info(position);
            if let Some(provider) = info.provider {
                removed.push(provider.remove(info.local_position)?);
            }
        }
        removed.reverse();
        tracing::debug!(target: targets::SELECTION, count = removed.len(), "deleted selected items");
        Ok(removed)
    }

    fn deselect_others(&self, adapter: &CompositeAdapter, keep: Option<usize>) {
        let others: Vec<usize> = self
            .selected
            .read()
            .iter()
            .copied()
            .filter(|&position| Some(position) != keep)
            .collect();
        for position in others {
            self.deselect(adapter, position);
        }
    }

    fn apply(&self, adapter: &CompositeAdapter, position: usize, key: ItemKey, selected: bool, fire_event: bool) {
        adapter.update_item(key, |item| item.selected = selected);
        {
            let mut set = self.selected.write();
            if selected {
                set.insert(position);
            } else {
                set.remove(&position);
            }
        }
        tracing::trace!(target: targets::SELECTION, position, selected, "selection changed");

        if self.config().select_with_item_update {
            if let Err(err) = adapter.notify_changed(position, 1, Some(ChangePayload::Selection)) {
                tracing::warn!(target: targets::SELECTION, position, %err, "selection update failed");
            }
        }
        if fire_event {
            self.selection_changed.emit((position, selected));
        }
    }

    fn handle_user_selection(&self, adapter: &CompositeAdapter, info: &RelativeInfo) {
        let Some(item) = &info.item else {
            return;
        };
        if !item.is_selectable() {
            return;
        }
        if self.is_selected(info.position) {
            if self.config().allow_deselection {
                self.deselect(adapter, info.position);
            } else {
                tracing::trace!(target: targets::SELECTION, position = info.position, "deselection not allowed");
            }
        } else {
            self.select(adapter, info.position, true, true);
        }
    }

    /// Re-reads the `selected` flag of every item in the range.
    fn sync_range(&self, adapter: &CompositeAdapter, position: usize, count: usize) {
        let flags: Vec<(usize, bool)> = (position..position + count)
            .filter_map(|p| adapter.item(p).map(|item| (p, item.is_selected())))
            .collect();
        let mut set = self.selected.write();
        for (p, selected) in flags {
            if selected {
                set.insert(p);
            } else {
                set.remove(&p);
            }
        }
    }
}

impl AdapterExtension for SelectExtension {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn on_click(&self, adapter: &CompositeAdapter, info: &RelativeInfo) -> bool {
        let config = self.config();
        if config.selectable && !config.select_on_long_click {
            self.handle_user_selection(adapter, info);
        }
        false
    }

    fn on_long_click(&self, adapter: &CompositeAdapter, info: &RelativeInfo) -> bool {
        let config = self.config();
        if config.selectable && config.select_on_long_click {
            self.handle_user_selection(adapter, info);
        }
        false
    }

    fn on_items_inserted(&self, adapter: &CompositeAdapter, position: usize, count: usize) {
        util::shift_on_insert(&mut self.selected.write(), position, count);
        self.sync_range(adapter, position, count);
    }

    fn on_items_removed(&self, _adapter: &CompositeAdapter, position: usize, count: usize) {
        util::shift_on_remove(&mut self.selected.write(), position, count);
    }

    fn on_item_moved(&self, _adapter: &CompositeAdapter, from: usize, to: usize) {
        util::shift_on_move(&mut self.selected.write(), from, to);
    }

    fn on_items_changed(
        &self,
        adapter: &CompositeAdapter,
        position: usize,
        count: usize,
        _payload: Option<&ChangePayload>,
    ) {
        self.sync_range(adapter, position, count);
    }

    fn on_reset(&self, adapter: &CompositeAdapter) {
        let selected: BTreeSet<usize> = adapter
            .positions_where(Item::is_selected)
            .into_iter()
            .collect();
        *self.selected.write() = selected;
    }

    fn save_state(&self, adapter: &CompositeAdapter) -> Option<serde_json::Value> {
        let saved: Vec<SavedSelection> = self
            .selected_positions()
            .into_iter()
            .filter_map(|position| {
                adapter.item_id(position).map(|identifier| SavedSelection {
                    position,
                    identifier,
                })
            })
            .collect();
        serde_json::to_value(saved).ok()
    }

    fn restore_state(&self, adapter: &CompositeAdapter, state: &serde_json::Value) -> AdapterResult<()> {
        let saved: Vec<SavedSelection> = serde_json::from_value(state.clone())
            .map_err(|err| AdapterError::state_restore(Self::KEY, err))?;

        for position in self.selected_positions() {
            if let Some(key) = adapter.relative_info(position).key {
                self.apply(adapter, position, key, false, false);
            }
        }

        let count = adapter.item_count();
        for entry in saved {
            let by_identifier = (entry.identifier >= 0)
                .then(|| adapter.position_of(entry.identifier))
                .flatten();
            let position = by_identifier.or((entry.position < count).then_some(entry.position));
            match position {
                Some(position) => {
                    self.select(adapter, position, false, false);
                }
                None => tracing::trace!(
                    target: targets::SELECTION,
                    position = entry.position,
                    identifier = entry.identifier,
                    "saved selection no longer resolves"
                ),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::{ItemFlags, ItemProvider};

    fn setup(count: usize, multi_select: bool) -> (CompositeAdapter, ItemProvider, Arc<SelectExtension>) {
        let adapter = CompositeAdapter::new();
        let provider = ItemProvider::new();
        adapter.add_provider(0, &provider).unwrap();
        provider
            .add((0..count as i64).map(|id| Item::new(0).with_identifier(id)).collect())
            .unwrap();
        let select = adapter.select_extension();
        select.set_multi_select(multi_select);
        (adapter, provider, select)
    }

    #[test]
    fn test_single_select_exclusivity() {
        let (adapter, _, select) = setup(5, false);
        select.select(&adapter, 1, true, true);
        select.select(&adapter, 3, true, true);
        assert_eq!(select.selected_positions(), vec![3]);
        assert!(!adapter.item(1).unwrap().is_selected());
        assert!(adapter.item(3).unwrap().is_selected());
    }

    #[test]
    fn test_toggle_deselects_others_in_ascending_order() {
        let (adapter, _, select) = setup(6, true);
        for position in [4, 1, 2] {
            select.select(&adapter, position, false, true);
        }
        select.set_multi_select(false);

        let events = Arc::new(Mutex::new(Vec::new()));
        let e = events.clone();
        select
            .selection_changed
            .connect(move |&(position, selected)| e.lock().push((position, selected)));

        select.toggle(&adapter, 5);
        assert_eq!(
            *events.lock(),
            vec![(1, false), (2, false), (4, false), (5, true)]
        );
        assert_eq!(select.selected_positions(), vec![5]);
    }

    #[test]
    fn test_toggle_deselects_selected() {
        let (adapter, _, select) = setup(3, false);
        select.toggle(&adapter, 1);
        assert!(select.is_selected(1));
        select.toggle(&adapter, 1);
        assert!(!select.is_selected(1));
    }

    #[test]
    fn test_select_respects_selectable_flag() {
        let adapter = CompositeAdapter::new();
        let provider = ItemProvider::new();
        adapter.add_provider(0, &provider).unwrap();
        provider
            .add(vec![Item::new(0).with_flags(ItemFlags::new().with_selectable(false))])
            .unwrap();
        let select = adapter.select_extension();

        assert!(!select.select(&adapter, 0, true, true));
        assert!(select.select(&adapter, 0, true, false));
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let (adapter, _, select) = setup(2, true);
        assert!(!select.select(&adapter, 7, true, true));
        assert!(!select.deselect(&adapter, 7));
        select.toggle(&adapter, 7);
        assert!(select.selected_positions().is_empty());
    }

    #[test]
    fn test_click_toggles_and_respects_allow_deselection() {
        let (adapter, _, select) = setup(3, false);
        assert!(!adapter.perform_click(1));
        assert!(select.is_selected(1));

        select.set_allow_deselection(false);
        adapter.perform_click(1);
        assert!(select.is_selected(1));

        // Programmatic deselection is always permitted.
        assert!(select.deselect(&adapter, 1));
    }

    #[test]
    fn test_select_on_long_click() {
        let (adapter, _, select) = setup(3, false);
        select.set_config(SelectionConfig::new().with_select_on_long_click(true));

        adapter.perform_click(0);
        assert!(!select.is_selected(0));
        adapter.perform_long_click(0);
        assert!(select.is_selected(0));
    }

    #[test]
    fn test_shift_on_provider_mutations() {
        let (adapter, provider, select) = setup(12, true);
        select.select(&adapter, 5, false, true);
        select.select(&adapter, 10, false, true);

        provider.add_at(7, vec![Item::new(0); 3]).unwrap();
        assert_eq!(select.selected_positions(), vec![5, 13]);

        provider.remove_range(4, 3).unwrap();
        assert_eq!(select.selected_positions(), vec![10]);

        provider.move_item(10, 0).unwrap();
        assert_eq!(select.selected_positions(), vec![0]);
        assert!(adapter.item(0).unwrap().is_selected());
    }

    #[test]
    fn test_inserted_selected_items_join_selection() {
        let (adapter, provider, select) = setup(2, true);
        provider
            .add_at(1, vec![Item::new(0).with_selected(true)])
            .unwrap();
        assert_eq!(select.selected_positions(), vec![1]);
        assert_eq!(adapter.item_count(), 3);
    }

    #[test]
    fn test_set_replaces_selection_state() {
        let (adapter, provider, select) = setup(3, true);
        select.select(&adapter, 1, false, true);
        provider.set(1, Item::new(0)).unwrap();
        assert!(select.selected_positions().is_empty());
    }

    #[test]
    fn test_select_all_and_deselect_all() {
        let (adapter, _, select) = setup(4, true);
        select.select_all(&adapter);
        assert_eq!(select.selected_positions(), vec![0, 1, 2, 3]);
        select.deselect_all(&adapter);
        assert!(select.selected_positions().is_empty());

        select.set_multi_select(false);
        select.select_all(&adapter);
        assert!(select.selected_positions().is_empty());
    }

    #[test]
    fn test_delete_all_selected_items() {
        let (adapter, _, select) = setup(5, true);
        select.select(&adapter, 0, false, true);
        select.select(&adapter, 3, false, true);

        let removed = select.delete_all_selected_items(&adapter).unwrap();
        let ids: Vec<_> = removed.iter().map(Item::identifier).collect();
        assert_eq!(ids, vec![0, 3]);
        assert!(select.selected_positions().is_empty());
        assert_eq!(adapter.item_count(), 3);
    }

    #[test]
    fn test_select_by_identifier_and_selected_items() {
        let (adapter, _, select) = setup(4, true);
        assert!(select.select_by_identifier(&adapter, 2, true, true));
        assert!(!select.select_by_identifier(&adapter, 99, true, true));
        let items = select.selected_items(&adapter);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].identifier(), 2);
    }

    #[test]
    fn test_item_update_payload() {
        let (adapter, _, select) = setup(2, false);
        select.set_config(SelectionConfig::new().with_select_with_item_update(true));
        let changes = Arc::new(Mutex::new(Vec::new()));
        let c = changes.clone();
        adapter
            .signals()
            .items_changed
            .connect(move |(position, _, payload)| c.lock().push((*position, payload.clone())));

        select.select(&adapter, 1, true, true);
        assert_eq!(*changes.lock(), vec![(1, Some(ChangePayload::Selection))]);
    }

    #[test]
    fn test_restore_rejects_malformed_state() {
        let (adapter, _, select) = setup(2, true);
        let err = select
            .restore_state(&adapter, &serde_json::json!({"not": "a list"}))
            .unwrap_err();
        assert!(matches!(err, AdapterError::StateRestore { .. }));
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: SelectionConfig = serde_json::from_str(r#"{"multi_select": true}"#).unwrap();
        assert!(config.multi_select);
        assert!(config.selectable);
        assert!(config.allow_deselection);
    }
}
