//! Expand/collapse state for items with sub-items.
//!
//! Expanding an item splices its direct children into the owning provider
//! right after it; collapsing takes every visible descendant back out. Both
//! are structural mutations and go through the notifier like any other.

use std::collections::BTreeSet;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use lattice_list_core::Signal;
use lattice_list_core::logging::targets;

use super::AdapterExtension;
use crate::adapter::{ChangePayload, CompositeAdapter, RelativeInfo};
use crate::error::{AdapterError, AdapterResult};
use crate::item::Item;
use crate::util;

/// Expand/collapse behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpandConfig {
    /// Collapse every other expanded item (except ancestors) on expand.
    pub only_one_expanded_item: bool,
    /// Let a click on an expanded item collapse it.
    pub collapse_on_item_click: bool,
    /// Delete a parent once [`ExpandExtension::delete_visible_item`] removes its last child.
    pub delete_empty_parent: bool,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            only_one_expanded_item: false,
            collapse_on_item_click: true,
            delete_empty_parent: false,
        }
    }
}

impl ExpandConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_only_one_expanded_item(mut self, only_one: bool) -> Self {
        self.only_one_expanded_item = only_one;
        self
    }

    pub fn with_collapse_on_item_click(mut self, collapse: bool) -> Self {
        self.collapse_on_item_click = collapse;
        self
    }

    pub fn with_delete_empty_parent(mut self, delete: bool) -> Self {
        self.delete_empty_parent = delete;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct SavedExpansion {
    position: usize,
    identifier: i64,
}

/// Tracks which positions are expanded.
///
/// # Example
///
/// ```
/// use lattice_list::{CompositeAdapter, Item, ItemProvider};
///
/// let adapter = CompositeAdapter::new();
/// let provider = ItemProvider::new();
/// adapter.add_provider(0, &provider).unwrap();
/// provider
///     .add(vec![
///         Item::new(0).with_sub_items(vec![Item::new(1), Item::new(1)]),
///         Item::new(0),
///     ])
///     .unwrap();
///
/// let expand = adapter.expand_extension();
/// assert!(expand.expand(&adapter, 0).unwrap());
/// assert_eq!(adapter.item_count(), 4);
/// assert!(expand.collapse(&adapter, 0).unwrap());
/// assert_eq!(adapter.item_count(), 2);
/// ```
#[derive(Debug, Default)]
pub struct ExpandExtension {
    config: RwLock<ExpandConfig>,
    expanded: RwLock<BTreeSet<usize>>,
    /// Emitted with `(position, expanded)` after every expand or collapse.
    pub expansion_changed: Signal<(usize, bool)>,
}

impl ExpandExtension {
    /// Registry and persistence key.
    pub const KEY: &'static str = "expand";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ExpandConfig) -> Self {
        Self {
            config: RwLock::new(config),
            ..Self::default()
        }
    }

    pub fn config(&self) -> ExpandConfig {
        *self.config.read()
    }

    pub fn set_config(&self, config: ExpandConfig) {
        *self.config.write() = config;
    }

    /// Expanded positions, ascending.
    pub fn expanded_positions(&self) -> Vec<usize> {
        self.expanded.read().iter().copied().collect()
    }

    pub fn is_expanded(&self, position: usize) -> bool {
        self.expanded.read().contains(&position)
    }

    /// Shows the direct sub-items of the item at `position`.
    ///
    /// Returns `Ok(false)` for out-of-range positions, items without
    /// sub-items, and items that are already expanded.
    pub fn expand(&self, adapter: &CompositeAdapter, position: usize) -> AdapterResult<bool> {
        let info = adapter.relative_info(position);
        let (Some(item), Some(key)) = (info.item, info.key) else {
            tracing::trace!(target: targets::EXPAND, position, "expand out of range");
            return Ok(false);
        };
        if item.is_expanded() {
            return Ok(false);
        }
        if adapter.child_count(key) == 0 {
            tracing::trace!(target: targets::EXPAND, position, "item has no sub-items");
            return Ok(false);
        }

        if self.config().only_one_expanded_item {
            let others: Vec<usize> = self
                .expanded_positions()
                .into_iter()
                .rev()
                .filter(|&other| {
                    adapter
                        .relative_info(other)
                        .key
                        .is_some_and(|other_key| other_key != key && !adapter.is_ancestor(other_key, key))
                })
                .collect();
            for other in others {
                self.collapse(adapter, other)?;
            }
        }

        // Collapsing siblings above may have moved the item.
        let Some(position) = adapter.position_of_key(key) else {
            return Ok(false);
        };
        let info = adapter.relative_info(position);
        let Some(provider) = info.provider else {
            return Ok(false);
        };
        let children = adapter.hidden_children(key);

        adapter.update_item(key, |item| item.expanded = true);
        self.expanded.write().insert(position);
        adapter.provider_show(provider.id(), info.local_position + 1, children)?;
        tracing::debug!(target: targets::EXPAND, position, "expanded");

        adapter.notify_changed(position, 1, Some(ChangePayload::Expansion))?;
        self.expansion_changed.emit((position, true));
        Ok(true)
    }

    /// Hides every visible descendant of the item at `position`.
    ///
    /// Returns `Ok(false)` if the position is out of range or not expanded.
    pub fn collapse(&self, adapter: &CompositeAdapter, position: usize) -> AdapterResult<bool> {
        let info = adapter.relative_info(position);
        let (Some(item), Some(key), Some(provider)) = (info.item, info.key, info.provider) else {
            tracing::trace!(target: targets::EXPAND, position, "collapse out of range");
            return Ok(false);
        };
        if !item.is_expanded() {
            return Ok(false);
        }

        let descendants = adapter.visible_descendants(key);
        let locals = adapter.provider_local_positions(provider.id(), &descendants)?;
        adapter.collapse_subtree(key);
        self.expanded.write().remove(&position);
        // Back to front so earlier runs keep their local positions.
        for (start, len) in contiguous_runs(&locals).into_iter().rev() {
            adapter.provider_hide(provider.id(), start, len)?;
        }
        tracing::debug!(target: targets::EXPAND, position, hidden = locals.len(), "collapsed");

        adapter.notify_changed(position, 1, Some(ChangePayload::Expansion))?;
        self.expansion_changed.emit((position, false));
        Ok(true)
    }

    /// Expands or collapses the item at `position`.
    pub fn toggle(&self, adapter: &CompositeAdapter, position: usize) -> AdapterResult<bool> {
        match adapter.item(position) {
            Some(item) if item.is_expanded() => self.collapse(adapter, position),
            Some(_) => self.expand(adapter, position),
            None => Ok(false),
        }
    }

    /// Expands every top-level expandable item.
    pub fn expand_all(&self, adapter: &CompositeAdapter) -> AdapterResult<()> {
        for position in (0..adapter.item_count()).rev() {
            self.expand(adapter, position)?;
        }
        Ok(())
    }

    /// Collapses every expanded item, innermost first.
    pub fn collapse_all(&self, adapter: &CompositeAdapter) -> AdapterResult<()> {
        for position in self.expanded_positions().into_iter().rev() {
            self.collapse(adapter, position)?;
        }
        Ok(())
    }

    /// Removes the item at `position` together with its stored sub-items.
    ///
    /// When this removes the last child of a parent, the parent is deleted
    /// too if [`ExpandConfig::delete_empty_parent`] is set, or marked
    /// collapsed otherwise.
    pub fn delete_visible_item(&self, adapter: &CompositeAdapter, position: usize) -> AdapterResult<Option<Item>> {
        let Some(key) = adapter.relative_info(position).key else {
            return Ok(None);
        };
        self.collapse(adapter, position)?;

        let info = adapter.relative_info(position);
        let Some(provider) = info.provider else {
            return Ok(None);
        };
        let parent = adapter.parent_key(key);
        let removed = provider.remove(info.local_position)?;

        let Some(parent) = parent else {
            return Ok(Some(removed));
        };
        let Some(parent_position) = adapter.position_of_key(parent) else {
            return Ok(Some(removed));
        };
        if adapter.child_count(parent) > 0 {
            adapter.notify_changed(parent_position, 1, Some(ChangePayload::Expansion))?;
        } else if self.config().delete_empty_parent {
            tracing::debug!(target: targets::EXPAND, position = parent_position, "deleting empty parent");
            self.delete_visible_item(adapter, parent_position)?;
        } else {
            adapter.update_item(parent, |item| item.expanded = false);
            self.expanded.write().remove(&parent_position);
            adapter.notify_changed(parent_position, 1, Some(ChangePayload::Expansion))?;
        }
        Ok(Some(removed))
    }

    fn sync_range(&self, adapter: &CompositeAdapter, position: usize, count: usize) {
        let flags: Vec<(usize, bool)> = (position..position + count)
            .filter_map(|p| adapter.item(p).map(|item| (p, item.is_expanded())))
            .collect();
        let mut set = self.expanded.write();
        for (p, expanded) in flags {
            if expanded {
                set.insert(p);
            } else {
                set.remove(&p);
            }
        }
    }
}

impl AdapterExtension for ExpandExtension {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn on_click(&self, adapter: &CompositeAdapter, info: &RelativeInfo) -> bool {
        let Some(item) = &info.item else {
            return false;
        };
        if !item.flags().auto_expand || !adapter.has_sub_items(info.position) {
            return false;
        }
        let result = if item.is_expanded() {
            if self.config().collapse_on_item_click {
                self.collapse(adapter, info.position)
            } else {
                Ok(false)
            }
        } else {
            self.expand(adapter, info.position)
        };
        if let Err(err) = result {
            tracing::warn!(target: targets::EXPAND, position = info.position, %err, "toggle on click failed");
        }
        false
    }

    fn on_items_inserted(&self, adapter: &CompositeAdapter, position: usize, count: usize) {
        util::shift_on_insert(&mut self.expanded.write(), position, count);
        self.sync_range(adapter, position, count);
    }

    fn on_items_removed(&self, _adapter: &CompositeAdapter, position: usize, count: usize) {
        util::shift_on_remove(&mut self.expanded.write(), position, count);
    }

    fn on_item_moved(&self, _adapter: &CompositeAdapter, from: usize, to: usize) {
        util::shift_on_move(&mut self.expanded.write(), from, to);
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
        let expanded: BTreeSet<usize> = adapter
            .positions_where(Item::is_expanded)
            .into_iter()
            .collect();
        *self.expanded.write() = expanded;
    }

    fn save_state(&self, adapter: &CompositeAdapter) -> Option<serde_json::Value> {
        let saved: Vec<SavedExpansion> = self
            .expanded_positions()
            .into_iter()
            .filter_map(|position| {
                adapter.item_id(position).map(|identifier| SavedExpansion {
                    position,
                    identifier,
                })
            })
            .collect();
        serde_json::to_value(saved).ok()
    }

    fn restore_state(&self, adapter: &CompositeAdapter, state: &serde_json::Value) -> AdapterResult<()> {
        let mut saved: Vec<SavedExpansion> = serde_json::from_value(state.clone())
            .map_err(|err| AdapterError::state_restore(Self::KEY, err))?;
        saved.sort_by_key(|entry| entry.position);

        self.collapse_all(adapter)?;
        for entry in saved {
            let by_identifier = (entry.identifier >= 0)
                .then(|| adapter.position_of(entry.identifier))
                .flatten();
            let position = by_identifier
                .or((entry.position < adapter.item_count()).then_some(entry.position));
            if let Some(position) = position {
                self.expand(adapter, position)?;
            }
        }
        Ok(())
    }
}

/// Groups ascending positions into `(start, len)` runs.
fn contiguous_runs(sorted: &[usize]) -> Vec<(usize, usize)> {
    let mut runs: Vec<(usize, usize)> = Vec::new();
    for &local in sorted {
        match runs.last_mut() {
            Some((start, len)) if *start + *len == local => *len += 1,
            _ => runs.push((local, 1)),
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ItemFlags, ItemProvider};

    fn group(id: i64, children: usize) -> Item {
        Item::new(0).with_identifier(id).with_sub_items(
            (0..children as i64)
                .map(|n| Item::new(1).with_identifier(id * 100 + n))
                .collect(),
        )
    }

    fn setup(items: Vec<Item>) -> (CompositeAdapter, ItemProvider, std::sync::Arc<ExpandExtension>) {
        let adapter = CompositeAdapter::new();
        let provider = ItemProvider::new();
        adapter.add_provider(0, &provider).unwrap();
        provider.add(items).unwrap();
        let expand = adapter.expand_extension();
        (adapter, provider, expand)
    }

    fn ids(adapter: &CompositeAdapter) -> Vec<i64> {
        adapter.items().iter().map(Item::identifier).collect()
    }

    #[test]
    fn test_expand_and_collapse() {
        let (adapter, _, expand) = setup(vec![group(1, 2), group(2, 1)]);
        assert!(expand.expand(&adapter, 1).unwrap());
        assert_eq!(ids(&adapter), vec![1, 2, 200]);
        assert!(expand.expand(&adapter, 0).unwrap());
        assert_eq!(ids(&adapter), vec![1, 100, 101, 2, 200]);
        assert_eq!(expand.expanded_positions(), vec![0, 3]);

        assert!(expand.collapse(&adapter, 0).unwrap());
        assert_eq!(ids(&adapter), vec![1, 2, 200]);
        assert_eq!(expand.expanded_positions(), vec![1]);
    }

    #[test]
    fn test_expand_without_sub_items_is_noop() {
        let (adapter, _, expand) = setup(vec![Item::new(0)]);
        assert!(!expand.expand(&adapter, 0).unwrap());
        assert!(!expand.expand(&adapter, 5).unwrap());
        assert!(!expand.collapse(&adapter, 0).unwrap());
    }

    #[test]
    fn test_collapse_hides_nested_descendants() {
        let nested = Item::new(0)
            .with_identifier(1)
            .with_sub_items(vec![group(2, 2)]);
        let (adapter, _, expand) = setup(vec![nested, Item::new(0).with_identifier(9)]);

        expand.expand(&adapter, 0).unwrap();
        expand.expand(&adapter, 1).unwrap();
        assert_eq!(ids(&adapter), vec![1, 2, 200, 201, 9]);

        expand.collapse(&adapter, 0).unwrap();
        assert_eq!(ids(&adapter), vec![1, 9]);
        assert!(expand.expanded_positions().is_empty());

        // Children come back collapsed.
        expand.expand(&adapter, 0).unwrap();
        assert_eq!(ids(&adapter), vec![1, 2, 9]);
    }

    #[test]
    fn test_only_one_expanded_item() {
        let (adapter, _, expand) = setup(vec![group(1, 2), group(2, 2)]);
        expand.set_config(ExpandConfig::new().with_only_one_expanded_item(true));

        expand.expand(&adapter, 0).unwrap();
        expand.expand(&adapter, 3).unwrap();
        assert_eq!(ids(&adapter), vec![1, 2, 200, 201]);
        assert_eq!(expand.expanded_positions(), vec![1]);
    }

    #[test]
    fn test_click_toggles_auto_expand_items() {
        let (adapter, provider, expand) = setup(vec![group(1, 1)]);
        provider
            .add(vec![group(2, 1).with_flags(ItemFlags::new().with_auto_expand(false))])
            .unwrap();

        adapter.perform_click(0);
        assert!(expand.is_expanded(0));
        adapter.perform_click(2);
        assert!(!expand.is_expanded(2));
        adapter.perform_click(0);
        assert!(!expand.is_expanded(0));
    }

    #[test]
    fn test_expand_all_collapse_all() {
        let (adapter, _, expand) = setup(vec![group(1, 1), Item::new(0), group(2, 2)]);
        expand.expand_all(&adapter).unwrap();
        assert_eq!(adapter.item_count(), 6);
        assert_eq!(expand.expanded_positions(), vec![0, 3]);

        expand.collapse_all(&adapter).unwrap();
        assert_eq!(adapter.item_count(), 3);
    }

    #[test]
    fn test_delete_visible_item_keeps_empty_parent_by_default() {
        let (adapter, _, expand) = setup(vec![group(1, 1)]);
        expand.expand(&adapter, 0).unwrap();

        let removed = expand.delete_visible_item(&adapter, 1).unwrap();
        assert_eq!(removed.map(|item| item.identifier()), Some(100));
        assert_eq!(ids(&adapter), vec![1]);
        assert!(!adapter.has_sub_items(0));
        assert!(!expand.is_expanded(0));
    }

    #[test]
    fn test_delete_visible_item_deletes_empty_parent() {
        let (adapter, _, expand) = setup(vec![group(1, 1), group(2, 2)]);
        expand.set_config(ExpandConfig::new().with_delete_empty_parent(true));
        expand.expand(&adapter, 0).unwrap();

        expand.delete_visible_item(&adapter, 1).unwrap();
        assert_eq!(ids(&adapter), vec![2]);
        assert!(expand.expanded_positions().is_empty());
    }

    #[test]
    fn test_delete_expanded_item_removes_children() {
        let (adapter, _, expand) = setup(vec![group(1, 2), Item::new(0).with_identifier(5)]);
        expand.expand(&adapter, 0).unwrap();
        expand.delete_visible_item(&adapter, 0).unwrap();
        assert_eq!(ids(&adapter), vec![5]);
    }

    #[test]
    fn test_shift_on_insert_before_expanded() {
        let (adapter, provider, expand) = setup(vec![group(1, 1)]);
        expand.expand(&adapter, 0).unwrap();
        provider.add_at(0, vec![Item::new(0)]).unwrap();
        assert_eq!(expand.expanded_positions(), vec![1]);
        assert!(expand.collapse(&adapter, 1).unwrap());
        assert_eq!(adapter.item_count(), 2);
    }

    #[test]
    fn test_collapse_keeps_item_inserted_among_children() {
        let (adapter, provider, expand) = setup(vec![group(1, 2)]);
        expand.expand(&adapter, 0).unwrap();
        provider.add_at(1, vec![Item::new(0).with_identifier(7)]).unwrap();
        assert_eq!(ids(&adapter), vec![1, 7, 100, 101]);

        assert!(expand.collapse(&adapter, 0).unwrap());
        assert_eq!(ids(&adapter), vec![1, 7]);
    }

    #[test]
    fn test_collapse_after_moving_item_into_children() {
        let (adapter, provider, expand) =
            setup(vec![group(1, 2), Item::new(0).with_identifier(9)]);
        expand.expand(&adapter, 0).unwrap();
        provider.move_item(3, 2).unwrap();
        assert_eq!(ids(&adapter), vec![1, 100, 9, 101]);

        assert!(expand.collapse(&adapter, 0).unwrap());
        assert_eq!(ids(&adapter), vec![1, 9]);
    }

    #[test]
    fn test_contiguous_runs() {
        assert!(contiguous_runs(&[]).is_empty());
        assert_eq!(contiguous_runs(&[1, 2, 4, 5, 6, 9]), vec![(1, 2), (4, 3), (9, 1)]);
    }
}
