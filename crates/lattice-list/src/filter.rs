//! Constraint-based filtering of one provider.
//!
//! Filtering hides items instead of removing them: the hidden items stay in
//! the adapter's arena with their flags intact and come back when the
//! constraint is cleared. Results are applied as a reset, so every
//! extension recomputes its state from what remains visible.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use lattice_list_core::logging::{span_names, targets};
use lattice_list_core::{PerfSpan, Signal};

use crate::arena::ItemKey;
use crate::error::AdapterResult;
use crate::item::Item;
use crate::provider::ItemProvider;

/// Decides whether an item matches a constraint.
pub type FilterPredicate = Arc<dyn Fn(&Item, &str) -> bool + Send + Sync>;

#[derive(Default)]
struct FilterState {
    constraint: Option<String>,
    /// Visible keys captured before the first constraint was applied.
    original: Option<Vec<ItemKey>>,
    /// Provider content generation the snapshot belongs to.
    generation: u64,
}

/// Filters a provider's items against a textual constraint.
///
/// # Example
///
/// ```
/// use lattice_list::{CompositeAdapter, Item, ItemFilter, ItemProvider};
///
/// let adapter = CompositeAdapter::new();
/// let provider = ItemProvider::new();
/// adapter.add_provider(0, &provider).unwrap();
/// provider
///     .add(["apple", "banana", "avocado"].map(|name| Item::new(0).with_tag(name)).to_vec())
///     .unwrap();
///
/// let filter = ItemFilter::new(&provider, |item, constraint| {
///     item.tag::<&str>().is_some_and(|name| name.starts_with(constraint))
/// });
/// assert_eq!(filter.filter(Some("a")).unwrap(), 2);
/// assert_eq!(filter.filter(None).unwrap(), 3);
/// ```
pub struct ItemFilter {
    provider: ItemProvider,
    predicate: FilterPredicate,
    state: RwLock<FilterState>,
    /// Emitted with `(constraint, visible_count)` after each filter pass.
    pub filtered: Signal<(Option<String>, usize)>,
}

impl fmt::Debug for ItemFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("ItemFilter")
            .field("provider", &self.provider)
            .field("constraint", &state.constraint)
            .finish()
    }
}

impl ItemFilter {
    pub fn new<F>(provider: &ItemProvider, predicate: F) -> Self
    where
        F: Fn(&Item, &str) -> bool + Send + Sync + 'static,
    {
        Self {
            provider: provider.clone(),
            predicate: Arc::new(predicate),
            state: RwLock::new(FilterState::default()),
            filtered: Signal::new(),
        }
    }

    /// The active constraint.
    ///
    /// Replacing or clearing the provider's items drops the constraint.
    pub fn constraint(&self) -> Option<String> {
        let state = self.state.read();
        if self.is_current(&state) {
            state.constraint.clone()
        } else {
            None
        }
    }

    pub fn is_filtered(&self) -> bool {
        self.constraint().is_some()
    }

    fn is_current(&self, state: &FilterState) -> bool {
        self.provider
            .adapter()
            .and_then(|adapter| adapter.provider_generation(self.provider.id()))
            .is_ok_and(|generation| generation == state.generation)
    }

    /// Shows only the items matching `constraint`; `None` or an empty
    /// constraint restores every item. Returns the number now visible.
    ///
    /// Items added while a constraint is active are kept in the restored
    /// list; items removed while it is active are gone for good. After the
    /// provider's items are replaced or cleared, the next call starts from
    /// the new contents.
    pub fn filter(&self, constraint: Option<&str>) -> AdapterResult<usize> {
        let _span = PerfSpan::new(span_names::FILTER);
        let adapter = self.provider.adapter()?;
        let visible = adapter.provider_keys(self.provider.id())?;
        let constraint = constraint.filter(|c| !c.is_empty());

        let generation = adapter.provider_generation(self.provider.id())?;
        let previous = {
            let mut state = self.state.write();
            let original = state.original.take();
            original.filter(|_| state.generation == generation)
        };
        let original = match previous {
            Some(original) => merge_original(original, &visible, |key| adapter.is_stored(key)),
            None => visible,
        };
        let keys: Vec<ItemKey> = match constraint {
            Some(constraint) => adapter
                .stored_items(&original)
                .into_iter()
                .filter(|(_, item)| (self.predicate)(item, constraint))
                .map(|(key, _)| key)
                .collect(),
            None => original.clone(),
        };
        {
            let mut state = self.state.write();
            state.constraint = constraint.map(str::to_string);
            state.original = constraint.map(|_| original);
            state.generation = generation;
        }

        let count = keys.len();
        adapter.provider_replace_keys(self.provider.id(), keys)?;
        tracing::debug!(
            target: targets::ADAPTER,
            provider = ?self.provider.id(),
            ?constraint,
            visible = count,
            "filtered provider"
        );
        self.filtered.emit((constraint.map(str::to_string), count));
        Ok(count)
    }

    /// Re-runs the active constraint, e.g. after items changed.
    pub fn refilter(&self) -> AdapterResult<usize> {
        let constraint = self.constraint();
        self.filter(constraint.as_deref())
    }

    /// Restores every item.
    pub fn clear(&self) -> AdapterResult<usize> {
        self.filter(None)
    }
}

/// Keeps the stored part of `original` in order and appends keys that
/// became visible since it was captured.
fn merge_original(
    original: Vec<ItemKey>,
    visible: &[ItemKey],
    is_stored: impl Fn(ItemKey) -> bool,
) -> Vec<ItemKey> {
    let mut merged: Vec<ItemKey> = original.into_iter().filter(|&key| is_stored(key)).collect();
    for &key in visible {
        if !merged.contains(&key) {
            merged.push(key);
        }
    }
    merged
}

impl crate::CompositeAdapter {
    pub(crate) fn is_stored(&self, key: ItemKey) -> bool {
        self.inner.state.read().arena.contains(key)
    }

    /// Snapshots of the stored items behind `keys`, in order.
    pub(crate) fn stored_items(&self, keys: &[ItemKey]) -> Vec<(ItemKey, Item)> {
        let state = self.inner.state.read();
        keys.iter()
            .filter_map(|&key| state.arena.item(key).map(|item| (key, item.shallow_clone())))
            .collect()
    }
}
