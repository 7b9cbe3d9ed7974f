//! Structured list diffs.
//!
//! A diff is computed outside the adapter, typically off the UI thread,
//! and then applied to one provider through the ordinary mutation entry
//! points. [`compute_diff`] is a simple identifier-based differ; callers
//! with their own differ can build [`DiffOp`] lists directly.

use lattice_list_core::logging::{span_names, targets};
use lattice_list_core::PerfSpan;

use crate::error::{AdapterError, AdapterResult};
use crate::item::Item;
use crate::provider::ItemProvider;

/// One step of a diff, in provider-local positions.
///
/// Each operation's positions refer to the list as left by the previous
/// operation.
#[derive(Debug, Clone)]
pub enum DiffOp {
    Insert { position: usize, items: Vec<Item> },
    Remove { position: usize, count: usize },
    Move { from: usize, to: usize },
    Change { position: usize, item: Item },
}

impl DiffOp {
    /// Length of the list after applying this operation to one of `len`
    /// items, or `None` if it does not fit.
    fn apply_len(&self, len: usize) -> Option<usize> {
        match self {
            DiffOp::Insert { position, items } => (*position <= len).then(|| len + items.len()),
            DiffOp::Remove { position, count } => position
                .checked_add(*count)
                .filter(|end| *end <= len)
                .map(|_| len - count),
            DiffOp::Move { from, to } => (*from < len && *to < len).then_some(len),
            DiffOp::Change { position, .. } => (*position < len).then_some(len),
        }
    }
}

/// Computes the operations that turn `old` into `new`.
///
/// Items are matched by explicit identifier; items without one are never
/// matched and are always removed and reinserted. Matched items whose
/// content differs according to `same_content` are emitted as changes
/// that keep the old item's selection flag. Operations come out as all
/// removals (back to front), then moves and insertions in target order,
/// then changes.
///
/// # Example
///
/// ```
/// use lattice_list::{compute_diff, DiffOp, Item};
///
/// let old: Vec<Item> = (0..3).map(|id| Item::new(0).with_identifier(id)).collect();
/// let new: Vec<Item> = [2, 0, 7].into_iter().map(|id| Item::new(0).with_identifier(id)).collect();
///
/// let ops = compute_diff(&old, &new, |_, _| true);
/// assert!(matches!(ops[0], DiffOp::Remove { position: 1, count: 1 }));
/// assert!(matches!(ops[1], DiffOp::Move { from: 1, to: 0 }));
/// assert!(matches!(ops[2], DiffOp::Insert { position: 2, .. }));
/// ```
pub fn compute_diff<F>(old: &[Item], new: &[Item], same_content: F) -> Vec<DiffOp>
where
    F: Fn(&Item, &Item) -> bool,
{
    let wanted: std::collections::HashSet<i64> = new
        .iter()
        .filter(|item| item.has_explicit_identifier())
        .map(Item::identifier)
        .collect();

    let mut ops = Vec::new();

    // Removals, back to front, coalesced into runs.
    let mut run: Option<(usize, usize)> = None;
    for (index, item) in old.iter().enumerate().rev() {
        let keep = item.has_explicit_identifier() && wanted.contains(&item.identifier());
        if keep {
            if let Some((position, count)) = run.take() {
                ops.push(DiffOp::Remove { position, count });
            }
            continue;
        }
        run = match run {
            Some((position, count)) if position == index + 1 => Some((index, count + 1)),
            Some((position, count)) => {
                ops.push(DiffOp::Remove { position, count });
                Some((index, 1))
            }
            None => Some((index, 1)),
        };
    }
    if let Some((position, count)) = run {
        ops.push(DiffOp::Remove { position, count });
    }

    // Surviving old items, as indices into `old`; `None` marks an insertion.
    let mut current: Vec<Option<usize>> = old
        .iter()
        .enumerate()
        .filter(|(_, item)| item.has_explicit_identifier() && wanted.contains(&item.identifier()))
        .map(|(index, _)| Some(index))
        .collect();
    let mut matched: Vec<(usize, usize)> = Vec::new();

    for (target, item) in new.iter().enumerate() {
        let found = item
            .has_explicit_identifier()
            .then(|| {
                current[target..].iter().position(|slot| {
                    slot.is_some_and(|index| old[index].identifier() == item.identifier())
                })
            })
            .flatten()
            .map(|offset| target + offset);

        match found {
            Some(from) => {
                if from != target {
                    let slot = current.remove(from);
                    current.insert(target, slot);
                    ops.push(DiffOp::Move { from, to: target });
                }
                if let Some(index) = current[target] {
                    matched.push((index, target));
                }
            }
            None => {
                current.insert(target, None);
                match ops.last_mut() {
                    Some(DiffOp::Insert { position, items }) if *position + items.len() == target => {
                        items.push(item.clone());
                    }
                    _ => ops.push(DiffOp::Insert {
                        position: target,
                        items: vec![item.clone()],
                    }),
                }
            }
        }
    }

    // Duplicate identifiers in `old` can leave unmatched survivors behind.
    if current.len() > new.len() {
        ops.push(DiffOp::Remove {
            position: new.len(),
            count: current.len() - new.len(),
        });
    }

    for (index, target) in matched {
        if !same_content(&old[index], &new[target]) {
            let mut item = new[target].clone();
            item.selected = old[index].selected;
            ops.push(DiffOp::Change {
                position: target,
                item,
            });
        }
    }
    ops
}

impl ItemProvider {
    /// Applies `ops` in order.
    ///
    /// The whole list is validated against the current length first, so a
    /// diff that does not fit is rejected without touching anything.
    pub fn apply_diff(&self, ops: Vec<DiffOp>) -> AdapterResult<()> {
        let _span = PerfSpan::new(span_names::DIFF_APPLY);
        let adapter = self.adapter()?;

        let mut len = self.item_count()?;
        for op in &ops {
            len = op.apply_len(len).ok_or_else(|| {
                tracing::warn!(target: targets::MUTATION, ?op, len, "rejecting diff");
                match op {
                    DiffOp::Move { from, to } => AdapterError::InvalidMove {
                        from: *from,
                        to: *to,
                        len,
                    },
                    DiffOp::Insert { position, .. } => AdapterError::out_of_bounds(*position, 0, len),
                    DiffOp::Remove { position, count } => {
                        AdapterError::out_of_bounds(*position, *count, len)
                    }
                    DiffOp::Change { position, .. } => AdapterError::out_of_bounds(*position, 1, len),
                }
            })?;
        }

        let count = ops.len();
        for op in ops {
            match op {
                DiffOp::Insert { position, items } => {
                    adapter.provider_insert(self.id(), Some(position), items)?
                }
                DiffOp::Remove { position, count } => {
                    adapter.provider_remove(self.id(), position, count)?;
                }
                DiffOp::Move { from, to } => adapter.provider_move(self.id(), from, to)?,
                DiffOp::Change { position, item } => adapter.provider_set(self.id(), position, item)?,
            }
        }
        tracing::debug!(target: targets::ADAPTER, provider = ?self.id(), ops = count, "applied diff");
        Ok(())
    }

    /// Replaces the items with `items` through a computed diff instead of a
    /// wholesale reset. Returns the number of operations applied.
    pub fn set_items_diffed<F>(&self, items: Vec<Item>, same_content: F) -> AdapterResult<usize>
    where
        F: Fn(&Item, &Item) -> bool,
    {
        let old = self.items()?;
        let ops = compute_diff(&old, &items, same_content);
        let count = ops.len();
        self.apply_diff(ops)?;
        Ok(count)
    }
}
