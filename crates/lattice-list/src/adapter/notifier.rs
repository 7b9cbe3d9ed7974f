//! The single gateway for structural change.
//!
//! Every mutation runs in three steps: the state is changed and the
//! position index rebuilt under the write lock, the lock is released, and
//! the normalized [`Mutation`] is delivered first to every extension in
//! registration order and then, exactly once, to the host through
//! [`AdapterSignals`].

use lattice_list_core::logging::targets;
use lattice_list_core::{Signal, list_debug};

use super::{AdapterState, CompositeAdapter};
use crate::error::{AdapterResult, check_range};

/// Why an item range changed without moving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangePayload {
    /// Selection state changed.
    Selection,
    /// Expansion state changed.
    Expansion,
    /// Caller-defined partial update.
    Custom(String),
}

/// A normalized structural change, in global positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Inserted {
        position: usize,
        count: usize,
    },
    Removed {
        position: usize,
        count: usize,
    },
    Moved {
        from: usize,
        to: usize,
    },
    Changed {
        position: usize,
        count: usize,
        payload: Option<ChangePayload>,
    },
    /// Contents were replaced wholesale; derived state must be recomputed.
    Reset,
}

/// Notifications for the host list widget.
///
/// Each mutation is emitted exactly once, after every extension has seen it.
#[derive(Debug, Default)]
pub struct AdapterSignals {
    /// Emitted with `(position, count)` after items are inserted.
    pub items_inserted: Signal<(usize, usize)>,
    /// Emitted with `(position, count)` after items are removed.
    pub items_removed: Signal<(usize, usize)>,
    /// Emitted with `(from, to)` after an item is moved.
    pub item_moved: Signal<(usize, usize)>,
    /// Emitted with `(position, count, payload)` after items change in place.
    pub items_changed: Signal<(usize, usize, Option<ChangePayload>)>,
    /// Emitted after the contents are replaced wholesale.
    pub dataset_reset: Signal<()>,
}

impl AdapterSignals {
    fn emit(&self, mutation: &Mutation) {
        match mutation {
            Mutation::Inserted { position, count } => self.items_inserted.emit((*position, *count)),
            Mutation::Removed { position, count } => self.items_removed.emit((*position, *count)),
            Mutation::Moved { from, to } => self.item_moved.emit((*from, *to)),
            Mutation::Changed {
                position,
                count,
                payload,
            } => self
                .items_changed
                .emit((*position, *count, payload.clone())),
            Mutation::Reset => self.dataset_reset.emit(()),
        }
    }
}

impl CompositeAdapter {
    /// Applies `f` under the write lock, rebuilds the index and dispatches the result.
    ///
    /// `f` must validate before touching the state: an `Err` is returned to
    /// the caller as is and nothing is dispatched.
    pub(crate) fn mutate<R, F>(&self, f: F) -> AdapterResult<R>
    where
        F: FnOnce(&mut AdapterState) -> AdapterResult<(R, Option<Mutation>)>,
    {
        let (result, mutation) = {
            let mut state = self.inner.state.write();
            let outcome = f(&mut state)?;
            state.providers.rebuild();
            outcome
        };
        if let Some(mutation) = mutation {
            self.dispatch(&mutation);
        }
        Ok(result)
    }

    /// Delivers `mutation` to every extension, then to the host.
    pub(crate) fn dispatch(&self, mutation: &Mutation) {
        list_debug!(?mutation, "dispatching mutation");
        for extension in self.inner.extensions.snapshot() {
            match mutation {
                Mutation::Inserted { position, count } => {
                    extension.on_items_inserted(self, *position, *count)
                }
                Mutation::Removed { position, count } => {
                    extension.on_items_removed(self, *position, *count)
                }
                Mutation::Moved { from, to } => extension.on_item_moved(self, *from, *to),
                Mutation::Changed {
                    position,
                    count,
                    payload,
                } => extension.on_items_changed(self, *position, *count, payload.as_ref()),
                Mutation::Reset => extension.on_reset(self),
            }
        }
        self.inner.signals.emit(mutation);
    }

    /// Reports that `count` items starting at `position` changed in place.
    pub fn notify_changed(
        &self,
        position: usize,
        count: usize,
        payload: Option<ChangePayload>,
    ) -> AdapterResult<()> {
        check_range(position, count, self.item_count())?;
        if count == 0 {
            return Ok(());
        }
        self.dispatch(&Mutation::Changed {
            position,
            count,
            payload,
        });
        Ok(())
    }

    /// Reports that the item at `position` changed in place.
    pub fn notify_item_changed(&self, position: usize) -> AdapterResult<()> {
        self.notify_changed(position, 1, None)
    }

    /// Rebuilds the index and makes every extension recompute its state.
    pub fn notify_reset(&self) {
        self.inner.state.write().providers.rebuild();
        tracing::debug!(target: targets::MUTATION, "dataset reset");
        self.dispatch(&Mutation::Reset);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::{AdapterError, Item, ItemProvider};

    fn record(adapter: &CompositeAdapter) -> Arc<Mutex<Vec<Mutation>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let signals = adapter.signals();

        let l = log.clone();
        signals
            .items_inserted
            .connect(move |&(position, count)| l.lock().push(Mutation::Inserted { position, count }));
        let l = log.clone();
        signals
            .items_removed
            .connect(move |&(position, count)| l.lock().push(Mutation::Removed { position, count }));
        let l = log.clone();
        signals
            .item_moved
            .connect(move |&(from, to)| l.lock().push(Mutation::Moved { from, to }));
        let l = log.clone();
        signals.items_changed.connect(move |(position, count, payload)| {
            l.lock().push(Mutation::Changed {
                position: *position,
                count: *count,
                payload: payload.clone(),
            })
        });
        let l = log.clone();
        signals
            .dataset_reset
            .connect(move |_| l.lock().push(Mutation::Reset));
        log
    }

    #[test]
    fn test_each_mutation_emitted_once_in_global_positions() {
        let adapter = CompositeAdapter::new();
        let head = ItemProvider::new();
        let tail = ItemProvider::new();
        adapter.add_provider(0, &head).unwrap();
        adapter.add_provider(1, &tail).unwrap();
        head.add(vec![Item::new(0); 2]).unwrap();

        let log = record(&adapter);
        tail.add(vec![Item::new(0); 3]).unwrap();
        tail.move_item(0, 2).unwrap();
        tail.remove(1).unwrap();
        tail.set(0, Item::new(1)).unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                Mutation::Inserted { position: 2, count: 3 },
                Mutation::Moved { from: 2, to: 4 },
                Mutation::Removed { position: 3, count: 1 },
                Mutation::Changed { position: 2, count: 1, payload: None },
            ]
        );
    }

    #[test]
    fn test_empty_mutations_are_not_emitted() {
        let adapter = CompositeAdapter::new();
        let provider = ItemProvider::new();
        adapter.add_provider(0, &provider).unwrap();
        let log = record(&adapter);

        provider.add(Vec::new()).unwrap();
        provider.remove_range(0, 0).unwrap();
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_notify_changed_rejects_out_of_bounds() {
        let adapter = CompositeAdapter::new();
        let provider = ItemProvider::new();
        adapter.add_provider(0, &provider).unwrap();
        provider.add(vec![Item::new(0)]).unwrap();
        let log = record(&adapter);

        assert!(matches!(
            adapter.notify_changed(0, 2, None),
            Err(AdapterError::OutOfBounds { .. })
        ));
        adapter
            .notify_changed(0, 1, Some(ChangePayload::Custom("title".into())))
            .unwrap();
        adapter.notify_reset();

        assert_eq!(
            *log.lock(),
            vec![
                Mutation::Changed {
                    position: 0,
                    count: 1,
                    payload: Some(ChangePayload::Custom("title".into())),
                },
                Mutation::Reset,
            ]
        );
    }

    #[test]
    fn test_slot_may_query_adapter() {
        let adapter = CompositeAdapter::new();
        let provider = ItemProvider::new();
        adapter.add_provider(0, &provider).unwrap();

        let seen = Arc::new(Mutex::new(None));
        let (a, s) = (adapter.clone(), seen.clone());
        adapter
            .signals()
            .items_inserted
            .connect(move |_| *s.lock() = Some(a.item_count()));

        provider.add(vec![Item::new(0); 4]).unwrap();
        assert_eq!(*seen.lock(), Some(4));
    }
}
