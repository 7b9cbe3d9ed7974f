//! Observer notifications.
//!
//! The adapter reports structural changes to the host list widget through
//! [`Signal`]s: one per kind of change, each carrying the affected range.
//! Slots run synchronously on the emitting thread.
//!
//! Emission works on a snapshot of the slot table, so a slot may connect,
//! disconnect, or trigger further emissions (for instance a host that
//! rebinds a row and thereby causes another change) without deadlocking.
//! Slots connected during an emission first run on the next one.
//!
//! # Example
//!
//! ```
//! use lattice_list_core::Signal;
//!
//! let items_removed = Signal::<(usize, usize)>::new();
//!
//! let id = items_removed.connect(|&(position, count)| {
//!     println!("rows {position}..{} are gone", position + count);
//! });
//!
//! items_removed.emit((4, 3));
//! items_removed.disconnect(id);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// Handle for one connected slot; pass it to [`Signal::disconnect`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A typed notification with any number of connected slots.
///
/// `Args` is what each slot receives by reference: `()` for bare
/// notifications, a tuple such as `(position, count)` otherwise.
pub struct Signal<Args> {
    slots: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
    muted: AtomicBool,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> std::fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("slots", &self.slots.lock().len())
            .field("blocked", &self.muted.load(Ordering::SeqCst))
            .finish()
    }
}

impl<Args: 'static> Signal<Args> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(SlotMap::with_key()),
            muted: AtomicBool::new(false),
        }
    }

    /// Registers `slot`; it runs on every later emission until disconnected.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.slots.lock().insert(Arc::new(slot))
    }

    /// Returns `false` if `id` was not connected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.slots.lock().remove(id).is_some()
    }

    pub fn disconnect_all(&self) {
        self.slots.lock().clear();
    }

    pub fn connection_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Suppresses emissions while `blocked` is set. Suppressed emissions
    /// are dropped, not queued.
    pub fn set_blocked(&self, blocked: bool) {
        self.muted.store(blocked, Ordering::SeqCst);
    }

    pub fn is_blocked(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    /// Runs every connected slot with `args`.
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "emission suppressed");
            return;
        }

        let snapshot: Vec<Slot<Args>> = self.slots.lock().values().cloned().collect();
        tracing::trace!(target: targets::SIGNAL, slots = snapshot.len(), "emitting");
        for slot in snapshot {
            slot(&args);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording() -> (Signal<(usize, usize)>, Arc<Mutex<Vec<(usize, usize)>>>) {
        let signal = Signal::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        signal.connect(move |&range| s.lock().push(range));
        (signal, seen)
    }

    #[test]
    fn test_slots_receive_ranges() {
        let (signal, seen) = recording();
        signal.emit((0, 2));
        signal.emit((5, 1));
        assert_eq!(*seen.lock(), vec![(0, 2), (5, 1)]);
    }

    #[test]
    fn test_disconnected_slot_is_silent() {
        let signal = Signal::<usize>::new();
        let hits = Arc::new(Mutex::new(0));
        let h = hits.clone();
        let id = signal.connect(move |_| *h.lock() += 1);

        signal.emit(1);
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(2);
        assert_eq!(*hits.lock(), 1);
    }

    #[test]
    fn test_blocked_emissions_are_dropped() {
        let (signal, seen) = recording();
        signal.set_blocked(true);
        assert!(signal.is_blocked());
        signal.emit((1, 1));
        signal.set_blocked(false);
        signal.emit((2, 1));
        assert_eq!(*seen.lock(), vec![(2, 1)]);
    }

    #[test]
    fn test_slot_may_connect_during_emit() {
        let signal = Arc::new(Signal::<()>::new());
        let weak = Arc::downgrade(&signal);
        signal.connect(move |_| {
            if let Some(signal) = weak.upgrade() {
                signal.connect(|_| {});
            }
        });

        signal.emit(());
        assert_eq!(signal.connection_count(), 2);
        signal.disconnect_all();
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_slot_may_emit_another_signal() {
        let inner = Arc::new(Signal::<()>::new());
        let outer = Signal::<()>::new();
        let hits = Arc::new(Mutex::new(0));

        let h = hits.clone();
        inner.connect(move |_| *h.lock() += 1);
        let i = inner.clone();
        outer.connect(move |_| i.emit(()));

        outer.emit(());
        assert_eq!(*hits.lock(), 1);
    }
}
