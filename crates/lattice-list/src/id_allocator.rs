//! Synthetic identifiers for items inserted without one.

use crate::item::{Item, NO_ID};

/// First identifier handed out. `-1` is reserved for [`NO_ID`].
const FIRST_SYNTHETIC_ID: i64 = -2;

/// Hands out strictly decreasing negative identifiers.
///
/// Caller-supplied identifiers are non-negative, so synthetic ones never
/// collide with them. Each adapter owns its own allocator.
#[derive(Debug)]
pub struct StableIdAllocator {
    next: i64,
}

impl Default for StableIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl StableIdAllocator {
    pub fn new() -> Self {
        Self {
            next: FIRST_SYNTHETIC_ID,
        }
    }

    /// Returns a fresh identifier.
    pub fn next_id(&mut self) -> i64 {
        let id = self.next;
        self.next -= 1;
        id
    }

    /// Gives `item` a synthetic identifier if it has none. Returns the item's identifier.
    pub fn assign(&mut self, item: &mut Item) -> i64 {
        if item.identifier == NO_ID {
            item.identifier = self.next_id();
        }
        item.identifier
    }

    /// Restarts the sequence.
    ///
    /// Only safe once no item carrying a previously allocated identifier remains.
    pub fn reset(&mut self) {
        self.next = FIRST_SYNTHETIC_ID;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strictly_decreasing() {
        let mut ids = StableIdAllocator::new();
        assert_eq!(ids.next_id(), -2);
        assert_eq!(ids.next_id(), -3);
        assert_eq!(ids.next_id(), -4);
    }

    #[test]
    fn test_assign_keeps_explicit_identifier() {
        let mut ids = StableIdAllocator::new();
        let mut explicit = Item::new(0).with_identifier(5);
        let mut missing = Item::new(0);

        assert_eq!(ids.assign(&mut explicit), 5);
        assert_eq!(ids.assign(&mut missing), -2);
        assert_eq!(ids.assign(&mut missing), -2);
    }

    #[test]
    fn test_reset() {
        let mut ids = StableIdAllocator::new();
        ids.next_id();
        ids.next_id();
        ids.reset();
        assert_eq!(ids.next_id(), -2);
    }
}
