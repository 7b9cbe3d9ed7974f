//! Position bookkeeping shared by stateful extensions.
//!
//! Extensions that remember global positions (selection, expansion) keep
//! them in a `BTreeSet<usize>` and shift it after every structural mutation
//! with these helpers.

use std::collections::BTreeSet;

/// Shifts positions at or after `position` up by `count`.
pub fn shift_on_insert(positions: &mut BTreeSet<usize>, position: usize, count: usize) {
    if count == 0 {
        return;
    }
    *positions = positions
        .iter()
        .map(|&p| if p >= position { p + count } else { p })
        .collect();
}

/// Drops positions inside `position..position + count` and shifts later ones down.
pub fn shift_on_remove(positions: &mut BTreeSet<usize>, position: usize, count: usize) {
    if count == 0 {
        return;
    }
    let end = position + count;
    *positions = positions
        .iter()
        .filter_map(|&p| {
            if p < position {
                Some(p)
            } else if p < end {
                None
            } else {
                Some(p - count)
            }
        })
        .collect();
}

/// Applies the permutation of moving the entry at `from` to `to`.
///
/// Entries strictly between the two positions shift by one towards `from`.
pub fn shift_on_move(positions: &mut BTreeSet<usize>, from: usize, to: usize) {
    if from == to {
        return;
    }
    *positions = positions
        .iter()
        .map(|&p| moved_position(p, from, to))
        .collect();
}

/// Where the entry at `position` ends up after moving `from` to `to`.
pub fn moved_position(position: usize, from: usize, to: usize) -> usize {
    if position == from {
        to
    } else if from < to && position > from && position <= to {
        position - 1
    } else if to < from && position >= to && position < from {
        position + 1
    } else {
        position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[usize]) -> BTreeSet<usize> {
        values.iter().copied().collect()
    }

    #[test]
    fn test_shift_on_insert() {
        let mut positions = set(&[0, 2, 5]);
        shift_on_insert(&mut positions, 2, 3);
        assert_eq!(positions, set(&[0, 5, 8]));
    }

    #[test]
    fn test_shift_on_remove() {
        let mut positions = set(&[1, 3, 4, 7]);
        shift_on_remove(&mut positions, 3, 2);
        assert_eq!(positions, set(&[1, 5]));
    }

    #[test]
    fn test_shift_on_move_forward() {
        let mut positions = set(&[1, 2, 4]);
        shift_on_move(&mut positions, 1, 3);
        assert_eq!(positions, set(&[1, 3, 4]));
    }

    #[test]
    fn test_shift_on_move_backward() {
        let mut positions = set(&[0, 3, 4]);
        shift_on_move(&mut positions, 4, 1);
        assert_eq!(positions, set(&[0, 1, 4]));
    }

    #[test]
    fn test_zero_count_is_noop() {
        let mut positions = set(&[1, 2]);
        shift_on_insert(&mut positions, 0, 0);
        shift_on_remove(&mut positions, 0, 0);
        shift_on_move(&mut positions, 1, 1);
        assert_eq!(positions, set(&[1, 2]));
    }
}
