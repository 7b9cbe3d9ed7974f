//! Integration tests for selection bookkeeping across mutations.

use std::sync::Arc;

use lattice_list::{CompositeAdapter, Item, ItemProvider, SavedState, SelectExtension, SelectionConfig};

fn populated(count: usize) -> (CompositeAdapter, ItemProvider) {
    let adapter = CompositeAdapter::new();
    let provider = ItemProvider::new();
    adapter.push_provider(&provider).unwrap();
    provider
        .add((0..count as i64).map(|id| Item::new(0).with_identifier(id)).collect())
        .unwrap();
    (adapter, provider)
}

fn multi_select(adapter: &CompositeAdapter, positions: &[usize]) -> Arc<SelectExtension> {
    let select = adapter.select_extension();
    select.set_config(SelectionConfig::new().with_multi_select(true));
    for &position in positions {
        assert!(select.select(adapter, position, false, true));
    }
    select
}

#[test]
fn test_selection_shifts_on_insert() {
    let (adapter, provider) = populated(12);
    let select = multi_select(&adapter, &[5, 10]);

    provider.add_at(7, vec![Item::new(0); 3]).unwrap();
    assert_eq!(select.selected_positions(), vec![5, 13]);
    assert!(adapter.item(13).unwrap().is_selected());
}

#[test]
fn test_selection_shifts_on_remove() {
    let (adapter, provider) = populated(12);
    let select = multi_select(&adapter, &[5, 10]);

    provider.remove_range(4, 3).unwrap();
    assert_eq!(select.selected_positions(), vec![7]);
    assert_eq!(adapter.item_id(7), Some(10));
}

#[test]
fn test_selection_follows_move() {
    let (adapter, provider) = populated(6);
    let select = multi_select(&adapter, &[1, 4]);

    provider.move_item(1, 5).unwrap();
    assert_eq!(select.selected_positions(), vec![3, 5]);
    assert_eq!(adapter.item_id(5), Some(1));
}

#[test]
fn test_selection_shifts_across_providers() {
    let adapter = CompositeAdapter::new();
    let header = ItemProvider::new();
    let body = ItemProvider::new();
    adapter.push_provider(&header).unwrap();
    adapter.push_provider(&body).unwrap();
    body.add(vec![Item::new(0); 4]).unwrap();
    let select = multi_select(&adapter, &[2]);

    header.add(vec![Item::new(1); 2]).unwrap();
    assert_eq!(select.selected_positions(), vec![4]);
}

#[test]
fn test_single_select_is_exclusive() {
    let (adapter, _) = populated(5);
    let select = adapter.select_extension();
    assert!(!select.config().multi_select);

    select.select(&adapter, 1, false, true);
    select.select(&adapter, 3, false, true);
    assert_eq!(select.selected_positions(), vec![3]);
    assert!(!adapter.item(1).unwrap().is_selected());
}

#[test]
fn test_single_select_by_click() {
    let (adapter, _) = populated(3);
    let select = adapter.select_extension();

    // Selection observes clicks without consuming them.
    assert!(!adapter.perform_click(0));
    assert!(!adapter.perform_click(2));
    assert_eq!(select.selected_positions(), vec![2]);
}

#[test]
fn test_selection_round_trips_through_json() {
    let (adapter, provider) = populated(12);
    let select = multi_select(&adapter, &[2, 4, 9]);

    let json = adapter.save_state("list.").to_json().unwrap();
    select.deselect_all(&adapter);
    assert!(select.selected_positions().is_empty());

    // Repopulate with the same content before restoring.
    provider
        .set_items((0..12).map(|id| Item::new(0).with_identifier(id)).collect())
        .unwrap();
    let saved = SavedState::from_json(&json).unwrap();
    adapter.restore_state(&saved, "list.").unwrap();
    assert_eq!(select.selected_positions(), vec![2, 4, 9]);
}

#[test]
fn test_delete_selected_items() {
    let (adapter, provider) = populated(6);
    let select = multi_select(&adapter, &[0, 3, 4]);

    let removed = select.delete_all_selected_items(&adapter).unwrap();
    assert_eq!(removed.len(), 3);
    assert!(select.selected_positions().is_empty());
    let ids: Vec<i64> = provider.items().unwrap().iter().map(Item::identifier).collect();
    assert_eq!(ids, vec![1, 2, 5]);
}
