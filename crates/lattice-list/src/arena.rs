//! Storage for every item an adapter owns, visible or not.
//!
//! Providers only hold [`ItemKey`]s. The arena keeps the items themselves
//! together with their parent/child links, so sub-items survive while their
//! parent is collapsed and hidden items survive while a filter is active.

use slotmap::{SlotMap, new_key_type};

use crate::id_allocator::StableIdAllocator;
use crate::item::Item;
use crate::type_registry::TypeRegistry;

new_key_type! {
    /// Handle to an item stored in an adapter.
    pub struct ItemKey;
}

/// An item plus its position in the hierarchy.
pub(crate) struct ItemNode {
    pub(crate) item: Item,
    pub(crate) parent: Option<ItemKey>,
    pub(crate) children: Vec<ItemKey>,
    /// Whether some provider currently lists this key.
    pub(crate) visible: bool,
}

#[derive(Default)]
pub(crate) struct ItemArena {
    nodes: SlotMap<ItemKey, ItemNode>,
}

impl ItemArena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, key: ItemKey) -> Option<&ItemNode> {
        self.nodes.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: ItemKey) -> Option<&mut ItemNode> {
        self.nodes.get_mut(key)
    }

    pub(crate) fn item(&self, key: ItemKey) -> Option<&Item> {
        self.nodes.get(key).map(|node| &node.item)
    }

    pub(crate) fn contains(&self, key: ItemKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Stores `item` and its declared sub-items recursively.
    ///
    /// Missing identifiers are allocated and every view type encountered is
    /// registered. Sub-items start hidden.
    pub(crate) fn insert_tree(
        &mut self,
        mut item: Item,
        parent: Option<ItemKey>,
        ids: &mut StableIdAllocator,
        types: &mut TypeRegistry,
    ) -> ItemKey {
        ids.assign(&mut item);
        types.register(&item);
        let sub_items = std::mem::take(&mut item.sub_items);
        item.expanded = false;

        let key = self.nodes.insert(ItemNode {
            item,
            parent,
            children: Vec::with_capacity(sub_items.len()),
            visible: false,
        });

        for sub_item in sub_items {
            let child = self.insert_tree(sub_item, Some(key), ids, types);
            if let Some(node) = self.nodes.get_mut(key) {
                node.children.push(child);
            }
        }
        key
    }

    /// Frees `key` and every descendant that is not currently visible.
    ///
    /// Visible descendants stay in their provider and become top-level.
    pub(crate) fn remove_tree(&mut self, key: ItemKey) -> Option<Item> {
        let node = self.nodes.remove(key)?;
        if let Some(parent) = node.parent.and_then(|parent| self.nodes.get_mut(parent)) {
            parent.children.retain(|&child| child != key);
        }
        for child in node.children {
            self.release_child(child);
        }
        Some(node.item)
    }

    fn release_child(&mut self, key: ItemKey) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        if node.visible {
            node.parent = None;
            return;
        }
        if let Some(node) = self.nodes.remove(key) {
            for child in node.children {
                self.release_child(child);
            }
        }
    }

    pub(crate) fn set_visible(&mut self, key: ItemKey, visible: bool) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.visible = visible;
        }
    }

    pub(crate) fn parent_of(&self, key: ItemKey) -> Option<ItemKey> {
        self.nodes.get(key).and_then(|node| node.parent)
    }

    pub(crate) fn children_of(&self, key: ItemKey) -> &[ItemKey] {
        self.nodes
            .get(key)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `ancestor` lies on the parent chain of `key`.
    pub(crate) fn is_ancestor(&self, ancestor: ItemKey, key: ItemKey) -> bool {
        let mut current = self.parent_of(key);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent_of(parent);
        }
        false
    }

    /// Descendants of `key` that are currently listed, depth first.
    ///
    /// A hidden child hides its whole subtree.
    pub(crate) fn visible_descendants(&self, key: ItemKey) -> Vec<ItemKey> {
        let mut out = Vec::new();
        self.collect_visible(key, &mut out);
        out
    }

    fn collect_visible(&self, key: ItemKey, out: &mut Vec<ItemKey>) {
        for &child in self.children_of(key) {
            if self.get(child).is_some_and(|node| node.visible) {
                out.push(child);
                self.collect_visible(child, out);
            }
        }
    }

    /// Clears the expanded flag on every descendant of `key`.
    pub(crate) fn collapse_descendants(&mut self, key: ItemKey) {
        let children = self.children_of(key).to_vec();
        for child in children {
            if let Some(node) = self.nodes.get_mut(child) {
                node.item.expanded = false;
            }
            self.collapse_descendants(child);
        }
    }

    /// Rebuilds the declared hierarchy below `key` as plain values.
    pub(crate) fn subtree(&self, key: ItemKey) -> Vec<Item> {
        self.children_of(key)
            .iter()
            .filter_map(|&child| {
                let node = self.get(child)?;
                let mut item = node.item.shallow_clone();
                item.sub_items = self.subtree(child);
                Some(item)
            })
            .collect()
    }

    /// Drops every node.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena_with(item: Item) -> (ItemArena, ItemKey) {
        let mut arena = ItemArena::new();
        let mut ids = StableIdAllocator::new();
        let mut types = TypeRegistry::new();
        let key = arena.insert_tree(item, None, &mut ids, &mut types);
        (arena, key)
    }

    #[test]
    fn test_insert_tree_links_children() {
        let (arena, root) = arena_with(
            Item::new(0).with_sub_items(vec![
                Item::new(1),
                Item::new(1).with_sub_items(vec![Item::new(2)]),
            ]),
        );

        assert_eq!(arena.len(), 4);
        let children = arena.children_of(root);
        assert_eq!(children.len(), 2);
        assert_eq!(arena.parent_of(children[1]), Some(root));
        let grandchild = arena.children_of(children[1])[0];
        assert!(arena.is_ancestor(root, grandchild));
        assert!(!arena.is_ancestor(grandchild, root));
    }

    #[test]
    fn test_insert_tree_assigns_ids_and_types() {
        let mut arena = ItemArena::new();
        let mut ids = StableIdAllocator::new();
        let mut types = TypeRegistry::new();
        let root = arena.insert_tree(
            Item::new(0).with_sub_items(vec![Item::new(5).with_identifier(9)]),
            None,
            &mut ids,
            &mut types,
        );

        assert_eq!(arena.item(root).map(Item::identifier), Some(-2));
        let child = arena.children_of(root)[0];
        assert_eq!(arena.item(child).map(Item::identifier), Some(9));
        assert!(types.contains(0));
        assert!(types.contains(5));
    }

    #[test]
    fn test_remove_tree_frees_hidden_descendants() {
        let (mut arena, root) = arena_with(
            Item::new(0).with_sub_items(vec![Item::new(1).with_sub_items(vec![Item::new(2)])]),
        );

        assert!(arena.remove_tree(root).is_some());
        assert_eq!(arena.len(), 0);
    }

    #[test]
    fn test_remove_tree_orphans_visible_children() {
        let (mut arena, root) = arena_with(Item::new(0).with_sub_items(vec![Item::new(1), Item::new(1)]));
        let children = arena.children_of(root).to_vec();
        arena.set_visible(children[0], true);

        arena.remove_tree(root);
        assert!(arena.contains(children[0]));
        assert!(!arena.contains(children[1]));
        assert_eq!(arena.parent_of(children[0]), None);
    }

    #[test]
    fn test_visible_descendants() {
        let (mut arena, root) = arena_with(
            Item::new(0).with_sub_items(vec![
                Item::new(1).with_sub_items(vec![Item::new(2), Item::new(2)]),
                Item::new(1),
            ]),
        );
        assert!(arena.visible_descendants(root).is_empty());

        let children = arena.children_of(root).to_vec();
        arena.set_visible(children[0], true);
        arena.set_visible(children[1], true);
        let grandchild = arena.children_of(children[0])[0];
        arena.set_visible(grandchild, true);

        assert_eq!(
            arena.visible_descendants(root),
            vec![children[0], grandchild, children[1]]
        );
    }

    #[test]
    fn test_subtree_round_trips_hierarchy() {
        let (arena, root) = arena_with(
            Item::new(0).with_sub_items(vec![Item::new(1).with_sub_items(vec![Item::new(2)])]),
        );
        let subtree = arena.subtree(root);
        assert_eq!(subtree.len(), 1);
        assert_eq!(subtree[0].sub_items().len(), 1);
        assert_eq!(subtree[0].sub_items()[0].view_type(), 2);
    }
}
