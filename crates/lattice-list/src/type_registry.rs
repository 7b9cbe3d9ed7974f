//! View-type prototypes.

use std::collections::HashMap;

use crate::item::{Item, ViewType};

/// Maps each view type to the first item registered with it.
///
/// Hosts use the prototype to fabricate recyclable views. Registration is
/// idempotent: later items of an already-known type are ignored.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    prototypes: HashMap<ViewType, Item>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `item` as the prototype for its view type if none exists yet.
    ///
    /// Returns `true` if the view type was new.
    pub fn register(&mut self, item: &Item) -> bool {
        if self.prototypes.contains_key(&item.view_type()) {
            return false;
        }
        self.prototypes
            .insert(item.view_type(), item.shallow_clone());
        true
    }

    /// The prototype for a view type.
    pub fn get(&self, view_type: ViewType) -> Option<&Item> {
        self.prototypes.get(&view_type)
    }

    pub fn contains(&self, view_type: ViewType) -> bool {
        self.prototypes.contains_key(&view_type)
    }

    /// All registered view types in ascending order.
    pub fn view_types(&self) -> Vec<ViewType> {
        let mut types: Vec<_> = self.prototypes.keys().copied().collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.prototypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prototypes.is_empty()
    }

    /// Forgets every prototype.
    pub fn clear(&mut self) {
        self.prototypes.clear();
    }
}
