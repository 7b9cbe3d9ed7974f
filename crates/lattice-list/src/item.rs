//! The item record displayed by a composite adapter.
//!
//! An [`Item`] carries a stable identifier, a view type, interaction flags,
//! selection and expansion state, and an opaque payload (`tag`). Items are
//! plain values while being built; once handed to a provider they are stored
//! in the adapter's arena and addressed by [`ItemKey`](crate::ItemKey).

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::adapter::{CompositeAdapter, RelativeInfo};

/// Identifier for the visual layout of an item.
///
/// Items of the same view type share a prototype in the
/// [`TypeRegistry`](crate::TypeRegistry) and are interchangeable when views
/// are recycled.
pub type ViewType = i32;

/// Identifier value meaning "no identifier assigned".
///
/// Items inserted with this value receive a negative identifier from the
/// adapter's [`StableIdAllocator`](crate::StableIdAllocator).
pub const NO_ID: i64 = -1;

/// Handler attached directly to an item. Returns `true` to consume the event.
pub type ItemHandler = Arc<dyn Fn(&CompositeAdapter, &RelativeInfo) -> bool + Send + Sync>;

/// Interaction flags for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemFlags {
    /// Item can be selected.
    pub selectable: bool,
    /// Item receives click, long-click and touch events.
    pub enabled: bool,
    /// Clicking the item toggles its sub-items.
    pub auto_expand: bool,
    /// Item can be dragged.
    pub draggable: bool,
    /// Item can be swiped away.
    pub swipeable: bool,
}

impl ItemFlags {
    /// Creates flags with every behavior switched on, `auto_expand` included.
    pub fn new() -> Self {
        Self {
            selectable: true,
            enabled: true,
            auto_expand: true,
            ..Default::default()
        }
    }

    /// Creates flags for a disabled item.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Sets the selectable flag.
    pub fn with_selectable(mut self, selectable: bool) -> Self {
        self.selectable = selectable;
        self
    }

    /// Sets the enabled flag.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets whether clicking the item expands or collapses it.
    pub fn with_auto_expand(mut self, auto_expand: bool) -> Self {
        self.auto_expand = auto_expand;
        self
    }

    /// Sets the draggable flag.
    pub fn with_draggable(mut self, draggable: bool) -> Self {
        self.draggable = draggable;
        self
    }

    /// Sets the swipeable flag.
    pub fn with_swipeable(mut self, swipeable: bool) -> Self {
        self.swipeable = swipeable;
        self
    }
}

#[derive(Clone, Default)]
pub(crate) struct ItemHandlers {
    pub(crate) pre_click: Option<ItemHandler>,
    pub(crate) click: Option<ItemHandler>,
    pub(crate) long_click: Option<ItemHandler>,
}

/// A single displayable record.
///
/// # Example
///
/// ```
/// use lattice_list::{Item, ItemFlags};
///
/// let header = Item::new(1)
///     .with_identifier(100)
///     .with_flags(ItemFlags::new().with_selectable(false))
///     .with_tag("Inbox".to_string())
///     .with_sub_items(vec![Item::new(2), Item::new(2)]);
///
/// assert_eq!(header.tag::<String>().map(String::as_str), Some("Inbox"));
/// assert_eq!(header.sub_items().len(), 2);
/// ```
#[derive(Clone)]
pub struct Item {
    pub(crate) identifier: i64,
    pub(crate) view_type: ViewType,
    pub(crate) flags: ItemFlags,
    pub(crate) selected: bool,
    pub(crate) expanded: bool,
    pub(crate) tag: Option<Arc<dyn Any + Send + Sync>>,
    pub(crate) sub_items: Vec<Item>,
    pub(crate) handlers: ItemHandlers,
}

impl Item {
    /// Creates an item of the given view type with default flags and no identifier.
    pub fn new(view_type: ViewType) -> Self {
        Self {
            identifier: NO_ID,
            view_type,
            flags: ItemFlags::new(),
            selected: false,
            expanded: false,
            tag: None,
            sub_items: Vec::new(),
            handlers: ItemHandlers::default(),
        }
    }

    /// Sets the stable identifier.
    pub fn with_identifier(mut self, identifier: i64) -> Self {
        self.identifier = identifier;
        self
    }

    /// Sets the interaction flags.
    pub fn with_flags(mut self, flags: ItemFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the initial selection state.
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Attaches an opaque payload.
    pub fn with_tag<T: Any + Send + Sync>(mut self, tag: T) -> Self {
        self.tag = Some(Arc::new(tag));
        self
    }

    /// Sets the sub-items revealed when this item is expanded.
    pub fn with_sub_items(mut self, sub_items: Vec<Item>) -> Self {
        self.sub_items = sub_items;
        self
    }

    /// Sets a handler that runs before any other click handler.
    pub fn with_pre_click<F>(mut self, handler: F) -> Self
    where
        F: Fn(&CompositeAdapter, &RelativeInfo) -> bool + Send + Sync + 'static,
    {
        self.handlers.pre_click = Some(Arc::new(handler));
        self
    }

    /// Sets a handler that runs after extensions have seen the click.
    pub fn with_click<F>(mut self, handler: F) -> Self
    where
        F: Fn(&CompositeAdapter, &RelativeInfo) -> bool + Send + Sync + 'static,
    {
        self.handlers.click = Some(Arc::new(handler));
        self
    }

    /// Sets a handler that runs after extensions have seen the long-click.
    pub fn with_long_click<F>(mut self, handler: F) -> Self
    where
        F: Fn(&CompositeAdapter, &RelativeInfo) -> bool + Send + Sync + 'static,
    {
        self.handlers.long_click = Some(Arc::new(handler));
        self
    }

    /// The stable identifier, or [`NO_ID`] before insertion.
    pub fn identifier(&self) -> i64 {
        self.identifier
    }

    /// Whether the identifier was supplied by the caller rather than allocated.
    pub fn has_explicit_identifier(&self) -> bool {
        self.identifier >= 0
    }

    pub fn view_type(&self) -> ViewType {
        self.view_type
    }

    pub fn flags(&self) -> ItemFlags {
        self.flags
    }

    pub fn is_selectable(&self) -> bool {
        self.flags.selectable
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.enabled
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Returns the payload if it has type `T`.
    pub fn tag<T: Any>(&self) -> Option<&T> {
        self.tag.as_deref().and_then(|tag| tag.downcast_ref::<T>())
    }

    /// Sub-items declared on this value.
    ///
    /// Items read back from an adapter carry no sub-items here; use
    /// [`CompositeAdapter::sub_items`] to inspect the stored hierarchy.
    pub fn sub_items(&self) -> &[Item] {
        &self.sub_items
    }

    /// Replaces the interaction flags in place.
    pub fn set_flags(&mut self, flags: ItemFlags) {
        self.flags = flags;
    }

    /// Replaces the payload in place.
    pub fn set_tag<T: Any + Send + Sync>(&mut self, tag: T) {
        self.tag = Some(Arc::new(tag));
    }

    /// Clone without the declared sub-items.
    pub(crate) fn shallow_clone(&self) -> Self {
        Self {
            identifier: self.identifier,
            view_type: self.view_type,
            flags: self.flags,
            selected: self.selected,
            expanded: self.expanded,
            tag: self.tag.clone(),
            sub_items: Vec::new(),
            handlers: self.handlers.clone(),
        }
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("identifier", &self.identifier)
            .field("view_type", &self.view_type)
            .field("flags", &self.flags)
            .field("selected", &self.selected)
            .field("expanded", &self.expanded)
            .field("has_tag", &self.tag.is_some())
            .field("sub_items", &self.sub_items.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_defaults() {
        let item = Item::new(7);
        assert_eq!(item.identifier(), NO_ID);
        assert!(!item.has_explicit_identifier());
        assert_eq!(item.view_type(), 7);
        assert!(item.is_selectable());
        assert!(item.is_enabled());
        assert!(!item.is_selected());
        assert!(!item.is_expanded());
    }

    #[test]
    fn test_item_tag_downcast() {
        let item = Item::new(0).with_tag(42u32);
        assert_eq!(item.tag::<u32>(), Some(&42));
        assert_eq!(item.tag::<String>(), None);
    }

    #[test]
    fn test_flags_builders() {
        let flags = ItemFlags::new().with_selectable(false).with_draggable(true);
        assert!(!flags.selectable);
        assert!(flags.enabled);
        assert!(flags.draggable);

        let defaults = ItemFlags::new();
        assert!(defaults.selectable && defaults.enabled && defaults.auto_expand);
        assert!(!defaults.draggable);

        let disabled = ItemFlags::disabled();
        assert!(!disabled.enabled);
        assert!(!disabled.selectable);
    }

    #[test]
    fn test_shallow_clone_drops_sub_items() {
        let item = Item::new(0)
            .with_identifier(3)
            .with_sub_items(vec![Item::new(1)]);
        let clone = item.shallow_clone();
        assert_eq!(clone.identifier(), 3);
        assert!(clone.sub_items().is_empty());
    }
}
