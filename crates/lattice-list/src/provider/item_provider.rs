use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::ProviderId;
use crate::adapter::{AdapterInner, CompositeAdapter};
use crate::error::{AdapterError, AdapterResult};
use crate::item::Item;

/// Handle to a provider's run of items.
///
/// The items themselves live in the adapter the provider is added to; the
/// handle only knows its identity and a weak back-reference to that adapter.
/// Clones share the same identity and attachment.
///
/// # Example
///
/// ```
/// use lattice_list::{CompositeAdapter, Item, ItemProvider};
///
/// let adapter = CompositeAdapter::new();
/// let header = ItemProvider::new();
/// let body = ItemProvider::new();
/// adapter.add_provider(0, &header).unwrap();
/// adapter.add_provider(1, &body).unwrap();
///
/// body.add(vec![Item::new(1), Item::new(1)]).unwrap();
/// header.add(vec![Item::new(0)]).unwrap();
///
/// assert_eq!(adapter.item_count(), 3);
/// assert_eq!(body.global_position(1).unwrap(), 2);
/// ```
#[derive(Clone)]
pub struct ItemProvider {
    id: ProviderId,
    attachment: Arc<RwLock<Weak<AdapterInner>>>,
}

impl Default for ItemProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ItemProvider {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ItemProvider {}

impl fmt::Debug for ItemProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemProvider")
            .field("id", &self.id)
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl ItemProvider {
    /// Creates a detached provider.
    pub fn new() -> Self {
        Self {
            id: ProviderId::next(),
            attachment: Arc::new(RwLock::new(Weak::new())),
        }
    }

    pub fn id(&self) -> ProviderId {
        self.id
    }

    /// Whether the provider belongs to a live adapter.
    pub fn is_attached(&self) -> bool {
        self.attachment.read().strong_count() > 0
    }

    /// The adapter this provider belongs to.
    pub fn adapter(&self) -> AdapterResult<CompositeAdapter> {
        self.attachment
            .read()
            .upgrade()
            .map(CompositeAdapter::from_inner)
            .ok_or(AdapterError::ProviderNotAttached(self.id))
    }

    pub(crate) fn attach(&self, inner: &Arc<AdapterInner>) -> AdapterResult<()> {
        let mut attachment = self.attachment.write();
        if let Some(current) = attachment.upgrade() {
            if !Arc::ptr_eq(&current, inner) {
                return Err(AdapterError::ProviderAttachedElsewhere(self.id));
            }
        }
        *attachment = Arc::downgrade(inner);
        Ok(())
    }

    pub(crate) fn detach(&self) {
        *self.attachment.write() = Weak::new();
    }

    /// Composition rank within the adapter.
    pub fn order(&self) -> AdapterResult<usize> {
        self.adapter()?.provider_order(self.id)
    }

    pub fn item_count(&self) -> AdapterResult<usize> {
        self.adapter()?.provider_item_count(self.id)
    }

    /// Snapshot of the visible items.
    pub fn items(&self) -> AdapterResult<Vec<Item>> {
        self.adapter()?.provider_items(self.id)
    }

    pub fn item(&self, local: usize) -> AdapterResult<Option<Item>> {
        Ok(self.items()?.into_iter().nth(local))
    }

    /// Translates a local position to a global one.
    pub fn global_position(&self, local: usize) -> AdapterResult<usize> {
        self.adapter()?.global_position(self, local)
    }

    /// Local position of the item with `identifier`.
    pub fn position_of(&self, identifier: i64) -> AdapterResult<Option<usize>> {
        Ok(self
            .items()?
            .iter()
            .position(|item| item.identifier() == identifier))
    }

    /// Appends items.
    pub fn add(&self, items: Vec<Item>) -> AdapterResult<()> {
        self.adapter()?.provider_insert(self.id, None, items)
    }

    /// Inserts items before `local`.
    pub fn add_at(&self, local: usize, items: Vec<Item>) -> AdapterResult<()> {
        self.adapter()?.provider_insert(self.id, Some(local), items)
    }

    /// Replaces the item at `local`.
    pub fn set(&self, local: usize, item: Item) -> AdapterResult<()> {
        self.adapter()?.provider_set(self.id, local, item)
    }

    /// Replaces every item.
    pub fn set_items(&self, items: Vec<Item>) -> AdapterResult<()> {
        self.adapter()?.provider_set_items(self.id, items)
    }

    /// Edits the item at `local` in place and reports it as changed.
    ///
    /// Sub-items declared on the edited value are ignored.
    pub fn modify<F, R>(&self, local: usize, f: F) -> AdapterResult<R>
    where
        F: FnOnce(&mut Item) -> R,
    {
        self.adapter()?.provider_modify(self.id, local, f)
    }

    /// Removes the item at `local`.
    pub fn remove(&self, local: usize) -> AdapterResult<Item> {
        let mut removed = self.adapter()?.provider_remove(self.id, local, 1)?;
        removed
            .pop()
            .ok_or_else(|| AdapterError::out_of_bounds(local, 1, 0))
    }

    /// Removes `count` items starting at `local`.
    pub fn remove_range(&self, local: usize, count: usize) -> AdapterResult<Vec<Item>> {
        self.adapter()?.provider_remove(self.id, local, count)
    }

    /// Moves the item at `from` so that it ends up at `to`.
    pub fn move_item(&self, from: usize, to: usize) -> AdapterResult<()> {
        self.adapter()?.provider_move(self.id, from, to)
    }

    /// Removes every item, including items an active filter hides.
    pub fn clear(&self) -> AdapterResult<()> {
        self.adapter()?.provider_clear(self.id).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_provider_errors() {
        let provider = ItemProvider::new();
        assert!(!provider.is_attached());
        assert!(matches!(
            provider.add(vec![Item::new(0)]),
            Err(AdapterError::ProviderNotAttached(id)) if id == provider.id()
        ));
        assert!(provider.item_count().is_err());
    }

    #[test]
    fn test_clones_share_identity() {
        let provider = ItemProvider::new();
        let clone = provider.clone();
        assert_eq!(provider, clone);
        assert_ne!(provider, ItemProvider::new());

        let adapter = CompositeAdapter::new();
        adapter.add_provider(0, &provider).unwrap();
        assert!(clone.is_attached());
    }

    #[test]
    fn test_attach_elsewhere_rejected() {
        let provider = ItemProvider::new();
        let first = CompositeAdapter::new();
        let second = CompositeAdapter::new();
        first.add_provider(0, &provider).unwrap();

        assert!(matches!(
            second.add_provider(0, &provider),
            Err(AdapterError::ProviderAttachedElsewhere(_))
        ));
        assert_eq!(second.provider_count(), 0);
    }

    #[test]
    fn test_adapter_dropped_detaches() {
        let provider = ItemProvider::new();
        {
            let adapter = CompositeAdapter::new();
            adapter.add_provider(0, &provider).unwrap();
            assert!(provider.is_attached());
        }
        assert!(!provider.is_attached());
    }

    #[test]
    fn test_crud() {
        let adapter = CompositeAdapter::new();
        let provider = ItemProvider::new();
        adapter.add_provider(0, &provider).unwrap();

        provider
            .add(vec![Item::new(0).with_identifier(1), Item::new(0).with_identifier(3)])
            .unwrap();
        provider.add_at(1, vec![Item::new(0).with_identifier(2)]).unwrap();
        assert_eq!(provider.position_of(2).unwrap(), Some(1));

        provider.set(0, Item::new(0).with_identifier(10)).unwrap();
        provider.move_item(0, 2).unwrap();
        let ids: Vec<_> = provider.items().unwrap().iter().map(Item::identifier).collect();
        assert_eq!(ids, vec![2, 3, 10]);

        let removed = provider.remove(1).unwrap();
        assert_eq!(removed.identifier(), 3);
        assert_eq!(provider.item_count().unwrap(), 2);

        provider.clear().unwrap();
        assert_eq!(adapter.item_count(), 0);
    }

    #[test]
    fn test_out_of_bounds_mutations_leave_state_untouched() {
        let adapter = CompositeAdapter::new();
        let provider = ItemProvider::new();
        adapter.add_provider(0, &provider).unwrap();
        provider.add(vec![Item::new(0), Item::new(0)]).unwrap();

        assert!(provider.add_at(3, vec![Item::new(0)]).is_err());
        assert!(provider.remove_range(1, 2).is_err());
        assert!(matches!(
            provider.move_item(0, 2),
            Err(AdapterError::InvalidMove { .. })
        ));
        assert!(provider.set(2, Item::new(0)).is_err());
        assert_eq!(provider.item_count().unwrap(), 2);
    }

    #[test]
    fn test_modify() {
        let adapter = CompositeAdapter::new();
        let provider = ItemProvider::new();
        adapter.add_provider(0, &provider).unwrap();
        provider.add(vec![Item::new(0)]).unwrap();

        provider.modify(0, |item| item.set_tag("edited")).unwrap();
        let item = provider.item(0).unwrap().unwrap();
        assert_eq!(item.tag::<&str>(), Some(&"edited"));
    }
}
