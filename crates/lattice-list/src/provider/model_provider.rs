use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use lattice_list_core::logging::targets;

use super::ItemProvider;
use crate::error::{AdapterError, AdapterResult};
use crate::item::Item;

/// Maps a domain model to a displayable item. `None` skips the model.
pub type Interceptor<M> = Arc<dyn Fn(&M) -> Option<Item> + Send + Sync>;

/// Recovers a domain model from an item.
pub type ReverseInterceptor<M> = Arc<dyn Fn(&Item) -> Option<M> + Send + Sync>;

/// A provider fed with domain models instead of items.
///
/// Every model entry point runs the interceptor first, so the position
/// index and the extensions only ever see items. Item-level operations
/// (`remove`, `move_item`, `clear`, ...) are available through `Deref`.
///
/// # Example
///
/// ```
/// use lattice_list::{CompositeAdapter, Item, ModelProvider};
///
/// let adapter = CompositeAdapter::new();
/// let contacts = ModelProvider::new(|name: &String| {
///     (!name.is_empty()).then(|| Item::new(0).with_tag(name.clone()))
/// })
/// .with_reverse(|item| item.tag::<String>().cloned());
///
/// adapter.add_provider(0, &contacts).unwrap();
/// contacts
///     .add_models(&["Ada".to_string(), String::new(), "Grace".to_string()])
///     .unwrap();
///
/// assert_eq!(adapter.item_count(), 2);
/// assert_eq!(contacts.models().unwrap(), vec!["Ada".to_string(), "Grace".to_string()]);
/// ```
pub struct ModelProvider<M> {
    provider: ItemProvider,
    interceptor: Interceptor<M>,
    reverse: Option<ReverseInterceptor<M>>,
}

impl<M> Clone for ModelProvider<M> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            interceptor: self.interceptor.clone(),
            reverse: self.reverse.clone(),
        }
    }
}

impl<M> fmt::Debug for ModelProvider<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelProvider")
            .field("provider", &self.provider)
            .field("has_reverse", &self.reverse.is_some())
            .finish()
    }
}

impl<M> Deref for ModelProvider<M> {
    type Target = ItemProvider;

    fn deref(&self) -> &ItemProvider {
        &self.provider
    }
}

impl<M: 'static> ModelProvider<M> {
    /// Creates a detached provider with the given interceptor.
    pub fn new<F>(interceptor: F) -> Self
    where
        F: Fn(&M) -> Option<Item> + Send + Sync + 'static,
    {
        Self {
            provider: ItemProvider::new(),
            interceptor: Arc::new(interceptor),
            reverse: None,
        }
    }

    /// Sets the function used by [`models`](Self::models) to recover models.
    pub fn with_reverse<F>(mut self, reverse: F) -> Self
    where
        F: Fn(&Item) -> Option<M> + Send + Sync + 'static,
    {
        self.reverse = Some(Arc::new(reverse));
        self
    }

    /// The underlying item provider.
    pub fn provider(&self) -> &ItemProvider {
        &self.provider
    }

    /// Runs the interceptor over `models`, dropping skipped ones.
    pub fn intercept(&self, models: &[M]) -> Vec<Item> {
        let items: Vec<Item> = models
            .iter()
            .filter_map(|model| (self.interceptor)(model))
            .collect();
        if items.len() != models.len() {
            tracing::trace!(
                target: targets::ADAPTER,
                provider = ?self.provider.id(),
                skipped = models.len() - items.len(),
                "interceptor skipped models"
            );
        }
        items
    }

    /// Appends models.
    pub fn add_models(&self, models: &[M]) -> AdapterResult<()> {
        self.provider.add(self.intercept(models))
    }

    /// Inserts models before `local`.
    pub fn add_models_at(&self, local: usize, models: &[M]) -> AdapterResult<()> {
        self.provider.add_at(local, self.intercept(models))
    }

    /// Replaces the item at `local` with the model's item.
    ///
    /// Returns `false` and leaves the provider untouched when the model is skipped.
    pub fn set_model(&self, local: usize, model: &M) -> AdapterResult<bool> {
        match (self.interceptor)(model) {
            Some(item) => self.provider.set(local, item).map(|_| true),
            None => Ok(false),
        }
    }

    /// Replaces every item with the models' items.
    pub fn set_models(&self, models: &[M]) -> AdapterResult<()> {
        self.provider.set_items(self.intercept(models))
    }

    /// Recovers the models of every visible item.
    pub fn models(&self) -> AdapterResult<Vec<M>> {
        let reverse = self.reverse()?;
        Ok(self
            .provider
            .items()?
            .iter()
            .filter_map(|item| reverse(item))
            .collect())
    }

    /// Recovers the model at `local`.
    pub fn model(&self, local: usize) -> AdapterResult<Option<M>> {
        let reverse = self.reverse()?;
        Ok(self.provider.item(local)?.and_then(|item| reverse(&item)))
    }

    fn reverse(&self) -> AdapterResult<&ReverseInterceptor<M>> {
        self.reverse.as_ref().ok_or_else(|| {
            tracing::warn!(
                target: targets::ADAPTER,
                provider = ?self.provider.id(),
                "model recovery requested without a reverse interceptor"
            );
            AdapterError::MissingReverseInterceptor(self.provider.id())
        })
    }
}
