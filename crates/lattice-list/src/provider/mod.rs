//! Data providers (sub-adapters) and the position index that composes them.
//!
//! A provider owns a contiguous run of global positions. Callers mutate a
//! provider through its [`ItemProvider`] handle; every mutation is routed
//! through the owning [`CompositeAdapter`](crate::CompositeAdapter) so the
//! position index and all extension state stay in sync.

mod item_provider;
pub(crate) mod list;
mod model_provider;

use std::sync::atomic::{AtomicU64, Ordering};

pub use item_provider::ItemProvider;
pub use model_provider::{Interceptor, ModelProvider, ReverseInterceptor};

/// Global counter for unique provider IDs.
static PROVIDER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(u64);

impl ProviderId {
    pub(crate) fn next() -> Self {
        Self(PROVIDER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}
