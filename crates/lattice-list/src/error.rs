//! Error types for the list engine.

use crate::item::ViewType;
use crate::provider::ProviderId;

/// Result type alias for adapter operations.
pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

/// Errors that can occur while mutating or querying a composite adapter.
///
/// Every variant describes a caller bug. Benign races (selecting a position
/// that no longer exists, expanding an item without sub-items) are reported
/// as `false` return values instead.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// A position or range lies outside the bounds reported by its owner.
    #[error("range {position}..{end} is out of bounds for length {len}", end = position.saturating_add(*count))]
    OutOfBounds {
        position: usize,
        count: usize,
        len: usize,
    },

    /// A move referenced a position outside the provider.
    #[error("cannot move item from {from} to {to}: length is {len}")]
    InvalidMove { from: usize, to: usize, len: usize },

    /// The provider handle has not been added to an adapter, or its adapter was dropped.
    #[error("provider {0:?} is not attached to an adapter")]
    ProviderNotAttached(ProviderId),

    /// The provider handle is attached to a different adapter.
    #[error("provider {0:?} is already attached to another adapter")]
    ProviderAttachedElsewhere(ProviderId),

    /// The provider is not part of this adapter's provider list.
    #[error("provider {0:?} is not registered with this adapter")]
    ProviderNotRegistered(ProviderId),

    /// Model recovery was requested from a provider without a reverse interceptor.
    #[error("provider {0:?} has no reverse interceptor, models cannot be recovered from items")]
    MissingReverseInterceptor(ProviderId),

    /// No prototype is registered for a view type.
    #[error("no prototype registered for view type {0}")]
    UnknownViewType(ViewType),

    /// A persisted state blob could not be decoded.
    #[error("failed to restore state for '{key}': {source}")]
    StateRestore {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Persisted state could not be encoded or decoded as JSON.
    #[error("state serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AdapterError {
    /// Create an out-of-bounds error.
    pub fn out_of_bounds(position: usize, count: usize, len: usize) -> Self {
        Self::OutOfBounds {
            position,
            count,
            len,
        }
    }

    /// Create a state restore error.
    pub fn state_restore(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::StateRestore {
            key: key.into(),
            source,
        }
    }
}

/// Fails with [`AdapterError::OutOfBounds`] unless `position..position + count` fits in `len`.
pub(crate) fn check_range(position: usize, count: usize, len: usize) -> AdapterResult<()> {
    match position.checked_add(count) {
        Some(end) if end <= len => Ok(()),
        _ => {
            lattice_list_core::list_warn!(position, count, len, "rejecting out-of-bounds range");
            Err(AdapterError::out_of_bounds(position, count, len))
        }
    }
}
