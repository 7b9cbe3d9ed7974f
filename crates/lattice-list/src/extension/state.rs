//! Persisted extension state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use lattice_list_core::logging::targets;

use crate::adapter::CompositeAdapter;
use crate::error::AdapterResult;

/// Extension state blobs keyed by `prefix + extension key`.
///
/// The prefix lets several adapters persist into one store without
/// clashing. The whole value serializes to a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedState {
    entries: BTreeMap<String, serde_json::Value>,
}

impl SavedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.entries.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> AdapterResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> AdapterResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn state_key(prefix: &str, key: &str) -> String {
    format!("{prefix}{key}")
}

impl CompositeAdapter {
    /// Collects the state of every extension into a new [`SavedState`].
    pub fn save_state(&self, prefix: &str) -> SavedState {
        let mut state = SavedState::new();
        self.save_state_into(&mut state, prefix);
        state
    }

    /// Adds the state of every extension to `state`.
    pub fn save_state_into(&self, state: &mut SavedState, prefix: &str) {
        for extension in self.inner.extensions.snapshot() {
            if let Some(value) = extension.save_state(self) {
                state.insert(state_key(prefix, extension.key()), value);
            }
        }
        tracing::debug!(target: targets::EXTENSION, prefix, entries = state.len(), "saved state");
    }

    /// Hands each extension its blob from `state`.
    ///
    /// Call this only after the providers have been repopulated; positions
    /// in the blobs refer to that content.
    pub fn restore_state(&self, state: &SavedState, prefix: &str) -> AdapterResult<()> {
        for extension in self.inner.extensions.snapshot() {
            if let Some(value) = state.get(&state_key(prefix, extension.key())) {
                extension.restore_state(self, value)?;
            }
        }
        tracing::debug!(target: targets::EXTENSION, prefix, "restored state");
        Ok(())
    }
}
