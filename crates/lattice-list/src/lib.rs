//! Lattice List: a composable list adapter engine.
//!
//! A [`CompositeAdapter`] presents the items of several independent
//! [`ItemProvider`]s as one flat list. It keeps a position index that
//! translates between global positions and provider-local ones, funnels
//! every mutation through a single notification pipeline, and lets
//! pluggable [`AdapterExtension`]s such as selection and expand/collapse
//! observe those mutations and intercept user interaction.
//!
//! The host list widget owns rendering and view recycling; this crate only
//! keeps positions, identities and per-item state correct.
//!
//! # Example
//!
//! ```
//! use lattice_list::{CompositeAdapter, Item, ItemProvider, SelectionConfig};
//!
//! let adapter = CompositeAdapter::new();
//! let header = ItemProvider::new();
//! let body = ItemProvider::new();
//! adapter.push_provider(&header).unwrap();
//! adapter.push_provider(&body).unwrap();
//!
//! header.add(vec![Item::new(0).with_identifier(1)]).unwrap();
//! body.add((10..13).map(|id| Item::new(1).with_identifier(id)).collect()).unwrap();
//! assert_eq!(adapter.item_count(), 4);
//!
//! let select = adapter.select_extension();
//! select.set_config(SelectionConfig::new().with_multi_select(true));
//! select.select(&adapter, 2, false, true);
//!
//! // Mutations in front of a selection shift it.
//! header.add(vec![Item::new(0)]).unwrap();
//! assert_eq!(select.selected_positions(), vec![3]);
//! ```
//!
//! # Threading
//!
//! Every type here is `Send + Sync`, but the adapter is meant to be driven
//! from one thread. Compute large lists or diffs elsewhere and apply the
//! result through the mutation entry points.

pub mod adapter;
pub mod arena;
pub mod diff;
pub mod error;
pub mod extension;
pub mod filter;
pub mod id_allocator;
pub mod item;
pub mod provider;
pub mod type_registry;
pub mod util;

pub use adapter::{
    AdapterSignals, ChangePayload, ClickHook, CompositeAdapter, CustomHook, CustomListener,
    EventHook, HookCapability, ItemListener, LongClickHook, Mutation, RelativeInfo, TouchAction,
    TouchEvent, TouchHook, TouchListener, ViewHolder,
};
pub use arena::ItemKey;
pub use diff::{DiffOp, compute_diff};
pub use error::{AdapterError, AdapterResult};
pub use extension::{
    AdapterExtension, ExpandConfig, ExpandExtension, SavedState, SelectExtension, SelectionConfig,
};
pub use filter::{FilterPredicate, ItemFilter};
pub use id_allocator::StableIdAllocator;
pub use item::{Item, ItemFlags, ItemHandler, NO_ID, ViewType};
pub use provider::{Interceptor, ItemProvider, ModelProvider, ProviderId, ReverseInterceptor};
pub use type_registry::TypeRegistry;

pub use lattice_list_core::{ConnectionId, Signal};
