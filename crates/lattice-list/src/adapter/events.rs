//! Click, long-click and touch routing.
//!
//! A click on an enabled item walks this chain until a step consumes it:
//!
//! 1. the item's own pre-click handler
//! 2. the global pre-click listener
//! 3. each extension's `on_click`, in registration order
//! 4. the item's own click handler
//! 5. the global click listener
//!
//! Long-clicks and touches follow the same shape with their own hooks.
//! Disabled items never enter a chain.

use std::sync::Arc;

use lattice_list_core::logging::targets;

use super::{CompositeAdapter, RelativeInfo};
use crate::item::ItemHandler;

/// Adapter-wide listener for clicks and long-clicks. Returns `true` to consume.
pub type ItemListener = Arc<dyn Fn(&CompositeAdapter, &RelativeInfo) -> bool + Send + Sync>;

/// Adapter-wide listener for touches. Returns `true` to consume.
pub type TouchListener =
    Arc<dyn Fn(&CompositeAdapter, &RelativeInfo, &TouchEvent) -> bool + Send + Sync>;

/// Phase of a touch gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchAction {
    Down,
    Move,
    Up,
    Cancel,
}

/// A raw touch reported by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub action: TouchAction,
    pub x: f32,
    pub y: f32,
}

impl TouchEvent {
    pub fn new(action: TouchAction, x: f32, y: f32) -> Self {
        Self { action, x, y }
    }
}

#[derive(Default)]
pub(crate) struct GlobalListeners {
    pre_click: Option<ItemListener>,
    click: Option<ItemListener>,
    pre_long_click: Option<ItemListener>,
    long_click: Option<ItemListener>,
    touch: Option<TouchListener>,
}

fn run(handler: Option<&ItemHandler>, adapter: &CompositeAdapter, info: &RelativeInfo) -> bool {
    handler.is_some_and(|handler| handler(adapter, info))
}

impl CompositeAdapter {
    /// Sets the listener that runs before extensions see a click.
    pub fn set_on_pre_click_listener<F>(&self, listener: F)
    where
        F: Fn(&CompositeAdapter, &RelativeInfo) -> bool + Send + Sync + 'static,
    {
        self.inner.listeners.write().pre_click = Some(Arc::new(listener));
    }

    /// Sets the listener that runs last in the click chain.
    pub fn set_on_click_listener<F>(&self, listener: F)
    where
        F: Fn(&CompositeAdapter, &RelativeInfo) -> bool + Send + Sync + 'static,
    {
        self.inner.listeners.write().click = Some(Arc::new(listener));
    }

    pub fn set_on_pre_long_click_listener<F>(&self, listener: F)
    where
        F: Fn(&CompositeAdapter, &RelativeInfo) -> bool + Send + Sync + 'static,
    {
        self.inner.listeners.write().pre_long_click = Some(Arc::new(listener));
    }

    pub fn set_on_long_click_listener<F>(&self, listener: F)
    where
        F: Fn(&CompositeAdapter, &RelativeInfo) -> bool + Send + Sync + 'static,
    {
        self.inner.listeners.write().long_click = Some(Arc::new(listener));
    }

    pub fn set_on_touch_listener<F>(&self, listener: F)
    where
        F: Fn(&CompositeAdapter, &RelativeInfo, &TouchEvent) -> bool + Send + Sync + 'static,
    {
        self.inner.listeners.write().touch = Some(Arc::new(listener));
    }

    /// Removes every global listener.
    pub fn clear_listeners(&self) {
        *self.inner.listeners.write() = GlobalListeners::default();
    }

    /// Resolves `position` and returns it only if it holds an enabled item.
    fn interactive(&self, position: usize, kind: &'static str) -> Option<RelativeInfo> {
        let info = self.relative_info(position);
        match &info.item {
            Some(item) if item.is_enabled() => Some(info),
            Some(_) => {
                tracing::trace!(target: targets::EVENT, position, kind, "ignoring disabled item");
                None
            }
            None => {
                tracing::trace!(target: targets::EVENT, position, kind, "ignoring unresolved position");
                None
            }
        }
    }

    /// Routes a click on `position`. Returns whether a step consumed it.
    pub fn perform_click(&self, position: usize) -> bool {
        let Some(info) = self.interactive(position, "click") else {
            return false;
        };
        let Some(handlers) = info.item.as_ref().map(|item| item.handlers.clone()) else {
            return false;
        };
        let (pre, global) = {
            let listeners = self.inner.listeners.read();
            (listeners.pre_click.clone(), listeners.click.clone())
        };

        if run(handlers.pre_click.as_ref(), self, &info) || run(pre.as_ref(), self, &info) {
            tracing::trace!(target: targets::EVENT, position, "click consumed by pre-click");
            return true;
        }
        for extension in self.inner.extensions.snapshot() {
            if extension.on_click(self, &info) {
                tracing::trace!(
                    target: targets::EVENT,
                    position,
                    extension = extension.key(),
                    "click consumed by extension"
                );
                return true;
            }
        }
        run(handlers.click.as_ref(), self, &info) || run(global.as_ref(), self, &info)
    }

    /// Routes a long-click on `position`. Returns whether a step consumed it.
    pub fn perform_long_click(&self, position: usize) -> bool {
        let Some(info) = self.interactive(position, "long_click") else {
            return false;
        };
        let Some(handlers) = info.item.as_ref().map(|item| item.handlers.clone()) else {
            return false;
        };
        let (pre, global) = {
            let listeners = self.inner.listeners.read();
            (listeners.pre_long_click.clone(), listeners.long_click.clone())
        };

        if run(pre.as_ref(), self, &info) {
            return true;
        }
        for extension in self.inner.extensions.snapshot() {
            if extension.on_long_click(self, &info) {
                tracing::trace!(
                    target: targets::EVENT,
                    position,
                    extension = extension.key(),
                    "long-click consumed by extension"
                );
                return true;
            }
        }
        run(handlers.long_click.as_ref(), self, &info) || run(global.as_ref(), self, &info)
    }

    /// Routes a touch on `position`. Returns whether a step consumed it.
    pub fn perform_touch(&self, position: usize, event: &TouchEvent) -> bool {
        let Some(info) = self.interactive(position, "touch") else {
            return false;
        };
        let global = self.inner.listeners.read().touch.clone();

        for extension in self.inner.extensions.snapshot() {
            if extension.on_touch(self, &info, event) {
                return true;
            }
        }
        global.is_some_and(|listener| listener(self, &info, event))
    }
}
