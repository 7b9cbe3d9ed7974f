//! Per-view interaction hooks.
//!
//! The host creates a [`ViewHolder`] for every recycled view it inflates.
//! At creation time each registered [`EventHook`] picks the sub-views it
//! wants to listen on. When the host later reports an interaction on one of
//! those sub-views, the adapter resolves the holder's *current* binding, so
//! a hook never acts on the item a view showed when it was created.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use lattice_list_core::logging::targets;

use super::events::TouchEvent;
use super::{CompositeAdapter, RelativeInfo};
use crate::arena::ItemKey;
use crate::error::{AdapterError, AdapterResult};
use crate::item::ViewType;

static VIEW_HOLDER_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Kind of interaction a hook handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookCapability {
    Click,
    LongClick,
    Touch,
    /// The hook installs its own listeners through [`EventHook::attach`].
    Custom,
}

/// A listener installed by a custom hook.
pub type CustomListener = Arc<dyn Fn(&CompositeAdapter, &RelativeInfo) + Send + Sync>;

/// A behavior bound to sub-views of every created view holder.
pub trait EventHook: Send + Sync {
    fn capability(&self) -> HookCapability;

    /// Names of the sub-views of `holder` this hook listens on.
    fn targets(&self, _holder: &ViewHolder) -> Vec<String> {
        Vec::new()
    }

    fn on_click(&self, _adapter: &CompositeAdapter, _info: &RelativeInfo, _sub_view: &str) {}

    fn on_long_click(&self, _adapter: &CompositeAdapter, _info: &RelativeInfo, _sub_view: &str) -> bool {
        false
    }

    fn on_touch(
        &self,
        _adapter: &CompositeAdapter,
        _info: &RelativeInfo,
        _sub_view: &str,
        _event: &TouchEvent,
    ) -> bool {
        false
    }

    /// Installs custom listeners on `holder`. Only called for [`HookCapability::Custom`].
    fn attach(&self, _adapter: &CompositeAdapter, _holder: &ViewHolder) {}
}

struct InstalledHook {
    sub_view: String,
    hook: Arc<dyn EventHook>,
}

/// A host-side recycled view, seen through its named sub-views.
pub struct ViewHolder {
    id: u64,
    view_type: ViewType,
    sub_views: Vec<String>,
    binding: RwLock<Option<ItemKey>>,
    installed: RwLock<Vec<InstalledHook>>,
    custom: RwLock<Vec<(String, CustomListener)>>,
}

impl fmt::Debug for ViewHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewHolder")
            .field("id", &self.id)
            .field("view_type", &self.view_type)
            .field("sub_views", &self.sub_views)
            .field("binding", &*self.binding.read())
            .field("hooks", &self.installed.read().len())
            .finish()
    }
}

impl ViewHolder {
    fn new(view_type: ViewType, sub_views: &[&str]) -> Self {
        Self {
            id: VIEW_HOLDER_COUNTER.fetch_add(1, Ordering::Relaxed),
            view_type,
            sub_views: sub_views.iter().map(|name| name.to_string()).collect(),
            binding: RwLock::new(None),
            installed: RwLock::new(Vec::new()),
            custom: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn view_type(&self) -> ViewType {
        self.view_type
    }

    pub fn sub_views(&self) -> &[String] {
        &self.sub_views
    }

    pub fn has_sub_view(&self, name: &str) -> bool {
        self.sub_views.iter().any(|sub_view| sub_view == name)
    }

    /// The item this holder currently shows.
    pub fn bound_key(&self) -> Option<ItemKey> {
        *self.binding.read()
    }

    /// Registers a listener fired by [`CompositeAdapter::dispatch_view_custom`].
    pub fn on_custom<F>(&self, sub_view: &str, listener: F)
    where
        F: Fn(&CompositeAdapter, &RelativeInfo) + Send + Sync + 'static,
    {
        self.custom
            .write()
            .push((sub_view.to_string(), Arc::new(listener)));
    }

    fn hooks_for(&self, sub_view: &str, capability: HookCapability) -> Vec<Arc<dyn EventHook>> {
        self.installed
            .read()
            .iter()
            .filter(|installed| {
                installed.sub_view == sub_view && installed.hook.capability() == capability
            })
            .map(|installed| installed.hook.clone())
            .collect()
    }
}

type ClickFn = dyn Fn(&CompositeAdapter, &RelativeInfo, &str) + Send + Sync;
type LongClickFn = dyn Fn(&CompositeAdapter, &RelativeInfo, &str) -> bool + Send + Sync;
type TouchFn = dyn Fn(&CompositeAdapter, &RelativeInfo, &str, &TouchEvent) -> bool + Send + Sync;

/// Runs a closure when one of the named sub-views is clicked.
pub struct ClickHook {
    targets: Vec<String>,
    handler: Box<ClickFn>,
}

impl ClickHook {
    pub fn new<F>(targets: &[&str], handler: F) -> Self
    where
        F: Fn(&CompositeAdapter, &RelativeInfo, &str) + Send + Sync + 'static,
    {
        Self {
            targets: targets.iter().map(|t| t.to_string()).collect(),
            handler: Box::new(handler),
        }
    }
}

impl EventHook for ClickHook {
    fn capability(&self) -> HookCapability {
        HookCapability::Click
    }

    fn targets(&self, _holder: &ViewHolder) -> Vec<String> {
        self.targets.clone()
    }

    fn on_click(&self, adapter: &CompositeAdapter, info: &RelativeInfo, sub_view: &str) {
        (self.handler)(adapter, info, sub_view)
    }
}

/// Runs a closure when one of the named sub-views is long-clicked.
pub struct LongClickHook {
    targets: Vec<String>,
    handler: Box<LongClickFn>,
}

impl LongClickHook {
    pub fn new<F>(targets: &[&str], handler: F) -> Self
    where
        F: Fn(&CompositeAdapter, &RelativeInfo, &str) -> bool + Send + Sync + 'static,
    {
        Self {
            targets: targets.iter().map(|t| t.to_string()).collect(),
            handler: Box::new(handler),
        }
    }
}

impl EventHook for LongClickHook {
    fn capability(&self) -> HookCapability {
        HookCapability::LongClick
    }

    fn targets(&self, _holder: &ViewHolder) -> Vec<String> {
        self.targets.clone()
    }

    fn on_long_click(&self, adapter: &CompositeAdapter, info: &RelativeInfo, sub_view: &str) -> bool {
        (self.handler)(adapter, info, sub_view)
    }
}

/// Runs a closure when one of the named sub-views is touched.
pub struct TouchHook {
    targets: Vec<String>,
    handler: Box<TouchFn>,
}

impl TouchHook {
    pub fn new<F>(targets: &[&str], handler: F) -> Self
    where
        F: Fn(&CompositeAdapter, &RelativeInfo, &str, &TouchEvent) -> bool + Send + Sync + 'static,
    {
        Self {
            targets: targets.iter().map(|t| t.to_string()).collect(),
            handler: Box::new(handler),
        }
    }
}

impl EventHook for TouchHook {
    fn capability(&self) -> HookCapability {
        HookCapability::Touch
    }

    fn targets(&self, _holder: &ViewHolder) -> Vec<String> {
        self.targets.clone()
    }

    fn on_touch(
        &self,
        adapter: &CompositeAdapter,
        info: &RelativeInfo,
        sub_view: &str,
        event: &TouchEvent,
    ) -> bool {
        (self.handler)(adapter, info, sub_view, event)
    }
}

/// Runs an attach routine against every created view holder.
pub struct CustomHook {
    attach: Box<dyn Fn(&CompositeAdapter, &ViewHolder) + Send + Sync>,
}

impl CustomHook {
    pub fn new<F>(attach: F) -> Self
    where
        F: Fn(&CompositeAdapter, &ViewHolder) + Send + Sync + 'static,
    {
        Self {
            attach: Box::new(attach),
        }
    }
}

impl EventHook for CustomHook {
    fn capability(&self) -> HookCapability {
        HookCapability::Custom
    }

    fn attach(&self, adapter: &CompositeAdapter, holder: &ViewHolder) {
        (self.attach)(adapter, holder)
    }
}

impl CompositeAdapter {
    /// Registers a hook for view holders created from now on.
    pub fn add_event_hook<H: EventHook + 'static>(&self, hook: H) {
        self.inner.hooks.write().push(Arc::new(hook));
    }

    pub fn event_hook_count(&self) -> usize {
        self.inner.hooks.read().len()
    }

    /// Creates a view holder for `view_type` and installs every hook on it.
    ///
    /// Fails with [`AdapterError::UnknownViewType`] if no item of that type
    /// was ever added.
    pub fn create_view_holder(
        &self,
        view_type: ViewType,
        sub_views: &[&str],
    ) -> AdapterResult<Arc<ViewHolder>> {
        if self.type_prototype(view_type).is_none() {
            tracing::warn!(target: targets::EVENT, view_type, "view holder for unknown view type");
            return Err(AdapterError::UnknownViewType(view_type));
        }

        let holder = Arc::new(ViewHolder::new(view_type, sub_views));
        let hooks = self.inner.hooks.read().clone();
        for hook in hooks {
            if hook.capability() == HookCapability::Custom {
                hook.attach(self, &holder);
                continue;
            }
            let installed: Vec<InstalledHook> = hook
                .targets(&holder)
                .into_iter()
                .filter(|target| holder.has_sub_view(target))
                .map(|sub_view| InstalledHook {
                    sub_view,
                    hook: hook.clone(),
                })
                .collect();
            holder.installed.write().extend(installed);
        }
        tracing::trace!(
            target: targets::EVENT,
            holder = holder.id,
            view_type,
            hooks = holder.installed.read().len(),
            "created view holder"
        );
        Ok(holder)
    }

    /// Records that `holder` now shows the item at `position`.
    ///
    /// The binding follows the item itself, so later mutations above it
    /// do not redirect the holder's hooks to a different item.
    pub fn bind_view_holder(&self, holder: &ViewHolder, position: usize) {
        let key = self.relative_info(position).key;
        if key.is_none() {
            tracing::trace!(target: targets::EVENT, holder = holder.id, position, "binding to unresolved position");
        }
        *holder.binding.write() = key;
    }

    /// Records that `holder` no longer shows anything.
    pub fn unbind_view_holder(&self, holder: &ViewHolder) {
        *holder.binding.write() = None;
    }

    /// Resolves the holder's bound item to its current position, if it is
    /// still visible and enabled.
    fn resolve_holder(&self, holder: &ViewHolder) -> Option<RelativeInfo> {
        let position = self.position_of_key(holder.bound_key()?)?;
        let info = self.relative_info(position);
        info.item
            .as_ref()
            .is_some_and(|item| item.is_enabled())
            .then_some(info)
    }

    /// Reports a click on a sub-view. Returns whether any hook ran.
    pub fn dispatch_view_click(&self, holder: &ViewHolder, sub_view: &str) -> bool {
        let Some(info) = self.resolve_holder(holder) else {
            return false;
        };
        let hooks = holder.hooks_for(sub_view, HookCapability::Click);
        for hook in &hooks {
            hook.on_click(self, &info, sub_view);
        }
        !hooks.is_empty()
    }

    /// Reports a long-click on a sub-view. Returns whether a hook consumed it.
    pub fn dispatch_view_long_click(&self, holder: &ViewHolder, sub_view: &str) -> bool {
        let Some(info) = self.resolve_holder(holder) else {
            return false;
        };
        holder
            .hooks_for(sub_view, HookCapability::LongClick)
            .iter()
            .any(|hook| hook.on_long_click(self, &info, sub_view))
    }

    /// Reports a touch on a sub-view. Returns whether a hook consumed it.
    pub fn dispatch_view_touch(&self, holder: &ViewHolder, sub_view: &str, event: &TouchEvent) -> bool {
        let Some(info) = self.resolve_holder(holder) else {
            return false;
        };
        holder
            .hooks_for(sub_view, HookCapability::Touch)
            .iter()
            .any(|hook| hook.on_touch(self, &info, sub_view, event))
    }

    /// Fires the custom listeners registered for `name` on `holder`.
    pub fn dispatch_view_custom(&self, holder: &ViewHolder, name: &str) -> bool {
        let Some(info) = self.resolve_holder(holder) else {
            return false;
        };
        let listeners: Vec<CustomListener> = holder
            .custom
            .read()
            .iter()
            .filter(|(sub_view, _)| sub_view == name)
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in &listeners {
            listener(self, &info);
        }
        !listeners.is_empty()
    }
}
