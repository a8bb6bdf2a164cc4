//! The store and its dispatch loop.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use rootstate_snapshot::{get_in, get_path, set_in, split_path, Value};
use tracing::{debug, trace, warn};

use crate::config::StoreConfig;
use crate::conflict::{Claim, ConflictTree};
use crate::error::{StoreError, StoreResult};
use crate::registry::{Listener, ListenerId, ModifierId, Registry};
use crate::types::{Change, MetaDispatch};

/// Handle to one state container.
///
/// Cloning the handle is cheap and every clone drives the same store. A store
/// is single-threaded: dispatch runs to completion on the calling thread, and
/// listeners may dispatch again (on this or any other store) before it
/// returns.
#[derive(Clone)]
pub struct Store {
    pub(crate) inner: Rc<RefCell<StoreInner>>,
}

pub(crate) struct StoreInner {
    pub(crate) config: StoreConfig,
    pub(crate) state: Value,
    pub(crate) registry: Registry,
    pub(crate) change_log: Vec<Change>,
    pub(crate) conflicts: ConflictTree,
    /// Set once this store is mounted as someone's branch.
    pub(crate) mounted_at: Option<String>,
    pub(crate) parent: Option<Weak<RefCell<StoreInner>>>,
    depth: usize,
}

impl Store {
    /// Reserved event fired once after every dispatch, carrying a
    /// [`MetaDispatch`] payload. Only the store itself may fire it.
    pub const META_DISPATCH: &'static str = "dispatch";

    pub fn new(config: StoreConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                config,
                state: Value::object(),
                registry: Registry::default(),
                change_log: Vec::new(),
                conflicts: ConflictTree::default(),
                mounted_at: None,
                parent: None,
                depth: 0,
            })),
        }
    }

    pub fn config(&self) -> StoreConfig {
        self.inner.borrow().config.clone()
    }

    pub fn uses_change_log(&self) -> bool {
        self.inner.borrow().config.use_change_log
    }

    /// Where this store is mounted as a branch, if anywhere.
    pub fn mounted_at(&self) -> Option<String> {
        self.inner.borrow().mounted_at.clone()
    }

    /// Whether two handles drive the same store.
    pub fn ptr_eq(&self, other: &Store) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Apply `event` to the store.
    ///
    /// Modifiers registered for the event run first, in registration order,
    /// and their results are folded into the state in one step. Listeners then
    /// see the payload and the changes, and finally the meta-dispatch fires.
    /// Firing [`Store::META_DISPATCH`] directly is refused.
    pub fn dispatch(&self, event: &str, payload: impl Into<Value>) -> StoreResult<()> {
        if event == Self::META_DISPATCH {
            return Err(StoreError::ReservedEvent(event.to_owned()));
        }
        self.run(event, payload.into())
    }

    fn run(&self, event: &str, payload: Value) -> StoreResult<()> {
        let is_meta = event == Self::META_DISPATCH;
        // The meta run is part of the dispatch that triggered it.
        let _depth = if is_meta {
            None
        } else {
            Some(DepthGuard::enter(&self.inner, event)?)
        };

        // No borrow is held while user code runs.
        let (modifiers, listeners, base, use_change_log) = {
            let inner = self.inner.borrow();
            (
                inner.registry.modifiers(event),
                inner.registry.listeners(event),
                inner.state.clone(),
                inner.config.use_change_log,
            )
        };

        // 1. Modifiers: every one reads from the pre-dispatch state, writes
        //    fold into a working snapshot that is committed once.
        let mut changes: Vec<Change> = Vec::new();
        let mut working = base.clone();
        for entry in &modifiers {
            let old = get_in(&base, &entry.segments).cloned().unwrap_or_default();
            let new = (entry.modifier)(&old, &payload, changes.as_slice());
            if new.same(&old) {
                continue;
            }
            trace!(event, path = %entry.path, "State modifier changed its path");
            working = set_in(&working, &entry.segments, new.clone());
            changes.push(Change::new(entry.path.clone(), new));
        }
        if !changes.is_empty() {
            let mut inner = self.inner.borrow_mut();
            inner.state = working;
            if use_change_log {
                inner.change_log.extend(changes.iter().cloned());
            }
        }

        // 2. Listeners
        for listener in &listeners {
            listener
                .call(&payload, &changes)
                .map_err(|source| StoreError::Listener {
                    event: event.to_owned(),
                    source,
                })?;
        }

        debug!(
            event,
            changes = changes.len(),
            listeners = listeners.len(),
            "Dispatched"
        );

        // 3. Meta-dispatch, exactly once per non-meta dispatch
        if !is_meta {
            let meta = MetaDispatch {
                event_name: event.to_owned(),
                payload,
                changes,
            };
            self.run(Self::META_DISPATCH, meta.into_value())?;
        }

        Ok(())
    }

    /// Register a listener. Returns the handle used to remove it.
    pub fn on<F>(&self, event: &str, f: F) -> ListenerId
    where
        F: Fn(&Value, &[Change]) -> anyhow::Result<()> + 'static,
    {
        self.subscribe(event, Listener::new(f))
    }

    /// Register a shared listener. Subscribing the same listener to the same
    /// event again returns the existing handle.
    pub fn subscribe(&self, event: &str, listener: Listener) -> ListenerId {
        let id = self
            .inner
            .borrow_mut()
            .registry
            .add_listener(event, listener);
        debug!(event, ?id, "Listener registered");
        id
    }

    /// Remove one listener. Returns false if it was not registered for `event`.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let removed = self.inner.borrow_mut().registry.remove_listener(event, id);
        if removed {
            debug!(event, ?id, "Listener removed");
        }
        removed
    }

    /// Remove every listener for `event`. Modifiers are left alone.
    pub fn off_all(&self, event: &str) -> usize {
        let removed = self.inner.borrow_mut().registry.remove_listeners(event);
        debug!(event, removed, "Listeners removed");
        removed
    }

    /// Bind a modifier to `(event, path)`.
    ///
    /// Without a path the store's configured default path is used. Fails if
    /// neither exists, if the pair is already taken, or if the path overlaps a
    /// mounted branch.
    pub fn add_state_modifier<'a, F>(
        &self,
        path: impl Into<Option<&'a str>>,
        event: &str,
        f: F,
    ) -> StoreResult<ModifierId>
    where
        F: Fn(&Value, &Value, &[Change]) -> Value + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let raw = match path.into() {
            Some(path) => path.to_owned(),
            None => inner
                .config
                .path
                .clone()
                .ok_or_else(|| StoreError::MissingPath {
                    event: event.to_owned(),
                })?,
        };
        let segments: Vec<String> = split_path(&raw).into_iter().map(str::to_owned).collect();
        if segments.is_empty() {
            return Err(StoreError::InvalidPath { path: raw });
        }
        let path = segments.join(".");

        inner
            .conflicts
            .check_modifier(&segments)
            .map_err(|conflict| StoreError::Conflict {
                registering: Claim::Modifier.as_str(),
                path: path.clone(),
                conflict,
            })?;
        if inner.registry.has_modifier(event, &path) {
            return Err(StoreError::DuplicateModifier {
                event: event.to_owned(),
                path,
            });
        }

        inner.conflicts.claim_modifier(&segments);
        let id = inner
            .registry
            .add_modifier(event, &path, segments, Rc::new(f));
        debug!(event, path = %path, ?id, "State modifier registered");
        Ok(id)
    }

    /// Remove exactly one modifier and release its path claim.
    pub fn remove_state_modifier(&self, id: ModifierId) -> bool {
        let mut inner = self.inner.borrow_mut();
        match inner.registry.remove_modifier(id) {
            Some(entry) => {
                inner.conflicts.release_modifier(&entry.segments);
                debug!(path = %entry.path, ?id, "State modifier removed");
                true
            }
            None => false,
        }
    }

    /// Remove every modifier bound to `event`.
    pub fn remove_state_modifiers(&self, event: &str) -> usize {
        let mut inner = self.inner.borrow_mut();
        let removed = inner.registry.remove_modifiers(event);
        for entry in &removed {
            inner.conflicts.release_modifier(&entry.segments);
        }
        debug!(event, removed = removed.len(), "State modifiers removed");
        removed.len()
    }

    /// The whole current snapshot. It stays valid and unchanged however the
    /// store moves on.
    pub fn get_state(&self) -> Value {
        self.inner.borrow().state.clone()
    }

    /// The current value at a dotted path.
    pub fn get_state_at(&self, path: &str) -> Option<Value> {
        get_path(&self.inner.borrow().state, path).cloned()
    }

    /// A copy of every change record, oldest first. Always empty when the
    /// change log is disabled.
    pub fn get_change_log(&self) -> Vec<Change> {
        self.inner.borrow().change_log.clone()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Store")
            .field("config", &inner.config)
            .field("mounted_at", &inner.mounted_at)
            .field("change_log_len", &inner.change_log.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Recursion guard
// ---------------------------------------------------------------------------

/// Counts nested dispatches on one store. A listener that always re-raises
/// its own event would otherwise recurse until the stack overflows.
struct DepthGuard<'a> {
    inner: &'a RefCell<StoreInner>,
}

impl<'a> DepthGuard<'a> {
    fn enter(inner: &'a RefCell<StoreInner>, event: &str) -> StoreResult<Self> {
        let mut state = inner.borrow_mut();
        let limit = state.config.max_dispatch_depth;
        if state.depth >= limit {
            warn!(event, limit, "Dispatch depth limit exceeded");
            return Err(StoreError::DepthExceeded {
                event: event.to_owned(),
                limit,
            });
        }
        state.depth += 1;
        Ok(Self { inner })
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.inner.try_borrow_mut() {
            state.depth = state.depth.saturating_sub(1);
        }
    }
}
