//! Listener and state-modifier registrations.
//!
//! Listeners observe an event after its modifiers have run. Modifiers compute
//! the next value for one path. Both are keyed by event name, and every
//! registration hands back an opaque id used to remove exactly that entry.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use rootstate_snapshot::Value;

use crate::types::Change;

/// Plain listener: `(payload, changes)`. An error aborts the dispatch.
pub type ListenerFn = dyn Fn(&Value, &[Change]) -> anyhow::Result<()>;

/// State modifier: `(old value, payload, changes so far) -> new value`.
///
/// Returning a value that is [`same`](Value::same) as the old one records no
/// change.
pub type ModifierFn = dyn Fn(&Value, &Value, &[Change]) -> Value;

/// A shareable listener. Subscribing the same `Listener` twice to one event
/// is a no-op.
#[derive(Clone)]
pub struct Listener(Rc<ListenerFn>);

impl Listener {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &[Change]) -> anyhow::Result<()> + 'static,
    {
        Self(Rc::new(f))
    }

    pub fn call(&self, payload: &Value, changes: &[Change]) -> anyhow::Result<()> {
        (self.0)(payload, changes)
    }

    pub fn ptr_eq(&self, other: &Listener) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").finish_non_exhaustive()
    }
}

/// Handle for one listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Handle for one state-modifier registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModifierId(u64);

/// One registered modifier, bound to a single path.
#[derive(Clone)]
pub(crate) struct ModifierEntry {
    pub(crate) id: ModifierId,
    pub(crate) path: String,
    pub(crate) segments: Vec<String>,
    pub(crate) modifier: Rc<ModifierFn>,
}

#[derive(Default)]
pub(crate) struct Registry {
    next_id: u64,
    handlers: HashMap<String, Vec<(ListenerId, Listener)>>,
    /// Per event, in registration order. At most one entry per path.
    modifiers: HashMap<String, Vec<ModifierEntry>>,
    /// Reverse lookup for precise removal.
    modifier_events: HashMap<ModifierId, String>,
}

impl Registry {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub(crate) fn add_listener(&mut self, event: &str, listener: Listener) -> ListenerId {
        if let Some((id, _)) = self
            .handlers
            .get(event)
            .and_then(|set| set.iter().find(|(_, l)| l.ptr_eq(&listener)))
        {
            return *id;
        }
        let id = ListenerId(self.next());
        self.handlers
            .entry(event.to_owned())
            .or_default()
            .push((id, listener));
        id
    }

    /// Remove one listener; the event's entry goes away once it is empty.
    pub(crate) fn remove_listener(&mut self, event: &str, id: ListenerId) -> bool {
        let Some(set) = self.handlers.get_mut(event) else {
            return false;
        };
        let before = set.len();
        set.retain(|(existing, _)| *existing != id);
        let removed = set.len() != before;
        if set.is_empty() {
            self.handlers.remove(event);
        }
        removed
    }

    pub(crate) fn remove_listeners(&mut self, event: &str) -> usize {
        self.handlers.remove(event).map_or(0, |set| set.len())
    }

    pub(crate) fn listeners(&self, event: &str) -> Vec<Listener> {
        self.handlers
            .get(event)
            .map(|set| set.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn has_modifier(&self, event: &str, path: &str) -> bool {
        self.modifiers
            .get(event)
            .is_some_and(|entries| entries.iter().any(|e| e.path == path))
    }

    /// Caller has already rejected duplicates and conflicts.
    pub(crate) fn add_modifier(
        &mut self,
        event: &str,
        path: &str,
        segments: Vec<String>,
        modifier: Rc<ModifierFn>,
    ) -> ModifierId {
        let id = ModifierId(self.next());
        self.modifiers
            .entry(event.to_owned())
            .or_default()
            .push(ModifierEntry {
                id,
                path: path.to_owned(),
                segments,
                modifier,
            });
        self.modifier_events.insert(id, event.to_owned());
        id
    }

    /// Remove exactly one modifier, returning it so its path claim can be
    /// released.
    pub(crate) fn remove_modifier(&mut self, id: ModifierId) -> Option<ModifierEntry> {
        let event = self.modifier_events.remove(&id)?;
        let entries = self.modifiers.get_mut(&event)?;
        let index = entries.iter().position(|e| e.id == id)?;
        let entry = entries.remove(index);
        if entries.is_empty() {
            self.modifiers.remove(&event);
        }
        Some(entry)
    }

    pub(crate) fn remove_modifiers(&mut self, event: &str) -> Vec<ModifierEntry> {
        let entries = self.modifiers.remove(event).unwrap_or_default();
        for entry in &entries {
            self.modifier_events.remove(&entry.id);
        }
        entries
    }

    pub(crate) fn modifiers(&self, event: &str) -> Vec<ModifierEntry> {
        self.modifiers.get(event).cloned().unwrap_or_default()
    }
}
