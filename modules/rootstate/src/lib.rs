//! Hierarchical, event-driven state container.
//!
//! A `Store` holds one immutable snapshot. Named events run the state
//! modifiers bound to them at dotted paths, the results are folded into a new
//! snapshot in one step, listeners are notified, and a meta-dispatch announces
//! what happened. Stores compose: a child mounted as a branch of a parent has
//! its state grafted into the parent and its events re-raised there.
//!
//! Single-threaded and synchronous. Reentrant dispatch from listeners runs to
//! completion on the call stack.

mod branch;
pub mod config;
pub mod conflict;
pub mod error;
pub mod registry;
pub mod store;
pub mod types;

pub use rootstate_snapshot as snapshot;
pub use rootstate_snapshot::Value;

pub use config::{load_config, StoreConfig, DEFAULT_MAX_DISPATCH_DEPTH};
pub use conflict::{Claim, Conflict, ConflictKind};
pub use error::{StoreError, StoreResult};
pub use registry::{Listener, ListenerFn, ListenerId, ModifierFn, ModifierId};
pub use store::Store;
pub use types::{Change, MetaDispatch};
