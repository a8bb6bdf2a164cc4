//! Persistent, structurally-shared state snapshots.
//!
//! A `Value` is a JSON-shaped tree whose containers are persistent
//! collections. Producing a new snapshot with one path replaced never touches
//! the original, so readers can keep any snapshot they were handed.
//!
//! Zero knowledge of events, listeners, or stores.

pub mod path;
pub mod value;

pub use path::{get_in, get_or, get_path, set_in, split_path};
pub use value::{List, Map, Value};
