//! Shared helpers for store integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use rootstate::{Change, MetaDispatch, Store, Value};
use tracing_subscriber::EnvFilter;

/// Route `tracing` output to the test harness. `RUST_LOG=rootstate=trace`
/// shows every dispatch.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Shared, append-only record of what listeners saw.
#[derive(Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }
}

/// Every payload a listener received, in order.
#[derive(Clone, Default)]
pub struct Payloads(Rc<RefCell<Vec<(Value, Vec<Change>)>>>);

impl Payloads {
    pub fn listen(&self, store: &Store, event: &str) {
        let sink = self.clone();
        store.on(event, move |payload, changes| {
            sink.0.borrow_mut().push((payload.clone(), changes.to_vec()));
            Ok(())
        });
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.0.borrow().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn changes(&self) -> Vec<Vec<Change>> {
        self.0.borrow().iter().map(|(_, c)| c.clone()).collect()
    }

    /// Decode recorded meta-dispatch payloads.
    pub fn metas(&self) -> Vec<MetaDispatch> {
        self.payloads()
            .iter()
            .map(|p| MetaDispatch::from_value(p).expect("meta-dispatch payload"))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }
}

/// Modifier that appends the payload to an array at its path.
pub fn append_payload(old: &Value, payload: &Value, _: &[Change]) -> Value {
    old.appended(payload.clone())
}

/// Modifier that replaces its path with the payload.
pub fn replace_with_payload(_: &Value, payload: &Value, _: &[Change]) -> Value {
    payload.clone()
}
