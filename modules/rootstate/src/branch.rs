//! Branch composition: mounting one store inside another.
//!
//! The parent never touches the child's internals. It listens to the child's
//! meta-dispatch and, each time it fires, grafts the child's whole state in at
//! the mount path, inherits the child's change records, and re-raises the
//! child's event on itself.

use std::rc::{Rc, Weak};

use anyhow::Context;
use rootstate_snapshot::{set_in, split_path, Value};
use tracing::info;

use crate::conflict::Claim;
use crate::error::{StoreError, StoreResult};
use crate::store::Store;
use crate::types::MetaDispatch;

impl Store {
    /// Mount `child` at `path`.
    ///
    /// The path must not overlap another branch or any modifier path, in
    /// either direction. A store can be mounted only once, and never inside
    /// itself or one of its own branches. Mounts are permanent.
    pub fn add_as_branch(&self, path: &str, child: &Store) -> StoreResult<()> {
        if self.ptr_eq(child) {
            return Err(StoreError::SelfMount);
        }
        let segments: Vec<String> = split_path(path).into_iter().map(str::to_owned).collect();
        if segments.is_empty() {
            return Err(StoreError::InvalidPath {
                path: path.to_owned(),
            });
        }
        let mount = segments.join(".");

        if let Some(existing) = child.mounted_at() {
            return Err(StoreError::AlreadyMounted { path: existing });
        }
        if self.has_ancestor(child) {
            return Err(StoreError::BranchCycle { path: mount });
        }
        {
            let mut inner = self.inner.borrow_mut();
            inner
                .conflicts
                .check_branch(&segments)
                .map_err(|conflict| StoreError::Conflict {
                    registering: Claim::Branch.as_str(),
                    path: mount.clone(),
                    conflict,
                })?;
            inner.conflicts.claim_branch(&segments);
        }
        {
            let mut mounted = child.inner.borrow_mut();
            mounted.mounted_at = Some(mount.clone());
            mounted.parent = Some(Rc::downgrade(&self.inner));
        }

        // Weak both ways: the subscription lives in the child's registry.
        let parent = Rc::downgrade(&self.inner);
        let source = Rc::downgrade(&child.inner);
        let at = mount.clone();
        child.on(Store::META_DISPATCH, move |payload, _| {
            let (Some(parent), Some(source)) = (parent.upgrade(), source.upgrade()) else {
                return Ok(());
            };
            let meta = MetaDispatch::from_value(payload)
                .context("malformed meta-dispatch payload from branch")?;
            let child_state = source.borrow().state.clone();
            Store { inner: parent }.absorb_branch(&at, &segments, child_state, meta)?;
            Ok(())
        });

        info!(path = %mount, "Mounted branch");
        Ok(())
    }

    /// Whether `other` is this store or one of the stores it is mounted in,
    /// at any height.
    fn has_ancestor(&self, other: &Store) -> bool {
        let mut current = Some(self.inner.clone());
        while let Some(node) = current {
            if Rc::ptr_eq(&node, &other.inner) {
                return true;
            }
            current = node.borrow().parent.as_ref().and_then(Weak::upgrade);
        }
        false
    }

    fn absorb_branch(
        &self,
        mount: &str,
        segments: &[String],
        child_state: Value,
        meta: MetaDispatch,
    ) -> StoreResult<()> {
        {
            let mut inner = self.inner.borrow_mut();
            let grafted = set_in(&inner.state, segments, child_state);
            inner.state = grafted;
            if inner.config.use_change_log {
                let inherited: Vec<_> = meta
                    .changes
                    .iter()
                    .map(|change| change.inherited_from(mount))
                    .collect();
                inner.change_log.extend(inherited);
            }
        }
        self.dispatch(&meta.event_name, meta.payload)
    }
}
