//! Path claims and conflict detection for modifiers and branches.
//!
//! Two prefix trees are kept: one for paths claimed by state modifiers, one
//! for paths claimed by mounted branches. A branch owns its whole subtree, so
//! a new registration conflicts with an opposing claim at the same path, at
//! any ancestor, or at any descendant.

use std::collections::BTreeMap;
use std::fmt;

/// Which kind of registration holds a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    Modifier,
    Branch,
}

impl Claim {
    pub fn as_str(&self) -> &'static str {
        match self {
            Claim::Modifier => "state modifier",
            Claim::Branch => "branch",
        }
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the existing claim sits relative to the requested path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// The requested path itself is claimed.
    Exact,
    /// A strict ancestor of the requested path is claimed.
    Ancestor,
    /// A path strictly below the requested one is claimed.
    Descendant,
}

/// A rejected registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// The claimed path that blocks the registration.
    pub path: String,
    pub claimed_by: Claim,
    pub kind: ConflictKind,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ConflictKind::Exact => write!(f, "path is already claimed by a {}", self.claimed_by)?,
            ConflictKind::Ancestor => write!(f, "path is beneath an existing {}", self.claimed_by)?,
            ConflictKind::Descendant => write!(f, "path is above an existing {}", self.claimed_by)?,
        }
        write!(f, ". Conflict at: {}", self.path)
    }
}

// ---------------------------------------------------------------------------
// PathTrie
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Node {
    /// How many registrations claim exactly this path.
    claims: usize,
    children: BTreeMap<String, Node>,
}

/// Prefix tree of claimed paths. Not state: mutated in place.
#[derive(Debug, Default)]
pub(crate) struct PathTrie {
    root: Node,
}

impl PathTrie {
    pub(crate) fn claim<S: AsRef<str>>(&mut self, segments: &[S]) {
        let node = segments.iter().fold(&mut self.root, |node, seg| {
            node.children.entry(seg.as_ref().to_owned()).or_default()
        });
        node.claims += 1;
    }

    /// Drop one claim on the exact path, pruning emptied nodes. Returns false
    /// if the path held no claim.
    pub(crate) fn release<S: AsRef<str>>(&mut self, segments: &[S]) -> bool {
        release(&mut self.root, segments)
    }

    /// Length of the longest claimed prefix of `segments`, the full path
    /// included.
    fn claimed_prefix<S: AsRef<str>>(&self, segments: &[S]) -> Option<usize> {
        let mut node = &self.root;
        let mut longest = None;
        for (i, seg) in segments.iter().enumerate() {
            match node.children.get(seg.as_ref()) {
                Some(child) => node = child,
                None => break,
            }
            if node.claims > 0 {
                longest = Some(i + 1);
            }
        }
        longest
    }

    /// First claimed path strictly below `segments`, in lexical order.
    fn claimed_descendant<S: AsRef<str>>(&self, segments: &[S]) -> Option<Vec<String>> {
        let mut node = &self.root;
        for seg in segments {
            node = node.children.get(seg.as_ref())?;
        }
        let mut path: Vec<String> = segments.iter().map(|s| s.as_ref().to_owned()).collect();
        first_claim_below(node, &mut path).then_some(path)
    }

    fn find<S: AsRef<str>>(&self, segments: &[S], claimed_by: Claim) -> Option<Conflict> {
        if let Some(len) = self.claimed_prefix(segments) {
            let kind = if len == segments.len() {
                ConflictKind::Exact
            } else {
                ConflictKind::Ancestor
            };
            return Some(Conflict {
                path: join(&segments[..len]),
                claimed_by,
                kind,
            });
        }
        self.claimed_descendant(segments).map(|path| Conflict {
            path: path.join("."),
            claimed_by,
            kind: ConflictKind::Descendant,
        })
    }
}

fn release<S: AsRef<str>>(node: &mut Node, segments: &[S]) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        if node.claims == 0 {
            return false;
        }
        node.claims -= 1;
        return true;
    };
    let Some(child) = node.children.get_mut(head.as_ref()) else {
        return false;
    };
    let released = release(child, rest);
    let prune = child.claims == 0 && child.children.is_empty();
    if prune {
        node.children.remove(head.as_ref());
    }
    released
}

fn first_claim_below(node: &Node, path: &mut Vec<String>) -> bool {
    for (seg, child) in &node.children {
        path.push(seg.clone());
        if child.claims > 0 || first_claim_below(child, path) {
            return true;
        }
        path.pop();
    }
    false
}

fn join<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(".")
}

// ---------------------------------------------------------------------------
// ConflictTree
// ---------------------------------------------------------------------------

/// The modifier and branch claim trees of one store.
#[derive(Debug, Default)]
pub(crate) struct ConflictTree {
    modifiers: PathTrie,
    branches: PathTrie,
}

impl ConflictTree {
    /// A modifier may not touch a branch's subtree, nor sit above a branch.
    /// Modifiers never conflict with each other here.
    pub(crate) fn check_modifier<S: AsRef<str>>(&self, segments: &[S]) -> Result<(), Conflict> {
        match self.branches.find(segments, Claim::Branch) {
            Some(conflict) => Err(conflict),
            None => Ok(()),
        }
    }

    /// A branch may not overlap another branch or any modifier path.
    pub(crate) fn check_branch<S: AsRef<str>>(&self, segments: &[S]) -> Result<(), Conflict> {
        let conflict = self
            .branches
            .find(segments, Claim::Branch)
            .or_else(|| self.modifiers.find(segments, Claim::Modifier));
        match conflict {
            Some(conflict) => Err(conflict),
            None => Ok(()),
        }
    }

    pub(crate) fn claim_modifier<S: AsRef<str>>(&mut self, segments: &[S]) {
        self.modifiers.claim(segments);
    }

    pub(crate) fn release_modifier<S: AsRef<str>>(&mut self, segments: &[S]) -> bool {
        self.modifiers.release(segments)
    }

    pub(crate) fn claim_branch<S: AsRef<str>>(&mut self, segments: &[S]) {
        self.branches.claim(segments);
    }
}
