//! Online resolution of forward references between streamed elements.
//!
//! Elements can reference ids that have not been created yet: a node names
//! its group, an edge names both endpoints. [`DependencyResolver`] parks
//! such elements under the first missing id and hands them back once that
//! id is created.
//!
//! This is deliberately not a topological sort. The stream is consumed
//! online, so a dependency cycle is only detected when it is about to be
//! entered; the element that would close the cycle is handed back to the
//! caller for direct creation instead of being parked.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use log::{debug, warn};

use trellis_core::{
    element::{EdgeElement, NodeElement},
    identifier::Id,
    span::Span,
};

/// An element waiting for another element to be created.
#[derive(Debug, Clone, PartialEq)]
pub enum Pending {
    Node(NodeElement),
    Edge(EdgeElement),
}

impl Pending {
    /// The id other elements may depend on. Edges have none.
    pub fn id(&self) -> Option<Id> {
        match self {
            Self::Node(node) => Some(node.id()),
            Self::Edge(_) => None,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Node(node) => node.span(),
            Self::Edge(edge) => edge.span(),
        }
    }
}

/// Adjacency map from a missing id to the elements waiting for it.
#[derive(Debug, Default)]
pub struct DependencyResolver {
    waiting: IndexMap<Id, Vec<Pending>>,
    /// Pending element id to the id it is parked under.
    blocked_on: HashMap<Id, Id>,
    resolving: HashSet<Id>,
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks `pending` until `missing` is created.
    ///
    /// # Errors
    ///
    /// Returns `pending` back when parking it would close a dependency
    /// cycle: `missing` is the element itself, `missing` is being resolved
    /// right now, or `missing` is itself parked behind `pending`. The caller
    /// should create the element directly.
    pub fn defer(&mut self, missing: Id, pending: Pending) -> Result<(), Pending> {
        if self.would_cycle(missing, pending.id()) {
            warn!(missing:% = missing; "Dependency cycle detected, creating element directly");
            return Err(pending);
        }

        debug!(missing:% = missing; "Deferring element until its dependency exists");
        if let Some(id) = pending.id() {
            self.blocked_on.insert(id, missing);
        }
        self.waiting.entry(missing).or_default().push(pending);
        Ok(())
    }

    /// Releases everything parked under `id`, in the order it was parked.
    pub fn ready(&mut self, id: Id) -> Vec<Pending> {
        let released = self.waiting.shift_remove(&id).unwrap_or_default();
        for pending in &released {
            if let Some(pending_id) = pending.id() {
                self.blocked_on.remove(&pending_id);
            }
        }
        released
    }

    /// Marks `id` as being resolved. Returns `false` if it already was.
    pub fn begin(&mut self, id: Id) -> bool {
        self.resolving.insert(id)
    }

    pub fn end(&mut self, id: Id) {
        self.resolving.remove(&id);
    }

    pub fn is_resolving(&self, id: Id) -> bool {
        self.resolving.contains(&id)
    }

    /// Whether `id` is parked waiting for something.
    pub fn is_blocked(&self, id: Id) -> bool {
        self.blocked_on.contains_key(&id)
    }

    /// Removes and returns everything still parked, in parking order.
    pub fn drain(&mut self) -> Vec<Pending> {
        self.blocked_on.clear();
        self.waiting.drain(..).flat_map(|(_, pending)| pending).collect()
    }

    /// Number of parked elements.
    pub fn len(&self) -> usize {
        self.waiting.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    fn would_cycle(&self, missing: Id, pending_id: Option<Id>) -> bool {
        if self.resolving.contains(&missing) {
            return true;
        }
        let Some(pending_id) = pending_id else {
            return false;
        };

        // Walk the chain of parked ids starting at `missing`.
        let mut seen = HashSet::new();
        let mut current = missing;
        loop {
            if current == pending_id {
                return true;
            }
            if !seen.insert(current) {
                return false;
            }
            match self.blocked_on.get(&current) {
                Some(&next) => current = next,
                None => return false,
            }
        }
    }
}
