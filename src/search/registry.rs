// src/search/registry.rs
// =============================================================================
// The set of pages discovered during one search.
//
// Pages live in an arena (a Vec) and point at their parent by index instead of
// by reference. The title index maps each title to its slot. A page is
// created the first time its title shows up as a link target and is never
// changed afterwards, so the first parent recorded for a title is the one
// that sticks.
//
// Rust concepts:
// - Newtype: NodeId wraps a usize so it can't be mixed up with other numbers
// - Option<T>: discover() returns None for titles we already have
// =============================================================================

use std::collections::HashMap;

/// Stable handle to a page inside a PageRegistry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct PageNode {
    pub title: String,
    /// Page this one was first reached from; None only for the start page
    pub parent: Option<NodeId>,
}

#[derive(Debug, Default)]
pub struct PageRegistry {
    nodes: Vec<PageNode>,
    by_title: HashMap<String, NodeId>,
}

impl PageRegistry {
    /// A registry holding only the start page
    pub fn with_root(title: &str) -> (Self, NodeId) {
        let mut registry = Self::default();
        let root = registry.push(title.to_string(), None);
        (registry, root)
    }

    /// Records `title` as reached from `parent`
    ///
    /// Returns the new node, or None when the title was already known
    /// (its original parent is kept).
    pub fn discover(&mut self, title: &str, parent: NodeId) -> Option<NodeId> {
        // Seen before (in this round or an earlier one): leave it alone
        if self.by_title.contains_key(title) {
            return None;
        }
        Some(self.push(title.to_string(), Some(parent)))
    }

    pub fn lookup(&self, title: &str) -> Option<NodeId> {
        self.by_title.get(title).copied()
    }

    pub fn get(&self, id: NodeId) -> &PageNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    fn push(&mut self, title: String, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.by_title.insert(title.clone(), id);
        self.nodes.push(PageNode { title, parent });
        id
    }
}
