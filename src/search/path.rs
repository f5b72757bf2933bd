// src/search/path.rs
// Walks parent links back to the start page.

use super::registry::{NodeId, PageRegistry};

// Titles from `node` up to the start page: target first, root last
//
// Callers wanting start-to-target order reverse the result themselves.
pub fn reconstruct(registry: &PageRegistry, node: NodeId) -> Vec<String> {
    let mut path = Vec::new();
    let mut current = Some(node);

    while let Some(id) = current {
        let page = registry.get(id);
        path.push(page.title.clone());
        current = page.parent;
    }

    path
}
