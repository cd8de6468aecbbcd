//! The AST context: the single owner of every node for one compilation
//! (§3, §4.A). All inter-node references are by [`NodeId`]; this type
//! provides id allocation, registration, replacement and ancestor lookup.
//!
//! A context is never shared across compilations (§5) — each compilation
//! constructs its own `AstContext` and hands it, by value or by mutable
//! reference, through the pass pipeline.

use std::collections::HashMap;

use crate::error::CoreError;

use super::node::{Node, NodeId, NodeKind};

/// Owner of every node in one compilation. Ids are monotonic within a
/// context and meaningless across contexts (§5).
#[derive(Debug, Default)]
pub struct AstContext {
    next_id: u32,
    nodes: HashMap<NodeId, Node>,
    /// Reverse index: child id -> parent id. Maintained by `register` and
    /// `replace_node`.
    parents: HashMap<NodeId, NodeId>,
    roots: Vec<NodeId>,
}

impl AstContext {
    pub fn new() -> Self {
        AstContext::default()
    }

    /// Allocate a fresh, never-before-used node id.
    pub fn reserve_id(&mut self) -> NodeId {
        let id = NodeId::from_raw(self.next_id);
        self.next_id += 1;
        id
    }

    /// Register `node` under `parent`. When `parent` is `None`, `node`
    /// becomes (or remains) a root of the compilation unit.
    pub fn register(&mut self, node: Node, parent: Option<NodeId>) -> NodeId {
        let id = node.id;
        if let Some(parent) = parent {
            self.parents.insert(id, parent);
        } else {
            self.roots.push(id);
        }
        self.nodes.insert(id, node);
        id
    }

    pub fn get(&self, id: NodeId) -> Result<&Node, CoreError> {
        self.nodes
            .get(&id)
            .ok_or_else(|| CoreError::assertion_failure(Some(id), "node id not registered"))
    }

    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, CoreError> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| CoreError::assertion_failure(Some(id), "node id not registered"))
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(&id).copied()
    }

    /// Direct children of `id`, in source order.
    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>, CoreError> {
        Ok(self.get(id)?.kind.child_ids())
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Every node reachable from a root, via a single depth-first walk.
    /// Nodes dropped by `replace_node` but still lingering under a stale
    /// parent pointer (e.g. a consumed assignment's LHS, see 4.F) are not
    /// reachable and so are excluded — exactly the set the pipeline
    /// driver's between-pass invariant checks (4.H) need to scan.
    pub fn reachable_ids(&self) -> Result<Vec<NodeId>, CoreError> {
        let mut seen = std::collections::HashSet::new();
        let mut order = Vec::new();
        let mut stack: Vec<NodeId> = self.roots.clone();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            stack.extend(self.children(id)?);
        }
        Ok(order)
    }

    /// Walk up from `start` (inclusive) looking for the nearest ancestor
    /// whose kind matches `predicate`. Returns `None` if no such ancestor
    /// exists, e.g. a free-standing expression with no enclosing contract.
    pub fn closest_ancestor(
        &self,
        start: NodeId,
        predicate: impl Fn(&NodeKind) -> bool,
    ) -> Option<NodeId> {
        let mut current = Some(start);
        while let Some(id) = current {
            if let Ok(node) = self.get(id) {
                if predicate(&node.kind) {
                    return Some(id);
                }
            }
            current = self.parent_of(id);
        }
        None
    }

    /// Recompute the `parents` index for every node reachable from `root`,
    /// as if `root` had just been registered fresh under its current
    /// parent. Used after splicing a subtree (possibly built or cloned
    /// outside the normal `register` path) into the tree, so every
    /// descendant's ancestry is consistent (§4.A: "new is fully registered
    /// under that parent; all descendants of new carry the correct
    /// context").
    pub fn set_context_recursive(&mut self, root: NodeId) -> Result<(), CoreError> {
        let children = self.children(root)?;
        for child in children {
            self.parents.insert(child, root);
            self.set_context_recursive(child)?;
        }
        Ok(())
    }

    /// Substitute `new` for `old` under `old`'s current parent (or
    /// `parent_override`, when the caller already knows it). `old` is
    /// dropped from the context; `new`'s subtree is re-parented via
    /// `set_context_recursive`.
    ///
    /// Failing to find a parent for `old` is a fatal bug (§4.A) — every
    /// node this core rewrites is reachable from a root, so a missing
    /// parent means the context was built or mutated incorrectly.
    pub fn replace_node(
        &mut self,
        old: NodeId,
        new: NodeId,
        parent_override: Option<NodeId>,
    ) -> Result<(), CoreError> {
        let parent = parent_override.or_else(|| self.parent_of(old));

        match parent {
            Some(parent_id) => {
                let parent_node = self.get_mut(parent_id)?;
                parent_node.kind.replace_child(old, new);
                self.parents.insert(new, parent_id);
            }
            None => {
                // `old` was a root; `new` takes its place as a root.
                if let Some(pos) = self.roots.iter().position(|r| *r == old) {
                    self.roots[pos] = new;
                } else {
                    return Err(CoreError::assertion_failure(
                        Some(old),
                        "replaceNode: no parent found for node being replaced",
                    ));
                }
            }
        }

        self.parents.remove(&old);
        self.nodes.remove(&old);
        self.set_context_recursive(new)?;

        Ok(())
    }

    /// Deep-clone the subtree rooted at `id`, assigning fresh ids to every
    /// node in the clone and registering the clone under `new_parent`.
    /// Used by the storage-access pass to splice a copy of a mapping
    /// variable's initialiser in place of a read (4.F, `visitIdentifier`).
    pub fn clone_subtree(
        &mut self,
        id: NodeId,
        new_parent: Option<NodeId>,
    ) -> Result<NodeId, CoreError> {
        let source = self.get(id)?.clone();
        let mut kind = source.kind.clone();

        let children = source.kind.child_ids();
        let mut clone_of = HashMap::new();
        for child in children {
            let cloned_child = self.clone_subtree(child, None)?;
            clone_of.insert(child, cloned_child);
        }
        for (old_child, new_child) in clone_of {
            kind.replace_child(old_child, new_child);
        }

        let new_id = self.reserve_id();
        let new_node = Node {
            id: new_id,
            src: source.src.clone(),
            kind,
            type_string: source.type_string.clone(),
        };
        Ok(self.register(new_node, new_parent))
    }
}
