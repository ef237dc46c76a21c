//! Node tree (arena-based allocation)
//!
//! Every node lives in a slot of the arena. A parent owns its children: the
//! children form a ring and the parent keeps the oldest one as the ring
//! anchor. Freed slots are recycled with a bumped generation so stale
//! handles fail to resolve instead of aliasing a newer node.

use crate::generation::Generation;
use crate::node::{ClosingKind, Node, NodeKind};
use crate::ring::{self, RingLink, RingStore};
use crate::NodeId;

/// Result type for tree operations
pub type TreeResult<T> = Result<T, TreeError>;

/// Tree operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Handle does not designate a live node
    #[error("stale node handle")]
    StaleHandle,
    /// Target parent cannot own children
    #[error("node kind cannot hold children")]
    NotAContainer,
    /// Move would create a cycle or give a document a parent
    #[error("hierarchy request error")]
    HierarchyRequest,
}

#[derive(Debug, Default)]
struct Slot {
    generation: Generation,
    node: Option<Node>,
}

#[derive(Debug, Default)]
struct Slots(Vec<Slot>);

impl Slots {
    fn node(&self, index: u32) -> &Node {
        self.0[index as usize]
            .node
            .as_ref()
            .expect("structural link to a freed slot")
    }

    fn node_mut(&mut self, index: u32) -> &mut Node {
        self.0[index as usize]
            .node
            .as_mut()
            .expect("structural link to a freed slot")
    }
}

impl RingStore<u32> for Slots {
    fn link(&self, key: u32) -> &RingLink<u32> {
        &self.node(key).ring
    }

    fn link_mut(&mut self, key: u32) -> &mut RingLink<u32> {
        &mut self.node_mut(key).ring
    }
}

/// Arena of document nodes
#[derive(Debug, Default)]
pub struct Tree {
    slots: Slots,
    free: Vec<u32>,
    live: usize,
}

impl Tree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new unattached node
    pub fn create(&mut self, kind: NodeKind, value: impl Into<String>, line: usize) -> NodeId {
        let value = value.into();
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.0.push(Slot::default());
                (self.slots.0.len() - 1) as u32
            }
        };
        let slot = &mut self.slots.0[index as usize];
        slot.node = Some(Node::new(index, kind, value, line));
        self.live += 1;
        NodeId {
            index,
            generation: slot.generation,
        }
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if the tree holds no node
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Check if a handle designates a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.resolve(id).is_ok()
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let index = self.resolve(id).ok()?;
        Some(self.slots.node(index))
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let index = self.resolve(id).ok()?;
        Some(self.slots.node_mut(index))
    }

    /// Parent of a node, `None` for roots and unattached nodes
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let index = self.resolve(id).ok()?;
        self.slots.node(index).parent.map(|p| self.handle(p))
    }

    /// Oldest attached child
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        let index = self.resolve(id).ok()?;
        self.slots.node(index).first_child.map(|c| self.handle(c))
    }

    /// Newest attached child
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        let index = self.resolve(id).ok()?;
        let anchor = self.slots.node(index).first_child?;
        Some(self.handle(ring::prev(&self.slots, anchor)))
    }

    /// Next sibling, `None` at the end of the parent's children
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let index = self.resolve(id).ok()?;
        self.next_index(index).map(|n| self.handle(n))
    }

    /// Previous sibling, `None` for the first child
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let index = self.resolve(id).ok()?;
        let parent = self.slots.node(index).parent?;
        if self.slots.node(parent).first_child == Some(index) {
            return None;
        }
        Some(self.handle(ring::prev(&self.slots, index)))
    }

    /// Iterate over the children of a node in insertion order
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self
                .resolve(id)
                .ok()
                .and_then(|index| self.slots.node(index).first_child),
        }
    }

    /// Number of children of a node
    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    /// Check if `ancestor` is a strict ancestor of `id`
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        match (self.resolve(ancestor), self.resolve(id)) {
            (Ok(ancestor), Ok(index)) => self.is_ancestor_index(ancestor, index),
            _ => false,
        }
    }

    /// Attach a node to a new parent, or detach it with `None`
    ///
    /// The node is appended after the current children of the new parent.
    /// Nothing changes when the parent is the same, including `None` for an
    /// already unattached node. All checks run before the first mutation.
    pub fn reparent(&mut self, id: NodeId, new_parent: Option<NodeId>) -> TreeResult<()> {
        let index = self.resolve(id)?;
        let target = new_parent.map(|p| self.resolve(p)).transpose()?;

        if self.slots.node(index).parent == target {
            return Ok(());
        }
        if let Some(target) = target {
            if !self.slots.node(target).kind().can_hold_children() {
                return Err(TreeError::NotAContainer);
            }
            if self.slots.node(index).kind() == NodeKind::Document
                || target == index
                || self.is_ancestor_index(index, target)
            {
                return Err(TreeError::HierarchyRequest);
            }
            match self.slots.node(index).kind() {
                // End tags only close elements, they are never children
                NodeKind::Element(ClosingKind::Close) => {
                    return Err(TreeError::HierarchyRequest);
                }
                NodeKind::Declaration if !self.accepts_declaration(target) => {
                    return Err(TreeError::HierarchyRequest);
                }
                _ => {}
            }
        }

        self.unlink(index);
        if let Some(target) = target {
            self.link(index, target);
        }
        Ok(())
    }

    /// Detach a node from its parent, keeping its subtree
    pub fn detach(&mut self, id: NodeId) -> TreeResult<()> {
        self.reparent(id, None)
    }

    /// Destroy a node and its whole subtree
    ///
    /// Returns the number of freed nodes.
    pub fn remove(&mut self, id: NodeId) -> TreeResult<usize> {
        let index = self.resolve(id)?;
        Ok(self.destroy(index))
    }

    /// Destroy all children of a node
    ///
    /// Returns the number of freed nodes.
    pub fn clear_children(&mut self, id: NodeId) -> TreeResult<usize> {
        let index = self.resolve(id)?;
        let mut freed = 0;
        while let Some(child) = self.slots.node(index).first_child {
            freed += self.destroy(child);
        }
        Ok(freed)
    }

    /// Destroy all children and reset the value and line of a node
    pub fn clear(&mut self, id: NodeId) -> TreeResult<usize> {
        let freed = self.clear_children(id)?;
        self.slots.node_mut(id.index).clear();
        Ok(freed)
    }

    fn resolve(&self, id: NodeId) -> TreeResult<u32> {
        match self.slots.0.get(id.index as usize) {
            Some(slot) if slot.generation == id.generation && slot.node.is_some() => Ok(id.index),
            _ => Err(TreeError::StaleHandle),
        }
    }

    fn handle(&self, index: u32) -> NodeId {
        NodeId {
            index,
            generation: self.slots.0[index as usize].generation,
        }
    }

    fn next_index(&self, index: u32) -> Option<u32> {
        let node = self.slots.node(index);
        let next = node.ring.next();
        let anchor = node.parent.and_then(|p| self.slots.node(p).first_child);
        (next != index && Some(next) != anchor).then_some(next)
    }

    fn is_ancestor_index(&self, ancestor: u32, index: u32) -> bool {
        let mut cur = self.slots.node(index).parent;
        while let Some(parent) = cur {
            if parent == ancestor {
                return true;
            }
            cur = self.slots.node(parent).parent;
        }
        false
    }

    fn unlink(&mut self, index: u32) {
        let Some(parent) = self.slots.node(index).parent else {
            return;
        };
        // The anchor moves to the next child, or away if we were alone
        if self.slots.node(parent).first_child == Some(index) {
            let next = (!ring::is_alone(&self.slots, index)).then(|| ring::next(&self.slots, index));
            self.slots.node_mut(parent).first_child = next;
        }
        ring::remove(&mut self.slots, index);
        self.slots.node_mut(index).parent = None;
    }

    fn link(&mut self, index: u32, parent: u32) {
        self.slots.node_mut(index).parent = Some(parent);
        match self.slots.node(parent).first_child {
            None => self.slots.node_mut(parent).first_child = Some(index),
            Some(anchor) => ring::insert_before(&mut self.slots, index, anchor),
        }
    }

    /// Declarations may only be appended to a document that holds nothing else
    fn accepts_declaration(&self, target: u32) -> bool {
        let node = self.slots.node(target);
        if node.kind() != NodeKind::Document {
            return false;
        }
        let mut cur = node.first_child;
        while let Some(child) = cur {
            if !self.slots.node(child).is_declaration() {
                return false;
            }
            cur = self.next_index(child);
        }
        true
    }

    fn destroy(&mut self, index: u32) -> usize {
        // Only the top node leaves a ring; everything below goes with it
        self.unlink(index);

        let mut pending = vec![index];
        let mut freed = 0;
        while let Some(current) = pending.pop() {
            let mut child = self.slots.node(current).first_child;
            while let Some(next) = child {
                pending.push(next);
                child = self.next_index(next);
            }
            self.release(current);
            freed += 1;
        }
        freed
    }

    fn release(&mut self, index: u32) {
        let slot = &mut self.slots.0[index as usize];
        slot.node = None;
        slot.generation = slot.generation.next();
        self.free.push(index);
        self.live -= 1;
    }
}

/// Iterator over the children of a node
pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<u32>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let index = self.next?;
        self.next = self.tree.next_index(index);
        Some(self.tree.handle(index))
    }
}
