// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Virtual tree: the reconciler-owned component tree the event system reads.
//!
//! ## Overview
//!
//! A [`FiberTree`] is a generational arena of [`Fiber`] records. Each fiber has a
//! kind, an optional platform [`StateNode`], a `return` (parent) link, an optional
//! `alternate` (its counterpart in the other buffer), committed [`Props`], and
//! [`FiberFlags`].
//!
//! The event system never creates or mutates fibers during dispatch; it only
//! reads them. The mutating API here exists for the reconciler side (and tests).
//!
//! ## Reflection
//!
//! - [`FiberTree::nearest_mounted`] finds the closest ancestor that is committed.
//! - [`FiberTree::suspense_instance`] returns a boundary's dehydrated marker.
//! - [`FiberTree::root_container`] / [`FiberTree::portal_container`] return containers.

use ripple_dom::NodeId;

use crate::props::Props;

/// Identifier for a fiber.
///
/// Same generational semantics as [`ripple_dom::NodeId`]: a slot index plus a
/// generation that increments whenever the slot is reused.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FiberId(u32, u32);

impl FiberId {
    const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Kind of a virtual node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FiberKind {
    /// A user component without a platform node.
    FunctionComponent,
    /// Root of a mounted tree; its state node is the container.
    HostRoot,
    /// Portal into another container.
    HostPortal,
    /// A platform element.
    HostComponent,
    /// A platform text node.
    HostText,
    /// A suspense boundary, possibly still dehydrated.
    SuspenseComponent,
    /// A scope; can carry event handle listeners.
    ScopeComponent,
}

bitflags::bitflags! {
    /// Commit flags relevant to mount reflection.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FiberFlags: u8 {
        /// Inserted in the pending commit, not yet mounted.
        const PLACEMENT = 1 << 0;
        /// Being hydrated, not yet mounted.
        const HYDRATING = 1 << 1;
    }
}

/// The platform-side object a fiber owns.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StateNode {
    /// Nothing committed yet (or a kind without platform state).
    None,
    /// Element or text node.
    Host(NodeId),
    /// Root record.
    Root {
        /// Container the root renders into.
        container: NodeId,
        /// True while the root is still waiting for hydration.
        hydrate: bool,
    },
    /// Portal record.
    Portal {
        /// Container the portal renders into.
        container: NodeId,
    },
    /// Scope instance.
    Scope,
}

/// A virtual node.
#[derive(Clone, Debug)]
pub struct Fiber {
    /// Kind of node.
    pub kind: FiberKind,
    /// Tag name for host components, e.g. `"button"`.
    pub element_type: Option<String>,
    /// Owned platform state.
    pub state_node: StateNode,
    /// Committed props.
    pub props: Props,
    /// Commit flags.
    pub flags: FiberFlags,
    /// Start marker of a still-dehydrated suspense boundary.
    pub dehydrated: Option<NodeId>,
}

impl Fiber {
    fn with_kind(kind: FiberKind, state_node: StateNode) -> Self {
        Self {
            kind,
            element_type: None,
            state_node,
            props: Props::default(),
            flags: FiberFlags::empty(),
            dehydrated: None,
        }
    }

    /// Root rendering into `container`.
    pub fn host_root(container: NodeId) -> Self {
        Self::with_kind(
            FiberKind::HostRoot,
            StateNode::Root {
                container,
                hydrate: false,
            },
        )
    }

    /// Element `tag` owning `node`.
    pub fn host_component(tag: &str, node: NodeId, props: Props) -> Self {
        Self {
            element_type: Some(tag.to_ascii_lowercase()),
            props,
            ..Self::with_kind(FiberKind::HostComponent, StateNode::Host(node))
        }
    }

    /// Text owning `node`.
    pub fn host_text(node: NodeId) -> Self {
        Self::with_kind(FiberKind::HostText, StateNode::Host(node))
    }

    /// Portal into `container`.
    pub fn portal(container: NodeId) -> Self {
        Self::with_kind(FiberKind::HostPortal, StateNode::Portal { container })
    }

    /// Suspense boundary. Pass the start marker while the content is dehydrated.
    pub fn suspense(dehydrated: Option<NodeId>) -> Self {
        Self {
            dehydrated,
            ..Self::with_kind(FiberKind::SuspenseComponent, StateNode::None)
        }
    }

    /// Scope.
    pub fn scope() -> Self {
        Self::with_kind(FiberKind::ScopeComponent, StateNode::Scope)
    }

    /// Component without platform state.
    pub fn function() -> Self {
        Self::with_kind(FiberKind::FunctionComponent, StateNode::None)
    }

    /// Builder-style flags.
    pub fn with_flags(mut self, flags: FiberFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Platform node of a host component or text.
    pub fn host_node(&self) -> Option<NodeId> {
        match self.state_node {
            StateNode::Host(node) => Some(node),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    fiber: Fiber,
    parent: Option<FiberId>,
    children: Vec<FiberId>,
    alternate: Option<FiberId>,
}

/// Arena of virtual nodes.
#[derive(Default)]
pub struct FiberTree {
    slots: Vec<Option<Slot>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
}

impl core::fmt::Debug for FiberTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let alive = self.slots.iter().filter(|n| n.is_some()).count();
        f.debug_struct("FiberTree")
            .field("fibers_total", &self.slots.len())
            .field("fibers_alive", &alive)
            .field("free_list", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

impl FiberTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fiber as the last child of `parent` (or as a root if `None`).
    pub fn insert(&mut self, parent: Option<FiberId>, fiber: Fiber) -> FiberId {
        let slot = |generation| Slot {
            generation,
            fiber,
            parent: None,
            children: Vec::new(),
            alternate: None,
        };
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.slots[idx] = Some(slot(generation));
            (idx, generation)
        } else {
            let generation = 1_u32;
            self.slots.push(Some(slot(generation)));
            self.generations.push(generation);
            (self.slots.len() - 1, generation)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "FiberId uses 32-bit indices by design."
        )]
        let id = FiberId(idx as u32, generation);
        if let Some(p) = parent.filter(|p| self.is_alive(*p)) {
            if let Some(ps) = self.slot_mut(p) {
                ps.children.push(id);
            }
            if let Some(s) = self.slot_mut(id) {
                s.parent = Some(p);
            }
        }
        id
    }

    /// Remove a fiber and its subtree.
    pub fn remove(&mut self, id: FiberId) {
        let Some(slot) = self.slot(id) else {
            return;
        };
        let parent = slot.parent;
        let alternate = slot.alternate;
        let children = slot.children.clone();
        if let Some(ps) = parent.and_then(|p| self.slot_mut(p)) {
            ps.children.retain(|c| *c != id);
        }
        if let Some(alt) = alternate.and_then(|a| self.slot_mut(a)) {
            alt.alternate = None;
        }
        for child in children {
            self.remove(child);
        }
        self.slots[id.idx()] = None;
        self.free_list.push(id.idx());
    }

    /// Returns true if `id` refers to a live fiber.
    pub fn is_alive(&self, id: FiberId) -> bool {
        self.slot(id).is_some()
    }

    fn slot(&self, id: FiberId) -> Option<&Slot> {
        let s = self.slots.get(id.idx())?.as_ref()?;
        (s.generation == id.1).then_some(s)
    }

    fn slot_mut(&mut self, id: FiberId) -> Option<&mut Slot> {
        let s = self.slots.get_mut(id.idx())?.as_mut()?;
        if s.generation != id.1 {
            return None;
        }
        Some(s)
    }

    /// Borrow a fiber.
    pub fn get(&self, id: FiberId) -> Option<&Fiber> {
        self.slot(id).map(|s| &s.fiber)
    }

    /// Mutably borrow a fiber.
    pub fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber> {
        self.slot_mut(id).map(|s| &mut s.fiber)
    }

    /// Kind of a live fiber.
    pub fn kind(&self, id: FiberId) -> Option<FiberKind> {
        self.get(id).map(|f| f.kind)
    }

    /// The `return` link.
    pub fn parent(&self, id: FiberId) -> Option<FiberId> {
        self.slot(id)?.parent
    }

    /// Children in insertion order.
    pub fn children(&self, id: FiberId) -> &[FiberId] {
        self.slot(id).map(|s| s.children.as_slice()).unwrap_or(&[])
    }

    /// Counterpart in the other buffer.
    pub fn alternate(&self, id: FiberId) -> Option<FiberId> {
        self.slot(id)?.alternate
    }

    /// Pair two fibers as each other's alternate.
    pub fn set_alternate(&mut self, a: FiberId, b: FiberId) {
        if !self.is_alive(a) || !self.is_alive(b) {
            return;
        }
        if let Some(s) = self.slot_mut(a) {
            s.alternate = Some(b);
        }
        if let Some(s) = self.slot_mut(b) {
            s.alternate = Some(a);
        }
    }

    /// True if `a` is `b` or `b`'s alternate.
    pub fn same_or_alternate(&self, a: FiberId, b: FiberId) -> bool {
        a == b || self.alternate(b) == Some(a)
    }

    /// Platform node of a host component or text fiber.
    pub fn host_node(&self, id: FiberId) -> Option<NodeId> {
        self.get(id)?.host_node()
    }

    /// Container of a root fiber and whether it still awaits hydration.
    pub fn root_container(&self, id: FiberId) -> Option<(NodeId, bool)> {
        match self.get(id)?.state_node {
            StateNode::Root { container, hydrate } => Some((container, hydrate)),
            _ => None,
        }
    }

    /// Container of a portal fiber.
    pub fn portal_container(&self, id: FiberId) -> Option<NodeId> {
        match self.get(id)?.state_node {
            StateNode::Portal { container } => Some(container),
            _ => None,
        }
    }

    /// Container of a root or portal fiber.
    pub fn container_of(&self, id: FiberId) -> Option<NodeId> {
        self.root_container(id)
            .map(|(c, _)| c)
            .or_else(|| self.portal_container(id))
    }

    /// Dehydrated start marker of a suspense boundary.
    pub fn suspense_instance(&self, id: FiberId) -> Option<NodeId> {
        let fiber = self.get(id)?;
        if fiber.kind != FiberKind::SuspenseComponent {
            return None;
        }
        fiber.dehydrated
    }

    /// Closest ancestor-or-self that is committed, or `None` if the fiber is unmounted.
    ///
    /// Without an alternate, a fiber flagged [`FiberFlags::PLACEMENT`] or
    /// [`FiberFlags::HYDRATING`] is still being inserted, so its parent is the
    /// nearest mounted node. Either way the walk has to end at a [`FiberKind::HostRoot`].
    pub fn nearest_mounted(&self, id: FiberId) -> Option<FiberId> {
        let mut node = id;
        let mut nearest = Some(id);
        if self.alternate(id).is_none() {
            let pending = FiberFlags::PLACEMENT | FiberFlags::HYDRATING;
            loop {
                if self.get(node)?.flags.intersects(pending) {
                    nearest = self.parent(node);
                }
                match self.parent(node) {
                    Some(p) => node = p,
                    None => break,
                }
            }
        } else {
            while let Some(p) = self.parent(node) {
                node = p;
            }
        }
        if self.kind(node) == Some(FiberKind::HostRoot) {
            nearest
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_dom::Document;

    #[test]
    fn liveness_and_alternate_cleanup() {
        let mut doc = Document::new();
        let container = doc.append_element(doc.document(), "div");
        let mut tree = FiberTree::new();
        let root = tree.insert(None, Fiber::host_root(container));
        let a = tree.insert(Some(root), Fiber::function());
        let b = tree.insert(None, Fiber::function());
        tree.set_alternate(a, b);
        assert!(tree.same_or_alternate(b, a));
        tree.remove(a);
        assert!(!tree.is_alive(a));
        assert_eq!(tree.alternate(b), None);
        assert!(tree.children(root).is_empty());
    }

    #[test]
    fn nearest_mounted_skips_pending_placement() {
        let mut doc = Document::new();
        let container = doc.append_element(doc.document(), "div");
        let node = doc.append_element(container, "span");
        let mut tree = FiberTree::new();
        let root = tree.insert(None, Fiber::host_root(container));
        let parent = tree.insert(Some(root), Fiber::function());
        let placed = tree.insert(
            Some(parent),
            Fiber::host_component("span", node, Props::new()).with_flags(FiberFlags::PLACEMENT),
        );
        assert_eq!(tree.nearest_mounted(parent), Some(parent));
        assert_eq!(tree.nearest_mounted(placed), Some(parent));
    }

    #[test]
    fn detached_subtree_is_unmounted() {
        let mut tree = FiberTree::new();
        let orphan = tree.insert(None, Fiber::function());
        let child = tree.insert(Some(orphan), Fiber::function());
        assert_eq!(tree.nearest_mounted(child), None);
    }

    #[test]
    fn containers() {
        let mut doc = Document::new();
        let a = doc.append_element(doc.document(), "div");
        let b = doc.append_element(doc.document(), "div");
        let mut tree = FiberTree::new();
        let root = tree.insert(None, Fiber::host_root(a));
        let portal = tree.insert(Some(root), Fiber::portal(b));
        assert_eq!(tree.container_of(root), Some(a));
        assert_eq!(tree.container_of(portal), Some(b));
        assert_eq!(tree.root_container(root), Some((a, false)));
        let marker = doc.create_comment("$");
        let boundary = tree.insert(Some(root), Fiber::suspense(Some(marker)));
        assert_eq!(tree.suspense_instance(boundary), Some(marker));
        assert_eq!(tree.suspense_instance(root), None);
    }
}
