// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Side table from platform nodes to their virtual-tree records.
//!
//! ## Overview
//!
//! Every platform node the runtime produces has at most one record here:
//! its owning fiber, its committed props, the native listener keys already
//! attached to it, and any listeners bound through the event handle API.
//! Containers additionally carry a root marker pointing at their host root.
//!
//! Records are inserted when the reconciler commits a node and removed with
//! [`ComponentTree::detach`] when it unmounts.

use std::collections::{HashMap, HashSet};

use ripple_dom::{Document, NodeId};

use crate::fiber::{FiberId, FiberKind, FiberTree};
use crate::props::{Listener, Props};

/// A listener registered through the event handle API.
#[derive(Clone)]
pub struct EventHandleListener {
    /// Native event type the listener is bound to.
    pub event_type: String,
    /// Capture-phase binding.
    pub capture: bool,
    /// The handler.
    pub callback: Listener,
}

impl core::fmt::Debug for EventHandleListener {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventHandleListener")
            .field("event_type", &self.event_type)
            .field("capture", &self.capture)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct NodeRecord {
    instance: Option<FiberId>,
    container_root: Option<FiberId>,
    props: Option<Props>,
    listener_set: HashSet<String>,
    handle_listeners: Vec<EventHandleListener>,
    listening: bool,
}

/// Platform-node index.
#[derive(Debug, Default)]
pub struct ComponentTree {
    records: HashMap<NodeId, NodeRecord>,
    scope_listeners: HashMap<FiberId, Vec<EventHandleListener>>,
}

const SUSPENSE_START: &str = "$";
const SUSPENSE_PENDING_START: &str = "$?";
const SUSPENSE_FALLBACK_START: &str = "$!";
const SUSPENSE_END: &str = "/$";

impl ComponentTree {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, node: NodeId) -> Option<&NodeRecord> {
        self.records.get(&node)
    }

    fn record_mut(&mut self, node: NodeId) -> &mut NodeRecord {
        self.records.entry(node).or_default()
    }

    /// Record `fiber` as the owner of `node`.
    pub fn precache_fiber_node(&mut self, fiber: FiberId, node: NodeId) {
        self.record_mut(node).instance = Some(fiber);
    }

    /// Replace the committed props of `node`.
    pub fn update_fiber_props(&mut self, node: NodeId, props: Props) {
        self.record_mut(node).props = Some(props);
    }

    /// Precache a host fiber and copy its props, as a commit does.
    ///
    /// Suspense fibers are keyed by their dehydrated marker. Returns the platform
    /// node that was recorded, if any.
    pub fn commit(&mut self, fibers: &FiberTree, fiber: FiberId) -> Option<NodeId> {
        let f = fibers.get(fiber)?;
        let node = match f.kind {
            FiberKind::SuspenseComponent => f.dehydrated?,
            _ => f.host_node()?,
        };
        let props = f.props.clone();
        self.precache_fiber_node(fiber, node);
        self.update_fiber_props(node, props);
        Some(node)
    }

    /// Mark `container` as the container of `root`.
    pub fn mark_container_as_root(&mut self, root: FiberId, container: NodeId) {
        self.record_mut(container).container_root = Some(root);
    }

    /// Remove the root marker from `container`.
    pub fn unmark_container_as_root(&mut self, container: NodeId) {
        if let Some(r) = self.records.get_mut(&container) {
            r.container_root = None;
        }
    }

    /// True if `node` is a container marked as a root.
    pub fn is_container_marked_as_root(&self, node: NodeId) -> bool {
        self.record(node).is_some_and(|r| r.container_root.is_some())
    }

    /// Drop every record for `node`.
    pub fn detach(&mut self, node: NodeId) {
        self.records.remove(&node);
    }

    /// Drop the handle listeners bound to a scope.
    pub fn detach_scope(&mut self, scope: FiberId) {
        self.scope_listeners.remove(&scope);
    }

    /// Closest owning fiber for `target`, walking platform ancestors.
    ///
    /// On `target` itself only its own instance counts. On ancestors a root marker
    /// also counts. If the hit fiber has children, `target` may sit inside dehydrated
    /// suspense content, in which case the boundary fiber recorded on the nearest
    /// preceding start marker is returned instead.
    pub fn closest_instance(
        &self,
        doc: &Document,
        fibers: &FiberTree,
        target: NodeId,
    ) -> Option<FiberId> {
        if let Some(inst) = self.record(target).and_then(|r| r.instance) {
            return Some(inst);
        }
        let mut target = target;
        let mut parent = doc.parent(target);
        while let Some(p) = parent {
            let inst = self
                .record(p)
                .and_then(|r| r.container_root.or(r.instance));
            if let Some(inst) = inst {
                let has_children = !fibers.children(inst).is_empty()
                    || fibers
                        .alternate(inst)
                        .is_some_and(|alt| !fibers.children(alt).is_empty());
                if has_children {
                    let mut marker = parent_suspense_instance(doc, target);
                    while let Some(m) = marker {
                        if let Some(boundary) = self.record(m).and_then(|r| r.instance) {
                            return Some(boundary);
                        }
                        marker = parent_suspense_instance(doc, m);
                    }
                }
                return Some(inst);
            }
            target = p;
            parent = doc.parent(p);
        }
        None
    }

    /// The fiber recorded directly on `node`, restricted to host, text, suspense and root kinds.
    pub fn instance_from_node(&self, fibers: &FiberTree, node: NodeId) -> Option<FiberId> {
        let r = self.record(node)?;
        let inst = r.instance.or(r.container_root)?;
        match fibers.kind(inst)? {
            FiberKind::HostComponent
            | FiberKind::HostText
            | FiberKind::SuspenseComponent
            | FiberKind::HostRoot => Some(inst),
            _ => None,
        }
    }

    /// Platform node of a host component or text fiber, if it is still indexed here.
    pub fn node_from_instance(&self, fibers: &FiberTree, fiber: FiberId) -> Option<NodeId> {
        let node = fibers.host_node(fiber)?;
        self.records.contains_key(&node).then_some(node)
    }

    /// Committed props recorded for `node`.
    pub fn fiber_props(&self, node: NodeId) -> Option<&Props> {
        self.record(node)?.props.as_ref()
    }

    /// True if the native listener keyed by `key` is already attached to `node`.
    pub fn has_listener_key(&self, node: NodeId, key: &str) -> bool {
        self.record(node).is_some_and(|r| r.listener_set.contains(key))
    }

    /// Record that the native listener keyed by `key` is attached to `node`.
    pub fn insert_listener_key(&mut self, node: NodeId, key: String) -> bool {
        self.record_mut(node).listener_set.insert(key)
    }

    /// Forget one attached listener key of `node`.
    pub fn remove_listener_key(&mut self, node: NodeId, key: &str) -> bool {
        self.records
            .get_mut(&node)
            .is_some_and(|r| r.listener_set.remove(key))
    }

    /// Attached listener keys of `node`.
    pub fn listener_keys(&self, node: NodeId) -> impl Iterator<Item = &str> + '_ {
        self.record(node)
            .into_iter()
            .flat_map(|r| r.listener_set.iter().map(String::as_str))
    }

    /// Clear the listener-set cache of `node`.
    pub fn clear_listener_keys(&mut self, node: NodeId) {
        if let Some(r) = self.records.get_mut(&node) {
            r.listener_set.clear();
        }
    }

    /// Set the one-time "all events attached" marker. Returns false if it was already set.
    pub fn mark_listening(&mut self, container: NodeId) -> bool {
        let r = self.record_mut(container);
        !core::mem::replace(&mut r.listening, true)
    }

    /// Clear the "all events attached" marker.
    pub fn unmark_listening(&mut self, container: NodeId) {
        if let Some(r) = self.records.get_mut(&container) {
            r.listening = false;
        }
    }

    /// True once [`mark_listening`](Self::mark_listening) ran for `container`.
    pub fn is_listening(&self, container: NodeId) -> bool {
        self.record(container).is_some_and(|r| r.listening)
    }

    /// Bind an event handle listener to a platform node.
    pub fn add_handle_listener(&mut self, node: NodeId, listener: EventHandleListener) {
        self.record_mut(node).handle_listeners.push(listener);
    }

    /// Event handle listeners bound to a platform node.
    pub fn handle_listeners(&self, node: NodeId) -> &[EventHandleListener] {
        self.record(node)
            .map(|r| r.handle_listeners.as_slice())
            .unwrap_or(&[])
    }

    /// Bind an event handle listener to a scope.
    pub fn add_scope_listener(&mut self, scope: FiberId, listener: EventHandleListener) {
        self.scope_listeners.entry(scope).or_default().push(listener);
    }

    /// Event handle listeners bound to a scope.
    pub fn scope_listeners(&self, scope: FiberId) -> &[EventHandleListener] {
        self.scope_listeners
            .get(&scope)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Nearest preceding dehydrated-boundary start marker among `target`'s previous siblings.
fn parent_suspense_instance(doc: &Document, target: NodeId) -> Option<NodeId> {
    let mut node = doc.previous_sibling(target);
    let mut depth = 0_u32;
    while let Some(n) = node {
        if doc.is_comment(n) {
            match doc.data(n) {
                Some(SUSPENSE_START | SUSPENSE_PENDING_START | SUSPENSE_FALLBACK_START) => {
                    if depth == 0 {
                        return Some(n);
                    }
                    depth -= 1;
                }
                Some(SUSPENSE_END) => depth += 1,
                _ => {}
            }
        }
        node = doc.previous_sibling(n);
    }
    None
}
