// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Native listener attachment.
//!
//! ## Overview
//!
//! The system owns every native listener it registers with the [`Document`]. Each
//! registration gets a fresh [`ListenerHandle`] whose [`RootListener`] record says
//! which event it was attached for, on which node, and with which
//! [`EventSystemFlags`]. [`EventSystem::deliver`] maps handles found on a propagation
//! path back to these records.
//!
//! Attachment is cached per node through listener-set keys
//! (`"{event}__bubble"` / `"{event}__capture"`), so asking twice never registers
//! twice. Listeners are only removed when their node or container is torn down.
//!
//! ## Placement
//!
//! - Root containers get one capture and one bubble listener for every known event,
//!   except that non-delegated events only get the capture listener there.
//! - Non-delegated events are attached on the element that needs them, as it is
//!   committed.
//! - `selectionchange` only fires on the document, so it is attached there.
//! - `touchstart`, `touchmove`, and `wheel` are passive where the platform supports it.

use std::collections::{BTreeSet, HashMap};

use ripple_dom::{Document, ListenerHandle, ListenerOptions, NodeId};

use crate::component_tree::EventHandleListener;
use crate::dispatch::EventSystem;
use crate::error::DispatchError;
use crate::fiber::FiberId;
use crate::props::Listener;
use crate::registry::{MEDIA_EVENT_TYPES, is_non_delegated};
use crate::scheduler::UpdateScheduler;
use crate::types::{EventSystemFlags, listener_set_key};

/// Handles below this value are left to the host.
const FIRST_HANDLE: u64 = 1 << 32;

/// What a native listener does when it fires.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum ListenerKind {
    /// Dispatch through the plugin system.
    Dispatch,
    /// The change polyfill's `propertychange` watcher.
    PropertyChange,
}

/// A native listener registered by the system.
#[derive(Clone, Debug)]
pub(crate) struct RootListener {
    /// Node the listener is registered on. Also the dispatch container.
    pub(crate) target: NodeId,
    /// Root container that asked for it.
    pub(crate) owner: NodeId,
    pub(crate) dom_event_name: String,
    pub(crate) flags: EventSystemFlags,
    pub(crate) capture: bool,
    pub(crate) kind: ListenerKind,
}

/// Handle allocation and lookup.
#[derive(Debug)]
pub(crate) struct NativeListeners {
    next_handle: u64,
    by_handle: HashMap<ListenerHandle, RootListener>,
}

impl Default for NativeListeners {
    fn default() -> Self {
        Self {
            next_handle: FIRST_HANDLE,
            by_handle: HashMap::new(),
        }
    }
}

impl NativeListeners {
    fn insert(&mut self, listener: RootListener) -> ListenerHandle {
        let handle = ListenerHandle(self.next_handle);
        self.next_handle += 1;
        self.by_handle.insert(handle, listener);
        handle
    }

    pub(crate) fn get(&self, handle: ListenerHandle) -> Option<&RootListener> {
        self.by_handle.get(&handle)
    }

    pub(crate) fn len(&self) -> usize {
        self.by_handle.len()
    }

    fn take_where(
        &mut self,
        mut pred: impl FnMut(&RootListener) -> bool,
    ) -> Vec<(ListenerHandle, RootListener)> {
        let handles: Vec<ListenerHandle> = self
            .by_handle
            .iter()
            .filter(|(_, l)| pred(l))
            .map(|(h, _)| *h)
            .collect();
        handles
            .into_iter()
            .filter_map(|h| self.by_handle.remove(&h).map(|l| (h, l)))
            .collect()
    }

    fn targets(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.by_handle.values().map(|l| l.target)
    }

    fn owners(&self) -> BTreeSet<NodeId> {
        self.by_handle
            .values()
            .filter(|l| l.kind == ListenerKind::Dispatch)
            .map(|l| l.owner)
            .collect()
    }
}

/// Where an event handle listener is bound.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HandleTarget {
    /// An element, or the window or document node.
    Node(NodeId),
    /// A scope fiber.
    Scope(FiberId),
}

/// Non-delegated events an element of `tag` listens to from the moment it is committed.
fn element_events(tag: &str) -> &'static [&'static str] {
    match tag {
        "dialog" => &["cancel", "close"],
        "iframe" | "object" | "embed" => &["load"],
        "video" | "audio" => MEDIA_EVENT_TYPES,
        "source" => &["error"],
        "img" | "image" | "link" => &["error", "load"],
        "details" => &["toggle"],
        "input" | "select" | "textarea" => &["invalid"],
        _ => &[],
    }
}

impl<S: UpdateScheduler> EventSystem<S> {
    /// Attach the delegated listeners for every known event to `container`.
    ///
    /// Runs once per container; later calls do nothing.
    pub fn listen_to_all_supported_events(&mut self, doc: &mut Document, container: NodeId) {
        if !self.nodes.mark_listening(container) {
            return;
        }
        let names: Vec<String> = self.registry.all_native_events().map(str::to_owned).collect();
        for name in &names {
            if !is_non_delegated(name) {
                self.listen_to_native_event(doc, name, false, container, None, EventSystemFlags::empty());
            }
            self.listen_to_native_event(doc, name, true, container, None, EventSystemFlags::empty());
        }
        tracing::debug!(?container, events = names.len(), "listening to all supported events");
    }

    /// Attach one native listener for `dom_event_name` on behalf of `container`.
    ///
    /// With a `target_element`, the bubble listener of a non-delegated event goes on
    /// that element; only `scroll` is attached this way, the others are left to
    /// [`listen_to_non_delegated_event`](Self::listen_to_non_delegated_event).
    pub fn listen_to_native_event(
        &mut self,
        doc: &mut Document,
        dom_event_name: &str,
        is_capture_phase_listener: bool,
        container: NodeId,
        target_element: Option<NodeId>,
        flags: EventSystemFlags,
    ) {
        let mut flags = flags;
        let mut target = container;
        if dom_event_name == "selectionchange" && !doc.is_document(container) {
            target = doc.document();
        }
        if let Some(element) = target_element
            && !is_capture_phase_listener
            && is_non_delegated(dom_event_name)
        {
            if dom_event_name != "scroll" {
                return;
            }
            flags |= EventSystemFlags::IS_NON_DELEGATED;
            target = element;
        }
        self.trap_once(doc, container, target, dom_event_name, flags, is_capture_phase_listener);
    }

    /// Attach a bubble listener for a non-delegated event on the element itself.
    pub fn listen_to_non_delegated_event(
        &mut self,
        doc: &mut Document,
        dom_event_name: &str,
        element: NodeId,
    ) {
        self.trap_once(
            doc,
            element,
            element,
            dom_event_name,
            EventSystemFlags::IS_NON_DELEGATED,
            false,
        );
    }

    /// Listeners a committed element needs on itself.
    pub(crate) fn listen_to_element_events(&mut self, doc: &mut Document, element: NodeId) {
        let Some(tag) = doc.tag_name(element).map(str::to_owned) else {
            return;
        };
        for name in element_events(&tag) {
            self.listen_to_non_delegated_event(doc, name, element);
        }
        if self
            .nodes
            .fiber_props(element)
            .is_some_and(|props| props.has("onScroll"))
        {
            self.listen_to_non_delegated_event(doc, "scroll", element);
        }
    }

    fn trap_once(
        &mut self,
        doc: &mut Document,
        owner: NodeId,
        target: NodeId,
        dom_event_name: &str,
        flags: EventSystemFlags,
        capture: bool,
    ) {
        let key = listener_set_key(dom_event_name, capture);
        if self.nodes.has_listener_key(target, &key) {
            return;
        }
        let flags = if capture {
            flags | EventSystemFlags::IS_CAPTURE_PHASE
        } else {
            flags
        };
        self.add_trapped_event_listener(
            doc,
            RootListener {
                target,
                owner,
                dom_event_name: dom_event_name.to_owned(),
                flags,
                capture,
                kind: ListenerKind::Dispatch,
            },
        );
        self.nodes.insert_listener_key(target, key);
    }

    fn add_trapped_event_listener(&mut self, doc: &mut Document, listener: RootListener) {
        // Blocking listeners on these would disable the platform's scroll optimizations.
        let passive = (self.config.features.passive_listeners
            && matches!(
                listener.dom_event_name.as_str(),
                "touchstart" | "touchmove" | "wheel"
            ))
        .then_some(true);
        let options = ListenerOptions {
            capture: listener.capture,
            passive,
        };
        let target = listener.target;
        let name = listener.dom_event_name.clone();
        let handle = self.native_listeners.insert(listener);
        doc.add_event_listener(target, &name, options, handle);
        tracing::trace!(?target, event = %name, capture = options.capture, "native listener attached");
    }

    /// Remove every native listener matching `pred` from the document and the caches.
    pub(crate) fn remove_listeners_where(
        &mut self,
        doc: &mut Document,
        pred: impl FnMut(&RootListener) -> bool,
    ) -> usize {
        let removed = self.native_listeners.take_where(pred);
        for (handle, l) in &removed {
            doc.remove_event_listener(l.target, &l.dom_event_name, l.capture, *handle);
            if l.kind == ListenerKind::Dispatch {
                self.nodes
                    .remove_listener_key(l.target, &listener_set_key(&l.dom_event_name, l.capture));
            }
        }
        removed.len()
    }

    /// Start the change polyfill's `propertychange` watcher on `node`.
    pub(crate) fn watch_property_change(&mut self, doc: &mut Document, node: NodeId) {
        self.add_trapped_event_listener(
            doc,
            RootListener {
                target: node,
                owner: node,
                dom_event_name: "propertychange".to_owned(),
                flags: EventSystemFlags::empty(),
                capture: false,
                kind: ListenerKind::PropertyChange,
            },
        );
    }

    pub(crate) fn unwatch_property_change(&mut self, doc: &mut Document, node: NodeId) {
        self.remove_listeners_where(doc, |l| {
            l.target == node && l.kind == ListenerKind::PropertyChange
        });
    }

    /// Bind `callback` to `event_type` through the event handle API.
    ///
    /// Elements keep the listener in their record and are reached through normal
    /// delegated dispatch. The window and the document are not managed by any root,
    /// so they get a native listener of their own. Scopes collect the listener for
    /// every dispatch that passes through them.
    pub fn add_event_handle_listener(
        &mut self,
        doc: &mut Document,
        target: HandleTarget,
        event_type: &str,
        capture: bool,
        callback: Listener,
    ) -> Result<(), DispatchError> {
        if !self.registry.all_native_events().any(|e| e == event_type) {
            return Err(DispatchError::UnknownEvent {
                event_type: event_type.to_owned(),
            });
        }
        let listener = EventHandleListener {
            event_type: event_type.to_owned(),
            capture,
            callback,
        };
        match target {
            HandleTarget::Scope(scope) => self.nodes.add_scope_listener(scope, listener),
            HandleTarget::Node(node) if doc.tag_name(node).is_some() => {
                self.nodes.add_handle_listener(node, listener);
                if is_non_delegated(event_type) {
                    self.trap_once(
                        doc,
                        node,
                        node,
                        event_type,
                        EventSystemFlags::IS_NON_DELEGATED,
                        capture,
                    );
                }
            }
            HandleTarget::Node(node) if node == doc.window() || doc.is_document(node) => {
                self.nodes.add_handle_listener(node, listener);
                self.trap_once(
                    doc,
                    node,
                    node,
                    event_type,
                    EventSystemFlags::IS_EVENT_HANDLE_NON_MANAGED_NODE,
                    capture,
                );
            }
            HandleTarget::Node(_) => return Err(DispatchError::InvalidEventHandleTarget),
        }
        Ok(())
    }

    /// Undo [`listen_to_all_supported_events`](Self::listen_to_all_supported_events).
    ///
    /// Removes the listeners attached for `container` and inside it, its marker and
    /// caches, and every queued replay record that targets it. The document-level
    /// `selectionchange` listener moves to another listening container if one is left.
    pub fn teardown_container(&mut self, doc: &mut Document, container: NodeId) {
        let inside: BTreeSet<NodeId> = self
            .native_listeners
            .targets()
            .filter(|t| doc.contains(container, *t))
            .collect();
        let removed = self.remove_listeners_where(doc, |l| {
            l.owner == container || inside.contains(&l.target)
        });
        self.nodes.clear_listener_keys(container);
        self.nodes.unmark_listening(container);
        self.replay.remove_container(container);

        let document = doc.document();
        if let Some(next_owner) = self.native_listeners.owners().into_iter().next()
            && !self
                .nodes
                .has_listener_key(document, &listener_set_key("selectionchange", false))
        {
            self.listen_to_native_event(
                doc,
                "selectionchange",
                false,
                next_owner,
                None,
                EventSystemFlags::empty(),
            );
            self.listen_to_native_event(
                doc,
                "selectionchange",
                true,
                next_owner,
                None,
                EventSystemFlags::empty(),
            );
        }
        tracing::debug!(?container, removed, "container torn down");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use ripple_dom::{Document, NativeEvent, PlatformFeatures};

    use super::*;
    use crate::dispatch::harness::*;
    use crate::props::{Props, listener};
    use crate::scheduler::NoopScheduler;

    fn harness() -> Harness<NoopScheduler> {
        Harness::with_system(Document::new(), EventSystem::for_document)
    }

    #[test]
    fn root_gets_one_capture_and_one_bubble_listener() {
        let mut h = harness();
        let container = h.container;
        let root = h.root;
        h.system.attach_root(&mut h.doc, &h.fibers, root);
        h.system.listen_to_all_supported_events(&mut h.doc, container);

        assert_eq!(h.doc.listener_count(container, "click", false), 1);
        assert_eq!(h.doc.listener_count(container, "click", true), 1);
        assert_eq!(h.doc.listener_count(container, "keydown", false), 1);
        // Non-delegated: capture only at the root.
        assert_eq!(h.doc.listener_count(container, "scroll", false), 0);
        assert_eq!(h.doc.listener_count(container, "scroll", true), 1);
        assert_eq!(h.doc.listener_count(container, "load", false), 0);
        // Redirected to the document.
        assert_eq!(h.doc.listener_count(container, "selectionchange", false), 0);
        let document = h.doc.document();
        assert_eq!(h.doc.listener_count(document, "selectionchange", false), 1);
        assert_eq!(h.doc.listener_count(document, "selectionchange", true), 1);
    }

    #[test]
    fn scroll_blocking_events_are_passive_when_supported() {
        let h = harness();
        let passive = |doc: &Document, name: &str| {
            doc.listeners(h.container)
                .iter()
                .find(|l| l.event_type == name && !l.capture)
                .and_then(|l| l.passive)
        };
        assert_eq!(passive(&h.doc, "touchstart"), Some(true));
        assert_eq!(passive(&h.doc, "wheel"), Some(true));
        assert_eq!(passive(&h.doc, "click"), None);

        let legacy = Harness::with_system(
            Document::with_features(PlatformFeatures::legacy(10)),
            EventSystem::for_document,
        );
        let touch = legacy
            .doc
            .listeners(legacy.container)
            .iter()
            .find(|l| l.event_type == "touchstart")
            .and_then(|l| l.passive);
        assert_eq!(touch, None);
    }

    #[test]
    fn committed_media_and_images_listen_on_themselves() {
        let loads = Rc::new(RefCell::new(0_u32));
        let mut h = harness();
        let root = h.root;
        let counter = loads.clone();
        let img = h.host(
            root,
            "img",
            Props::new().on("onLoad", move |_| {
                *counter.borrow_mut() += 1;
                Ok(())
            }),
        );
        let video = h.host(root, "video", Props::new());
        let img_node = h.node(img);
        let video_node = h.node(video);
        assert_eq!(h.doc.listener_count(img_node, "load", false), 1);
        assert_eq!(h.doc.listener_count(img_node, "error", false), 1);
        assert_eq!(h.doc.listener_count(video_node, "timeupdate", false), 1);

        h.system
            .deliver(&mut h.doc, &h.fibers, NativeEvent::new("load", Some(img_node)))
            .unwrap();
        assert_eq!(*loads.borrow(), 1);
    }

    #[test]
    fn scroll_handler_attaches_on_element() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut h = harness();
        let root = h.root;
        let outer = h.host(root, "div", Props::new().with("onScroll", logger(&log, "outer")));
        let inner = h.host(outer, "div", Props::new().with("onScroll", logger(&log, "inner")));
        let inner_node = h.node(inner);
        assert_eq!(h.doc.listener_count(inner_node, "scroll", false), 1);

        // Scroll does not bubble: only the scrolled element's handler runs.
        h.system
            .deliver(&mut h.doc, &h.fibers, NativeEvent::new("scroll", Some(inner_node)))
            .unwrap();
        assert_eq!(*log.borrow(), vec!["inner:scroll"]);
    }

    #[test]
    fn window_event_handle_gets_its_own_native_listener() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut h = harness();
        let window = h.doc.window();
        h.system
            .add_event_handle_listener(
                &mut h.doc,
                HandleTarget::Node(window),
                "click",
                false,
                logger(&log, "window"),
            )
            .unwrap();
        // Registering a second handle does not attach a second native listener.
        h.system
            .add_event_handle_listener(
                &mut h.doc,
                HandleTarget::Node(window),
                "click",
                false,
                logger(&log, "again"),
            )
            .unwrap();
        assert_eq!(h.doc.listener_count(window, "click", false), 1);

        h.system
            .deliver(&mut h.doc, &h.fibers, NativeEvent::new("click", None))
            .unwrap();
        assert_eq!(*log.borrow(), vec!["window:click", "again:click"]);
    }

    #[test]
    fn event_handle_rejects_unknown_events_and_text_nodes() {
        let mut h = harness();
        let window = h.doc.window();
        let err = h
            .system
            .add_event_handle_listener(
                &mut h.doc,
                HandleTarget::Node(window),
                "not-an-event",
                false,
                listener(|_| Ok(())),
            )
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnknownEvent { ref event_type } if event_type == "not-an-event"));

        let text = h.doc.create_text_node("x");
        let err = h
            .system
            .add_event_handle_listener(
                &mut h.doc,
                HandleTarget::Node(text),
                "click",
                false,
                listener(|_| Ok(())),
            )
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidEventHandleTarget));
    }

    #[test]
    fn element_event_handle_runs_with_props() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut h = harness();
        let root = h.root;
        let button = h.host(root, "button", Props::new().with("onClick", logger(&log, "prop")));
        let node = h.node(button);
        h.system
            .add_event_handle_listener(
                &mut h.doc,
                HandleTarget::Node(node),
                "click",
                false,
                logger(&log, "handle"),
            )
            .unwrap();
        h.system
            .deliver(&mut h.doc, &h.fibers, NativeEvent::new("click", Some(node)))
            .unwrap();
        assert_eq!(log.borrow().len(), 2);
        assert!(log.borrow().contains(&"handle:click".to_owned()));
    }

    #[test]
    fn teardown_removes_listeners_and_allows_reattach() {
        let mut h = harness();
        let container = h.container;
        let root = h.root;
        let img = h.host(root, "img", Props::new());
        let img_node = h.node(img);
        let document = h.doc.document();

        h.system.teardown_container(&mut h.doc, container);
        assert!(h.doc.listeners(container).is_empty());
        assert!(h.doc.listeners(img_node).is_empty());
        assert_eq!(h.doc.listener_count(document, "selectionchange", false), 0);
        assert!(!h.system.component_tree().is_listening(container));

        h.system.attach_root(&mut h.doc, &h.fibers, root);
        assert_eq!(h.doc.listener_count(container, "click", true), 1);
        assert_eq!(h.doc.listener_count(document, "selectionchange", false), 1);
    }

    #[test]
    fn selectionchange_survives_teardown_of_one_root() {
        let mut h = harness();
        let first = h.container;
        let second = h.doc.append_element(h.doc.document(), "div");
        h.system.listen_to_all_supported_events(&mut h.doc, second);
        let document = h.doc.document();
        assert_eq!(h.doc.listener_count(document, "selectionchange", false), 1);

        h.system.teardown_container(&mut h.doc, first);
        assert_eq!(h.doc.listener_count(document, "selectionchange", false), 1);
        assert_eq!(h.doc.listener_count(document, "selectionchange", true), 1);
        assert_eq!(h.doc.listener_count(second, "click", false), 1);
    }
}
