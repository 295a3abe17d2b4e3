// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Listener accumulation: walk the virtual tree and collect handlers.
//!
//! ## Overview
//!
//! All walks start at a target fiber and follow `return` links. Only host
//! components contribute listeners, read from the committed props recorded in
//! the [`ComponentTree`].
//!
//! - [`accumulate_single_phase_listeners`] collects one phase bottom-up. Processing
//!   the list tail-to-head for capture and head-to-tail for bubble yields browser order.
//! - [`accumulate_two_phase_listeners`] collects capture handlers at the front and
//!   bubble handlers at the back of a single list.
//! - [`accumulate_enter_leave_two_phase_listeners`] builds the leave and enter entries of
//!   a pointer transition, stopping at the lowest common ancestor.
//!
//! ## Disabled elements
//!
//! Mouse handlers on a disabled `button`, `input`, `select`, or `textarea` are skipped.

use ripple_dom::{Document, NodeId};

use crate::component_tree::ComponentTree;
use crate::config::EventSystemConfig;
use crate::error::DispatchError;
use crate::fiber::{FiberId, FiberKind, FiberTree, StateNode};
use crate::props::{Listener, Props};
use crate::synthetic::SyntheticEvent;
use crate::types::{DispatchEntry, DispatchListener, DispatchQueue};

/// Read-only view of the trees a dispatch walks.
#[derive(Copy, Clone, Debug)]
pub(crate) struct TreeView<'a> {
    pub(crate) doc: &'a Document,
    pub(crate) fibers: &'a FiberTree,
    pub(crate) nodes: &'a ComponentTree,
    pub(crate) config: &'a EventSystemConfig,
}

impl TreeView<'_> {
    /// Platform node of a host component or text fiber.
    pub(crate) fn node_of(&self, fiber: FiberId) -> Option<NodeId> {
        self.fibers.host_node(fiber)
    }

    /// Committed props of a fiber's platform node.
    pub(crate) fn props_of(&self, fiber: FiberId) -> Option<&Props> {
        self.nodes.fiber_props(self.node_of(fiber)?)
    }
}

const MOUSE_HANDLERS: &[&str] = &[
    "onClick",
    "onClickCapture",
    "onDoubleClick",
    "onDoubleClickCapture",
    "onMouseDown",
    "onMouseDownCapture",
    "onMouseMove",
    "onMouseMoveCapture",
    "onMouseUp",
    "onMouseUpCapture",
    "onMouseEnter",
];

fn is_interactive(tag: &str) -> bool {
    matches!(tag, "button" | "input" | "select" | "textarea")
}

fn should_prevent_mouse_event(name: &str, tag: Option<&str>, props: &Props) -> bool {
    MOUSE_HANDLERS.contains(&name)
        && props.is_truthy("disabled")
        && tag.is_some_and(is_interactive)
}

/// Handler for `registration_name` on a host fiber, honoring disabled elements.
pub(crate) fn get_listener(
    view: &TreeView<'_>,
    inst: FiberId,
    registration_name: &str,
) -> Result<Option<Listener>, DispatchError> {
    let Some(props) = view.props_of(inst) else {
        return Ok(None);
    };
    let tag = view.fibers.get(inst).and_then(|f| f.element_type.as_deref());
    if should_prevent_mouse_event(registration_name, tag, props) {
        return Ok(None);
    }
    Ok(props.listener(registration_name)?.cloned())
}

fn host_component_node(fibers: &FiberTree, inst: FiberId) -> Option<NodeId> {
    let fiber = fibers.get(inst)?;
    match (fiber.kind, fiber.state_node) {
        (FiberKind::HostComponent, StateNode::Host(node)) => Some(node),
        _ => None,
    }
}

/// Collect handlers for one phase, bottom-up from `target`.
///
/// `react_name` is the bubble-phase handler name; the capture name is derived from it.
/// Event handle listeners are matched on `native_event_type` and the phase.
/// With `target_only`, only the target itself is inspected.
pub(crate) fn accumulate_single_phase_listeners(
    view: &TreeView<'_>,
    target: Option<FiberId>,
    react_name: Option<&str>,
    native_event_type: &str,
    in_capture_phase: bool,
    target_only: bool,
) -> Result<Vec<DispatchListener>, DispatchError> {
    let capture_name = react_name.map(|n| format!("{n}Capture"));
    let name = if in_capture_phase {
        capture_name.as_deref()
    } else {
        react_name
    };
    let mut listeners = Vec::new();
    let mut instance = target;
    let mut last_host: Option<NodeId> = None;

    while let Some(inst) = instance {
        let Some(kind) = view.fibers.kind(inst) else {
            break;
        };
        if let Some(node) = host_component_node(view.fibers, inst) {
            last_host = Some(node);
            if view.config.enable_event_handle_api {
                for h in view.nodes.handle_listeners(node) {
                    if h.event_type == native_event_type && h.capture == in_capture_phase {
                        listeners.push(DispatchListener {
                            instance: Some(inst),
                            listener: h.callback.clone(),
                            current_target: node,
                        });
                    }
                }
            }
            if let Some(name) = name {
                if let Some(listener) = get_listener(view, inst, name)? {
                    listeners.push(DispatchListener {
                        instance: Some(inst),
                        listener,
                        current_target: node,
                    });
                }
            }
        } else if kind == FiberKind::ScopeComponent
            && view.config.enable_event_handle_api
            && view.config.enable_scope_api
        {
            if let Some(host) = last_host {
                for h in view.nodes.scope_listeners(inst) {
                    if h.event_type == native_event_type && h.capture == in_capture_phase {
                        listeners.push(DispatchListener {
                            instance: Some(inst),
                            listener: h.callback.clone(),
                            current_target: host,
                        });
                    }
                }
            }
        }
        if target_only {
            break;
        }
        instance = view.fibers.parent(inst);
    }
    Ok(listeners)
}

/// Collect capture and bubble handlers into one list: capture at the front
/// (outermost first), bubble at the back (innermost first).
pub(crate) fn accumulate_two_phase_listeners(
    view: &TreeView<'_>,
    target: Option<FiberId>,
    react_name: &str,
) -> Result<Vec<DispatchListener>, DispatchError> {
    let capture_name = format!("{react_name}Capture");
    let mut listeners = Vec::new();
    let mut instance = target;
    while let Some(inst) = instance {
        if !view.fibers.is_alive(inst) {
            break;
        }
        if let Some(node) = host_component_node(view.fibers, inst) {
            if let Some(listener) = get_listener(view, inst, &capture_name)? {
                listeners.insert(
                    0,
                    DispatchListener {
                        instance: Some(inst),
                        listener,
                        current_target: node,
                    },
                );
            }
            if let Some(listener) = get_listener(view, inst, react_name)? {
                listeners.push(DispatchListener {
                    instance: Some(inst),
                    listener,
                    current_target: node,
                });
            }
        }
        instance = view.fibers.parent(inst);
    }
    Ok(listeners)
}

/// Nearest host-component ancestor.
fn host_parent(fibers: &FiberTree, inst: FiberId) -> Option<FiberId> {
    let mut cur = fibers.parent(inst);
    while let Some(f) = cur {
        if fibers.kind(f) == Some(FiberKind::HostComponent) {
            return Some(f);
        }
        cur = fibers.parent(f);
    }
    None
}

/// Lowest common host ancestor of `a` and `b` (either may be the answer).
///
/// Fibers are matched against each other's alternates so that a walk
/// crossing buffers still meets.
pub(crate) fn lowest_common_ancestor(
    fibers: &FiberTree,
    a: FiberId,
    b: FiberId,
) -> Option<FiberId> {
    let depth = |start: FiberId| {
        let mut d = 0_usize;
        let mut cur = Some(start);
        while let Some(f) = cur {
            d += 1;
            cur = host_parent(fibers, f);
        }
        d
    };
    let mut depth_a = depth(a);
    let mut depth_b = depth(b);
    let mut node_a = Some(a);
    let mut node_b = Some(b);
    while depth_a > depth_b {
        node_a = node_a.and_then(|n| host_parent(fibers, n));
        depth_a -= 1;
    }
    while depth_b > depth_a {
        node_b = node_b.and_then(|n| host_parent(fibers, n));
        depth_b -= 1;
    }
    for _ in 0..depth_a {
        let (Some(na), Some(nb)) = (node_a, node_b) else {
            return None;
        };
        if fibers.same_or_alternate(na, nb) {
            return Some(na);
        }
        node_a = host_parent(fibers, na);
        node_b = host_parent(fibers, nb);
    }
    None
}

fn accumulate_enter_leave_listeners_for_event(
    view: &TreeView<'_>,
    registration_name: &str,
    target: FiberId,
    common: Option<FiberId>,
    in_capture_phase: bool,
) -> Result<Vec<DispatchListener>, DispatchError> {
    let mut listeners = Vec::new();
    let mut instance = Some(target);
    while let Some(inst) = instance {
        if Some(inst) == common {
            break;
        }
        let alternate = view.fibers.alternate(inst);
        if alternate.is_some() && alternate == common {
            break;
        }
        if let Some(node) = host_component_node(view.fibers, inst) {
            if let Some(listener) = get_listener(view, inst, registration_name)? {
                let entry = DispatchListener {
                    instance: Some(inst),
                    listener,
                    current_target: node,
                };
                if in_capture_phase {
                    listeners.insert(0, entry);
                } else {
                    listeners.push(entry);
                }
            }
        }
        instance = view.fibers.parent(inst);
    }
    Ok(listeners)
}

/// Append the leave entry (walked from `from`, bubble-ordered) and the enter entry
/// (walked from `to`, capture-ordered), both stopping below their common ancestor.
pub(crate) fn accumulate_enter_leave_two_phase_listeners(
    view: &TreeView<'_>,
    queue: &mut DispatchQueue,
    leave_event: SyntheticEvent,
    enter_event: Option<SyntheticEvent>,
    from: Option<FiberId>,
    to: Option<FiberId>,
) -> Result<(), DispatchError> {
    let common = match (from, to) {
        (Some(f), Some(t)) => lowest_common_ancestor(view.fibers, f, t),
        _ => None,
    };
    if let Some(from) = from {
        let name = leave_event.react_name().unwrap_or_default().to_owned();
        let listeners = accumulate_enter_leave_listeners_for_event(view, &name, from, common, false)?;
        if !listeners.is_empty() {
            queue.push(DispatchEntry {
                event: leave_event,
                listeners,
            });
        }
    }
    if let (Some(to), Some(enter_event)) = (to, enter_event) {
        let name = enter_event.react_name().unwrap_or_default().to_owned();
        let listeners = accumulate_enter_leave_listeners_for_event(view, &name, to, common, true)?;
        if !listeners.is_empty() {
            queue.push(DispatchEntry {
                event: enter_event,
                listeners,
            });
        }
    }
    Ok(())
}

/// Handle listeners bound directly to a node the tree does not manage.
pub(crate) fn accumulate_event_handle_non_managed_node_listeners(
    view: &TreeView<'_>,
    native_event_type: &str,
    current_target: NodeId,
    in_capture_phase: bool,
) -> Vec<DispatchListener> {
    view.nodes
        .handle_listeners(current_target)
        .iter()
        .filter(|h| h.event_type == native_event_type && h.capture == in_capture_phase)
        .map(|h| DispatchListener {
            instance: None,
            listener: h.callback.clone(),
            current_target,
        })
        .collect()
}
