// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Controlled form controls: restore platform values from committed props.
//!
//! ## Overview
//!
//! While handlers run, the platform value of a controlled `input`, `textarea`, or
//! `select` may drift from what the application rendered (the user typed, the
//! handler did not update state, and the renderer skipped the element).
//! The change plugin marks such targets with [`RestoreQueue::enqueue`]. When the
//! outermost batch ends, every marked element is reset from its committed props.

use ripple_dom::{Document, NodeId};

use crate::component_tree::ComponentTree;
use crate::fiber::FiberTree;
use crate::props::{PropValue, Props};
use crate::value_tracking::ValueTrackers;

/// Elements awaiting state restoration, in the order they were marked.
#[derive(Debug, Default)]
pub struct RestoreQueue {
    target: Option<NodeId>,
    queue: Vec<NodeId>,
}

impl RestoreQueue {
    /// Mark `node` for restoration at the end of the batch.
    pub fn enqueue(&mut self, node: NodeId) {
        if self.target.is_some() {
            self.queue.push(node);
        } else {
            self.target = Some(node);
        }
    }

    /// True if any element is marked.
    pub fn needs_restore(&self) -> bool {
        self.target.is_some()
    }

    /// Take every marked element, first-marked first.
    pub fn take(&mut self) -> Vec<NodeId> {
        let Some(target) = self.target.take() else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(1 + self.queue.len());
        out.push(target);
        out.append(&mut self.queue);
        out
    }

    /// Keep only the marked elements for which `keep` returns true.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(NodeId) -> bool) {
        let mut all = self.take();
        all.retain(|n| keep(*n));
        for n in all {
            self.enqueue(n);
        }
    }
}

fn bool_prop(props: &Props, name: &str) -> Option<bool> {
    match props.get(name)? {
        PropValue::Bool(b) => Some(*b),
        PropValue::Null => None,
        _ => Some(props.is_truthy(name)),
    }
}

fn write_value(doc: &mut Document, trackers: &mut ValueTrackers, node: NodeId, value: &str) {
    if doc.value(node) != Some(value) {
        doc.set_value(node, value);
    }
    trackers.set_tracked_value(node, value);
}

fn write_checked(doc: &mut Document, trackers: &mut ValueTrackers, node: NodeId, checked: bool) {
    doc.set_checked(node, checked);
    if matches!(doc.input_type(node).as_deref(), Some("checkbox" | "radio")) {
        trackers.set_tracked_value(node, if checked { "true" } else { "false" });
    }
}

fn restore_input(doc: &mut Document, trackers: &mut ValueTrackers, node: NodeId, props: &Props) {
    if let Some(checked) = bool_prop(props, "checked") {
        write_checked(doc, trackers, node, checked);
    }
    if let Some(value) = props.get("value").and_then(PropValue::to_platform_string) {
        write_value(doc, trackers, node, &value);
    }
}

/// Nearest `form` ancestor of `node`.
fn owning_form(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut current = doc.parent(node);
    while let Some(n) = current {
        if doc.is_element_named(n, "form") {
            return Some(n);
        }
        current = doc.parent(n);
    }
    None
}

/// Other radios sharing `node`'s group: same name, same owning form, under the
/// same top-level ancestor.
fn named_cousins(doc: &Document, node: NodeId) -> Vec<NodeId> {
    let Some(name) = doc.attribute(node, "name").map(str::to_owned) else {
        return Vec::new();
    };
    let form = owning_form(doc, node);
    let mut top = node;
    while let Some(p) = doc.parent(top) {
        top = p;
    }
    let mut out = Vec::new();
    let mut stack = vec![top];
    while let Some(n) = stack.pop() {
        if n != node
            && doc.input_type(n).as_deref() == Some("radio")
            && doc.attribute(n, "name") == Some(name.as_str())
            && owning_form(doc, n) == form
        {
            out.push(n);
        }
        stack.extend(doc.children(n).iter().rev().copied());
    }
    out
}

/// Reset the platform state of one element from its committed props.
pub(crate) fn restore_state_of_target(
    doc: &mut Document,
    fibers: &FiberTree,
    nodes: &ComponentTree,
    trackers: &mut ValueTrackers,
    node: NodeId,
) {
    if nodes.instance_from_node(fibers, node).is_none() {
        // Unmounted while the batch ran.
        return;
    }
    let Some(props) = nodes.fiber_props(node) else {
        return;
    };
    match doc.tag_name(node) {
        Some("input") => {
            restore_input(doc, trackers, node, props);
            if doc.input_type(node).as_deref() == Some("radio") {
                for cousin in named_cousins(doc, node) {
                    let Some(cousin_props) = nodes.fiber_props(cousin) else {
                        continue;
                    };
                    trackers.update_value_if_changed(doc, cousin);
                    restore_input(doc, trackers, cousin, cousin_props);
                }
            }
        }
        Some("textarea" | "select") => {
            if let Some(value) = props.get("value").and_then(PropValue::to_platform_string) {
                write_value(doc, trackers, node, &value);
            }
        }
        _ => {}
    }
    tracing::trace!(?node, "restored controlled state");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiber::Fiber;

    #[test]
    fn queue_preserves_order() {
        let mut doc = Document::new();
        let a = doc.create_element("input");
        let b = doc.create_element("input");
        let c = doc.create_element("input");
        let mut q = RestoreQueue::default();
        assert!(!q.needs_restore());
        q.enqueue(a);
        q.enqueue(b);
        q.enqueue(c);
        assert!(q.needs_restore());
        assert_eq!(q.take(), vec![a, b, c]);
        assert!(!q.needs_restore());
        assert!(q.take().is_empty());
    }

    #[test]
    fn restores_text_value_and_tracker() {
        let mut doc = Document::new();
        let container = doc.append_element(doc.document(), "div");
        let input = doc.append_element(container, "input");
        let mut fibers = FiberTree::new();
        let root = fibers.insert(None, Fiber::host_root(container));
        let f = fibers.insert(
            Some(root),
            Fiber::host_component("input", input, Props::new().with("value", "committed")),
        );
        let mut nodes = ComponentTree::new();
        nodes.commit(&fibers, f);
        let mut trackers = ValueTrackers::new();
        doc.set_value(input, "committed");
        trackers.track(&doc, input);

        doc.set_value(input, "typed");
        restore_state_of_target(&mut doc, &fibers, &nodes, &mut trackers, input);
        assert_eq!(doc.value(input), Some("committed"));
        assert!(!trackers.update_value_if_changed(&doc, input));
    }

    #[test]
    fn restores_radio_group() {
        let mut doc = Document::new();
        let container = doc.append_element(doc.document(), "div");
        let mut fibers = FiberTree::new();
        let root = fibers.insert(None, Fiber::host_root(container));
        let mut nodes = ComponentTree::new();
        let mut radios = Vec::new();
        for checked in [true, false] {
            let r = doc.append_element(container, "input");
            doc.set_attribute(r, "type", "radio");
            doc.set_attribute(r, "name", "g");
            doc.set_checked(r, checked);
            let f = fibers.insert(
                Some(root),
                Fiber::host_component("input", r, Props::new().with("checked", checked)),
            );
            nodes.commit(&fibers, f);
            radios.push(r);
        }
        let mut trackers = ValueTrackers::new();
        // The user clicked the second radio; the platform moved the selection.
        doc.set_checked(radios[0], false);
        doc.set_checked(radios[1], true);
        restore_state_of_target(&mut doc, &fibers, &nodes, &mut trackers, radios[1]);
        assert!(doc.checked(radios[0]));
        assert!(!doc.checked(radios[1]));
    }

    #[test]
    fn radio_group_is_scoped_to_its_form() {
        let mut doc = Document::new();
        let container = doc.append_element(doc.document(), "div");
        let mut fibers = FiberTree::new();
        let root = fibers.insert(None, Fiber::host_root(container));
        let mut nodes = ComponentTree::new();
        let mut radio = |doc: &mut Document, form: NodeId, checked: bool| {
            let r = doc.append_element(form, "input");
            doc.set_attribute(r, "type", "radio");
            doc.set_attribute(r, "name", "g");
            doc.set_checked(r, checked);
            let f = fibers.insert(
                Some(root),
                Fiber::host_component("input", r, Props::new().with("checked", checked)),
            );
            nodes.commit(&fibers, f);
            r
        };
        let first_form = doc.append_element(container, "form");
        let second_form = doc.append_element(container, "form");
        let a = radio(&mut doc, first_form, true);
        let b = radio(&mut doc, first_form, false);
        let other = radio(&mut doc, second_form, false);
        let mut trackers = ValueTrackers::new();

        // Same name, different forms: the platform keeps two independent groups.
        doc.set_checked(a, false);
        doc.set_checked(b, true);
        doc.set_checked(other, true);
        restore_state_of_target(&mut doc, &fibers, &nodes, &mut trackers, b);
        assert!(doc.checked(a));
        assert!(!doc.checked(b));
        assert!(doc.checked(other), "a radio in another form is not part of the group");
    }
}
