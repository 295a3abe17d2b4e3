// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Value tracking for form controls.
//!
//! A tracker remembers the last value the runtime observed or wrote for an
//! element, so the change plugin only fires when the user actually changed it.
//! Checkable inputs track `"true"`/`"false"` for their checked state.

use std::collections::HashMap;

use ripple_dom::{Document, NodeId};

fn is_checkable(doc: &Document, node: NodeId) -> bool {
    matches!(doc.input_type(node).as_deref(), Some("checkbox" | "radio"))
}

fn value_from_node(doc: &Document, node: NodeId) -> String {
    if is_checkable(doc, node) {
        doc.checked(node).to_string()
    } else {
        doc.value(node).unwrap_or_default().to_owned()
    }
}

/// Last observed values, per element.
#[derive(Debug, Default)]
pub struct ValueTrackers {
    values: HashMap<NodeId, String>,
}

impl ValueTrackers {
    /// Create an empty tracker set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `node` with its current value. Tracking twice keeps the first value.
    pub fn track(&mut self, doc: &Document, node: NodeId) {
        self.values
            .entry(node)
            .or_insert_with(|| value_from_node(doc, node));
    }

    /// Stop tracking `node`.
    pub fn untrack(&mut self, node: NodeId) {
        self.values.remove(&node);
    }

    /// True if `node` is tracked.
    pub fn is_tracked(&self, node: NodeId) -> bool {
        self.values.contains_key(&node)
    }

    /// Last tracked value.
    pub fn tracked_value(&self, node: NodeId) -> Option<&str> {
        self.values.get(&node).map(String::as_str)
    }

    /// Record a value the runtime wrote itself, so it does not count as a user change.
    pub fn set_tracked_value(&mut self, node: NodeId, value: &str) {
        if let Some(v) = self.values.get_mut(&node) {
            value.clone_into(v);
        }
    }

    /// Compare the live value against the tracked one and record it.
    ///
    /// Untracked nodes always report a change.
    pub fn update_value_if_changed(&mut self, doc: &Document, node: NodeId) -> bool {
        let Some(last) = self.values.get_mut(&node) else {
            return true;
        };
        let next = value_from_node(doc, node);
        if *last != next {
            *last = next;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_value_changes_once() {
        let mut doc = Document::new();
        let input = doc.append_element(doc.document(), "input");
        let mut trackers = ValueTrackers::new();
        trackers.track(&doc, input);
        assert!(!trackers.update_value_if_changed(&doc, input));
        doc.set_value(input, "a");
        assert!(trackers.update_value_if_changed(&doc, input));
        assert!(!trackers.update_value_if_changed(&doc, input));
    }

    #[test]
    fn checkbox_tracks_checked() {
        let mut doc = Document::new();
        let cb = doc.append_element(doc.document(), "input");
        doc.set_attribute(cb, "type", "checkbox");
        let mut trackers = ValueTrackers::new();
        trackers.track(&doc, cb);
        assert_eq!(trackers.tracked_value(cb), Some("false"));
        doc.set_checked(cb, true);
        assert!(trackers.update_value_if_changed(&doc, cb));
        assert_eq!(trackers.tracked_value(cb), Some("true"));
    }

    #[test]
    fn programmatic_writes_are_not_changes() {
        let mut doc = Document::new();
        let input = doc.append_element(doc.document(), "input");
        let mut trackers = ValueTrackers::new();
        trackers.track(&doc, input);
        doc.set_value(input, "x");
        trackers.set_tracked_value(input, "x");
        assert!(!trackers.update_value_if_changed(&doc, input));
    }

    #[test]
    fn untracked_always_changes() {
        let mut doc = Document::new();
        let input = doc.append_element(doc.document(), "input");
        let mut trackers = ValueTrackers::new();
        assert!(trackers.update_value_if_changed(&doc, input));
        trackers.track(&doc, input);
        trackers.untrack(input);
        assert!(!trackers.is_tracked(input));
    }
}
