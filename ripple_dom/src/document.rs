// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core document implementation: structure, form state, focus, and listener bookkeeping.

use std::collections::BTreeMap;

use crate::types::{
    ListenerHandle, ListenerOptions, NodeId, NodeKind, PlatformFeatures, PropagationStep,
    RegisteredListener, TextRange, WindowSelection,
};

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// An in-memory host document.
///
/// Owns every platform node, including the window and the document node itself.
/// Nodes are created detached and become connected once appended under the
/// [document node](Self::document).
pub struct Document {
    nodes: Vec<Option<Node>>, // slots
    generations: Vec<u32>,    // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    window: NodeId,
    document: NodeId,
    active_element: Option<NodeId>,
    selection: Option<WindowSelection>,
    features: PlatformFeatures,
}

impl core::fmt::Debug for Document {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("Document")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &self.free_list.len())
            .field("active_element", &self.active_element)
            .field("features", &self.features)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
struct Node {
    generation: u32,
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: BTreeMap<String, String>,
    // Text and comment data.
    data: String,
    value: String,
    checked: bool,
    selection: Option<TextRange>,
    listeners: Vec<RegisteredListener>,
}

impl Node {
    fn new(generation: u32, kind: NodeKind) -> Self {
        Self {
            generation,
            kind,
            parent: None,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            data: String::new(),
            value: String::new(),
            checked: false,
            selection: None,
            listeners: Vec::new(),
        }
    }
}

impl Document {
    /// Create an empty document with default (modern) platform features.
    pub fn new() -> Self {
        Self::with_features(PlatformFeatures::default())
    }

    /// Create an empty document reporting the given platform features.
    pub fn with_features(features: PlatformFeatures) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            window: NodeId::new(0, 0),
            document: NodeId::new(0, 0),
            active_element: None,
            selection: None,
            features,
        };
        doc.window = doc.alloc(NodeKind::Window);
        doc.document = doc.alloc(NodeKind::Document);
        doc
    }

    /// The window node.
    pub fn window(&self) -> NodeId {
        self.window
    }

    /// The document node.
    pub fn document(&self) -> NodeId {
        self.document
    }

    /// Feature-detection results for this platform.
    pub fn features(&self) -> PlatformFeatures {
        self.features
    }

    /// Create a detached element. Tag names are stored lowercase.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(tag.to_ascii_lowercase()))
    }

    /// Create a detached text node.
    pub fn create_text_node(&mut self, text: &str) -> NodeId {
        let id = self.alloc(NodeKind::Text);
        if let Some(n) = self.node_opt_mut(id) {
            n.data = text.to_owned();
        }
        id
    }

    /// Create a detached comment node.
    pub fn create_comment(&mut self, data: &str) -> NodeId {
        let id = self.alloc(NodeKind::Comment);
        if let Some(n) = self.node_opt_mut(id) {
            n.data = data.to_owned();
        }
        id
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, kind));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, kind)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        NodeId::new(idx, generation)
    }

    /// Append `child` as the last child of `parent`, detaching it from any previous parent.
    ///
    /// Does nothing if either node is stale, if `child` is the window or document,
    /// or if the move would create a cycle.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.is_alive(parent)
            || !self.is_alive(child)
            || child == self.window
            || child == self.document
            || parent == self.window
            || self.contains(child, parent)
        {
            return;
        }
        self.detach(child);
        if let Some(p) = self.node_opt_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.node_opt_mut(child) {
            c.parent = Some(parent);
        }
    }

    /// Create an element and append it under `parent` in one step.
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.create_element(tag);
        self.append_child(parent, id);
        id
    }

    /// Unlink `id` from its parent, keeping the node and its subtree alive.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(p) = self.node_opt_mut(parent) {
            p.children.retain(|c| *c != id);
        }
        if let Some(n) = self.node_opt_mut(id) {
            n.parent = None;
        }
    }

    /// Remove a node and its subtree, freeing their slots.
    pub fn remove(&mut self, id: NodeId) {
        if !self.is_alive(id) || id == self.window || id == self.document {
            return;
        }
        self.detach(id);
        let children = self.children(id).to_vec();
        for child in children {
            self.remove(child);
        }
        if self.active_element == Some(id) {
            self.active_element = None;
        }
        self.nodes[id.idx()] = None;
        self.free_list.push(id.idx());
    }

    /// Returns true if `id` refers to a live node.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.1).then_some(n)
    }

    fn node_opt_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    /// Kind of a live node.
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }

    /// Lowercase tag name of an element.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element(tag) => Some(tag),
            _ => None,
        }
    }

    /// True if `id` is an element with the given (lowercase) tag.
    pub fn is_element_named(&self, id: NodeId, tag: &str) -> bool {
        self.tag_name(id) == Some(tag)
    }

    /// True if `id` is a text node.
    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Text))
    }

    /// True if `id` is a comment node.
    pub fn is_comment(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Comment))
    }

    /// True if `id` is the document node.
    pub fn is_document(&self, id: NodeId) -> bool {
        id == self.document
    }

    /// Parent of a node, if any.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    /// Children of a node in document order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// The sibling immediately before `id`.
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let pos = siblings.iter().position(|c| *c == id)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    /// True if `node` is `ancestor` or one of its descendants.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.parent(id);
        }
        false
    }

    /// True if the node is attached under the document node.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.document, id)
    }

    /// The document that owns every node of this arena.
    pub fn owner_document(&self, _id: NodeId) -> NodeId {
        self.document
    }

    /// Attribute value on an element.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)?.attributes.get(name).map(String::as_str)
    }

    /// Set an attribute. Names are stored as given.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(n) = self.node_opt_mut(id) {
            n.attributes.insert(name.to_owned(), value.to_owned());
        }
    }

    /// Remove an attribute.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if let Some(n) = self.node_opt_mut(id) {
            n.attributes.remove(name);
        }
    }

    /// `type` of an `<input>`, lowercased, defaulting to `"text"`.
    ///
    /// Returns `None` for anything that is not an input element.
    pub fn input_type(&self, id: NodeId) -> Option<String> {
        if !self.is_element_named(id, "input") {
            return None;
        }
        Some(
            self.attribute(id, "type")
                .map(str::to_ascii_lowercase)
                .unwrap_or_else(|| "text".to_owned()),
        )
    }

    /// True if the element's `contenteditable` attribute is `"true"`.
    pub fn is_content_editable(&self, id: NodeId) -> bool {
        self.attribute(id, "contenteditable") == Some("true")
    }

    /// Live `value` of a form control.
    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|n| n.value.as_str())
    }

    /// Set the live `value` of a form control.
    ///
    /// The caret collapses to the end of the new value when the control tracks a selection.
    pub fn set_value(&mut self, id: NodeId, value: &str) {
        if let Some(n) = self.node_opt_mut(id) {
            n.value = value.to_owned();
            if n.selection.is_some() {
                let end = value.chars().count();
                n.selection = Some(TextRange { start: end, end });
            }
        }
    }

    /// Live `checked` state.
    pub fn checked(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| n.checked)
    }

    /// Set the live `checked` state.
    pub fn set_checked(&mut self, id: NodeId, checked: bool) {
        if let Some(n) = self.node_opt_mut(id) {
            n.checked = checked;
        }
    }

    /// Character data of a text or comment node.
    pub fn data(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text | NodeKind::Comment => self.node(id).map(|n| n.data.as_str()),
            _ => None,
        }
    }

    /// Replace the character data of a text or comment node.
    pub fn set_data(&mut self, id: NodeId, data: &str) {
        if let Some(n) = self.node_opt_mut(id) {
            if matches!(n.kind, NodeKind::Text | NodeKind::Comment) {
                n.data = data.to_owned();
            }
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text) => out.push_str(self.data(id).unwrap_or_default()),
            Some(NodeKind::Comment) | None => {}
            Some(_) => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Selection range inside a text control, if one has been set.
    pub fn selection_range(&self, id: NodeId) -> Option<TextRange> {
        self.node(id)?.selection
    }

    /// Set the selection range inside a text control.
    pub fn set_selection_range(&mut self, id: NodeId, start: usize, end: usize) {
        if let Some(n) = self.node_opt_mut(id) {
            n.selection = Some(TextRange { start, end });
        }
    }

    /// The focused element, if any.
    pub fn active_element(&self) -> Option<NodeId> {
        self.active_element
    }

    /// Move focus to `id`. This only records focus; it does not fire events.
    pub fn focus(&mut self, id: NodeId) {
        if self.is_alive(id) {
            self.active_element = Some(id);
        }
    }

    /// Clear focus.
    pub fn blur(&mut self) {
        self.active_element = None;
    }

    /// Document-level selection.
    pub fn window_selection(&self) -> Option<WindowSelection> {
        self.selection
    }

    /// Replace the document-level selection.
    pub fn set_window_selection(&mut self, selection: Option<WindowSelection>) {
        self.selection = selection;
    }

    /// Register a native listener.
    ///
    /// Returns false if an identical `(type, capture, handle)` registration already exists,
    /// matching the platform rule that duplicate registrations are ignored.
    pub fn add_event_listener(
        &mut self,
        target: NodeId,
        event_type: &str,
        options: ListenerOptions,
        handle: ListenerHandle,
    ) -> bool {
        let Some(n) = self.node_opt_mut(target) else {
            return false;
        };
        let duplicate = n.listeners.iter().any(|l| {
            l.event_type == event_type && l.capture == options.capture && l.handle == handle
        });
        if duplicate {
            return false;
        }
        n.listeners.push(RegisteredListener {
            event_type: event_type.to_owned(),
            capture: options.capture,
            passive: options.passive,
            handle,
        });
        true
    }

    /// Remove a native listener. Returns true if one was removed.
    pub fn remove_event_listener(
        &mut self,
        target: NodeId,
        event_type: &str,
        capture: bool,
        handle: ListenerHandle,
    ) -> bool {
        let Some(n) = self.node_opt_mut(target) else {
            return false;
        };
        let before = n.listeners.len();
        n.listeners
            .retain(|l| !(l.event_type == event_type && l.capture == capture && l.handle == handle));
        n.listeners.len() != before
    }

    /// All native listeners registered on a node, in registration order.
    pub fn listeners(&self, target: NodeId) -> &[RegisteredListener] {
        self.node(target)
            .map(|n| n.listeners.as_slice())
            .unwrap_or(&[])
    }

    /// Number of listeners for one `(type, phase)` pair on a node.
    pub fn listener_count(&self, target: NodeId, event_type: &str, capture: bool) -> usize {
        self.listeners(target)
            .iter()
            .filter(|l| l.event_type == event_type && l.capture == capture)
            .count()
    }

    /// Target-to-top path used for propagation: the target, its ancestors and,
    /// for connected nodes, the window.
    pub fn event_path(&self, target: NodeId) -> Vec<NodeId> {
        if target == self.window {
            return vec![target];
        }
        let mut out = Vec::new();
        let mut cur = Some(target);
        while let Some(id) = cur {
            out.push(id);
            cur = self.parent(id);
        }
        if self.is_connected(target) {
            out.push(self.window);
        }
        out
    }

    /// Native listeners that fire for an event of `event_type` dispatched at `target`.
    ///
    /// Capture listeners run top-down to the target's parent, then the target's own
    /// capture and bubble listeners, then (if `bubbles`) bubble listeners bottom-up.
    pub fn propagation_path(
        &self,
        target: NodeId,
        event_type: &str,
        bubbles: bool,
    ) -> Vec<PropagationStep> {
        let path = self.event_path(target);
        let mut steps = Vec::new();
        let mut push = |node: NodeId, capture: bool| {
            for l in self.listeners(node) {
                if l.event_type == event_type && l.capture == capture {
                    steps.push(PropagationStep {
                        node,
                        handle: l.handle,
                        capture,
                    });
                }
            }
        };
        for node in path.iter().skip(1).rev() {
            push(*node, true);
        }
        push(target, true);
        push(target, false);
        if bubbles {
            for node in path.iter().skip(1) {
                push(*node, false);
            }
        }
        steps
    }
}
