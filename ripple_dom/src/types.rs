// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the host document: node identifiers, node kinds, listener records, and features.

/// Identifier for a platform node in a [`Document`](crate::Document).
///
/// This is a small, copyable handle that stays stable while the node is alive
/// and becomes invalid when the underlying slot is reused.
/// It consists of a slot index and a generation counter.
///
/// ## Semantics
///
/// - On creation, a fresh slot is allocated with generation `1`.
/// - On removal, the slot is freed; any existing `NodeId` that pointed to that slot is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new, distinct `NodeId`.
///
/// Use [`Document::is_alive`](crate::Document::is_alive) to check whether a `NodeId` still refers to a live node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Kind of a platform node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NodeKind {
    /// The global window object. Never has a parent.
    Window,
    /// The document node. Root of the connected tree.
    Document,
    /// An element with a lowercase tag name.
    Element(String),
    /// A text node.
    Text,
    /// A comment node. Dehydrated boundaries use comments as markers.
    Comment,
}

/// Opaque identity of a native listener callback.
///
/// The host document never calls listeners itself. It records registrations and
/// hands back the handles along a [propagation path](crate::Document::propagation_path).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ListenerHandle(pub u64);

/// Options passed to [`Document::add_event_listener`](crate::Document::add_event_listener).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ListenerOptions {
    /// Listen during the capture phase.
    pub capture: bool,
    /// Passive hint. `None` leaves the platform default in place.
    pub passive: Option<bool>,
}

impl ListenerOptions {
    /// Bubble-phase listener with the platform default passive behavior.
    pub const BUBBLE: Self = Self {
        capture: false,
        passive: None,
    };

    /// Capture-phase listener with the platform default passive behavior.
    pub const CAPTURE: Self = Self {
        capture: true,
        passive: None,
    };
}

/// A native listener registered on a node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegisteredListener {
    /// Native event type, e.g. `"click"`.
    pub event_type: String,
    /// Capture or bubble registration.
    pub capture: bool,
    /// Passive flag as requested.
    pub passive: Option<bool>,
    /// Callback identity.
    pub handle: ListenerHandle,
}

/// One step of a native propagation path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PropagationStep {
    /// Node whose listener fires.
    pub node: NodeId,
    /// Listener callback identity.
    pub handle: ListenerHandle,
    /// True when the listener was registered for the capture phase.
    pub capture: bool,
}

/// Capabilities of the host platform.
///
/// These are the feature-detection results an event system reads once at startup.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PlatformFeatures {
    /// `addEventListener` accepts a passive option.
    pub passive_listeners: bool,
    /// Text inputs fire a native `input` event.
    pub input_event: bool,
    /// The platform fires `compositionstart`/`compositionupdate`/`compositionend`.
    pub composition_event: bool,
    /// The platform fires `textInput`.
    pub text_event: bool,
    /// Legacy document mode, present only on old engines.
    pub document_mode: Option<u32>,
}

impl Default for PlatformFeatures {
    fn default() -> Self {
        Self {
            passive_listeners: true,
            input_event: true,
            composition_event: true,
            text_event: false,
            document_mode: None,
        }
    }
}

impl PlatformFeatures {
    /// Capabilities of an old engine without `input` or composition events.
    pub fn legacy(document_mode: u32) -> Self {
        Self {
            passive_listeners: false,
            input_event: false,
            composition_event: false,
            text_event: true,
            document_mode: Some(document_mode),
        }
    }
}

/// Collapsed or ranged text selection inside a form control.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TextRange {
    /// Start offset in characters.
    pub start: usize,
    /// End offset in characters.
    pub end: usize,
}

/// Document-level selection, as reported by `window.getSelection()`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct WindowSelection {
    /// Node where the selection started.
    pub anchor_node: NodeId,
    /// Offset within the anchor node.
    pub anchor_offset: usize,
    /// Node where the selection ends.
    pub focus_node: NodeId,
    /// Offset within the focus node.
    pub focus_offset: usize,
}
