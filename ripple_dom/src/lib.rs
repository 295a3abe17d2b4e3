// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ripple DOM: an in-memory host platform for the Ripple event system.
//!
//! ## Overview
//!
//! This crate models the slice of a browser that delegated event dispatch talks to:
//!
//! - A generational arena of platform nodes ([`Document`], [`NodeId`]) with a window,
//!   a document node, elements, text, and comments.
//! - Form state: `value`, `checked`, text selection ranges, focus, and the window selection.
//! - Native listener registration with capture and passive options ([`ListenerOptions`]).
//!   The document never runs callbacks itself; it stores opaque [`ListenerHandle`]s and
//!   reports them in propagation order via [`Document::propagation_path`].
//! - Native event records ([`NativeEvent`]) with platform-shaped, partly optional fields.
//! - Feature detection results ([`PlatformFeatures`]) so old-engine code paths can be exercised.
//!
//! ## Example
//!
//! ```
//! use ripple_dom::{Document, ListenerHandle, ListenerOptions};
//!
//! let mut doc = Document::new();
//! let root = doc.append_element(doc.document(), "div");
//! let button = doc.append_element(root, "button");
//! doc.add_event_listener(root, "click", ListenerOptions::CAPTURE, ListenerHandle(1));
//! doc.add_event_listener(root, "click", ListenerOptions::BUBBLE, ListenerHandle(2));
//!
//! let order: Vec<u64> = doc
//!     .propagation_path(button, "click", true)
//!     .iter()
//!     .map(|step| step.handle.0)
//!     .collect();
//! assert_eq!(order, vec![1, 2]);
//! ```

mod document;
mod event;
mod types;

pub use document::Document;
pub use event::{Modifiers, NativeEvent, Touch};
pub use types::{
    ListenerHandle, ListenerOptions, NodeId, NodeKind, PlatformFeatures, PropagationStep,
    RegisteredListener, TextRange, WindowSelection,
};
