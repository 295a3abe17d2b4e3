// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=ripple_events --heading-base-level=0

//! Ripple Events: delegated event dispatch for a virtual UI tree.
//!
//! ## Overview
//!
//! Instead of registering a native listener per element, this crate attaches one
//! capture and one bubble listener per event type at each root container. When a
//! native event arrives it:
//!
//! - resolves the platform target to the closest mounted fiber ([`ComponentTree`]),
//! - runs a fixed list of plugins that normalize the native event into
//!   [`SyntheticEvent`]s and collect the handler props (`onClick`, `onClickCapture`,
//!   ...) along the fiber path,
//! - invokes the collected listeners in capture then bubble order, honoring
//!   `stop_propagation` per dispatch entry,
//! - batches the resulting updates through an [`UpdateScheduler`] and restores
//!   controlled form elements afterwards.
//!
//! Events that hit content that is still being hydrated are queued and replayed
//! once the boundary is ready.
//!
//! ## Trees
//!
//! The platform tree is a [`ripple_dom::Document`]. The virtual tree is a
//! [`FiberTree`] owned by the reconciler. [`EventSystem`] keeps the side table
//! between them and is told about commits with [`EventSystem::commit`] and
//! [`EventSystem::detach`].
//!
//! ## Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use ripple_dom::{Document, NativeEvent};
//! use ripple_events::{EventSystem, Fiber, FiberTree, Props};
//!
//! let mut doc = Document::new();
//! let container = doc.append_element(doc.document(), "div");
//! let button = doc.append_element(container, "button");
//!
//! let mut fibers = FiberTree::new();
//! let root = fibers.insert(None, Fiber::host_root(container));
//! let clicks = Rc::new(Cell::new(0));
//! let counter = clicks.clone();
//! let host = fibers.insert(
//!     Some(root),
//!     Fiber::host_component(
//!         "button",
//!         button,
//!         Props::new().on("onClick", move |_| {
//!             counter.set(counter.get() + 1);
//!             Ok(())
//!         }),
//!     ),
//! );
//!
//! let mut events = EventSystem::for_document(&doc);
//! events.attach_root(&mut doc, &fibers, root);
//! events.commit(&mut doc, &fibers, host);
//!
//! events.deliver(&mut doc, &fibers, NativeEvent::new("click", Some(button)))?;
//! assert_eq!(clicks.get(), 1);
//! # Ok::<(), ripple_events::DispatchError>(())
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and never installs a subscriber.

mod accumulate;
mod batching;
mod component_tree;
mod config;
mod controlled;
mod dispatch;
mod error;
mod fiber;
mod listener;
mod plugins;
mod props;
mod registry;
mod replay;
mod scheduler;
pub mod synthetic;
pub mod types;
mod value_tracking;

pub use component_tree::{ComponentTree, EventHandleListener};
pub use config::EventSystemConfig;
pub use controlled::RestoreQueue;
pub use dispatch::EventSystem;
pub use error::{DispatchError, ListenerResult};
pub use fiber::{Fiber, FiberFlags, FiberId, FiberKind, FiberTree, StateNode};
pub use listener::HandleTarget;
pub use props::{Listener, PropValue, Props, listener};
pub use registry::{EventRegistry, MEDIA_EVENT_TYPES, is_non_delegated};
pub use replay::is_replayable_discrete_event;
pub use scheduler::{BatchKind, NoopScheduler, UpdateScheduler};
pub use synthetic::{EventData, EventFamily, SyntheticEvent};
pub use types::DispatchEntry;
pub use value_tracking::ValueTrackers;
