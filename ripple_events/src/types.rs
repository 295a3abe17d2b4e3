// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types for dispatch: system flags, priorities, listener-set keys, and dispatch queues.
//!
//! ## Overview
//!
//! A native event becomes a [`DispatchQueue`]: an ordered list of [`DispatchEntry`] values,
//! each pairing one [`SyntheticEvent`] with the listeners collected for it.
//! Queues are built fresh for every native event and consumed exactly once.

use ripple_dom::NodeId;

use crate::fiber::FiberId;
use crate::props::Listener;
use crate::synthetic::SyntheticEvent;

bitflags::bitflags! {
    /// Flags describing how a native listener was attached and how its event is dispatched.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EventSystemFlags: u8 {
        /// Listener bound through the event handle API on a node the tree does not manage.
        const IS_EVENT_HANDLE_NON_MANAGED_NODE = 1 << 0;
        /// Listener attached on the element itself rather than the root.
        const IS_NON_DELEGATED = 1 << 1;
        /// Listener attached for the capture phase.
        const IS_CAPTURE_PHASE = 1 << 2;
        /// Listener attached as passive.
        const IS_PASSIVE = 1 << 3;
        /// Dispatch is a replay of a previously blocked event.
        const IS_REPLAYED = 1 << 4;

        /// Dispatches that only run the simple plugin.
        const SHOULD_NOT_PROCESS_POLYFILL_EVENT_PLUGINS = Self::IS_EVENT_HANDLE_NON_MANAGED_NODE.bits()
            | Self::IS_NON_DELEGATED.bits()
            | Self::IS_CAPTURE_PHASE.bits();
    }
}

/// Static priority class of a native event.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EventPriority {
    /// Direct user intent: clicks, key presses, focus changes.
    Discrete,
    /// High-frequency interaction: pointer moves, drags, scroll.
    UserBlocking,
    /// Everything else, including media and animation events.
    Continuous,
}

/// Priority levels of the cooperative scheduler.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub enum SchedulerPriority {
    /// No priority set.
    #[default]
    NoPriority,
    /// Run synchronously.
    Immediate,
    /// Run soon, ahead of normal work.
    UserBlocking,
    /// Normal work.
    Normal,
    /// Deferrable work.
    Low,
    /// Only when idle.
    Idle,
}

/// Deduplication key for native listener attachment: `"<event>__<capture|bubble>"`.
pub fn listener_set_key(dom_event_name: &str, capture: bool) -> String {
    format!(
        "{dom_event_name}__{}",
        if capture { "capture" } else { "bubble" }
    )
}

/// A listener collected for one dispatch.
#[derive(Clone)]
pub struct DispatchListener {
    /// Virtual node the listener belongs to. `None` for non-managed nodes.
    pub instance: Option<FiberId>,
    /// The handler.
    pub listener: Listener,
    /// Platform node reported as `currentTarget` while the handler runs.
    pub current_target: NodeId,
}

impl core::fmt::Debug for DispatchListener {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DispatchListener")
            .field("instance", &self.instance)
            .field("current_target", &self.current_target)
            .finish_non_exhaustive()
    }
}

/// A synthetic event and the listeners that receive it.
#[derive(Debug)]
pub struct DispatchEntry {
    /// The event delivered to every listener.
    pub event: SyntheticEvent,
    /// Listeners in accumulation order.
    pub listeners: Vec<DispatchListener>,
}

/// Entries produced for a single native event occurrence.
pub type DispatchQueue = Vec<DispatchEntry>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_set_key_format() {
        assert_eq!(listener_set_key("click", true), "click__capture");
        assert_eq!(listener_set_key("scroll", false), "scroll__bubble");
    }

    #[test]
    fn polyfill_mask() {
        let mask = EventSystemFlags::SHOULD_NOT_PROCESS_POLYFILL_EVENT_PLUGINS;
        assert!(mask.contains(EventSystemFlags::IS_CAPTURE_PHASE));
        assert!(!mask.contains(EventSystemFlags::IS_PASSIVE));
        assert!(!mask.contains(EventSystemFlags::IS_REPLAYED));
        assert!(!(EventSystemFlags::IS_PASSIVE | EventSystemFlags::IS_REPLAYED).intersects(mask));
    }
}
