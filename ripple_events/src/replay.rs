// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Replay queues for events that arrive before their target subtree is ready.
//!
//! ## Overview
//!
//! When target resolution finds that the event landed inside a dehydrated suspense
//! boundary or a root that still awaits hydration, the event is parked here instead
//! of being dispatched.
//!
//! - Discrete events (clicks, key presses, ...) go into one FIFO. While anything is
//!   queued, later replayable discrete events are queued behind it even if their own
//!   target is ready, so the arrival order is kept.
//! - Continuous "start" events are kept one per family: the last focus, drag enter,
//!   mouse over, and per-pointer over and capture. A later event of the same family
//!   replaces or clears the slot.
//!
//! The reconciler reports a boundary as ready with
//! [`EventSystem::retry_if_blocked_on`](crate::EventSystem::retry_if_blocked_on) and
//! then drains with
//! [`EventSystem::replay_unblocked_events`](crate::EventSystem::replay_unblocked_events).

use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use ripple_dom::{NativeEvent, NodeId};

use crate::types::EventSystemFlags;

const DISCRETE_REPLAYABLE_EVENTS: &[&str] = &[
    "mousedown",
    "mouseup",
    "touchcancel",
    "touchend",
    "touchstart",
    "auxclick",
    "dblclick",
    "pointercancel",
    "pointerdown",
    "pointerup",
    "dragend",
    "dragstart",
    "drop",
    "compositionend",
    "compositionstart",
    "keydown",
    "keypress",
    "keyup",
    "input",
    "textInput",
    "copy",
    "cut",
    "paste",
    "click",
    "change",
    "contextmenu",
    "reset",
    "submit",
];

/// True for discrete events that are queued for replay rather than dropped.
pub fn is_replayable_discrete_event(dom_event_name: &str) -> bool {
    DISCRETE_REPLAYABLE_EVENTS.contains(&dom_event_name)
}

/// A parked native event.
#[derive(Clone, Debug)]
pub(crate) struct QueuedReplayableEvent {
    /// Boundary marker or container the event waits for. `None` once unblocked.
    pub(crate) blocked_on: Option<NodeId>,
    pub(crate) dom_event_name: String,
    pub(crate) flags: EventSystemFlags,
    pub(crate) native: Rc<NativeEvent>,
    /// Containers still to receive the event, front first.
    pub(crate) target_containers: Vec<NodeId>,
}

impl QueuedReplayableEvent {
    fn new(
        blocked_on: Option<NodeId>,
        dom_event_name: &str,
        flags: EventSystemFlags,
        container: NodeId,
        native: Rc<NativeEvent>,
    ) -> Self {
        Self {
            blocked_on,
            dom_event_name: dom_event_name.to_owned(),
            flags: flags | EventSystemFlags::IS_REPLAYED,
            native,
            target_containers: vec![container],
        }
    }
}

/// Slot of a continuous record.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub(crate) enum ContinuousSlot {
    Focus,
    Drag,
    Mouse,
    Pointer(i32),
    PointerCapture(i32),
}

impl ContinuousSlot {
    /// Slot filled by a native event, if it is a continuous start event.
    fn for_queue(dom_event_name: &str, native: &NativeEvent) -> Option<Self> {
        Some(match dom_event_name {
            "focusin" => Self::Focus,
            "dragenter" => Self::Drag,
            "mouseover" => Self::Mouse,
            "pointerover" => Self::Pointer(native.pointer_id),
            "gotpointercapture" => Self::PointerCapture(native.pointer_id),
            _ => return None,
        })
    }

    /// Slot cleared by a native event once it dispatches normally.
    fn for_clear(dom_event_name: &str, native: &NativeEvent) -> Option<Self> {
        Some(match dom_event_name {
            "focusin" | "focusout" => Self::Focus,
            "dragenter" | "dragleave" => Self::Drag,
            "mouseover" | "mouseout" => Self::Mouse,
            "pointerover" | "pointerout" => Self::Pointer(native.pointer_id),
            "gotpointercapture" | "lostpointercapture" => Self::PointerCapture(native.pointer_id),
            _ => return None,
        })
    }
}

/// Whether a continuous event created a new record or merged into the existing one.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum ContinuousQueued {
    Created,
    Merged,
}

/// Parked discrete and continuous events.
#[derive(Debug, Default)]
pub(crate) struct ReplayQueues {
    discrete: VecDeque<QueuedReplayableEvent>,
    continuous: BTreeMap<ContinuousSlot, QueuedReplayableEvent>,
}

impl ReplayQueues {
    pub(crate) fn has_queued_discrete_events(&self) -> bool {
        !self.discrete.is_empty()
    }

    pub(crate) fn queued_discrete_len(&self) -> usize {
        self.discrete.len()
    }

    pub(crate) fn queued_continuous_len(&self) -> usize {
        self.continuous.len()
    }

    /// Append a discrete event. Returns true when it is the only queued event.
    pub(crate) fn queue_discrete_event(
        &mut self,
        blocked_on: Option<NodeId>,
        dom_event_name: &str,
        flags: EventSystemFlags,
        container: NodeId,
        native: Rc<NativeEvent>,
    ) -> bool {
        self.discrete.push_back(QueuedReplayableEvent::new(
            blocked_on,
            dom_event_name,
            flags,
            container,
            native,
        ));
        self.discrete.len() == 1
    }

    /// Park a continuous start event. Returns `None` for events that are not continuous.
    ///
    /// A repeat of the same native event (seen through another root) only adds its
    /// container and flags to the existing record.
    pub(crate) fn queue_if_continuous_event(
        &mut self,
        blocked_on: Option<NodeId>,
        dom_event_name: &str,
        flags: EventSystemFlags,
        container: NodeId,
        native: &Rc<NativeEvent>,
    ) -> Option<ContinuousQueued> {
        let slot = ContinuousSlot::for_queue(dom_event_name, native)?;
        if let Some(existing) = self.continuous.get_mut(&slot)
            && Rc::ptr_eq(&existing.native, native)
        {
            existing.flags |= flags;
            if !existing.target_containers.contains(&container) {
                existing.target_containers.push(container);
            }
            return Some(ContinuousQueued::Merged);
        }
        self.continuous.insert(
            slot,
            QueuedReplayableEvent::new(blocked_on, dom_event_name, flags, container, Rc::clone(native)),
        );
        Some(ContinuousQueued::Created)
    }

    /// Drop the continuous record a normally dispatched event supersedes.
    pub(crate) fn clear_if_continuous_event(&mut self, dom_event_name: &str, native: &NativeEvent) {
        if let Some(slot) = ContinuousSlot::for_clear(dom_event_name, native) {
            self.continuous.remove(&slot);
        }
    }

    /// Unblock every record waiting on `unblocked`. Returns true if any was.
    pub(crate) fn retry_if_blocked_on(&mut self, unblocked: NodeId) -> bool {
        let mut any = false;
        let records = self.discrete.iter_mut().chain(self.continuous.values_mut());
        for record in records {
            if record.blocked_on == Some(unblocked) {
                record.blocked_on = None;
                any = true;
            }
        }
        any
    }

    pub(crate) fn pop_discrete_front(&mut self) -> Option<QueuedReplayableEvent> {
        self.discrete.pop_front()
    }

    pub(crate) fn push_discrete_front(&mut self, record: QueuedReplayableEvent) {
        self.discrete.push_front(record);
    }

    #[cfg(test)]
    pub(crate) fn discrete_front(&self) -> Option<&QueuedReplayableEvent> {
        self.discrete.front()
    }

    /// Take every continuous record out for a replay attempt.
    pub(crate) fn take_continuous(&mut self) -> Vec<(ContinuousSlot, QueuedReplayableEvent)> {
        core::mem::take(&mut self.continuous).into_iter().collect()
    }

    /// Put back a continuous record that is still blocked, unless the slot was refilled.
    pub(crate) fn restore_continuous(&mut self, slot: ContinuousSlot, record: QueuedReplayableEvent) {
        self.continuous.entry(slot).or_insert(record);
    }

    /// Forget `container` in every record, dropping records left without a container.
    pub(crate) fn remove_container(&mut self, container: NodeId) {
        let forget = |record: &mut QueuedReplayableEvent| {
            record.target_containers.retain(|c| *c != container);
            !record.target_containers.is_empty()
        };
        self.discrete.retain_mut(forget);
        self.continuous.retain(|_, record| forget(record));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_dom::Document;

    fn nodes() -> (NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let a = doc.append_element(doc.document(), "div");
        let b = doc.append_element(doc.document(), "div");
        let marker = doc.create_comment("$");
        (a, b, marker)
    }

    #[test]
    fn discrete_is_fifo_and_flags_replayed() {
        let (container, _, marker) = nodes();
        let mut q = ReplayQueues::default();
        let first = Rc::new(NativeEvent::new("mousedown", None));
        let second = Rc::new(NativeEvent::new("click", None));
        assert!(q.queue_discrete_event(Some(marker), "mousedown", EventSystemFlags::empty(), container, first));
        assert!(!q.queue_discrete_event(None, "click", EventSystemFlags::empty(), container, second));
        let head = q.pop_discrete_front().unwrap();
        assert_eq!(head.dom_event_name, "mousedown");
        assert!(head.flags.contains(EventSystemFlags::IS_REPLAYED));
        assert_eq!(q.discrete_front().unwrap().dom_event_name, "click");
    }

    #[test]
    fn continuous_slots_replace_merge_and_clear() {
        let (a, b, marker) = nodes();
        let mut q = ReplayQueues::default();
        let over = Rc::new(NativeEvent::new("pointerover", None).with_pointer_id(1));
        assert_eq!(
            q.queue_if_continuous_event(Some(marker), "pointerover", EventSystemFlags::empty(), a, &over),
            Some(ContinuousQueued::Created)
        );
        assert_eq!(
            q.queue_if_continuous_event(Some(marker), "pointerover", EventSystemFlags::empty(), b, &over),
            Some(ContinuousQueued::Merged)
        );
        let other = Rc::new(NativeEvent::new("pointerover", None).with_pointer_id(2));
        q.queue_if_continuous_event(Some(marker), "pointerover", EventSystemFlags::empty(), a, &other);
        assert_eq!(q.queued_continuous_len(), 2);

        // Pointer 1 leaves; only its slot goes.
        q.clear_if_continuous_event("pointerout", &NativeEvent::new("pointerout", None).with_pointer_id(1));
        assert_eq!(q.queued_continuous_len(), 1);

        let click = Rc::new(NativeEvent::new("click", None));
        assert_eq!(
            q.queue_if_continuous_event(Some(marker), "click", EventSystemFlags::empty(), a, &click),
            None
        );
    }

    #[test]
    fn retry_unblocks_matching_records_only() {
        let (container, other, marker) = nodes();
        let mut q = ReplayQueues::default();
        let ev = Rc::new(NativeEvent::new("keydown", None));
        q.queue_discrete_event(Some(marker), "keydown", EventSystemFlags::empty(), container, Rc::clone(&ev));
        q.queue_discrete_event(Some(other), "keydown", EventSystemFlags::empty(), container, ev);
        assert!(q.retry_if_blocked_on(marker));
        assert!(!q.retry_if_blocked_on(marker));
        assert_eq!(q.pop_discrete_front().unwrap().blocked_on, None);
        assert_eq!(q.pop_discrete_front().unwrap().blocked_on, Some(other));
    }

    #[test]
    fn removing_a_container_drops_its_records() {
        let (a, b, marker) = nodes();
        let mut q = ReplayQueues::default();
        let focus = Rc::new(NativeEvent::new("focusin", None));
        q.queue_if_continuous_event(Some(marker), "focusin", EventSystemFlags::empty(), a, &focus);
        q.queue_if_continuous_event(Some(marker), "focusin", EventSystemFlags::empty(), b, &focus);
        q.queue_discrete_event(Some(marker), "click", EventSystemFlags::empty(), a, Rc::new(NativeEvent::new("click", None)));
        q.remove_container(a);
        assert_eq!(q.queued_discrete_len(), 0);
        assert_eq!(q.queued_continuous_len(), 1);
        q.remove_container(b);
        assert_eq!(q.queued_continuous_len(), 0);
    }
}
