// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Synthetic events: normalized wrappers around native events.
//!
//! ## Overview
//!
//! A [`SyntheticEvent`] is what user listeners receive. It carries the handler name it
//! was collected for, the event type, the target and current target, and a family
//! specific payload ([`EventData`]) whose fields are normalized across platforms.
//!
//! ## Cancellation
//!
//! [`SyntheticEvent::prevent_default`] and [`SyntheticEvent::stop_propagation`] are
//! idempotent. Both set a sticky flag and forward to the native event.
//! `is_default_prevented` starts out as the native event's own prevented state.
//!
//! Stopping propagation only affects the remaining listeners of the same dispatch
//! entry; other entries produced for the same native event still run.

mod data;
pub mod keys;

use std::rc::Rc;

use ripple_dom::{Modifiers, NativeEvent, NodeId};

pub(crate) use data::MovementTracker;
pub use data::{
    AnimationData, ClipboardData, DragData, FocusData, KeyboardData, MouseData, PointerData,
    TextData, TouchData, TransitionData, UiData, WheelData,
};

use crate::fiber::FiberId;

/// Event interface used to normalize a native event.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EventFamily {
    /// Base fields only.
    Base,
    /// UI events.
    Ui,
    /// Mouse events.
    Mouse,
    /// Drag events.
    Drag,
    /// Focus events.
    Focus,
    /// Keyboard events.
    Keyboard,
    /// Pointer events.
    Pointer,
    /// Touch events.
    Touch,
    /// Wheel events.
    Wheel,
    /// Clipboard events.
    Clipboard,
    /// Composition events.
    Composition,
    /// Before-input events.
    Input,
    /// Animation events.
    Animation,
    /// Transition events.
    Transition,
}

/// Family-specific normalized fields.
#[derive(Clone, Debug, PartialEq)]
pub enum EventData {
    /// No extra fields.
    Base,
    /// UI events.
    Ui(UiData),
    /// Mouse events.
    Mouse(MouseData),
    /// Drag events.
    Drag(DragData),
    /// Focus events.
    Focus(FocusData),
    /// Keyboard events.
    Keyboard(KeyboardData),
    /// Pointer events.
    Pointer(PointerData),
    /// Touch events.
    Touch(TouchData),
    /// Wheel events.
    Wheel(WheelData),
    /// Clipboard events.
    Clipboard(ClipboardData),
    /// Composition events.
    Composition(TextData),
    /// Before-input events.
    Input(TextData),
    /// Animation events.
    Animation(AnimationData),
    /// Transition events.
    Transition(TransitionData),
}

impl EventData {
    fn from_native(
        family: EventFamily,
        native: &Rc<NativeEvent>,
        tracker: &mut MovementTracker,
    ) -> Self {
        match family {
            EventFamily::Base => Self::Base,
            EventFamily::Ui => Self::Ui(UiData {
                detail: native.detail,
            }),
            EventFamily::Mouse => Self::Mouse(MouseData::from_native(native, tracker)),
            EventFamily::Drag => Self::Drag(DragData {
                mouse: MouseData::from_native(native, tracker),
                data_transfer: native.data_transfer.clone(),
            }),
            EventFamily::Focus => Self::Focus(FocusData {
                related_target: native.related_target,
            }),
            EventFamily::Keyboard => Self::Keyboard(KeyboardData::from_native(native)),
            EventFamily::Pointer => Self::Pointer(PointerData {
                mouse: MouseData::from_native(native, tracker),
                pointer_id: native.pointer_id,
                width: native.width,
                height: native.height,
                pressure: native.pressure,
                tangential_pressure: native.tangential_pressure,
                tilt_x: native.tilt_x,
                tilt_y: native.tilt_y,
                twist: native.twist,
                pointer_type: native.pointer_type.clone(),
                is_primary: native.is_primary,
            }),
            EventFamily::Touch => Self::Touch(TouchData {
                touches: native.touches.clone(),
                target_touches: native.target_touches.clone(),
                changed_touches: native.changed_touches.clone(),
                modifiers: native.modifiers,
            }),
            EventFamily::Wheel => Self::Wheel(WheelData {
                mouse: MouseData::from_native(native, tracker),
                delta: WheelData::delta_from_native(native),
                delta_z: native.delta_z,
                delta_mode: native.delta_mode,
            }),
            EventFamily::Clipboard => Self::Clipboard(ClipboardData {
                clipboard_data: native.clipboard_data.clone(),
            }),
            EventFamily::Composition => Self::Composition(TextData {
                data: native.data.clone(),
            }),
            EventFamily::Input => Self::Input(TextData {
                data: native.data.clone(),
            }),
            EventFamily::Animation => Self::Animation(AnimationData {
                animation_name: native.animation_name.clone(),
                elapsed_time: native.elapsed_time,
                pseudo_element: native.pseudo_element.clone(),
            }),
            EventFamily::Transition => Self::Transition(TransitionData {
                property_name: native.property_name.clone(),
                elapsed_time: native.elapsed_time,
                pseudo_element: native.pseudo_element.clone(),
            }),
        }
    }
}

/// A normalized event delivered to user listeners.
#[derive(Clone, Debug)]
pub struct SyntheticEvent {
    react_name: Option<String>,
    event_type: String,
    family: EventFamily,
    target_inst: Option<FiberId>,
    native: Rc<NativeEvent>,
    target: Option<NodeId>,
    current_target: Option<NodeId>,
    time_stamp: f64,
    data: EventData,
    default_prevented: bool,
    propagation_stopped: bool,
    requested: Vec<NativeEvent>,
}

fn now_millis() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or_default()
}

impl SyntheticEvent {
    pub(crate) fn new(
        react_name: Option<&str>,
        event_type: &str,
        family: EventFamily,
        target_inst: Option<FiberId>,
        native: Rc<NativeEvent>,
        target: Option<NodeId>,
        tracker: &mut MovementTracker,
    ) -> Self {
        let data = EventData::from_native(family, &native, tracker);
        let time_stamp = if native.time_stamp == 0.0 {
            now_millis()
        } else {
            native.time_stamp
        };
        let default_prevented = native.default_prevented();
        Self {
            react_name: react_name.map(str::to_owned),
            event_type: event_type.to_owned(),
            family,
            target_inst,
            native,
            target,
            current_target: None,
            time_stamp,
            data,
            default_prevented,
            propagation_stopped: false,
            requested: Vec::new(),
        }
    }

    /// Handler name this event was collected for, e.g. `onClick`.
    pub fn react_name(&self) -> Option<&str> {
        self.react_name.as_deref()
    }

    /// Event type, e.g. `"click"` or `"mouseenter"`.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Normalization family.
    pub fn family(&self) -> EventFamily {
        self.family
    }

    /// Virtual node the event was dispatched from.
    pub fn target_instance(&self) -> Option<FiberId> {
        self.target_inst
    }

    /// The wrapped native event.
    pub fn native_event(&self) -> &NativeEvent {
        &self.native
    }

    /// Platform node the event targets.
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    /// Platform node whose listener is currently running. `None` outside of dispatch.
    pub fn current_target(&self) -> Option<NodeId> {
        self.current_target
    }

    /// Milliseconds since time origin.
    pub fn time_stamp(&self) -> f64 {
        self.time_stamp
    }

    /// Whether the native event bubbles.
    pub fn bubbles(&self) -> bool {
        self.native.bubbles
    }

    /// Whether the native event is cancelable.
    pub fn cancelable(&self) -> bool {
        self.native.cancelable
    }

    /// Whether the native event was generated by the user agent.
    pub fn is_trusted(&self) -> bool {
        self.native.is_trusted
    }

    /// Family payload.
    pub fn data(&self) -> &EventData {
        &self.data
    }

    /// Mouse fields for mouse, drag, pointer and wheel events.
    pub fn mouse(&self) -> Option<&MouseData> {
        match &self.data {
            EventData::Mouse(m) => Some(m),
            EventData::Drag(d) => Some(&d.mouse),
            EventData::Pointer(p) => Some(&p.mouse),
            EventData::Wheel(w) => Some(&w.mouse),
            _ => None,
        }
    }

    /// Keyboard fields.
    pub fn keyboard(&self) -> Option<&KeyboardData> {
        match &self.data {
            EventData::Keyboard(k) => Some(k),
            _ => None,
        }
    }

    /// `relatedTarget` for mouse-ish and focus events.
    pub fn related_target(&self) -> Option<NodeId> {
        match &self.data {
            EventData::Focus(f) => f.related_target,
            _ => self.mouse().and_then(|m| m.related_target),
        }
    }

    /// Text payload of composition and before-input events.
    pub fn text(&self) -> Option<&str> {
        match &self.data {
            EventData::Composition(t) | EventData::Input(t) => t.data.as_deref(),
            _ => None,
        }
    }

    /// `getModifierState`, with a fallback for platforms that lack it.
    pub fn modifier_state(&self, key: &str) -> bool {
        if self.native.has_modifier_state {
            return self.native.modifier_state(key);
        }
        let held = match &self.data {
            EventData::Keyboard(k) => k.modifiers,
            EventData::Touch(t) => t.modifiers,
            _ => match self.mouse() {
                Some(m) => m.modifiers,
                None => return false,
            },
        };
        let flag = match key {
            "Alt" => Modifiers::ALT,
            "Control" => Modifiers::CONTROL,
            "Meta" => Modifiers::META,
            "Shift" => Modifiers::SHIFT,
            _ => return false,
        };
        held.contains(flag)
    }

    /// Cancel the default action. Calling this more than once has no further effect.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
        self.native.prevent_default();
    }

    /// Stop delivery to the remaining listeners of this dispatch entry.
    ///
    /// Calling this more than once has no further effect.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
        self.native.stop_propagation();
    }

    /// True once the default action was canceled.
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// True once propagation was stopped.
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// Have the event system deliver `native` as a nested dispatch.
    ///
    /// The event is delivered once the current dispatch queue has run, before the
    /// enclosing batch ends. Its updates join that batch and controlled elements are
    /// restored once, when the outermost batch finishes.
    pub fn dispatch_native(&mut self, native: NativeEvent) {
        self.requested.push(native);
    }

    pub(crate) fn take_requested(&mut self) -> Vec<NativeEvent> {
        core::mem::take(&mut self.requested)
    }

    /// Kept for API compatibility; synthetic events are never pooled.
    pub fn persist(&mut self) {}

    /// Always true; synthetic events are never pooled.
    pub fn is_persistent(&self) -> bool {
        true
    }

    pub(crate) fn set_current_target(&mut self, node: Option<NodeId>) {
        self.current_target = node;
    }

    pub(crate) fn set_target(&mut self, node: Option<NodeId>) {
        self.target = node;
    }

    pub(crate) fn set_related_target(&mut self, node: Option<NodeId>) {
        match &mut self.data {
            EventData::Mouse(m) => m.related_target = node,
            EventData::Drag(d) => d.mouse.related_target = node,
            EventData::Pointer(p) => p.mouse.related_target = node,
            EventData::Wheel(w) => w.mouse.related_target = node,
            EventData::Focus(f) => f.related_target = node,
            _ => {}
        }
    }

    pub(crate) fn set_text(&mut self, text: Option<String>) {
        if let EventData::Composition(t) | EventData::Input(t) = &mut self.data {
            t.data = text;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(native: NativeEvent, family: EventFamily) -> SyntheticEvent {
        let mut tracker = MovementTracker::default();
        let ty = native.event_type.clone();
        SyntheticEvent::new(
            Some("onClick"),
            &ty,
            family,
            None,
            Rc::new(native),
            None,
            &mut tracker,
        )
    }

    #[test]
    fn prevent_default_and_stop_propagation_are_idempotent() {
        let mut ev = make(NativeEvent::new("click", None), EventFamily::Mouse);
        assert!(!ev.is_default_prevented());
        assert!(!ev.is_propagation_stopped());
        ev.prevent_default();
        ev.stop_propagation();
        let once = (ev.is_default_prevented(), ev.is_propagation_stopped());
        ev.prevent_default();
        ev.stop_propagation();
        ev.prevent_default();
        assert_eq!((ev.is_default_prevented(), ev.is_propagation_stopped()), once);
        assert_eq!(once, (true, true));
        assert!(ev.native_event().default_prevented());
        assert!(ev.native_event().propagation_stopped());
    }

    #[test]
    fn default_prevented_is_seeded_from_native() {
        let ev = make(NativeEvent::new("click", None).prevented(), EventFamily::Mouse);
        assert!(ev.is_default_prevented());
    }

    #[test]
    fn time_stamp_falls_back_to_clock() {
        let ev = make(NativeEvent::new("click", None), EventFamily::Base);
        assert!(ev.time_stamp() > 0.0);
        let ev = make(
            NativeEvent::new("click", None).with_time_stamp(42.0),
            EventFamily::Base,
        );
        assert_eq!(ev.time_stamp(), 42.0);
    }

    #[test]
    fn modifier_state_fallback() {
        let mut native =
            NativeEvent::new("keydown", None).with_modifiers(Modifiers::SHIFT | Modifiers::CAPS_LOCK);
        native.has_modifier_state = false;
        let ev = make(native, EventFamily::Keyboard);
        assert!(ev.modifier_state("Shift"));
        // Lock keys are unknown without native support.
        assert!(!ev.modifier_state("CapsLock"));
    }

    #[test]
    fn family_payloads() {
        let ev = make(
            NativeEvent::new("keydown", None).with_key(Some("Left"), 37),
            EventFamily::Keyboard,
        );
        assert_eq!(ev.keyboard().map(|k| k.key.as_str()), Some("ArrowLeft"));
        assert!(ev.mouse().is_none());
        let ev = make(NativeEvent::new("compositionend", None).with_data("한"), EventFamily::Composition);
        assert_eq!(ev.text(), Some("한"));
    }
}
