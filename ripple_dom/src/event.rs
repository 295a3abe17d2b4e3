// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Native event records.
//!
//! ## Overview
//!
//! A [`NativeEvent`] carries every field a browser event may expose. Fields that
//! a real platform may omit are `Option`s, so consumers can detect missing
//! support and fall back (for example a missing `movement` or `char_code`).
//!
//! Cancellation state lives in [`Cell`]s: an event is shared by reference between
//! the listeners that observe it, and any of them may call
//! [`prevent_default`](NativeEvent::prevent_default) or
//! [`stop_propagation`](NativeEvent::stop_propagation).

use core::cell::Cell;

use kurbo::{Point, Vec2};

use crate::types::NodeId;

bitflags::bitflags! {
    /// Modifier and lock keys held while an event fired.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u16 {
        /// Alt / Option.
        const ALT = 1 << 0;
        /// Control.
        const CONTROL = 1 << 1;
        /// Meta / Command / Windows.
        const META = 1 << 2;
        /// Shift.
        const SHIFT = 1 << 3;
        /// AltGraph.
        const ALT_GRAPH = 1 << 4;
        /// Caps lock is engaged.
        const CAPS_LOCK = 1 << 5;
        /// Num lock is engaged.
        const NUM_LOCK = 1 << 6;
        /// Scroll lock is engaged.
        const SCROLL_LOCK = 1 << 7;
    }
}

impl Modifiers {
    /// Parse a `getModifierState` key name.
    pub fn from_key_name(name: &str) -> Option<Self> {
        Some(match name {
            "Alt" => Self::ALT,
            "Control" => Self::CONTROL,
            "Meta" => Self::META,
            "Shift" => Self::SHIFT,
            "AltGraph" => Self::ALT_GRAPH,
            "CapsLock" => Self::CAPS_LOCK,
            "NumLock" => Self::NUM_LOCK,
            "ScrollLock" => Self::SCROLL_LOCK,
            _ => return None,
        })
    }
}

/// One touch point of a touch event.
#[derive(Clone, Debug, PartialEq)]
pub struct Touch {
    /// Stable identifier for the contact.
    pub identifier: i64,
    /// Node the touch started on.
    pub target: Option<NodeId>,
    /// Position in client coordinates.
    pub client: Point,
    /// Position in screen coordinates.
    pub screen: Point,
}

/// Event types that do not bubble on the platform.
const NON_BUBBLING: &[&str] = &[
    "abort",
    "blur",
    "cancel",
    "canplay",
    "canplaythrough",
    "close",
    "durationchange",
    "emptied",
    "encrypted",
    "ended",
    "error",
    "focus",
    "invalid",
    "load",
    "loadeddata",
    "loadedmetadata",
    "loadstart",
    "mouseenter",
    "mouseleave",
    "pause",
    "play",
    "playing",
    "pointerenter",
    "pointerleave",
    "progress",
    "ratechange",
    "scroll",
    "seeked",
    "seeking",
    "stalled",
    "suspend",
    "timeupdate",
    "toggle",
    "volumechange",
    "waiting",
];

/// A raw event as produced by the host platform.
#[derive(Clone, Debug)]
pub struct NativeEvent {
    /// Event type, e.g. `"click"`.
    pub event_type: String,
    /// Dispatch target. `None` means the window.
    pub target: Option<NodeId>,
    /// `relatedTarget` for mouse/pointer/focus transitions.
    pub related_target: Option<NodeId>,
    /// Milliseconds since time origin. Zero means the platform did not supply one.
    pub time_stamp: f64,
    /// Whether the event propagates past its target.
    pub bubbles: bool,
    /// Whether `preventDefault` has any effect.
    pub cancelable: bool,
    /// True for user-agent generated events.
    pub is_trusted: bool,
    /// UI `detail` (click count and the like).
    pub detail: i32,
    /// `detail.data` of a custom composition event, if present.
    pub custom_data: Option<String>,
    /// `data` of composition and `textInput` events.
    pub data: Option<String>,
    /// `key`, when the platform reports it.
    pub key: Option<String>,
    /// `code`, when the platform reports it.
    pub code: Option<String>,
    /// Legacy `keyCode`.
    pub key_code: u32,
    /// Legacy `charCode`. `None` when the platform omits the property.
    pub char_code: Option<u32>,
    /// Legacy `which`.
    pub which: u32,
    /// Legacy `char` of old engines.
    pub legacy_char: Option<String>,
    /// Key location.
    pub location: u32,
    /// Auto-repeat flag.
    pub repeat: bool,
    /// Input method locale, e.g. `"ko"`.
    pub locale: Option<String>,
    /// Held modifiers and lock keys.
    pub modifiers: Modifiers,
    /// Whether the platform implements `getModifierState` itself.
    pub has_modifier_state: bool,
    /// Mouse button that changed.
    pub button: i16,
    /// Mouse buttons currently held.
    pub buttons: u16,
    /// Position in screen coordinates.
    pub screen: Point,
    /// Position in client coordinates.
    pub client: Point,
    /// Position in page coordinates.
    pub page: Point,
    /// `movementX/Y`. `None` when the platform omits them.
    pub movement: Option<Vec2>,
    /// `deltaX/deltaY` of a wheel event. `None` on engines that only report legacy deltas.
    pub delta: Option<Vec2>,
    /// `deltaZ` of a wheel event.
    pub delta_z: f64,
    /// `deltaMode` of a wheel event.
    pub delta_mode: u32,
    /// Legacy `wheelDeltaX/wheelDeltaY`.
    pub wheel_delta: Option<Vec2>,
    /// Legacy scalar `wheelDelta`.
    pub wheel_delta_scalar: Option<f64>,
    /// Pointer identifier.
    pub pointer_id: i32,
    /// Pointer kind: `"mouse"`, `"pen"` or `"touch"`.
    pub pointer_type: String,
    /// Contact geometry width.
    pub width: f64,
    /// Contact geometry height.
    pub height: f64,
    /// Normalized pressure.
    pub pressure: f64,
    /// Normalized tangential pressure.
    pub tangential_pressure: f64,
    /// Tilt along X in degrees.
    pub tilt_x: f64,
    /// Tilt along Y in degrees.
    pub tilt_y: f64,
    /// Rotation in degrees.
    pub twist: f64,
    /// Primary pointer flag.
    pub is_primary: bool,
    /// Active touches.
    pub touches: Vec<Touch>,
    /// Touches that started on the target.
    pub target_touches: Vec<Touch>,
    /// Touches that changed in this event.
    pub changed_touches: Vec<Touch>,
    /// Animation name for animation events.
    pub animation_name: String,
    /// Elapsed time for animation and transition events.
    pub elapsed_time: f64,
    /// Pseudo element for animation and transition events.
    pub pseudo_element: String,
    /// Property name for transition and `propertychange` events.
    pub property_name: String,
    /// Clipboard payload, as plain text.
    pub clipboard_data: Option<String>,
    /// Drag payload, as plain text.
    pub data_transfer: Option<String>,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
}

impl NativeEvent {
    /// Create an event of the given type dispatched at `target`.
    ///
    /// `bubbles` follows the platform default for the type; every other field is zeroed.
    pub fn new(event_type: &str, target: Option<NodeId>) -> Self {
        Self {
            event_type: event_type.to_owned(),
            target,
            related_target: None,
            time_stamp: 0.0,
            bubbles: !NON_BUBBLING.contains(&event_type),
            cancelable: true,
            is_trusted: true,
            detail: 0,
            custom_data: None,
            data: None,
            key: None,
            code: None,
            key_code: 0,
            char_code: None,
            which: 0,
            legacy_char: None,
            location: 0,
            repeat: false,
            locale: None,
            modifiers: Modifiers::empty(),
            has_modifier_state: true,
            button: 0,
            buttons: 0,
            screen: Point::ORIGIN,
            client: Point::ORIGIN,
            page: Point::ORIGIN,
            movement: None,
            delta: None,
            delta_z: 0.0,
            delta_mode: 0,
            wheel_delta: None,
            wheel_delta_scalar: None,
            pointer_id: 0,
            pointer_type: String::new(),
            width: 0.0,
            height: 0.0,
            pressure: 0.0,
            tangential_pressure: 0.0,
            tilt_x: 0.0,
            tilt_y: 0.0,
            twist: 0.0,
            is_primary: false,
            touches: Vec::new(),
            target_touches: Vec::new(),
            changed_touches: Vec::new(),
            animation_name: String::new(),
            elapsed_time: 0.0,
            pseudo_element: String::new(),
            property_name: String::new(),
            clipboard_data: None,
            data_transfer: None,
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
        }
    }

    /// Set `relatedTarget`.
    pub fn with_related_target(mut self, related: Option<NodeId>) -> Self {
        self.related_target = related;
        self
    }

    /// Set the time stamp.
    pub fn with_time_stamp(mut self, time_stamp: f64) -> Self {
        self.time_stamp = time_stamp;
        self
    }

    /// Set keyboard fields. `which` mirrors the key code, as platforms do for key events.
    pub fn with_key(mut self, key: Option<&str>, key_code: u32) -> Self {
        self.key = key.map(str::to_owned);
        self.key_code = key_code;
        self.which = key_code;
        self
    }

    /// Set `charCode` and `which` for a keypress.
    pub fn with_char_code(mut self, char_code: u32) -> Self {
        self.char_code = Some(char_code);
        self.which = char_code;
        self
    }

    /// Set the mouse button.
    pub fn with_button(mut self, button: i16) -> Self {
        self.button = button;
        self
    }

    /// Set screen and client coordinates to the same point.
    pub fn at(mut self, pt: Point) -> Self {
        self.screen = pt;
        self.client = pt;
        self.page = pt;
        self
    }

    /// Set held modifiers.
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Set composition or `textInput` data.
    pub fn with_data(mut self, data: &str) -> Self {
        self.data = Some(data.to_owned());
        self
    }

    /// Set the pointer identifier.
    pub fn with_pointer_id(mut self, pointer_id: i32) -> Self {
        self.pointer_id = pointer_id;
        self
    }

    /// Set the input method locale.
    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = Some(locale.to_owned());
        self
    }

    /// Set the property name (transition and `propertychange` events).
    pub fn with_property_name(mut self, name: &str) -> Self {
        self.property_name = name.to_owned();
        self
    }

    /// Set `bubbles`.
    pub fn with_bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    /// Mark the event as already default-prevented (for example by an earlier native listener).
    pub fn prevented(self) -> Self {
        self.default_prevented.set(true);
        self
    }

    /// Cancel the platform default action. Ignored for non-cancelable events.
    pub fn prevent_default(&self) {
        if self.cancelable {
            self.default_prevented.set(true);
        }
    }

    /// Whether the default action was canceled.
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    /// Stop native propagation after the listeners of the current node.
    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    /// Whether native propagation was stopped.
    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    /// Native `getModifierState`. Only meaningful when [`has_modifier_state`](Self::has_modifier_state) is set.
    pub fn modifier_state(&self, key: &str) -> bool {
        Modifiers::from_key_name(key).is_some_and(|m| self.modifiers.contains(m))
    }
}
