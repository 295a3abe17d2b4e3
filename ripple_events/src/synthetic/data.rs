// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-family normalized fields.
//!
//! Each family struct is built from a [`NativeEvent`] by copying fields the
//! platform reports consistently and deriving the ones it does not.

use std::rc::Rc;

use kurbo::{Point, Vec2};
use ripple_dom::{Modifiers, NativeEvent, NodeId, Touch};

use super::keys::{event_char_code, event_key};

/// Previous mouse event, for platforms without `movementX/Y`.
#[derive(Debug, Default)]
pub(crate) struct MovementTracker {
    last_event: Option<Rc<NativeEvent>>,
    last_movement: Vec2,
}

impl MovementTracker {
    /// Movement since the previous `mousemove`, derived from screen coordinates.
    ///
    /// Observing the same event twice returns the same movement.
    pub(crate) fn observe(&mut self, native: &Rc<NativeEvent>) -> Vec2 {
        let same = self
            .last_event
            .as_ref()
            .is_some_and(|last| Rc::ptr_eq(last, native));
        if !same {
            self.last_movement = match &self.last_event {
                Some(last) if native.event_type == "mousemove" => native.screen - last.screen,
                _ => Vec2::ZERO,
            };
            self.last_event = Some(Rc::clone(native));
        }
        self.last_movement
    }
}

/// UI events: `detail`.
#[derive(Clone, Debug, PartialEq)]
pub struct UiData {
    /// Click count or similar.
    pub detail: i32,
}

/// Mouse events.
#[derive(Clone, Debug, PartialEq)]
pub struct MouseData {
    /// Click count or similar.
    pub detail: i32,
    /// Screen coordinates.
    pub screen: Point,
    /// Client coordinates.
    pub client: Point,
    /// Page coordinates.
    pub page: Point,
    /// Held modifiers.
    pub modifiers: Modifiers,
    /// Button that changed.
    pub button: i16,
    /// Buttons held.
    pub buttons: u16,
    /// Element being left or entered.
    pub related_target: Option<NodeId>,
    /// Movement since the previous move.
    pub movement: Vec2,
}

impl MouseData {
    pub(crate) fn from_native(native: &Rc<NativeEvent>, tracker: &mut MovementTracker) -> Self {
        let movement = match native.movement {
            Some(m) => m,
            None => tracker.observe(native),
        };
        Self {
            detail: native.detail,
            screen: native.screen,
            client: native.client,
            page: native.page,
            modifiers: native.modifiers,
            button: native.button,
            buttons: native.buttons,
            related_target: native.related_target,
            movement,
        }
    }

    /// `ctrlKey`.
    pub fn ctrl_key(&self) -> bool {
        self.modifiers.contains(Modifiers::CONTROL)
    }

    /// `shiftKey`.
    pub fn shift_key(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }

    /// `altKey`.
    pub fn alt_key(&self) -> bool {
        self.modifiers.contains(Modifiers::ALT)
    }

    /// `metaKey`.
    pub fn meta_key(&self) -> bool {
        self.modifiers.contains(Modifiers::META)
    }
}

/// Drag events.
#[derive(Clone, Debug, PartialEq)]
pub struct DragData {
    /// Mouse fields.
    pub mouse: MouseData,
    /// Drag payload.
    pub data_transfer: Option<String>,
}

/// Focus events.
#[derive(Clone, Debug, PartialEq)]
pub struct FocusData {
    /// Element losing or gaining focus.
    pub related_target: Option<NodeId>,
}

/// Keyboard events.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyboardData {
    /// Normalized `key`.
    pub key: String,
    /// Physical key `code`.
    pub code: Option<String>,
    /// Key location.
    pub location: u32,
    /// Held modifiers.
    pub modifiers: Modifiers,
    /// Auto-repeat.
    pub repeat: bool,
    /// Input method locale.
    pub locale: Option<String>,
    /// Character code, only meaningful for `keypress`.
    pub char_code: u32,
    /// Key code, only meaningful for `keydown` and `keyup`.
    pub key_code: u32,
    /// Legacy `which`.
    pub which: u32,
}

impl KeyboardData {
    pub(crate) fn from_native(native: &NativeEvent) -> Self {
        let (char_code, key_code, which) = match native.event_type.as_str() {
            "keypress" => {
                let c = event_char_code(native);
                (c, 0, c)
            }
            "keydown" | "keyup" => (0, native.key_code, native.key_code),
            _ => (0, 0, 0),
        };
        Self {
            key: event_key(native),
            code: native.code.clone(),
            location: native.location,
            modifiers: native.modifiers,
            repeat: native.repeat,
            locale: native.locale.clone(),
            char_code,
            key_code,
            which,
        }
    }
}

/// Pointer events.
#[derive(Clone, Debug, PartialEq)]
pub struct PointerData {
    /// Mouse fields.
    pub mouse: MouseData,
    /// Pointer identifier.
    pub pointer_id: i32,
    /// Contact width.
    pub width: f64,
    /// Contact height.
    pub height: f64,
    /// Pressure.
    pub pressure: f64,
    /// Tangential pressure.
    pub tangential_pressure: f64,
    /// Tilt along X.
    pub tilt_x: f64,
    /// Tilt along Y.
    pub tilt_y: f64,
    /// Rotation.
    pub twist: f64,
    /// Pointer kind.
    pub pointer_type: String,
    /// Primary pointer flag.
    pub is_primary: bool,
}

/// Touch events.
#[derive(Clone, Debug, PartialEq)]
pub struct TouchData {
    /// Active touches.
    pub touches: Vec<Touch>,
    /// Touches that started on the target.
    pub target_touches: Vec<Touch>,
    /// Touches changed by this event.
    pub changed_touches: Vec<Touch>,
    /// Held modifiers.
    pub modifiers: Modifiers,
}

/// Wheel events.
#[derive(Clone, Debug, PartialEq)]
pub struct WheelData {
    /// Mouse fields.
    pub mouse: MouseData,
    /// `deltaX`/`deltaY`, falling back to negated legacy wheel deltas.
    pub delta: Vec2,
    /// `deltaZ`.
    pub delta_z: f64,
    /// `deltaMode`.
    pub delta_mode: u32,
}

impl WheelData {
    pub(crate) fn delta_from_native(native: &NativeEvent) -> Vec2 {
        if let Some(d) = native.delta {
            return d;
        }
        let x = native.wheel_delta.map_or(0.0, |w| -w.x);
        let y = match (native.wheel_delta, native.wheel_delta_scalar) {
            (Some(w), _) => -w.y,
            (None, Some(s)) => -s,
            (None, None) => 0.0,
        };
        Vec2::new(x, y)
    }
}

/// Clipboard events.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipboardData {
    /// Clipboard payload.
    pub clipboard_data: Option<String>,
}

/// Composition and before-input events.
#[derive(Clone, Debug, PartialEq)]
pub struct TextData {
    /// Text being composed or inserted.
    pub data: Option<String>,
}

/// Animation events.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationData {
    /// Animation name.
    pub animation_name: String,
    /// Seconds since the animation started.
    pub elapsed_time: f64,
    /// Pseudo element the animation runs on.
    pub pseudo_element: String,
}

/// Transition events.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionData {
    /// Transitioned property.
    pub property_name: String,
    /// Seconds since the transition started.
    pub elapsed_time: f64,
    /// Pseudo element the transition runs on.
    pub pseudo_element: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_polyfill_tracks_screen_delta() {
        let mut tracker = MovementTracker::default();
        let first = Rc::new(NativeEvent::new("mousemove", None).at(Point::new(10.0, 10.0)));
        assert_eq!(tracker.observe(&first), Vec2::ZERO);
        let second = Rc::new(NativeEvent::new("mousemove", None).at(Point::new(15.0, 7.0)));
        assert_eq!(tracker.observe(&second), Vec2::new(5.0, -3.0));
        // Same event again is stable.
        assert_eq!(tracker.observe(&second), Vec2::new(5.0, -3.0));
        let down = Rc::new(NativeEvent::new("mousedown", None).at(Point::new(40.0, 40.0)));
        assert_eq!(tracker.observe(&down), Vec2::ZERO);
    }

    #[test]
    fn native_movement_wins() {
        let mut tracker = MovementTracker::default();
        let mut ev = NativeEvent::new("mousemove", None);
        ev.movement = Some(Vec2::new(1.0, 2.0));
        let data = MouseData::from_native(&Rc::new(ev), &mut tracker);
        assert_eq!(data.movement, Vec2::new(1.0, 2.0));
    }

    #[test]
    fn wheel_delta_fallbacks() {
        let mut ev = NativeEvent::new("wheel", None);
        ev.wheel_delta = Some(Vec2::new(120.0, -240.0));
        assert_eq!(WheelData::delta_from_native(&ev), Vec2::new(-120.0, 240.0));
        let mut ev = NativeEvent::new("wheel", None);
        ev.wheel_delta_scalar = Some(120.0);
        assert_eq!(WheelData::delta_from_native(&ev), Vec2::new(0.0, -120.0));
        let mut ev = NativeEvent::new("wheel", None);
        ev.delta = Some(Vec2::new(3.0, 4.0));
        assert_eq!(WheelData::delta_from_native(&ev), Vec2::new(3.0, 4.0));
    }

    #[test]
    fn keyboard_codes_depend_on_type() {
        let down = KeyboardData::from_native(&NativeEvent::new("keydown", None).with_key(Some("a"), 65));
        assert_eq!((down.char_code, down.key_code, down.which), (0, 65, 65));
        let press = KeyboardData::from_native(&NativeEvent::new("keypress", None).with_char_code(97));
        assert_eq!((press.char_code, press.key_code, press.which), (97, 0, 97));
        assert_eq!(press.key, "a");
    }
}
