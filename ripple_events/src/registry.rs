// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event registry: native event names, handler prop names, and priorities.
//!
//! ## Overview
//!
//! The registry answers three questions:
//!
//! - Which native events back a handler prop (`onChange` → `change`, `click`, `input`, ...).
//! - Which handler prop the simple plugin maps a native event to (`dblclick` → `onDoubleClick`).
//! - How urgent a native event is ([`EventPriority`]).
//!
//! It is an owned value built once by [`EventRegistry::init`]. Each event system holds
//! its own, so independent systems (and tests) never share registration state.
//!
//! ## Registration
//!
//! [`EventRegistry::register_two_phase`] registers `name` and `name + "Capture"`.
//! [`EventRegistry::register_direct`] registers a single name, for synthetic-only
//! events such as `onMouseEnter` that have no capture variant.
//! Registering the same name twice logs a warning and the later registration wins.

use std::collections::{BTreeSet, HashMap};

use crate::plugins;
use crate::types::EventPriority;

/// Discrete native events with a simple handler name.
const DISCRETE_PAIRS: &[(&str, &str)] = &[
    ("cancel", "cancel"),
    ("click", "click"),
    ("close", "close"),
    ("contextmenu", "contextMenu"),
    ("copy", "copy"),
    ("cut", "cut"),
    ("auxclick", "auxClick"),
    ("dblclick", "doubleClick"),
    ("dragend", "dragEnd"),
    ("dragstart", "dragStart"),
    ("drop", "drop"),
    ("focusin", "focus"),
    ("focusout", "blur"),
    ("input", "input"),
    ("invalid", "invalid"),
    ("keydown", "keyDown"),
    ("keypress", "keyPress"),
    ("keyup", "keyUp"),
    ("mousedown", "mouseDown"),
    ("mouseup", "mouseUp"),
    ("paste", "paste"),
    ("pause", "pause"),
    ("play", "play"),
    ("pointercancel", "pointerCancel"),
    ("pointerdown", "pointerDown"),
    ("pointerup", "pointerUp"),
    ("ratechange", "rateChange"),
    ("reset", "reset"),
    ("seeked", "seeked"),
    ("submit", "submit"),
    ("touchcancel", "touchCancel"),
    ("touchend", "touchEnd"),
    ("touchstart", "touchStart"),
    ("volumechange", "volumeChange"),
];

/// Discrete native events consumed only by the polyfill plugins.
const OTHER_DISCRETE: &[&str] = &[
    "change",
    "selectionchange",
    "textInput",
    "compositionstart",
    "compositionend",
    "compositionupdate",
];

const USER_BLOCKING_PAIRS: &[(&str, &str)] = &[
    ("drag", "drag"),
    ("dragenter", "dragEnter"),
    ("dragexit", "dragExit"),
    ("dragleave", "dragLeave"),
    ("dragover", "dragOver"),
    ("mousemove", "mouseMove"),
    ("mouseout", "mouseOut"),
    ("mouseover", "mouseOver"),
    ("pointermove", "pointerMove"),
    ("pointerout", "pointerOut"),
    ("pointerover", "pointerOver"),
    ("scroll", "scroll"),
    ("toggle", "toggle"),
    ("touchmove", "touchMove"),
    ("wheel", "wheel"),
];

const CONTINUOUS_PAIRS: &[(&str, &str)] = &[
    ("abort", "abort"),
    ("animationend", "animationEnd"),
    ("animationiteration", "animationIteration"),
    ("animationstart", "animationStart"),
    ("canplay", "canPlay"),
    ("canplaythrough", "canPlayThrough"),
    ("durationchange", "durationChange"),
    ("emptied", "emptied"),
    ("encrypted", "encrypted"),
    ("ended", "ended"),
    ("error", "error"),
    ("gotpointercapture", "gotPointerCapture"),
    ("load", "load"),
    ("loadeddata", "loadedData"),
    ("loadedmetadata", "loadedMetadata"),
    ("loadstart", "loadStart"),
    ("lostpointercapture", "lostPointerCapture"),
    ("playing", "playing"),
    ("progress", "progress"),
    ("seeking", "seeking"),
    ("stalled", "stalled"),
    ("suspend", "suspend"),
    ("timeupdate", "timeUpdate"),
    ("transitionend", "transitionEnd"),
    ("waiting", "waiting"),
];

/// Media element events. None of them bubble reliably.
pub const MEDIA_EVENT_TYPES: &[&str] = &[
    "abort",
    "canplay",
    "canplaythrough",
    "durationchange",
    "emptied",
    "encrypted",
    "ended",
    "error",
    "loadeddata",
    "loadedmetadata",
    "loadstart",
    "pause",
    "play",
    "playing",
    "progress",
    "ratechange",
    "seeked",
    "seeking",
    "stalled",
    "suspend",
    "timeupdate",
    "volumechange",
    "waiting",
];

const NON_DELEGATED_EXTRA: &[&str] = &["cancel", "close", "invalid", "load", "scroll", "toggle"];

/// True for events that must be attached on the element itself rather than the root.
pub fn is_non_delegated(dom_event_name: &str) -> bool {
    NON_DELEGATED_EXTRA.contains(&dom_event_name) || MEDIA_EVENT_TYPES.contains(&dom_event_name)
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Name tables for one event system.
#[derive(Debug, Clone)]
pub struct EventRegistry {
    all_native_events: BTreeSet<String>,
    registration_name_dependencies: HashMap<String, Vec<String>>,
    possible_registration_names: HashMap<String, String>,
    top_level_event_names: HashMap<String, String>,
    priorities: HashMap<String, EventPriority>,
    warn_on_duplicate: bool,
}

impl EventRegistry {
    /// An empty registry. Most callers want [`EventRegistry::init`].
    pub fn empty(warn_on_duplicate: bool) -> Self {
        Self {
            all_native_events: BTreeSet::new(),
            registration_name_dependencies: HashMap::new(),
            possible_registration_names: HashMap::new(),
            top_level_event_names: HashMap::new(),
            priorities: HashMap::new(),
            warn_on_duplicate,
        }
    }

    /// Build the registry with every plugin's registrations.
    ///
    /// Duplicate registrations are reported in debug builds.
    pub fn init() -> Self {
        Self::init_with(cfg!(debug_assertions))
    }

    /// Build the registry, choosing whether duplicate registrations are reported.
    pub fn init_with(warn_on_duplicate: bool) -> Self {
        let mut registry = Self::empty(warn_on_duplicate);
        plugins::register_all(&mut registry);
        registry
    }

    /// Register the simple native→handler mappings and all priorities.
    pub(crate) fn register_simple_events(&mut self) {
        for (pairs, priority) in [
            (DISCRETE_PAIRS, EventPriority::Discrete),
            (USER_BLOCKING_PAIRS, EventPriority::UserBlocking),
            (CONTINUOUS_PAIRS, EventPriority::Continuous),
        ] {
            for (native, name) in pairs {
                let react_name = format!("on{}", capitalize(name));
                self.priorities.insert((*native).to_owned(), priority);
                self.top_level_event_names
                    .insert((*native).to_owned(), react_name.clone());
                self.register_two_phase(&react_name, &[native]);
            }
        }
        for native in OTHER_DISCRETE {
            self.priorities
                .insert((*native).to_owned(), EventPriority::Discrete);
        }
    }

    /// Register `name` and `name + "Capture"` backed by `dependencies`.
    pub fn register_two_phase(&mut self, name: &str, dependencies: &[&str]) {
        self.register_direct(name, dependencies);
        self.register_direct(&format!("{name}Capture"), dependencies);
    }

    /// Register a single-phase handler name backed by `dependencies`.
    pub fn register_direct(&mut self, name: &str, dependencies: &[&str]) {
        if self.warn_on_duplicate && self.registration_name_dependencies.contains_key(name) {
            tracing::warn!(
                registration_name = name,
                "more than one plugin attempted to publish the same registration name"
            );
        }
        self.registration_name_dependencies.insert(
            name.to_owned(),
            dependencies.iter().map(|d| (*d).to_owned()).collect(),
        );
        let lower = name.to_ascii_lowercase();
        self.possible_registration_names
            .insert(lower, name.to_owned());
        if name == "onDoubleClick" {
            self.possible_registration_names
                .insert("ondblclick".to_owned(), name.to_owned());
        }
        for dep in dependencies {
            self.all_native_events.insert((*dep).to_owned());
        }
    }

    /// Every native event some handler depends on, in a stable order.
    pub fn all_native_events(&self) -> impl Iterator<Item = &str> + '_ {
        self.all_native_events.iter().map(String::as_str)
    }

    /// Native events backing a handler name.
    pub fn dependencies(&self, registration_name: &str) -> Option<&[String]> {
        self.registration_name_dependencies
            .get(registration_name)
            .map(Vec::as_slice)
    }

    /// Correctly cased handler name for a lowercased prop name (`"onclick"` → `"onClick"`).
    pub fn registration_name_for(&self, lowercase: &str) -> Option<&str> {
        self.possible_registration_names
            .get(lowercase)
            .map(String::as_str)
    }

    /// Handler name the simple plugin uses for a native event.
    pub fn react_name(&self, dom_event_name: &str) -> Option<&str> {
        self.top_level_event_names
            .get(dom_event_name)
            .map(String::as_str)
    }

    /// Static priority of a native event. Unknown events are continuous.
    pub fn priority(&self, dom_event_name: &str) -> EventPriority {
        self.priorities
            .get(dom_event_name)
            .copied()
            .unwrap_or(EventPriority::Continuous)
    }
}
