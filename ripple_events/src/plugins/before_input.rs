// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composition and before-input plugin.
//!
//! ## Overview
//!
//! Produces `onCompositionStart`/`onCompositionUpdate`/`onCompositionEnd` and a
//! best-effort `onBeforeInput` carrying the inserted text.
//!
//! ## Composition
//!
//! Native composition events map one to one when the platform has them. Otherwise a
//! `keydown` with key code 229 starts a composition and any key that commits it
//! (`keyup` of Tab/Enter/Escape/Space, a different `keydown`, `keypress`, `mousedown`,
//! `focusout`) ends it.
//!
//! Where composition data is unreliable, the text of the target is snapshotted when
//! the composition starts and the inserted text is recovered by stripping the common
//! prefix and suffix from the text when it ends. Korean IMEs report correct data and
//! skip the diff.
//!
//! ## Before input
//!
//! With `textInput` available, its data is used (a space is taken from the `keypress`
//! instead, since some engines drop it). Otherwise characters come from `keypress`,
//! ignoring command chords, and from the end of a composition.

use ripple_dom::{Document, NativeEvent, NodeId};

use crate::accumulate::accumulate_two_phase_listeners;
use crate::error::DispatchError;
use crate::registry::EventRegistry;
use crate::synthetic::EventFamily;
use crate::synthetic::keys::from_char_code;
use crate::types::{DispatchEntry, DispatchQueue};

use super::{EventPlugin, ExtractArgs, ExtractContext};

/// Key codes that commit a fallback composition on `keyup`: Tab, Enter, Escape, Space.
const END_KEYCODES: [u32; 4] = [9, 13, 27, 32];
/// Key code reported while an IME is composing.
const START_KEYCODE: u32 = 229;
const SPACEBAR_CODE: u32 = 32;
const SPACEBAR_CHAR: &str = " ";

/// Text snapshot for deriving composition data by diffing.
#[derive(Debug, Default)]
struct FallbackCompositionState {
    root: Option<NodeId>,
    start_text: String,
    fallback_text: Option<String>,
}

fn text_of(doc: &Document, node: NodeId) -> String {
    let has_value = ["input", "textarea", "select"]
        .iter()
        .any(|tag| doc.is_element_named(node, tag));
    if has_value {
        doc.value(node).unwrap_or_default().to_owned()
    } else {
        doc.text_content(node)
    }
}

impl FallbackCompositionState {
    fn initialize(&mut self, doc: &Document, root: NodeId) -> bool {
        self.root = Some(root);
        self.start_text = text_of(doc, root);
        self.fallback_text = None;
        true
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    /// Text inserted since [`initialize`](Self::initialize).
    fn data(&mut self, doc: &Document) -> String {
        if let Some(text) = self.fallback_text.as_ref().filter(|t| !t.is_empty()) {
            return text.clone();
        }
        let Some(root) = self.root else {
            return String::new();
        };
        let start: Vec<char> = self.start_text.chars().collect();
        let end: Vec<char> = text_of(doc, root).chars().collect();

        let prefix = start
            .iter()
            .zip(&end)
            .take_while(|(a, b)| a == b)
            .count();
        let max_suffix = start.len() - prefix;
        let suffix = start
            .iter()
            .rev()
            .zip(end.iter().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a == b)
            .count();
        let stop = end.len().saturating_sub(suffix).max(prefix);
        let text: String = end[prefix..stop].iter().collect();
        self.fallback_text = Some(text.clone());
        text
    }
}

fn is_keypress_command(native: &NativeEvent) -> bool {
    use ripple_dom::Modifiers;
    let m = native.modifiers;
    m.intersects(Modifiers::CONTROL | Modifiers::ALT | Modifiers::META)
        && !m.contains(Modifiers::CONTROL | Modifiers::ALT)
}

fn composition_event_type(dom_event_name: &str) -> Option<&'static str> {
    match dom_event_name {
        "compositionstart" => Some("onCompositionStart"),
        "compositionend" => Some("onCompositionEnd"),
        "compositionupdate" => Some("onCompositionUpdate"),
        _ => None,
    }
}

fn is_fallback_composition_start(dom_event_name: &str, native: &NativeEvent) -> bool {
    dom_event_name == "keydown" && native.key_code == START_KEYCODE
}

fn is_fallback_composition_end(dom_event_name: &str, native: &NativeEvent) -> bool {
    match dom_event_name {
        "keyup" => END_KEYCODES.contains(&native.key_code),
        // Any other keydown while composing means the IME let go.
        "keydown" => native.key_code != START_KEYCODE,
        "keypress" | "mousedown" | "focusout" => true,
        _ => false,
    }
}

fn is_using_korean_ime(native: &NativeEvent) -> bool {
    native.locale.as_deref() == Some("ko")
}

/// Produces composition events and `onBeforeInput`.
#[derive(Debug, Default)]
pub(crate) struct BeforeInputEventPlugin {
    is_composing: bool,
    has_space_keypress: bool,
    fallback: FallbackCompositionState,
}

impl BeforeInputEventPlugin {
    fn extract_composition_event(
        &mut self,
        ctx: &mut ExtractContext<'_>,
        args: &ExtractArgs<'_>,
        queue: &mut DispatchQueue,
    ) -> Result<(), DispatchError> {
        let config = ctx.view.config;
        let name = args.dom_event_name;
        let native: &NativeEvent = args.native;
        let event_type = if config.can_use_composition_event() {
            composition_event_type(name)
        } else if !self.is_composing {
            is_fallback_composition_start(name, native).then_some("onCompositionStart")
        } else if is_fallback_composition_end(name, native) {
            Some("onCompositionEnd")
        } else {
            None
        };
        let Some(event_type) = event_type else {
            return Ok(());
        };

        let mut fallback_data = None;
        if config.use_fallback_composition_data() && !is_using_korean_ime(native) {
            if !self.is_composing && event_type == "onCompositionStart" {
                self.is_composing = self.fallback.initialize(ctx.view.doc, args.native_target);
            } else if event_type == "onCompositionEnd" && self.is_composing {
                fallback_data = Some(self.fallback.data(ctx.view.doc));
            }
        }

        let listeners = accumulate_two_phase_listeners(&ctx.view, args.target_inst, event_type)?;
        if !listeners.is_empty() {
            let mut event = ctx.synthetic(
                Some(event_type),
                name,
                EventFamily::Composition,
                args.target_inst,
                args,
            );
            match fallback_data.filter(|d| !d.is_empty()) {
                Some(data) => event.set_text(Some(data)),
                None => {
                    if let Some(custom) = &native.custom_data {
                        event.set_text(Some(custom.clone()));
                    }
                }
            }
            queue.push(DispatchEntry { event, listeners });
        }
        Ok(())
    }

    fn native_before_input_chars(&mut self, name: &str, native: &NativeEvent) -> Option<String> {
        match name {
            "compositionend" => native.custom_data.clone(),
            "keypress" => {
                // Some engines drop the space from `textInput`; take it from here.
                if native.which != SPACEBAR_CODE {
                    return None;
                }
                self.has_space_keypress = true;
                Some(SPACEBAR_CHAR.to_owned())
            }
            "textInput" => {
                let chars = native.data.clone();
                if chars.as_deref() == Some(SPACEBAR_CHAR) && self.has_space_keypress {
                    return None;
                }
                chars
            }
            _ => None,
        }
    }

    fn fallback_before_input_chars(
        &mut self,
        ctx: &ExtractContext<'_>,
        name: &str,
        native: &NativeEvent,
    ) -> Option<String> {
        let config = ctx.view.config;
        if self.is_composing {
            let ends = name == "compositionend"
                || (!config.can_use_composition_event()
                    && is_fallback_composition_end(name, native));
            if ends {
                let chars = self.fallback.data(ctx.view.doc);
                self.fallback.reset();
                self.is_composing = false;
                return Some(chars);
            }
            return None;
        }
        match name {
            // Pasting is reported by `input`, not here.
            "paste" => None,
            "keypress" => {
                if is_keypress_command(native) {
                    return None;
                }
                if let Some(ch) = native.legacy_char.as_ref().filter(|c| c.chars().count() > 1) {
                    return Some(ch.clone());
                }
                (native.which != 0).then(|| from_char_code(native.which))
            }
            "compositionend" => {
                if config.use_fallback_composition_data() && !is_using_korean_ime(native) {
                    None
                } else {
                    native.data.clone()
                }
            }
            _ => None,
        }
    }

    fn extract_before_input_event(
        &mut self,
        ctx: &mut ExtractContext<'_>,
        args: &ExtractArgs<'_>,
        queue: &mut DispatchQueue,
    ) -> Result<(), DispatchError> {
        let native: &NativeEvent = args.native;
        let chars = if ctx.view.config.can_use_text_input_event() {
            self.native_before_input_chars(args.dom_event_name, native)
        } else {
            self.fallback_before_input_chars(ctx, args.dom_event_name, native)
        };
        let Some(chars) = chars.filter(|c| !c.is_empty()) else {
            return Ok(());
        };
        let listeners = accumulate_two_phase_listeners(&ctx.view, args.target_inst, "onBeforeInput")?;
        if !listeners.is_empty() {
            let mut event = ctx.synthetic(
                Some("onBeforeInput"),
                "beforeinput",
                EventFamily::Input,
                args.target_inst,
                args,
            );
            event.set_text(Some(chars));
            queue.push(DispatchEntry { event, listeners });
        }
        Ok(())
    }
}

impl EventPlugin for BeforeInputEventPlugin {
    fn name(&self) -> &'static str {
        "before_input"
    }

    fn register_events(&self, registry: &mut EventRegistry) {
        registry.register_two_phase(
            "onBeforeInput",
            &["compositionend", "keypress", "textInput", "paste"],
        );
        for (name, own) in [
            ("onCompositionEnd", "compositionend"),
            ("onCompositionStart", "compositionstart"),
            ("onCompositionUpdate", "compositionupdate"),
        ] {
            registry.register_two_phase(
                name,
                &[own, "focusout", "keydown", "keypress", "keyup", "mousedown"],
            );
        }
    }

    fn extract_events(
        &mut self,
        ctx: &mut ExtractContext<'_>,
        _registry: &EventRegistry,
        args: &ExtractArgs<'_>,
        queue: &mut DispatchQueue,
    ) -> Result<(), DispatchError> {
        self.extract_composition_event(ctx, args, queue)?;
        self.extract_before_input_event(ctx, args, queue)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use ripple_dom::{Document, Modifiers, NativeEvent, PlatformFeatures};

    use super::super::Plugins;
    use super::super::test_support::*;
    use super::*;
    use crate::props::Props;
    use crate::types::EventSystemFlags;

    fn text_props(log: &Rc<RefCell<Vec<String>>>) -> Props {
        let before = log.clone();
        let end = log.clone();
        Props::new()
            .on("onBeforeInput", move |ev| {
                before
                    .borrow_mut()
                    .push(format!("before:{}", ev.text().unwrap_or_default()));
                Ok(())
            })
            .on("onCompositionEnd", move |ev| {
                end.borrow_mut()
                    .push(format!("end:{}", ev.text().unwrap_or_default()));
                Ok(())
            })
            .with("onCompositionStart", logging(log, "start"))
    }

    fn run(queue: &mut DispatchQueue) {
        for entry in queue.iter_mut() {
            for l in &entry.listeners {
                (l.listener)(&mut entry.event).unwrap();
            }
        }
    }

    #[test]
    fn diff_strips_common_prefix_and_suffix() {
        let mut doc = Document::new();
        let input = doc.create_element("input");
        doc.set_value(input, "ab|cd");
        let mut state = FallbackCompositionState::default();
        assert!(state.initialize(&doc, input));
        doc.set_value(input, "ab|xyz|cd");
        assert_eq!(state.data(&doc), "xyz|");
        state.reset();
        doc.set_value(input, "");
        state.initialize(&doc, input);
        doc.set_value(input, "한글");
        assert_eq!(state.data(&doc), "한글");
    }

    #[test]
    fn keypress_commands_are_not_text() {
        let plain = NativeEvent::new("keypress", None);
        assert!(!is_keypress_command(&plain));
        let ctrl = NativeEvent::new("keypress", None).with_modifiers(Modifiers::CONTROL);
        assert!(is_keypress_command(&ctrl));
        let alt_gr =
            NativeEvent::new("keypress", None).with_modifiers(Modifiers::CONTROL | Modifiers::ALT);
        assert!(!is_keypress_command(&alt_gr));
    }

    #[test]
    fn native_composition_events_map_directly() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut fx = PluginFixture::new();
        let root = fx.root;
        let input = fx.host(root, "input", text_props(&log));
        let node = fx.node(input);
        let mut plugins = Plugins::default();

        let mut start = fx.extract(
            &mut plugins,
            NativeEvent::new("compositionstart", Some(node)),
            EventSystemFlags::empty(),
        );
        assert_eq!(names(&start), vec!["onCompositionStart"]);
        run(&mut start);

        let mut end_event = NativeEvent::new("compositionend", Some(node));
        end_event.custom_data = Some("ni".to_owned());
        end_event.data = Some("ni".to_owned());
        let mut end = fx.extract(&mut plugins, end_event, EventSystemFlags::empty());
        // Modern engines: no textInput, so before-input falls back to composition data.
        assert_eq!(names(&end), vec!["onCompositionEnd", "onBeforeInput"]);
        run(&mut end);
        assert_eq!(
            *log.borrow(),
            vec!["start:compositionstart", "end:ni", "before:ni"]
        );
    }

    #[test]
    fn keypress_produces_before_input() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut fx = PluginFixture::new();
        let root = fx.root;
        let input = fx.host(root, "input", text_props(&log));
        let node = fx.node(input);
        let mut plugins = Plugins::default();
        let mut queue = fx.extract(
            &mut plugins,
            NativeEvent::new("keypress", Some(node)).with_char_code(97),
            EventSystemFlags::empty(),
        );
        assert_eq!(names(&queue), vec!["onBeforeInput"]);
        run(&mut queue);
        assert_eq!(*log.borrow(), vec!["before:a"]);

        let command = fx.extract(
            &mut plugins,
            NativeEvent::new("keypress", Some(node))
                .with_char_code(97)
                .with_modifiers(Modifiers::META),
            EventSystemFlags::empty(),
        );
        assert!(command.is_empty());
    }

    #[test]
    fn fallback_composition_diffs_text() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut fx = PluginFixture::with_doc(Document::with_features(PlatformFeatures::legacy(10)));
        // Legacy document modes have no `textInput`; keep this engine on the keypress path.
        let root = fx.root;
        let input = fx.host(root, "input", text_props(&log));
        let node = fx.node(input);
        fx.doc.set_value(node, "hi ");
        let mut plugins = Plugins::default();

        let mut start = fx.extract(
            &mut plugins,
            NativeEvent::new("keydown", Some(node)).with_key(None, START_KEYCODE),
            EventSystemFlags::empty(),
        );
        assert_eq!(names(&start), vec!["onCompositionStart"]);
        run(&mut start);

        fx.doc.set_value(node, "hi 日本");
        let mut end = fx.extract(
            &mut plugins,
            NativeEvent::new("keyup", Some(node)).with_key(None, 13),
            EventSystemFlags::empty(),
        );
        assert_eq!(names(&end), vec!["onCompositionEnd", "onBeforeInput"]);
        run(&mut end);
        assert_eq!(
            *log.borrow(),
            vec!["start:keydown", "end:日本", "before:日本"]
        );
        assert!(!plugins.before_input.is_composing);
    }

    #[test]
    fn korean_ime_skips_fallback_data() {
        let mut fx = PluginFixture::with_doc(Document::with_features(PlatformFeatures::legacy(10)));
        let root = fx.root;
        let input = fx.host(root, "input", Props::new().on("onCompositionStart", |_| Ok(())));
        let node = fx.node(input);
        let mut plugins = Plugins::default();
        let queue = fx.extract(
            &mut plugins,
            NativeEvent::new("keydown", Some(node))
                .with_key(None, START_KEYCODE)
                .with_locale("ko"),
            EventSystemFlags::empty(),
        );
        assert_eq!(names(&queue), vec!["onCompositionStart"]);
        assert!(!plugins.before_input.is_composing);
    }
}
