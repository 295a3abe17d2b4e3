// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Select plugin: `onSelect` whenever the selection inside a focused text control moves.
//!
//! ## Overview
//!
//! Platforms fire `select` inconsistently, so this plugin polls instead. Focus on a
//! text input, textarea, or editable element makes it the tracked element. On
//! `mouseup`, `contextmenu`, `dragend`, `keydown`, `keyup`, and `selectionchange`, the
//! current selection is compared with the last one seen, and a change produces an
//! event targeted at the tracked element. Nothing fires while a mouse button is held.

use ripple_dom::{Document, NodeId, TextRange, WindowSelection};

use crate::accumulate::accumulate_two_phase_listeners;
use crate::error::DispatchError;
use crate::fiber::FiberId;
use crate::registry::EventRegistry;
use crate::synthetic::EventFamily;
use crate::types::{DispatchEntry, DispatchQueue};

use super::{EventPlugin, ExtractArgs, ExtractContext, is_text_input_element};

/// A selection snapshot, compared field by field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum SelectionSnapshot {
    /// Offsets inside a text control.
    Range(TextRange),
    /// Document selection, for editable elements.
    Window(Option<WindowSelection>),
}

fn has_selection_capabilities(doc: &Document, node: NodeId) -> bool {
    match doc.input_type(node).as_deref() {
        Some(ty) => matches!(ty, "text" | "search" | "tel" | "url" | "password"),
        None => doc.is_element_named(node, "textarea") || doc.is_content_editable(node),
    }
}

fn selection_of(doc: &Document, node: NodeId) -> SelectionSnapshot {
    let is_control = doc.is_element_named(node, "input") || doc.is_element_named(node, "textarea");
    if is_control && has_selection_capabilities(doc, node) {
        SelectionSnapshot::Range(doc.selection_range(node).unwrap_or_default())
    } else {
        SelectionSnapshot::Window(doc.window_selection())
    }
}

/// Polls selections of the focused text control.
#[derive(Debug, Default)]
pub(crate) struct SelectEventPlugin {
    active_element: Option<NodeId>,
    active_element_inst: Option<FiberId>,
    last_selection: Option<SelectionSnapshot>,
    mouse_down: bool,
}

impl SelectEventPlugin {
    fn construct_select_event(
        &mut self,
        ctx: &mut ExtractContext<'_>,
        args: &ExtractArgs<'_>,
        queue: &mut DispatchQueue,
    ) -> Result<(), DispatchError> {
        let doc = ctx.view.doc;
        let Some(active) = self.active_element else {
            return Ok(());
        };
        if self.mouse_down || doc.active_element() != Some(active) {
            return Ok(());
        }
        let current = selection_of(doc, active);
        if self.last_selection == Some(current) {
            return Ok(());
        }
        self.last_selection = Some(current);
        let listeners = accumulate_two_phase_listeners(&ctx.view, self.active_element_inst, "onSelect")?;
        if !listeners.is_empty() {
            let mut event = ctx.synthetic(
                Some("onSelect"),
                "select",
                EventFamily::Base,
                self.active_element_inst,
                args,
            );
            event.set_target(Some(active));
            queue.push(DispatchEntry { event, listeners });
        }
        Ok(())
    }
}

impl EventPlugin for SelectEventPlugin {
    fn name(&self) -> &'static str {
        "select"
    }

    fn register_events(&self, registry: &mut EventRegistry) {
        registry.register_two_phase(
            "onSelect",
            &[
                "focusout",
                "contextmenu",
                "dragend",
                "focusin",
                "keydown",
                "keyup",
                "mousedown",
                "mouseup",
                "selectionchange",
            ],
        );
    }

    fn extract_events(
        &mut self,
        ctx: &mut ExtractContext<'_>,
        _registry: &EventRegistry,
        args: &ExtractArgs<'_>,
        queue: &mut DispatchQueue,
    ) -> Result<(), DispatchError> {
        match args.dom_event_name {
            "focusin" => {
                let node = ctx.node_or_window(args.target_inst);
                let doc = ctx.view.doc;
                if is_text_input_element(doc, node) || doc.is_content_editable(node) {
                    self.active_element = Some(node);
                    self.active_element_inst = args.target_inst;
                    self.last_selection = None;
                }
            }
            "focusout" => {
                self.active_element = None;
                self.active_element_inst = None;
                self.last_selection = None;
            }
            // Selection moves during a drag; wait for the button to come up.
            "mousedown" => self.mouse_down = true,
            "contextmenu" | "mouseup" | "dragend" => {
                self.mouse_down = false;
                self.construct_select_event(ctx, args, queue)?;
            }
            // Old engines fire `selectionchange` too early to be useful.
            "selectionchange" if ctx.view.config.features.document_mode.is_some_and(|m| m <= 11) => {}
            "selectionchange" | "keydown" | "keyup" => {
                self.construct_select_event(ctx, args, queue)?;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ripple_dom::{NativeEvent, WindowSelection};

    use super::super::Plugins;
    use super::super::test_support::*;
    use crate::props::Props;
    use crate::types::EventSystemFlags;

    #[test]
    fn fires_once_per_selection_change() {
        let mut fx = PluginFixture::new();
        let root = fx.root;
        let input = fx.host(root, "input", Props::new().on("onSelect", |_| Ok(())));
        let node = fx.node(input);
        let mut plugins = Plugins::default();
        fx.doc.focus(node);
        fx.doc.set_value(node, "hello");
        fx.extract(
            &mut plugins,
            NativeEvent::new("focusin", Some(node)),
            EventSystemFlags::empty(),
        );

        fx.doc.set_selection_range(node, 0, 2);
        let first = fx.extract(
            &mut plugins,
            NativeEvent::new("keyup", Some(node)),
            EventSystemFlags::empty(),
        );
        assert_eq!(names(&first), vec!["onSelect"]);
        assert_eq!(first[0].event.target(), Some(node));

        let same = fx.extract(
            &mut plugins,
            NativeEvent::new("keyup", Some(node)),
            EventSystemFlags::empty(),
        );
        assert!(same.is_empty());

        fx.doc.set_selection_range(node, 0, 4);
        let moved = fx.extract(
            &mut plugins,
            NativeEvent::new("selectionchange", Some(fx.doc.document())),
            EventSystemFlags::empty(),
        );
        assert_eq!(names(&moved), vec!["onSelect"]);
    }

    #[test]
    fn held_mouse_suppresses_until_mouseup() {
        let mut fx = PluginFixture::new();
        let root = fx.root;
        let area = fx.host(root, "textarea", Props::new().on("onSelect", |_| Ok(())));
        let node = fx.node(area);
        let mut plugins = Plugins::default();
        fx.doc.focus(node);
        fx.extract(
            &mut plugins,
            NativeEvent::new("focusin", Some(node)),
            EventSystemFlags::empty(),
        );
        fx.extract(
            &mut plugins,
            NativeEvent::new("mousedown", Some(node)),
            EventSystemFlags::empty(),
        );
        fx.doc.set_selection_range(node, 1, 3);
        let during = fx.extract(
            &mut plugins,
            NativeEvent::new("keydown", Some(node)),
            EventSystemFlags::empty(),
        );
        assert!(during.is_empty());
        let up = fx.extract(
            &mut plugins,
            NativeEvent::new("mouseup", Some(node)),
            EventSystemFlags::empty(),
        );
        assert_eq!(names(&up), vec!["onSelect"]);
    }

    #[test]
    fn editable_element_uses_window_selection() {
        let mut fx = PluginFixture::new();
        let root = fx.root;
        let div = fx.host(root, "div", Props::new().on("onSelect", |_| Ok(())));
        let node = fx.node(div);
        fx.doc.set_attribute(node, "contenteditable", "true");
        let text = fx.doc.create_text_node("abc");
        fx.doc.append_child(node, text);
        let mut plugins = Plugins::default();
        fx.doc.focus(node);
        fx.extract(
            &mut plugins,
            NativeEvent::new("focusin", Some(node)),
            EventSystemFlags::empty(),
        );
        fx.doc.set_window_selection(Some(WindowSelection {
            anchor_node: text,
            anchor_offset: 0,
            focus_node: text,
            focus_offset: 2,
        }));
        let queue = fx.extract(
            &mut plugins,
            NativeEvent::new("keyup", Some(node)),
            EventSystemFlags::empty(),
        );
        assert_eq!(names(&queue), vec!["onSelect"]);
    }

    #[test]
    fn unfocused_element_is_ignored() {
        let mut fx = PluginFixture::new();
        let root = fx.root;
        let input = fx.host(root, "input", Props::new().on("onSelect", |_| Ok(())));
        let node = fx.node(input);
        let mut plugins = Plugins::default();
        fx.extract(
            &mut plugins,
            NativeEvent::new("focusin", Some(node)),
            EventSystemFlags::empty(),
        );
        fx.doc.set_selection_range(node, 0, 1);
        let queue = fx.extract(
            &mut plugins,
            NativeEvent::new("keyup", Some(node)),
            EventSystemFlags::empty(),
        );
        assert!(queue.is_empty());
    }
}
