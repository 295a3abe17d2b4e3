// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change plugin: one `onChange` per user edit, whatever the control.
//!
//! ## Overview
//!
//! The native event that signals an edit depends on the control:
//!
//! - `select` and file inputs: native `change`.
//! - Text inputs and textareas: native `input` (or `change`), filtered through the
//!   value tracker so programmatic writes do not count.
//! - Checkboxes and radios: `click`, filtered the same way.
//!
//! Engines without a native `input` event get a polyfill: while a text control is
//! focused it is watched for `propertychange`, and `selectionchange`/`keyup`/`keydown`
//! re-check its value.
//!
//! Every produced event marks its target for controlled-state restoration.

use ripple_dom::NodeId;

use crate::accumulate::accumulate_two_phase_listeners;
use crate::error::DispatchError;
use crate::fiber::FiberId;
use crate::registry::EventRegistry;
use crate::synthetic::EventFamily;
use crate::types::{DispatchEntry, DispatchQueue};

use super::{EventPlugin, ExtractArgs, ExtractContext, HostEffect, is_text_input_element};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Strategy {
    Change,
    InputOrChange,
    Polyfill,
    Click,
}

fn strategy_for(ctx: &ExtractContext<'_>, node: NodeId) -> Option<Strategy> {
    let doc = ctx.view.doc;
    let input_type = doc.input_type(node);
    if doc.is_element_named(node, "select") || input_type.as_deref() == Some("file") {
        return Some(Strategy::Change);
    }
    if is_text_input_element(doc, node) {
        let features = ctx.view.config.features;
        let input_supported =
            features.input_event && features.document_mode.is_none_or(|mode| mode > 9);
        return Some(if input_supported {
            Strategy::InputOrChange
        } else {
            Strategy::Polyfill
        });
    }
    if matches!(input_type.as_deref(), Some("checkbox" | "radio")) {
        return Some(Strategy::Click);
    }
    None
}

/// Produces `onChange` and runs the `input` polyfill.
#[derive(Debug, Default)]
pub(crate) struct ChangeEventPlugin {
    active_element: Option<NodeId>,
    active_element_inst: Option<FiberId>,
}

impl ChangeEventPlugin {
    /// Element currently watched by the polyfill.
    pub(crate) fn watched_element(&self) -> Option<NodeId> {
        self.active_element
    }

    fn start_watching(&mut self, ctx: &mut ExtractContext<'_>, node: NodeId, inst: Option<FiberId>) {
        self.active_element = Some(node);
        self.active_element_inst = inst;
        ctx.effects.push(HostEffect::WatchPropertyChange(node));
    }

    fn stop_watching(&mut self, ctx: &mut ExtractContext<'_>) {
        if let Some(node) = self.active_element.take() {
            ctx.effects.push(HostEffect::UnwatchPropertyChange(node));
        }
        self.active_element_inst = None;
    }

    /// Forget the watched element without requesting a detach, for teardown.
    pub(crate) fn forget(&mut self, node: NodeId) {
        if self.active_element == Some(node) {
            self.active_element = None;
            self.active_element_inst = None;
        }
    }

    /// `propertychange` on the watched element: dispatch a change if its value moved.
    pub(crate) fn handle_property_change(
        &mut self,
        ctx: &mut ExtractContext<'_>,
        args: &ExtractArgs<'_>,
        queue: &mut DispatchQueue,
    ) -> Result<(), DispatchError> {
        if args.native.property_name != "value" {
            return Ok(());
        }
        if let Some(inst) = ctx.inst_if_value_changed(self.active_element_inst) {
            create_and_accumulate_change_event(ctx, queue, inst, args)?;
        }
        Ok(())
    }

    fn handle_controlled_input_blur(ctx: &mut ExtractContext<'_>, node: NodeId) {
        let doc = ctx.view.doc;
        if doc.input_type(node).as_deref() != Some("number") {
            return;
        }
        let controlled = ctx
            .view
            .nodes
            .fiber_props(node)
            .is_some_and(|p| p.has("value"));
        // A focused number input keeps its default value so typing is not disturbed.
        if !controlled || doc.active_element() == Some(node) {
            return;
        }
        let value = doc.value(node).unwrap_or_default().to_owned();
        ctx.effects.push(HostEffect::SetDefaultValue(node, value));
    }
}

fn create_and_accumulate_change_event(
    ctx: &mut ExtractContext<'_>,
    queue: &mut DispatchQueue,
    inst: FiberId,
    args: &ExtractArgs<'_>,
) -> Result<(), DispatchError> {
    ctx.restore.enqueue(args.native_target);
    let listeners = accumulate_two_phase_listeners(&ctx.view, Some(inst), "onChange")?;
    if !listeners.is_empty() {
        let event = ctx.synthetic(Some("onChange"), "change", EventFamily::Base, Some(inst), args);
        queue.push(DispatchEntry { event, listeners });
    }
    Ok(())
}

impl EventPlugin for ChangeEventPlugin {
    fn name(&self) -> &'static str {
        "change"
    }

    fn register_events(&self, registry: &mut EventRegistry) {
        registry.register_two_phase(
            "onChange",
            &[
                "change",
                "click",
                "focusin",
                "focusout",
                "input",
                "keydown",
                "keyup",
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
        let name = args.dom_event_name;
        let target_node = ctx.node_or_window(args.target_inst);
        let strategy = strategy_for(ctx, target_node);

        let inst = match strategy {
            Some(Strategy::Change) if name == "change" => args.target_inst,
            Some(Strategy::InputOrChange) if name == "input" || name == "change" => {
                ctx.inst_if_value_changed(args.target_inst)
            }
            Some(Strategy::Polyfill)
                if matches!(name, "selectionchange" | "keyup" | "keydown") =>
            {
                // Keys fire before the value updates, so check the watched element.
                ctx.inst_if_value_changed(self.active_element_inst)
            }
            Some(Strategy::Click) if name == "click" => ctx.inst_if_value_changed(args.target_inst),
            _ => None,
        };
        if let Some(inst) = inst {
            return create_and_accumulate_change_event(ctx, queue, inst, args);
        }

        if strategy == Some(Strategy::Polyfill) {
            match name {
                "focusin" => {
                    self.stop_watching(ctx);
                    self.start_watching(ctx, target_node, args.target_inst);
                }
                "focusout" => self.stop_watching(ctx),
                _ => {}
            }
        }
        if name == "focusout" {
            Self::handle_controlled_input_blur(ctx, target_node);
        }
        Ok(())
    }
}
