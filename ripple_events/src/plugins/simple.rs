// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pass-through plugin: one native event, one synthetic event of the same name.

use crate::accumulate::{
    accumulate_event_handle_non_managed_node_listeners, accumulate_single_phase_listeners,
};
use crate::error::DispatchError;
use crate::registry::EventRegistry;
use crate::synthetic::EventFamily;
use crate::synthetic::keys::event_char_code;
use crate::types::{DispatchEntry, DispatchQueue, EventSystemFlags};

use super::{EventPlugin, ExtractArgs, ExtractContext};

/// Event interface and synthetic type for a native event, or `None` to skip it.
fn classify<'a>(args: &ExtractArgs<'a>) -> Option<(EventFamily, &'a str)> {
    let name = args.dom_event_name;
    let family = match name {
        "keypress" if event_char_code(args.native) == 0 => return None,
        "keypress" | "keydown" | "keyup" => EventFamily::Keyboard,
        "focusin" => return Some((EventFamily::Focus, "focus")),
        "focusout" => return Some((EventFamily::Focus, "blur")),
        "beforeblur" | "afterblur" => EventFamily::Focus,
        // Firefox fires `click` for the secondary button on the document.
        "click" if args.native.button == 2 => return None,
        "click" | "auxclick" | "dblclick" | "mousedown" | "mousemove" | "mouseup"
        | "mouseout" | "mouseover" | "contextmenu" => EventFamily::Mouse,
        "drag" | "dragend" | "dragenter" | "dragexit" | "dragleave" | "dragover"
        | "dragstart" | "drop" => EventFamily::Drag,
        "touchcancel" | "touchend" | "touchmove" | "touchstart" => EventFamily::Touch,
        "animationend" | "animationiteration" | "animationstart" => EventFamily::Animation,
        "transitionend" => EventFamily::Transition,
        "scroll" => EventFamily::Ui,
        "wheel" => EventFamily::Wheel,
        "copy" | "cut" | "paste" => EventFamily::Clipboard,
        "gotpointercapture" | "lostpointercapture" | "pointercancel" | "pointerdown"
        | "pointermove" | "pointerout" | "pointerover" | "pointerup" => EventFamily::Pointer,
        _ => EventFamily::Base,
    };
    Some((family, name))
}

/// Maps native events through the registry's name table.
#[derive(Debug, Default)]
pub(crate) struct SimpleEventPlugin;

impl EventPlugin for SimpleEventPlugin {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn register_events(&self, registry: &mut EventRegistry) {
        registry.register_simple_events();
    }

    fn extract_events(
        &mut self,
        ctx: &mut ExtractContext<'_>,
        registry: &EventRegistry,
        args: &ExtractArgs<'_>,
        queue: &mut DispatchQueue,
    ) -> Result<(), DispatchError> {
        let Some(react_name) = registry.react_name(args.dom_event_name) else {
            return Ok(());
        };
        let Some((family, react_event_type)) = classify(args) else {
            return Ok(());
        };
        let in_capture_phase = args.in_capture_phase();
        let listeners = if ctx.view.config.enable_event_handle_api
            && args
                .flags
                .contains(EventSystemFlags::IS_EVENT_HANDLE_NON_MANAGED_NODE)
        {
            accumulate_event_handle_non_managed_node_listeners(
                &ctx.view,
                react_event_type,
                args.container,
                in_capture_phase,
            )
        } else {
            // Scroll does not bubble; only the target's own handler sees it.
            let target_only = !in_capture_phase && args.dom_event_name == "scroll";
            accumulate_single_phase_listeners(
                &ctx.view,
                args.target_inst,
                Some(react_name),
                &args.native.event_type,
                in_capture_phase,
                target_only,
            )?
        };
        if !listeners.is_empty() {
            let event = ctx.synthetic(
                Some(react_name),
                react_event_type,
                family,
                args.target_inst,
                args,
            );
            queue.push(DispatchEntry { event, listeners });
        }
        Ok(())
    }
}
