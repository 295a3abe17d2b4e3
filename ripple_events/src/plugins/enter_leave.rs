// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Enter/leave plugin.
//!
//! ## Overview
//!
//! Platforms fire `mouseover`/`mouseout` (and the pointer equivalents) on every
//! element boundary crossing, bubbling through shared ancestors. This plugin derives
//! non-bubbling `mouseenter`/`mouseleave` pairs from the `out` event alone:
//!
//! - `from` is the instance being left, `to` the instance owning `relatedTarget`.
//! - A `leave` fires on `from` and its ancestors, up to (excluding) their lowest
//!   common ancestor; an `enter` fires on `to`'s chain, outermost first.
//! - The `over` half of the pair is ignored when its related target is managed by
//!   the tree, since the matching `out` already produced both events. When the
//!   pointer arrives from outside the window there is no `out`, so the `over`
//!   produces the enter on its own.

use ripple_dom::NodeId;

use crate::accumulate::accumulate_enter_leave_two_phase_listeners;
use crate::error::DispatchError;
use crate::fiber::{FiberId, FiberKind};
use crate::registry::EventRegistry;
use crate::synthetic::EventFamily;
use crate::types::{DispatchQueue, EventSystemFlags};

use super::{EventPlugin, ExtractArgs, ExtractContext};

/// Derives enter and leave events from over/out pairs.
#[derive(Debug, Default)]
pub(crate) struct EnterLeaveEventPlugin;

impl EnterLeaveEventPlugin {
    fn related_is_managed(ctx: &ExtractContext<'_>, related: NodeId) -> bool {
        let view = &ctx.view;
        view.nodes
            .closest_instance(view.doc, view.fibers, related)
            .is_some()
            || view.nodes.is_container_marked_as_root(related)
    }

    /// Instance owning `related`, if it is a mounted host node.
    fn to_instance(ctx: &ExtractContext<'_>, related: NodeId) -> Option<FiberId> {
        let view = &ctx.view;
        let to = view.nodes.closest_instance(view.doc, view.fibers, related)?;
        let mounted = view.fibers.nearest_mounted(to);
        let is_host = matches!(
            view.fibers.kind(to),
            Some(FiberKind::HostComponent | FiberKind::HostText)
        );
        (mounted == Some(to) && is_host).then_some(to)
    }
}

impl EventPlugin for EnterLeaveEventPlugin {
    fn name(&self) -> &'static str {
        "enter_leave"
    }

    fn register_events(&self, registry: &mut EventRegistry) {
        registry.register_direct("onMouseEnter", &["mouseout", "mouseover"]);
        registry.register_direct("onMouseLeave", &["mouseout", "mouseover"]);
        registry.register_direct("onPointerEnter", &["pointerout", "pointerover"]);
        registry.register_direct("onPointerLeave", &["pointerout", "pointerover"]);
    }

    fn extract_events(
        &mut self,
        ctx: &mut ExtractContext<'_>,
        _registry: &EventRegistry,
        args: &ExtractArgs<'_>,
        queue: &mut DispatchQueue,
    ) -> Result<(), DispatchError> {
        let name = args.dom_event_name;
        let is_over = name == "mouseover" || name == "pointerover";
        let is_out = name == "mouseout" || name == "pointerout";
        if !is_over && !is_out {
            return Ok(());
        }
        if is_over
            && !args.flags.contains(EventSystemFlags::IS_REPLAYED)
            && let Some(related) = args.native.related_target
            && Self::related_is_managed(ctx, related)
        {
            return Ok(());
        }

        let (from, to) = if is_out {
            let to = args
                .native
                .related_target
                .and_then(|related| Self::to_instance(ctx, related));
            (args.target_inst, to)
        } else {
            (None, args.target_inst)
        };
        if from == to {
            return Ok(());
        }

        let (family, leave_name, enter_name, prefix) = if name.starts_with("pointer") {
            (
                EventFamily::Pointer,
                "onPointerLeave",
                "onPointerEnter",
                "pointer",
            )
        } else {
            (EventFamily::Mouse, "onMouseLeave", "onMouseEnter", "mouse")
        };

        let from_node = ctx.node_or_window(from);
        let to_node = ctx.node_or_window(to);

        let mut leave = ctx.synthetic(
            Some(leave_name),
            &format!("{prefix}leave"),
            family,
            from,
            args,
        );
        leave.set_target(Some(from_node));
        leave.set_related_target(Some(to_node));

        // Only the instance that owns the native target emits the enter; an
        // adjusted (portal) target would otherwise enter twice.
        let view = &ctx.view;
        let native_target_inst =
            view.nodes
                .closest_instance(view.doc, view.fibers, args.native_target);
        let enter = if native_target_inst == args.target_inst {
            let mut enter = ctx.synthetic(
                Some(enter_name),
                &format!("{prefix}enter"),
                family,
                to,
                args,
            );
            enter.set_target(Some(to_node));
            enter.set_related_target(Some(from_node));
            Some(enter)
        } else {
            None
        };

        accumulate_enter_leave_two_phase_listeners(&ctx.view, queue, leave, enter, from, to)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use ripple_dom::NativeEvent;

    use super::super::Plugins;
    use super::super::test_support::*;
    use crate::props::Props;
    use crate::types::EventSystemFlags;

    fn hover_props(log: &Rc<RefCell<Vec<String>>>, tag: &str) -> Props {
        Props::new()
            .with("onMouseEnter", logging(log, &format!("{tag}-enter")))
            .with("onMouseLeave", logging(log, &format!("{tag}-leave")))
    }

    fn run(queue: &mut crate::types::DispatchQueue) {
        for entry in queue.iter_mut() {
            for l in &entry.listeners {
                (l.listener)(&mut entry.event).unwrap();
            }
        }
    }

    #[test]
    fn sibling_transition_stops_at_common_ancestor() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut fx = PluginFixture::new();
        let root = fx.root;
        let parent = fx.host(root, "div", hover_props(&log, "parent"));
        let a = fx.host(parent, "div", hover_props(&log, "a"));
        let a_child = fx.host(a, "span", hover_props(&log, "a-child"));
        let b = fx.host(parent, "div", hover_props(&log, "b"));
        let a_node = fx.node(a_child);
        let b_node = fx.node(b);
        let mut plugins = Plugins::default();

        let mut queue = fx.extract(
            &mut plugins,
            NativeEvent::new("mouseout", Some(a_node)).with_related_target(Some(b_node)),
            EventSystemFlags::empty(),
        );
        assert_eq!(names(&queue), vec!["onMouseLeave", "onMouseEnter"]);
        assert_eq!(queue[0].event.target(), Some(a_node));
        assert_eq!(queue[0].event.related_target(), Some(b_node));
        assert_eq!(queue[1].event.target(), Some(b_node));
        run(&mut queue);
        assert_eq!(
            *log.borrow(),
            vec![
                "a-child-leave:mouseleave",
                "a-leave:mouseleave",
                "b-enter:mouseenter"
            ]
        );

        // The paired `over` is already covered by the `out`.
        let over = fx.extract(
            &mut plugins,
            NativeEvent::new("mouseover", Some(b_node)).with_related_target(Some(a_node)),
            EventSystemFlags::empty(),
        );
        assert!(over.is_empty());
    }

    #[test]
    fn entering_from_outside_the_window() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut fx = PluginFixture::new();
        let root = fx.root;
        let outer = fx.host(root, "div", hover_props(&log, "outer"));
        let inner = fx.host(outer, "div", hover_props(&log, "inner"));
        let node = fx.node(inner);
        let mut plugins = Plugins::default();
        let mut queue = fx.extract(
            &mut plugins,
            NativeEvent::new("mouseover", Some(node)),
            EventSystemFlags::empty(),
        );
        assert_eq!(names(&queue), vec!["onMouseEnter"]);
        assert_eq!(queue[0].event.related_target(), Some(fx.doc.window()));
        run(&mut queue);
        assert_eq!(
            *log.borrow(),
            vec!["outer-enter:mouseenter", "inner-enter:mouseenter"]
        );
    }

    #[test]
    fn pointer_variant_uses_pointer_names() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut fx = PluginFixture::new();
        let root = fx.root;
        let a = fx.host(
            root,
            "div",
            Props::new().with("onPointerLeave", logging(&log, "a")),
        );
        let a_node = fx.node(a);
        let mut plugins = Plugins::default();
        let mut queue = fx.extract(
            &mut plugins,
            NativeEvent::new("pointerout", Some(a_node)),
            EventSystemFlags::empty(),
        );
        assert_eq!(names(&queue), vec!["onPointerLeave"]);
        run(&mut queue);
        assert_eq!(*log.borrow(), vec!["a:pointerleave"]);
    }
}
