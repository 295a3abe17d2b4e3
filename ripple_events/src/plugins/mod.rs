// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Normalization plugins.
//!
//! ## Overview
//!
//! A plugin turns one native event into zero or more [`DispatchEntry`](crate::DispatchEntry)
//! values appended to the dispatch queue. Plugins run in a fixed order:
//!
//! 1. [`simple`]: native name → handler name, single phase.
//! 2. [`enter_leave`]: `over`/`out` pairs → `enter`/`leave`.
//! 3. [`change`]: value changes of form controls → `change`.
//! 4. [`select`]: selection changes of focused text controls → `select`.
//! 5. [`before_input`]: composition events and `beforeInput`.
//!
//! The simple plugin always runs. The others are skipped for capture-phase,
//! non-delegated, and non-managed dispatches, which only ever carry the event
//! they were attached for.
//!
//! Plugins read the trees through a [`TreeView`]. Changes to the platform that a
//! plugin needs (watching an element for property changes, syncing a default value)
//! are returned as [`HostEffect`]s and applied by the event system once extraction
//! is done.

pub(crate) mod before_input;
pub(crate) mod change;
pub(crate) mod enter_leave;
pub(crate) mod select;
pub(crate) mod simple;

use std::rc::Rc;

use ripple_dom::{Document, NativeEvent, NodeId};

use crate::accumulate::TreeView;
use crate::controlled::RestoreQueue;
use crate::error::DispatchError;
use crate::fiber::FiberId;
use crate::registry::EventRegistry;
use crate::synthetic::{EventFamily, MovementTracker, SyntheticEvent};
use crate::types::{DispatchQueue, EventSystemFlags};
use crate::value_tracking::ValueTrackers;

use before_input::BeforeInputEventPlugin;
use change::ChangeEventPlugin;
use enter_leave::EnterLeaveEventPlugin;
use select::SelectEventPlugin;
use simple::SimpleEventPlugin;

/// A platform mutation requested during extraction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum HostEffect {
    /// Attach the `propertychange` listener to a text control.
    WatchPropertyChange(NodeId),
    /// Detach the `propertychange` listener.
    UnwatchPropertyChange(NodeId),
    /// Write the `value` attribute (the default value) of a control.
    SetDefaultValue(NodeId, String),
}

/// Mutable state shared by plugins during one extraction.
pub(crate) struct ExtractContext<'a> {
    pub(crate) view: TreeView<'a>,
    pub(crate) trackers: &'a mut ValueTrackers,
    pub(crate) restore: &'a mut RestoreQueue,
    pub(crate) movement: &'a mut MovementTracker,
    pub(crate) effects: &'a mut Vec<HostEffect>,
}

impl ExtractContext<'_> {
    /// Build a synthetic event targeting the native target.
    pub(crate) fn synthetic(
        &mut self,
        react_name: Option<&str>,
        event_type: &str,
        family: EventFamily,
        target_inst: Option<FiberId>,
        args: &ExtractArgs<'_>,
    ) -> SyntheticEvent {
        SyntheticEvent::new(
            react_name,
            event_type,
            family,
            target_inst,
            Rc::clone(args.native),
            Some(args.native_target),
            self.movement,
        )
    }

    /// Platform node of `inst`, or the window when there is no instance.
    pub(crate) fn node_or_window(&self, inst: Option<FiberId>) -> NodeId {
        inst.and_then(|f| self.view.node_of(f))
            .unwrap_or_else(|| self.view.doc.window())
    }

    /// Record the live value of the control owned by `inst`, returning `inst` if it changed.
    pub(crate) fn inst_if_value_changed(&mut self, inst: Option<FiberId>) -> Option<FiberId> {
        let inst = inst?;
        let node = self.view.node_of(inst)?;
        self.trackers
            .update_value_if_changed(self.view.doc, node)
            .then_some(inst)
    }
}

/// Inputs of one extraction.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ExtractArgs<'a> {
    pub(crate) dom_event_name: &'a str,
    pub(crate) target_inst: Option<FiberId>,
    pub(crate) native: &'a Rc<NativeEvent>,
    pub(crate) native_target: NodeId,
    pub(crate) flags: EventSystemFlags,
    pub(crate) container: NodeId,
}

impl ExtractArgs<'_> {
    pub(crate) fn in_capture_phase(&self) -> bool {
        self.flags.contains(EventSystemFlags::IS_CAPTURE_PHASE)
    }
}

/// One normalization plugin.
pub(crate) trait EventPlugin {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Publish the handler names this plugin produces.
    fn register_events(&self, registry: &mut EventRegistry);

    /// Append the entries produced for one native event.
    fn extract_events(
        &mut self,
        ctx: &mut ExtractContext<'_>,
        registry: &EventRegistry,
        args: &ExtractArgs<'_>,
        queue: &mut DispatchQueue,
    ) -> Result<(), DispatchError>;
}

/// The fixed plugin list.
#[derive(Debug, Default)]
pub(crate) struct Plugins {
    pub(crate) simple: SimpleEventPlugin,
    pub(crate) enter_leave: EnterLeaveEventPlugin,
    pub(crate) change: ChangeEventPlugin,
    pub(crate) select: SelectEventPlugin,
    pub(crate) before_input: BeforeInputEventPlugin,
}

impl Plugins {
    fn polyfills(&mut self) -> [&mut dyn EventPlugin; 4] {
        [
            &mut self.enter_leave,
            &mut self.change,
            &mut self.select,
            &mut self.before_input,
        ]
    }

    /// Run every applicable plugin, in order.
    pub(crate) fn extract_events(
        &mut self,
        ctx: &mut ExtractContext<'_>,
        registry: &EventRegistry,
        args: &ExtractArgs<'_>,
        queue: &mut DispatchQueue,
    ) -> Result<(), DispatchError> {
        self.simple.extract_events(ctx, registry, args, queue)?;
        if args
            .flags
            .intersects(EventSystemFlags::SHOULD_NOT_PROCESS_POLYFILL_EVENT_PLUGINS)
        {
            return Ok(());
        }
        for plugin in self.polyfills() {
            let before = queue.len();
            plugin.extract_events(ctx, registry, args, queue)?;
            if queue.len() > before {
                tracing::trace!(
                    plugin = plugin.name(),
                    entries = queue.len() - before,
                    event = args.dom_event_name,
                    "extracted"
                );
            }
        }
        Ok(())
    }
}

/// Register every plugin's handler names.
pub(crate) fn register_all(registry: &mut EventRegistry) {
    let mut plugins = Plugins::default();
    plugins.simple.register_events(registry);
    for plugin in plugins.polyfills() {
        plugin.register_events(registry);
    }
}

const SUPPORTED_INPUT_TYPES: &[&str] = &[
    "color",
    "date",
    "datetime",
    "datetime-local",
    "email",
    "month",
    "number",
    "password",
    "range",
    "search",
    "tel",
    "text",
    "time",
    "url",
    "week",
];

/// Inputs whose value is edited as text, and textareas.
pub(crate) fn is_text_input_element(doc: &Document, node: NodeId) -> bool {
    match doc.input_type(node) {
        Some(ty) => SUPPORTED_INPUT_TYPES.contains(&ty.as_str()),
        None => doc.is_element_named(node, "textarea"),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared fixture for plugin tests.

    use std::cell::RefCell;
    use std::rc::Rc;

    use ripple_dom::{Document, NativeEvent, NodeId};

    use super::{ExtractArgs, ExtractContext, HostEffect, Plugins};
    use crate::accumulate::TreeView;
    use crate::component_tree::ComponentTree;
    use crate::config::EventSystemConfig;
    use crate::controlled::RestoreQueue;
    use crate::fiber::{Fiber, FiberId, FiberTree};
    use crate::props::{Listener, Props};
    use crate::registry::EventRegistry;
    use crate::synthetic::MovementTracker;
    use crate::types::{DispatchQueue, EventSystemFlags};
    use crate::value_tracking::ValueTrackers;

    pub(crate) struct PluginFixture {
        pub(crate) doc: Document,
        pub(crate) fibers: FiberTree,
        pub(crate) nodes: ComponentTree,
        pub(crate) config: EventSystemConfig,
        pub(crate) registry: EventRegistry,
        pub(crate) trackers: ValueTrackers,
        pub(crate) restore: RestoreQueue,
        pub(crate) movement: MovementTracker,
        pub(crate) effects: Vec<HostEffect>,
        pub(crate) container: NodeId,
        pub(crate) root: FiberId,
    }

    impl PluginFixture {
        pub(crate) fn new() -> Self {
            Self::with_doc(Document::new())
        }

        pub(crate) fn with_doc(mut doc: Document) -> Self {
            let container = doc.append_element(doc.document(), "div");
            let mut fibers = FiberTree::new();
            let root = fibers.insert(None, Fiber::host_root(container));
            let mut nodes = ComponentTree::new();
            nodes.mark_container_as_root(root, container);
            let config = EventSystemConfig::detect(&doc);
            Self {
                doc,
                fibers,
                nodes,
                config,
                registry: EventRegistry::init_with(false),
                trackers: ValueTrackers::new(),
                restore: RestoreQueue::default(),
                movement: MovementTracker::default(),
                effects: Vec::new(),
                container,
                root,
            }
        }

        /// Append a host element under `parent`'s node and commit it.
        pub(crate) fn host(&mut self, parent: FiberId, tag: &str, props: Props) -> FiberId {
            let parent_node = self
                .fibers
                .host_node(parent)
                .or_else(|| self.fibers.container_of(parent))
                .unwrap();
            let node = self.doc.append_element(parent_node, tag);
            let f = self
                .fibers
                .insert(Some(parent), Fiber::host_component(tag, node, props));
            self.nodes.commit(&self.fibers, f);
            f
        }

        pub(crate) fn node(&self, fiber: FiberId) -> NodeId {
            self.fibers.host_node(fiber).unwrap()
        }

        /// Run the plugin list as the bubble-phase root listener would.
        pub(crate) fn extract(
            &mut self,
            plugins: &mut Plugins,
            native: NativeEvent,
            flags: EventSystemFlags,
        ) -> DispatchQueue {
            let native = Rc::new(native);
            let native_target = native.target.unwrap_or(self.doc.window());
            let target_inst = self
                .nodes
                .closest_instance(&self.doc, &self.fibers, native_target);
            let name = native.event_type.clone();
            let args = ExtractArgs {
                dom_event_name: &name,
                target_inst,
                native: &native,
                native_target,
                flags,
                container: self.container,
            };
            let mut ctx = ExtractContext {
                view: TreeView {
                    doc: &self.doc,
                    fibers: &self.fibers,
                    nodes: &self.nodes,
                    config: &self.config,
                },
                trackers: &mut self.trackers,
                restore: &mut self.restore,
                movement: &mut self.movement,
                effects: &mut self.effects,
            };
            let mut queue = DispatchQueue::new();
            plugins
                .extract_events(&mut ctx, &self.registry, &args, &mut queue)
                .unwrap();
            queue
        }
    }

    pub(crate) fn logging(log: &Rc<RefCell<Vec<String>>>, tag: &str) -> Listener {
        let log = log.clone();
        let tag = tag.to_owned();
        crate::props::listener(move |ev| {
            log.borrow_mut().push(format!("{tag}:{}", ev.event_type()));
            Ok(())
        })
    }

    /// Handler names of the queued entries, in order.
    pub(crate) fn names(queue: &DispatchQueue) -> Vec<String> {
        queue
            .iter()
            .map(|e| e.event.react_name().unwrap_or_default().to_owned())
            .collect()
    }
}
