// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The event system: target resolution, replay, batching, and queue processing.
//!
//! ## Overview
//!
//! Every native listener the system attaches ends up in [`EventSystem::dispatch_event`]:
//!
//! 1. The event's static priority picks a wrapper. Discrete events flush pending
//!    discrete work and run inside a discrete batch, user-blocking events run at an
//!    elevated scheduler priority, continuous events run as they are.
//! 2. The native target is resolved to the closest mounted fiber. A target inside
//!    a dehydrated boundary, or a root still waiting for hydration, blocks the event
//!    and hands it to the replay queues.
//! 3. If the fiber belongs to a different root than the container that received
//!    the event, the portal walk either finds the host node the portal hangs off or
//!    drops the event (the portal's own container delivers it).
//! 4. Plugins build a [`DispatchQueue`] inside an event batch and the queue is
//!    processed: capture listeners tail to head, bubble listeners head to tail.
//!
//! ## Errors
//!
//! A listener error does not stop the queue. The first one is kept and returned once
//! every listener ran. An invalid handler prop fails the dispatch immediately.
//!
//! ## Nesting
//!
//! A listener triggers another native event with
//! [`SyntheticEvent::dispatch_native`]. Requests are delivered after the current
//! dispatch queue, inside the event batch that is still open, so the inner dispatch
//! joins it. Hosts nest dispatches the same way through
//! [`EventSystem::batched_updates`] and [`EventSystem::discrete_updates`].
//! Controlled elements are restored when the outermost batch ends.

use std::collections::VecDeque;
use std::rc::Rc;

use ripple_dom::{Document, NativeEvent, NodeId};

use crate::accumulate::TreeView;
use crate::batching::BatchingController;
use crate::component_tree::ComponentTree;
use crate::config::EventSystemConfig;
use crate::controlled::{RestoreQueue, restore_state_of_target};
use crate::error::{DispatchError, FirstError};
use crate::fiber::{FiberId, FiberKind, FiberTree};
use crate::listener::{ListenerKind, NativeListeners};
use crate::plugins::{ExtractArgs, ExtractContext, HostEffect, Plugins};
use crate::registry::EventRegistry;
use crate::replay::{ContinuousQueued, QueuedReplayableEvent, ReplayQueues, is_replayable_discrete_event};
use crate::scheduler::{BatchKind, NoopScheduler, UpdateScheduler};
use crate::synthetic::{MovementTracker, SyntheticEvent};
use crate::types::{
    DispatchListener, DispatchQueue, EventPriority, EventSystemFlags, SchedulerPriority,
};
use crate::value_tracking::ValueTrackers;

/// Delegated event dispatch for one document.
///
/// ## Usage
///
/// - Build with [`EventSystem::for_document`] (or [`EventSystem::with_scheduler`] to
///   plug in a reconciler).
/// - For every mounted root: [`EventSystem::attach_root`].
/// - As the reconciler commits host nodes: [`EventSystem::commit`]; as it removes
///   them: [`EventSystem::detach`].
/// - Feed platform events with [`EventSystem::deliver`], which walks the native
///   propagation path and runs every listener the system attached.
/// - When a boundary hydrates: [`EventSystem::retry_if_blocked_on`] followed by
///   [`EventSystem::replay_unblocked_events`].
///
/// The [`Document`] and the [`FiberTree`] are owned by the host and the reconciler;
/// they are passed in per call.
pub struct EventSystem<S: UpdateScheduler = NoopScheduler> {
    pub(crate) config: EventSystemConfig,
    pub(crate) registry: EventRegistry,
    pub(crate) nodes: ComponentTree,
    pub(crate) trackers: ValueTrackers,
    pub(crate) restore: RestoreQueue,
    pub(crate) movement: MovementTracker,
    pub(crate) plugins: Plugins,
    pub(crate) replay: ReplayQueues,
    pub(crate) batching: BatchingController,
    pub(crate) native_listeners: NativeListeners,
    pub(crate) requested: VecDeque<NativeEvent>,
    pub(crate) scheduler: S,
    pub(crate) enabled: bool,
}

impl<S: UpdateScheduler> core::fmt::Debug for EventSystem<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventSystem")
            .field("config", &self.config)
            .field("enabled", &self.enabled)
            .field("native_listeners", &self.native_listeners.len())
            .field("queued_discrete", &self.replay.queued_discrete_len())
            .finish_non_exhaustive()
    }
}

impl EventSystem<NoopScheduler> {
    /// Create a system without a reconciler attached.
    pub fn new(config: EventSystemConfig) -> Self {
        Self::with_scheduler(config, NoopScheduler::default())
    }

    /// Create a system configured from the document's platform features.
    pub fn for_document(doc: &Document) -> Self {
        Self::new(EventSystemConfig::detect(doc))
    }
}

/// Native event target: text nodes dispatch as their parent, a missing target is the window.
pub(crate) fn event_target(doc: &Document, native: &NativeEvent) -> NodeId {
    let target = native.target.unwrap_or_else(|| doc.window());
    if doc.is_text(target) {
        doc.parent(target).unwrap_or(target)
    } else {
        target
    }
}

/// `container` is the receiving root, or a comment placeholder directly inside it.
fn is_matching_root_container(doc: &Document, container: NodeId, target_container: NodeId) -> bool {
    container == target_container
        || (doc.is_comment(container) && doc.parent(container) == Some(target_container))
}

fn is_root_or_portal(kind: Option<FiberKind>) -> bool {
    matches!(kind, Some(FiberKind::HostRoot | FiberKind::HostPortal))
}

fn execute_dispatch(event: &mut SyntheticEvent, listener: &DispatchListener, errors: &mut FirstError) {
    event.set_current_target(Some(listener.current_target));
    if let Err(source) = (listener.listener)(&mut *event) {
        errors.record(DispatchError::Listener {
            event_type: event.event_type().to_owned(),
            source,
        });
    }
    event.set_current_target(None);
}

fn process_dispatch_queue_items_in_order(
    event: &mut SyntheticEvent,
    listeners: &[DispatchListener],
    in_capture_phase: bool,
    errors: &mut FirstError,
) {
    let ordered: Vec<&DispatchListener> = if in_capture_phase {
        listeners.iter().rev().collect()
    } else {
        listeners.iter().collect()
    };
    // `None` until the first listener ran.
    let mut previous_instance: Option<Option<FiberId>> = None;
    for listener in ordered {
        if previous_instance != Some(listener.instance) && event.is_propagation_stopped() {
            return;
        }
        execute_dispatch(event, listener, errors);
        previous_instance = Some(listener.instance);
    }
}

/// Run every entry of `queue`, returning the first listener error.
pub(crate) fn process_dispatch_queue(
    queue: &mut DispatchQueue,
    flags: EventSystemFlags,
) -> Result<(), DispatchError> {
    let in_capture_phase = flags.contains(EventSystemFlags::IS_CAPTURE_PHASE);
    let mut errors = FirstError::default();
    for entry in queue.iter_mut() {
        process_dispatch_queue_items_in_order(
            &mut entry.event,
            &entry.listeners,
            in_capture_phase,
            &mut errors,
        );
    }
    errors.into_result()
}

impl<S: UpdateScheduler> EventSystem<S> {
    /// Create a system that reports batches and hydration requests to `scheduler`.
    pub fn with_scheduler(config: EventSystemConfig, scheduler: S) -> Self {
        Self {
            registry: EventRegistry::init_with(config.warn_on_duplicate_registration),
            config,
            nodes: ComponentTree::new(),
            trackers: ValueTrackers::new(),
            restore: RestoreQueue::default(),
            movement: MovementTracker::default(),
            plugins: Plugins::default(),
            replay: ReplayQueues::default(),
            batching: BatchingController::default(),
            native_listeners: NativeListeners::default(),
            requested: VecDeque::new(),
            scheduler,
            enabled: true,
        }
    }

    /// Configuration in effect.
    pub fn config(&self) -> &EventSystemConfig {
        &self.config
    }

    /// Name tables.
    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    /// Platform-node side table.
    pub fn component_tree(&self) -> &ComponentTree {
        &self.nodes
    }

    /// Mutable side table, for reconcilers that commit records themselves.
    pub fn component_tree_mut(&mut self) -> &mut ComponentTree {
        &mut self.nodes
    }

    /// Value trackers of form controls.
    pub fn value_trackers(&self) -> &ValueTrackers {
        &self.trackers
    }

    /// The scheduler seam.
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Mutable access to the scheduler seam.
    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Turn dispatch on or off. While off, native events are ignored.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether dispatch is on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True while an update batch is open.
    pub fn is_inside_event_handler(&self) -> bool {
        self.batching.is_inside_event_handler()
    }

    /// Number of discrete events waiting for replay.
    pub fn queued_discrete_events(&self) -> usize {
        self.replay.queued_discrete_len()
    }

    /// Number of continuous events waiting for replay.
    pub fn queued_continuous_events(&self) -> usize {
        self.replay.queued_continuous_len()
    }

    /// Mark a root's container and attach every delegated listener to it.
    ///
    /// Returns the container, or `None` if `root` is not a host root.
    pub fn attach_root(
        &mut self,
        doc: &mut Document,
        fibers: &FiberTree,
        root: FiberId,
    ) -> Option<NodeId> {
        let (container, _) = fibers.root_container(root)?;
        self.nodes.mark_container_as_root(root, container);
        self.listen_to_all_supported_events(doc, container);
        Some(container)
    }

    /// Record a committed fiber in the side table.
    ///
    /// Host nodes get the non-delegated listeners their tag needs, and text
    /// controls start value tracking.
    pub fn commit(&mut self, doc: &mut Document, fibers: &FiberTree, fiber: FiberId) {
        let Some(node) = self.nodes.commit(fibers, fiber) else {
            return;
        };
        if fibers.kind(fiber) != Some(FiberKind::HostComponent) {
            return;
        }
        self.listen_to_element_events(doc, node);
        if doc.is_element_named(node, "input") || doc.is_element_named(node, "textarea") {
            self.trackers.track(doc, node);
        }
    }

    /// Forget a platform node that was removed from the tree.
    pub fn detach(&mut self, doc: &mut Document, node: NodeId) {
        self.remove_listeners_where(doc, |l| l.target == node);
        self.nodes.detach(node);
        self.trackers.untrack(node);
        self.plugins.change.forget(node);
        self.restore.retain(|n| n != node);
    }

    /// Start tracking the value of a form control that was committed elsewhere.
    pub fn track_value(&mut self, doc: &Document, node: NodeId) {
        self.trackers.track(doc, node);
    }

    /// Simulate the platform dispatching `native`.
    ///
    /// Computes the propagation path and invokes every listener this system attached
    /// along it, in order. Native `stop_propagation` takes effect at the next node.
    /// The first error is returned after the whole path ran.
    pub fn deliver(
        &mut self,
        doc: &mut Document,
        fibers: &FiberTree,
        native: NativeEvent,
    ) -> Result<(), DispatchError> {
        let native = Rc::new(native);
        let target = native.target.unwrap_or_else(|| doc.window());
        let path = doc.propagation_path(target, &native.event_type, native.bubbles);
        tracing::trace!(event = %native.event_type, steps = path.len(), "delivering");
        let mut errors = FirstError::default();
        let mut current_node = None;
        for step in path {
            if current_node != Some(step.node) {
                if native.propagation_stopped() {
                    break;
                }
                current_node = Some(step.node);
            }
            // Listeners may be removed by an earlier step.
            let Some(listener) = self.native_listeners.get(step.handle).cloned() else {
                continue;
            };
            let result = match listener.kind {
                ListenerKind::Dispatch => self.dispatch_event(
                    doc,
                    fibers,
                    &listener.dom_event_name,
                    listener.flags,
                    listener.target,
                    Rc::clone(&native),
                ),
                ListenerKind::PropertyChange => {
                    self.handle_property_change(doc, fibers, Rc::clone(&native))
                }
            };
            errors.record_result(result);
        }
        errors.into_result()
    }

    /// Entry point of a native listener attached for `dom_event_name` on `container`.
    pub fn dispatch_event(
        &mut self,
        doc: &mut Document,
        fibers: &FiberTree,
        dom_event_name: &str,
        flags: EventSystemFlags,
        container: NodeId,
        native: Rc<NativeEvent>,
    ) -> Result<(), DispatchError> {
        match self.registry.priority(dom_event_name) {
            EventPriority::Discrete => {
                if self.batching.should_flush_discrete(native.time_stamp) {
                    self.scheduler.flush_discrete_updates();
                }
                self.discrete_updates(doc, fibers, |system, doc| {
                    system.dispatch_event_inner(doc, fibers, dom_event_name, flags, container, native)
                })
            }
            EventPriority::UserBlocking => {
                let previous = self.scheduler.current_priority();
                self.scheduler
                    .set_current_priority(SchedulerPriority::UserBlocking);
                let result =
                    self.dispatch_event_inner(doc, fibers, dom_event_name, flags, container, native);
                self.scheduler.set_current_priority(previous);
                result
            }
            EventPriority::Continuous => {
                self.dispatch_event_inner(doc, fibers, dom_event_name, flags, container, native)
            }
        }
    }

    fn dispatch_event_inner(
        &mut self,
        doc: &mut Document,
        fibers: &FiberTree,
        dom_event_name: &str,
        flags: EventSystemFlags,
        container: NodeId,
        native: Rc<NativeEvent>,
    ) -> Result<(), DispatchError> {
        if !self.enabled {
            return Ok(());
        }
        // Only the bubble listener parks events, so each occurrence is queued once.
        let allow_replay = !flags.contains(EventSystemFlags::IS_CAPTURE_PHASE);

        if allow_replay
            && self.replay.has_queued_discrete_events()
            && is_replayable_discrete_event(dom_event_name)
        {
            tracing::debug!(event = dom_event_name, "queued behind pending discrete events");
            self.replay
                .queue_discrete_event(None, dom_event_name, flags, container, native);
            return Ok(());
        }

        let blocked_on =
            match self.attempt_to_dispatch(doc, fibers, dom_event_name, flags, container, &native) {
                Ok(Some(blocked_on)) => blocked_on,
                done => {
                    if allow_replay {
                        self.replay.clear_if_continuous_event(dom_event_name, &native);
                    }
                    return done.map(|_| ());
                }
            };

        if allow_replay {
            if is_replayable_discrete_event(dom_event_name) {
                tracing::debug!(event = dom_event_name, ?blocked_on, "blocked discrete event queued");
                let first = self.replay.queue_discrete_event(
                    Some(blocked_on),
                    dom_event_name,
                    flags,
                    container,
                    native,
                );
                if first {
                    self.attempt_hydration(fibers, blocked_on, SchedulerPriority::Immediate);
                }
                return Ok(());
            }
            if let Some(queued) = self.replay.queue_if_continuous_event(
                Some(blocked_on),
                dom_event_name,
                flags,
                container,
                &native,
            ) {
                tracing::debug!(event = dom_event_name, ?blocked_on, "blocked continuous event queued");
                if queued == ContinuousQueued::Created {
                    self.attempt_hydration(fibers, blocked_on, SchedulerPriority::UserBlocking);
                }
                return Ok(());
            }
            self.replay.clear_if_continuous_event(dom_event_name, &native);
        }
        // Not replayable: deliver without a target so root-level listeners still run.
        self.dispatch_for_plugin_event_system(
            doc,
            fibers,
            dom_event_name,
            flags,
            &native,
            None,
            container,
        )
    }

    /// Resolve the target and dispatch, or report the boundary the event is blocked on.
    fn attempt_to_dispatch(
        &mut self,
        doc: &mut Document,
        fibers: &FiberTree,
        dom_event_name: &str,
        flags: EventSystemFlags,
        container: NodeId,
        native: &Rc<NativeEvent>,
    ) -> Result<Option<NodeId>, DispatchError> {
        let native_target = event_target(doc, native);
        let mut target_inst = self.nodes.closest_instance(doc, fibers, native_target);
        if let Some(inst) = target_inst {
            match fibers.nearest_mounted(inst) {
                None => target_inst = None,
                Some(mounted) => match fibers.kind(mounted) {
                    Some(FiberKind::SuspenseComponent) => {
                        if let Some(marker) = fibers.suspense_instance(mounted) {
                            return Ok(Some(marker));
                        }
                        // Blocked but without a marker: dispatch without a target.
                        target_inst = None;
                    }
                    Some(FiberKind::HostRoot) => {
                        if let Some((root_container, true)) = fibers.root_container(mounted) {
                            return Ok(Some(root_container));
                        }
                        target_inst = None;
                    }
                    _ if mounted != inst => target_inst = None,
                    _ => {}
                },
            }
        }
        self.dispatch_for_plugin_event_system(
            doc,
            fibers,
            dom_event_name,
            flags,
            native,
            target_inst,
            container,
        )?;
        Ok(None)
    }

    /// Adjust the target across roots and portals, then extract and process.
    pub(crate) fn dispatch_for_plugin_event_system(
        &mut self,
        doc: &mut Document,
        fibers: &FiberTree,
        dom_event_name: &str,
        flags: EventSystemFlags,
        native: &Rc<NativeEvent>,
        target_inst: Option<FiberId>,
        container: NodeId,
    ) -> Result<(), DispatchError> {
        let mut ancestor_inst = target_inst;
        let delegated = !flags.intersects(
            EventSystemFlags::IS_EVENT_HANDLE_NON_MANAGED_NODE | EventSystemFlags::IS_NON_DELEGATED,
        );
        if delegated && let Some(target) = target_inst {
            match self.resolve_receiving_ancestor(doc, fibers, target, container) {
                Some(ancestor) => ancestor_inst = Some(ancestor),
                None => {
                    tracing::trace!(event = dom_event_name, ?container, "delivered by another root");
                    return Ok(());
                }
            }
        }
        self.batched_event_updates(doc, fibers, |system, doc| {
            system.dispatch_events_for_plugins(
                doc,
                fibers,
                dom_event_name,
                flags,
                native,
                ancestor_inst,
                container,
            )
        })
    }

    /// Walk up from `target` until a root or portal whose container received the event.
    ///
    /// Crossing a portal boundary continues from the host node that contains the
    /// portal's container. Returns `None` when some other container is responsible.
    fn resolve_receiving_ancestor(
        &self,
        doc: &Document,
        fibers: &FiberTree,
        target: FiberId,
        target_container: NodeId,
    ) -> Option<FiberId> {
        let mut ancestor = target;
        let mut node = Some(target);
        'main: while let Some(current) = node {
            let kind = fibers.kind(current);
            if is_root_or_portal(kind)
                && let Some(container) = fibers.container_of(current)
            {
                if is_matching_root_container(doc, container, target_container) {
                    return Some(ancestor);
                }
                if kind == Some(FiberKind::HostPortal) {
                    // A portal nested inside the receiving root is delivered by that
                    // root's own walk.
                    let mut grand = fibers.parent(current);
                    while let Some(g) = grand {
                        if is_root_or_portal(fibers.kind(g))
                            && fibers
                                .container_of(g)
                                .is_some_and(|c| is_matching_root_container(doc, c, target_container))
                        {
                            return None;
                        }
                        grand = fibers.parent(g);
                    }
                }
                let mut cursor = Some(container);
                while let Some(c) = cursor {
                    let parent = self.nodes.closest_instance(doc, fibers, c)?;
                    if matches!(
                        fibers.kind(parent),
                        Some(FiberKind::HostComponent | FiberKind::HostText)
                    ) {
                        ancestor = parent;
                        node = Some(parent);
                        continue 'main;
                    }
                    cursor = doc.parent(c);
                }
            }
            node = fibers.parent(current);
        }
        None
    }

    fn dispatch_events_for_plugins(
        &mut self,
        doc: &mut Document,
        fibers: &FiberTree,
        dom_event_name: &str,
        flags: EventSystemFlags,
        native: &Rc<NativeEvent>,
        target_inst: Option<FiberId>,
        container: NodeId,
    ) -> Result<(), DispatchError> {
        let native_target = event_target(doc, native);
        let mut queue = DispatchQueue::new();
        let mut effects = Vec::new();
        {
            let mut ctx = ExtractContext {
                view: TreeView {
                    doc: &*doc,
                    fibers,
                    nodes: &self.nodes,
                    config: &self.config,
                },
                trackers: &mut self.trackers,
                restore: &mut self.restore,
                movement: &mut self.movement,
                effects: &mut effects,
            };
            let args = ExtractArgs {
                dom_event_name,
                target_inst,
                native,
                native_target,
                flags,
                container,
            };
            self.plugins
                .extract_events(&mut ctx, &self.registry, &args, &mut queue)?;
        }
        self.apply_effects(doc, effects);
        tracing::trace!(event = dom_event_name, entries = queue.len(), "processing dispatch queue");
        let result = process_dispatch_queue(&mut queue, flags);
        self.collect_requested(&mut queue);
        result
    }

    fn collect_requested(&mut self, queue: &mut DispatchQueue) {
        for entry in queue.iter_mut() {
            self.requested.extend(entry.event.take_requested());
        }
    }

    /// Deliver the native events listeners asked for, including ones requested by
    /// the nested dispatches themselves.
    fn deliver_requested(
        &mut self,
        doc: &mut Document,
        fibers: &FiberTree,
    ) -> Result<(), DispatchError> {
        let mut errors = FirstError::default();
        while let Some(native) = self.requested.pop_front() {
            tracing::debug!(event = %native.event_type, "nested dispatch");
            errors.record_result(self.deliver(doc, fibers, native));
        }
        errors.into_result()
    }

    /// `propertychange` on the element watched by the change polyfill.
    fn handle_property_change(
        &mut self,
        doc: &mut Document,
        fibers: &FiberTree,
        native: Rc<NativeEvent>,
    ) -> Result<(), DispatchError> {
        let Some(watched) = self.plugins.change.watched_element() else {
            return Ok(());
        };
        let native_target = event_target(doc, &native);
        let mut queue = DispatchQueue::new();
        let mut effects = Vec::new();
        {
            let mut ctx = ExtractContext {
                view: TreeView {
                    doc: &*doc,
                    fibers,
                    nodes: &self.nodes,
                    config: &self.config,
                },
                trackers: &mut self.trackers,
                restore: &mut self.restore,
                movement: &mut self.movement,
                effects: &mut effects,
            };
            let args = ExtractArgs {
                dom_event_name: "propertychange",
                target_inst: None,
                native: &native,
                native_target,
                flags: EventSystemFlags::empty(),
                container: watched,
            };
            self.plugins
                .change
                .handle_property_change(&mut ctx, &args, &mut queue)?;
        }
        self.apply_effects(doc, effects);
        if queue.is_empty() {
            return Ok(());
        }
        self.batched_updates(doc, fibers, move |system, doc| {
            let mut errors = FirstError::default();
            errors.record_result(process_dispatch_queue(&mut queue, EventSystemFlags::empty()));
            system.collect_requested(&mut queue);
            errors.record_result(system.deliver_requested(doc, fibers));
            errors.into_result()
        })
    }

    fn apply_effects(&mut self, doc: &mut Document, effects: Vec<HostEffect>) {
        for effect in effects {
            match effect {
                HostEffect::WatchPropertyChange(node) => self.watch_property_change(doc, node),
                HostEffect::UnwatchPropertyChange(node) => self.unwatch_property_change(doc, node),
                HostEffect::SetDefaultValue(node, value) => {
                    if doc.attribute(node, "value") != Some(value.as_str()) {
                        doc.set_attribute(node, "value", &value);
                    }
                }
            }
        }
    }

    /// Run `f` inside the event batch opened around extraction and processing.
    ///
    /// The outermost batch delivers requested nested dispatches before it closes.
    fn batched_event_updates(
        &mut self,
        doc: &mut Document,
        fibers: &FiberTree,
        f: impl FnOnce(&mut Self, &mut Document) -> Result<(), DispatchError>,
    ) -> Result<(), DispatchError> {
        if !self.batching.begin_event_batch() {
            return f(self, doc);
        }
        self.scheduler.begin_batch(BatchKind::Batched);
        let mut errors = FirstError::default();
        errors.record_result(f(self, doc));
        errors.record_result(self.deliver_requested(doc, fibers));
        self.scheduler.end_batch(BatchKind::Batched);
        self.batching.end_event_batch();
        self.finish_event_handler(doc, fibers);
        errors.into_result()
    }

    /// Run `f` with every update it causes committed as one batch.
    ///
    /// Inside another batch this just calls `f`.
    pub fn batched_updates<R>(
        &mut self,
        doc: &mut Document,
        fibers: &FiberTree,
        f: impl FnOnce(&mut Self, &mut Document) -> R,
    ) -> R {
        if !self.batching.begin_batched_updates() {
            return f(self, doc);
        }
        self.scheduler.begin_batch(BatchKind::Batched);
        let result = f(self, doc);
        self.scheduler.end_batch(BatchKind::Batched);
        self.batching.end_batched_updates();
        self.finish_event_handler(doc, fibers);
        result
    }

    /// Run `f` as a discrete update: its updates are committed synchronously at the end.
    pub fn discrete_updates<R>(
        &mut self,
        doc: &mut Document,
        fibers: &FiberTree,
        f: impl FnOnce(&mut Self, &mut Document) -> R,
    ) -> R {
        let previous = self.batching.begin_discrete();
        self.scheduler.begin_batch(BatchKind::Discrete);
        let result = f(self, doc);
        self.scheduler.end_batch(BatchKind::Discrete);
        if self.batching.end_discrete(previous) {
            self.finish_event_handler(doc, fibers);
        }
        result
    }

    fn finish_event_handler(&mut self, doc: &mut Document, fibers: &FiberTree) {
        if !self.restore.needs_restore() {
            return;
        }
        // Commit what the handlers scheduled before comparing against props.
        self.scheduler.flush_discrete_updates();
        for node in self.restore.take() {
            restore_state_of_target(doc, fibers, &self.nodes, &mut self.trackers, node);
        }
    }

    fn attempt_hydration(&mut self, fibers: &FiberTree, blocked_on: NodeId, priority: SchedulerPriority) {
        if let Some(fiber) = self.nodes.instance_from_node(fibers, blocked_on) {
            self.scheduler.schedule_update(fiber, priority);
        }
    }

    /// Mark every queued event waiting on `unblocked` as ready.
    ///
    /// Returns true if any was; the host should then call
    /// [`replay_unblocked_events`](Self::replay_unblocked_events).
    pub fn retry_if_blocked_on(&mut self, unblocked: NodeId) -> bool {
        let any = self.replay.retry_if_blocked_on(unblocked);
        if any {
            tracing::debug!(?unblocked, "boundary unblocked");
        }
        any
    }

    /// Replay queued events whose boundaries are ready.
    ///
    /// Discrete events replay in arrival order and stop at the first one that is
    /// still blocked, which is asked to hydrate sooner. Continuous records are then
    /// retried independently.
    pub fn replay_unblocked_events(
        &mut self,
        doc: &mut Document,
        fibers: &FiberTree,
    ) -> Result<(), DispatchError> {
        let mut errors = FirstError::default();
        while let Some(mut record) = self.replay.pop_discrete_front() {
            if let Some(blocked_on) = record.blocked_on {
                self.attempt_hydration(fibers, blocked_on, SchedulerPriority::UserBlocking);
                self.replay.push_discrete_front(record);
                break;
            }
            self.replay_record(doc, fibers, &mut record, &mut errors);
            if record.blocked_on.is_some() {
                self.replay.push_discrete_front(record);
            }
        }
        for (slot, mut record) in self.replay.take_continuous() {
            if record.blocked_on.is_none() {
                self.replay_record(doc, fibers, &mut record, &mut errors);
                match record.blocked_on {
                    Some(blocked_on) => {
                        self.attempt_hydration(fibers, blocked_on, SchedulerPriority::UserBlocking);
                    }
                    None => continue,
                }
            }
            self.replay.restore_continuous(slot, record);
        }
        errors.into_result()
    }

    /// Dispatch a record to each of its containers until one blocks.
    fn replay_record(
        &mut self,
        doc: &mut Document,
        fibers: &FiberTree,
        record: &mut QueuedReplayableEvent,
        errors: &mut FirstError,
    ) {
        while let Some(&container) = record.target_containers.first() {
            tracing::debug!(event = %record.dom_event_name, ?container, "replaying");
            match self.attempt_to_dispatch(
                doc,
                fibers,
                &record.dom_event_name,
                record.flags,
                container,
                &record.native,
            ) {
                Ok(Some(blocked_on)) => {
                    record.blocked_on = Some(blocked_on);
                    return;
                }
                Ok(None) => {}
                Err(err) => errors.record(err),
            }
            record.target_containers.remove(0);
        }
    }
}

#[cfg(test)]
pub(crate) mod harness {
    //! End-to-end fixture: a document, a fiber tree and a system with one attached root.

    use std::cell::RefCell;
    use std::rc::Rc;

    use ripple_dom::{Document, NodeId};

    use super::EventSystem;
    use crate::fiber::{Fiber, FiberId, FiberTree};
    use crate::props::{Listener, Props, listener};
    use crate::scheduler::UpdateScheduler;

    pub(crate) type Log = Rc<RefCell<Vec<String>>>;

    pub(crate) struct Harness<S: UpdateScheduler> {
        pub(crate) doc: Document,
        pub(crate) fibers: FiberTree,
        pub(crate) system: EventSystem<S>,
        pub(crate) container: NodeId,
        pub(crate) root: FiberId,
    }

    impl<S: UpdateScheduler> Harness<S> {
        pub(crate) fn with_system(mut doc: Document, build: impl FnOnce(&Document) -> EventSystem<S>) -> Self {
            let container = doc.append_element(doc.document(), "div");
            let mut fibers = FiberTree::new();
            let root = fibers.insert(None, Fiber::host_root(container));
            let mut system = build(&doc);
            system.attach_root(&mut doc, &fibers, root);
            Self {
                doc,
                fibers,
                system,
                container,
                root,
            }
        }

        /// Append and commit a host element under `parent`.
        pub(crate) fn host(&mut self, parent: FiberId, tag: &str, props: Props) -> FiberId {
            self.host_with(parent, tag, props, |_, _| {})
        }

        /// Like [`host`](Self::host), letting `setup` prepare the node before the commit.
        pub(crate) fn host_with(
            &mut self,
            parent: FiberId,
            tag: &str,
            props: Props,
            setup: impl FnOnce(&mut Document, NodeId),
        ) -> FiberId {
            let parent_node = self
                .fibers
                .host_node(parent)
                .or_else(|| self.fibers.container_of(parent))
                .unwrap();
            let node = self.doc.append_element(parent_node, tag);
            setup(&mut self.doc, node);
            let fiber = self
                .fibers
                .insert(Some(parent), Fiber::host_component(tag, node, props));
            self.system.commit(&mut self.doc, &self.fibers, fiber);
            fiber
        }

        pub(crate) fn node(&self, fiber: FiberId) -> NodeId {
            self.fibers.host_node(fiber).unwrap()
        }
    }

    pub(crate) fn logger(log: &Log, tag: &str) -> Listener {
        let log = log.clone();
        let tag = tag.to_owned();
        listener(move |ev| {
            log.borrow_mut().push(format!("{tag}:{}", ev.event_type()));
            Ok(())
        })
    }
}
