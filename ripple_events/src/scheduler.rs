// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The seam to the reconciler and its cooperative scheduler.
//!
//! The event system does not render anything itself. It brackets handler execution
//! with batch calls, asks for pending discrete work to be flushed before a new
//! discrete event, runs user-blocking events at an elevated priority, and asks for
//! blocked boundaries to be hydrated sooner.

use crate::fiber::FiberId;
use crate::types::SchedulerPriority;

/// Kind of batch opened around handler execution.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BatchKind {
    /// Updates from event handlers, committed together.
    Batched,
    /// A discrete event: updates are committed synchronously at the end.
    Discrete,
}

/// Callbacks into the external reconciler and scheduler.
///
/// Every method has a no-op default except the priority accessors.
pub trait UpdateScheduler {
    /// A batch of `kind` starts.
    ///
    /// Plain batches are reported at the outermost level only. Discrete batches are
    /// reported every time, nested or not.
    fn begin_batch(&mut self, kind: BatchKind) {
        let _ = kind;
    }

    /// The matching batch ends. The reconciler commits pending updates here.
    fn end_batch(&mut self, kind: BatchKind) {
        let _ = kind;
    }

    /// Commit any pending discrete updates now.
    fn flush_discrete_updates(&mut self) {}

    /// Priority currently in effect.
    fn current_priority(&self) -> SchedulerPriority;

    /// Change the priority in effect.
    fn set_current_priority(&mut self, priority: SchedulerPriority);

    /// Ask for `fiber` (usually a dehydrated boundary) to be worked on at `priority`.
    fn schedule_update(&mut self, fiber: FiberId, priority: SchedulerPriority) {
        let _ = (fiber, priority);
    }
}

/// Scheduler that only tracks the current priority.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScheduler {
    priority: SchedulerPriority,
}

impl UpdateScheduler for NoopScheduler {
    fn current_priority(&self) -> SchedulerPriority {
        self.priority
    }

    fn set_current_priority(&mut self, priority: SchedulerPriority) {
        self.priority = priority;
    }
}
