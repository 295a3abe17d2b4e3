// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Batching bookkeeping.
//!
//! ## Overview
//!
//! Two re-entrant scopes are tracked:
//!
//! - "inside an event handler": any update batch, including discrete ones.
//! - "batching event updates": the batch opened around plugin extraction and
//!   listener processing.
//!
//! Entering a scope that is already open is a pass-through: nothing changes and the
//! caller is told it is nested. Only the outermost exit finishes the handler, which
//! is when controlled elements are restored.
//!
//! The controller only keeps the flags. [`EventSystem`](crate::EventSystem) pairs them
//! with calls into the [`UpdateScheduler`](crate::UpdateScheduler).

/// Re-entrancy flags for update batches.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct BatchingController {
    inside_event_handler: bool,
    batching_event_updates: bool,
    last_flushed_time_stamp: f64,
}

impl BatchingController {
    pub(crate) fn is_inside_event_handler(&self) -> bool {
        self.inside_event_handler
    }

    #[cfg(test)]
    pub(crate) fn is_batching_event_updates(&self) -> bool {
        self.batching_event_updates
    }

    /// Open a plain update batch. Returns false when one is already open.
    pub(crate) fn begin_batched_updates(&mut self) -> bool {
        if self.inside_event_handler {
            return false;
        }
        self.inside_event_handler = true;
        true
    }

    /// Close the batch opened by a `true` [`begin_batched_updates`](Self::begin_batched_updates).
    pub(crate) fn end_batched_updates(&mut self) {
        self.inside_event_handler = false;
    }

    /// Open the event batch. Returns false when one is already open.
    pub(crate) fn begin_event_batch(&mut self) -> bool {
        if self.batching_event_updates {
            return false;
        }
        self.batching_event_updates = true;
        true
    }

    /// Close the batch opened by a `true` [`begin_event_batch`](Self::begin_event_batch).
    pub(crate) fn end_event_batch(&mut self) {
        self.batching_event_updates = false;
    }

    /// Enter a discrete batch, returning the previous handler state for
    /// [`end_discrete`](Self::end_discrete).
    pub(crate) fn begin_discrete(&mut self) -> bool {
        core::mem::replace(&mut self.inside_event_handler, true)
    }

    /// Leave a discrete batch. Returns true when this was the outermost handler scope.
    pub(crate) fn end_discrete(&mut self, previous: bool) -> bool {
        self.inside_event_handler = previous;
        !previous
    }

    /// Decide whether pending discrete work should be flushed before an event
    /// stamped `time_stamp` runs.
    ///
    /// Never flushes from inside a handler. A non-zero stamp equal to the last
    /// flushed one belongs to the same native event and is skipped.
    pub(crate) fn should_flush_discrete(&mut self, time_stamp: f64) -> bool {
        if self.inside_event_handler {
            return false;
        }
        if time_stamp != 0.0 && time_stamp == self.last_flushed_time_stamp {
            return false;
        }
        self.last_flushed_time_stamp = time_stamp;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_batches_pass_through() {
        let mut b = BatchingController::default();
        assert!(b.begin_event_batch());
        assert!(!b.begin_event_batch());
        assert!(b.is_batching_event_updates());
        b.end_event_batch();
        assert!(!b.is_batching_event_updates());

        assert!(b.begin_batched_updates());
        assert!(!b.begin_batched_updates());
        b.end_batched_updates();
        assert!(!b.is_inside_event_handler());
    }

    #[test]
    fn discrete_restores_previous_state() {
        let mut b = BatchingController::default();
        let outer = b.begin_discrete();
        let inner = b.begin_discrete();
        assert!(!b.end_discrete(inner));
        assert!(b.is_inside_event_handler());
        assert!(b.end_discrete(outer));
        assert!(!b.is_inside_event_handler());
    }

    #[test]
    fn discrete_flush_skips_repeats_and_handlers() {
        let mut b = BatchingController::default();
        assert!(b.should_flush_discrete(10.0));
        assert!(!b.should_flush_discrete(10.0));
        assert!(b.should_flush_discrete(11.0));
        assert!(b.should_flush_discrete(0.0));
        assert!(b.should_flush_discrete(0.0));
        let prev = b.begin_discrete();
        assert!(!b.should_flush_discrete(12.0));
        b.end_discrete(prev);
    }
}
