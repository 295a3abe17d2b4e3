// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dispatch errors.

/// Result type returned by user listeners.
pub type ListenerResult = anyhow::Result<()>;

/// Errors surfaced by the event system.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A handler prop held something other than a listener.
    #[error("expected `{registration_name}` listener to be a function, instead got a value of `{found}` type")]
    InvalidListener {
        /// Handler prop name, e.g. `onClick`.
        registration_name: String,
        /// Type name of the value found in its place.
        found: &'static str,
    },
    /// An event handle was requested for an event no plugin handles.
    #[error("cannot create an event handle for `{event_type}`, as it is not a known event")]
    UnknownEvent {
        /// Native event type requested.
        event_type: String,
    },
    /// An event handle was bound to a node that cannot receive events.
    #[error("event handle bound to an invalid target")]
    InvalidEventHandleTarget,
    /// A listener returned an error. Only the first error of a flush is reported.
    #[error("listener for `{event_type}` failed")]
    Listener {
        /// Synthetic event type being dispatched.
        event_type: String,
        /// Error returned by the listener.
        #[source]
        source: anyhow::Error,
    },
}

impl DispatchError {
    /// The listener error, if this is one.
    pub fn listener_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Listener { source, .. } => Some(source),
            Self::InvalidListener { .. }
            | Self::UnknownEvent { .. }
            | Self::InvalidEventHandleTarget => None,
        }
    }
}

/// Remembers the first error of a flush while later work keeps running.
#[derive(Debug, Default)]
pub(crate) struct FirstError(Option<DispatchError>);

impl FirstError {
    pub(crate) fn record(&mut self, err: DispatchError) {
        if self.0.is_none() {
            self.0 = Some(err);
        } else {
            tracing::debug!(error = %err, "dropping secondary dispatch error");
        }
    }

    pub(crate) fn record_result(&mut self, result: Result<(), DispatchError>) {
        if let Err(err) = result {
            self.record(err);
        }
    }

    pub(crate) fn into_result(self) -> Result<(), DispatchError> {
        match self.0 {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
