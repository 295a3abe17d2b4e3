// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property bags and listener values.
//!
//! Props are the committed, per-node properties a reconciler hands to the event
//! system. Handler props (`onClick`, `onChangeCapture`, ...) hold [`Listener`]s;
//! everything else is plain data read by plugins (`disabled`, `value`, `checked`).

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::{DispatchError, ListenerResult};
use crate::synthetic::SyntheticEvent;

/// A user event handler.
pub type Listener = Rc<dyn Fn(&mut SyntheticEvent) -> ListenerResult>;

/// Wrap a closure as a [`Listener`].
pub fn listener(f: impl Fn(&mut SyntheticEvent) -> ListenerResult + 'static) -> Listener {
    Rc::new(f)
}

/// A single prop value.
#[derive(Clone)]
pub enum PropValue {
    /// Explicit absence (`null`/`undefined`).
    Null,
    /// Boolean prop.
    Bool(bool),
    /// Numeric prop.
    Number(f64),
    /// String prop.
    Str(String),
    /// Event handler.
    Listener(Listener),
}

impl core::fmt::Debug for PropValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Self::Listener(_) => f.write_str("Listener(..)"),
        }
    }
}

impl PropValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Listener(_) => "function",
        }
    }

    fn is_falsy(&self) -> bool {
        match self {
            Self::Null | Self::Bool(false) => true,
            Self::Number(n) => *n == 0.0 || n.is_nan(),
            Self::Str(s) => s.is_empty(),
            Self::Bool(true) | Self::Listener(_) => false,
        }
    }

    /// String form used when writing a prop back to the platform.
    pub fn to_platform_string(&self) -> Option<String> {
        match self {
            Self::Null | Self::Listener(_) => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(n) => Some(n.to_string()),
            Self::Str(s) => Some(s.clone()),
        }
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Listener> for PropValue {
    fn from(value: Listener) -> Self {
        Self::Listener(value)
    }
}

/// A committed property bag.
#[derive(Clone, Debug, Default)]
pub struct Props {
    entries: BTreeMap<String, PropValue>,
}

impl Props {
    /// Empty props.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<PropValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Builder-style handler insert.
    pub fn on(
        self,
        name: &str,
        f: impl Fn(&mut SyntheticEvent) -> ListenerResult + 'static,
    ) -> Self {
        self.with(name, listener(f))
    }

    /// Insert or replace a prop.
    pub fn set(&mut self, name: &str, value: impl Into<PropValue>) {
        self.entries.insert(name.to_owned(), value.into());
    }

    /// Remove a prop.
    pub fn remove(&mut self, name: &str) -> Option<PropValue> {
        self.entries.remove(name)
    }

    /// Raw prop lookup.
    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.entries.get(name)
    }

    /// True if the prop is present and not `Null`.
    pub fn has(&self, name: &str) -> bool {
        !matches!(self.get(name), None | Some(PropValue::Null))
    }

    /// JavaScript-style truthiness of a prop.
    pub fn is_truthy(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.is_falsy())
    }

    /// Handler stored under `registration_name`.
    ///
    /// Falsy values read as "no handler"; any other non-handler value is an error.
    pub fn listener(&self, registration_name: &str) -> Result<Option<&Listener>, DispatchError> {
        match self.get(registration_name) {
            None => Ok(None),
            Some(PropValue::Listener(l)) => Ok(Some(l)),
            Some(v) if v.is_falsy() => Ok(None),
            Some(v) => Err(DispatchError::InvalidListener {
                registration_name: registration_name.to_owned(),
                found: v.type_name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falsy_handlers_are_absent() {
        let props = Props::new()
            .with("onClick", PropValue::Null)
            .with("onKeyDown", false)
            .with("onBlur", "");
        assert!(props.listener("onClick").unwrap().is_none());
        assert!(props.listener("onKeyDown").unwrap().is_none());
        assert!(props.listener("onBlur").unwrap().is_none());
        assert!(props.listener("onFocus").unwrap().is_none());
    }

    #[test]
    fn non_callable_handler_is_an_error() {
        let props = Props::new().with("onClick", "alert(1)");
        assert!(matches!(
            props.listener("onClick"),
            Err(DispatchError::InvalidListener { found: "string", .. })
        ));
    }

    #[test]
    fn truthiness() {
        let props = Props::new()
            .with("disabled", true)
            .with("hidden", false)
            .with("value", "");
        assert!(props.is_truthy("disabled"));
        assert!(!props.is_truthy("hidden"));
        assert!(!props.is_truthy("value"));
        assert!(props.has("value"));
        assert!(!props.has("checked"));
    }
}
