// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event system configuration.

use ripple_dom::{Document, PlatformFeatures};

/// Configuration for an [`EventSystem`](crate::EventSystem).
///
/// ## Usage
///
/// - Start from [`EventSystemConfig::detect`] to pick up the platform's feature
///   detection results once, at startup.
/// - Toggle optional APIs with the `set_*` methods.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EventSystemConfig {
    /// Platform capabilities.
    pub features: PlatformFeatures,
    /// Collect listeners bound through the event handle API.
    pub enable_event_handle_api: bool,
    /// Collect event handle listeners bound to scopes.
    pub enable_scope_api: bool,
    /// Log a warning when a handler name is registered twice.
    pub warn_on_duplicate_registration: bool,
}

impl Default for EventSystemConfig {
    fn default() -> Self {
        Self {
            features: PlatformFeatures::default(),
            enable_event_handle_api: true,
            enable_scope_api: true,
            warn_on_duplicate_registration: cfg!(debug_assertions),
        }
    }
}

impl EventSystemConfig {
    /// Default configuration with the features reported by `doc`.
    pub fn detect(doc: &Document) -> Self {
        Self {
            features: doc.features(),
            ..Self::default()
        }
    }

    /// Enable or disable the event handle API.
    pub fn set_event_handle_api(mut self, enabled: bool) -> Self {
        self.enable_event_handle_api = enabled;
        self
    }

    /// Enable or disable scope listeners.
    pub fn set_scope_api(mut self, enabled: bool) -> Self {
        self.enable_scope_api = enabled;
        self
    }

    /// Enable or disable duplicate-registration warnings.
    pub fn set_warn_on_duplicate_registration(mut self, enabled: bool) -> Self {
        self.warn_on_duplicate_registration = enabled;
        self
    }

    /// True when composition data must be derived by diffing text.
    ///
    /// Old engines either lack composition events or report unreliable data in
    /// document modes 9 to 11.
    pub fn use_fallback_composition_data(&self) -> bool {
        !self.features.composition_event
            || self.features.document_mode.is_some_and(|m| m > 8 && m <= 11)
    }

    /// True when the composition plugin can rely on native composition events.
    pub fn can_use_composition_event(&self) -> bool {
        self.features.composition_event
    }

    /// True when `textInput` can feed before-input events.
    pub fn can_use_text_input_event(&self) -> bool {
        self.features.text_event && self.features.document_mode.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_reads_document_features() {
        let doc = Document::with_features(PlatformFeatures::legacy(9));
        let config = EventSystemConfig::detect(&doc);
        assert!(!config.features.input_event);
        assert!(config.use_fallback_composition_data());
        assert!(!config.can_use_text_input_event());
    }

    #[test]
    fn modern_defaults() {
        let config = EventSystemConfig::default();
        assert!(!config.use_fallback_composition_data());
        assert!(config.can_use_composition_event());
        assert!(config.enable_event_handle_api);
    }
}
