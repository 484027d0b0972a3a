//! Collaborator traits standing in for the script-injected `window.drift` object.

use std::sync::Arc;

use serde::Serialize;

use crate::drift::types::{NativeEvent, Properties};

/// Callback registered for a native widget event.
pub type NativeEventHandler = Arc<dyn Fn(&NativeEvent) + Send + Sync + 'static>;

/// Extra options accepted by the widget's `identify` call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IdentifyOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
}

impl IdentifyOptions {
    pub fn signed(jwt: impl Into<String>) -> Self {
        Self { jwt: Some(jwt.into()) }
    }
}

/// Handle on a loaded (or loading) widget instance.
///
/// Calls made before the widget script finishes loading are queued by the snippet itself, but
/// the plugin never relies on that: it only invokes the widget once the `ready` event fired,
/// except for the identity call that has to precede `load`.
pub trait DriftWidget: Send + Sync {
    /// Starts fetching and initializing the widget for the given account.
    fn load(&self, drift_id: &str);

    /// `true` once `load` has been invoked on this handle.
    fn has_initialized(&self) -> bool;

    /// `true` when the widget already signaled readiness.
    fn api_ready(&self) -> bool {
        false
    }

    fn page(&self);

    fn track(&self, event: &str, properties: &Properties);

    fn identify(&self, user_id: &str, traits: &Properties, options: Option<&IdentifyOptions>);

    fn set_user_attributes(&self, attributes: &Properties);

    /// Registers a listener for a native widget event.
    fn on(&self, event: &str, handler: NativeEventHandler);
}

/// Environment that can install the widget snippet and hand out the resulting handle.
pub trait WidgetHost: Send + Sync {
    /// Installs the widget snippet. Returns `false` when a snippet was already present, in which
    /// case the plugin leaves loading to whoever installed it.
    fn install_snippet(&self) -> bool;

    /// The current widget handle, if any snippet has been installed.
    fn widget(&self) -> Option<Arc<dyn DriftWidget>>;
}
