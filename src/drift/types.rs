use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::drift::plugin::AnalyticsInstance;

/// Free-form property/trait mapping forwarded to the widget untouched.
pub type Properties = Map<String, Value>;

/// Normalized analytics call as delivered by the host analytics library.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnalyticsPayload {
    Page {
        #[serde(default)]
        properties: Properties,
    },
    Track {
        event: String,
        #[serde(default)]
        properties: Properties,
    },
    Identify {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(default)]
        traits: Properties,
    },
}

impl AnalyticsPayload {
    pub fn page(properties: Properties) -> Self {
        AnalyticsPayload::Page { properties }
    }

    pub fn track(event: impl Into<String>, properties: Properties) -> Self {
        AnalyticsPayload::Track {
            event: event.into(),
            properties,
        }
    }

    pub fn identify(user_id: impl Into<String>, traits: Properties) -> Self {
        AnalyticsPayload::Identify {
            user_id: user_id.into(),
            traits,
        }
    }

    pub fn kind(&self) -> CallKind {
        match self {
            AnalyticsPayload::Page { .. } => CallKind::Page,
            AnalyticsPayload::Track { .. } => CallKind::Track,
            AnalyticsPayload::Identify { .. } => CallKind::Identify,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
    Page,
    Track,
    Identify,
}

impl CallKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CallKind::Page => "page",
            CallKind::Track => "track",
            CallKind::Identify => "identify",
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A call accepted before the widget was ready, tagged with its arrival position.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingCall {
    pub sequence: u64,
    pub payload: AnalyticsPayload,
}

impl PendingCall {
    pub fn kind(&self) -> CallKind {
        self.payload.kind()
    }
}

/// Arguments the widget passes to a native event handler: `(data, meta?)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NativeEvent {
    pub data: Value,
    pub meta: Option<Value>,
}

impl NativeEvent {
    pub fn new(data: Value) -> Self {
        Self { data, meta: None }
    }

    pub fn with_meta(data: Value, meta: Value) -> Self {
        Self {
            data,
            meta: Some(meta),
        }
    }
}

/// Record published on the analytics bus for every relayed native event.
///
/// Handlers invoked with a single argument produce `{type, payload}`. When the widget also
/// passes metadata (the `ready` event hands over its API object first), the first argument is
/// exposed as `api` and the metadata becomes the payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelayedEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<Value>,
}

impl RelayedEvent {
    pub fn from_native(event_type: impl Into<String>, event: &NativeEvent) -> Self {
        let event_type = event_type.into();
        match &event.meta {
            None => Self {
                event_type,
                payload: event.data.clone(),
                api: None,
            },
            Some(meta) => Self {
                event_type,
                payload: meta.clone(),
                api: Some(event.data.clone()),
            },
        }
    }
}

/// Snapshot of the user the host analytics library already knows about.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KnownUser {
    pub user_id: Option<String>,
    pub traits: Properties,
}

/// Context handed to [`AnalyticsPlugin::initialize`](crate::drift::AnalyticsPlugin::initialize).
#[derive(Clone)]
pub struct PluginContext {
    pub instance: Arc<dyn AnalyticsInstance>,
}

impl PluginContext {
    pub fn new(instance: Arc<dyn AnalyticsInstance>) -> Self {
        Self { instance }
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext").finish_non_exhaustive()
    }
}

/// Context handed to the page/track/identify plugin hooks.
#[derive(Clone)]
pub struct MethodParams {
    pub instance: Arc<dyn AnalyticsInstance>,
    pub payload: AnalyticsPayload,
}

impl MethodParams {
    pub fn new(instance: Arc<dyn AnalyticsInstance>, payload: AnalyticsPayload) -> Self {
        Self { instance, payload }
    }
}

impl fmt::Debug for MethodParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodParams")
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}
