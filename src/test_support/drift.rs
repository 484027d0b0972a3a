use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::drift::{
    AnalyticsInstance, DriftWidget, IdentifyOptions, IdentityTokenResolver, KnownUser, NativeEvent,
    NativeEventHandler, Properties, RelayedEvent, WidgetHost,
};
use crate::platform::token::TokenError;

/// Builds a property map from integer-valued pairs.
pub fn props(pairs: &[(&str, i64)]) -> Properties {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), json!(value)))
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub enum WidgetCall {
    Load(String),
    Page,
    Track(String, Properties),
    Identify(String, Properties, Option<IdentifyOptions>),
    SetUserAttributes(Properties),
}

#[derive(Default)]
pub struct RecordingWidget {
    calls: Mutex<Vec<WidgetCall>>,
    handlers: Mutex<HashMap<String, Vec<NativeEventHandler>>>,
    subscriptions: AtomicUsize,
    initialized: AtomicBool,
    api_ready: AtomicBool,
}

impl RecordingWidget {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<WidgetCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn tracked_events(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                WidgetCall::Track(name, _) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn identified_users(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                WidgetCall::Identify(user_id, _, _) => Some(user_id),
                _ => None,
            })
            .collect()
    }

    pub fn load_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, WidgetCall::Load(_)))
            .count()
    }

    /// Total number of `on` registrations, across all event names.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers
            .lock()
            .unwrap()
            .get(event)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn set_api_ready(&self, ready: bool) {
        self.api_ready.store(ready, Ordering::SeqCst);
    }

    /// Fires a native event, invoking every handler registered for it.
    pub fn emit(&self, event: &str, native: NativeEvent) {
        let handlers = self
            .handlers
            .lock()
            .unwrap()
            .get(event)
            .cloned()
            .unwrap_or_default();
        for handler in handlers {
            handler(&native);
        }
    }

    pub fn emit_ready(&self) {
        self.set_api_ready(true);
        self.emit(
            "ready",
            NativeEvent::with_meta(json!({}), json!({"chatOpen": false, "widgetVisible": true})),
        );
    }

    fn record(&self, call: WidgetCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl DriftWidget for RecordingWidget {
    fn load(&self, drift_id: &str) {
        self.initialized.store(true, Ordering::SeqCst);
        self.record(WidgetCall::Load(drift_id.to_string()));
    }

    fn has_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn api_ready(&self) -> bool {
        self.api_ready.load(Ordering::SeqCst)
    }

    fn page(&self) {
        self.record(WidgetCall::Page);
    }

    fn track(&self, event: &str, properties: &Properties) {
        self.record(WidgetCall::Track(event.to_string(), properties.clone()));
    }

    fn identify(&self, user_id: &str, traits: &Properties, options: Option<&IdentifyOptions>) {
        self.record(WidgetCall::Identify(
            user_id.to_string(),
            traits.clone(),
            options.cloned(),
        ));
    }

    fn set_user_attributes(&self, attributes: &Properties) {
        self.record(WidgetCall::SetUserAttributes(attributes.clone()));
    }

    fn on(&self, event: &str, handler: NativeEventHandler) {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        self.handlers
            .lock()
            .unwrap()
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }
}

/// Widget host whose snippet installation creates a [`RecordingWidget`].
#[derive(Default)]
pub struct RecordingHost {
    widget: Mutex<Option<Arc<RecordingWidget>>>,
    installs: AtomicUsize,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A host where some other script already installed the widget.
    pub fn with_widget(widget: Arc<RecordingWidget>) -> Arc<Self> {
        Arc::new(Self {
            widget: Mutex::new(Some(widget)),
            installs: AtomicUsize::new(0),
        })
    }

    pub fn attach(&self, widget: Arc<RecordingWidget>) {
        *self.widget.lock().unwrap() = Some(widget);
    }

    pub fn recording_widget(&self) -> Option<Arc<RecordingWidget>> {
        self.widget.lock().unwrap().clone()
    }

    pub fn install_count(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }
}

impl WidgetHost for RecordingHost {
    fn install_snippet(&self) -> bool {
        let mut guard = self.widget.lock().unwrap();
        if guard.is_some() {
            return false;
        }
        self.installs.fetch_add(1, Ordering::SeqCst);
        *guard = Some(RecordingWidget::new());
        true
    }

    fn widget(&self) -> Option<Arc<dyn DriftWidget>> {
        self.widget
            .lock()
            .unwrap()
            .clone()
            .map(|widget| widget as Arc<dyn DriftWidget>)
    }
}

/// Analytics instance that records everything published on its bus.
#[derive(Default)]
pub struct RecordingInstance {
    dispatched: Mutex<Vec<RelayedEvent>>,
    tracked: Mutex<Vec<(String, Properties)>>,
    user: Mutex<Option<KnownUser>>,
}

impl RecordingInstance {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_user(user_id: &str, traits: Properties) -> Arc<Self> {
        let instance = Self::default();
        *instance.user.lock().unwrap() = Some(KnownUser {
            user_id: Some(user_id.to_string()),
            traits,
        });
        Arc::new(instance)
    }

    pub fn dispatched(&self) -> Vec<RelayedEvent> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn tracked(&self) -> Vec<(String, Properties)> {
        self.tracked.lock().unwrap().clone()
    }
}

impl AnalyticsInstance for RecordingInstance {
    fn dispatch(&self, event: RelayedEvent) {
        self.dispatched.lock().unwrap().push(event);
    }

    fn track(&self, event: &str, properties: Properties) {
        self.tracked
            .lock()
            .unwrap()
            .push((event.to_string(), properties));
    }

    fn user(&self) -> Option<KnownUser> {
        self.user.lock().unwrap().clone()
    }
}

/// Resolver answering `"{prefix}-{user_id}"` immediately.
#[derive(Clone)]
pub struct StaticResolver {
    prefix: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StaticResolver {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl IdentityTokenResolver for StaticResolver {
    async fn resolve(&self, user_id: &str) -> Result<String, TokenError> {
        self.requests.lock().unwrap().push(user_id.to_string());
        Ok(format!("{}-{}", self.prefix, user_id))
    }
}

pub struct FailingResolver;

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl IdentityTokenResolver for FailingResolver {
    async fn resolve(&self, _user_id: &str) -> Result<String, TokenError> {
        Err(TokenError::new("token endpoint unavailable"))
    }
}

/// Resolver that suspends until the test releases a token through [`GatedResolver::release`].
#[derive(Clone)]
pub struct GatedResolver {
    sender: async_channel::Sender<String>,
    receiver: async_channel::Receiver<String>,
}

impl GatedResolver {
    pub fn new() -> Self {
        let (sender, receiver) = async_channel::unbounded();
        Self { sender, receiver }
    }

    pub fn release(&self, token: &str) {
        let _ = self.sender.try_send(token.to_string());
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl IdentityTokenResolver for GatedResolver {
    async fn resolve(&self, _user_id: &str) -> Result<String, TokenError> {
        self.receiver
            .recv()
            .await
            .map_err(|err| TokenError::new(err.to_string()))
    }
}

pub fn campaign_payload(campaign_id: i64) -> Value {
    json!({ "campaignId": campaign_id })
}
