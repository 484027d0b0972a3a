use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;

use crate::drift::config::{DriftPluginConfig, DriftSettings, IdentityMode, ScriptLoad};
use crate::drift::constants::{DRIFT_PLUGIN_NAME, READY_EVENT};
use crate::drift::dispatcher::CallDispatcher;
use crate::drift::error::{widget_unavailable, DriftResult};
use crate::drift::gate::{FlushReport, ReadinessGate, ReadinessState};
use crate::drift::identity::IdentityResolver;
use crate::drift::relay::NativeEventRelay;
use crate::drift::types::{
    AnalyticsPayload, KnownUser, MethodParams, NativeEvent, PendingCall, PluginContext, Properties,
    RelayedEvent,
};
use crate::drift::widget::{DriftWidget, NativeEventHandler, WidgetHost};
use crate::platform::runtime::spawn_detached;

/// The host analytics instance, as seen by a plugin.
pub trait AnalyticsInstance: Send + Sync {
    /// Publishes an event on the analytics bus.
    fn dispatch(&self, event: RelayedEvent);

    /// Reports a synthetic analytics event through the host pipeline.
    fn track(&self, event: &str, properties: Properties);

    /// The user the host already identified, if any.
    fn user(&self) -> Option<KnownUser> {
        None
    }
}

/// Contract the host analytics library expects from a destination plugin.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait AnalyticsPlugin: Send + Sync {
    fn name(&self) -> &str;

    async fn initialize(&self, context: &PluginContext) -> DriftResult<()>;

    async fn page(&self, params: &MethodParams) -> DriftResult<()>;

    async fn track(&self, params: &MethodParams) -> DriftResult<()>;

    async fn identify(&self, params: &MethodParams) -> DriftResult<()>;

    /// Whether the plugin can receive calls.
    fn loaded(&self) -> bool;
}

/// Analytics destination forwarding page/track/identify calls to the Drift widget.
///
/// Calls are accepted at any time. Until the widget fires its `ready` event (or the host calls
/// [`DriftPlugin::ready`] in manual mode) they are buffered, then replayed once in order.
#[derive(Clone)]
pub struct DriftPlugin {
    inner: Arc<DriftPluginInner>,
}

struct DriftPluginInner {
    settings: DriftSettings,
    host: Arc<dyn WidgetHost>,
    dispatcher: CallDispatcher,
    gate: ReadinessGate,
    relay: NativeEventRelay,
    instance: Mutex<Option<Arc<dyn AnalyticsInstance>>>,
    awaiting_identity: AtomicBool,
    listening_for_ready: AtomicBool,
}

impl fmt::Debug for DriftPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriftPlugin")
            .field("drift_id", &self.inner.settings.drift_id)
            .field("state", &self.inner.gate.state())
            .finish()
    }
}

impl DriftPlugin {
    pub fn new(config: DriftPluginConfig, host: Arc<dyn WidgetHost>) -> DriftResult<Self> {
        config.validate()?;
        let DriftPluginConfig { settings, resolver } = config;
        let identity = IdentityResolver::new(settings.identity_type, resolver);
        let relay = NativeEventRelay::new(settings.events.clone(), settings.track_conversation_starts);
        let inner = DriftPluginInner {
            dispatcher: CallDispatcher::new(host.clone(), identity),
            host,
            gate: ReadinessGate::new(),
            relay,
            instance: Mutex::new(None),
            awaiting_identity: AtomicBool::new(false),
            listening_for_ready: AtomicBool::new(false),
            settings,
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn settings(&self) -> &DriftSettings {
        &self.inner.settings
    }

    /// The `EVENTS` map advertised to the analytics library.
    pub fn events(&self) -> BTreeMap<String, String> {
        self.inner.settings.events_map()
    }

    pub fn state(&self) -> ReadinessState {
        self.inner.gate.state()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.gate.is_ready()
    }

    /// Calls buffered while waiting for the widget, in arrival order.
    pub fn pending_calls(&self) -> Vec<PendingCall> {
        self.inner.gate.pending()
    }

    /// Resolves once the widget became ready and the buffered calls were flushed.
    pub async fn wait_until_ready(&self) {
        self.inner.gate.wait_until_ready().await
    }

    /// Manual-load extension method: the host installed the widget itself and asks the plugin
    /// to start talking to it. Readiness happens immediately when the widget already signaled
    /// it, otherwise on the widget's `ready` event.
    pub async fn ready(&self) -> DriftResult<()> {
        let widget = self
            .inner
            .host
            .widget()
            .ok_or_else(|| widget_unavailable("ready() called before the Drift widget was installed"))?;
        if widget.api_ready() {
            self.mark_ready().await?;
        } else {
            self.listen_for_ready(widget.as_ref());
        }
        Ok(())
    }

    /// Forces the readiness transition. Only the first call flushes and starts relaying native
    /// events; later calls return `Ok(None)`.
    pub async fn mark_ready(&self) -> DriftResult<Option<FlushReport>> {
        let widget = self
            .inner
            .host
            .widget()
            .ok_or_else(|| widget_unavailable("cannot mark the Drift widget ready before it is installed"))?;
        let report = self
            .inner
            .gate
            .mark_ready(&self.inner.dispatcher, || self.start_relay(widget.as_ref()))
            .await;
        Ok(report)
    }

    async fn submit(&self, payload: AnalyticsPayload) -> DriftResult<()> {
        if matches!(payload, AnalyticsPayload::Identify { .. })
            && !self.inner.gate.is_ready()
            && self.inner.awaiting_identity.swap(false, Ordering::SeqCst)
        {
            self.identify_then_load(&payload).await;
            return Ok(());
        }

        self.inner
            .gate
            .submit(payload, &self.inner.dispatcher)
            .await
            .map(|_| ())
    }

    fn remember_instance(&self, instance: &Arc<dyn AnalyticsInstance>) {
        let mut guard = self.inner.instance.lock().unwrap();
        if guard.is_none() {
            *guard = Some(instance.clone());
        }
    }

    fn instance(&self) -> Option<Arc<dyn AnalyticsInstance>> {
        self.inner.instance.lock().unwrap().clone()
    }

    fn start_relay(&self, widget: &dyn DriftWidget) {
        match self.instance() {
            Some(instance) => {
                self.inner.relay.subscribe(widget, instance);
            }
            None => log::warn!("no analytics instance attached; Drift events will not be relayed"),
        }
    }

    fn listen_for_ready(&self, widget: &dyn DriftWidget) {
        if self.inner.listening_for_ready.swap(true, Ordering::SeqCst) {
            return;
        }
        let plugin: Weak<DriftPluginInner> = Arc::downgrade(&self.inner);
        let handler: NativeEventHandler = Arc::new(move |_event: &NativeEvent| {
            let Some(inner) = plugin.upgrade() else {
                return;
            };
            let plugin = DriftPlugin { inner };
            spawn_detached(async move {
                if let Err(err) = plugin.mark_ready().await {
                    log::error!("failed to complete Drift readiness: {err}");
                }
            });
        });
        widget.on(READY_EVENT, handler);
    }

    async fn load_widget(&self, widget: &dyn DriftWidget, context: &PluginContext) {
        let settings = &self.inner.settings;
        if settings.identity_type == IdentityMode::UserAttributes {
            widget.load(&settings.drift_id);
            return;
        }

        let identity = self
            .inner
            .gate
            .supersede_identity()
            .map(|call| call.payload)
            .or_else(|| known_user_payload(context.instance.user()));

        match identity {
            Some(payload) => self.identify_then_load(&payload).await,
            None if settings.defer_load_until_identified => {
                log::debug!("deferring Drift widget load until the first identify call");
                self.inner.awaiting_identity.store(true, Ordering::SeqCst);
            }
            None => widget.load(&settings.drift_id),
        }
    }

    /// Identifies ahead of the general flush so the widget loads for a known visitor. A failed
    /// identification is logged and the widget still loads anonymously.
    async fn identify_then_load(&self, payload: &AnalyticsPayload) {
        if let Err(err) = self.inner.dispatcher.dispatch(payload).await {
            log::error!("failed to identify before loading the Drift widget: {err}");
        }
        if let Some(widget) = self.inner.host.widget() {
            if !widget.has_initialized() {
                widget.load(&self.inner.settings.drift_id);
            }
        }
    }
}

fn known_user_payload(user: Option<KnownUser>) -> Option<AnalyticsPayload> {
    let user = user?;
    let user_id = user.user_id.filter(|id| !id.is_empty())?;
    Some(AnalyticsPayload::identify(user_id, user.traits))
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl AnalyticsPlugin for DriftPlugin {
    fn name(&self) -> &str {
        DRIFT_PLUGIN_NAME
    }

    async fn initialize(&self, context: &PluginContext) -> DriftResult<()> {
        self.remember_instance(&context.instance);
        if self.inner.settings.script_load == ScriptLoad::Manual {
            log::debug!("Drift script load is manual; waiting for ready()");
            return Ok(());
        }

        if !self.inner.host.install_snippet() {
            log::warn!("Drift snippet included twice; leaving the existing widget untouched");
            return Ok(());
        }
        let widget = self
            .inner
            .host
            .widget()
            .ok_or_else(|| widget_unavailable("Drift snippet installed but no widget handle is available"))?;

        self.listen_for_ready(widget.as_ref());
        self.load_widget(widget.as_ref(), context).await;
        Ok(())
    }

    async fn page(&self, params: &MethodParams) -> DriftResult<()> {
        self.remember_instance(&params.instance);
        if !self.inner.settings.page {
            log::debug!("Drift page forwarding is disabled; ignoring page call");
            return Ok(());
        }
        self.submit(params.payload.clone()).await
    }

    async fn track(&self, params: &MethodParams) -> DriftResult<()> {
        self.remember_instance(&params.instance);
        self.submit(params.payload.clone()).await
    }

    async fn identify(&self, params: &MethodParams) -> DriftResult<()> {
        self.remember_instance(&params.instance);
        self.submit(params.payload.clone()).await
    }

    fn loaded(&self) -> bool {
        true
    }
}
