//! Manual script load: the page installs the Drift widget itself and calls `ready()` on the
//! plugin. Once ready, configured widget events are relayed to the analytics instance and
//! conversation starts are reported as a `Start Conversation` track call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use drift_analytics_plugin::drift::{
    AnalyticsInstance, AnalyticsPayload, AnalyticsPlugin, DriftPlugin, DriftPluginConfig,
    DriftSettings, DriftWidget, IdentifyOptions, MethodParams, NativeEvent, NativeEventHandler,
    PluginContext, Properties, RelayedEvent, ScriptLoad, WidgetHost,
};
use serde_json::json;

#[derive(Default)]
struct PageWidget {
    handlers: Mutex<HashMap<String, Vec<NativeEventHandler>>>,
}

impl PageWidget {
    fn fire(&self, event: &str, native: NativeEvent) {
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
}

impl DriftWidget for PageWidget {
    fn load(&self, _drift_id: &str) {}

    fn has_initialized(&self) -> bool {
        true
    }

    fn page(&self) {}

    fn track(&self, event: &str, properties: &Properties) {
        println!("drift.track({event}, {})", json!(properties));
    }

    fn identify(&self, _user_id: &str, _traits: &Properties, _options: Option<&IdentifyOptions>) {}

    fn set_user_attributes(&self, attributes: &Properties) {
        println!("drift.api.setUserAttributes({})", json!(attributes));
    }

    fn on(&self, event: &str, handler: NativeEventHandler) {
        self.handlers
            .lock()
            .unwrap()
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }
}

struct PageHost {
    widget: Arc<PageWidget>,
}

impl WidgetHost for PageHost {
    fn install_snippet(&self) -> bool {
        false
    }

    fn widget(&self) -> Option<Arc<dyn DriftWidget>> {
        Some(self.widget.clone() as Arc<dyn DriftWidget>)
    }
}

struct PrintingInstance;

impl AnalyticsInstance for PrintingInstance {
    fn dispatch(&self, event: RelayedEvent) {
        println!("analytics.dispatch({})", json!(event));
    }

    fn track(&self, event: &str, properties: Properties) {
        println!("analytics.track({event}, {})", json!(properties));
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = DriftSettings::from_json(
        r#"{
            "driftId": "abc123",
            "scriptLoad": "manual",
            "events": ["campaign:open", "startConversation"],
            "trackConversationStarts": true
        }"#,
    )?;
    assert_eq!(settings.script_load, ScriptLoad::Manual);

    let widget = Arc::new(PageWidget::default());
    let host = Arc::new(PageHost {
        widget: widget.clone(),
    });
    let plugin = DriftPlugin::new(DriftPluginConfig::new(settings), host)?;
    let instance: Arc<dyn AnalyticsInstance> = Arc::new(PrintingInstance);
    plugin.initialize(&PluginContext::new(instance.clone())).await?;

    let params = MethodParams::new(instance.clone(), AnalyticsPayload::track("Visited Docs", Properties::new()));
    plugin.track(&params).await?;

    plugin.ready().await?;
    widget.fire(
        "ready",
        NativeEvent::with_meta(json!({}), json!({"widgetVisible": true})),
    );
    plugin.wait_until_ready().await;

    widget.fire("campaign:open", NativeEvent::new(json!({"campaignId": 7})));
    widget.fire(
        "startConversation",
        NativeEvent::new(json!({"conversationId": 1, "inboxId": 1})),
    );
    Ok(())
}
