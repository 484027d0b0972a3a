//! Tracks events before the Drift widget is ready and shows them being replayed, in order, once
//! the widget fires `ready`. The widget is simulated by printing every call it receives.

use std::sync::{Arc, Mutex};

use drift_analytics_plugin::drift::{
    AnalyticsInstance, AnalyticsPayload, AnalyticsPlugin, DriftPlugin, DriftPluginConfig,
    DriftSettings, DriftWidget, IdentifyOptions, MethodParams, NativeEvent, NativeEventHandler,
    PluginContext, Properties, RelayedEvent, WidgetHost,
};
use serde_json::json;

#[derive(Default)]
struct PrintingWidget {
    ready_handlers: Mutex<Vec<NativeEventHandler>>,
}

impl PrintingWidget {
    fn fire_ready(&self) {
        let handlers = self.ready_handlers.lock().unwrap().clone();
        for handler in handlers {
            handler(&NativeEvent::new(json!({})));
        }
    }
}

impl DriftWidget for PrintingWidget {
    fn load(&self, drift_id: &str) {
        println!("drift.load({drift_id})");
    }

    fn has_initialized(&self) -> bool {
        true
    }

    fn page(&self) {
        println!("drift.page()");
    }

    fn track(&self, event: &str, properties: &Properties) {
        println!("drift.track({event}, {})", json!(properties));
    }

    fn identify(&self, user_id: &str, traits: &Properties, _options: Option<&IdentifyOptions>) {
        println!("drift.identify({user_id}, {})", json!(traits));
    }

    fn set_user_attributes(&self, attributes: &Properties) {
        println!("drift.api.setUserAttributes({})", json!(attributes));
    }

    fn on(&self, event: &str, handler: NativeEventHandler) {
        if event == "ready" {
            self.ready_handlers.lock().unwrap().push(handler);
        }
    }
}

struct PrintingHost {
    widget: Arc<PrintingWidget>,
}

impl WidgetHost for PrintingHost {
    fn install_snippet(&self) -> bool {
        true
    }

    fn widget(&self) -> Option<Arc<dyn DriftWidget>> {
        Some(self.widget.clone() as Arc<dyn DriftWidget>)
    }
}

struct QuietInstance;

impl AnalyticsInstance for QuietInstance {
    fn dispatch(&self, _event: RelayedEvent) {}

    fn track(&self, _event: &str, _properties: Properties) {}
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let widget = Arc::new(PrintingWidget::default());
    let host = Arc::new(PrintingHost {
        widget: widget.clone(),
    });
    let plugin = DriftPlugin::new(DriftPluginConfig::new(DriftSettings::new("abc123")), host)?;
    let instance: Arc<dyn AnalyticsInstance> = Arc::new(QuietInstance);

    plugin.initialize(&PluginContext::new(instance.clone())).await?;

    for (index, name) in ["Signed Up", "Viewed Pricing"].into_iter().enumerate() {
        let mut properties = Properties::new();
        properties.insert("step".into(), json!(index));
        let params = MethodParams::new(instance.clone(), AnalyticsPayload::track(name, properties));
        plugin.track(&params).await?;
    }
    println!("{} call(s) buffered before ready", plugin.pending_calls().len());

    widget.fire_ready();
    plugin.wait_until_ready().await;
    println!("widget ready: {}", plugin.is_ready());

    Ok(())
}
