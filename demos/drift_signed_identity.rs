//! Signed identity: the plugin asks a token resolver for a JWT and identifies the visitor with
//! it before the widget loads. Replace the resolver body with a call to your own backend.

use std::sync::Arc;

use drift_analytics_plugin::drift::{
    AnalyticsInstance, AnalyticsPayload, AnalyticsPlugin, DriftPlugin, DriftPluginConfig,
    DriftSettings, DriftWidget, FnTokenResolver, IdentifyOptions, IdentityMode, MethodParams,
    NativeEventHandler, PluginContext, Properties, RelayedEvent, WidgetHost,
};
use drift_analytics_plugin::platform::token::box_token_future;
use serde_json::json;

struct PrintingWidget;

impl DriftWidget for PrintingWidget {
    fn load(&self, drift_id: &str) {
        println!("drift.load({drift_id})");
    }

    fn has_initialized(&self) -> bool {
        false
    }

    fn page(&self) {}

    fn track(&self, _event: &str, _properties: &Properties) {}

    fn identify(&self, user_id: &str, traits: &Properties, options: Option<&IdentifyOptions>) {
        println!(
            "drift.identify({user_id}, {}, {})",
            json!(traits),
            json!(options)
        );
    }

    fn set_user_attributes(&self, _attributes: &Properties) {}

    fn on(&self, _event: &str, _handler: NativeEventHandler) {}
}

struct PrintingHost;

impl WidgetHost for PrintingHost {
    fn install_snippet(&self) -> bool {
        true
    }

    fn widget(&self) -> Option<Arc<dyn DriftWidget>> {
        Some(Arc::new(PrintingWidget) as Arc<dyn DriftWidget>)
    }
}

struct QuietInstance;

impl AnalyticsInstance for QuietInstance {
    fn dispatch(&self, _event: RelayedEvent) {}

    fn track(&self, _event: &str, _properties: Properties) {}
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let resolver = FnTokenResolver::new(|user_id: String| {
        box_token_future(async move { Ok(format!("signed-token-for-{user_id}")) })
    });
    let settings = DriftSettings::new("abc123").with_identity_type(IdentityMode::Signed);
    let config = DriftPluginConfig::new(settings).with_resolver(resolver.into_arc());
    let plugin = DriftPlugin::new(config, Arc::new(PrintingHost))?;
    let instance: Arc<dyn AnalyticsInstance> = Arc::new(QuietInstance);

    let mut traits = Properties::new();
    traits.insert("email".into(), json!("visitor@example.com"));
    let params = MethodParams::new(instance.clone(), AnalyticsPayload::identify("user-42", traits));
    plugin.identify(&params).await?;

    plugin.initialize(&PluginContext::new(instance)).await?;
    Ok(())
}
