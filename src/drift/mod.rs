mod config;
pub mod constants;
mod dispatcher;
pub mod error;
mod gate;
mod identity;
mod plugin;
mod relay;
mod resolver;
pub mod snippet;
mod types;
mod widget;

pub use config::{DriftPluginConfig, DriftSettings, IdentityMode, ScriptLoad};
pub use dispatcher::CallDispatcher;
pub use error::{DriftError, DriftErrorCode, DriftResult};
pub use gate::{FlushReport, ReadinessGate, ReadinessState, Submission};
pub use identity::{IdentityAction, IdentityResolver};
pub use plugin::{AnalyticsInstance, AnalyticsPlugin, DriftPlugin};
pub use relay::NativeEventRelay;
pub use resolver::{FnTokenResolver, IdentityTokenResolver};
pub use snippet::snippet_url;
#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
pub use snippet::{BrowserWidget, BrowserWidgetHost};
pub use types::{
    AnalyticsPayload, CallKind, KnownUser, MethodParams, NativeEvent, PendingCall, PluginContext,
    Properties, RelayedEvent,
};
pub use widget::{DriftWidget, IdentifyOptions, NativeEventHandler, WidgetHost};
