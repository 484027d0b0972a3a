//! Analytics destination plugin for the Drift chat widget.
//!
//! [`drift::DriftPlugin`] accepts `page`, `track` and `identify` calls from a host analytics
//! library at any time. Calls made before the widget reports `ready` are buffered and replayed
//! exactly once, in arrival order, before any later call reaches the widget. Configured native
//! widget events are relayed back onto the host's event bus.
//!
//! The widget itself is reached through the [`drift::WidgetHost`] and [`drift::DriftWidget`]
//! traits. With the `wasm-web` feature on `wasm32`, [`drift::BrowserWidgetHost`] installs the
//! real snippet on the page.
//!
//! ```
//! use std::sync::Arc;
//!
//! use drift_analytics_plugin::drift::{
//!     DriftPlugin, DriftPluginConfig, DriftSettings, DriftWidget, WidgetHost,
//! };
//!
//! struct NoWidget;
//!
//! impl WidgetHost for NoWidget {
//!     fn install_snippet(&self) -> bool {
//!         false
//!     }
//!
//!     fn widget(&self) -> Option<Arc<dyn DriftWidget>> {
//!         None
//!     }
//! }
//!
//! let settings = DriftSettings::from_json(r#"{"driftId": "abc123", "events": ["chatOpen"]}"#)?;
//! let plugin = DriftPlugin::new(DriftPluginConfig::new(settings), Arc::new(NoWidget))?;
//! assert!(!plugin.is_ready());
//! assert_eq!(plugin.events().len(), 1);
//! # Ok::<(), drift_analytics_plugin::drift::DriftError>(())
//! ```

pub mod drift;
pub mod platform;
pub mod util;

#[cfg(test)]
pub mod test_support;
