use std::sync::Arc;

use crate::drift::error::DriftResult;
use crate::drift::identity::IdentityResolver;
use crate::drift::types::AnalyticsPayload;
use crate::drift::widget::{DriftWidget, WidgetHost};
use crate::util::assertion_error;

/// Stateless translation of normalized analytics calls into widget invocations.
#[derive(Clone)]
pub struct CallDispatcher {
    host: Arc<dyn WidgetHost>,
    identity: IdentityResolver,
}

impl CallDispatcher {
    pub fn new(host: Arc<dyn WidgetHost>, identity: IdentityResolver) -> Self {
        Self { host, identity }
    }

    /// Invokes the widget for `payload`. Panics when no widget handle exists.
    pub async fn dispatch(&self, payload: &AnalyticsPayload) -> DriftResult<()> {
        let widget = self.require_widget();
        match payload {
            AnalyticsPayload::Page { .. } => widget.page(),
            AnalyticsPayload::Track { event, properties } => widget.track(event, properties),
            AnalyticsPayload::Identify { user_id, traits } => {
                let action = self.identity.resolve(user_id, traits).await?;
                action.apply(widget.as_ref());
            }
        }
        Ok(())
    }

    fn require_widget(&self) -> Arc<dyn DriftWidget> {
        match self.host.widget() {
            Some(widget) => widget,
            None => panic!(
                "{}",
                assertion_error("dispatch attempted before the Drift widget was installed")
            ),
        }
    }
}
