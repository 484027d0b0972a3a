use std::collections::BTreeSet;
use std::sync::Arc;

use crate::drift::constants::{START_CONVERSATION_EVENT, START_CONVERSATION_TRACK_NAME};
use crate::drift::plugin::AnalyticsInstance;
use crate::drift::types::{NativeEvent, Properties, RelayedEvent};
use crate::drift::widget::{DriftWidget, NativeEventHandler};

/// Re-publishes native widget events on the analytics bus.
#[derive(Clone, Debug, Default)]
pub struct NativeEventRelay {
    events: BTreeSet<String>,
    track_conversation_starts: bool,
}

impl NativeEventRelay {
    pub fn new(events: BTreeSet<String>, track_conversation_starts: bool) -> Self {
        Self {
            events,
            track_conversation_starts,
        }
    }

    /// Registers one listener per configured event name, plus the conversation-start tracker
    /// when enabled. Returns the number of listeners registered. Listeners stay registered for
    /// the widget's lifetime.
    pub fn subscribe(&self, widget: &dyn DriftWidget, instance: Arc<dyn AnalyticsInstance>) -> usize {
        let mut registered = 0;
        for name in &self.events {
            widget.on(name, relay_handler(name.clone(), instance.clone()));
            registered += 1;
        }

        if self.track_conversation_starts {
            let tracker = instance.clone();
            let handler: NativeEventHandler = Arc::new(move |_event: &NativeEvent| {
                tracker.track(START_CONVERSATION_TRACK_NAME, Properties::new());
            });
            widget.on(START_CONVERSATION_EVENT, handler);
            registered += 1;
        }

        log::debug!("relaying {registered} native Drift event listener(s)");
        registered
    }
}

fn relay_handler(name: String, instance: Arc<dyn AnalyticsInstance>) -> NativeEventHandler {
    Arc::new(move |event: &NativeEvent| {
        instance.dispatch(RelayedEvent::from_native(name.clone(), event));
    })
}
