pub const DRIFT_PLUGIN_NAME: &str = "drift";

/// Native event fired exactly once after the widget finishes loading.
pub const READY_EVENT: &str = "ready";
pub const START_CONVERSATION_EVENT: &str = "startConversation";
/// Synthetic analytics event reported when a visitor starts a conversation.
pub const START_CONVERSATION_TRACK_NAME: &str = "Start Conversation";

pub const SNIPPET_VERSION: &str = "0.3.1";
pub const DEFAULT_SCRIPT_BASE_URL: &str = "https://js.driftt.com";
pub const SCRIPT_BASE_URL_ENV: &str = "DRIFT_SCRIPT_BASE_URL";
/// Width of the cache-busting bucket embedded in the script URL.
pub const SCRIPT_CACHE_BUCKET_MILLIS: i64 = 300_000;

pub const KNOWN_NATIVE_EVENTS: &[&str] = &[
    "ready",
    "chatOpen",
    "chatClose",
    "welcomeMessage:open",
    "welcomeMessage:close",
    "awayMessage:open",
    "awayMessage:close",
    "campaign:open",
    "campaign:dismiss",
    "campaign:click",
    "campaign:submit",
    "sliderMessage:close",
    "startConversation",
    "conversation:selected",
    "conversation:buttonClicked",
    "message",
    "message:sent",
    "emailCapture",
    "phoneCapture",
    "scheduling:requestMeeting",
    "scheduling:meetingBooked",
    "conversation:playbookFired",
    "conversation:playbookClicked",
    "conversation:playbookDismissed",
    "conversation:firstInteraction",
    "gdprClicked",
];

pub fn is_known_native_event(name: &str) -> bool {
    KNOWN_NATIVE_EVENTS.contains(&name)
}
