use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::drift::constants::is_known_native_event;
use crate::drift::error::{invalid_argument, DriftResult};
use crate::drift::resolver::IdentityTokenResolver;

/// Strategy used to turn an analytics `identify` call into a widget call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityMode {
    /// `identify` updates visitor attributes; the user id is never sent.
    #[default]
    #[serde(rename = "userAttributes")]
    UserAttributes,
    /// `identify` calls the widget's own `identify(userId, traits)`.
    #[serde(rename = "identify")]
    Identify,
    /// Like [`IdentityMode::Identify`] but every call carries a signed token obtained from an
    /// [`IdentityTokenResolver`].
    #[serde(rename = "signed")]
    Signed,
}

impl IdentityMode {
    /// Whether the widget's load should be parameterized by a known identity.
    pub fn identifies_before_load(self) -> bool {
        !matches!(self, IdentityMode::UserAttributes)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptLoad {
    /// The plugin injects the widget script during `initialize`.
    #[default]
    Load,
    /// The host loads the script itself and calls the plugin's `ready` method.
    Manual,
}

/// Serializable plugin settings, using the same keys as the JavaScript plugin options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriftSettings {
    pub drift_id: String,
    pub identity_type: IdentityMode,
    pub script_load: ScriptLoad,
    pub page: bool,
    pub events: BTreeSet<String>,
    pub track_conversation_starts: bool,
    pub defer_load_until_identified: bool,
}

impl DriftSettings {
    pub fn new(drift_id: impl Into<String>) -> Self {
        Self {
            drift_id: drift_id.into(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> DriftResult<Self> {
        serde_json::from_str(json)
            .map_err(|err| invalid_argument(format!("invalid drift plugin settings: {err}")))
    }

    pub fn with_identity_type(mut self, identity_type: IdentityMode) -> Self {
        self.identity_type = identity_type;
        self
    }

    pub fn with_script_load(mut self, script_load: ScriptLoad) -> Self {
        self.script_load = script_load;
        self
    }

    pub fn with_page(mut self, page: bool) -> Self {
        self.page = page;
        self
    }

    pub fn with_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events = events.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_conversation_tracking(mut self, enabled: bool) -> Self {
        self.track_conversation_starts = enabled;
        self
    }

    pub fn with_deferred_load(mut self, enabled: bool) -> Self {
        self.defer_load_until_identified = enabled;
        self
    }

    /// The `EVENTS` map exposed to the analytics library: every relayed name maps to itself.
    pub fn events_map(&self) -> BTreeMap<String, String> {
        self.events
            .iter()
            .map(|name| (name.clone(), name.clone()))
            .collect()
    }
}

/// Complete plugin configuration: the serializable settings plus the optional token resolver.
#[derive(Clone, Default)]
pub struct DriftPluginConfig {
    pub settings: DriftSettings,
    pub resolver: Option<Arc<dyn IdentityTokenResolver>>,
}

impl fmt::Debug for DriftPluginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriftPluginConfig")
            .field("settings", &self.settings)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

impl DriftPluginConfig {
    pub fn new(settings: DriftSettings) -> Self {
        Self {
            settings,
            resolver: None,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn IdentityTokenResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Rejects combinations the plugin cannot honor. A signed configuration without a resolver
    /// is accepted here and reported when the first identify is dispatched.
    pub(crate) fn validate(&self) -> DriftResult<()> {
        let settings = &self.settings;
        if settings.identity_type.identifies_before_load() && settings.script_load == ScriptLoad::Manual {
            return Err(invalid_argument(format!(
                "identity type `{}` requires scriptLoad `load`",
                identity_label(settings.identity_type)
            )));
        }

        for name in &settings.events {
            if !is_known_native_event(name) {
                log::warn!("`{name}` is not a known Drift event; it will be subscribed anyway");
            }
        }
        Ok(())
    }
}

fn identity_label(mode: IdentityMode) -> &'static str {
    match mode {
        IdentityMode::UserAttributes => "userAttributes",
        IdentityMode::Identify => "identify",
        IdentityMode::Signed => "signed",
    }
}
