use std::fmt;
use std::sync::Arc;

use crate::drift::config::IdentityMode;
use crate::drift::error::{missing_resolver, DriftResult};
use crate::drift::resolver::IdentityTokenResolver;
use crate::drift::types::Properties;
use crate::drift::widget::{DriftWidget, IdentifyOptions};

/// Concrete widget-facing identification produced for one identify call.
#[derive(Clone, Debug, PartialEq)]
pub enum IdentityAction {
    /// Attribute update; the widget's attribute API takes no user id.
    SetAttributes { attributes: Properties },
    Identify {
        user_id: String,
        traits: Properties,
        options: Option<IdentifyOptions>,
    },
}

impl IdentityAction {
    pub fn apply(&self, widget: &dyn DriftWidget) {
        match self {
            IdentityAction::SetAttributes { attributes } => widget.set_user_attributes(attributes),
            IdentityAction::Identify {
                user_id,
                traits,
                options,
            } => widget.identify(user_id, traits, options.as_ref()),
        }
    }
}

/// Maps identify calls onto the widget API according to the configured [`IdentityMode`].
#[derive(Clone)]
pub struct IdentityResolver {
    mode: IdentityMode,
    token_resolver: Option<Arc<dyn IdentityTokenResolver>>,
}

impl fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("mode", &self.mode)
            .field("token_resolver", &self.token_resolver.is_some())
            .finish()
    }
}

impl IdentityResolver {
    pub fn new(mode: IdentityMode, token_resolver: Option<Arc<dyn IdentityTokenResolver>>) -> Self {
        Self { mode, token_resolver }
    }

    /// Produces the identification action. Only signed mode suspends, waiting on the token
    /// resolver; a signed configuration without a resolver is an error, never an unsigned
    /// identify.
    pub async fn resolve(&self, user_id: &str, traits: &Properties) -> DriftResult<IdentityAction> {
        match self.mode {
            IdentityMode::UserAttributes => Ok(IdentityAction::SetAttributes {
                attributes: traits.clone(),
            }),
            IdentityMode::Identify => Ok(IdentityAction::Identify {
                user_id: user_id.to_string(),
                traits: traits.clone(),
                options: None,
            }),
            IdentityMode::Signed => {
                let resolver = self
                    .token_resolver
                    .as_ref()
                    .ok_or_else(|| missing_resolver("No jwt resolver provided"))?;
                let jwt = resolver.resolve(user_id).await?;
                Ok(IdentityAction::Identify {
                    user_id: user_id.to_string(),
                    traits: traits.clone(),
                    options: Some(IdentifyOptions::signed(jwt)),
                })
            }
        }
    }
}
