//! Signed-identity token resolution.
//!
//! In `signed` identity mode every identify call must carry a token minted by the host's own
//! backend for the user being identified. The plugin only knows how to ask for one.

use std::sync::Arc;

use async_trait::async_trait;

use crate::platform::token::{TokenError, TokenFuture};

/// Resolves a user id into the opaque signed token the widget expects.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait IdentityTokenResolver: Send + Sync {
    async fn resolve(&self, user_id: &str) -> Result<String, TokenError>;
}

type ResolverCallback = Arc<dyn Fn(String) -> TokenFuture + Send + Sync + 'static>;

/// Adapts a closure returning a boxed future into an [`IdentityTokenResolver`].
///
/// ```
/// use drift_analytics_plugin::drift::FnTokenResolver;
/// use drift_analytics_plugin::platform::token::box_token_future;
///
/// let resolver = FnTokenResolver::new(|user_id| {
///     box_token_future(async move { Ok(format!("signed-{user_id}")) })
/// });
/// # let _ = resolver;
/// ```
#[derive(Clone)]
pub struct FnTokenResolver {
    callback: ResolverCallback,
}

impl FnTokenResolver {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(String) -> TokenFuture + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    pub fn into_arc(self) -> Arc<dyn IdentityTokenResolver> {
        Arc::new(self)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl IdentityTokenResolver for FnTokenResolver {
    async fn resolve(&self, user_id: &str) -> Result<String, TokenError> {
        (self.callback)(user_id.to_string()).await
    }
}
