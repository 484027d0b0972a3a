use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Error type returned by async token resolvers when token acquisition fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenError {
    message: String,
}

impl TokenError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for TokenError {}

#[cfg(not(target_arch = "wasm32"))]
pub type TokenFuture = Pin<Box<dyn Future<Output = Result<String, TokenError>> + Send + 'static>>;

#[cfg(target_arch = "wasm32")]
pub type TokenFuture = Pin<Box<dyn Future<Output = Result<String, TokenError>> + 'static>>;

/// Boxes a token future into the platform-appropriate [`TokenFuture`].
#[cfg(not(target_arch = "wasm32"))]
pub fn box_token_future<F>(future: F) -> TokenFuture
where
    F: Future<Output = Result<String, TokenError>> + Send + 'static,
{
    Box::pin(future)
}

/// Boxes a token future into the platform-appropriate [`TokenFuture`].
#[cfg(target_arch = "wasm32")]
pub fn box_token_future<F>(future: F) -> TokenFuture
where
    F: Future<Output = Result<String, TokenError>> + 'static,
{
    Box::pin(future)
}
