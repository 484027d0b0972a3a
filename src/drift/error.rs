use std::fmt::{Display, Formatter};

use crate::platform::token::TokenError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriftErrorCode {
    InvalidArgument,
    MissingResolver,
    ResolverFailed,
    WidgetUnavailable,
    Internal,
}

impl DriftErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriftErrorCode::InvalidArgument => "drift/invalid-argument",
            DriftErrorCode::MissingResolver => "drift/missing-resolver",
            DriftErrorCode::ResolverFailed => "drift/resolver-failed",
            DriftErrorCode::WidgetUnavailable => "drift/widget-unavailable",
            DriftErrorCode::Internal => "drift/internal",
        }
    }
}

#[derive(Clone, Debug)]
pub struct DriftError {
    pub code: DriftErrorCode,
    message: String,
}

impl DriftError {
    pub fn new(code: DriftErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for DriftError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for DriftError {}

impl From<TokenError> for DriftError {
    fn from(err: TokenError) -> Self {
        resolver_failed(format!("identity token resolver failed: {err}"))
    }
}

pub type DriftResult<T> = Result<T, DriftError>;

pub fn invalid_argument(message: impl Into<String>) -> DriftError {
    DriftError::new(DriftErrorCode::InvalidArgument, message)
}

pub fn missing_resolver(message: impl Into<String>) -> DriftError {
    DriftError::new(DriftErrorCode::MissingResolver, message)
}

pub fn resolver_failed(message: impl Into<String>) -> DriftError {
    DriftError::new(DriftErrorCode::ResolverFailed, message)
}

pub fn widget_unavailable(message: impl Into<String>) -> DriftError {
    DriftError::new(DriftErrorCode::WidgetUnavailable, message)
}

pub fn internal_error(message: impl Into<String>) -> DriftError {
    DriftError::new(DriftErrorCode::Internal, message)
}
