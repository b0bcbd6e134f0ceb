//! Unified error handling for the rezerwacje crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while keeping the domain-specific errors
//! usable on their own.
//!
//! Lost lock races and rejected captchas are not errors: they are ordinary
//! outcomes of an attempt and are reported through
//! [`AttemptOutcome`](crate::reservation::AttemptOutcome).
//!
//! # Usage
//!
//! ```rust,ignore
//! use rezerwacje::error::{Error, RezerwacjeErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         tracing::warn!(error = %err, "Attempt failed, waiting for the next slot");
//!     } else {
//!         tracing::error!(error = %err, "Fatal error");
//!     }
//! }
//! ```

use thiserror::Error;

pub use crate::utils::error::{CaptchaError, ScanError, TransportError};

/// Common trait for all rezerwacje error types
pub trait RezerwacjeErrorTrait: std::error::Error {
    /// Check if this error is recoverable (the pipeline can keep running)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, retries)
    Network,
    /// Page extraction errors
    Parsing,
    /// Captcha solver errors
    Captcha,
    /// Configuration, catalog and credential errors
    Config,
    /// Other/unknown errors
    Other,
}

/// Unified error type for the rezerwacje crate
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failures
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Page extraction failures
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    /// Captcha solver failures
    #[error("Captcha error: {0}")]
    Captcha(#[from] CaptchaError),

    /// A requested entity short code is not in the catalog
    #[error("Unknown {kind} [{code}]")]
    UnknownEntity { kind: &'static str, code: String },

    /// The service did not accept the credentials
    #[error("Invalid login or password")]
    LoginFailed,

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl RezerwacjeErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(e) => !matches!(
                e,
                TransportError::Cancelled
                    | TransportError::InvalidUrl(_)
                    | TransportError::InvalidHeader(_)
            ),
            Self::Scan(_) => true,
            Self::Captcha(_) => true,
            Self::UnknownEntity { .. } => false,
            Self::LoginFailed => false,
            Self::Config(_) => false,
            Self::Json(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) => ErrorCategory::Network,
            Self::Scan(_) | Self::Json(_) => ErrorCategory::Parsing,
            Self::Captcha(_) => ErrorCategory::Captcha,
            Self::UnknownEntity { .. } | Self::LoginFailed | Self::Config(_) => {
                ErrorCategory::Config
            }
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Whether this error only reports that shutdown interrupted the work
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Cancelled))
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an unknown-entity error
    pub fn unknown_entity(kind: &'static str, code: impl Into<String>) -> Self {
        Self::UnknownEntity {
            kind,
            code: code.into(),
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
