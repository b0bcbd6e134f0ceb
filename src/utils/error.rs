//! Error types for the reservation pipeline
//!
//! This module defines the per-concern error types used throughout the application.

use thiserror::Error;

/// Errors that can occur while talking to the remote service
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP request error (connection, TLS, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Retry policy gave up
    #[error("Giving up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// Shutdown was requested while retrying
    #[error("Request cancelled by shutdown")]
    Cancelled,

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Header name or value rejected by the HTTP stack
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

impl TransportError {
    /// Whether a retry loop should try again after this error
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Timeout)
    }
}

/// Errors that can occur while extracting dates and slots from service pages
#[derive(Error, Debug)]
pub enum ScanError {
    /// The entity page carries no `dateEvents` script variable
    #[error("dateEvents not found in entity page")]
    DateEventsNotFound,

    /// The `dateEvents` payload is not the expected JSON
    #[error("Invalid dateEvents payload: {0}")]
    InvalidDateEvents(String),

    /// `dateEvents` is present but lists no dates
    #[error("No open dates published")]
    NoOpenDates,

    /// Invalid date format
    #[error("Invalid date format: {0}")]
    InvalidDate(String),
}

/// Errors raised by captcha solvers
#[derive(Error, Debug)]
pub enum CaptchaError {
    /// Solver process could not be started or talked to
    #[error("Captcha solver I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Solver exited unsuccessfully
    #[error("Captcha solver exited with {status}: {stderr}")]
    SolverFailed { status: String, stderr: String },

    /// Solver produced no answer
    #[error("Captcha solver returned an empty answer")]
    EmptyAnswer,
}
