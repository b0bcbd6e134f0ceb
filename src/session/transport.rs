//! HTTP transport over a shared `reqwest` client
//!
//! One client is shared by every scanner and worker, so the cookie jar that
//! holds the login session and the connection pool are common to all
//! concurrent requests, including the lock fan-out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{cookie::Jar, redirect::Policy, Client};
use url::Url;

use super::headers::{build_default_headers, build_request_headers};
use super::request::{Body, Request, Response};
use crate::config::ServiceConfig;
use crate::utils::error::TransportError;

/// Sends one request and returns the fully read response
///
/// HTTP error statuses are responses, not errors: only failures to get a
/// response at all are reported as [`TransportError`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &Request) -> Result<Response, TransportError>;
}

/// `reqwest`-backed transport with cookie jar, gzip and no redirect following
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a transport from the service configuration
    ///
    /// # Errors
    ///
    /// Returns `TransportError::InvalidUrl` for a malformed base URL,
    /// `TransportError::InvalidHeader` for unusable header settings and
    /// `TransportError::Http` if the HTTP client cannot be created
    pub fn new(config: &ServiceConfig) -> Result<Self, TransportError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", config.base_url)))?;

        let jar = Arc::new(Jar::default());
        if let Some(cookie) = &config.language_cookie {
            jar.add_cookie_str(cookie, &base_url);
        }

        let mut builder = Client::builder()
            .default_headers(build_default_headers(
                &config.user_agent,
                &config.accept_language,
            )?)
            .cookie_provider(jar)
            .gzip(true)
            .redirect(Policy::none())
            .pool_max_idle_per_host(30)
            .connect_timeout(Duration::from_secs(10))
            .danger_accept_invalid_certs(config.accept_invalid_certs);

        if config.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.request_timeout_secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    /// Create a transport with default settings against `base_url`, for testing with mock servers
    pub fn with_base_url(base_url: &str) -> Result<Self, TransportError> {
        Self::new(&ServiceConfig {
            base_url: base_url.to_string(),
            ..ServiceConfig::default()
        })
    }

    fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path)
            .map_err(|e| TransportError::InvalidUrl(format!("{path}: {e}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let url = self.url_for(&request.path)?;

        tracing::debug!(method = %request.method, url = %url, body = ?request.body, "Sending request");

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(build_request_headers(&request.headers)?);

        builder = match &request.body {
            Body::Empty => builder,
            Body::Form(pairs) => builder.form(pairs),
            Body::Json(json) => builder.body(json.clone()),
        };

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(classify)?;

        tracing::debug!(status, bytes = body.len(), path = %request.path, "Received response");

        Ok(Response::new(status, body))
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Http(error)
    }
}
