//! Authenticated HTTP session with retrying send
//!
//! [`Session`] wraps a [`Transport`] and adds `send_with_retry`, which keeps
//! re-sending a request while the transport fails to get any response at all.
//! HTTP error statuses are returned to the caller untouched: the service
//! answers most business failures with ordinary pages.

pub mod headers;
pub mod request;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::utils::error::TransportError;
use crate::utils::shutdown_requested;

pub use request::{Body, Request, Response};
pub use transport::{HttpTransport, Transport};

/// When `send_with_retry` gives up
///
/// The default retries immediately and forever, which is what a slot hunter
/// wants against a flaky service; bounded policies exist for tests and for
/// operators who prefer to fail loudly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one; `None` means unlimited
    pub max_attempts: Option<u32>,

    /// Pause between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    /// Retry forever without pausing
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Give up after `max_attempts` attempts
    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }
}

/// Shared handle to the transport plus the retry policy
#[derive(Clone)]
pub struct Session {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    cancel: Option<watch::Receiver<bool>>,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            policy: RetryPolicy::default(),
            cancel: None,
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Abort retry loops (and in-flight requests) once `shutdown` turns true
    #[must_use]
    pub fn with_cancel(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.cancel = Some(shutdown);
        self
    }

    /// Send, retrying transport failures according to the retry policy
    ///
    /// # Errors
    ///
    /// Returns `TransportError::RetriesExhausted` when a bounded policy runs
    /// out, `TransportError::Cancelled` on shutdown, and non-retryable errors
    /// (bad URL or header) immediately
    pub async fn send_with_retry(&self, request: &Request) -> Result<Response, TransportError> {
        let mut attempt = 0u32;

        loop {
            if self.is_cancelled() {
                return Err(TransportError::Cancelled);
            }
            attempt = attempt.saturating_add(1);

            let error = match self.send_cancellable(request).await {
                Ok(response) => {
                    if attempt > 1 {
                        debug!(attempt, path = %request.path, "Request succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            warn!(
                attempt,
                max_attempts = ?self.policy.max_attempts,
                path = %request.path,
                error = %error,
                "Error occurred while sending request, trying again"
            );

            if self.policy.exhausted(attempt) {
                return Err(TransportError::RetriesExhausted {
                    attempts: attempt,
                    last_error: error.to_string(),
                });
            }

            if self.policy.delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                self.pause(self.policy.delay).await?;
            }
        }
    }

    async fn send_cancellable(&self, request: &Request) -> Result<Response, TransportError> {
        match self.cancel.clone() {
            Some(mut shutdown) => tokio::select! {
                result = self.transport.send(request) => result,
                () = shutdown_requested(&mut shutdown) => Err(TransportError::Cancelled),
            },
            None => self.transport.send(request).await,
        }
    }

    async fn pause(&self, delay: Duration) -> Result<(), TransportError> {
        match self.cancel.clone() {
            Some(mut shutdown) => tokio::select! {
                () = tokio::time::sleep(delay) => Ok(()),
                () = shutdown_requested(&mut shutdown) => Err(TransportError::Cancelled),
            },
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockTransport, Reply};
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_retry_until_success() {
        let failures = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&failures);
        let transport = Arc::new(MockTransport::new(move |_req, _n| {
            if counter.fetch_add(1, Ordering::SeqCst) < 3 {
                Reply::Fail
            } else {
                Reply::text("ok")
            }
        }));
        let session = Session::new(transport.clone());

        let response = session.send_with_retry(&Request::get("/x")).await.unwrap();
        assert_eq!(response.text(), "ok");
        assert_eq!(transport.calls(), 4);
    }

    #[tokio::test]
    async fn test_http_status_is_not_retried() {
        let transport = Arc::new(MockTransport::new(|_req, _n| Reply::status(500, "boom")));
        let session = Session::new(transport.clone());

        let response = session.send_with_retry(&Request::get("/x")).await.unwrap();
        assert_eq!(response.status(), 500);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_bounded_policy_gives_up() {
        let transport = Arc::new(MockTransport::new(|_req, _n| Reply::Fail));
        let session = Session::new(transport.clone()).with_retry_policy(RetryPolicy::bounded(3));

        let result = session.send_with_retry(&Request::get("/x")).await;
        assert!(matches!(
            result,
            Err(TransportError::RetriesExhausted { attempts: 3, .. })
        ));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_cancel_stops_unbounded_retry() {
        let transport = Arc::new(MockTransport::new(|_req, _n| Reply::Fail));
        let (tx, rx) = watch::channel(false);
        let session = Session::new(transport)
            .with_retry_policy(RetryPolicy::unlimited().with_delay(Duration::from_millis(5)))
            .with_cancel(rx);

        let handle = tokio::spawn(async move { session.send_with_retry(&Request::get("/x")).await });
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("retry loop should stop on shutdown")
            .unwrap();
        assert!(matches!(result, Err(TransportError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_in_flight_request() {
        let transport = Arc::new(MockTransport::new(|_req, _n| {
            Reply::text("late").after(Duration::from_secs(30))
        }));
        let (tx, rx) = watch::channel(false);
        let session = Session::new(transport).with_cancel(rx);

        let handle = tokio::spawn(async move { session.send_with_retry(&Request::get("/x")).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("in-flight request should be abandoned")
            .unwrap();
        assert!(matches!(result, Err(TransportError::Cancelled)));
    }

    #[test]
    fn test_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, None);
        assert!(policy.delay.is_zero());
        assert!(!policy.exhausted(u32::MAX));
        assert_eq!(RetryPolicy::bounded(0).max_attempts, Some(1));
    }
}
