//! Scripted transport for unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::request::{Request, Response};
use super::transport::Transport;
use crate::utils::error::TransportError;

/// What the mock answers to one request
pub(crate) enum Reply {
    Respond {
        status: u16,
        body: Vec<u8>,
        delay: Duration,
    },
    /// Transport-level failure (retryable)
    Fail,
    /// Request the HTTP stack refuses to build (not retryable)
    Invalid,
}

impl Reply {
    pub(crate) fn text(body: &str) -> Self {
        Self::status(200, body)
    }

    pub(crate) fn bytes(body: &[u8]) -> Self {
        Self::Respond {
            status: 200,
            body: body.to_vec(),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn status(status: u16, body: &str) -> Self {
        Self::Respond {
            status,
            body: body.as_bytes().to_vec(),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn after(self, wait: Duration) -> Self {
        match self {
            Self::Respond { status, body, .. } => Self::Respond {
                status,
                body,
                delay: wait,
            },
            other => other,
        }
    }
}

type Handler = dyn Fn(&Request, usize) -> Reply + Send + Sync;

/// Answers requests through a closure receiving the request and its call index
pub(crate) struct MockTransport {
    handler: Box<Handler>,
    counter: AtomicUsize,
    seen: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub(crate) fn new(handler: impl Fn(&Request, usize) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            counter: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }

    /// Requests whose path starts with `prefix`
    pub(crate) fn requests_to(&self, prefix: &str) -> Vec<Request> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path.starts_with(prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());

        match (self.handler)(request, n) {
            Reply::Respond {
                status,
                body,
                delay,
            } => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(Response::new(status, body))
            }
            Reply::Fail => Err(TransportError::Timeout),
            Reply::Invalid => Err(TransportError::InvalidHeader(request.path.clone())),
        }
    }
}
