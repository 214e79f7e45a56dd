//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns such as access logging, metrics, or request-id
//! injection.
//!
//! The contract is deliberately narrow. A middleware cannot block, rewrite, or
//! short-circuit a request. It observes the request once, synchronously, at
//! entry, and may hand back a one-shot hook that runs after the response body
//! has been fully handed to the connection:
//!
//! ```text
//! request parsed ──► on_request(&req) ──► handler ──► body sent ──► hook(&finished)
//! ```
//!
//! A hook never runs for a connection that dies before the body completes.
//!
//! Built-in middleware:
//! - [`logger`] — colorized request log lines in one of five styles

pub(crate) mod completion;
pub mod logger;

use http::{HeaderMap, StatusCode};

use crate::request::Request;

/// One-shot completion hook returned from [`Middleware::on_request`].
pub type OnFinish = Box<dyn FnOnce(&Finished<'_>) + Send + 'static>;

/// Request interceptor registered with [`Router::layer`](crate::Router::layer).
pub trait Middleware: Send + Sync + 'static {
    /// Called at request entry, before the handler runs. Returning `None`
    /// means the middleware has no interest in the response.
    fn on_request(&self, req: &Request) -> Option<OnFinish>;
}

/// What a completion hook can see of the response that was sent.
#[derive(Debug, Clone, Copy)]
pub struct Finished<'a> {
    status: StatusCode,
    headers: &'a HeaderMap,
}

impl<'a> Finished<'a> {
    pub fn new(status: StatusCode, headers: &'a HeaderMap) -> Self {
        Self { status, headers }
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &'a HeaderMap { self.headers }

    /// Response header lookup; non-ASCII values read as absent.
    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
