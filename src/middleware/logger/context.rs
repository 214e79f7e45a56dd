//! Per-request metadata gathered for one log entry.

use std::time::Instant;

use super::clock::{elapsed_millis, format_timestamp, Clock};
use crate::middleware::Finished;
use crate::request::Request;

/// Shown when the request carries no `referer` header.
pub const UNKNOWN_REFERER: &str = "Unknown";

/// Everything a layout can print about one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub method: String,
    /// Path including the query string.
    pub path: String,
    pub client_addr: String,
    /// Printed as an empty string when absent.
    pub user_agent: Option<String>,
    pub referer: String,
    pub status: u16,
    pub content_length: u64,
    pub elapsed_ms: u64,
    /// Local `HH:MM:SS` at completion.
    pub timestamp: String,
}

/// The request half, captured at entry. The request itself moves into the
/// handler, so anything the log needs is copied out here.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    started: Instant,
    method: String,
    path: String,
    client_addr: String,
    user_agent: Option<String>,
    referer: String,
}

impl Entry {
    pub(crate) fn capture(req: &Request, started: Instant) -> Self {
        Self {
            started,
            method: req.method().as_str().to_owned(),
            path: req.path().to_owned(),
            client_addr: req.client_ip().to_string(),
            user_agent: raw_header(req, "user-agent"),
            referer: raw_header(req, "referer").unwrap_or_else(|| UNKNOWN_REFERER.to_owned()),
        }
    }

    /// Completes the entry with the response half. Time is read here, at
    /// completion, for both the latency and the displayed timestamp.
    pub(crate) fn finish(self, finished: &Finished<'_>, clock: &dyn Clock) -> RequestContext {
        let elapsed_ms = elapsed_millis(self.started, clock.monotonic());
        let timestamp = format_timestamp(clock.local_time());
        let content_length = finished.header("content-length")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0);

        RequestContext {
            method: self.method,
            path: self.path,
            client_addr: self.client_addr,
            user_agent: self.user_agent,
            referer: self.referer,
            status: finished.status().as_u16(),
            content_length,
            elapsed_ms,
            timestamp,
        }
    }
}

/// Header text as sent. Bytes outside visible ASCII are kept, decoded lossily.
fn raw_header(req: &Request, name: &str) -> Option<String> {
    req.headers().get(name).map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}
