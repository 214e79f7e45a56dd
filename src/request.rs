//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use bytes::Bytes;
use http::{HeaderMap, Method};

/// An incoming HTTP request, with its body already collected.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) peer: SocketAddr,
}

impl Request {
    pub(crate) fn new(parts: http::request::Parts, body: Bytes, peer: SocketAddr) -> Self {
        let path = parts.uri.path_and_query()
            .map(|pq| pq.as_str().to_owned())
            .unwrap_or_else(|| parts.uri.path().to_owned());
        Self {
            method: parts.method,
            path,
            headers: parts.headers,
            body,
            params: HashMap::new(),
            peer,
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn peer_addr(&self) -> SocketAddr { self.peer }

    /// The full request target: path plus query string, e.g. `/search?q=rust`.
    pub fn path(&self) -> &str { &self.path }

    /// Case-insensitive header lookup. Values that are not valid visible ASCII
    /// are treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The address of the client that originated the request.
    ///
    /// The framework runs behind a reverse proxy, so the leftmost
    /// `x-forwarded-for` entry wins when it parses as an IP. Otherwise the TCP
    /// peer is the client.
    pub fn client_ip(&self) -> IpAddr {
        self.header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .and_then(|first| first.trim().parse().ok())
            .unwrap_or_else(|| self.peer.ip())
    }

    pub(crate) fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }
}

#[cfg(test)]
pub(crate) fn test_request(method: Method, target: &str, headers: &[(&str, &str)]) -> Request {
    let mut builder = http::Request::builder().method(method).uri(target);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let (parts, ()) = builder.body(()).expect("valid test request").into_parts();
    Request::new(parts, Bytes::new(), "127.0.0.1:54321".parse().expect("valid peer"))
}
