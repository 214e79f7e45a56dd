//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()` — no new connections are made.
//! 2. Letting every in-flight connection task run to completion.
//! 3. Returning from [`Server::serve`], which lets `main` exit cleanly.
//!
//! [`Server::serve_with_shutdown`] takes any future as the signal instead,
//! which is what tests and embedding applications use.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::middleware::completion::{Completion, CompletionBody};
use crate::request::Request;
use crate::response::{carries_body, Response};
use crate::router::Router;

type ResponseBody = CompletionBody<Full<Bytes>>;

/// The HTTP server.
pub struct Server {
    bind: Bind,
}

enum Bind {
    Addr(SocketAddr),
    Listener(TcpListener),
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string. Use
    /// [`try_bind`](Server::try_bind) to handle that as an error.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use astor_logger::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        Self::try_bind(addr).expect("invalid socket address")
    }

    /// Like [`bind`](Server::bind), but reports an unparsable address.
    pub fn try_bind(addr: &str) -> Result<Self, Error> {
        Ok(Self { bind: Bind::Addr(addr.parse()?) })
    }

    /// Serves on an already bound listener, e.g. one bound to port 0.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { bind: Bind::Listener(listener) }
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but stops accepting when `signal`
    /// resolves.
    pub async fn serve_with_shutdown(
        self,
        router: Router,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = match self.bind {
            Bind::Addr(addr) => TcpListener::bind(addr).await?,
            Bind::Listener(listener) => listener,
        };
        let local_addr = listener.local_addr()?;

        // Shared across connection tasks without copying the routing table.
        let router = Arc::new(router);

        info!(addr = %local_addr, layers = router.layers().len(), "listening");

        // Tracks every connection task so shutdown can wait for them.
        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting at once,
                // even with connections queued.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { dispatch(router, req, remote_addr).await }
                        });

                        // HTTP/1.1 or HTTP/2, whatever the client negotiates.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Core hot path: one request in, one response out.
///
/// Middleware see the request before its body is read. Every failure becomes
/// a response (400, 404, 405), so hyper never sees an error and every
/// response runs the completion hooks.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<Incoming>,
    peer: SocketAddr,
) -> Result<http::Response<ResponseBody>, Infallible> {
    let (parts, body) = req.into_parts();
    let mut request = Request::new(parts, Bytes::new(), peer);
    let head_only = request.method == Method::HEAD;

    let hooks: Vec<_> = router.layers().iter()
        .filter_map(|layer| layer.on_request(&request))
        .collect();

    let response = match body.collect().await {
        Ok(collected) => {
            request.body = collected.to_bytes();
            route(&router, request).await
        }
        Err(e) => {
            warn!(peer = %peer, "failed to read request body: {e}");
            Response::status(StatusCode::BAD_REQUEST)
        }
    };

    Ok(finish(response, hooks, head_only))
}

async fn route(router: &Router, request: Request) -> Response {
    let path = request.path.split('?').next().unwrap_or_default();
    match router.lookup(&request.method, path) {
        Ok((handler, params)) => handler.call(request.with_params(params)).await,
        Err(status) => {
            debug!(method = %request.method, path = %request.path, %status, "no route");
            Response::status(status)
        }
    }
}

/// Builds the hyper response. HEAD replies and bodiless statuses are sent
/// with an empty body: hyper writes only the head for them and drops the body
/// unpolled, and an empty body is what lets the completion hooks run on drop.
/// `content-length` stays as the handler's body produced it.
fn finish(
    response: Response,
    hooks: Vec<crate::middleware::OnFinish>,
    head_only: bool,
) -> http::Response<ResponseBody> {
    let (status, headers, mut body) = response.into_parts();
    if head_only || !carries_body(status) {
        body = Bytes::new();
    }
    let completion = (!hooks.is_empty())
        .then(|| Completion::new(hooks, status, headers.clone()));

    let mut out = http::Response::new(CompletionBody::new(Full::new(body), completion));
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    out
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** (sent by the Kubernetes control
/// plane) and **SIGINT** (Ctrl-C, for local dev). On Windows only Ctrl-C is
/// available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    // On non-Unix platforms the SIGTERM arm never resolves.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::header::CONTENT_LENGTH;
    use http_body::Body;

    use super::*;
    use crate::middleware::{Finished, OnFinish};

    fn recording_hook(seen: &Arc<Mutex<Vec<(u16, Option<String>)>>>) -> OnFinish {
        let seen = Arc::clone(seen);
        Box::new(move |finished: &Finished<'_>| {
            let len = finished.header("content-length").map(str::to_owned);
            seen.lock().unwrap().push((finished.status().as_u16(), len));
        })
    }

    #[test]
    fn head_reply_drops_body_but_keeps_length() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let out = finish(Response::text("hello"), vec![recording_hook(&seen)], true);

        assert_eq!(out.headers().get(CONTENT_LENGTH).unwrap(), "5");
        assert_eq!(out.body().size_hint().exact(), Some(0));
        // The connection writes the head and drops the body without polling it.
        drop(out);
        assert_eq!(*seen.lock().unwrap(), vec![(200, Some("5".to_owned()))]);
    }

    #[test]
    fn not_modified_with_body_still_completes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let cached = Response::builder().status(StatusCode::NOT_MODIFIED).text("etag-body");
        drop(finish(cached, vec![recording_hook(&seen)], false));
        assert_eq!(*seen.lock().unwrap(), vec![(304, None)]);
    }

    #[test]
    fn get_reply_keeps_body() {
        let out = finish(Response::text("hello"), Vec::new(), false);
        assert_eq!(out.body().size_hint().exact(), Some(5));
    }
}

