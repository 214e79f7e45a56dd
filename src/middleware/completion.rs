//! Response body wrapper that signals completion.
//!
//! hyper pulls frames from the body until it reports end-of-stream. The last
//! frame leaving the wrapper is the "response finished" moment, and that is
//! when the pending middleware hooks run.

use std::pin::Pin;
use std::task::{Context, Poll};

use http::{HeaderMap, StatusCode};
use http_body::{Body, Frame, SizeHint};

use super::{Finished, OnFinish};

/// Hooks waiting for one response, plus the status and headers they report.
pub(crate) struct Completion {
    hooks: Vec<OnFinish>,
    status: StatusCode,
    headers: HeaderMap,
}

impl Completion {
    pub(crate) fn new(hooks: Vec<OnFinish>, status: StatusCode, headers: HeaderMap) -> Self {
        Self { hooks, status, headers }
    }

    fn fire(self) {
        let finished = Finished::new(self.status, &self.headers);
        for hook in self.hooks {
            hook(&finished);
        }
    }
}

/// A body that runs its [`Completion`] exactly once, when the inner body has
/// yielded its final frame.
pub(crate) struct CompletionBody<B: Body + Unpin> {
    inner: B,
    completion: Option<Completion>,
}

impl<B: Body + Unpin> CompletionBody<B> {
    pub(crate) fn new(inner: B, completion: Option<Completion>) -> Self {
        Self { inner, completion }
    }

    fn complete(&mut self) {
        if let Some(completion) = self.completion.take() {
            completion.fire();
        }
    }
}

impl<B: Body + Unpin> Body for CompletionBody<B> {
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(None) => this.complete(),
            Poll::Ready(Some(Ok(_))) if this.inner.is_end_stream() => this.complete(),
            _ => {}
        }
        polled
    }

    // Pending hooks keep the stream open so hyper polls at least once, even
    // for an empty body.
    fn is_end_stream(&self) -> bool {
        self.completion.is_none() && self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl<B: Body + Unpin> Drop for CompletionBody<B> {
    fn drop(&mut self) {
        // An empty body may be dropped by the connection without a poll. A
        // body abandoned mid-stream is an aborted response and stays silent.
        if self.inner.is_end_stream() {
            self.complete();
        }
    }
}
