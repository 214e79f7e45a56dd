//! Colorized request logging.
//!
//! [`Logger`] prints one entry per completed request in one of five
//! [`LogStyle`]s:
//!
//! | Style | Output |
//! |---|---|
//! | `minified` | `GET /users/42 200 3ms` |
//! | `inline` | `[10:42:07] GET /users/42 200 3ms 27` |
//! | `agent` | group with client address, user agent, referer |
//! | `error` | the `inline` line, only for status ≥ 400, status in red |
//! | `default` | group with all nine fields |
//!
//! ```rust,no_run
//! use astor_logger::{Method, Request, Response, Router, Server};
//! use astor_logger::middleware::logger::Logger;
//!
//! # async fn get_user(_: Request) -> Response { Response::text("") }
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .on(Method::GET, "/users/{id}", get_user)
//!         .layer(Logger::new(Some("inline")));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//! ```
//!
//! The style is fixed when the logger is built. An unknown name never fails:
//! the logger prints one warning and uses `default`.
//!
//! Latency runs from the moment the request reaches the middleware to the
//! moment the last body frame is handed to the connection, rounded half up
//! to whole milliseconds. The timestamp is local time at completion.

mod clock;
mod console;
mod context;
mod palette;
mod render;
mod style;

use std::sync::Arc;

pub use clock::{elapsed_millis, format_timestamp, Clock, SystemClock};
pub use console::{Console, ConsoleOp, MemoryConsole, StdoutConsole, TracingConsole, WriterConsole};
pub use context::{RequestContext, UNKNOWN_REFERER};
pub use palette::{strip_ansi, Palette, PALETTE};
pub use render::render;
pub use style::{LogStyle, ParseLogStyleError, Resolved};

use context::Entry;

use super::{Finished, Middleware, OnFinish};
use crate::request::Request;

/// Environment variable read by [`Logger::from_env`].
pub const STYLE_ENV: &str = "ASTOR_LOG_STYLE";

/// Request logging middleware. Register it with [`Router::layer`](crate::Router::layer).
#[derive(Clone)]
pub struct Logger {
    style: LogStyle,
    console: Arc<dyn Console>,
    clock: Arc<dyn Clock>,
}

impl Logger {
    /// A logger printing to stdout.
    ///
    /// `style` is one of `minified`, `inline`, `agent`, `error`, `default`.
    /// Anything else, including `None`, prints a warning and uses `default`.
    pub fn new(style: Option<&str>) -> Self {
        Self::with_console(style, Arc::new(StdoutConsole::stdout()))
    }

    /// A logger writing to `console`. The invalid-style warning, if any, goes
    /// there too.
    pub fn with_console(style: Option<&str>, console: Arc<dyn Console>) -> Self {
        let Resolved { style, warning } = LogStyle::resolve(style);
        if let Some(warning) = warning {
            console.emit(&[render::line(warning)]);
        }
        Self { style, console, clock: Arc::new(SystemClock) }
    }

    /// Stdout logger with the style taken from `ASTOR_LOG_STYLE`.
    pub fn from_env() -> Self {
        let style = std::env::var(STYLE_ENV).ok();
        Self::new(style.as_deref())
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn style(&self) -> LogStyle {
        self.style
    }

    /// Renders `ctx` in this logger's style and writes it as one block.
    pub fn log(&self, ctx: &RequestContext) {
        let block = render(self.style, ctx);
        if !block.is_empty() {
            self.console.emit(&block);
        }
    }
}

impl Middleware for Logger {
    fn on_request(&self, req: &Request) -> Option<OnFinish> {
        let entry = Entry::capture(req, self.clock.monotonic());
        let logger = self.clone();
        let hook: OnFinish = Box::new(move |finished: &Finished<'_>| {
            let ctx = entry.finish(finished, logger.clock.as_ref());
            logger.log(&ctx);
        });
        Some(hook)
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger").field("style", &self.style).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::NaiveTime;
    use http::header::CONTENT_LENGTH;
    use http::{HeaderMap, HeaderValue, Method, StatusCode};

    use super::clock::tests::ManualClock;
    use super::*;
    use crate::request::test_request;

    fn recorder() -> Arc<MemoryConsole> {
        Arc::new(MemoryConsole::new())
    }

    /// Shares the manual clock between the logger and the test.
    struct SharedClock(Arc<ManualClock>);

    impl Clock for SharedClock {
        fn monotonic(&self) -> std::time::Instant { self.0.monotonic() }
        fn local_time(&self) -> NaiveTime { self.0.local_time() }
    }

    /// Runs one request through `logger`, advancing the clock by `took`.
    fn run(
        logger: &Logger,
        clock: &ManualClock,
        req: &Request,
        status: StatusCode,
        content_length: Option<&'static str>,
        took: Duration,
    ) {
        let hook = logger.on_request(req).expect("logger always wants completion");
        clock.advance(took);
        let mut headers = HeaderMap::new();
        if let Some(len) = content_length {
            headers.insert(CONTENT_LENGTH, HeaderValue::from_static(len));
        }
        hook(&Finished::new(status, &headers));
    }

    fn setup(style: Option<&str>) -> (Logger, Arc<MemoryConsole>, Arc<ManualClock>) {
        let console = recorder();
        let clock = Arc::new(ManualClock::at(NaiveTime::from_hms_opt(8, 30, 0).unwrap()));
        let logger = Logger::with_console(style, console.clone())
            .with_clock(SharedClock(Arc::clone(&clock)));
        (logger, console, clock)
    }

    #[test]
    fn valid_style_prints_no_warning() {
        for style in LogStyle::ALL {
            let (logger, console, _) = setup(Some(style.as_str()));
            assert_eq!(logger.style(), style);
            assert!(console.ops().is_empty());
        }
    }

    #[test]
    fn invalid_style_warns_once_at_construction() {
        for candidate in [Some(""), Some("bogus"), None] {
            let (logger, console, clock) = setup(candidate);
            assert_eq!(logger.style(), LogStyle::Default);
            let warnings = console.take();
            assert_eq!(warnings.len(), 1);

            let req = test_request(Method::GET, "/", &[]);
            for _ in 0..3 {
                run(&logger, &clock, &req, StatusCode::OK, None, Duration::ZERO);
            }
            let after = console.plain_lines();
            assert!(after.iter().all(|l| !l.contains("Invalid style option")));
        }
    }

    #[test]
    fn bogus_style_logs_nine_line_groups() {
        let (logger, console, clock) = setup(Some("bogus"));
        let warnings = console.take();
        let ConsoleOp::Line(warning) = &warnings[0] else { panic!("warning is a line") };
        assert!(warning.contains("bogus"));
        assert!(warning.starts_with(PALETTE.reset) && warning.ends_with(PALETTE.reset));

        let req = test_request(Method::GET, "/users/7", &[]);
        run(&logger, &clock, &req, StatusCode::OK, Some("5"), Duration::from_millis(3));

        let ops = console.ops();
        assert_eq!(ops.len(), 11);
        assert!(matches!(ops[0], ConsoleOp::GroupStart(_)));
        assert!(matches!(ops[10], ConsoleOp::GroupEnd));
        assert_eq!(console.plain_lines().len(), 9);
    }

    #[test]
    fn inline_health_check() {
        let (logger, console, clock) = setup(Some("inline"));
        let req = test_request(Method::GET, "/health", &[]);
        run(&logger, &clock, &req, StatusCode::OK, Some("2"), Duration::from_millis(12));

        assert_eq!(console.plain_lines(), vec!["[08:30:00] GET /health 200 12ms 2"]);
        assert_eq!(console.ops().len(), 1);
    }

    #[test]
    fn minified_measures_synthetic_latency() {
        let (logger, console, clock) = setup(Some("minified"));
        let req = test_request(Method::DELETE, "/users/7?hard=true", &[]);
        run(&logger, &clock, &req, StatusCode::NO_CONTENT, None, Duration::from_millis(237));

        assert_eq!(console.plain_lines(), vec!["DELETE /users/7?hard=true 204 237ms"]);
        assert!(console.ops().iter().all(|op| matches!(op, ConsoleOp::Line(_))));
    }

    #[test]
    fn agent_defaults_referer() {
        let (logger, console, clock) = setup(Some("agent"));
        let req = test_request(Method::GET, "/", &[("user-agent", "Mozilla/5.0")]);
        run(&logger, &clock, &req, StatusCode::OK, None, Duration::ZERO);

        let ops = console.ops();
        assert_eq!(ops.len(), 5);
        assert!(matches!(ops[0], ConsoleOp::GroupStart(_)));
        assert!(matches!(ops[4], ConsoleOp::GroupEnd));
        assert_eq!(console.plain_lines(), vec![
            "IP: 127.0.0.1",
            "User Agent: Mozilla/5.0",
            "Referer: Unknown",
        ]);
    }

    #[test]
    fn error_style_only_logs_failures() {
        let (logger, console, clock) = setup(Some("error"));
        let req = test_request(Method::GET, "/missing", &[]);

        run(&logger, &clock, &req, StatusCode::OK, None, Duration::ZERO);
        run(&logger, &clock, &req, StatusCode::FOUND, None, Duration::ZERO);
        assert!(console.ops().is_empty());

        run(&logger, &clock, &req, StatusCode::NOT_FOUND, Some("9"), Duration::from_millis(1));
        let lines = console.plain_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("404"));
    }

    #[test]
    fn timestamp_is_taken_at_completion() {
        let console = recorder();
        let clock = Arc::new(ManualClock::at(NaiveTime::from_hms_opt(23, 59, 58).unwrap()));
        let logger = Logger::with_console(Some("inline"), console.clone())
            .with_clock(SharedClock(Arc::clone(&clock)));
        let req = test_request(Method::GET, "/", &[]);
        run(&logger, &clock, &req, StatusCode::OK, Some("0"), Duration::from_millis(1500));
        assert_eq!(console.plain_lines(), vec!["[23:59:59] GET / 200 1500ms 0"]);
    }
}
