//! Output sinks for the request log.
//!
//! The logger never touches stdout directly. It renders a block of
//! [`ConsoleOp`]s per request and hands the whole block to a [`Console`].
//! Sinks that are shared between connections keep a block contiguous, so one
//! request's group is never split by another request's lines.

use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::palette::strip_ansi;

/// One console call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleOp {
    Line(String),
    GroupStart(String),
    GroupEnd,
}

/// The console port: write a line, open a group, close a group.
///
/// Groups are a visual nesting aid. Plain-text sinks indent group contents.
pub trait Console: Send + Sync + 'static {
    fn write(&self, line: &str);
    fn start_group(&self, title: &str);
    fn end_group(&self);

    /// Emits a whole block. The default forwards op by op; sinks that can be
    /// written concurrently override it to hold one lock for the block.
    fn emit(&self, ops: &[ConsoleOp]) {
        for op in ops {
            match op {
                ConsoleOp::Line(line) => self.write(line),
                ConsoleOp::GroupStart(title) => self.start_group(title),
                ConsoleOp::GroupEnd => self.end_group(),
            }
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── WriterConsole ─────────────────────────────────────────────────────────────

/// Writes to any [`Write`], two spaces of indentation per open group.
///
/// [`WriterConsole::stdout`] is the usual choice.
pub struct WriterConsole<W> {
    state: Mutex<Stream<W>>,
}

struct Stream<W> {
    out: W,
    depth: usize,
}

impl WriterConsole<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send + 'static> WriterConsole<W> {
    pub fn new(out: W) -> Self {
        Self { state: Mutex::new(Stream { out, depth: 0 }) }
    }

    pub fn into_inner(self) -> W {
        self.state.into_inner().unwrap_or_else(PoisonError::into_inner).out
    }

    fn apply(&self, ops: &[ConsoleOp]) {
        let mut stream = lock(&self.state);
        let result = ops.iter()
            .try_for_each(|op| stream.apply(op))
            .and_then(|()| stream.out.flush());
        if let Err(e) = result {
            tracing::warn!("request log write failed: {e}");
        }
    }
}

impl<W: Write> Stream<W> {
    fn apply(&mut self, op: &ConsoleOp) -> io::Result<()> {
        match op {
            ConsoleOp::Line(text) => self.write_indented(text),
            ConsoleOp::GroupStart(title) => {
                self.write_indented(title)?;
                self.depth += 1;
                Ok(())
            }
            ConsoleOp::GroupEnd => {
                self.depth = self.depth.saturating_sub(1);
                Ok(())
            }
        }
    }

    fn write_indented(&mut self, text: &str) -> io::Result<()> {
        let pad = "  ".repeat(self.depth);
        for line in text.split('\n') {
            writeln!(self.out, "{pad}{line}")?;
        }
        Ok(())
    }
}

impl<W: Write + Send + 'static> Console for WriterConsole<W> {
    fn write(&self, line: &str) {
        self.apply(&[ConsoleOp::Line(line.to_owned())]);
    }

    fn start_group(&self, title: &str) {
        self.apply(&[ConsoleOp::GroupStart(title.to_owned())]);
    }

    fn end_group(&self) {
        self.apply(&[ConsoleOp::GroupEnd]);
    }

    fn emit(&self, ops: &[ConsoleOp]) {
        self.apply(ops);
    }
}

/// Stdout sink used by [`Logger::new`](super::Logger::new).
pub type StdoutConsole = WriterConsole<io::Stdout>;

// ── TracingConsole ────────────────────────────────────────────────────────────

/// Forwards each line as a `tracing` event at `INFO`, target `astor::access`.
///
/// Colors are stripped; group nesting becomes a `| ` prefix.
#[derive(Default)]
pub struct TracingConsole {
    depth: Mutex<usize>,
}

impl TracingConsole {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply(&self, ops: &[ConsoleOp]) {
        let mut depth = lock(&self.depth);
        for op in ops {
            match op {
                ConsoleOp::Line(text) => emit_event(*depth, text),
                ConsoleOp::GroupStart(title) => {
                    emit_event(*depth, title);
                    *depth += 1;
                }
                ConsoleOp::GroupEnd => *depth = depth.saturating_sub(1),
            }
        }
    }
}

fn emit_event(depth: usize, text: &str) {
    let prefix = "| ".repeat(depth);
    for line in strip_ansi(text).split('\n') {
        tracing::info!(target: "astor::access", "{prefix}{line}");
    }
}

impl Console for TracingConsole {
    fn write(&self, line: &str) {
        self.apply(&[ConsoleOp::Line(line.to_owned())]);
    }

    fn start_group(&self, title: &str) {
        self.apply(&[ConsoleOp::GroupStart(title.to_owned())]);
    }

    fn end_group(&self) {
        self.apply(&[ConsoleOp::GroupEnd]);
    }

    fn emit(&self, ops: &[ConsoleOp]) {
        self.apply(ops);
    }
}

// ── MemoryConsole ─────────────────────────────────────────────────────────────

/// Records every op in memory. Meant for tests.
#[derive(Default)]
pub struct MemoryConsole {
    ops: Mutex<Vec<ConsoleOp>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub fn ops(&self) -> Vec<ConsoleOp> {
        lock(&self.ops).clone()
    }

    /// Drains the recording.
    pub fn take(&self) -> Vec<ConsoleOp> {
        std::mem::take(&mut *lock(&self.ops))
    }

    /// Recorded line texts with colors stripped, groups ignored.
    pub fn plain_lines(&self) -> Vec<String> {
        lock(&self.ops).iter()
            .filter_map(|op| match op {
                ConsoleOp::Line(text) => Some(strip_ansi(text)),
                _ => None,
            })
            .collect()
    }
}

impl Console for MemoryConsole {
    fn write(&self, line: &str) {
        lock(&self.ops).push(ConsoleOp::Line(line.to_owned()));
    }

    fn start_group(&self, title: &str) {
        lock(&self.ops).push(ConsoleOp::GroupStart(title.to_owned()));
    }

    fn end_group(&self) {
        lock(&self.ops).push(ConsoleOp::GroupEnd);
    }

    fn emit(&self, ops: &[ConsoleOp]) {
        lock(&self.ops).extend_from_slice(ops);
    }
}
