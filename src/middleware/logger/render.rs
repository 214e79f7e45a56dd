//! The five request log layouts.

use super::console::ConsoleOp;
use super::context::RequestContext;
use super::palette::PALETTE;
use super::style::LogStyle;

/// Renders one request in `style`. An empty block means nothing to print.
pub fn render(style: LogStyle, ctx: &RequestContext) -> Vec<ConsoleOp> {
    match style {
        LogStyle::Minified => vec![minified(ctx)],
        LogStyle::Inline => vec![inline(ctx, PALETTE.green, PALETTE.cyan)],
        LogStyle::Agent => agent(ctx),
        LogStyle::Error if ctx.status >= 400 => vec![inline(ctx, PALETTE.red, PALETTE.red)],
        LogStyle::Error => Vec::new(),
        LogStyle::Default => default(ctx),
    }
}

/// Wraps `text` in `reset` on both sides so no color leaks out of the line.
pub(super) fn line(text: String) -> ConsoleOp {
    let reset = PALETTE.reset;
    ConsoleOp::Line(format!("{reset}{text}{reset}"))
}

fn group_title(ctx: &RequestContext, color: &str, label: &str) -> ConsoleOp {
    let p = PALETTE;
    ConsoleOp::GroupStart(format!(
        "{}[{}] {}| {color}{label}{}",
        p.green, ctx.timestamp, p.reset, p.reset,
    ))
}

fn field(label: &str, value: impl std::fmt::Display) -> ConsoleOp {
    line(format!("{}{label}:{} {value}", PALETTE.yellow, PALETTE.reset))
}

fn minified(ctx: &RequestContext) -> ConsoleOp {
    let p = PALETTE;
    line(format!(
        "{} {}{} {}{} {}{}ms",
        ctx.method, p.green, ctx.path, p.cyan, ctx.status, p.reset, ctx.elapsed_ms,
    ))
}

/// Shared by `inline` and `error`; only the timestamp and status colors differ.
fn inline(ctx: &RequestContext, ts_color: &str, status_color: &str) -> ConsoleOp {
    let p = PALETTE;
    line(format!(
        "{ts_color}[{}]{} {} {}{} {status_color}{} {}{}ms {}{}{}",
        ctx.timestamp,
        p.reset,
        ctx.method,
        p.green,
        ctx.path,
        ctx.status,
        p.reset,
        ctx.elapsed_ms,
        p.yellow,
        ctx.content_length,
        p.reset,
    ))
}

fn agent(ctx: &RequestContext) -> Vec<ConsoleOp> {
    vec![
        group_title(ctx, PALETTE.cyan, "AGENT LOG"),
        field("IP", &ctx.client_addr),
        field("User Agent", user_agent(ctx)),
        field("Referer", &ctx.referer),
        ConsoleOp::GroupEnd,
    ]
}

fn default(ctx: &RequestContext) -> Vec<ConsoleOp> {
    vec![
        group_title(ctx, PALETTE.blue, "REQUEST LOG"),
        field("Timestamp", &ctx.timestamp),
        field("Method", &ctx.method),
        field("URL", &ctx.path),
        field("Status", ctx.status),
        field("Time", format_args!("{}ms", ctx.elapsed_ms)),
        field("IP", &ctx.client_addr),
        field("Size", ctx.content_length),
        field("User Agent", user_agent(ctx)),
        field("Referer", &ctx.referer),
        ConsoleOp::GroupEnd,
    ]
}

fn user_agent(ctx: &RequestContext) -> &str {
    ctx.user_agent.as_deref().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::logger::palette::strip_ansi;

    fn ctx(status: u16) -> RequestContext {
        RequestContext {
            method: "GET".into(),
            path: "/health?verbose=1".into(),
            client_addr: "127.0.0.1".into(),
            user_agent: Some("curl/8.0".into()),
            referer: "Unknown".into(),
            status,
            content_length: 2,
            elapsed_ms: 12,
            timestamp: "10:42:07".into(),
        }
    }

    fn plain(ops: &[ConsoleOp]) -> Vec<String> {
        ops.iter()
            .map(|op| match op {
                ConsoleOp::Line(t) => format!("line:{}", strip_ansi(t)),
                ConsoleOp::GroupStart(t) => format!("group:{}", strip_ansi(t)),
                ConsoleOp::GroupEnd => "end".to_owned(),
            })
            .collect()
    }

    #[test]
    fn every_line_is_wrapped_in_reset() {
        for style in LogStyle::ALL {
            for op in &render(style, &ctx(500)) {
                if let ConsoleOp::Line(text) | ConsoleOp::GroupStart(text) = op {
                    assert!(text.ends_with(PALETTE.reset), "{style}: {text:?}");
                }
                if let ConsoleOp::Line(text) = op {
                    assert!(text.starts_with(PALETTE.reset), "{style}: {text:?}");
                }
            }
        }
    }

    #[test]
    fn minified_is_one_ungrouped_line() {
        let ops = render(LogStyle::Minified, &ctx(200));
        assert_eq!(plain(&ops), vec!["line:GET /health?verbose=1 200 12ms"]);
    }

    #[test]
    fn inline_fields_in_order() {
        let ops = render(LogStyle::Inline, &ctx(200));
        assert_eq!(plain(&ops), vec!["line:[10:42:07] GET /health?verbose=1 200 12ms 2"]);
        let ConsoleOp::Line(text) = &ops[0] else { unreachable!() };
        assert!(text.contains(&format!("{}200", PALETTE.cyan)));
    }

    #[test]
    fn agent_is_three_lines_in_a_group() {
        let ops = render(LogStyle::Agent, &ctx(200));
        assert_eq!(plain(&ops), vec![
            "group:[10:42:07] | AGENT LOG",
            "line:IP: 127.0.0.1",
            "line:User Agent: curl/8.0",
            "line:Referer: Unknown",
            "end",
        ]);
    }

    #[test]
    fn missing_user_agent_prints_empty() {
        let mut c = ctx(200);
        c.user_agent = None;
        let ops = render(LogStyle::Agent, &c);
        assert_eq!(plain(&ops)[2], "line:User Agent: ");
    }

    #[test]
    fn error_style_skips_successes() {
        for status in [100, 200, 204, 301, 304, 399] {
            assert!(render(LogStyle::Error, &ctx(status)).is_empty(), "status {status}");
        }
    }

    #[test]
    fn error_style_alerts_on_failures() {
        for status in [400, 404, 499, 500, 503] {
            let ops = render(LogStyle::Error, &ctx(status));
            assert_eq!(plain(&ops), vec![format!("line:[10:42:07] GET /health?verbose=1 {status} 12ms 2")]);
            let ConsoleOp::Line(text) = &ops[0] else { unreachable!() };
            assert!(text.contains(&format!("{}{status}", PALETTE.red)));
            assert!(text.contains(&format!("{}[10:42:07]", PALETTE.red)));
        }
    }

    #[test]
    fn default_is_nine_lines_in_a_group() {
        let ops = render(LogStyle::Default, &ctx(404));
        assert_eq!(plain(&ops), vec![
            "group:[10:42:07] | REQUEST LOG",
            "line:Timestamp: 10:42:07",
            "line:Method: GET",
            "line:URL: /health?verbose=1",
            "line:Status: 404",
            "line:Time: 12ms",
            "line:IP: 127.0.0.1",
            "line:Size: 2",
            "line:User Agent: curl/8.0",
            "line:Referer: Unknown",
            "end",
        ]);
    }
}
