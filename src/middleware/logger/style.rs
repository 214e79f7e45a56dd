//! Log style selection.

use std::fmt;
use std::str::FromStr;

use super::palette::PALETTE;

/// One of the five request log layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LogStyle {
    /// `GET /path 200 12ms`
    Minified,
    /// `[10:42:07] GET /path 200 12ms 2`
    Inline,
    /// Grouped client block: address, user agent, referer.
    Agent,
    /// Like `Inline`, but only for responses with status 400 and above.
    Error,
    /// Grouped nine-field block.
    #[default]
    Default,
}

impl LogStyle {
    /// Every style, in the order their names are documented.
    pub const ALL: [LogStyle; 5] = [
        LogStyle::Minified,
        LogStyle::Inline,
        LogStyle::Agent,
        LogStyle::Error,
        LogStyle::Default,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minified => "minified",
            Self::Inline   => "inline",
            Self::Agent    => "agent",
            Self::Error    => "error",
            Self::Default  => "default",
        }
    }

    /// Resolves a candidate style name. Unknown, empty and absent candidates
    /// fall back to [`LogStyle::Default`] and carry the warning to print.
    pub fn resolve(candidate: Option<&str>) -> Resolved {
        match candidate.map(str::parse::<LogStyle>) {
            Some(Ok(style)) => Resolved { style, warning: None },
            Some(Err(e)) => Resolved { style: Self::Default, warning: Some(invalid_style_warning(&e.0)) },
            None => Resolved { style: Self::Default, warning: Some(invalid_style_warning("none")) },
        }
    }
}

/// Outcome of [`LogStyle::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub style: LogStyle,
    /// Set when the candidate was rejected.
    pub warning: Option<String>,
}

fn invalid_style_warning(rejected: &str) -> String {
    format!(
        "{yellow}** Invalid style option: {rejected} **\n\
         ** Logger middleware will use the default log style. **{reset}",
        yellow = PALETTE.yellow,
        reset = PALETTE.reset,
    )
}

impl fmt::Display for LogStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-sensitive: `"inline"` parses, `"Inline"` does not.
impl FromStr for LogStyle {
    type Err = ParseLogStyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|style| style.as_str() == s)
            .ok_or_else(|| ParseLogStyleError(s.to_owned()))
    }
}

/// A style name outside `minified`, `inline`, `agent`, `error`, `default`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLogStyleError(String);

impl ParseLogStyleError {
    pub fn rejected(&self) -> &str { &self.0 }
}

impl fmt::Display for ParseLogStyleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log style `{}`", self.0)
    }
}

impl std::error::Error for ParseLogStyleError {}
