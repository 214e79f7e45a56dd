//! ANSI escape sequences used by the request log.

/// Named terminal colors. One process-wide constant, [`PALETTE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub reset: &'static str,
    pub bright: &'static str,
    pub dim: &'static str,
    pub underscore: &'static str,
    pub yellow: &'static str,
    pub green: &'static str,
    pub blue: &'static str,
    pub red: &'static str,
    pub cyan: &'static str,
}

pub const PALETTE: Palette = Palette {
    reset:      "\x1b[0m",
    bright:     "\x1b[1m",
    dim:        "\x1b[2m",
    underscore: "\x1b[4m",
    yellow:     "\x1b[33m",
    green:      "\x1b[32m",
    blue:       "\x1b[34m",
    red:        "\x1b[31m",
    cyan:       "\x1b[36m",
};

/// Removes ANSI SGR sequences (`ESC [ … m`), leaving the visible text.
///
/// Useful for sinks that do not speak ANSI, and for assertions on rendered
/// lines.
pub fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // Skip through the terminating `m`.
            for c in chars.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_every_palette_color() {
        let p = PALETTE;
        let colored = format!(
            "{}a{}b{}c{}d{}e{}f{}g{}h{}",
            p.reset, p.bright, p.dim, p.underscore, p.yellow, p.green, p.blue, p.red, p.cyan,
        );
        assert_eq!(strip_ansi(&colored), "abcdefgh");
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(strip_ansi("GET /health 200 12ms"), "GET /health 200 12ms");
    }
}
