//! Source positions as seen by the semantic engine.  The host front end owns
//! the real source manager; this module only carries the opaque offsets the
//! engine needs to attach diagnostics and reference sites to.

use std::fmt::Display;

/// A unique offset into the global space of all source code.  The host
/// compiler's source manager converts an offset back to a file and position;
/// the engine treats it as an opaque ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Default)]
pub struct Offset(u32);

impl Offset {
    pub fn new(o: u32) -> Offset {
        Offset(o)
    }
}

impl Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}", self.0))
    }
}

/// A span of source code, from the start of the first character to the end of
/// the last character.  Spans identify where a variable was referenced in a
/// clause, where a directive begins, and where diagnostics point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span(Offset, Offset);

impl Span {
    pub fn new(low: Offset, high: Offset) -> Span {
        Span(low, high)
    }

    /// A span covering a single offset.  Directive entry points and
    /// synthesized expressions use zero-width spans.
    pub fn at(o: u32) -> Span {
        Span(Offset::new(o), Offset::new(o))
    }

    /// A span for code that has no source at all (synthesized declarations).
    pub fn zero() -> Span {
        Span::default()
    }

    pub fn low(&self) -> Offset {
        self.0
    }

    pub fn high(&self) -> Offset {
        self.1
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("[{}..{}]", self.0, self.1))
    }
}
