use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Source location in the original contract, as recorded by the front end
/// (`start:length:file`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SrcSpan {
    /// Byte offset of the start in the source
    pub start: usize,
    /// Length in bytes
    pub length: usize,
    /// Source unit index (`-1` when no file is attributed)
    pub file: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed source location '{0}' (expected start:length:file)")]
pub struct SpanParseError(pub String);

impl SrcSpan {
    pub fn new(start: usize, length: usize, file: i64) -> Self {
        Self { start, length, file }
    }

    pub fn dummy() -> Self {
        Self { start: 0, length: 0, file: -1 }
    }

    /// 1-based line and column of the span start within `source`.
    pub fn line_col(&self, source: &str) -> Option<(usize, usize)> {
        let before = source.get(..self.start)?;
        let line = before.matches('\n').count() + 1;
        let col = match before.rfind('\n') {
            Some(nl) => before.len() - nl,
            None => before.len() + 1,
        };
        Some((line, col))
    }

    /// The full source line the span starts on, without its newline.
    pub fn line_text(&self, source: &str) -> Option<String> {
        let (line, _) = self.line_col(source)?;
        source.lines().nth(line - 1).map(|l| l.to_string())
    }
}

impl FromStr for SrcSpan {
    type Err = SpanParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || SpanParseError(s.to_string());
        let mut parts = s.split(':');
        let (Some(start), Some(length), Some(file), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(bad());
        };
        Ok(Self {
            start: start.parse().map_err(|_| bad())?,
            length: length.parse().map_err(|_| bad())?,
            file: file.parse().map_err(|_| bad())?,
        })
    }
}

impl fmt::Display for SrcSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.start, self.length, self.file)
    }
}
