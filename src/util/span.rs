//! Source location tracking

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Source position (line and column, both 0-indexed, plus byte offset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    /// Line number (0-indexed)
    pub line: usize,
    /// Column in characters from the start of the line (0-indexed)
    pub column: usize,
    /// Byte offset from start of file
    pub offset: usize,
}

impl Position {
    /// Create a new position with offset
    #[inline]
    pub fn with_offset(
        line: usize,
        column: usize,
        offset: usize,
    ) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Half-open byte range `[start, end)` into one source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Span {
    /// Start offset (inclusive)
    pub start: usize,
    /// End offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a new span
    #[inline]
    pub fn new(
        start: usize,
        end: usize,
    ) -> Self {
        Self { start, end }
    }

    /// Create a dummy span
    #[inline]
    pub fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }

    /// Smallest span covering both `self` and `other`
    #[inline]
    pub fn to(
        self,
        other: Span,
    ) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Get the source text length
    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if span is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `other` lies entirely within `self`
    #[inline]
    pub fn contains(
        &self,
        other: Span,
    ) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for Span {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Source file information
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Absolute file path
    pub path: PathBuf,
    /// File content
    pub content: Arc<str>,
    /// Line start offsets for fast line lookup
    line_offsets: Vec<usize>,
}

impl SourceFile {
    /// Create a new source file
    pub fn new(
        path: impl Into<PathBuf>,
        content: impl Into<Arc<str>>,
    ) -> Self {
        let content = content.into();
        let mut line_offsets = vec![0];
        for (i, b) in content.bytes().enumerate() {
            if b == b'\n' {
                line_offsets.push(i + 1);
            }
        }

        Self {
            path: path.into(),
            content,
            line_offsets,
        }
    }

    /// Display name of the file
    pub fn name(&self) -> String {
        self.path.display().to_string()
    }

    /// File path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this is an ambient declaration file (`.d.ts`, `.d.mts`, ...)
    pub fn is_declaration_file(&self) -> bool {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts")
    }

    /// Get position from byte offset
    pub fn position_from_offset(
        &self,
        offset: usize,
    ) -> Position {
        let offset = offset.min(self.content.len());
        let line = self.line_offsets.partition_point(|&o| o <= offset) - 1;
        let line_start = self.line_offsets[line];
        let column = self
            .content
            .get(line_start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - line_start);
        Position::with_offset(line, column, offset)
    }

    /// Text of a 0-indexed line without its terminator
    pub fn line_text(
        &self,
        line: usize,
    ) -> &str {
        let Some(&start) = self.line_offsets.get(line) else {
            return "";
        };
        let end = self
            .line_offsets
            .get(line + 1)
            .map(|&o| o - 1)
            .unwrap_or(self.content.len());
        self.content[start..end].trim_end_matches('\r')
    }

    /// Get source text for a span
    pub fn source_text(
        &self,
        span: Span,
    ) -> &str {
        self.content.get(span.start..span.end).unwrap_or("")
    }
}

impl fmt::Display for SourceFile {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_from_offset() {
        let file = SourceFile::new("a.ts", "let a = 1;\nlet b = 2;\n");
        let pos = file.position_from_offset(15);
        assert_eq!(pos.line, 1);
        assert_eq!(pos.column, 4);
        assert_eq!(file.line_text(1), "let b = 2;");
    }

    #[test]
    fn test_declaration_file() {
        assert!(SourceFile::new("/p/types.d.ts", "").is_declaration_file());
        assert!(!SourceFile::new("/p/types.ts", "").is_declaration_file());
    }

    #[test]
    fn test_span_contains() {
        assert!(Span::new(0, 10).contains(Span::new(2, 10)));
        assert!(!Span::new(0, 10).contains(Span::new(2, 11)));
        assert_eq!(Span::new(3, 5).to(Span::new(1, 4)), Span::new(1, 5));
    }
}
