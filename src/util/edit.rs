//! Range-overwrite edit buffer
//!
//! Records overwrites against the *original* text. Edits may be registered in
//! any order; offsets always refer to the untouched input, so callers never have
//! to apply edits back-to-front.

use thiserror::Error;

/// Edit buffer error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("edit range {start}..{end} is out of bounds for text of length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },
    #[error("edit range {start}..{end} is not on a character boundary")]
    NotCharBoundary { start: usize, end: usize },
    #[error("edit range {start}..{end} overlaps earlier edit {other_start}..{other_end}")]
    Overlap {
        start: usize,
        end: usize,
        other_start: usize,
        other_end: usize,
    },
}

#[derive(Debug, Clone)]
struct Edit {
    start: usize,
    end: usize,
    text: String,
}

/// Edit buffer over an original string
#[derive(Debug, Clone)]
pub struct EditBuffer<'a> {
    original: &'a str,
    /// Kept sorted by start offset
    edits: Vec<Edit>,
}

impl<'a> EditBuffer<'a> {
    /// Create a buffer over `original`
    pub fn new(original: &'a str) -> Self {
        Self {
            original,
            edits: Vec::new(),
        }
    }

    /// Replace `[start, end)` of the original text with `text`
    pub fn overwrite(
        &mut self,
        start: usize,
        end: usize,
        text: impl Into<String>,
    ) -> Result<(), EditError> {
        let len = self.original.len();
        if start > end || end > len {
            return Err(EditError::OutOfBounds { start, end, len });
        }
        if !self.original.is_char_boundary(start) || !self.original.is_char_boundary(end) {
            return Err(EditError::NotCharBoundary { start, end });
        }

        let idx = self.edits.partition_point(|e| e.start < start);
        let conflicts = |e: &Edit| {
            // empty ranges only conflict when they sit strictly inside another edit
            if start == end {
                e.start < start && start < e.end
            } else if e.start == e.end {
                start < e.start && e.start < end
            } else {
                e.start < end && start < e.end
            }
        };
        for other in [idx.checked_sub(1), Some(idx)]
            .into_iter()
            .flatten()
            .filter_map(|i| self.edits.get(i))
        {
            if conflicts(other) {
                return Err(EditError::Overlap {
                    start,
                    end,
                    other_start: other.start,
                    other_end: other.end,
                });
            }
        }

        self.edits.insert(
            idx,
            Edit {
                start,
                end,
                text: text.into(),
            },
        );
        Ok(())
    }

    /// Remove `[start, end)` of the original text
    pub fn remove(
        &mut self,
        start: usize,
        end: usize,
    ) -> Result<(), EditError> {
        self.overwrite(start, end, String::new())
    }

    /// Insert text at `offset` without removing anything
    pub fn insert(
        &mut self,
        offset: usize,
        text: impl Into<String>,
    ) -> Result<(), EditError> {
        self.overwrite(offset, offset, text)
    }

    /// Whether any edit has been recorded
    pub fn has_changes(&self) -> bool {
        !self.edits.is_empty()
    }

    /// Materialize the edited text
    pub fn finish(&self) -> String {
        let mut out = String::with_capacity(self.original.len());
        let mut cursor = 0;
        for edit in &self.edits {
            out.push_str(&self.original[cursor..edit.start]);
            out.push_str(&edit.text);
            cursor = cursor.max(edit.end);
        }
        out.push_str(&self.original[cursor..]);
        out
    }
}

impl std::fmt::Display for EditBuffer<'_> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(&self.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_order_edits() {
        let mut buf = EditBuffer::new("console.log(sum(1, 2));");
        buf.overwrite(12, 21, "3").unwrap();
        buf.overwrite(0, 7, "logger").unwrap();
        assert_eq!(buf.finish(), "logger.log(3);");
    }

    #[test]
    fn test_overlap_rejected() {
        let mut buf = EditBuffer::new("abcdef");
        buf.overwrite(1, 4, "x").unwrap();
        assert!(matches!(
            buf.overwrite(3, 5, "y"),
            Err(EditError::Overlap { .. })
        ));
        buf.overwrite(4, 6, "z").unwrap();
        assert_eq!(buf.finish(), "axz");
    }

    #[test]
    fn test_insert_and_remove() {
        let mut buf = EditBuffer::new("let x: number = 1;");
        buf.remove(5, 13).unwrap();
        buf.insert(0, "/*a*/").unwrap();
        assert_eq!(buf.finish(), "/*a*/let x = 1;");
    }

    #[test]
    fn test_out_of_bounds() {
        let mut buf = EditBuffer::new("abc");
        assert!(buf.overwrite(2, 9, "").is_err());
    }
}
