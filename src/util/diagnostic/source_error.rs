//! Source-error formatting
//!
//! Evaluation runs in a program assembled from fragments of the user's file,
//! so a bare stack trace is hard to map back. The formatted error shows the
//! failing expression in its file, the program that was actually run, and
//! the cause.

use super::render::boxed;
use crate::util::span::{SourceFile, Span};

/// Everything known about a failed target
#[derive(Debug, Clone, Copy)]
pub struct SourceErrorInput<'a> {
    pub file: &'a SourceFile,
    /// The target expression
    pub target: Span,
    /// Statement that encloses the target
    pub statement: Span,
    /// Stack or message of the cause
    pub error: &'a str,
    /// Assembled program, when the failure happened after assembly
    pub program: Option<&'a str>,
    /// Type-erased program, when erasure succeeded
    pub erased: Option<&'a str>,
}

/// Render the numbered error report of a failed target
pub fn format_source_error(input: SourceErrorInput<'_>) -> String {
    let mut items = Vec::with_capacity(3);

    let marker = format!("{}:{}:{}", input.file.name(), input.target.start, input.target.end);
    items.push(format!(
        "We attempted to evaluate the following expression at compile time:\n{}\n    at {}",
        boxed(&excerpt(input.file, input.target, input.statement), None),
        marker
    ));

    let (program, suffix) = match (input.erased, input.program) {
        (Some(erased), _) => (Some(erased), " (types stripped)"),
        (None, Some(program)) => (Some(program), ""),
        (None, None) => (None, ""),
    };
    if let Some(program) = program {
        items.push(format!(
            "Then we constructed this evaluation context{}:\n{}",
            suffix,
            boxed(program, None)
        ));
    }

    items.push(input.error.to_string());

    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// First line of the enclosing statement with the target underlined by `~`
fn excerpt(
    file: &SourceFile,
    target: Span,
    statement: Span,
) -> String {
    let stmt_start = file.position_from_offset(statement.start);
    let start = file.position_from_offset(target.start);
    let end = file.position_from_offset(target.end);
    // tabs become single spaces so columns line up
    let line = file.line_text(stmt_start.line).replace('\t', " ");

    let length = if start.line == end.line {
        end.column.saturating_sub(start.column)
    } else {
        line.chars().count().saturating_sub(start.column)
    };
    format!(
        "{}\n{}{} <- Error occurred with this expression",
        line,
        " ".repeat(start.column),
        "~".repeat(length)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(
        file: &'a SourceFile,
        target: &str,
        error: &'a str,
    ) -> SourceErrorInput<'a> {
        let start = file.content.find(target).unwrap();
        SourceErrorInput {
            file,
            target: Span::new(start, start + target.len()),
            statement: Span::new(0, file.content.len()),
            error,
            program: None,
            erased: None,
        }
    }

    #[test]
    fn test_underlines_target() {
        let file = SourceFile::new("/p/a.ts", "const x = boom(1);\n");
        let out = format_source_error(input(&file, "boom(1)", "Error: no"));
        assert!(out.starts_with("1. We attempted to evaluate"));
        assert!(out.contains("│ const x = boom(1); "));
        assert!(out.contains(&format!("│ {}~~~~~~~ <- Error occurred with this expression ", " ".repeat(10))));
        assert!(out.contains("    at /p/a.ts:10:17"));
        assert!(out.ends_with("\n\n2. Error: no"));
    }

    #[test]
    fn test_multiline_target_runs_to_line_end() {
        let file = SourceFile::new("/p/a.ts", "const y = f(\n  2\n);");
        let out = format_source_error(input(&file, "f(\n  2\n)", "x"));
        assert!(out.contains(&format!("│ {}~~ <- Error", " ".repeat(10))));
    }

    #[test]
    fn test_program_section() {
        let file = SourceFile::new("/p/a.ts", "f()");
        let mut data = input(&file, "f()", "boom");
        data.program = Some("return f();");
        let out = format_source_error(data);
        assert!(out.contains("2. Then we constructed this evaluation context:\n"));
        assert!(out.contains("3. boom"));

        data.erased = Some("return f( );");
        let out = format_source_error(data);
        assert!(out.contains("evaluation context (types stripped):"));
        assert!(out.contains("return f( );"));
    }
}
