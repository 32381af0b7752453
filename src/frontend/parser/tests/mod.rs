//! Parser tests module

mod basic;
mod typescript;

use crate::frontend::parser::ast::*;
use crate::frontend::parser::{parse, ParseOptions, ParseOutput};

/// Parse TypeScript source, panicking on error
pub(crate) fn parse_ts(source: &str) -> ParseOutput {
    parse(source, ParseOptions::typescript()).unwrap_or_else(|e| panic!("{source:?}: {e}"))
}

/// Parse JavaScript source, panicking on error
pub(crate) fn parse_js(source: &str) -> ParseOutput {
    parse(source, ParseOptions::javascript()).unwrap_or_else(|e| panic!("{source:?}: {e}"))
}

/// Text of each strip span
pub(crate) fn stripped<'s>(
    source: &'s str,
    output: &ParseOutput,
) -> Vec<&'s str> {
    output
        .type_spans
        .iter()
        .map(|s| &source[s.start..s.end])
        .collect()
}

/// Blank every strip span and drop all whitespace, for comparison
pub(crate) fn erased(source: &str) -> String {
    let output = parse_ts(source);
    let mut bytes = source.as_bytes().to_vec();
    for span in &output.type_spans {
        for b in &mut bytes[span.start..span.end] {
            if *b != b'\n' {
                *b = b' ';
            }
        }
    }
    let text = String::from_utf8(bytes).unwrap();
    squash(&text)
}

pub(crate) fn squash(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

pub(crate) fn assert_erases(
    source: &str,
    expected: &str,
) {
    assert_eq!(erased(source), squash(expected), "erasing {source:?}");
}

/// The first statement's expression
pub(crate) fn first_expr(output: &ParseOutput) -> &Expr {
    match &output.module.body[0].kind {
        StmtKind::Expr(e) => e,
        other => panic!("expected expression statement, got {other:?}"),
    }
}
