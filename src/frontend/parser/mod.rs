//! Parser module
//!
//! This module implements a Pratt Parser for the TypeScript / JavaScript subset.
//! The parser transforms tokens into an Abstract Syntax Tree (AST).
//!
//! Type syntax is parsed for its extent only: every piece of TypeScript-only
//! syntax is recorded as a strip span in [`ParseOutput::type_spans`], which the
//! eraser blanks out to obtain plain JavaScript.

pub mod ast;
mod decl;
mod expr;
mod led;
mod nud;
mod state;
mod stmt;
mod type_parser;
pub mod visit;

pub use state::{ParserState, BP_HIGHEST, BP_LOWEST};

use crate::frontend::lexer::tokens::LexError;
use crate::frontend::lexer::tokenize;
use crate::util::span::Span;
use ast::*;

/// Which grammar the parser accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOptions {
    /// Accept TypeScript syntax
    pub ts: bool,
    /// Parse as the body of an async function: top-level `return` and `await`
    pub function_body: bool,
}

impl ParseOptions {
    /// TypeScript module
    pub fn typescript() -> Self {
        Self {
            ts: true,
            function_body: false,
        }
    }

    /// Plain JavaScript module
    pub fn javascript() -> Self {
        Self {
            ts: false,
            function_body: false,
        }
    }

    /// Parse as an async function body
    pub fn function_body(self) -> Self {
        Self {
            function_body: true,
            ..self
        }
    }
}

/// TypeScript construct with runtime semantics that type erasure cannot remove
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unerasable {
    pub span: Span,
    pub construct: &'static str,
}

/// Result of a successful parse
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub module: Module,
    /// TypeScript-only syntax, in the order it was recorded (may nest)
    pub type_spans: Vec<Span>,
    pub unerasable: Vec<Unerasable>,
}

/// Parse source text
///
/// # Arguments
/// * `source` - Source text
/// * `options` - Grammar selection
///
/// # Returns
/// Parsed module with its strip spans, or the first parse error
pub fn parse(
    source: &str,
    options: ParseOptions,
) -> Result<ParseOutput, ParseError> {
    let tokens = tokenize(source)?;
    let mut state = ParserState::new(&tokens, options.ts);
    // top-level await is valid in modules
    state.in_async = true;
    state.in_function = options.function_body;

    let body = state.parse_statements();
    if let Some(error) = state.first_error().cloned() {
        tracing::trace!("parse failed: {}", error);
        return Err(error);
    }
    if !state.at_end() {
        state.error_unexpected();
        return Err(state.first_error().cloned().unwrap_or(ParseError::Invalid {
            message: "Unexpected input".into(),
            offset: state.start(),
        }));
    }

    let type_spans = std::mem::take(&mut state.type_spans);
    let unerasable = std::mem::take(&mut state.unerasable);
    Ok(ParseOutput {
        module: Module {
            body,
            span: Span::new(0, source.len()),
        },
        type_spans,
        unerasable,
    })
}

/// Parse a single expression
///
/// # Arguments
/// * `source` - Expression text
/// * `ts` - Accept TypeScript syntax
///
/// # Returns
/// Parsed expression or error
pub fn parse_expression(
    source: &str,
    ts: bool,
) -> Result<Expr, ParseError> {
    let tokens = tokenize(source)?;
    let mut state = ParserState::new(&tokens, ts);
    let expr = state.parse_expression_seq();
    if let Some(error) = state.first_error().cloned() {
        return Err(error);
    }
    match expr {
        Some(e) if state.at_end() => Ok(e),
        _ => {
            state.error_unexpected();
            Err(state.first_error().cloned().unwrap_or(ParseError::Invalid {
                message: "Invalid expression".into(),
                offset: 0,
            }))
        }
    }
}

/// Parse error types
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("Expected {expected}, found {found} at offset {offset}")]
    Expected {
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("Unexpected {found} at offset {offset}")]
    UnexpectedToken { found: String, offset: usize },

    #[error("Invalid left-hand side in assignment at offset {offset}")]
    InvalidAssignmentTarget { offset: usize },

    #[error("Illegal return statement at offset {offset}")]
    IllegalReturn { offset: usize },

    #[error("{message} at offset {offset}")]
    Invalid { message: String, offset: usize },
}

impl ParseError {
    /// Byte offset the error points at
    pub fn offset(&self) -> usize {
        match self {
            ParseError::Lex(e) => e.offset(),
            ParseError::Expected { offset, .. }
            | ParseError::UnexpectedToken { offset, .. }
            | ParseError::InvalidAssignmentTarget { offset }
            | ParseError::IllegalReturn { offset }
            | ParseError::Invalid { offset, .. } => *offset,
        }
    }
}

#[cfg(test)]
mod tests;
