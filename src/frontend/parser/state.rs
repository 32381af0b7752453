//! Parser state and token stream management

use super::{ParseError, Unerasable};
use crate::frontend::lexer::tokens::*;
use crate::util::span::Span;

/// Binding power levels for Pratt parser
pub const BP_LOWEST: u8 = 0;
pub const BP_ASSIGN: u8 = 10;
pub const BP_COND: u8 = 15;
pub const BP_NULLISH: u8 = 18;
pub const BP_OR: u8 = 20;
pub const BP_AND: u8 = 30;
pub const BP_BIT_OR: u8 = 32;
pub const BP_BIT_XOR: u8 = 34;
pub const BP_BIT_AND: u8 = 36;
pub const BP_EQ: u8 = 40;
pub const BP_CMP: u8 = 50;
pub const BP_SHIFT: u8 = 55;
pub const BP_ADD: u8 = 60;
pub const BP_MUL: u8 = 70;
pub const BP_EXP: u8 = 75;
pub const BP_UNARY: u8 = 80;
pub const BP_POSTFIX: u8 = 85;
pub const BP_CALL: u8 = 90;
pub const BP_HIGHEST: u8 = 100;

/// Operator spelled by one or more adjacent `>`/`=` tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GtOp {
    Gt,
    Ge,
    Shr,
    UShr,
    ShrEq,
    UShrEq,
}

/// Snapshot for speculative parsing
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    pos: usize,
    prev_end: usize,
    errors: usize,
    type_spans: usize,
    unerasable: usize,
}

/// Parser state for tracking position and errors
#[derive(Debug)]
pub struct ParserState<'a> {
    /// Token stream
    tokens: &'a [Token],
    /// Current position in token stream
    pos: usize,
    /// End offset of the last consumed token
    prev_end: usize,
    /// Parsing errors
    errors: Vec<ParseError>,
    /// TypeScript syntax enabled
    pub(crate) ts: bool,
    /// `await` is an operator here
    pub(crate) in_async: bool,
    /// `return` is allowed here
    pub(crate) in_function: bool,
    /// `yield` is an operator here
    pub(crate) in_generator: bool,
    /// `in` is not a binary operator (for-statement heads)
    pub(crate) no_in: bool,
    /// Inside `declare` / `.d.ts` context: bodies may be omitted
    pub(crate) ambient: bool,
    /// Spans of syntax that only exists in TypeScript
    pub(crate) type_spans: Vec<Span>,
    /// TypeScript constructs with runtime semantics that blanking cannot remove
    pub(crate) unerasable: Vec<Unerasable>,
}

impl<'a> ParserState<'a> {
    /// Create a new parser state
    ///
    /// `tokens` must end with an `Eof` token.
    #[inline]
    pub fn new(
        tokens: &'a [Token],
        ts: bool,
    ) -> Self {
        Self {
            tokens,
            pos: 0,
            prev_end: 0,
            errors: Vec::new(),
            ts,
            in_async: false,
            in_function: false,
            in_generator: false,
            no_in: false,
            ambient: false,
            type_spans: Vec::new(),
            unerasable: Vec::new(),
        }
    }

    /// Check if at end of token stream
    #[inline]
    pub fn at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    /// Get current token
    #[inline]
    pub fn current(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    /// Get current token kind
    #[inline]
    pub fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    /// Peek at nth token ahead
    #[inline]
    pub fn peek_nth(
        &self,
        n: usize,
    ) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + n).min(last)]
    }

    /// Peek at next token
    #[inline]
    pub fn peek(&self) -> &Token {
        self.peek_nth(1)
    }

    /// Advance to next token
    #[inline]
    pub fn bump(&mut self) {
        if !self.at_end() {
            self.prev_end = self.current().span.end;
            self.pos += 1;
        }
    }

    /// Start offset of the current token
    #[inline]
    pub fn start(&self) -> usize {
        self.current().span.start
    }

    /// End offset of the last consumed token
    #[inline]
    pub fn prev_end(&self) -> usize {
        self.prev_end
    }

    /// Span from `start` to the end of the last consumed token
    #[inline]
    pub fn span_from(
        &self,
        start: usize,
    ) -> Span {
        Span::new(start, self.prev_end.max(start))
    }

    /// Current token is the punctuator `p`
    #[inline]
    pub fn at(
        &self,
        p: Punct,
    ) -> bool {
        self.kind().is_punct(p)
    }

    /// Current token is the reserved word `k`
    #[inline]
    pub fn at_kw(
        &self,
        k: Keyword,
    ) -> bool {
        self.kind().is_keyword(k)
    }

    /// Current token is the contextual keyword `name`
    #[inline]
    pub fn at_ident(
        &self,
        name: &str,
    ) -> bool {
        self.kind().is_ident(name)
    }

    /// A line terminator precedes the current token
    #[inline]
    pub fn newline_before(&self) -> bool {
        self.current().newline_before
    }

    /// Skip a specific punctuator
    #[inline]
    pub fn skip(
        &mut self,
        p: Punct,
    ) -> bool {
        if self.at(p) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Skip a specific reserved word
    #[inline]
    pub fn skip_kw(
        &mut self,
        k: Keyword,
    ) -> bool {
        if self.at_kw(k) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Skip a contextual keyword
    #[inline]
    pub fn skip_ident(
        &mut self,
        name: &str,
    ) -> bool {
        if self.at_ident(name) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Expect a specific punctuator, report error if not found
    pub fn expect(
        &mut self,
        p: Punct,
    ) -> Option<()> {
        if self.skip(p) {
            return Some(());
        }
        self.error_expected(&format!("'{}'", p.as_str()));
        None
    }

    /// Expect a specific reserved word
    pub fn expect_kw(
        &mut self,
        k: Keyword,
    ) -> Option<()> {
        if self.skip_kw(k) {
            return Some(());
        }
        self.error_expected(&format!("'{}'", k.as_str()));
        None
    }

    /// Consume a statement terminator, applying automatic semicolon insertion
    pub fn consume_semicolon(&mut self) -> Option<()> {
        if self.skip(Punct::Semicolon) {
            return Some(());
        }
        if self.at(Punct::RBrace) || self.at_end() || self.newline_before() {
            return Some(());
        }
        self.error_expected("';'");
        None
    }

    /// Recognise `>`, `>=`, `>>`, `>>>`, `>>=` and `>>>=` from adjacent tokens
    pub fn gt_op(&self) -> Option<(GtOp, usize)> {
        if !self.at(Punct::Gt) {
            return None;
        }
        let mut end = self.current().span.end;
        let mut gts = 1;
        let mut n = 1;
        loop {
            let next = self.peek_nth(n);
            if next.span.start != end {
                break;
            }
            match &next.kind {
                TokenKind::Punct(Punct::Gt) if gts < 3 => {
                    gts += 1;
                }
                TokenKind::Punct(Punct::Eq) => {
                    n += 1;
                    let op = match gts {
                        1 => GtOp::Ge,
                        2 => GtOp::ShrEq,
                        _ => GtOp::UShrEq,
                    };
                    return Some((op, n));
                }
                TokenKind::Punct(Punct::EqEq) | TokenKind::Punct(Punct::EqEqEq) => break,
                TokenKind::Punct(Punct::Le) if gts < 3 => {
                    // `>` followed by `<=` never glues
                    break;
                }
                _ => break,
            }
            end = next.span.end;
            n += 1;
        }
        let op = match gts {
            1 => GtOp::Gt,
            2 => GtOp::Shr,
            _ => GtOp::UShr,
        };
        Some((op, n))
    }

    /// Consume `count` tokens
    pub fn bump_n(
        &mut self,
        count: usize,
    ) {
        for _ in 0..count {
            self.bump();
        }
    }

    /// Add a parse error
    #[inline]
    pub fn error(
        &mut self,
        error: ParseError,
    ) {
        self.errors.push(error);
    }

    /// Report that `expected` was wanted at the current token
    pub fn error_expected(
        &mut self,
        expected: &str,
    ) {
        let token = self.current();
        self.errors.push(ParseError::Expected {
            expected: expected.to_string(),
            found: token.kind.to_string(),
            offset: token.span.start,
        });
    }

    /// Report the current token as unexpected
    pub fn error_unexpected(&mut self) {
        let token = self.current();
        self.errors.push(ParseError::UnexpectedToken {
            found: token.kind.to_string(),
            offset: token.span.start,
        });
    }

    /// Check if there are errors
    #[inline]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Get first error
    #[inline]
    pub fn first_error(&self) -> Option<&ParseError> {
        self.errors.first()
    }

    /// Get all errors
    #[inline]
    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    /// Record a span of TypeScript-only syntax
    #[inline]
    pub fn strip(
        &mut self,
        span: Span,
    ) {
        if !span.is_empty() {
            self.type_spans.push(span);
        }
    }

    /// Record syntax that type erasure cannot remove
    #[inline]
    pub fn unerasable(
        &mut self,
        span: Span,
        construct: &'static str,
    ) {
        self.unerasable.push(Unerasable { span, construct });
    }

    /// Save position for backtracking
    #[inline]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            prev_end: self.prev_end,
            errors: self.errors.len(),
            type_spans: self.type_spans.len(),
            unerasable: self.unerasable.len(),
        }
    }

    /// Restore a saved position, discarding everything recorded since
    #[inline]
    pub fn restore(
        &mut self,
        cp: Checkpoint,
    ) {
        self.pos = cp.pos;
        self.prev_end = cp.prev_end;
        self.errors.truncate(cp.errors);
        self.type_spans.truncate(cp.type_spans);
        self.unerasable.truncate(cp.unerasable);
    }

    /// Run `f` speculatively: keep its result only if it succeeded without errors
    pub fn try_parse<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Option<T>,
    ) -> Option<T> {
        let cp = self.checkpoint();
        match f(self) {
            Some(value) if self.errors.len() == cp.errors => Some(value),
            _ => {
                self.restore(cp);
                None
            }
        }
    }

    /// Run `f` with the function-context flags temporarily replaced
    pub fn with_context<T>(
        &mut self,
        in_function: bool,
        in_async: bool,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let saved = (self.in_function, self.in_async, self.in_generator, self.no_in);
        self.in_function = in_function;
        self.in_async = in_async;
        self.in_generator = false;
        self.no_in = false;
        let result = f(self);
        (self.in_function, self.in_async, self.in_generator, self.no_in) = saved;
        result
    }

    /// Run `f` with `yield` enabled or disabled as an operator
    pub fn with_generator<T>(
        &mut self,
        in_generator: bool,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let saved = self.in_generator;
        self.in_generator = in_generator;
        let result = f(self);
        self.in_generator = saved;
        result
    }

    /// Run `f` with `in` allowed or disallowed as a binary operator
    pub fn with_no_in<T>(
        &mut self,
        no_in: bool,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let saved = self.no_in;
        self.no_in = no_in;
        let result = f(self);
        self.no_in = saved;
        result
    }

    /// Parse a binding identifier (reserved words are rejected)
    pub fn parse_binding_ident(&mut self) -> Option<super::ast::Ident> {
        match &self.current().kind {
            TokenKind::Identifier(name) => {
                let ident = super::ast::Ident {
                    name: name.clone(),
                    span: self.current().span,
                };
                self.bump();
                Some(ident)
            }
            _ => {
                self.error_expected("identifier");
                None
            }
        }
    }

    /// Parse an identifier name (reserved words allowed: property keys, `a.default`)
    pub fn parse_ident_name(&mut self) -> Option<super::ast::Ident> {
        let span = self.current().span;
        let name = match &self.current().kind {
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::Keyword(kw) => kw.as_str().to_string(),
            _ => {
                self.error_expected("identifier");
                return None;
            }
        };
        self.bump();
        Some(super::ast::Ident { name, span })
    }

    /// Current token is an identifier or reserved word
    #[inline]
    pub fn at_ident_name(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Identifier(_) | TokenKind::Keyword(_)
        )
    }
}
