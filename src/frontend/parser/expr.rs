//! Pratt Parser expression parsing

use super::ast::*;
use super::state::*;
use super::ParseError;
use crate::frontend::lexer::tokens::*;
use crate::util::span::Span;

impl<'a> ParserState<'a> {
    /// Parse an expression using Pratt parser
    ///
    /// # Algorithm
    /// 1. Parse prefix expression (nud)
    /// 2. While next token is infix operator with binding power >= bp:
    ///    parse infix expression (led) with its right binding power
    #[inline]
    pub fn parse_expression(
        &mut self,
        min_bp: u8,
    ) -> Option<Expr> {
        let mut lhs = self.parse_prefix()?;

        loop {
            if self.at_end() {
                break;
            }

            // `f<T>(x)`: type arguments bind tighter than `<`
            if self.ts && self.at(Punct::Lt) && min_bp <= BP_CALL {
                if let Some(span) = self.try_expr_type_args() {
                    self.strip(span);
                    lhs = self.parse_chain(lhs)?;
                    continue;
                }
            }

            let (left_bp, right_bp, infix_fn) = match self.infix_info() {
                Some(info) => info,
                None => break,
            };

            if left_bp < min_bp {
                break;
            }

            lhs = (infix_fn)(self, lhs, right_bp)?;
        }

        Some(lhs)
    }

    /// AssignmentExpression
    #[inline]
    pub fn parse_assignment(&mut self) -> Option<Expr> {
        self.parse_expression(BP_ASSIGN)
    }

    /// Expression, including the comma operator
    pub fn parse_expression_seq(&mut self) -> Option<Expr> {
        let first = self.parse_assignment()?;
        if !self.at(Punct::Comma) {
            return Some(first);
        }
        let start = first.span.start;
        let mut exprs = vec![first];
        while self.skip(Punct::Comma) {
            exprs.push(self.parse_assignment()?);
        }
        Some(Expr {
            kind: ExprKind::Seq(exprs),
            span: self.span_from(start),
        })
    }

    /// Argument list after `(`, consuming the closing `)`
    pub fn parse_arguments(&mut self) -> Option<Vec<ExprOrSpread>> {
        self.expect(Punct::LParen)?;
        let mut args = Vec::new();
        self.with_no_in(false, |s| {
            while !s.at(Punct::RParen) {
                let spread = s.skip(Punct::DotDotDot);
                let expr = s.parse_assignment()?;
                args.push(ExprOrSpread { spread, expr });
                if !s.skip(Punct::Comma) {
                    break;
                }
            }
            Some(())
        })?;
        self.expect(Punct::RParen)?;
        Some(args)
    }

    /// Template literal starting at the current token
    pub fn parse_template(&mut self) -> Option<Template> {
        let start = self.start();
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        match self.kind().clone() {
            TokenKind::NoSubstitutionTemplate(chunk) => {
                self.bump();
                quasis.push(chunk);
            }
            TokenKind::TemplateHead(chunk) => {
                self.bump();
                quasis.push(chunk);
                loop {
                    let expr = self.with_no_in(false, |s| s.parse_expression_seq())?;
                    exprs.push(expr);
                    match self.kind().clone() {
                        TokenKind::TemplateMiddle(chunk) => {
                            self.bump();
                            quasis.push(chunk);
                        }
                        TokenKind::TemplateTail(chunk) => {
                            self.bump();
                            quasis.push(chunk);
                            break;
                        }
                        _ => {
                            self.error_expected("'}'");
                            return None;
                        }
                    }
                }
            }
            _ => {
                self.error_expected("template literal");
                return None;
            }
        }
        Some(Template {
            quasis,
            exprs,
            span: self.span_from(start),
        })
    }

    /// Convert an expression parsed as a cover grammar into an assignment pattern
    pub fn expr_to_pattern(
        &mut self,
        expr: Expr,
    ) -> Option<Pattern> {
        let span = expr.span;
        if matches!(expr.kind, ExprKind::Member { optional: false, .. }) {
            return Some(Pattern {
                kind: PatternKind::Expr(Box::new(expr)),
                span,
            });
        }
        let kind = match expr.kind {
            ExprKind::Ident(ident) => PatternKind::Ident(ident),
            ExprKind::Paren(inner) | ExprKind::TypeCast(inner) => {
                return match inner.kind {
                    ExprKind::Ident(_)
                    | ExprKind::Member { optional: false, .. }
                    | ExprKind::TypeCast(_)
                    | ExprKind::Paren(_) => self.expr_to_pattern(*inner),
                    _ => {
                        self.error(ParseError::InvalidAssignmentTarget { offset: span.start });
                        None
                    }
                };
            }
            ExprKind::Array(elems) => {
                let mut out = Vec::new();
                let mut rest = None;
                let count = elems.len();
                for (i, elem) in elems.into_iter().enumerate() {
                    match elem {
                        None => out.push(None),
                        Some(ExprOrSpread { spread: true, expr }) if i + 1 == count => {
                            rest = Some(Box::new(self.expr_to_pattern(expr)?));
                        }
                        Some(ExprOrSpread { spread: true, expr }) => {
                            self.error(ParseError::InvalidAssignmentTarget { offset: expr.span.start });
                            return None;
                        }
                        Some(ExprOrSpread { expr, .. }) => out.push(Some(self.expr_to_pattern(expr)?)),
                    }
                }
                PatternKind::Array { elems: out, rest }
            }
            ExprKind::Object(props) => {
                let mut out = Vec::new();
                let mut rest = None;
                let count = props.len();
                for (i, prop) in props.into_iter().enumerate() {
                    match prop {
                        Prop::KeyValue { key, value } => {
                            let value = self.expr_to_pattern(value)?;
                            out.push(ObjectPatProp { key, value });
                        }
                        Prop::Shorthand(ident) => {
                            let value = Pattern {
                                span: ident.span,
                                kind: PatternKind::Ident(ident.clone()),
                            };
                            out.push(ObjectPatProp {
                                key: PropName::Ident(ident),
                                value,
                            });
                        }
                        Prop::Spread(expr) if i + 1 == count => {
                            rest = Some(Box::new(self.expr_to_pattern(expr)?));
                        }
                        Prop::Spread(expr) => {
                            self.error(ParseError::InvalidAssignmentTarget { offset: expr.span.start });
                            return None;
                        }
                        Prop::Method { func, .. } => {
                            self.error(ParseError::InvalidAssignmentTarget { offset: func.span.start });
                            return None;
                        }
                    }
                }
                PatternKind::Object { props: out, rest }
            }
            ExprKind::Assign {
                op: AssignOp::Assign,
                target,
                value,
            } => PatternKind::Default {
                target,
                default: value,
            },
            _ => {
                self.error(ParseError::InvalidAssignmentTarget { offset: span.start });
                return None;
            }
        };
        Some(Pattern { kind, span })
    }

    /// Binding pattern: identifier, `[...]` or `{...}`
    pub fn parse_binding_pattern(&mut self) -> Option<Pattern> {
        let start = self.start();
        let kind = match self.kind() {
            TokenKind::Punct(Punct::LBracket) => {
                self.bump();
                let mut elems = Vec::new();
                let mut rest = None;
                while !self.at(Punct::RBracket) {
                    if self.skip(Punct::Comma) {
                        elems.push(None);
                        continue;
                    }
                    if self.skip(Punct::DotDotDot) {
                        rest = Some(Box::new(self.parse_binding_pattern()?));
                        self.skip(Punct::Comma);
                        break;
                    }
                    elems.push(Some(self.parse_binding_element()?));
                    if !self.skip(Punct::Comma) {
                        break;
                    }
                }
                self.expect(Punct::RBracket)?;
                PatternKind::Array { elems, rest }
            }
            TokenKind::Punct(Punct::LBrace) => {
                self.bump();
                let mut props = Vec::new();
                let mut rest = None;
                while !self.at(Punct::RBrace) {
                    if self.skip(Punct::DotDotDot) {
                        rest = Some(Box::new(self.parse_binding_pattern()?));
                        self.skip(Punct::Comma);
                        break;
                    }
                    let key = self.parse_prop_name()?;
                    let value = if self.skip(Punct::Colon) {
                        self.parse_binding_element()?
                    } else {
                        let PropName::Ident(ident) = &key else {
                            self.error_expected("':'");
                            return None;
                        };
                        if Keyword::from_str(&ident.name).is_some() {
                            self.error(ParseError::Invalid {
                                message: format!("'{}' is a reserved word", ident.name),
                                offset: ident.span.start,
                            });
                            return None;
                        }
                        let target = Pattern {
                            span: ident.span,
                            kind: PatternKind::Ident(ident.clone()),
                        };
                        self.parse_default_opt(target)?
                    };
                    props.push(ObjectPatProp { key, value });
                    if !self.skip(Punct::Comma) {
                        break;
                    }
                }
                self.expect(Punct::RBrace)?;
                PatternKind::Object { props, rest }
            }
            _ => PatternKind::Ident(self.parse_binding_ident()?),
        };
        Some(Pattern {
            kind,
            span: self.span_from(start),
        })
    }

    /// Binding pattern with an optional `= default`
    pub fn parse_binding_element(&mut self) -> Option<Pattern> {
        let target = self.parse_binding_pattern()?;
        self.parse_default_opt(target)
    }

    fn parse_default_opt(
        &mut self,
        target: Pattern,
    ) -> Option<Pattern> {
        if !self.skip(Punct::Eq) {
            return Some(target);
        }
        let start = target.span.start;
        let default = self.with_no_in(false, |s| s.parse_assignment())?;
        Some(Pattern {
            kind: PatternKind::Default {
                target: Box::new(target),
                default: Box::new(default),
            },
            span: self.span_from(start),
        })
    }

    /// Property key in object literals, patterns and classes
    pub fn parse_prop_name(&mut self) -> Option<PropName> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::String(value) => {
                self.bump();
                Some(PropName::Str(StrLit {
                    value,
                    span: token.span,
                }))
            }
            TokenKind::Number(n) => {
                self.bump();
                Some(PropName::Num(n, token.span))
            }
            TokenKind::BigInt(digits) => {
                self.bump();
                Some(PropName::Str(StrLit {
                    value: digits,
                    span: token.span,
                }))
            }
            TokenKind::PrivateName(name) => {
                self.bump();
                Some(PropName::Private(Ident {
                    name,
                    span: token.span,
                }))
            }
            TokenKind::Punct(Punct::LBracket) => {
                self.bump();
                let expr = self.with_no_in(false, |s| s.parse_assignment())?;
                self.expect(Punct::RBracket)?;
                Some(PropName::Computed(Box::new(expr)))
            }
            TokenKind::Identifier(_) | TokenKind::Keyword(_) => Some(PropName::Ident(self.parse_ident_name()?)),
            _ => {
                self.error_expected("property name");
                None
            }
        }
    }

    /// Build an expression node spanning from `start` to the last consumed token
    #[inline]
    pub fn finish_expr(
        &self,
        kind: ExprKind,
        start: usize,
    ) -> Expr {
        Expr {
            kind,
            span: self.span_from(start),
        }
    }

    /// Build an expression node with an explicit span
    #[inline]
    pub fn expr_at(
        kind: ExprKind,
        span: Span,
    ) -> Expr {
        Expr { kind, span }
    }
}
