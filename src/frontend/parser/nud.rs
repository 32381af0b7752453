//! Prefix expression parsing (nud - null denotation)

use std::sync::Arc;

use super::ast::*;
use super::state::*;
use super::ParseError;
use crate::frontend::lexer::tokens::*;

type PrefixFn<'a> = fn(&mut ParserState<'a>) -> Option<Expr>;

impl<'a> ParserState<'a> {
    /// Parse a prefix expression at the current position
    pub fn parse_prefix(&mut self) -> Option<Expr> {
        match self.prefix_info() {
            Some(prefix_fn) => prefix_fn(self),
            None => {
                self.error_unexpected();
                None
            }
        }
    }

    /// Get the prefix parser for the current token
    #[inline]
    pub(crate) fn prefix_info(&self) -> Option<PrefixFn<'a>> {
        match self.kind() {
            // Literals
            TokenKind::Number(_)
            | TokenKind::BigInt(_)
            | TokenKind::String(_)
            | TokenKind::Regex { .. }
            | TokenKind::Keyword(Keyword::Null | Keyword::True | Keyword::False) => Some(Self::parse_literal),
            TokenKind::NoSubstitutionTemplate(_) | TokenKind::TemplateHead(_) => Some(Self::parse_template_expr),
            // Identifier, including contextual `async` / `await`
            TokenKind::Identifier(_) => Some(Self::parse_identifier_expr),
            TokenKind::Keyword(Keyword::This) => Some(Self::parse_this),
            TokenKind::Keyword(Keyword::Super) => Some(Self::parse_super),
            TokenKind::Keyword(Keyword::Function) => Some(Self::parse_function_expr),
            TokenKind::Keyword(Keyword::Class) => Some(Self::parse_class_expr),
            TokenKind::Keyword(Keyword::New) => Some(Self::parse_new),
            TokenKind::Keyword(Keyword::Import) => Some(Self::parse_import_expr),
            // Unary operators
            TokenKind::Keyword(Keyword::Typeof | Keyword::Void | Keyword::Delete)
            | TokenKind::Punct(Punct::Bang | Punct::Tilde | Punct::Plus | Punct::Minus) => Some(Self::parse_unary),
            TokenKind::Punct(Punct::PlusPlus | Punct::MinusMinus) => Some(Self::parse_prefix_update),
            // Grouped expression or arrow function
            TokenKind::Punct(Punct::LParen) => Some(Self::parse_paren_or_arrow),
            TokenKind::Punct(Punct::LBracket) => Some(Self::parse_array),
            TokenKind::Punct(Punct::LBrace) => Some(Self::parse_object),
            // `<T>expr` assertion or generic arrow function
            TokenKind::Punct(Punct::Lt) if self.ts => Some(Self::parse_angle_prefix),
            TokenKind::Punct(Punct::At) => Some(Self::parse_decorated_class_expr),
            _ => None,
        }
    }

    fn parse_literal(&mut self) -> Option<Expr> {
        let token = self.current().clone();
        let lit = match token.kind {
            TokenKind::Number(n) => Lit::Number(n),
            TokenKind::BigInt(digits) => Lit::BigInt(digits),
            TokenKind::String(s) => Lit::String(s),
            TokenKind::Regex { pattern, flags } => Lit::Regex { pattern, flags },
            TokenKind::Keyword(Keyword::Null) => Lit::Null,
            TokenKind::Keyword(Keyword::True) => Lit::Bool(true),
            TokenKind::Keyword(Keyword::False) => Lit::Bool(false),
            _ => {
                self.error_expected("literal");
                return None;
            }
        };
        self.bump();
        Some(Self::expr_at(ExprKind::Lit(lit), token.span))
    }

    fn parse_template_expr(&mut self) -> Option<Expr> {
        let template = self.parse_template()?;
        let span = template.span;
        Some(Self::expr_at(ExprKind::Template(template), span))
    }

    fn parse_this(&mut self) -> Option<Expr> {
        let span = self.current().span;
        self.bump();
        Some(Self::expr_at(ExprKind::This, span))
    }

    fn parse_super(&mut self) -> Option<Expr> {
        let span = self.current().span;
        self.bump();
        Some(Self::expr_at(ExprKind::Super, span))
    }

    fn parse_identifier_expr(&mut self) -> Option<Expr> {
        let token = self.current().clone();
        let start = token.span.start;
        let TokenKind::Identifier(name) = &token.kind else {
            self.error_expected("identifier");
            return None;
        };

        if name == "async" && !self.peek().newline_before {
            match &self.peek().kind {
                TokenKind::Keyword(Keyword::Function) => {
                    self.bump();
                    return self.parse_function_expr_from(start, true);
                }
                TokenKind::Identifier(_) if self.peek_nth(2).kind.is_punct(Punct::Arrow) => {
                    self.bump();
                    let param = self.parse_binding_ident()?;
                    return self.parse_arrow_body_from_ident(start, param, true);
                }
                TokenKind::Punct(Punct::LParen) | TokenKind::Punct(Punct::Lt) => {
                    let cp = self.checkpoint();
                    self.bump();
                    if let Some(params) = self.try_parse(|s| s.parse_arrow_head()) {
                        return self.parse_arrow_body(start, params, true);
                    }
                    self.restore(cp);
                }
                _ => {}
            }
        }

        if name == "yield" && self.in_generator {
            self.bump();
            let delegate = self.skip(Punct::Star);
            let ends = self.newline_before()
                || matches!(
                    self.kind(),
                    TokenKind::Eof
                        | TokenKind::Punct(
                            Punct::RParen
                                | Punct::RBracket
                                | Punct::RBrace
                                | Punct::Comma
                                | Punct::Semicolon
                                | Punct::Colon
                        )
                );
            let arg = if ends && !delegate {
                None
            } else {
                Some(Box::new(self.parse_assignment()?))
            };
            return Some(self.finish_expr(ExprKind::Yield { arg, delegate }, start));
        }

        if name == "await" && self.in_async {
            self.bump();
            let arg = self.parse_expression(BP_UNARY)?;
            return Some(self.finish_expr(ExprKind::Await(Box::new(arg)), start));
        }

        let ident = Ident {
            name: name.clone(),
            span: token.span,
        };
        self.bump();
        if self.at(Punct::Arrow) && !self.newline_before() {
            return self.parse_arrow_body_from_ident(start, ident, false);
        }
        Some(Self::expr_at(ExprKind::Ident(ident), token.span))
    }

    fn parse_arrow_body_from_ident(
        &mut self,
        start: usize,
        param: Ident,
        is_async: bool,
    ) -> Option<Expr> {
        self.expect(Punct::Arrow)?;
        let params = vec![Param {
            span: param.span,
            pattern: Pattern {
                span: param.span,
                kind: PatternKind::Ident(param),
            },
            rest: false,
        }];
        self.parse_arrow_body(start, params, is_async)
    }

    /// Arrow function head: `<T>(params): Ret =>`
    fn parse_arrow_head(&mut self) -> Option<Vec<Param>> {
        self.parse_type_params_opt()?;
        let params = self.parse_params(false)?;
        self.parse_return_type_opt()?;
        if !self.at(Punct::Arrow) {
            self.error_expected("'=>'");
            return None;
        }
        if self.newline_before() {
            let offset = self.current().span.start;
            self.error(ParseError::Invalid {
                message: "Line terminator not permitted before arrow".into(),
                offset,
            });
            return None;
        }
        self.bump();
        Some(params)
    }

    /// Arrow function body after `=>`
    fn parse_arrow_body(
        &mut self,
        start: usize,
        params: Vec<Param>,
        is_async: bool,
    ) -> Option<Expr> {
        let body = if self.at(Punct::LBrace) {
            FunctionBody::Block(self.with_context(true, is_async, |s| s.parse_block_body())?)
        } else {
            let no_in = self.no_in;
            let expr = self.with_context(true, is_async, |s| s.with_no_in(no_in, |s| s.parse_assignment()))?;
            FunctionBody::Expr(Box::new(expr))
        };
        let span = self.span_from(start);
        let func = Function {
            name: None,
            params,
            body,
            is_async,
            is_arrow: true,
            is_generator: false,
            span,
        };
        Some(Self::expr_at(ExprKind::Arrow(Arc::new(func)), span))
    }

    fn parse_paren_or_arrow(&mut self) -> Option<Expr> {
        let start = self.start();
        if let Some(params) = self.try_parse(|s| s.parse_arrow_head()) {
            return self.parse_arrow_body(start, params, false);
        }
        self.bump();
        let inner = self.with_no_in(false, |s| s.parse_expression_seq())?;
        self.expect(Punct::RParen)?;
        Some(self.finish_expr(ExprKind::Paren(Box::new(inner)), start))
    }

    fn parse_angle_prefix(&mut self) -> Option<Expr> {
        let start = self.start();
        if let Some(params) = self.try_parse(|s| s.parse_arrow_head()) {
            return self.parse_arrow_body(start, params, false);
        }
        // 类型断言 `<T>expr`
        self.bump();
        self.parse_type()?;
        self.expect(Punct::Gt)?;
        self.strip(self.span_from(start));
        let arg = self.parse_expression(BP_UNARY)?;
        Some(self.finish_expr(ExprKind::TypeCast(Box::new(arg)), start))
    }

    fn parse_array(&mut self) -> Option<Expr> {
        let start = self.start();
        self.expect(Punct::LBracket)?;
        let mut elems = Vec::new();
        self.with_no_in(false, |s| {
            while !s.at(Punct::RBracket) {
                if s.skip(Punct::Comma) {
                    elems.push(None);
                    continue;
                }
                let spread = s.skip(Punct::DotDotDot);
                let expr = s.parse_assignment()?;
                elems.push(Some(ExprOrSpread { spread, expr }));
                if !s.skip(Punct::Comma) {
                    break;
                }
            }
            Some(())
        })?;
        self.expect(Punct::RBracket)?;
        Some(self.finish_expr(ExprKind::Array(elems), start))
    }

    fn parse_object(&mut self) -> Option<Expr> {
        let start = self.start();
        self.expect(Punct::LBrace)?;
        let mut props = Vec::new();
        self.with_no_in(false, |s| {
            while !s.at(Punct::RBrace) {
                props.push(s.parse_object_member()?);
                if !s.skip(Punct::Comma) {
                    break;
                }
            }
            Some(())
        })?;
        self.expect(Punct::RBrace)?;
        Some(self.finish_expr(ExprKind::Object(props), start))
    }

    fn parse_object_member(&mut self) -> Option<Prop> {
        let start = self.start();
        if self.skip(Punct::DotDotDot) {
            return Some(Prop::Spread(self.parse_assignment()?));
        }

        let mut is_async = false;
        let mut is_generator = false;
        let mut kind = MethodKind::Method;
        if self.at_ident("async") && self.is_modifier_followed_by_key() && !self.peek().newline_before {
            self.bump();
            is_async = true;
        } else if (self.at_ident("get") || self.at_ident("set")) && self.is_modifier_followed_by_key() {
            kind = if self.at_ident("get") {
                MethodKind::Getter
            } else {
                MethodKind::Setter
            };
            self.bump();
        }
        if self.skip(Punct::Star) {
            is_generator = true;
        }

        let key = self.parse_prop_name()?;

        if self.at(Punct::LParen) || self.at(Punct::Lt) || is_async || is_generator || kind != MethodKind::Method {
            let func = self.parse_function_rest(start, None, is_async, is_generator)?;
            return Some(Prop::Method {
                key,
                kind,
                func: Arc::new(func),
            });
        }

        if self.skip(Punct::Colon) {
            let value = self.parse_assignment()?;
            return Some(Prop::KeyValue { key, value });
        }

        let PropName::Ident(ident) = key else {
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

        // `{ a = 1 }` only makes sense as a destructuring target
        if self.at(Punct::Eq) {
            self.bump();
            let default = self.parse_assignment()?;
            let target = Pattern {
                span: ident.span,
                kind: PatternKind::Ident(ident.clone()),
            };
            let value = self.finish_expr(
                ExprKind::Assign {
                    op: AssignOp::Assign,
                    target: Box::new(target),
                    value: Box::new(default),
                },
                ident.span.start,
            );
            return Some(Prop::KeyValue {
                key: PropName::Ident(ident),
                value,
            });
        }

        Some(Prop::Shorthand(ident))
    }

    /// `get`/`set`/`async`/`static` is a modifier (not the key itself) when a key follows
    pub(crate) fn is_modifier_followed_by_key(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Identifier(_)
                | TokenKind::Keyword(_)
                | TokenKind::String(_)
                | TokenKind::Number(_)
                | TokenKind::BigInt(_)
                | TokenKind::PrivateName(_)
                | TokenKind::Punct(Punct::LBracket)
                | TokenKind::Punct(Punct::Star)
        )
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        let start = self.start();
        let op = match self.kind() {
            TokenKind::Punct(Punct::Minus) => UnaryOp::Neg,
            TokenKind::Punct(Punct::Plus) => UnaryOp::Pos,
            TokenKind::Punct(Punct::Bang) => UnaryOp::Not,
            TokenKind::Punct(Punct::Tilde) => UnaryOp::BitNot,
            TokenKind::Keyword(Keyword::Typeof) => UnaryOp::Typeof,
            TokenKind::Keyword(Keyword::Void) => UnaryOp::Void,
            TokenKind::Keyword(Keyword::Delete) => UnaryOp::Delete,
            _ => {
                self.error_unexpected();
                return None;
            }
        };
        self.bump();

        let arg = self.parse_expression(BP_UNARY)?;
        Some(self.finish_expr(
            ExprKind::Unary {
                op,
                arg: Box::new(arg),
            },
            start,
        ))
    }

    fn parse_prefix_update(&mut self) -> Option<Expr> {
        let start = self.start();
        let op = if self.at(Punct::PlusPlus) {
            UpdateOp::Inc
        } else {
            UpdateOp::Dec
        };
        self.bump();
        let arg = self.parse_expression(BP_UNARY)?;
        if !is_simple_target(&arg) {
            self.error(ParseError::InvalidAssignmentTarget { offset: arg.span.start });
            return None;
        }
        Some(self.finish_expr(
            ExprKind::Update {
                op,
                prefix: true,
                arg: Box::new(arg),
            },
            start,
        ))
    }

    fn parse_function_expr(&mut self) -> Option<Expr> {
        let start = self.start();
        self.parse_function_expr_from(start, false)
    }

    fn parse_function_expr_from(
        &mut self,
        start: usize,
        is_async: bool,
    ) -> Option<Expr> {
        self.expect_kw(Keyword::Function)?;
        let is_generator = self.skip(Punct::Star);
        let name = if matches!(self.kind(), TokenKind::Identifier(_)) {
            Some(self.parse_binding_ident()?)
        } else {
            None
        };
        let func = self.parse_function_rest(start, name, is_async, is_generator)?;
        let span = func.span;
        Some(Self::expr_at(ExprKind::Function(Arc::new(func)), span))
    }

    fn parse_class_expr(&mut self) -> Option<Expr> {
        let start = self.start();
        let class = self.parse_class(start, false)?;
        let span = class.span;
        Some(Self::expr_at(ExprKind::Class(Arc::new(class)), span))
    }

    fn parse_decorated_class_expr(&mut self) -> Option<Expr> {
        self.parse_decorators()?;
        if !self.at_kw(Keyword::Class) {
            self.error_expected("'class'");
            return None;
        }
        self.parse_class_expr()
    }

    fn parse_new(&mut self) -> Option<Expr> {
        let start = self.start();
        self.expect_kw(Keyword::New)?;
        if self.skip(Punct::Dot) {
            let property = self.parse_ident_name()?;
            return Some(self.finish_expr(
                ExprKind::MetaProperty {
                    meta: "new".into(),
                    property: property.name,
                },
                start,
            ));
        }

        let callee = self.parse_new_callee()?;
        if let Some(span) = self.try_expr_type_args() {
            self.strip(span);
        } else if self.ts && self.at(Punct::Lt) {
            // `new Map<string, number>` without arguments
            let type_start = self.start();
            if self.try_parse(|s| s.parse_type_args()).is_some() {
                self.strip(self.span_from(type_start));
            }
        }
        let args = if self.at(Punct::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Some(self.finish_expr(
            ExprKind::New {
                callee: Box::new(callee),
                args,
            },
            start,
        ))
    }

    /// Member expression without calls, the callee of `new`
    fn parse_new_callee(&mut self) -> Option<Expr> {
        let start = self.start();
        let mut callee = if self.at_kw(Keyword::New) {
            self.parse_new()?
        } else {
            self.parse_prefix()?
        };
        loop {
            if self.skip(Punct::Dot) {
                let property = self.parse_member_name()?;
                callee = self.finish_expr(
                    ExprKind::Member {
                        object: Box::new(callee),
                        property,
                        optional: false,
                    },
                    start,
                );
            } else if self.at(Punct::LBracket) {
                self.bump();
                let index = self.with_no_in(false, |s| s.parse_expression_seq())?;
                self.expect(Punct::RBracket)?;
                callee = self.finish_expr(
                    ExprKind::Member {
                        object: Box::new(callee),
                        property: MemberProp::Computed(Box::new(index)),
                        optional: false,
                    },
                    start,
                );
            } else if matches!(
                self.kind(),
                TokenKind::NoSubstitutionTemplate(_) | TokenKind::TemplateHead(_)
            ) {
                let quasi = self.parse_template()?;
                callee = self.finish_expr(
                    ExprKind::TaggedTemplate {
                        tag: Box::new(callee),
                        quasi,
                    },
                    start,
                );
            } else {
                break;
            }
        }
        Some(callee)
    }

    /// Name after `.`: identifier name or `#private`
    pub(crate) fn parse_member_name(&mut self) -> Option<MemberProp> {
        if let TokenKind::PrivateName(name) = self.kind().clone() {
            let span = self.current().span;
            self.bump();
            return Some(MemberProp::Private(Ident { name, span }));
        }
        Some(MemberProp::Ident(self.parse_ident_name()?))
    }

    fn parse_import_expr(&mut self) -> Option<Expr> {
        let start = self.start();
        self.expect_kw(Keyword::Import)?;
        if self.skip(Punct::Dot) {
            let property = self.parse_ident_name()?;
            return Some(self.finish_expr(
                ExprKind::MetaProperty {
                    meta: "import".into(),
                    property: property.name,
                },
                start,
            ));
        }
        self.expect(Punct::LParen)?;
        let specifier = self.with_no_in(false, |s| s.parse_assignment())?;
        // import options (`{ with: {...} }`) are accepted and ignored
        if self.skip(Punct::Comma) && !self.at(Punct::RParen) {
            self.with_no_in(false, |s| s.parse_assignment())?;
            self.skip(Punct::Comma);
        }
        self.expect(Punct::RParen)?;
        Some(self.finish_expr(ExprKind::Import(Box::new(specifier)), start))
    }
}

/// Identifier or member access: valid operand of `++`, `--` and compound assignment
pub(crate) fn is_simple_target(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Ident(_) | ExprKind::Member { optional: false, .. } => true,
        ExprKind::Paren(inner) | ExprKind::TypeCast(inner) => is_simple_target(inner),
        _ => false,
    }
}
