//! Function, class and enum parsing

use std::sync::Arc;

use super::ast::*;
use super::state::*;
use crate::frontend::lexer::tokens::*;

/// TypeScript-only class member and parameter modifiers
const TS_MODIFIERS: &[&str] = &[
    "public",
    "private",
    "protected",
    "readonly",
    "abstract",
    "override",
    "declare",
    "accessor",
];

/// Modifiers that turn a constructor parameter into a parameter property
const PARAM_PROPERTY_MODIFIERS: &[&str] = &["public", "private", "protected", "readonly", "override"];

impl<'a> ParserState<'a> {
    /// Parse a parameter list, consuming both parentheses
    pub fn parse_params(
        &mut self,
        is_constructor: bool,
    ) -> Option<Vec<Param>> {
        self.expect(Punct::LParen)?;
        let mut params = Vec::new();
        while !self.at(Punct::RParen) {
            let start = self.start();

            // `this: T` is a type-only pseudo parameter
            if self.ts && self.at_kw(Keyword::This) && self.peek().kind.is_punct(Punct::Colon) {
                self.bump();
                self.parse_type_annotation_opt()?;
                self.skip(Punct::Comma);
                self.strip(self.span_from(start));
                continue;
            }

            if self.at(Punct::At) {
                self.parse_decorators()?;
            }

            if self.ts {
                while let TokenKind::Identifier(name) = self.kind() {
                    if !PARAM_PROPERTY_MODIFIERS.contains(&name.as_str()) || !self.is_modifier_followed_by_key() {
                        break;
                    }
                    let span = self.current().span;
                    if is_constructor {
                        self.unerasable(span, "parameter property");
                    } else {
                        self.error_unexpected();
                        return None;
                    }
                    self.bump();
                }
            }

            let rest = self.skip(Punct::DotDotDot);
            let mut pattern = self.parse_binding_pattern()?;
            if self.ts && self.at(Punct::Question) {
                let span = self.current().span;
                self.bump();
                self.strip(span);
            }
            self.parse_type_annotation_opt()?;
            if self.skip(Punct::Eq) {
                let default = self.with_no_in(false, |s| s.parse_assignment())?;
                pattern = Pattern {
                    span: self.span_from(pattern.span.start),
                    kind: PatternKind::Default {
                        target: Box::new(pattern),
                        default: Box::new(default),
                    },
                };
            }
            params.push(Param {
                pattern,
                rest,
                span: self.span_from(start),
            });
            if !self.skip(Punct::Comma) {
                break;
            }
        }
        self.expect(Punct::RParen)?;
        Some(params)
    }

    /// Parse the rest of a function after its name: `<T>(params): Ret { body }`
    pub fn parse_function_rest(
        &mut self,
        start: usize,
        name: Option<Ident>,
        is_async: bool,
        is_generator: bool,
    ) -> Option<Function> {
        self.parse_function_rest_with(start, name, is_async, is_generator, false)
    }

    fn parse_function_rest_with(
        &mut self,
        start: usize,
        name: Option<Ident>,
        is_async: bool,
        is_generator: bool,
        is_constructor: bool,
    ) -> Option<Function> {
        self.parse_type_params_opt()?;
        let params = self.with_context(true, is_async, |s| s.parse_params(is_constructor))?;
        self.parse_return_type_opt()?;
        let body = if self.at(Punct::LBrace) {
            FunctionBody::Block(
                self.with_context(true, is_async, |s| s.with_generator(is_generator, |s| s.parse_block_body()))?,
            )
        } else if self.ts {
            // overload signature or abstract/ambient declaration
            FunctionBody::None
        } else {
            self.error_expected("'{'");
            return None;
        };
        Some(Function {
            name,
            params,
            body,
            is_async,
            is_arrow: false,
            is_generator,
            span: self.span_from(start),
        })
    }

    /// `function name(...) {...}` / `async function ...`, with the current token at `async` or `function`
    pub fn parse_function_decl(&mut self) -> Option<Function> {
        let start = self.start();
        let is_async = self.skip_ident("async");
        self.expect_kw(Keyword::Function)?;
        let is_generator = self.skip(Punct::Star);
        let name = if matches!(self.kind(), TokenKind::Identifier(_)) {
            Some(self.parse_binding_ident()?)
        } else {
            None
        };
        self.parse_function_rest(start, name, is_async, is_generator)
    }

    /// Parse one or more `@decorator` entries; decorators have runtime
    /// semantics and are recorded as unerasable
    pub fn parse_decorators(&mut self) -> Option<()> {
        while self.at(Punct::At) {
            let start = self.start();
            self.bump();
            self.parse_expression(BP_CALL)?;
            self.unerasable(self.span_from(start), "decorator");
        }
        Some(())
    }

    /// Parse a class, with the current token at `class`
    pub fn parse_class(
        &mut self,
        start: usize,
        require_name: bool,
    ) -> Option<Class> {
        self.expect_kw(Keyword::Class)?;
        let name = if matches!(self.kind(), TokenKind::Identifier(n) if n != "implements") {
            Some(self.parse_binding_ident()?)
        } else if require_name {
            self.error_expected("class name");
            return None;
        } else {
            None
        };
        self.parse_type_params_opt()?;

        let super_class = if self.skip_kw(Keyword::Extends) {
            let expr = self.parse_expression(BP_CALL)?;
            if self.ts && self.at(Punct::Lt) {
                let type_start = self.start();
                self.parse_type_args()?;
                self.strip(self.span_from(type_start));
            }
            Some(Box::new(expr))
        } else {
            None
        };
        self.parse_implements_opt()?;

        self.expect(Punct::LBrace)?;
        let mut members = Vec::new();
        while !self.at(Punct::RBrace) && !self.at_end() {
            if self.skip(Punct::Semicolon) {
                continue;
            }
            if let Some(member) = self.parse_class_member()? {
                members.push(member);
            }
        }
        self.expect(Punct::RBrace)?;

        Some(Class {
            name,
            super_class,
            members,
            span: self.span_from(start),
        })
    }

    /// Parse one class member; type-only members yield `None` after being recorded for stripping
    fn parse_class_member(&mut self) -> Option<Option<ClassMember>> {
        let start = self.start();
        if self.at(Punct::At) {
            self.parse_decorators()?;
        }

        let mut is_static = false;
        let mut type_only = false;
        loop {
            let TokenKind::Identifier(name) = self.kind().clone() else {
                break;
            };
            if name == "static" && (self.is_modifier_followed_by_key() || self.peek().kind.is_punct(Punct::LBrace)) {
                if self.peek().kind.is_punct(Punct::LBrace) {
                    self.bump();
                    let body = self.with_context(true, false, |s| s.parse_block_body())?;
                    return Some(Some(ClassMember::StaticBlock(body)));
                }
                is_static = true;
                self.bump();
            } else if self.ts && TS_MODIFIERS.contains(&name.as_str()) && self.is_modifier_followed_by_key() {
                if name == "declare" || name == "abstract" {
                    type_only = true;
                }
                let span = self.current().span;
                self.bump();
                self.strip(span);
            } else {
                break;
            }
        }

        // index signature `[key: string]: T;`
        if self.ts
            && self.at(Punct::LBracket)
            && matches!(self.peek().kind, TokenKind::Identifier(_))
            && self.peek_nth(2).kind.is_punct(Punct::Colon)
        {
            self.skip_balanced(Punct::LBracket, Punct::RBracket)?;
            self.parse_type_annotation_opt()?;
            self.consume_semicolon()?;
            self.strip(self.span_from(start));
            return Some(None);
        }

        let mut is_async = false;
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
        let is_generator = self.skip(Punct::Star);

        let key = self.parse_prop_name()?;
        if self.ts && (self.at(Punct::Question) || self.at(Punct::Bang)) {
            let span = self.current().span;
            self.bump();
            self.strip(span);
        }

        if self.at(Punct::LParen) || self.at(Punct::Lt) {
            let is_constructor = !is_static
                && match &key {
                    PropName::Ident(id) => id.name == "constructor",
                    PropName::Str(s) => s.value == "constructor",
                    _ => false,
                };
            let func = self.parse_function_rest_with(start, None, is_async, is_generator, is_constructor)?;
            if matches!(func.body, FunctionBody::None) {
                self.skip(Punct::Semicolon);
                self.strip(self.span_from(start));
                return Some(None);
            }
            if type_only {
                self.strip(self.span_from(start));
                return Some(None);
            }
            let func = Arc::new(func);
            if is_constructor {
                return Some(Some(ClassMember::Constructor(func)));
            }
            return Some(Some(ClassMember::Method {
                key,
                kind,
                func,
                is_static,
            }));
        }

        self.parse_type_annotation_opt()?;
        let value = if self.skip(Punct::Eq) {
            Some(self.with_context(true, false, |s| s.parse_assignment())?)
        } else {
            None
        };
        self.consume_semicolon()?;
        let span = self.span_from(start);
        if type_only {
            self.strip(span);
            return Some(None);
        }
        Some(Some(ClassMember::Field {
            key,
            value,
            is_static,
            span,
        }))
    }

    /// Parse `enum Name { ... }`, with the current token at `enum`
    pub fn parse_enum(
        &mut self,
        is_const: bool,
    ) -> Option<EnumDecl> {
        self.expect_kw(Keyword::Enum)?;
        let name = self.parse_binding_ident()?;
        self.expect(Punct::LBrace)?;
        let mut members = Vec::new();
        while !self.at(Punct::RBrace) {
            let span = self.current().span;
            let member_name = match self.kind().clone() {
                TokenKind::String(s) => {
                    self.bump();
                    s
                }
                _ => self.parse_ident_name()?.name,
            };
            let init = if self.skip(Punct::Eq) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            members.push(EnumMember {
                name: member_name,
                span,
                init,
            });
            if !self.skip(Punct::Comma) {
                break;
            }
        }
        self.expect(Punct::RBrace)?;
        Some(EnumDecl {
            name,
            members,
            is_const,
        })
    }
}
