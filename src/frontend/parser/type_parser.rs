//! Type annotation parsing
//!
//! Types carry no runtime meaning, so they are parsed for their extent only:
//! the parser consumes the tokens and records the covered span for erasure.

use super::state::*;
use crate::frontend::lexer::tokens::*;
use crate::util::span::Span;

impl<'a> ParserState<'a> {
    /// Parse an optional `: Type` annotation and record it for stripping
    pub fn parse_type_annotation_opt(&mut self) -> Option<()> {
        if !self.ts || !self.at(Punct::Colon) {
            return Some(());
        }
        let start = self.start();
        self.bump();
        self.parse_type()?;
        self.strip(self.span_from(start));
        Some(())
    }

    /// Parse an optional return type, including type predicates
    /// (`x is T`, `asserts x`, `asserts x is T`)
    pub fn parse_return_type_opt(&mut self) -> Option<()> {
        if !self.ts || !self.at(Punct::Colon) {
            return Some(());
        }
        let start = self.start();
        self.bump();
        self.parse_return_type()?;
        self.strip(self.span_from(start));
        Some(())
    }

    fn parse_return_type(&mut self) -> Option<()> {
        if self.at_ident("asserts")
            && matches!(
                self.peek().kind,
                TokenKind::Identifier(_) | TokenKind::Keyword(Keyword::This)
            )
            && !self.peek().newline_before
        {
            self.bump();
            self.bump();
            if self.skip_ident("is") {
                self.parse_type()?;
            }
            return Some(());
        }
        if matches!(
            self.kind(),
            TokenKind::Identifier(_) | TokenKind::Keyword(Keyword::This)
        ) && self.peek().kind.is_ident("is")
            && !self.peek().newline_before
        {
            self.bump();
            self.bump();
            return self.parse_type();
        }
        self.parse_type()
    }

    /// Parse optional type parameters `<T extends U = V, ...>` and record them for stripping
    pub fn parse_type_params_opt(&mut self) -> Option<()> {
        if !self.ts || !self.at(Punct::Lt) {
            return Some(());
        }
        let start = self.start();
        self.parse_type_params()?;
        self.strip(self.span_from(start));
        Some(())
    }

    fn parse_type_params(&mut self) -> Option<()> {
        self.expect(Punct::Lt)?;
        while !self.at(Punct::Gt) && !self.at_end() {
            // 修饰符: in / out / const
            while (self.at_kw(Keyword::In) || self.at_ident("out") || self.at_kw(Keyword::Const))
                && matches!(self.peek().kind, TokenKind::Identifier(_))
            {
                self.bump();
            }
            self.parse_binding_ident()?;
            if self.skip_kw(Keyword::Extends) {
                self.parse_type()?;
            }
            if self.skip(Punct::Eq) {
                self.parse_type()?;
            }
            if !self.skip(Punct::Comma) {
                break;
            }
        }
        self.expect(Punct::Gt)
    }

    /// Parse type arguments `<A, B>`
    pub fn parse_type_args(&mut self) -> Option<()> {
        self.expect(Punct::Lt)?;
        while !self.at(Punct::Gt) && !self.at_end() {
            self.parse_type()?;
            if !self.skip(Punct::Comma) {
                break;
            }
        }
        self.expect(Punct::Gt)
    }

    /// Speculatively parse `<...>` type arguments in expression position
    ///
    /// Succeeds only when the arguments are followed by a call, a template
    /// literal or `new` arguments, so `a < b` stays a comparison.
    pub fn try_expr_type_args(&mut self) -> Option<Span> {
        if !self.ts || !self.at(Punct::Lt) {
            return None;
        }
        self.try_parse(|s| {
            let start = s.start();
            s.parse_type_args()?;
            let span = s.span_from(start);
            match s.kind() {
                TokenKind::Punct(Punct::LParen)
                | TokenKind::NoSubstitutionTemplate(_)
                | TokenKind::TemplateHead(_) => Some(span),
                _ => None,
            }
        })
    }

    /// Parse a type
    pub fn parse_type(&mut self) -> Option<()> {
        self.parse_type_inner(true)
    }

    fn parse_type_inner(
        &mut self,
        allow_conditional: bool,
    ) -> Option<()> {
        // 函数类型 / 构造器类型
        if self.at_ident("abstract") && self.peek().kind.is_keyword(Keyword::New) {
            self.bump();
        }
        if self.skip_kw(Keyword::New) {
            if self.at(Punct::Lt) {
                self.parse_type_params()?;
            }
            return self.parse_function_type_rest();
        }
        if self.at(Punct::Lt) {
            self.parse_type_params()?;
            return self.parse_function_type_rest();
        }
        if self.at(Punct::LParen) && self.is_start_of_function_type() {
            return self.parse_function_type_rest();
        }

        self.parse_union_type()?;

        if allow_conditional && !self.newline_before() && self.at_kw(Keyword::Extends) {
            self.bump();
            self.parse_type_inner(false)?;
            self.expect(Punct::Question)?;
            self.parse_type()?;
            self.expect(Punct::Colon)?;
            self.parse_type()?;
        }
        Some(())
    }

    /// `(params) => Ret`, with the current token at `(`
    fn parse_function_type_rest(&mut self) -> Option<()> {
        self.skip_balanced(Punct::LParen, Punct::RParen)?;
        self.expect(Punct::Arrow)?;
        self.parse_return_type()
    }

    fn is_start_of_function_type(&mut self) -> bool {
        if matches!(
            self.peek().kind,
            TokenKind::Punct(Punct::RParen) | TokenKind::Punct(Punct::DotDotDot)
        ) {
            return true;
        }
        let cp = self.checkpoint();
        let is_fn = self.skip_balanced(Punct::LParen, Punct::RParen).is_some() && self.at(Punct::Arrow);
        self.restore(cp);
        is_fn
    }

    fn parse_union_type(&mut self) -> Option<()> {
        self.skip(Punct::Pipe);
        self.parse_intersection_type()?;
        while self.skip(Punct::Pipe) {
            self.parse_intersection_type()?;
        }
        Some(())
    }

    fn parse_intersection_type(&mut self) -> Option<()> {
        self.skip(Punct::Amp);
        self.parse_type_operator()?;
        while self.skip(Punct::Amp) {
            self.parse_type_operator()?;
        }
        Some(())
    }

    fn parse_type_operator(&mut self) -> Option<()> {
        if (self.at_ident("keyof") || self.at_ident("unique") || self.at_ident("readonly"))
            && !matches!(
                self.peek().kind,
                TokenKind::Punct(
                    Punct::Comma
                        | Punct::RParen
                        | Punct::RBracket
                        | Punct::Gt
                        | Punct::Semicolon
                        | Punct::Eq
                        | Punct::Pipe
                        | Punct::Amp
                )
            )
        {
            self.bump();
            return self.parse_type_operator();
        }
        if self.at_ident("infer") && matches!(self.peek().kind, TokenKind::Identifier(_)) {
            self.bump();
            self.bump();
            // `infer U extends X` 只在条件类型之外合法
            let cp = self.checkpoint();
            if self.skip_kw(Keyword::Extends)
                && (self.parse_type_inner(false).is_none() || self.at(Punct::Question))
            {
                self.restore(cp);
            }
            return Some(());
        }
        self.parse_postfix_type()
    }

    fn parse_postfix_type(&mut self) -> Option<()> {
        self.parse_primary_type()?;
        while self.at(Punct::LBracket) && !self.newline_before() {
            self.bump();
            if !self.at(Punct::RBracket) {
                self.parse_type()?;
            }
            self.expect(Punct::RBracket)?;
        }
        Some(())
    }

    fn parse_primary_type(&mut self) -> Option<()> {
        match self.kind().clone() {
            TokenKind::Punct(Punct::LParen) => {
                self.bump();
                self.parse_type()?;
                self.expect(Punct::RParen)
            }
            TokenKind::Punct(Punct::LBrace) => self.skip_balanced(Punct::LBrace, Punct::RBrace),
            TokenKind::Punct(Punct::LBracket) => self.skip_balanced(Punct::LBracket, Punct::RBracket),
            TokenKind::Punct(Punct::Minus) => {
                self.bump();
                match self.kind() {
                    TokenKind::Number(_) | TokenKind::BigInt(_) => {
                        self.bump();
                        Some(())
                    }
                    _ => {
                        self.error_expected("number literal type");
                        None
                    }
                }
            }
            TokenKind::Number(_)
            | TokenKind::BigInt(_)
            | TokenKind::String(_)
            | TokenKind::NoSubstitutionTemplate(_) => {
                self.bump();
                Some(())
            }
            TokenKind::TemplateHead(_) => {
                self.bump();
                loop {
                    self.parse_type()?;
                    match self.kind() {
                        TokenKind::TemplateMiddle(_) => self.bump(),
                        TokenKind::TemplateTail(_) => {
                            self.bump();
                            return Some(());
                        }
                        _ => {
                            self.error_expected("template literal type");
                            return None;
                        }
                    }
                }
            }
            TokenKind::Keyword(Keyword::Typeof) => {
                self.bump();
                if self.at_kw(Keyword::Import) {
                    self.parse_import_type()?;
                } else {
                    self.parse_entity_name()?;
                }
                if self.at(Punct::Lt) && !self.newline_before() {
                    self.parse_type_args()?;
                }
                Some(())
            }
            TokenKind::Keyword(Keyword::Import) => {
                self.parse_import_type()?;
                if self.at(Punct::Lt) {
                    self.parse_type_args()?;
                }
                Some(())
            }
            TokenKind::Identifier(_) | TokenKind::Keyword(_) => {
                self.parse_entity_name()?;
                if self.at(Punct::Lt) && !self.newline_before() {
                    self.parse_type_args()?;
                }
                Some(())
            }
            _ => {
                self.error_expected("type");
                None
            }
        }
    }

    /// `import("mod").A.B`
    fn parse_import_type(&mut self) -> Option<()> {
        self.expect_kw(Keyword::Import)?;
        self.skip_balanced(Punct::LParen, Punct::RParen)?;
        while self.skip(Punct::Dot) {
            self.parse_ident_name()?;
        }
        Some(())
    }

    /// `A.B.C`
    fn parse_entity_name(&mut self) -> Option<()> {
        self.parse_ident_name()?;
        while self.at(Punct::Dot) {
            self.bump();
            self.parse_ident_name()?;
        }
        Some(())
    }

    /// Skip a bracketed group, including nested groups of any kind
    pub fn skip_balanced(
        &mut self,
        open: Punct,
        close: Punct,
    ) -> Option<()> {
        self.expect(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.kind() {
                TokenKind::Eof => {
                    self.error_expected(&format!("'{}'", close.as_str()));
                    return None;
                }
                TokenKind::Punct(p) if *p == open => depth += 1,
                TokenKind::Punct(p) if *p == close => depth -= 1,
                _ => {}
            }
            self.bump();
        }
        Some(())
    }

    /// Type-only tail of an interface: `<T> extends A, B { ... }`
    pub fn parse_interface_rest(&mut self) -> Option<()> {
        if self.at(Punct::Lt) {
            self.parse_type_params()?;
        }
        if self.skip_kw(Keyword::Extends) {
            loop {
                self.parse_postfix_type()?;
                if !self.skip(Punct::Comma) {
                    break;
                }
            }
        }
        self.skip_balanced(Punct::LBrace, Punct::RBrace)
    }

    /// Type-only tail of an alias: `<T> = Type`
    pub fn parse_type_alias_rest(&mut self) -> Option<()> {
        if self.at(Punct::Lt) {
            self.parse_type_params()?;
        }
        self.expect(Punct::Eq)?;
        self.parse_type()
    }

    /// `implements A, B<C>` clause of a class, recorded for stripping
    pub fn parse_implements_opt(&mut self) -> Option<()> {
        if !self.ts || !self.at_ident("implements") {
            return Some(());
        }
        let start = self.start();
        self.bump();
        loop {
            self.parse_postfix_type()?;
            if !self.skip(Punct::Comma) {
                break;
            }
        }
        self.strip(self.span_from(start));
        Some(())
    }
}
