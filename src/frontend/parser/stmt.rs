//! Statement parsing

use std::sync::Arc;

use super::ast::*;
use super::state::*;
use super::ParseError;
use crate::frontend::lexer::tokens::*;

impl<'a> ParserState<'a> {
    /// Parse statements until end of input
    pub fn parse_statements(&mut self) -> Vec<Stmt> {
        let mut body = Vec::new();
        while !self.at_end() {
            match self.parse_stmt() {
                Some(stmt) => body.push(stmt),
                None => break,
            }
        }
        body
    }

    /// Parse `{ statements }`
    pub fn parse_block_body(&mut self) -> Option<Vec<Stmt>> {
        self.expect(Punct::LBrace)?;
        let mut body = Vec::new();
        while !self.at(Punct::RBrace) {
            if self.at_end() {
                self.error_expected("'}'");
                return None;
            }
            body.push(self.parse_stmt()?);
        }
        self.expect(Punct::RBrace)?;
        Some(body)
    }

    /// Parse a statement
    pub fn parse_stmt(&mut self) -> Option<Stmt> {
        let start = self.start();
        let kind = match self.kind().clone() {
            TokenKind::Punct(Punct::LBrace) => StmtKind::Block(self.parse_block_body()?),
            TokenKind::Punct(Punct::Semicolon) => {
                self.bump();
                StmtKind::Empty
            }
            TokenKind::Punct(Punct::At) => {
                self.parse_decorators()?;
                return self.parse_stmt();
            }
            TokenKind::Keyword(Keyword::Var) => {
                self.bump();
                let decl = self.parse_var_declarators(VarKind::Var)?;
                self.consume_semicolon()?;
                StmtKind::Var(decl)
            }
            TokenKind::Keyword(Keyword::Const) => {
                if self.ts && self.peek().kind.is_keyword(Keyword::Enum) {
                    self.bump();
                    StmtKind::Enum(self.parse_enum(true)?)
                } else {
                    self.bump();
                    let decl = self.parse_var_declarators(VarKind::Const)?;
                    self.consume_semicolon()?;
                    StmtKind::Var(decl)
                }
            }
            TokenKind::Identifier(ref name) if name == "let" && self.is_let_declaration() => {
                self.bump();
                let decl = self.parse_var_declarators(VarKind::Let)?;
                self.consume_semicolon()?;
                StmtKind::Var(decl)
            }
            TokenKind::Keyword(Keyword::Function) => return self.parse_function_stmt(),
            TokenKind::Identifier(ref name)
                if name == "async"
                    && self.peek().kind.is_keyword(Keyword::Function)
                    && !self.peek().newline_before =>
            {
                return self.parse_function_stmt();
            }
            TokenKind::Keyword(Keyword::Class) => StmtKind::Class(Arc::new(self.parse_class(start, true)?)),
            TokenKind::Keyword(Keyword::Enum) if self.ts => StmtKind::Enum(self.parse_enum(false)?),
            TokenKind::Keyword(Keyword::If) => self.parse_if()?,
            TokenKind::Keyword(Keyword::For) => self.parse_for()?,
            TokenKind::Keyword(Keyword::While) => {
                self.bump();
                self.expect(Punct::LParen)?;
                let test = self.parse_expression_seq()?;
                self.expect(Punct::RParen)?;
                let body = Box::new(self.parse_stmt()?);
                StmtKind::While { test, body }
            }
            TokenKind::Keyword(Keyword::Do) => {
                self.bump();
                let body = Box::new(self.parse_stmt()?);
                self.expect_kw(Keyword::While)?;
                self.expect(Punct::LParen)?;
                let test = self.parse_expression_seq()?;
                self.expect(Punct::RParen)?;
                self.skip(Punct::Semicolon);
                StmtKind::DoWhile { body, test }
            }
            TokenKind::Keyword(Keyword::Return) => {
                if !self.in_function {
                    self.error(ParseError::IllegalReturn { offset: start });
                    return None;
                }
                self.bump();
                let arg = if self.at(Punct::Semicolon) || self.at(Punct::RBrace) || self.at_end() || self.newline_before() {
                    None
                } else {
                    Some(self.parse_expression_seq()?)
                };
                self.consume_semicolon()?;
                StmtKind::Return(arg)
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.bump();
                let label = self.parse_label_opt()?;
                self.consume_semicolon()?;
                StmtKind::Break(label)
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.bump();
                let label = self.parse_label_opt()?;
                self.consume_semicolon()?;
                StmtKind::Continue(label)
            }
            TokenKind::Keyword(Keyword::Throw) => {
                self.bump();
                if self.newline_before() {
                    self.error(ParseError::Invalid {
                        message: "Illegal newline after throw".into(),
                        offset: self.start(),
                    });
                    return None;
                }
                let arg = self.parse_expression_seq()?;
                self.consume_semicolon()?;
                StmtKind::Throw(arg)
            }
            TokenKind::Keyword(Keyword::Try) => self.parse_try()?,
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch()?,
            TokenKind::Keyword(Keyword::Debugger) => {
                self.bump();
                self.consume_semicolon()?;
                StmtKind::Debugger
            }
            TokenKind::Keyword(Keyword::Import)
                if !matches!(self.peek().kind, TokenKind::Punct(Punct::LParen | Punct::Dot)) =>
            {
                return self.parse_import();
            }
            TokenKind::Keyword(Keyword::Export) => return self.parse_export(),
            TokenKind::Identifier(ref name) if self.ts && self.is_ts_declaration_start(name) => {
                return self.parse_ts_declaration();
            }
            TokenKind::Identifier(_) if self.peek().kind.is_punct(Punct::Colon) => {
                let label = self.parse_binding_ident()?;
                self.bump();
                let body = Box::new(self.parse_stmt()?);
                StmtKind::Labeled { label, body }
            }
            _ => {
                let expr = self.parse_expression_seq()?;
                self.consume_semicolon()?;
                StmtKind::Expr(expr)
            }
        };
        Some(Stmt {
            kind,
            span: self.span_from(start),
        })
    }

    /// Function declaration; a body-less overload signature is stripped
    fn parse_function_stmt(&mut self) -> Option<Stmt> {
        let start = self.start();
        let func = self.parse_function_decl()?;
        let body_less = matches!(func.body, FunctionBody::None);
        if body_less {
            self.skip(Punct::Semicolon);
            self.strip(self.span_from(start));
        }
        Some(Stmt {
            kind: StmtKind::Function(Arc::new(func)),
            span: self.span_from(start),
        })
    }

    /// `let` starts a declaration (rather than naming a variable)
    fn is_let_declaration(&self) -> bool {
        match &self.peek().kind {
            TokenKind::Identifier(_) => true,
            TokenKind::Punct(Punct::LBracket | Punct::LBrace) => true,
            _ => false,
        }
    }

    fn parse_label_opt(&mut self) -> Option<Option<Ident>> {
        if matches!(self.kind(), TokenKind::Identifier(_)) && !self.newline_before() {
            return Some(Some(self.parse_binding_ident()?));
        }
        Some(None)
    }

    /// Parse declarators after `var`/`let`/`const`
    pub fn parse_var_declarators(
        &mut self,
        kind: VarKind,
    ) -> Option<VarDecl> {
        let mut decls = Vec::new();
        loop {
            let start = self.start();
            let pattern = self.parse_binding_pattern()?;
            if self.ts && self.at(Punct::Bang) {
                let span = self.current().span;
                self.bump();
                self.strip(span);
            }
            self.parse_type_annotation_opt()?;
            let init = if self.skip(Punct::Eq) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            decls.push(VarDeclarator {
                pattern,
                init,
                span: self.span_from(start),
            });
            if !self.skip(Punct::Comma) {
                break;
            }
        }
        Some(VarDecl { kind, decls })
    }

    fn parse_if(&mut self) -> Option<StmtKind> {
        self.expect_kw(Keyword::If)?;
        self.expect(Punct::LParen)?;
        let test = self.parse_expression_seq()?;
        self.expect(Punct::RParen)?;
        let cons = Box::new(self.parse_stmt()?);
        let alt = if self.skip_kw(Keyword::Else) {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Some(StmtKind::If { test, cons, alt })
    }

    fn parse_for(&mut self) -> Option<StmtKind> {
        self.expect_kw(Keyword::For)?;
        let is_await = self.in_async && self.skip_ident("await");
        self.expect(Punct::LParen)?;

        let var_kind = match self.kind() {
            TokenKind::Keyword(Keyword::Var) => Some(VarKind::Var),
            TokenKind::Keyword(Keyword::Const) => Some(VarKind::Const),
            TokenKind::Identifier(name) if name == "let" && self.is_let_declaration() => Some(VarKind::Let),
            _ => None,
        };

        let init = if self.at(Punct::Semicolon) {
            None
        } else if let Some(kind) = var_kind {
            self.bump();
            let mut decl = self.with_no_in(true, |s| s.parse_var_declarators(kind))?;
            if decl.decls.len() == 1 && decl.decls[0].init.is_none() && (self.at_ident("of") || self.at_kw(Keyword::In)) {
                let pattern = decl.decls.remove(0).pattern;
                return self.parse_for_in_of(ForHead::Var(kind, pattern), is_await);
            }
            Some(ForInit::Var(decl))
        } else {
            let expr = self.with_no_in(true, |s| s.parse_expression_seq())?;
            if self.at_ident("of") || self.at_kw(Keyword::In) {
                let pattern = self.expr_to_pattern(expr)?;
                return self.parse_for_in_of(ForHead::Pattern(pattern), is_await);
            }
            Some(ForInit::Expr(expr))
        };

        self.expect(Punct::Semicolon)?;
        let test = if self.at(Punct::Semicolon) {
            None
        } else {
            Some(self.parse_expression_seq()?)
        };
        self.expect(Punct::Semicolon)?;
        let update = if self.at(Punct::RParen) {
            None
        } else {
            Some(self.parse_expression_seq()?)
        };
        self.expect(Punct::RParen)?;
        let body = Box::new(self.parse_stmt()?);
        Some(StmtKind::For {
            init,
            test,
            update,
            body,
        })
    }

    fn parse_for_in_of(
        &mut self,
        left: ForHead,
        is_await: bool,
    ) -> Option<StmtKind> {
        if self.skip_ident("of") {
            let right = self.parse_assignment()?;
            self.expect(Punct::RParen)?;
            let body = Box::new(self.parse_stmt()?);
            return Some(StmtKind::ForOf {
                left,
                right,
                body,
                is_await,
            });
        }
        self.expect_kw(Keyword::In)?;
        let right = self.parse_expression_seq()?;
        self.expect(Punct::RParen)?;
        let body = Box::new(self.parse_stmt()?);
        Some(StmtKind::ForIn { left, right, body })
    }

    fn parse_try(&mut self) -> Option<StmtKind> {
        self.expect_kw(Keyword::Try)?;
        let block = self.parse_block_body()?;
        let handler = if self.skip_kw(Keyword::Catch) {
            let param = if self.skip(Punct::LParen) {
                let pattern = self.parse_binding_pattern()?;
                self.parse_type_annotation_opt()?;
                self.expect(Punct::RParen)?;
                Some(pattern)
            } else {
                None
            };
            let body = self.parse_block_body()?;
            Some(CatchClause { param, body })
        } else {
            None
        };
        let finalizer = if self.skip_kw(Keyword::Finally) {
            Some(self.parse_block_body()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            self.error_expected("'catch' or 'finally'");
            return None;
        }
        Some(StmtKind::Try {
            block,
            handler,
            finalizer,
        })
    }

    fn parse_switch(&mut self) -> Option<StmtKind> {
        self.expect_kw(Keyword::Switch)?;
        self.expect(Punct::LParen)?;
        let discriminant = self.parse_expression_seq()?;
        self.expect(Punct::RParen)?;
        self.expect(Punct::LBrace)?;
        let mut cases = Vec::new();
        while !self.at(Punct::RBrace) {
            let test = if self.skip_kw(Keyword::Default) {
                None
            } else {
                self.expect_kw(Keyword::Case)?;
                Some(self.parse_expression_seq()?)
            };
            self.expect(Punct::Colon)?;
            let mut body = Vec::new();
            while !self.at_kw(Keyword::Case) && !self.at_kw(Keyword::Default) && !self.at(Punct::RBrace) {
                if self.at_end() {
                    self.error_expected("'}'");
                    return None;
                }
                body.push(self.parse_stmt()?);
            }
            cases.push(SwitchCase { test, body });
        }
        self.expect(Punct::RBrace)?;
        Some(StmtKind::Switch { discriminant, cases })
    }

    /// Parse an import declaration
    fn parse_import(&mut self) -> Option<Stmt> {
        let start = self.start();
        self.expect_kw(Keyword::Import)?;

        let mut type_only = false;
        if self.ts
            && self.at_ident("type")
            && matches!(
                self.peek().kind,
                TokenKind::Identifier(_) | TokenKind::Punct(Punct::LBrace | Punct::Star)
            )
            && !self.peek().kind.is_ident("from")
        {
            self.bump();
            type_only = true;
        }

        // `import x = require("m")` / `import x = A.B`
        if self.ts && matches!(self.kind(), TokenKind::Identifier(_)) && self.peek().kind.is_punct(Punct::Eq) {
            self.bump();
            self.bump();
            self.parse_expression(BP_ASSIGN)?;
            self.consume_semicolon()?;
            let span = self.span_from(start);
            if type_only {
                self.strip(span);
            } else {
                self.unerasable(span, "import assignment");
            }
            return Some(Stmt {
                kind: StmtKind::Empty,
                span,
            });
        }

        let mut default = None;
        let mut namespace = None;
        let mut named = Vec::new();
        let mut type_specifiers = 0;

        if !matches!(self.kind(), TokenKind::String(_)) {
            let mut more = true;
            if matches!(self.kind(), TokenKind::Identifier(_)) {
                default = Some(self.parse_binding_ident()?);
                more = self.skip(Punct::Comma);
            }
            if !more {
                // `import x from "m"`
            } else if self.skip(Punct::Star) {
                if !self.skip_ident("as") {
                    self.error_expected("'as'");
                    return None;
                }
                namespace = Some(self.parse_binding_ident()?);
            } else if self.at(Punct::LBrace) {
                self.bump();
                while !self.at(Punct::RBrace) {
                    let spec_start = self.start();
                    let spec_type_only = self.ts
                        && self.at_ident("type")
                        && matches!(
                            self.peek().kind,
                            TokenKind::Identifier(_) | TokenKind::Keyword(_) | TokenKind::String(_)
                        )
                        && !self.peek().kind.is_ident("as");
                    if spec_type_only {
                        self.bump();
                    }
                    let imported_span = self.current().span;
                    let imported = match self.kind().clone() {
                        TokenKind::String(s) => {
                            self.bump();
                            s
                        }
                        _ => self.parse_ident_name()?.name,
                    };
                    let local = if self.skip_ident("as") {
                        self.parse_binding_ident()?
                    } else {
                        if Keyword::from_str(&imported).is_some() {
                            self.error(ParseError::Invalid {
                                message: format!("'{}' is a reserved word", imported),
                                offset: imported_span.start,
                            });
                            return None;
                        }
                        Ident {
                            name: imported.clone(),
                            span: imported_span,
                        }
                    };
                    let has_comma = self.skip(Punct::Comma);
                    let span = self.span_from(spec_start);
                    if spec_type_only {
                        self.strip(span);
                        type_specifiers += 1;
                    }
                    named.push(ImportSpecifier {
                        imported,
                        local,
                        type_only: spec_type_only,
                        span,
                    });
                    if !has_comma {
                        break;
                    }
                }
                self.expect(Punct::RBrace)?;
            }
            self.expect_from()?;
        }

        let source = self.parse_module_specifier()?;
        let attributes = self.parse_import_attributes_opt()?;
        self.consume_semicolon()?;
        let span = self.span_from(start);

        let elided = default.is_none() && namespace.is_none() && !named.is_empty() && type_specifiers == named.len();
        if type_only || elided {
            self.strip(span);
        }

        Some(Stmt {
            kind: StmtKind::Import(ImportDecl {
                default,
                namespace,
                named,
                source,
                attributes,
                type_only,
            }),
            span,
        })
    }

    fn expect_from(&mut self) -> Option<()> {
        if self.skip_ident("from") {
            Some(())
        } else {
            self.error_expected("'from'");
            None
        }
    }

    fn parse_module_specifier(&mut self) -> Option<StrLit> {
        let span = self.current().span;
        if let TokenKind::String(value) = self.kind().clone() {
            self.bump();
            Some(StrLit { value, span })
        } else {
            self.error_expected("module specifier");
            None
        }
    }

    /// `with { type: "comptime" }` (or the legacy `assert { ... }`)
    fn parse_import_attributes_opt(&mut self) -> Option<Vec<ImportAttribute>> {
        let mut attributes = Vec::new();
        if !(self.at_kw(Keyword::With) || self.at_ident("assert")) || self.newline_before() {
            return Some(attributes);
        }
        self.bump();
        self.expect(Punct::LBrace)?;
        while !self.at(Punct::RBrace) {
            let key = match self.kind().clone() {
                TokenKind::String(s) => {
                    self.bump();
                    s
                }
                _ => self.parse_ident_name()?.name,
            };
            self.expect(Punct::Colon)?;
            let value = self.parse_module_specifier()?;
            attributes.push(ImportAttribute { key, value });
            if !self.skip(Punct::Comma) {
                break;
            }
        }
        self.expect(Punct::RBrace)?;
        Some(attributes)
    }

    /// Parse an export declaration
    fn parse_export(&mut self) -> Option<Stmt> {
        let start = self.start();
        self.expect_kw(Keyword::Export)?;

        let decl = match self.kind().clone() {
            TokenKind::Keyword(Keyword::Default) => {
                self.bump();
                let default_start = self.start();
                let is_async_fn = self.at_ident("async")
                    && self.peek().kind.is_keyword(Keyword::Function)
                    && !self.peek().newline_before;
                if self.at_kw(Keyword::Function) || is_async_fn {
                    let func = self.parse_function_decl()?;
                    if matches!(func.body, FunctionBody::None) {
                        let span = self.span_from(start);
                        self.skip(Punct::Semicolon);
                        self.strip(self.span_from(start));
                        return Some(Stmt {
                            kind: StmtKind::Empty,
                            span,
                        });
                    }
                    ExportDecl::Default(Box::new(DefaultExport::Function(Arc::new(func))))
                } else if self.at_kw(Keyword::Class) || self.at(Punct::At) || self.at_ident("abstract") {
                    self.parse_decorators()?;
                    if self.at_ident("abstract") {
                        let span = self.current().span;
                        self.bump();
                        self.strip(span);
                    }
                    let class = self.parse_class(default_start, false)?;
                    ExportDecl::Default(Box::new(DefaultExport::Class(Arc::new(class))))
                } else if self.ts && self.at_ident("interface") {
                    self.bump();
                    self.parse_binding_ident()?;
                    self.parse_interface_rest()?;
                    let span = self.span_from(start);
                    self.strip(span);
                    return Some(Stmt {
                        kind: StmtKind::Empty,
                        span,
                    });
                } else {
                    let expr = self.parse_assignment()?;
                    self.consume_semicolon()?;
                    ExportDecl::Default(Box::new(DefaultExport::Expr(expr)))
                }
            }
            TokenKind::Punct(Punct::Star) => {
                self.bump();
                let alias = if self.skip_ident("as") {
                    Some(match self.kind().clone() {
                        TokenKind::String(s) => {
                            self.bump();
                            s
                        }
                        _ => self.parse_ident_name()?.name,
                    })
                } else {
                    None
                };
                self.expect_from()?;
                let source = self.parse_module_specifier()?;
                self.parse_import_attributes_opt()?;
                self.consume_semicolon()?;
                ExportDecl::All { alias, source }
            }
            TokenKind::Punct(Punct::Eq) if self.ts => {
                self.bump();
                self.parse_assignment()?;
                self.consume_semicolon()?;
                let span = self.span_from(start);
                self.unerasable(span, "export assignment");
                return Some(Stmt {
                    kind: StmtKind::Empty,
                    span,
                });
            }
            TokenKind::Identifier(ref name) if self.ts && name == "as" => {
                // `export as namespace X;`
                self.bump();
                self.skip_ident("namespace");
                self.parse_binding_ident()?;
                self.consume_semicolon()?;
                let span = self.span_from(start);
                self.strip(span);
                return Some(Stmt {
                    kind: StmtKind::Empty,
                    span,
                });
            }
            TokenKind::Identifier(ref name)
                if self.ts
                    && name == "type"
                    && matches!(self.peek().kind, TokenKind::Punct(Punct::LBrace | Punct::Star)) =>
            {
                self.bump();
                let mut decl = self.parse_export_named_or_all()?;
                if let ExportDecl::Named { type_only, .. } = &mut decl {
                    *type_only = true;
                }
                let span = self.span_from(start);
                self.strip(span);
                return Some(Stmt {
                    kind: StmtKind::Export(decl),
                    span,
                });
            }
            TokenKind::Punct(Punct::LBrace) => self.parse_export_named_or_all()?,
            TokenKind::Keyword(Keyword::Import) if self.ts => {
                // `export import A = B.C;`
                self.bump();
                self.parse_binding_ident()?;
                self.expect(Punct::Eq)?;
                self.parse_expression(BP_ASSIGN)?;
                self.consume_semicolon()?;
                let span = self.span_from(start);
                self.unerasable(span, "import assignment");
                return Some(Stmt {
                    kind: StmtKind::Empty,
                    span,
                });
            }
            _ => {
                let inner = self.parse_stmt()?;
                let type_only = match &inner.kind {
                    StmtKind::TypeDecl(_) | StmtKind::Declare(_) => true,
                    StmtKind::Function(func) => matches!(func.body, FunctionBody::None),
                    StmtKind::Var(_)
                    | StmtKind::Class(_)
                    | StmtKind::Enum(_)
                    | StmtKind::Namespace { .. }
                    | StmtKind::Empty => false,
                    _ => {
                        self.error(ParseError::Invalid {
                            message: "Expected a declaration after 'export'".into(),
                            offset: inner.span.start,
                        });
                        return None;
                    }
                };
                if type_only {
                    self.strip(self.span_from(start));
                }
                ExportDecl::Decl(Box::new(inner))
            }
        };

        Some(Stmt {
            kind: StmtKind::Export(decl),
            span: self.span_from(start),
        })
    }

    /// `{ a as b, type C } [from "m"]`
    fn parse_export_named_or_all(&mut self) -> Option<ExportDecl> {
        if self.skip(Punct::Star) {
            let alias = if self.skip_ident("as") {
                Some(self.parse_ident_name()?.name)
            } else {
                None
            };
            self.expect_from()?;
            let source = self.parse_module_specifier()?;
            self.consume_semicolon()?;
            return Some(ExportDecl::All { alias, source });
        }
        self.expect(Punct::LBrace)?;
        let mut specifiers = Vec::new();
        while !self.at(Punct::RBrace) {
            let spec_start = self.start();
            let spec_type_only = self.ts
                && self.at_ident("type")
                && matches!(
                    self.peek().kind,
                    TokenKind::Identifier(_) | TokenKind::Keyword(_) | TokenKind::String(_)
                )
                && !self.peek().kind.is_ident("as");
            if spec_type_only {
                self.bump();
            }
            let local = match self.kind().clone() {
                TokenKind::String(value) => {
                    let span = self.current().span;
                    self.bump();
                    Ident { name: value, span }
                }
                _ => self.parse_ident_name()?,
            };
            let exported = if self.skip_ident("as") {
                match self.kind().clone() {
                    TokenKind::String(s) => {
                        self.bump();
                        s
                    }
                    _ => self.parse_ident_name()?.name,
                }
            } else {
                local.name.clone()
            };
            let has_comma = self.skip(Punct::Comma);
            if spec_type_only {
                self.strip(self.span_from(spec_start));
            }
            specifiers.push(ExportSpecifier {
                local,
                exported,
                type_only: spec_type_only,
            });
            if !has_comma {
                break;
            }
        }
        self.expect(Punct::RBrace)?;
        let source = if self.skip_ident("from") {
            let source = self.parse_module_specifier()?;
            self.parse_import_attributes_opt()?;
            Some(source)
        } else {
            None
        };
        self.consume_semicolon()?;
        Some(ExportDecl::Named {
            specifiers,
            source,
            type_only: false,
        })
    }

    /// A TypeScript declaration keyword followed by something it can declare
    fn is_ts_declaration_start(
        &self,
        name: &str,
    ) -> bool {
        let next = self.peek();
        if next.newline_before {
            return false;
        }
        match name {
            "interface" | "type" => matches!(next.kind, TokenKind::Identifier(_)),
            "declare" => matches!(next.kind, TokenKind::Identifier(_) | TokenKind::Keyword(_)),
            "abstract" => next.kind.is_keyword(Keyword::Class),
            "namespace" | "module" => matches!(next.kind, TokenKind::Identifier(_) | TokenKind::String(_)),
            "global" => self.ambient && next.kind.is_punct(Punct::LBrace),
            _ => false,
        }
    }

    /// Parse `interface`, `type`, `declare`, `abstract class`, `namespace` / `module`
    fn parse_ts_declaration(&mut self) -> Option<Stmt> {
        let start = self.start();
        let TokenKind::Identifier(keyword) = self.kind().clone() else {
            self.error_expected("declaration");
            return None;
        };
        let kind = match keyword.as_str() {
            "interface" => {
                self.bump();
                let name = self.parse_binding_ident()?;
                self.parse_interface_rest()?;
                self.strip(self.span_from(start));
                StmtKind::TypeDecl(name)
            }
            "type" => {
                self.bump();
                let name = self.parse_binding_ident()?;
                self.parse_type_alias_rest()?;
                self.consume_semicolon()?;
                self.strip(self.span_from(start));
                StmtKind::TypeDecl(name)
            }
            "declare" => {
                self.bump();
                let saved = self.ambient;
                self.ambient = true;
                let inner = self.parse_stmt();
                self.ambient = saved;
                let inner = inner?;
                self.strip(self.span_from(start));
                StmtKind::Declare(Box::new(inner))
            }
            "abstract" => {
                let span = self.current().span;
                self.bump();
                self.strip(span);
                StmtKind::Class(Arc::new(self.parse_class(self.start(), true)?))
            }
            "global" => {
                self.bump();
                self.skip_balanced(Punct::LBrace, Punct::RBrace)?;
                self.strip(self.span_from(start));
                StmtKind::Empty
            }
            _ => return self.parse_namespace(),
        };
        Some(Stmt {
            kind,
            span: self.span_from(start),
        })
    }

    /// `namespace A.B { ... }` / `module "m" { ... }`
    fn parse_namespace(&mut self) -> Option<Stmt> {
        let start = self.start();
        self.bump();
        let name = match self.kind().clone() {
            TokenKind::String(value) => {
                let span = self.current().span;
                self.bump();
                Ident { name: value, span }
            }
            _ => self.parse_binding_ident()?,
        };
        while self.skip(Punct::Dot) {
            self.parse_ident_name()?;
        }
        let body = if self.at(Punct::LBrace) {
            self.parse_block_body()?
        } else {
            // `declare module "m";`
            self.consume_semicolon()?;
            Vec::new()
        };
        let span = self.span_from(start);

        if body.iter().all(is_type_only_stmt) {
            self.strip(span);
            return Some(Stmt {
                kind: StmtKind::TypeDecl(name),
                span,
            });
        }
        if !self.ambient {
            self.unerasable(span, "namespace");
        }
        Some(Stmt {
            kind: StmtKind::Namespace { name, body },
            span,
        })
    }
}

/// Statement with no runtime effect
fn is_type_only_stmt(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::TypeDecl(_) | StmtKind::Declare(_) | StmtKind::Empty => true,
        StmtKind::Import(import) => import.type_only,
        StmtKind::Export(ExportDecl::Decl(inner)) => is_type_only_stmt(inner),
        StmtKind::Export(ExportDecl::Named { type_only, .. }) => *type_only,
        _ => false,
    }
}
