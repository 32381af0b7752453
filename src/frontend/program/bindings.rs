//! Per-file symbol resolution
//!
//! Resolves every identifier use in a module to the declaration that
//! introduces it, following block scoping for `let`/`const`/`class`,
//! function scoping for `var`, and hoisting for both. Type-only syntax
//! (interfaces, aliases, `import type`) never introduces a value binding.

use std::collections::HashMap;

use crate::frontend::parser::ast::*;
use crate::frontend::parser::visit::{walk_expr, walk_pattern, walk_stmt, walk_stmts, Visitor};
use crate::util::span::Span;

/// Index into [`Bindings::declarations`]
pub type DeclId = usize;

/// Which export an import binding refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedName {
    Named(String),
    Default,
    Namespace,
}

/// Declaration kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclKind {
    Import {
        source: String,
        imported: ImportedName,
        /// Declared by an import tagged `with { type: "comptime" }`
        comptime: bool,
    },
    Var(VarKind),
    Function,
    Class,
    Enum,
    Namespace,
    Param,
    Catch,
}

/// A value binding
#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclKind,
    /// Span of the binding identifier
    pub span: Span,
    /// Statement that introduces the binding (the inner declaration of an `export`)
    pub stmt: Span,
    /// `declare`-qualified or body-less: no runtime value
    pub ambient: bool,
}

impl Declaration {
    #[inline]
    pub fn is_import(&self) -> bool {
        matches!(self.kind, DeclKind::Import { .. })
    }
}

/// An identifier use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub span: Span,
    /// `None` for globals and unresolved names
    pub decl: Option<DeclId>,
}

/// Symbol table of one module
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    decls: Vec<Declaration>,
    /// Sorted by start offset
    refs: Vec<Reference>,
}

impl Bindings {
    /// Bind a parsed module
    pub fn bind(module: &Module) -> Self {
        let mut binder = Binder::default();
        binder.scopes.push(Scope {
            names: HashMap::new(),
            is_function: true,
        });
        binder.declare_hoisted(&module.body);
        walk_stmts(&mut binder, &module.body);
        let mut bindings = binder.out;
        bindings.refs.sort_by_key(|r| r.span.start);
        bindings
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.decls
    }

    #[inline]
    pub fn decl(
        &self,
        id: DeclId,
    ) -> &Declaration {
        &self.decls[id]
    }

    pub fn references(&self) -> &[Reference] {
        &self.refs
    }

    /// Identifier uses lying inside `span`
    pub fn refs_in(
        &self,
        span: Span,
    ) -> &[Reference] {
        let lo = self.refs.partition_point(|r| r.span.start < span.start);
        let hi = self.refs.partition_point(|r| r.span.start < span.end);
        &self.refs[lo..hi.max(lo)]
    }

    /// Declaration of the identifier use at `span`
    pub fn resolve(
        &self,
        span: Span,
    ) -> Option<DeclId> {
        let idx = self.refs.binary_search_by_key(&span.start, |r| r.span.start).ok()?;
        self.refs[idx].decl
    }
}

#[derive(Debug, Default)]
struct Scope {
    names: HashMap<String, DeclId>,
    /// `var` declarations land here
    is_function: bool,
}

#[derive(Debug, Default)]
struct Binder {
    out: Bindings,
    scopes: Vec<Scope>,
    /// Start offsets of binding identifiers, to tell them apart from uses in patterns
    binding_idents: HashMap<usize, DeclId>,
}

impl Binder {
    fn declare(
        &mut self,
        ident: &Ident,
        kind: DeclKind,
        stmt: Span,
        ambient: bool,
    ) {
        let id = self.out.decls.len();
        let is_var = matches!(kind, DeclKind::Var(VarKind::Var));
        self.out.decls.push(Declaration {
            name: ident.name.clone(),
            kind,
            span: ident.span,
            stmt,
            ambient,
        });
        self.binding_idents.insert(ident.span.start, id);
        let scope = if is_var {
            self.scopes.iter_mut().rev().find(|s| s.is_function)
        } else {
            None
        };
        let scope = match scope {
            Some(scope) => scope,
            None => match self.scopes.last_mut() {
                Some(scope) => scope,
                None => return,
            },
        };
        scope.names.insert(ident.name.clone(), id);
    }

    fn declare_pattern(
        &mut self,
        pattern: &Pattern,
        kind: DeclKind,
        stmt: Span,
        ambient: bool,
    ) {
        let mut idents = Vec::new();
        pattern_idents(pattern, &mut idents);
        for ident in idents {
            self.declare(ident, kind.clone(), stmt, ambient);
        }
    }

    fn lookup(
        &self,
        name: &str,
    ) -> Option<DeclId> {
        self.scopes.iter().rev().find_map(|s| s.names.get(name).copied())
    }

    fn reference(
        &mut self,
        ident: &Ident,
    ) {
        let decl = self.lookup(&ident.name);
        self.out.refs.push(Reference {
            span: ident.span,
            decl,
        });
    }

    fn with_scope(
        &mut self,
        is_function: bool,
        f: impl FnOnce(&mut Self),
    ) {
        self.scopes.push(Scope {
            names: HashMap::new(),
            is_function,
        });
        f(self);
        self.scopes.pop();
    }

    /// Pre-declare everything a statement list hoists: lexical declarations
    /// of this list plus `var`s of nested blocks
    fn declare_hoisted(
        &mut self,
        stmts: &[Stmt],
    ) {
        if self.scopes.last().is_some_and(|s| s.is_function) {
            for stmt in stmts {
                self.hoist_vars(stmt);
            }
        }
        for stmt in stmts {
            self.declare_stmt(stmt, stmt.span, false);
        }
    }

    fn declare_stmt(
        &mut self,
        stmt: &Stmt,
        stmt_span: Span,
        ambient: bool,
    ) {
        match &stmt.kind {
            StmtKind::Var(decl) if decl.kind != VarKind::Var || ambient => {
                for d in &decl.decls {
                    self.declare_pattern(&d.pattern, DeclKind::Var(decl.kind), stmt_span, ambient);
                }
            }
            StmtKind::Function(func) => {
                if let Some(name) = &func.name {
                    let ambient = ambient || matches!(func.body, FunctionBody::None);
                    self.declare(name, DeclKind::Function, stmt_span, ambient);
                }
            }
            StmtKind::Class(class) => {
                if let Some(name) = &class.name {
                    self.declare(name, DeclKind::Class, stmt_span, ambient);
                }
            }
            StmtKind::Enum(decl) => self.declare(&decl.name, DeclKind::Enum, stmt_span, ambient),
            StmtKind::Namespace { name, .. } => self.declare(name, DeclKind::Namespace, stmt_span, ambient),
            StmtKind::Import(import) if !import.type_only => {
                let source = import.source.value.clone();
                let comptime = import.is_comptime();
                let make = |imported| DeclKind::Import {
                    source: source.clone(),
                    imported,
                    comptime,
                };
                if let Some(default) = &import.default {
                    self.declare(default, make(ImportedName::Default), stmt_span, ambient);
                }
                if let Some(ns) = &import.namespace {
                    self.declare(ns, make(ImportedName::Namespace), stmt_span, ambient);
                }
                for spec in import.named.iter().filter(|s| !s.type_only) {
                    let imported = if spec.imported == "default" {
                        ImportedName::Default
                    } else {
                        ImportedName::Named(spec.imported.clone())
                    };
                    self.declare(&spec.local, make(imported), stmt_span, ambient);
                }
            }
            StmtKind::Export(ExportDecl::Decl(inner)) => self.declare_stmt(inner, inner.span, ambient),
            StmtKind::Export(ExportDecl::Default(default)) => match default.as_ref() {
                DefaultExport::Function(func) => {
                    if let Some(name) = &func.name {
                        self.declare(name, DeclKind::Function, func.span, ambient);
                    }
                }
                DefaultExport::Class(class) => {
                    if let Some(name) = &class.name {
                        self.declare(name, DeclKind::Class, class.span, ambient);
                    }
                }
                DefaultExport::Expr(_) => {}
            },
            StmtKind::Declare(inner) => self.declare_stmt(inner, stmt_span, true),
            _ => {}
        }
    }

    /// Declare `var` bindings found anywhere in `stmt` outside nested functions
    fn hoist_vars(
        &mut self,
        stmt: &Stmt,
    ) {
        match &stmt.kind {
            StmtKind::Var(decl) if decl.kind == VarKind::Var => {
                for d in &decl.decls {
                    self.declare_pattern(&d.pattern, DeclKind::Var(VarKind::Var), stmt.span, false);
                }
            }
            StmtKind::Export(ExportDecl::Decl(inner)) => {
                if let StmtKind::Var(decl) = &inner.kind {
                    if decl.kind == VarKind::Var {
                        for d in &decl.decls {
                            self.declare_pattern(&d.pattern, DeclKind::Var(VarKind::Var), inner.span, false);
                        }
                    }
                }
            }
            StmtKind::Block(body) => body.iter().for_each(|s| self.hoist_vars(s)),
            StmtKind::If { cons, alt, .. } => {
                self.hoist_vars(cons);
                if let Some(alt) = alt {
                    self.hoist_vars(alt);
                }
            }
            StmtKind::For { init, body, .. } => {
                if let Some(ForInit::Var(decl)) = init {
                    if decl.kind == VarKind::Var {
                        for d in &decl.decls {
                            self.declare_pattern(&d.pattern, DeclKind::Var(VarKind::Var), stmt.span, false);
                        }
                    }
                }
                self.hoist_vars(body);
            }
            StmtKind::ForIn { left, body, .. } | StmtKind::ForOf { left, body, .. } => {
                if let ForHead::Var(VarKind::Var, pattern) = left {
                    self.declare_pattern(pattern, DeclKind::Var(VarKind::Var), stmt.span, false);
                }
                self.hoist_vars(body);
            }
            StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } | StmtKind::Labeled { body, .. } => {
                self.hoist_vars(body)
            }
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                block.iter().for_each(|s| self.hoist_vars(s));
                if let Some(handler) = handler {
                    handler.body.iter().for_each(|s| self.hoist_vars(s));
                }
                if let Some(finalizer) = finalizer {
                    finalizer.iter().for_each(|s| self.hoist_vars(s));
                }
            }
            StmtKind::Switch { cases, .. } => {
                for case in cases {
                    case.body.iter().for_each(|s| self.hoist_vars(s));
                }
            }
            _ => {}
        }
    }

    fn bind_function(
        &mut self,
        func: &Function,
    ) {
        self.with_scope(true, |b| {
            for param in &func.params {
                b.declare_pattern(&param.pattern, DeclKind::Param, func.span, false);
            }
            if let FunctionBody::Block(body) = &func.body {
                b.declare_hoisted(body);
            }
            for param in &func.params {
                b.visit_pattern(&param.pattern);
            }
            match &func.body {
                FunctionBody::Block(body) => walk_stmts(b, body),
                FunctionBody::Expr(e) => b.visit_expr(e),
                FunctionBody::None => {}
            }
        });
    }

    fn bind_block(
        &mut self,
        body: &[Stmt],
    ) {
        self.with_scope(false, |b| {
            b.declare_hoisted(body);
            walk_stmts(b, body);
        });
    }
}

impl<'a> Visitor<'a> for Binder {
    fn visit_stmt(
        &mut self,
        stmt: &'a Stmt,
    ) {
        match &stmt.kind {
            StmtKind::Block(body) => self.bind_block(body),
            StmtKind::For { init, .. } => self.with_scope(false, |b| {
                if let Some(ForInit::Var(decl)) = init {
                    if decl.kind != VarKind::Var {
                        for d in &decl.decls {
                            b.declare_pattern(&d.pattern, DeclKind::Var(decl.kind), stmt.span, false);
                        }
                    }
                }
                walk_stmt(b, stmt);
            }),
            StmtKind::ForIn { left, .. } | StmtKind::ForOf { left, .. } => self.with_scope(false, |b| {
                if let ForHead::Var(kind, pattern) = left {
                    if *kind != VarKind::Var {
                        b.declare_pattern(pattern, DeclKind::Var(*kind), stmt.span, false);
                    }
                }
                walk_stmt(b, stmt);
            }),
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                self.bind_block(block);
                if let Some(handler) = handler {
                    self.with_scope(false, |b| {
                        if let Some(param) = &handler.param {
                            b.declare_pattern(param, DeclKind::Catch, stmt.span, false);
                            b.visit_pattern(param);
                        }
                        b.bind_block(&handler.body);
                    });
                }
                if let Some(finalizer) = finalizer {
                    self.bind_block(finalizer);
                }
            }
            StmtKind::Switch { discriminant, cases } => {
                self.visit_expr(discriminant);
                self.with_scope(false, |b| {
                    for case in cases {
                        for s in &case.body {
                            b.declare_stmt(s, s.span, false);
                        }
                    }
                    for case in cases {
                        if let Some(test) = &case.test {
                            b.visit_expr(test);
                        }
                        walk_stmts(b, &case.body);
                    }
                });
            }
            StmtKind::Namespace { body, .. } => self.with_scope(true, |b| {
                b.declare_hoisted(body);
                walk_stmts(b, body);
            }),
            _ => walk_stmt(self, stmt),
        }
    }

    fn visit_expr(
        &mut self,
        expr: &'a Expr,
    ) {
        match &expr.kind {
            ExprKind::Ident(ident) => self.reference(ident),
            ExprKind::Object(props) => {
                for prop in props {
                    if let Prop::Shorthand(ident) = prop {
                        self.reference(ident);
                    }
                }
                walk_expr(self, expr);
            }
            ExprKind::Function(func) => match &func.name {
                Some(name) => self.with_scope(false, |b| {
                    b.declare(name, DeclKind::Function, func.span, false);
                    b.bind_function(func);
                }),
                None => self.bind_function(func),
            },
            ExprKind::Class(class) => match &class.name {
                Some(name) => self.with_scope(false, |b| {
                    b.declare(name, DeclKind::Class, class.span, false);
                    b.visit_class(class);
                }),
                None => self.visit_class(class),
            },
            _ => walk_expr(self, expr),
        }
    }

    fn visit_pattern(
        &mut self,
        pattern: &'a Pattern,
    ) {
        match &pattern.kind {
            PatternKind::Ident(ident) => {
                if !self.binding_idents.contains_key(&ident.span.start) {
                    self.reference(ident);
                }
            }
            _ => walk_pattern(self, pattern),
        }
    }

    fn visit_function(
        &mut self,
        func: &'a Function,
    ) {
        self.bind_function(func);
    }
}

/// Binding identifiers introduced by a pattern
pub fn pattern_idents<'p>(
    pattern: &'p Pattern,
    out: &mut Vec<&'p Ident>,
) {
    match &pattern.kind {
        PatternKind::Ident(ident) => out.push(ident),
        PatternKind::Object { props, rest } => {
            for prop in props {
                pattern_idents(&prop.value, out);
            }
            if let Some(rest) = rest {
                pattern_idents(rest, out);
            }
        }
        PatternKind::Array { elems, rest } => {
            for elem in elems.iter().flatten() {
                pattern_idents(elem, out);
            }
            if let Some(rest) = rest {
                pattern_idents(rest, out);
            }
        }
        PatternKind::Default { target, .. } => pattern_idents(target, out),
        PatternKind::Expr(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::{parse, ParseOptions};

    fn bind(source: &str) -> (Module, Bindings) {
        let output = parse(source, ParseOptions::typescript()).unwrap();
        let bindings = Bindings::bind(&output.module);
        (output.module, bindings)
    }

    /// Name of the declaration the n-th use of `name` resolves to, with its statement text
    fn resolve_nth<'s>(
        source: &'s str,
        bindings: &Bindings,
        name: &str,
        n: usize,
    ) -> Option<(DeclKind, &'s str)> {
        let r = bindings
            .references()
            .iter()
            .filter(|r| &source[r.span.start..r.span.end] == name)
            .nth(n)
            .unwrap_or_else(|| panic!("no use #{n} of {name}"));
        let d = bindings.decl(r.decl?);
        Some((d.kind.clone(), &source[d.stmt.start..d.stmt.end]))
    }

    #[test]
    fn test_resolves_top_level_and_hoisted() {
        let source = "f();\nfunction f() { return x }\nvar x = 1;";
        let (_, b) = bind(source);
        let (kind, stmt) = resolve_nth(source, &b, "f", 0).unwrap();
        assert_eq!(kind, DeclKind::Function);
        assert!(stmt.starts_with("function f()"));
        let (kind, _) = resolve_nth(source, &b, "x", 0).unwrap();
        assert_eq!(kind, DeclKind::Var(VarKind::Var));
    }

    #[test]
    fn test_block_scoping_and_shadowing() {
        let source = "const a = 1;\n{ const a = 2; a; }\na;";
        let (_, b) = bind(source);
        let (_, inner) = resolve_nth(source, &b, "a", 0).unwrap();
        assert_eq!(inner, "const a = 2;");
        let (_, outer) = resolve_nth(source, &b, "a", 1).unwrap();
        assert_eq!(outer, "const a = 1;");
    }

    #[test]
    fn test_params_and_catch() {
        let source = "function g(p, { q = p }) { try {} catch (e) { e } return q }";
        let (_, b) = bind(source);
        assert_eq!(resolve_nth(source, &b, "p", 0).unwrap().0, DeclKind::Param);
        assert_eq!(resolve_nth(source, &b, "e", 0).unwrap().0, DeclKind::Catch);
        assert_eq!(resolve_nth(source, &b, "q", 0).unwrap().0, DeclKind::Param);
    }

    #[test]
    fn test_imports() {
        let source = "import d, { a as b, type T } from './m' with { type: 'comptime' };\nimport * as ns from './n';\nb(d, ns);";
        let (_, bindings) = bind(source);
        let (kind, stmt) = resolve_nth(source, &bindings, "b", 0).unwrap();
        assert_eq!(
            kind,
            DeclKind::Import {
                source: "./m".into(),
                imported: ImportedName::Named("a".into()),
                comptime: true,
            }
        );
        assert!(stmt.starts_with("import d"));
        assert!(matches!(
            resolve_nth(source, &bindings, "ns", 0).unwrap().0,
            DeclKind::Import {
                imported: ImportedName::Namespace,
                comptime: false,
                ..
            }
        ));
        assert!(!bindings.declarations().iter().any(|d| d.name == "T"));
    }

    #[test]
    fn test_export_uses_inner_statement() {
        let source = "export const k = 1;\nexport default function h() {}\nk; h;";
        let (_, b) = bind(source);
        assert_eq!(resolve_nth(source, &b, "k", 0).unwrap().1, "const k = 1;");
        assert_eq!(resolve_nth(source, &b, "h", 0).unwrap().1, "function h() {}");
    }

    #[test]
    fn test_shorthand_and_member_names() {
        let source = "const v = 1;\nconst o = { v, w: v.v };";
        let (_, b) = bind(source);
        let uses = b
            .references()
            .iter()
            .filter(|r| &source[r.span.start..r.span.end] == "v")
            .count();
        // shorthand + `v` of `v.v`; the property name is not a use
        assert_eq!(uses, 2);
    }

    #[test]
    fn test_globals_are_unresolved() {
        let source = "Math.max(1, 2)";
        let (_, b) = bind(source);
        assert_eq!(b.references().len(), 1);
        assert!(b.references()[0].decl.is_none());
    }

    #[test]
    fn test_declare_is_ambient() {
        let source = "declare const env: string;\nenv;";
        let (_, b) = bind(source);
        let id = b.references()[0].decl.unwrap();
        assert!(b.decl(id).ambient);
    }

    #[test]
    fn test_refs_in_range() {
        let source = "const a = 1, b = 2;\nconst c = a + b;";
        let (module, b) = bind(source);
        let refs = b.refs_in(module.body[1].span);
        assert_eq!(refs.len(), 2);
    }
}
