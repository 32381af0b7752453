//! Read-only AST traversal
//!
//! Override a `visit_*` method to intercept a node kind; call the matching
//! `walk_*` function from the override to keep descending.

use super::ast::*;

pub trait Visitor<'a>: Sized {
    fn visit_stmt(
        &mut self,
        stmt: &'a Stmt,
    ) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(
        &mut self,
        expr: &'a Expr,
    ) {
        walk_expr(self, expr);
    }

    fn visit_pattern(
        &mut self,
        pattern: &'a Pattern,
    ) {
        walk_pattern(self, pattern);
    }

    fn visit_function(
        &mut self,
        func: &'a Function,
    ) {
        walk_function(self, func);
    }

    fn visit_class(
        &mut self,
        class: &'a Class,
    ) {
        walk_class(self, class);
    }

    fn visit_prop_name(
        &mut self,
        key: &'a PropName,
    ) {
        if let PropName::Computed(expr) = key {
            self.visit_expr(expr);
        }
    }
}

pub fn walk_stmts<'a, V: Visitor<'a>>(
    v: &mut V,
    stmts: &'a [Stmt],
) {
    for stmt in stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<'a, V: Visitor<'a>>(
    v: &mut V,
    stmt: &'a Stmt,
) {
    match &stmt.kind {
        StmtKind::Expr(e) | StmtKind::Throw(e) => v.visit_expr(e),
        StmtKind::Var(decl) => walk_var_decl(v, decl),
        StmtKind::Function(func) => v.visit_function(func),
        StmtKind::Class(class) => v.visit_class(class),
        StmtKind::Enum(decl) => {
            for member in &decl.members {
                if let Some(init) = &member.init {
                    v.visit_expr(init);
                }
            }
        }
        StmtKind::Import(_) | StmtKind::TypeDecl(_) | StmtKind::Declare(_) => {}
        StmtKind::Export(export) => match export {
            ExportDecl::Decl(inner) => v.visit_stmt(inner),
            ExportDecl::Default(default) => match default.as_ref() {
                DefaultExport::Function(func) => v.visit_function(func),
                DefaultExport::Class(class) => v.visit_class(class),
                DefaultExport::Expr(e) => v.visit_expr(e),
            },
            ExportDecl::Named { .. } | ExportDecl::All { .. } => {}
        },
        StmtKind::Namespace { body, .. } | StmtKind::Block(body) => walk_stmts(v, body),
        StmtKind::If { test, cons, alt } => {
            v.visit_expr(test);
            v.visit_stmt(cons);
            if let Some(alt) = alt {
                v.visit_stmt(alt);
            }
        }
        StmtKind::For {
            init,
            test,
            update,
            body,
        } => {
            match init {
                Some(ForInit::Var(decl)) => walk_var_decl(v, decl),
                Some(ForInit::Expr(e)) => v.visit_expr(e),
                None => {}
            }
            if let Some(test) = test {
                v.visit_expr(test);
            }
            if let Some(update) = update {
                v.visit_expr(update);
            }
            v.visit_stmt(body);
        }
        StmtKind::ForIn { left, right, body } | StmtKind::ForOf { left, right, body, .. } => {
            match left {
                ForHead::Var(_, p) | ForHead::Pattern(p) => v.visit_pattern(p),
            }
            v.visit_expr(right);
            v.visit_stmt(body);
        }
        StmtKind::While { test, body } | StmtKind::DoWhile { body, test } => {
            v.visit_expr(test);
            v.visit_stmt(body);
        }
        StmtKind::Return(arg) => {
            if let Some(arg) = arg {
                v.visit_expr(arg);
            }
        }
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            walk_stmts(v, block);
            if let Some(handler) = handler {
                if let Some(param) = &handler.param {
                    v.visit_pattern(param);
                }
                walk_stmts(v, &handler.body);
            }
            if let Some(finalizer) = finalizer {
                walk_stmts(v, finalizer);
            }
        }
        StmtKind::Switch { discriminant, cases } => {
            v.visit_expr(discriminant);
            for case in cases {
                if let Some(test) = &case.test {
                    v.visit_expr(test);
                }
                walk_stmts(v, &case.body);
            }
        }
        StmtKind::Labeled { body, .. } => v.visit_stmt(body),
        StmtKind::Break(_) | StmtKind::Continue(_) | StmtKind::Empty | StmtKind::Debugger => {}
    }
}

fn walk_var_decl<'a, V: Visitor<'a>>(
    v: &mut V,
    decl: &'a VarDecl,
) {
    for d in &decl.decls {
        v.visit_pattern(&d.pattern);
        if let Some(init) = &d.init {
            v.visit_expr(init);
        }
    }
}

pub fn walk_expr<'a, V: Visitor<'a>>(
    v: &mut V,
    expr: &'a Expr,
) {
    match &expr.kind {
        ExprKind::Ident(_) | ExprKind::This | ExprKind::Super | ExprKind::Lit(_) | ExprKind::MetaProperty { .. } => {}
        ExprKind::Template(t) => walk_template(v, t),
        ExprKind::TaggedTemplate { tag, quasi } => {
            v.visit_expr(tag);
            walk_template(v, quasi);
        }
        ExprKind::Array(elems) => {
            for elem in elems.iter().flatten() {
                v.visit_expr(&elem.expr);
            }
        }
        ExprKind::Object(props) => {
            for prop in props {
                match prop {
                    Prop::KeyValue { key, value } => {
                        v.visit_prop_name(key);
                        v.visit_expr(value);
                    }
                    // shorthand keys are handled by visitors that care about them
                    Prop::Shorthand(_) => {}
                    Prop::Method { key, func, .. } => {
                        v.visit_prop_name(key);
                        v.visit_function(func);
                    }
                    Prop::Spread(e) => v.visit_expr(e),
                }
            }
        }
        ExprKind::Function(func) | ExprKind::Arrow(func) => v.visit_function(func),
        ExprKind::Class(class) => v.visit_class(class),
        ExprKind::Unary { arg, .. }
        | ExprKind::Update { arg, .. }
        | ExprKind::OptChain(arg)
        | ExprKind::Paren(arg)
        | ExprKind::Await(arg)
        | ExprKind::Import(arg)
        | ExprKind::TypeCast(arg) => v.visit_expr(arg),
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        ExprKind::Assign { target, value, .. } => {
            v.visit_pattern(target);
            v.visit_expr(value);
        }
        ExprKind::Conditional { test, cons, alt } => {
            v.visit_expr(test);
            v.visit_expr(cons);
            v.visit_expr(alt);
        }
        ExprKind::Call { callee, args, .. } | ExprKind::New { callee, args } => {
            v.visit_expr(callee);
            for arg in args {
                v.visit_expr(&arg.expr);
            }
        }
        ExprKind::Member { object, property, .. } => {
            v.visit_expr(object);
            if let MemberProp::Computed(prop) = property {
                v.visit_expr(prop);
            }
        }
        ExprKind::Yield { arg, .. } => {
            if let Some(arg) = arg {
                v.visit_expr(arg);
            }
        }
        ExprKind::Seq(exprs) => {
            for e in exprs {
                v.visit_expr(e);
            }
        }
    }
}

fn walk_template<'a, V: Visitor<'a>>(
    v: &mut V,
    template: &'a Template,
) {
    for e in &template.exprs {
        v.visit_expr(e);
    }
}

pub fn walk_pattern<'a, V: Visitor<'a>>(
    v: &mut V,
    pattern: &'a Pattern,
) {
    match &pattern.kind {
        PatternKind::Ident(_) => {}
        PatternKind::Object { props, rest } => {
            for prop in props {
                v.visit_prop_name(&prop.key);
                v.visit_pattern(&prop.value);
            }
            if let Some(rest) = rest {
                v.visit_pattern(rest);
            }
        }
        PatternKind::Array { elems, rest } => {
            for elem in elems.iter().flatten() {
                v.visit_pattern(elem);
            }
            if let Some(rest) = rest {
                v.visit_pattern(rest);
            }
        }
        PatternKind::Default { target, default } => {
            v.visit_pattern(target);
            v.visit_expr(default);
        }
        PatternKind::Expr(e) => v.visit_expr(e),
    }
}

pub fn walk_function<'a, V: Visitor<'a>>(
    v: &mut V,
    func: &'a Function,
) {
    for param in &func.params {
        v.visit_pattern(&param.pattern);
    }
    match &func.body {
        FunctionBody::Block(stmts) => walk_stmts(v, stmts),
        FunctionBody::Expr(e) => v.visit_expr(e),
        FunctionBody::None => {}
    }
}

pub fn walk_class<'a, V: Visitor<'a>>(
    v: &mut V,
    class: &'a Class,
) {
    if let Some(sup) = &class.super_class {
        v.visit_expr(sup);
    }
    for member in &class.members {
        match member {
            ClassMember::Constructor(func) => v.visit_function(func),
            ClassMember::Method { key, func, .. } => {
                v.visit_prop_name(key);
                v.visit_function(func);
            }
            ClassMember::Field { key, value, .. } => {
                v.visit_prop_name(key);
                if let Some(value) = value {
                    v.visit_expr(value);
                }
            }
            ClassMember::StaticBlock(stmts) => walk_stmts(v, stmts),
        }
    }
}
