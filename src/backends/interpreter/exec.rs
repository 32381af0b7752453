//! Statement execution

use std::collections::HashSet;

use super::pattern::{is_anonymous_function, BindMode};
use super::{BoxFuture, Cx, Env, Interpreter, JsResult, Throw};
use crate::frontend::parser::ast::{
    DefaultExport, ExportDecl, Expr, ForHead, ForInit, Ident, PatternKind, Stmt, StmtKind, VarDecl,
    VarKind,
};
use crate::frontend::program::bindings::pattern_idents;
use crate::runtime::value::{ClosureKind, Obj, PropertyKey, Value};

/// Binding that holds a module's default export
pub(crate) const DEFAULT_EXPORT: &str = "*default*";

/// How a statement finished
#[derive(Debug, Clone)]
pub(crate) enum Completion {
    Normal,
    Return(Value),
    Break(Option<String>),
    Continue(Option<String>),
}

/// What a loop does after its body ran
enum LoopFlow {
    Next,
    Exit,
    Propagate(Completion),
}

fn loop_flow(
    completion: Completion,
    labels: &[String],
) -> LoopFlow {
    match completion {
        Completion::Normal | Completion::Continue(None) => LoopFlow::Next,
        Completion::Continue(Some(l)) if labels.contains(&l) => LoopFlow::Next,
        Completion::Break(None) => LoopFlow::Exit,
        Completion::Break(Some(l)) if labels.contains(&l) => LoopFlow::Exit,
        other => LoopFlow::Propagate(other),
    }
}

/// `var` names declared anywhere in `stmts`, outside nested functions
fn collect_var_names<'a>(
    stmts: &'a [Stmt],
    out: &mut Vec<&'a Ident>,
) {
    for stmt in stmts {
        collect_var_names_stmt(stmt, out);
    }
}

fn collect_var_names_stmt<'a>(
    stmt: &'a Stmt,
    out: &mut Vec<&'a Ident>,
) {
    let var_decl = |decl: &'a VarDecl, out: &mut Vec<&'a Ident>| {
        if decl.kind == VarKind::Var {
            for d in &decl.decls {
                pattern_idents(&d.pattern, out);
            }
        }
    };
    match &stmt.kind {
        StmtKind::Var(decl) => var_decl(decl, out),
        StmtKind::Block(body) => collect_var_names(body, out),
        StmtKind::If { cons, alt, .. } => {
            collect_var_names_stmt(cons, out);
            if let Some(alt) = alt {
                collect_var_names_stmt(alt, out);
            }
        }
        StmtKind::For { init, body, .. } => {
            if let Some(ForInit::Var(decl)) = init {
                var_decl(decl, out);
            }
            collect_var_names_stmt(body, out);
        }
        StmtKind::ForIn { left, body, .. } | StmtKind::ForOf { left, body, .. } => {
            if let ForHead::Var(VarKind::Var, pattern) = left {
                pattern_idents(pattern, out);
            }
            collect_var_names_stmt(body, out);
        }
        StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } | StmtKind::Labeled { body, .. } => {
            collect_var_names_stmt(body, out)
        }
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            collect_var_names(block, out);
            if let Some(h) = handler {
                collect_var_names(&h.body, out);
            }
            if let Some(f) = finalizer {
                collect_var_names(f, out);
            }
        }
        StmtKind::Switch { cases, .. } => {
            for case in cases {
                collect_var_names(&case.body, out);
            }
        }
        StmtKind::Export(ExportDecl::Decl(inner)) => collect_var_names_stmt(inner, out),
        _ => {}
    }
}

/// Lexically scoped names of a `let`/`const` declaration
fn lexical_names(decl: &VarDecl) -> Vec<&Ident> {
    let mut names = Vec::new();
    for d in &decl.decls {
        pattern_idents(&d.pattern, &mut names);
    }
    names
}

impl Interpreter {
    /// Instantiate the declarations of a statement list: functions are
    /// initialized, `let`/`const`/`class` enter their dead zone, and at
    /// function level every nested `var` is declared
    pub(crate) fn hoist_declarations(
        &self,
        stmts: &[Stmt],
        cx: &Cx,
        function_level: bool,
    ) -> JsResult<()> {
        if function_level {
            let mut vars = Vec::new();
            collect_var_names(stmts, &mut vars);
            for ident in vars {
                cx.env.declare_var(&ident.name);
            }
        }
        for stmt in stmts {
            let stmt = match &stmt.kind {
                StmtKind::Export(ExportDecl::Decl(inner)) => inner.as_ref(),
                StmtKind::Export(ExportDecl::Default(default)) => {
                    match default.as_ref() {
                        DefaultExport::Function(f) => {
                            let func = self.make_closure(f, cx, ClosureKind::Normal, None);
                            let value = Value::Object(func);
                            self.set_function_name(&value, "default");
                            if let Some(name) = &f.name {
                                cx.env.declare(&name.name, value.clone(), true);
                            }
                            cx.env.declare(DEFAULT_EXPORT, value, false);
                        }
                        DefaultExport::Class(c) => {
                            if let Some(name) = &c.name {
                                cx.env.declare_uninitialized(&name.name, true);
                            }
                            cx.env.declare_uninitialized(DEFAULT_EXPORT, false);
                        }
                        DefaultExport::Expr(_) => cx.env.declare_uninitialized(DEFAULT_EXPORT, false),
                    }
                    continue;
                }
                _ => stmt,
            };
            match &stmt.kind {
                StmtKind::Function(f) => {
                    if let Some(name) = &f.name {
                        let func = self.make_closure(f, cx, ClosureKind::Normal, None);
                        cx.env.declare(&name.name, Value::Object(func), true);
                    }
                }
                StmtKind::Var(decl) if decl.kind != VarKind::Var => {
                    for ident in lexical_names(decl) {
                        cx.env.declare_uninitialized(&ident.name, decl.kind == VarKind::Let);
                    }
                }
                StmtKind::Class(c) => {
                    if let Some(name) = &c.name {
                        cx.env.declare_uninitialized(&name.name, true);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Run statements in order until one completes abruptly
    pub(crate) async fn exec_stmts(
        &self,
        stmts: &[Stmt],
        cx: &Cx,
    ) -> JsResult<Completion> {
        for stmt in stmts {
            match self.exec(stmt, cx).await? {
                Completion::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Completion::Normal)
    }

    /// Run a block in a fresh scope
    async fn exec_block(
        &self,
        stmts: &[Stmt],
        cx: &Cx,
    ) -> JsResult<Completion> {
        let block = cx.with_env(cx.env.child());
        self.hoist_declarations(stmts, &block, false)?;
        self.exec_stmts(stmts, &block).await
    }

    pub(crate) fn exec<'a>(
        &'a self,
        stmt: &'a Stmt,
        cx: &'a Cx,
    ) -> BoxFuture<'a, JsResult<Completion>> {
        self.exec_labeled(stmt, cx, Vec::new())
    }

    fn exec_labeled<'a>(
        &'a self,
        stmt: &'a Stmt,
        cx: &'a Cx,
        labels: Vec<String>,
    ) -> BoxFuture<'a, JsResult<Completion>> {
        Box::pin(async move {
            match &stmt.kind {
                StmtKind::Expr(e) => {
                    self.eval(e, cx).await?;
                    Ok(Completion::Normal)
                }
                StmtKind::Var(decl) => {
                    self.exec_var(decl, cx).await?;
                    Ok(Completion::Normal)
                }
                StmtKind::Function(_)
                | StmtKind::Import(_)
                | StmtKind::TypeDecl(_)
                | StmtKind::Declare(_)
                | StmtKind::Namespace { .. }
                | StmtKind::Empty
                | StmtKind::Debugger => Ok(Completion::Normal),
                StmtKind::Class(c) => {
                    let ctor = self.define_class(c, cx, None).await?;
                    if let Some(name) = &c.name {
                        cx.env.initialize(&name.name, Value::Object(ctor));
                    }
                    Ok(Completion::Normal)
                }
                StmtKind::Enum(e) => Err(self.syntax_error(format!(
                    "enum '{}' reached the evaluator without being lowered",
                    e.name.name
                ))),
                StmtKind::Export(export) => {
                    match export {
                        ExportDecl::Decl(inner) => return self.exec(inner, cx).await,
                        ExportDecl::Default(default) => match default.as_ref() {
                            DefaultExport::Function(_) => {}
                            DefaultExport::Class(c) => {
                                let ctor = Value::Object(self.define_class(c, cx, Some("default")).await?);
                                if let Some(name) = &c.name {
                                    cx.env.initialize(&name.name, ctor.clone());
                                }
                                cx.env.initialize(DEFAULT_EXPORT, ctor);
                            }
                            DefaultExport::Expr(e) => {
                                let v = self.eval(e, cx).await?;
                                if is_anonymous_function(e) {
                                    self.set_function_name(&v, "default");
                                }
                                cx.env.initialize(DEFAULT_EXPORT, v);
                            }
                        },
                        ExportDecl::Named { .. } | ExportDecl::All { .. } => {}
                    }
                    Ok(Completion::Normal)
                }
                StmtKind::Block(body) => self.exec_block(body, cx).await,
                StmtKind::If { test, cons, alt } => {
                    if self.eval(test, cx).await?.to_boolean() {
                        self.exec(cons, cx).await
                    } else if let Some(alt) = alt {
                        self.exec(alt, cx).await
                    } else {
                        Ok(Completion::Normal)
                    }
                }
                StmtKind::For {
                    init,
                    test,
                    update,
                    body,
                } => self.exec_for(init.as_ref(), test.as_ref(), update.as_ref(), body, cx, &labels).await,
                StmtKind::ForIn { left, right, body } => {
                    let target = self.eval(right, cx).await?;
                    if target.is_nullish() {
                        return Ok(Completion::Normal);
                    }
                    let obj = self.to_object(&target)?;
                    for key in self.for_in_keys(&obj) {
                        let iter_cx = cx.with_env(cx.env.child());
                        self.bind_for_head(left, key.to_value(), &iter_cx).await?;
                        match loop_flow(self.exec(body, &iter_cx).await?, &labels) {
                            LoopFlow::Next => {}
                            LoopFlow::Exit => break,
                            LoopFlow::Propagate(c) => return Ok(c),
                        }
                    }
                    Ok(Completion::Normal)
                }
                StmtKind::ForOf {
                    left,
                    right,
                    body,
                    is_await,
                } => {
                    let iterable = self.eval(right, cx).await?;
                    let mut record = if *is_await {
                        self.get_async_iterator(&iterable).await?
                    } else {
                        self.get_iterator(&iterable).await?
                    };
                    loop {
                        let Some(value) = self.iter_next(&mut record).await? else {
                            return Ok(Completion::Normal);
                        };
                        let iter_cx = cx.with_env(cx.env.child());
                        let step = async {
                            let value = if *is_await {
                                self.await_value(value).await?
                            } else {
                                value
                            };
                            self.bind_for_head(left, value, &iter_cx).await?;
                            self.exec(body, &iter_cx).await
                        }
                        .await;
                        let completion = match step {
                            Ok(c) => c,
                            Err(e) => {
                                let _ = self.iter_close(&record).await;
                                return Err(e);
                            }
                        };
                        match loop_flow(completion, &labels) {
                            LoopFlow::Next => {}
                            LoopFlow::Exit => {
                                self.iter_close(&record).await?;
                                return Ok(Completion::Normal);
                            }
                            LoopFlow::Propagate(c) => {
                                self.iter_close(&record).await?;
                                return Ok(c);
                            }
                        }
                    }
                }
                StmtKind::While { test, body } => {
                    while self.eval(test, cx).await?.to_boolean() {
                        match loop_flow(self.exec(body, cx).await?, &labels) {
                            LoopFlow::Next => {}
                            LoopFlow::Exit => break,
                            LoopFlow::Propagate(c) => return Ok(c),
                        }
                    }
                    Ok(Completion::Normal)
                }
                StmtKind::DoWhile { body, test } => {
                    loop {
                        match loop_flow(self.exec(body, cx).await?, &labels) {
                            LoopFlow::Next => {}
                            LoopFlow::Exit => break,
                            LoopFlow::Propagate(c) => return Ok(c),
                        }
                        if !self.eval(test, cx).await?.to_boolean() {
                            break;
                        }
                    }
                    Ok(Completion::Normal)
                }
                StmtKind::Return(arg) => {
                    let v = match arg {
                        Some(e) => self.eval(e, cx).await?,
                        None => Value::Undefined,
                    };
                    Ok(Completion::Return(v))
                }
                StmtKind::Break(label) => Ok(Completion::Break(label.as_ref().map(|l| l.name.clone()))),
                StmtKind::Continue(label) => Ok(Completion::Continue(label.as_ref().map(|l| l.name.clone()))),
                StmtKind::Throw(e) => Err(Throw(self.eval(e, cx).await?)),
                StmtKind::Try {
                    block,
                    handler,
                    finalizer,
                } => {
                    let mut result = self.exec_block(block, cx).await;
                    if let (Err(throw), Some(handler)) = (&result, handler) {
                        if !self.is_generator_return(throw) {
                            let thrown = throw.0.clone();
                            let catch_cx = cx.with_env(cx.env.child());
                            result = async {
                                if let Some(param) = &handler.param {
                                    self.bind_pattern(param, thrown, BindMode::Let, &catch_cx).await?;
                                }
                                self.exec_block(&handler.body, &catch_cx).await
                            }
                            .await;
                        }
                    }
                    if let Some(finalizer) = finalizer {
                        match self.exec_block(finalizer, cx).await? {
                            Completion::Normal => {}
                            abrupt => return Ok(abrupt),
                        }
                    }
                    result
                }
                StmtKind::Switch { discriminant, cases } => {
                    let value = self.eval(discriminant, cx).await?;
                    let switch_cx = cx.with_env(cx.env.child());
                    for case in cases {
                        self.hoist_declarations(&case.body, &switch_cx, false)?;
                    }
                    let mut start = None;
                    for (i, case) in cases.iter().enumerate() {
                        if let Some(test) = &case.test {
                            let candidate = self.eval(test, &switch_cx).await?;
                            if candidate.strict_equals(&value) {
                                start = Some(i);
                                break;
                            }
                        }
                    }
                    let start = start.or_else(|| cases.iter().position(|c| c.test.is_none()));
                    let Some(start) = start else {
                        return Ok(Completion::Normal);
                    };
                    for case in &cases[start..] {
                        match self.exec_stmts(&case.body, &switch_cx).await? {
                            Completion::Normal => {}
                            Completion::Break(None) => return Ok(Completion::Normal),
                            Completion::Break(Some(l)) if labels.contains(&l) => return Ok(Completion::Normal),
                            other => return Ok(other),
                        }
                    }
                    Ok(Completion::Normal)
                }
                StmtKind::Labeled { label, body } => {
                    let mut labels = labels;
                    labels.push(label.name.clone());
                    let completion = self.exec_labeled(body, cx, labels).await?;
                    match completion {
                        Completion::Break(Some(l)) if l == label.name => Ok(Completion::Normal),
                        other => Ok(other),
                    }
                }
            }
        })
    }

    async fn exec_var(
        &self,
        decl: &VarDecl,
        cx: &Cx,
    ) -> JsResult<()> {
        let mode = match decl.kind {
            VarKind::Var => BindMode::Var,
            VarKind::Let => BindMode::Let,
            VarKind::Const => BindMode::Const,
        };
        for d in &decl.decls {
            let value = match &d.init {
                Some(init) => {
                    let v = self.eval(init, cx).await?;
                    if let PatternKind::Ident(id) = &d.pattern.kind {
                        if is_anonymous_function(init) {
                            self.set_function_name(&v, &id.name);
                        }
                    }
                    v
                }
                // `var x;` keeps the hoisted value
                None if mode == BindMode::Var => continue,
                None => Value::Undefined,
            };
            self.bind_pattern(&d.pattern, value, mode, cx).await?;
        }
        Ok(())
    }

    /// `for (init; test; update)` with a fresh copy of `let` bindings per iteration
    async fn exec_for(
        &self,
        init: Option<&ForInit>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        cx: &Cx,
        labels: &[String],
    ) -> JsResult<Completion> {
        let mut iter_cx = cx.with_env(cx.env.child());
        let mut per_iteration = Vec::new();
        match init {
            Some(ForInit::Var(decl)) => {
                if decl.kind != VarKind::Var {
                    per_iteration = lexical_names(decl).into_iter().map(|i| i.name.clone()).collect();
                }
                self.exec_var(decl, &iter_cx).await?;
            }
            Some(ForInit::Expr(e)) => {
                self.eval(e, &iter_cx).await?;
            }
            None => {}
        }
        loop {
            if let Some(test) = test {
                if !self.eval(test, &iter_cx).await?.to_boolean() {
                    break;
                }
            }
            match loop_flow(self.exec(body, &iter_cx).await?, labels) {
                LoopFlow::Next => {}
                LoopFlow::Exit => break,
                LoopFlow::Propagate(c) => return Ok(c),
            }
            if !per_iteration.is_empty() {
                iter_cx = cx.with_env(copy_bindings(&iter_cx.env, &cx.env, &per_iteration));
            }
            if let Some(update) = update {
                self.eval(update, &iter_cx).await?;
            }
        }
        Ok(Completion::Normal)
    }

    async fn bind_for_head(
        &self,
        head: &ForHead,
        value: Value,
        cx: &Cx,
    ) -> JsResult<()> {
        match head {
            ForHead::Var(kind, pattern) => {
                let mode = match kind {
                    VarKind::Var => BindMode::Var,
                    VarKind::Let => BindMode::Let,
                    VarKind::Const => BindMode::Const,
                };
                self.bind_pattern(pattern, value, mode, cx).await
            }
            ForHead::Pattern(pattern) => self.bind_pattern(pattern, value, BindMode::Assign, cx).await,
        }
    }

    /// Enumerable string keys of `obj` and its prototypes, shadowed keys once
    fn for_in_keys(
        &self,
        obj: &Obj,
    ) -> Vec<PropertyKey> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        let mut current = Some(obj.clone());
        while let Some(o) = current {
            let object = o.lock();
            for key in object.own_keys() {
                if !matches!(key, PropertyKey::String(_)) || !seen.insert(key.clone()) {
                    continue;
                }
                if object.get_own(&key).map(|p| p.enumerable).unwrap_or(false) {
                    keys.push(key);
                }
            }
            current = object.proto.clone();
        }
        keys
    }
}

/// New iteration scope holding copies of the loop's `let` bindings
fn copy_bindings(
    from: &Env,
    parent: &Env,
    names: &[String],
) -> Env {
    let next = parent.child();
    for name in names {
        if let super::env::Lookup::Found(v) = from.lookup_local(name) {
            next.declare(name, v, true);
        }
    }
    next
}
