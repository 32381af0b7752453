//! Binding and assignment patterns

use std::collections::HashSet;

use super::env::Assign;
use super::{BoxFuture, Cx, Interpreter, JsResult};
use crate::frontend::parser::ast::{Expr, ExprKind, Pattern, PatternKind};
use crate::runtime::value::{PropertyKey, Value};

/// What a pattern does with the names it binds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindMode {
    Let,
    Const,
    /// Assign the hoisted `var` binding
    Var,
    Param,
    /// Plain assignment expression
    Assign,
}

/// Anonymous function or class expression that takes its name from the binding
pub(crate) fn is_anonymous_function(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Function(f) => f.name.is_none(),
        ExprKind::Arrow(_) => true,
        ExprKind::Class(c) => c.name.is_none(),
        ExprKind::Paren(inner) | ExprKind::TypeCast(inner) => is_anonymous_function(inner),
        _ => false,
    }
}

impl Interpreter {
    /// Bind `value` to `pattern`
    pub(crate) fn bind_pattern<'a>(
        &'a self,
        pattern: &'a Pattern,
        value: Value,
        mode: BindMode,
        cx: &'a Cx,
    ) -> BoxFuture<'a, JsResult<()>> {
        Box::pin(async move {
            match &pattern.kind {
                PatternKind::Ident(id) => self.bind_name(&id.name, value, mode, cx).await,
                PatternKind::Default { target, default } => {
                    let value = if value.is_undefined() {
                        let v = self.eval(default, cx).await?;
                        if let PatternKind::Ident(id) = &target.kind {
                            if is_anonymous_function(default) {
                                self.set_function_name(&v, &id.name);
                            }
                        }
                        v
                    } else {
                        value
                    };
                    self.bind_pattern(target, value, mode, cx).await
                }
                PatternKind::Object { props, rest } => {
                    if value.is_nullish() {
                        return Err(self.type_error(format!(
                            "Cannot destructure '{}' as it is {}.",
                            super::property::describe_value(&value),
                            value.type_of().replace("object", "null")
                        )));
                    }
                    let mut used = HashSet::new();
                    for prop in props {
                        let key = self.eval_prop_name(&prop.key, cx).await?;
                        let v = self.get(&value, &key).await?;
                        used.insert(key);
                        self.bind_pattern(&prop.value, v, mode, cx).await?;
                    }
                    if let Some(rest) = rest {
                        let source = self.to_object(&value)?;
                        let copy = self.new_object();
                        for key in self.own_enumerable_keys(&source) {
                            if used.contains(&key) {
                                continue;
                            }
                            let v = self.get(&value, &key).await?;
                            copy.lock().insert(key, v);
                        }
                        self.bind_pattern(rest, Value::Object(copy), mode, cx).await?;
                    }
                    Ok(())
                }
                PatternKind::Array { elems, rest } => {
                    let mut record = self.get_iterator(&value).await?;
                    let mut done = false;
                    let result = async {
                        for elem in elems {
                            let v = if done {
                                None
                            } else {
                                self.iter_next(&mut record).await?
                            };
                            done = v.is_none();
                            if let Some(elem) = elem {
                                self.bind_pattern(elem, v.unwrap_or_default(), mode, cx).await?;
                            }
                        }
                        if let Some(rest) = rest {
                            let mut items = Vec::new();
                            while !done {
                                match self.iter_next(&mut record).await? {
                                    Some(v) => items.push(v),
                                    None => done = true,
                                }
                            }
                            let array = self.new_array(items);
                            self.bind_pattern(rest, Value::Object(array), mode, cx).await?;
                        }
                        Ok(())
                    }
                    .await;
                    if let Err(e) = result {
                        if !done {
                            let _ = self.iter_close(&record).await;
                        }
                        return Err(e);
                    }
                    if !done {
                        self.iter_close(&record).await?;
                    }
                    Ok(())
                }
                PatternKind::Expr(expr) => self.assign_to_expr(expr, value, cx).await,
            }
        })
    }

    async fn bind_name(
        &self,
        name: &str,
        value: Value,
        mode: BindMode,
        cx: &Cx,
    ) -> JsResult<()> {
        match mode {
            BindMode::Let | BindMode::Param => {
                cx.env.declare(name, value, true);
                Ok(())
            }
            BindMode::Const => {
                cx.env.declare(name, value, false);
                Ok(())
            }
            BindMode::Var => match cx.env.assign(name, value.clone()) {
                Assign::Done => Ok(()),
                _ => {
                    cx.env.declare(name, value, true);
                    Ok(())
                }
            },
            BindMode::Assign => self.assign_name(name, value, cx).await,
        }
    }

    /// `name = value` through the scope chain, then the global object
    pub(crate) async fn assign_name(
        &self,
        name: &str,
        value: Value,
        cx: &Cx,
    ) -> JsResult<()> {
        match cx.env.assign(name, value.clone()) {
            Assign::Done => Ok(()),
            Assign::Const => Err(self.type_error("Assignment to constant variable.")),
            Assign::Uninitialized => Err(self.reference_error(format!("Cannot access '{}' before initialization", name))),
            Assign::Missing => {
                let key = PropertyKey::from(name);
                if self.has_property(self.global(), &key) {
                    let global = Value::Object(self.global().clone());
                    self.set(&global, key, value).await
                } else {
                    Err(self.reference_error(format!("{} is not defined", name)))
                }
            }
        }
    }
}
