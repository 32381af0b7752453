//! Expression evaluation

use std::sync::Arc;

use num_bigint::BigInt;

use super::function::method_label;
use super::generator::Resume;
use super::iterator::IterRecord;
use super::pattern::{is_anonymous_function, BindMode};
use super::property::{describe_value, Found};
use super::{BoxFuture, Cx, Interpreter, JsResult, Throw};
use crate::frontend::parser::ast::{
    AssignOp, Expr, ExprKind, ExprOrSpread, Lit, LogicalOp, MemberProp, Pattern, PatternKind, Prop, PropName,
    Template, UnaryOp, UpdateOp,
};
use crate::runtime::value::{ClosureKind, Obj, Property, PropertyKey, Value};

/// Assignable location
enum Reference<'a> {
    Name(&'a str),
    Property { base: Value, key: PropertyKey },
    Super { this: Value, key: PropertyKey },
}

impl Interpreter {
    /// Evaluate an expression
    pub(crate) fn eval<'a>(
        &'a self,
        expr: &'a Expr,
        cx: &'a Cx,
    ) -> BoxFuture<'a, JsResult<Value>> {
        Box::pin(async move {
            match &expr.kind {
                ExprKind::Ident(id) => self.lookup_name(&id.name, cx).await,
                ExprKind::This => self.this_value(cx),
                ExprKind::Super => Err(self.syntax_error("'super' keyword unexpected here")),
                ExprKind::Lit(lit) => self.eval_lit(lit),
                ExprKind::Template(t) => self.eval_template(t, cx).await,
                ExprKind::TaggedTemplate { tag, quasi } => {
                    let (this, func) = match self.eval_callee(tag, cx).await? {
                        Some(pair) => pair,
                        None => (Value::Undefined, Value::Undefined),
                    };
                    let mut args = vec![self.template_strings(quasi)];
                    for e in &quasi.exprs {
                        args.push(self.eval(e, cx).await?);
                    }
                    self.call_checked(&func, this, args, tag, cx).await
                }
                ExprKind::Array(elems) => {
                    let mut items = Vec::with_capacity(elems.len());
                    for elem in elems {
                        match elem {
                            None => items.push(Value::Undefined),
                            Some(ExprOrSpread { spread: true, expr }) => {
                                let v = self.eval(expr, cx).await?;
                                items.extend(self.iterate_to_vec(&v).await?);
                            }
                            Some(ExprOrSpread { expr, .. }) => items.push(self.eval(expr, cx).await?),
                        }
                    }
                    Ok(Value::Object(self.new_array(items)))
                }
                ExprKind::Object(props) => self.eval_object(props, cx).await,
                ExprKind::Function(f) => {
                    let Some(name) = &f.name else {
                        return Ok(Value::Object(self.make_closure(f, cx, ClosureKind::Normal, None)));
                    };
                    // a named function expression sees its own name
                    let scope = cx.with_env(cx.env.child());
                    let func = self.make_closure(f, &scope, ClosureKind::Normal, None);
                    scope.env.declare(&name.name, Value::Object(func.clone()), false);
                    Ok(Value::Object(func))
                }
                ExprKind::Arrow(f) => Ok(Value::Object(self.make_closure(f, cx, ClosureKind::Arrow, None))),
                ExprKind::Class(c) => Ok(Value::Object(self.define_class(c, cx, None).await?)),
                ExprKind::Unary { op, arg } => match op {
                    UnaryOp::Delete => self.eval_delete(arg, cx).await,
                    UnaryOp::Typeof => {
                        if let ExprKind::Ident(id) = &unwrap_parens(arg).kind {
                            if !self.name_exists(&id.name, cx) {
                                return Ok(Value::str("undefined"));
                            }
                        }
                        let v = self.eval(arg, cx).await?;
                        Ok(Value::str(v.type_of()))
                    }
                    op => {
                        let v = self.eval(arg, cx).await?;
                        self.unary_op(*op, v).await
                    }
                },
                ExprKind::Update { op, prefix, arg } => {
                    let reference = self.eval_reference(arg, cx).await?;
                    let old = self.get_reference(&reference, cx).await?;
                    let old = self.to_numeric(&old).await?;
                    let delta = if *op == UpdateOp::Inc { 1 } else { -1 };
                    let new = self.increment(&old, delta);
                    self.put_reference(&reference, new.clone(), cx).await?;
                    Ok(if *prefix { new } else { old })
                }
                ExprKind::Binary { op, left, right } => {
                    let l = self.eval(left, cx).await?;
                    let r = self.eval(right, cx).await?;
                    self.binary_op(*op, l, r).await
                }
                ExprKind::Logical { op, left, right } => {
                    let l = self.eval(left, cx).await?;
                    let short = match op {
                        LogicalOp::And => !l.to_boolean(),
                        LogicalOp::Or => l.to_boolean(),
                        LogicalOp::Nullish => !l.is_nullish(),
                    };
                    if short {
                        Ok(l)
                    } else {
                        self.eval(right, cx).await
                    }
                }
                ExprKind::Assign { op, target, value } => self.eval_assign(*op, target, value, cx).await,
                ExprKind::Conditional { test, cons, alt } => {
                    if self.eval(test, cx).await?.to_boolean() {
                        self.eval(cons, cx).await
                    } else {
                        self.eval(alt, cx).await
                    }
                }
                ExprKind::Call { .. } | ExprKind::Member { .. } => {
                    Ok(self.eval_opt(expr, cx).await?.unwrap_or_default())
                }
                ExprKind::OptChain(inner) => Ok(self.eval_opt(inner, cx).await?.unwrap_or_default()),
                ExprKind::New { callee, args } => {
                    let func = self.eval(callee, cx).await?;
                    let args = self.eval_args(args, cx).await?;
                    if !self.is_constructor(&func) {
                        return Err(self.type_error(format!("{} is not a constructor", expr_text(callee, cx))));
                    }
                    self.construct(&func, args, None).await
                }
                ExprKind::Seq(exprs) => {
                    let mut last = Value::Undefined;
                    for e in exprs {
                        last = self.eval(e, cx).await?;
                    }
                    Ok(last)
                }
                ExprKind::Paren(inner) | ExprKind::TypeCast(inner) => self.eval(inner, cx).await,
                ExprKind::Await(arg) => {
                    let v = self.eval(arg, cx).await?;
                    self.await_value(v).await
                }
                ExprKind::Yield { arg, delegate } => self.eval_yield(arg.as_deref(), *delegate, cx).await,
                ExprKind::Import(specifier) => {
                    let specifier = self.eval(specifier, cx).await?;
                    let promise = self.new_promise();
                    let loaded = match self.to_string(&specifier).await {
                        Ok(s) => self.import_module(&s, &self.referrer_of(&cx.env)).await,
                        Err(e) => Err(e),
                    };
                    match loaded {
                        Ok(namespace) => self.resolve_promise(&promise, namespace),
                        Err(Throw(e)) => self.reject_promise(&promise, e),
                    }
                    Ok(Value::Object(promise))
                }
                ExprKind::MetaProperty { meta, property } => self.meta_property(meta, property, cx),
            }
        })
    }

    fn eval_lit(
        &self,
        lit: &Lit,
    ) -> JsResult<Value> {
        Ok(match lit {
            Lit::Null => Value::Null,
            Lit::Bool(b) => Value::Bool(*b),
            Lit::Number(n) => Value::Number(*n),
            Lit::BigInt(digits) => match digits.parse::<BigInt>() {
                Ok(n) => Value::bigint(n),
                Err(_) => return Err(self.syntax_error(format!("Invalid BigInt literal {}n", digits))),
            },
            Lit::String(s) => Value::str(s),
            Lit::Regex { pattern, flags } => {
                Value::Object(super::builtins::regexp::new_regexp(self, pattern, flags)?)
            }
        })
    }

    /// Identifier read
    pub(crate) async fn lookup_name(
        &self,
        name: &str,
        cx: &Cx,
    ) -> JsResult<Value> {
        match cx.env.lookup(name) {
            super::env::Lookup::Found(v) => Ok(v),
            super::env::Lookup::Uninitialized => {
                Err(self.reference_error(format!("Cannot access '{}' before initialization", name)))
            }
            super::env::Lookup::Missing => {
                let key = PropertyKey::from(name);
                if self.has_property(self.global(), &key) {
                    let global = Value::Object(self.global().clone());
                    self.get(&global, &key).await
                } else {
                    Err(self.reference_error(format!("{} is not defined", name)))
                }
            }
        }
    }

    fn name_exists(
        &self,
        name: &str,
        cx: &Cx,
    ) -> bool {
        !matches!(cx.env.lookup(name), super::env::Lookup::Missing)
            || self.has_property(self.global(), &PropertyKey::from(name))
    }

    fn this_value(
        &self,
        cx: &Cx,
    ) -> JsResult<Value> {
        cx.env.this_value().ok_or_else(|| {
            self.reference_error(
                "Must call super constructor in derived class before accessing 'this' or returning from derived constructor",
            )
        })
    }

    /// Member and call chains; `None` when a `?.` short-circuits
    fn eval_opt<'a>(
        &'a self,
        expr: &'a Expr,
        cx: &'a Cx,
    ) -> BoxFuture<'a, JsResult<Option<Value>>> {
        Box::pin(async move {
            match &expr.kind {
                ExprKind::Member {
                    object,
                    property,
                    optional,
                } => {
                    if let ExprKind::Super = object.kind {
                        let key = self.member_key(property, cx).await?;
                        return self.super_get(key, cx).await.map(Some);
                    }
                    let Some(base) = self.eval_opt(object, cx).await? else {
                        return Ok(None);
                    };
                    if *optional && base.is_nullish() {
                        return Ok(None);
                    }
                    let key = self.member_key(property, cx).await?;
                    if base.is_nullish() {
                        return Err(self.type_error(format!(
                            "Cannot read properties of {} (reading '{}')",
                            describe_value(&base),
                            key
                        )));
                    }
                    if let PropertyKey::Private(_) = &key {
                        self.check_private(&base, &key)?;
                    }
                    self.get(&base, &key).await.map(Some)
                }
                ExprKind::Call {
                    callee,
                    args,
                    optional,
                } => {
                    if let ExprKind::Super = callee.kind {
                        let args = self.eval_args(args, cx).await?;
                        return self.super_call(args, cx).await.map(Some);
                    }
                    let Some((this, func)) = self.eval_callee(callee, cx).await? else {
                        return Ok(None);
                    };
                    if *optional && func.is_nullish() {
                        return Ok(None);
                    }
                    let args = self.eval_args(args, cx).await?;
                    self.call_checked(&func, this, args, callee, cx).await.map(Some)
                }
                _ => self.eval(expr, cx).await.map(Some),
            }
        })
    }

    /// Callee and receiver of a call; `None` when a `?.` short-circuits
    fn eval_callee<'a>(
        &'a self,
        callee: &'a Expr,
        cx: &'a Cx,
    ) -> BoxFuture<'a, JsResult<Option<(Value, Value)>>> {
        Box::pin(async move {
            match &callee.kind {
                ExprKind::Member {
                    object,
                    property,
                    optional,
                } => {
                    if let ExprKind::Super = object.kind {
                        let key = self.member_key(property, cx).await?;
                        let this = self.this_value(cx)?;
                        let func = self.super_get(key, cx).await?;
                        return Ok(Some((this, func)));
                    }
                    let Some(base) = self.eval_opt(object, cx).await? else {
                        return Ok(None);
                    };
                    if *optional && base.is_nullish() {
                        return Ok(None);
                    }
                    let key = self.member_key(property, cx).await?;
                    if base.is_nullish() {
                        return Err(self.type_error(format!(
                            "Cannot read properties of {} (reading '{}')",
                            describe_value(&base),
                            key
                        )));
                    }
                    if let PropertyKey::Private(_) = &key {
                        self.check_private(&base, &key)?;
                    }
                    let func = self.get(&base, &key).await?;
                    Ok(Some((base, func)))
                }
                // `(a.b)()` keeps the receiver
                ExprKind::Paren(inner) | ExprKind::TypeCast(inner) | ExprKind::OptChain(inner) => {
                    match self.eval_callee(inner, cx).await? {
                        Some(pair) => Ok(Some(pair)),
                        None => Ok(Some((Value::Undefined, Value::Undefined))),
                    }
                }
                ExprKind::Call { .. } => match self.eval_opt(callee, cx).await? {
                    Some(func) => Ok(Some((Value::Undefined, func))),
                    None => Ok(None),
                },
                _ => Ok(Some((Value::Undefined, self.eval(callee, cx).await?))),
            }
        })
    }

    /// Call with a "`<callee text>` is not a function" error
    async fn call_checked(
        &self,
        func: &Value,
        this: Value,
        args: Vec<Value>,
        callee: &Expr,
        cx: &Cx,
    ) -> JsResult<Value> {
        if !self.is_callable(func) {
            return Err(self.type_error(format!("{} is not a function", expr_text(callee, cx))));
        }
        self.call(func, this, args).await
    }

    /// Private names are only readable on objects that have them
    fn check_private(
        &self,
        base: &Value,
        key: &PropertyKey,
    ) -> JsResult<()> {
        let has = match base {
            Value::Object(obj) => self.has_property(obj, key),
            _ => false,
        };
        if has {
            Ok(())
        } else {
            Err(self.type_error(format!(
                "Cannot read private member {} from an object whose class did not declare it",
                key
            )))
        }
    }

    pub(crate) async fn eval_args(
        &self,
        args: &[ExprOrSpread],
        cx: &Cx,
    ) -> JsResult<Vec<Value>> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            let v = self.eval(&arg.expr, cx).await?;
            if arg.spread {
                out.extend(self.iterate_to_vec(&v).await?);
            } else {
                out.push(v);
            }
        }
        Ok(out)
    }

    async fn member_key(
        &self,
        property: &MemberProp,
        cx: &Cx,
    ) -> JsResult<PropertyKey> {
        match property {
            MemberProp::Ident(id) => Ok(PropertyKey::from(id.name.as_str())),
            MemberProp::Private(id) => Ok(PropertyKey::Private(Arc::from(id.name.as_str()))),
            MemberProp::Computed(e) => {
                let v = self.eval(e, cx).await?;
                self.to_property_key(&v).await
            }
        }
    }

    /// Object whose prototype `super` refers to
    fn super_base(
        &self,
        cx: &Cx,
    ) -> JsResult<Option<Obj>> {
        let home = cx.env.frame().and_then(|f| f.home.clone());
        match home {
            Some(home) => Ok(home.proto()),
            None => Err(self.syntax_error("'super' keyword unexpected here")),
        }
    }

    /// `super[key]` with `this` as receiver
    async fn super_get(
        &self,
        key: PropertyKey,
        cx: &Cx,
    ) -> JsResult<Value> {
        let this = self.this_value(cx)?;
        let Some(base) = self.super_base(cx)? else {
            return Ok(Value::Undefined);
        };
        match self.lookup(&Value::Object(base), &key)? {
            Found::Value(v) => Ok(v),
            Found::Getter(getter) => self.call_function(&getter, this, Vec::new()).await,
            Found::Missing => Ok(Value::Undefined),
        }
    }

    async fn eval_template(
        &self,
        template: &Template,
        cx: &Cx,
    ) -> JsResult<Value> {
        let mut out = String::new();
        for (i, chunk) in template.quasis.iter().enumerate() {
            out.push_str(chunk.cooked.as_deref().unwrap_or(&chunk.raw));
            if let Some(e) = template.exprs.get(i) {
                let v = self.eval(e, cx).await?;
                out.push_str(&self.to_string(&v).await?);
            }
        }
        Ok(Value::from(out))
    }

    /// First argument of a tag function: cooked strings with a `raw` array
    fn template_strings(
        &self,
        template: &Template,
    ) -> Value {
        let cooked = template
            .quasis
            .iter()
            .map(|c| c.cooked.as_deref().map(Value::str).unwrap_or_default())
            .collect();
        let raw = template.quasis.iter().map(|c| Value::str(&c.raw)).collect();
        let strings = self.new_array(cooked);
        let raw = self.new_array(raw);
        raw.lock().frozen = true;
        {
            let mut object = strings.lock();
            object.define("raw", Property::hidden(Value::Object(raw)));
            object.frozen = true;
        }
        Value::Object(strings)
    }

    async fn eval_object(
        &self,
        props: &[Prop],
        cx: &Cx,
    ) -> JsResult<Value> {
        let obj = self.new_object();
        for prop in props {
            match prop {
                Prop::KeyValue { key, value } => {
                    let is_proto = matches!(key.static_name().as_deref(), Some("__proto__"))
                        && !matches!(key, PropName::Computed(_));
                    let k = self.eval_prop_name(key, cx).await?;
                    let v = self.eval(value, cx).await?;
                    if is_proto {
                        match v {
                            Value::Object(p) => obj.lock().proto = Some(p),
                            Value::Null => obj.lock().proto = None,
                            _ => {}
                        }
                        continue;
                    }
                    if is_anonymous_function(value) {
                        self.set_function_name(&v, &k.to_string());
                    }
                    self.create_data_property(&obj, k, v);
                }
                Prop::Shorthand(id) => {
                    let v = self.lookup_name(&id.name, cx).await?;
                    self.create_data_property(&obj, id.name.as_str(), v);
                }
                Prop::Method { key, kind, func } => {
                    let k = self.eval_prop_name(key, cx).await?;
                    let method = self.make_closure(func, cx, ClosureKind::Method, Some(obj.clone()));
                    self.set_function_name(&Value::Object(method.clone()), &method_label(*kind, &k));
                    self.define_method_property(&obj, k, method, *kind, true);
                }
                Prop::Spread(expr) => {
                    let v = self.eval(expr, cx).await?;
                    self.copy_data_properties(&obj, &v).await?;
                }
            }
        }
        Ok(Value::Object(obj))
    }

    /// `{ ...source }`: copy own enumerable properties
    pub(crate) async fn copy_data_properties(
        &self,
        target: &Obj,
        source: &Value,
    ) -> JsResult<()> {
        if source.is_nullish() {
            return Ok(());
        }
        let from = self.to_object(source)?;
        let keys: Vec<PropertyKey> = {
            let object = from.lock();
            object
                .own_keys()
                .into_iter()
                .filter(|k| object.get_own(k).map(|p| p.enumerable).unwrap_or(false))
                .collect()
        };
        let from = Value::Object(from);
        for key in keys {
            let v = self.get(&from, &key).await?;
            self.create_data_property(target, key, v);
        }
        Ok(())
    }

    async fn eval_delete(
        &self,
        arg: &Expr,
        cx: &Cx,
    ) -> JsResult<Value> {
        match &unwrap_parens(arg).kind {
            ExprKind::Member { object, property, .. } => {
                let base = self.eval(object, cx).await?;
                let key = self.member_key(property, cx).await?;
                match &base {
                    Value::Object(obj) => Ok(Value::Bool(self.delete_property(obj, &key)?)),
                    Value::Undefined | Value::Null => Err(self.type_error("Cannot convert undefined or null to object")),
                    _ => Ok(Value::Bool(true)),
                }
            }
            ExprKind::OptChain(inner) => match self.eval_opt_delete(inner, cx).await? {
                Some(v) => Ok(v),
                None => Ok(Value::Bool(true)),
            },
            ExprKind::Ident(_) => Ok(Value::Bool(false)),
            _ => {
                self.eval(arg, cx).await?;
                Ok(Value::Bool(true))
            }
        }
    }

    /// `delete a?.b`
    async fn eval_opt_delete(
        &self,
        expr: &Expr,
        cx: &Cx,
    ) -> JsResult<Option<Value>> {
        let ExprKind::Member {
            object,
            property,
            optional,
        } = &expr.kind
        else {
            return Ok(Some(Value::Bool(true)));
        };
        let Some(base) = self.eval_opt(object, cx).await? else {
            return Ok(None);
        };
        if *optional && base.is_nullish() {
            return Ok(None);
        }
        let key = self.member_key(property, cx).await?;
        match &base {
            Value::Object(obj) => Ok(Some(Value::Bool(self.delete_property(obj, &key)?))),
            _ => Ok(Some(Value::Bool(true))),
        }
    }

    async fn eval_reference<'a>(
        &self,
        expr: &'a Expr,
        cx: &Cx,
    ) -> JsResult<Reference<'a>> {
        match &expr.kind {
            ExprKind::Ident(id) => Ok(Reference::Name(&id.name)),
            ExprKind::Member { object, property, .. } => {
                if let ExprKind::Super = object.kind {
                    let key = self.member_key(property, cx).await?;
                    return Ok(Reference::Super {
                        this: self.this_value(cx)?,
                        key,
                    });
                }
                let base = self.eval(object, cx).await?;
                let key = self.member_key(property, cx).await?;
                Ok(Reference::Property { base, key })
            }
            ExprKind::Paren(inner) | ExprKind::TypeCast(inner) => Box::pin(self.eval_reference(inner, cx)).await,
            _ => Err(self.syntax_error("Invalid left-hand side in assignment")),
        }
    }

    async fn get_reference(
        &self,
        reference: &Reference<'_>,
        cx: &Cx,
    ) -> JsResult<Value> {
        match reference {
            Reference::Name(name) => self.lookup_name(name, cx).await,
            Reference::Property { base, key } => {
                if let PropertyKey::Private(_) = key {
                    self.check_private(base, key)?;
                }
                self.get(base, key).await
            }
            Reference::Super { key, .. } => self.super_get(key.clone(), cx).await,
        }
    }

    async fn put_reference(
        &self,
        reference: &Reference<'_>,
        value: Value,
        cx: &Cx,
    ) -> JsResult<()> {
        match reference {
            Reference::Name(name) => self.assign_name(name, value, cx).await,
            Reference::Property { base, key } => {
                if let PropertyKey::Private(_) = key {
                    self.check_private(base, key)?;
                }
                self.set(base, key.clone(), value).await
            }
            Reference::Super { this, key } => self.set(this, key.clone(), value).await,
        }
    }

    /// Store into a member expression or identifier used as an assignment target
    pub(crate) async fn assign_to_expr(
        &self,
        target: &Expr,
        value: Value,
        cx: &Cx,
    ) -> JsResult<()> {
        let reference = self.eval_reference(target, cx).await?;
        self.put_reference(&reference, value, cx).await
    }

    async fn eval_assign(
        &self,
        op: AssignOp,
        target: &Pattern,
        value: &Expr,
        cx: &Cx,
    ) -> JsResult<Value> {
        let reference = match &target.kind {
            PatternKind::Ident(id) => Reference::Name(&id.name),
            PatternKind::Expr(e) => self.eval_reference(e, cx).await?,
            _ => {
                // destructuring assignment
                let v = self.eval(value, cx).await?;
                self.bind_pattern(target, v.clone(), BindMode::Assign, cx).await?;
                return Ok(v);
            }
        };
        let named = |v: &Value| {
            if let (Reference::Name(name), true) = (&reference, is_anonymous_function(value)) {
                self.set_function_name(v, name);
            }
        };
        match op {
            AssignOp::Assign => {
                let v = self.eval(value, cx).await?;
                named(&v);
                self.put_reference(&reference, v.clone(), cx).await?;
                Ok(v)
            }
            AssignOp::Binary(bin) => {
                let current = self.get_reference(&reference, cx).await?;
                let rhs = self.eval(value, cx).await?;
                let v = self.binary_op(bin, current, rhs).await?;
                self.put_reference(&reference, v.clone(), cx).await?;
                Ok(v)
            }
            AssignOp::Logical(logical) => {
                let current = self.get_reference(&reference, cx).await?;
                let keep = match logical {
                    LogicalOp::And => !current.to_boolean(),
                    LogicalOp::Or => current.to_boolean(),
                    LogicalOp::Nullish => !current.is_nullish(),
                };
                if keep {
                    return Ok(current);
                }
                let v = self.eval(value, cx).await?;
                named(&v);
                self.put_reference(&reference, v.clone(), cx).await?;
                Ok(v)
            }
        }
    }

    async fn eval_yield(
        &self,
        arg: Option<&Expr>,
        delegate: bool,
        cx: &Cx,
    ) -> JsResult<Value> {
        let Some(chan) = cx.env.frame().and_then(|f| f.generator.clone()) else {
            return Err(self.syntax_error("yield is only valid in generator functions"));
        };
        let value = match arg {
            Some(e) => self.eval(e, cx).await?,
            None => Value::Undefined,
        };
        if !delegate {
            return self.yield_value(&chan, value).await;
        }

        let record = if chan.is_async {
            self.get_async_iterator(&value).await?
        } else {
            self.get_iterator(&value).await?
        };
        let (iterator, next, is_async) = match record {
            IterRecord::Object {
                iterator,
                next,
                is_async,
            } => (iterator, next, is_async),
            mut simple => {
                while let Some(v) = self.iter_next(&mut simple).await? {
                    self.yield_value(&chan, v).await?;
                }
                return Ok(Value::Undefined);
            }
        };

        let mut resume = Resume::Next(Value::Undefined);
        loop {
            let mut returning = false;
            let mut result = match resume {
                Resume::Next(v) => self.call(&next, iterator.clone(), vec![v]).await?,
                Resume::Throw(e) => {
                    let method = self.get_named(&iterator, "throw").await?;
                    if method.is_nullish() {
                        let record = IterRecord::Object {
                            iterator: iterator.clone(),
                            next: next.clone(),
                            is_async,
                        };
                        self.iter_close(&record).await?;
                        return Err(self.type_error("The iterator does not provide a 'throw' method"));
                    }
                    self.call(&method, iterator.clone(), vec![e]).await?
                }
                Resume::Return(v) => {
                    let method = self.get_named(&iterator, "return").await?;
                    if method.is_nullish() {
                        chan.set_returned(v);
                        return Err(self.generator_return_signal());
                    }
                    returning = true;
                    self.call(&method, iterator.clone(), vec![v]).await?
                }
            };
            if is_async {
                result = self.await_value(result).await?;
            }
            if !result.is_object() {
                return Err(self.type_error(format!(
                    "Iterator result {} is not an object",
                    describe_value(&result)
                )));
            }
            let done = self.get_named(&result, "done").await?.to_boolean();
            let value = self.get_named(&result, "value").await?;
            if done {
                if returning {
                    chan.set_returned(value);
                    return Err(self.generator_return_signal());
                }
                return Ok(value);
            }
            resume = chan.suspend(value).await;
        }
    }

    fn meta_property(
        &self,
        meta: &str,
        property: &str,
        cx: &Cx,
    ) -> JsResult<Value> {
        match (meta, property) {
            ("new", "target") => Ok(cx
                .env
                .frame()
                .and_then(|f| f.new_target.clone())
                .map(Value::Object)
                .unwrap_or_default()),
            ("import", "meta") => {
                let path = self.referrer_of(&cx.env);
                let dirname = path.parent().map(|p| p.display().to_string()).unwrap_or_default();
                Ok(Value::Object(self.object_from(vec![
                    ("url", Value::from(format!("file://{}", path.display()))),
                    ("filename", Value::from(path.display().to_string())),
                    ("dirname", Value::from(dirname)),
                ])))
            }
            _ => Err(self.syntax_error(format!("Unknown meta property {}.{}", meta, property))),
        }
    }
}

fn unwrap_parens(expr: &Expr) -> &Expr {
    match &expr.kind {
        ExprKind::Paren(inner) | ExprKind::TypeCast(inner) => unwrap_parens(inner),
        _ => expr,
    }
}

/// Source text of an expression, for error messages
fn expr_text<'a>(
    expr: &Expr,
    cx: &'a Cx,
) -> &'a str {
    cx.source.get(expr.span.start..expr.span.end).unwrap_or("expression")
}
