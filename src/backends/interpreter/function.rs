//! Function objects: calls, construction, closures and classes

use std::sync::Arc;

use parking_lot::Mutex;

use super::env::Frame;
use super::generator::{Channel, GeneratorState};
use super::property::describe_value;
use super::{BoxFuture, Cx, Interpreter, JsResult, Throw};
use crate::frontend::parser::ast::{self, ClassMember, FunctionBody, MethodKind, PropName};
use crate::runtime::value::{
    number_to_string, CallArgs, Callable, ClassConstructor, Closure, ClosureKind, FieldDef, FieldInit, NativeFn,
    NativeFunction, Obj, Object, ObjectKind, Property, PropertyKey, Slot, Value,
};

/// Static class element evaluated once the class exists
enum StaticElement {
    Field(PropertyKey, Option<usize>),
    Block(usize),
}

/// Function name of a method, getter or setter
pub(crate) fn method_label(
    kind: MethodKind,
    key: &PropertyKey,
) -> String {
    match kind {
        MethodKind::Method => key.to_string(),
        MethodKind::Getter => format!("get {}", key),
        MethodKind::Setter => format!("set {}", key),
    }
}

/// Number of parameters before the first default or rest parameter
fn expected_arguments(params: &[ast::Param]) -> usize {
    params
        .iter()
        .take_while(|p| !p.rest && !matches!(p.pattern.kind, ast::PatternKind::Default { .. }))
        .count()
}

impl Interpreter {
    pub fn is_callable(
        &self,
        value: &Value,
    ) -> bool {
        matches!(value, Value::Object(o) if o.is_callable())
    }

    pub fn is_constructor(
        &self,
        value: &Value,
    ) -> bool {
        let Value::Object(obj) = value else {
            return false;
        };
        let target = match &obj.lock().kind {
            ObjectKind::Function(Callable::Closure(c)) => {
                return c.kind == ClosureKind::Normal && !c.func.is_async && !c.func.is_generator;
            }
            ObjectKind::Function(Callable::Class(_)) => return true,
            ObjectKind::Function(Callable::Native(n)) => return n.constructor,
            ObjectKind::Function(Callable::Bound(b)) => b.target.clone(),
            _ => return false,
        };
        self.is_constructor(&Value::Object(target))
    }

    /// Call `func` with `this` and `args`
    pub fn call<'a>(
        &'a self,
        func: &'a Value,
        this: Value,
        args: Vec<Value>,
    ) -> BoxFuture<'a, JsResult<Value>> {
        Box::pin(async move {
            match func {
                Value::Object(obj) => self.call_function(obj, this, args).await,
                other => Err(self.type_error(format!("{} is not a function", describe_value(other)))),
            }
        })
    }

    pub fn call_function<'a>(
        &'a self,
        func: &'a Obj,
        this: Value,
        args: Vec<Value>,
    ) -> BoxFuture<'a, JsResult<Value>> {
        Box::pin(async move {
            let callable = match &func.lock().kind {
                ObjectKind::Function(c) => Some(c.clone()),
                _ => None,
            };
            match callable {
                Some(Callable::Closure(closure)) => self.call_closure(closure, func, this, args, None).await,
                Some(Callable::Native(native)) => self.call_native(&native, CallArgs::new(this, args)).await,
                Some(Callable::Bound(bound)) => {
                    let mut all = bound.args.clone();
                    all.extend(args);
                    self.call_function(&bound.target, bound.this.clone(), all).await
                }
                Some(Callable::Class(_)) => Err(self.type_error(format!(
                    "Class constructor {} cannot be invoked without 'new'",
                    self.function_name(func)
                ))),
                None => Err(self.type_error(format!(
                    "{} is not a function",
                    describe_value(&Value::Object(func.clone()))
                ))),
            }
        })
    }

    /// `new callee(...args)`
    pub fn construct<'a>(
        &'a self,
        callee: &'a Value,
        args: Vec<Value>,
        new_target: Option<Obj>,
    ) -> BoxFuture<'a, JsResult<Value>> {
        Box::pin(async move {
            let Value::Object(func) = callee else {
                return Err(self.type_error(format!("{} is not a constructor", describe_value(callee))));
            };
            let callable = match &func.lock().kind {
                ObjectKind::Function(c) => Some(c.clone()),
                _ => None,
            };
            let new_target = new_target.unwrap_or_else(|| func.clone());
            match callable {
                Some(Callable::Closure(closure))
                    if closure.kind == ClosureKind::Normal && !closure.func.is_async && !closure.func.is_generator =>
                {
                    let fallback = self.intrinsics().object_proto.clone();
                    let proto = self.prototype_from(&new_target, fallback).await?;
                    let this = Obj::new(Object::new(Some(proto), ObjectKind::Ordinary));
                    let result = self
                        .call_closure(closure, func, Value::Object(this.clone()), args, Some(new_target))
                        .await?;
                    Ok(if result.is_object() { result } else { Value::Object(this) })
                }
                Some(Callable::Class(class)) => self.construct_class(class, func, args, new_target).await,
                Some(Callable::Native(native)) if native.constructor => {
                    let call = CallArgs {
                        this: Value::Undefined,
                        args,
                        new_target: Some(new_target),
                    };
                    self.call_native(&native, call).await
                }
                Some(Callable::Bound(bound)) => {
                    let mut all = bound.args.clone();
                    all.extend(args);
                    let new_target = if new_target.ptr_eq(func) {
                        bound.target.clone()
                    } else {
                        new_target
                    };
                    self.construct(&Value::Object(bound.target.clone()), all, Some(new_target))
                        .await
                }
                _ => Err(self.type_error(format!("{} is not a constructor", self.function_name(func)))),
            }
        })
    }

    /// `new_target.prototype` if it is an object, `fallback` otherwise
    pub(crate) async fn prototype_from(
        &self,
        new_target: &Obj,
        fallback: Obj,
    ) -> JsResult<Obj> {
        match self.get_named(&Value::Object(new_target.clone()), "prototype").await? {
            Value::Object(proto) => Ok(proto),
            _ => Ok(fallback),
        }
    }

    async fn call_native(
        &self,
        native: &NativeFunction,
        args: CallArgs,
    ) -> JsResult<Value> {
        let _guard = self.enter_call(native.name.clone())?;
        match &native.f {
            NativeFn::Sync(f) => f(self, args),
            NativeFn::Async(f) => f(self.clone(), args).await,
        }
    }

    /// Own `name` of a function object
    pub(crate) fn function_name(
        &self,
        func: &Obj,
    ) -> Arc<str> {
        match func.lock().props.get(&PropertyKey::from("name")) {
            Some(Property {
                slot: Slot::Data(Value::String(s)),
                ..
            }) => s.clone(),
            _ => Arc::from(""),
        }
    }

    async fn call_closure(
        &self,
        closure: Closure,
        func_obj: &Obj,
        this: Value,
        args: Vec<Value>,
        new_target: Option<Obj>,
    ) -> JsResult<Value> {
        let func = closure.func.clone();
        let guard = self.enter_call(self.function_name(func_obj))?;
        let chan = func.is_generator.then(|| Channel::new(func.is_async));
        let env = if closure.kind == ClosureKind::Arrow {
            closure.env.child()
        } else {
            let env = closure.env.with_frame(Frame {
                this: Mutex::new(Some(this)),
                home: closure.home.clone(),
                new_target,
                func: Some(func_obj.clone()),
                referrer: None,
                generator: chan.clone(),
            });
            let arguments = self.new_array(args.clone());
            env.declare("arguments", Value::Object(arguments), true);
            env
        };
        let cx = Cx::new(env, closure.source.clone());

        if let Some(chan) = chan {
            self.bind_params(&func.params, args, &cx).await?;
            if let FunctionBody::Block(stmts) = &func.body {
                self.hoist_declarations(stmts, &cx, true)?;
            }
            drop(guard);
            let fallback = if func.is_async {
                self.intrinsics().async_generator_proto.clone()
            } else {
                self.intrinsics().generator_proto.clone()
            };
            let proto = match self.get_data(&Value::Object(func_obj.clone()), &PropertyKey::from("prototype")) {
                Some(Value::Object(p)) => p,
                _ => fallback,
            };
            let interp = self.clone();
            let body = Box::pin(async move { interp.run_body(&func, &cx).await });
            let state = GeneratorState::new(body, chan);
            let generator = Obj::new(Object::new(Some(proto), ObjectKind::Generator(Box::new(state))));
            return Ok(Value::Object(generator));
        }

        if func.is_async {
            let result = async {
                self.bind_params(&func.params, args, &cx).await?;
                if let FunctionBody::Block(stmts) = &func.body {
                    self.hoist_declarations(stmts, &cx, true)?;
                }
                self.run_body(&func, &cx).await
            }
            .await;
            drop(guard);
            let promise = self.new_promise();
            match result {
                Ok(v) => self.resolve_promise(&promise, v),
                Err(Throw(e)) => self.reject_promise(&promise, e),
            }
            return Ok(Value::Object(promise));
        }

        self.bind_params(&func.params, args, &cx).await?;
        if let FunctionBody::Block(stmts) = &func.body {
            self.hoist_declarations(stmts, &cx, true)?;
        }
        let result = self.run_body(&func, &cx).await;
        drop(guard);
        result
    }

    /// Run a function body whose parameters are already bound
    pub(crate) fn run_body<'a>(
        &'a self,
        func: &'a ast::Function,
        cx: &'a Cx,
    ) -> BoxFuture<'a, JsResult<Value>> {
        Box::pin(async move {
            match &func.body {
                FunctionBody::Block(stmts) => match self.exec_stmts(stmts, cx).await? {
                    super::exec::Completion::Return(v) => Ok(v),
                    _ => Ok(Value::Undefined),
                },
                FunctionBody::Expr(expr) => self.eval(expr, cx).await,
                FunctionBody::None => Ok(Value::Undefined),
            }
        })
    }

    /// Bind parameters in the function scope of `cx`
    pub(crate) async fn bind_params(
        &self,
        params: &[ast::Param],
        args: Vec<Value>,
        cx: &Cx,
    ) -> JsResult<()> {
        let mut args = args.into_iter();
        for param in params {
            let value = if param.rest {
                Value::Object(self.new_array(args.by_ref().collect()))
            } else {
                args.next().unwrap_or_default()
            };
            self.bind_pattern(&param.pattern, value, super::pattern::BindMode::Param, cx)
                .await?;
        }
        Ok(())
    }

    /// Function object for a function expression, declaration or method
    pub(crate) fn make_closure(
        &self,
        func: &Arc<ast::Function>,
        cx: &Cx,
        kind: ClosureKind,
        home: Option<Obj>,
    ) -> Obj {
        let kind = if func.is_arrow { ClosureKind::Arrow } else { kind };
        let closure = Closure {
            func: func.clone(),
            env: cx.env.clone(),
            source: cx.source.clone(),
            kind,
            home,
        };
        let obj = Obj::new(Object::new(
            Some(self.intrinsics().function_proto.clone()),
            ObjectKind::Function(Callable::Closure(closure)),
        ));
        let name = func.name.as_ref().map(|n| n.name.as_str()).unwrap_or("");
        define_name_and_length(&obj, name, expected_arguments(&func.params));

        if func.is_generator {
            let base = if func.is_async {
                self.intrinsics().async_generator_proto.clone()
            } else {
                self.intrinsics().generator_proto.clone()
            };
            let proto = Obj::new(Object::new(Some(base), ObjectKind::Ordinary));
            obj.lock().define("prototype", prototype_property(proto));
        } else if kind == ClosureKind::Normal && !func.is_async {
            let proto = self.new_object();
            proto
                .lock()
                .define("constructor", Property::hidden(Value::Object(obj.clone())));
            obj.lock().define("prototype", prototype_property(proto));
        }
        obj
    }

    /// Give an anonymous function or class the name it is bound to
    pub(crate) fn set_function_name(
        &self,
        value: &Value,
        name: &str,
    ) {
        let Value::Object(func) = value else {
            return;
        };
        if !func.is_callable() || !self.function_name(func).is_empty() {
            return;
        }
        func.lock().define(
            "name",
            Property {
                slot: Slot::Data(Value::str(name)),
                enumerable: false,
                writable: false,
                configurable: true,
            },
        );
    }

    /// Source text of a function, as `Function.prototype.toString` prints it
    pub fn function_text(
        &self,
        func: &Obj,
    ) -> Option<String> {
        let callable = match &func.lock().kind {
            ObjectKind::Function(c) => c.clone(),
            _ => return None,
        };
        Some(match callable {
            Callable::Closure(c) => c.text().to_string(),
            Callable::Class(c) => c.text().to_string(),
            Callable::Native(n) => format!("function {}() {{ [native code] }}", n.name),
            Callable::Bound(_) => "function () { [native code] }".to_string(),
        })
    }

    /// Evaluate a property name of a literal, class member or pattern
    pub(crate) async fn eval_prop_name(
        &self,
        key: &PropName,
        cx: &Cx,
    ) -> JsResult<PropertyKey> {
        Ok(match key {
            PropName::Ident(id) => PropertyKey::from(id.name.as_str()),
            PropName::Str(s) => PropertyKey::from(s.value.as_str()),
            PropName::Num(n, _) => PropertyKey::from(number_to_string(*n)),
            PropName::Private(id) => PropertyKey::Private(Arc::from(id.name.as_str())),
            PropName::Computed(expr) => {
                let value = self.eval(expr, cx).await?;
                self.to_property_key(&value).await?
            }
        })
    }

    /// Install a method, getter or setter on `target`
    pub(crate) fn define_method_property(
        &self,
        target: &Obj,
        key: PropertyKey,
        method: Obj,
        kind: MethodKind,
        enumerable: bool,
    ) {
        let mut object = target.lock();
        if kind == MethodKind::Method {
            let mut prop = Property::hidden(Value::Object(method));
            prop.enumerable = enumerable;
            object.define(key, prop);
            return;
        }
        let (mut get, mut set) = match object.props.get(&key) {
            Some(Property {
                slot: Slot::Accessor { get, set },
                ..
            }) => (get.clone(), set.clone()),
            _ => (None, None),
        };
        if kind == MethodKind::Getter {
            get = Some(method);
        } else {
            set = Some(method);
        }
        object.define(key, Property::accessor(get, set, enumerable));
    }

    /// Evaluate a class definition to its constructor
    pub(crate) async fn define_class(
        &self,
        class: &Arc<ast::Class>,
        cx: &Cx,
        inferred_name: Option<&str>,
    ) -> JsResult<Obj> {
        let i = self.intrinsics();
        let (proto_parent, ctor_parent) = match &class.super_class {
            None => (Some(i.object_proto.clone()), i.function_proto.clone()),
            Some(expr) => match self.eval(expr, cx).await? {
                Value::Null => (None, i.function_proto.clone()),
                parent @ Value::Object(_) if self.is_constructor(&parent) => {
                    let parent_proto = match self.get_named(&parent, "prototype").await? {
                        Value::Object(p) => Some(p),
                        Value::Null => None,
                        _ => return Err(self.type_error("Class extends value does not have valid prototype property")),
                    };
                    let Value::Object(parent) = parent else {
                        return Err(self.type_error("Class extends value is not a constructor or null"));
                    };
                    (parent_proto, parent)
                }
                other => {
                    return Err(self.type_error(format!(
                        "Class extends value {} is not a constructor or null",
                        describe_value(&other)
                    )));
                }
            },
        };

        let class_env = cx.env.child();
        if let Some(name) = &class.name {
            class_env.declare_uninitialized(&name.name, false);
        }
        let class_cx = cx.with_env(class_env.clone());

        let proto = Obj::new(Object::new(proto_parent, ObjectKind::Ordinary));
        let ctor = class.members.iter().find_map(|m| match m {
            ClassMember::Constructor(f) => Some(f.clone()),
            _ => None,
        });
        let length = ctor.as_ref().map(|f| expected_arguments(&f.params)).unwrap_or(0);
        let name = class
            .name
            .as_ref()
            .map(|n| n.name.as_str())
            .or(inferred_name)
            .unwrap_or("");
        let ctor_obj = Obj::new(Object::new(
            Some(ctor_parent),
            ObjectKind::Function(Callable::Class(ClassConstructor {
                ctor,
                class: class.clone(),
                env: class_env.clone(),
                source: cx.source.clone(),
                home: proto.clone(),
                derived: class.super_class.is_some(),
                fields: Vec::new(),
            })),
        ));
        define_name_and_length(&ctor_obj, name, length);
        ctor_obj.lock().define(
            "prototype",
            Property {
                slot: Slot::Data(Value::Object(proto.clone())),
                enumerable: false,
                writable: false,
                configurable: false,
            },
        );
        proto
            .lock()
            .define("constructor", Property::hidden(Value::Object(ctor_obj.clone())));

        let mut fields = Vec::new();
        let mut statics = Vec::new();
        for (idx, member) in class.members.iter().enumerate() {
            match member {
                ClassMember::Constructor(_) => {}
                ClassMember::Method {
                    key,
                    kind,
                    func,
                    is_static,
                } => {
                    let target = if *is_static { ctor_obj.clone() } else { proto.clone() };
                    let key = self.eval_prop_name(key, &class_cx).await?;
                    let method = self.make_closure(func, &class_cx, ClosureKind::Method, Some(target.clone()));
                    self.set_function_name(&Value::Object(method.clone()), &method_label(*kind, &key));
                    self.define_method_property(&target, key, method, *kind, false);
                }
                ClassMember::Field {
                    key, value, is_static, ..
                } => {
                    let key = self.eval_prop_name(key, &class_cx).await?;
                    if *is_static {
                        statics.push(StaticElement::Field(key, value.as_ref().map(|_| idx)));
                    } else {
                        let init = if value.is_some() {
                            FieldInit::Expr(idx)
                        } else {
                            FieldInit::Undefined
                        };
                        fields.push(FieldDef { key, init });
                    }
                }
                ClassMember::StaticBlock(_) => statics.push(StaticElement::Block(idx)),
            }
        }
        if let ObjectKind::Function(Callable::Class(c)) = &mut ctor_obj.lock().kind {
            c.fields = fields;
        }
        if let Some(name) = &class.name {
            class_env.initialize(&name.name, Value::Object(ctor_obj.clone()));
        }

        let static_frame = || Frame {
            this: Mutex::new(Some(Value::Object(ctor_obj.clone()))),
            home: Some(ctor_obj.clone()),
            ..Frame::default()
        };
        for element in statics {
            match element {
                StaticElement::Field(key, init) => {
                    let value = match init.map(|idx| &class.members[idx]) {
                        Some(ClassMember::Field { value: Some(expr), .. }) => {
                            let static_cx = class_cx.with_env(class_env.with_frame(static_frame()));
                            let v = self.eval(expr, &static_cx).await?;
                            self.set_function_name(&v, &key.to_string());
                            v
                        }
                        _ => Value::Undefined,
                    };
                    ctor_obj.lock().define(key, Property::data(value));
                }
                StaticElement::Block(idx) => {
                    if let ClassMember::StaticBlock(stmts) = &class.members[idx] {
                        let block_cx = class_cx.with_env(class_env.with_frame(static_frame()));
                        self.hoist_declarations(stmts, &block_cx, true)?;
                        self.exec_stmts(stmts, &block_cx).await?;
                    }
                }
            }
        }
        Ok(ctor_obj)
    }

    async fn construct_class(
        &self,
        class: ClassConstructor,
        func_obj: &Obj,
        args: Vec<Value>,
        new_target: Obj,
    ) -> JsResult<Value> {
        let _guard = self.enter_call(self.function_name(func_obj))?;
        let this = if class.derived {
            None
        } else {
            let fallback = self.intrinsics().object_proto.clone();
            let proto = self.prototype_from(&new_target, fallback).await?;
            let this = Obj::new(Object::new(Some(proto), ObjectKind::Ordinary));
            self.init_fields(&this, func_obj).await?;
            Some(Value::Object(this))
        };

        let Some(ctor) = &class.ctor else {
            if let Some(this) = this {
                return Ok(this);
            }
            // implicit `constructor(...args) { super(...args) }`
            let parent = self.super_constructor(func_obj)?;
            let result = self.construct(&parent, args, Some(new_target)).await?;
            if let Value::Object(this) = &result {
                self.init_fields(this, func_obj).await?;
            }
            return Ok(result);
        };

        let env = class.env.with_frame(Frame {
            this: Mutex::new(this),
            home: Some(class.home.clone()),
            new_target: Some(new_target),
            func: Some(func_obj.clone()),
            referrer: None,
            generator: None,
        });
        env.declare("arguments", Value::Object(self.new_array(args.clone())), true);
        let cx = Cx::new(env, class.source.clone());
        self.bind_params(&ctor.params, args, &cx).await?;
        if let FunctionBody::Block(stmts) = &ctor.body {
            self.hoist_declarations(stmts, &cx, true)?;
        }
        let result = self.run_body(ctor, &cx).await?;
        if result.is_object() {
            return Ok(result);
        }
        cx.env.this_value().ok_or_else(|| {
            self.reference_error(
                "Must call super constructor in derived class before accessing 'this' or returning from derived constructor",
            )
        })
    }

    /// Parent class of a derived class constructor
    fn super_constructor(
        &self,
        func: &Obj,
    ) -> JsResult<Value> {
        match func.proto() {
            Some(parent) if self.is_constructor(&Value::Object(parent.clone())) => Ok(Value::Object(parent)),
            _ => Err(self.type_error("Super constructor is not a constructor")),
        }
    }

    /// `super(...args)` inside a derived constructor
    pub(crate) async fn super_call(
        &self,
        args: Vec<Value>,
        cx: &Cx,
    ) -> JsResult<Value> {
        let (func, new_target) = match cx.env.frame() {
            Some(frame) => (frame.func.clone(), frame.new_target.clone()),
            None => (None, None),
        };
        let Some(func) = func else {
            return Err(self.syntax_error("'super' keyword unexpected here"));
        };
        let parent = self.super_constructor(&func)?;
        let result = self.construct(&parent, args, new_target).await?;
        if !cx.env.bind_this(result.clone()) {
            return Err(self.reference_error("Super constructor may only be called once"));
        }
        if let Value::Object(this) = &result {
            self.init_fields(this, &func).await?;
        }
        Ok(Value::Undefined)
    }

    /// Define the instance fields of `class_fn` on a freshly constructed object
    async fn init_fields(
        &self,
        this: &Obj,
        class_fn: &Obj,
    ) -> JsResult<()> {
        let class = match &class_fn.lock().kind {
            ObjectKind::Function(Callable::Class(c)) => c.clone(),
            _ => return Ok(()),
        };
        if class.fields.is_empty() {
            return Ok(());
        }
        let env = class.env.with_frame(Frame {
            this: Mutex::new(Some(Value::Object(this.clone()))),
            home: Some(class.home.clone()),
            ..Frame::default()
        });
        let cx = Cx::new(env, class.source.clone());
        for field in &class.fields {
            let value = match field.init {
                FieldInit::Expr(idx) => match &class.class.members[idx] {
                    ClassMember::Field { value: Some(expr), .. } => {
                        let v = self.eval(expr, &cx).await?;
                        self.set_function_name(&v, &field.key.to_string());
                        v
                    }
                    _ => Value::Undefined,
                },
                FieldInit::Undefined => Value::Undefined,
            };
            this.lock().define(field.key.clone(), Property::data(value));
        }
        Ok(())
    }

    /// Builtin function object
    pub fn new_native(
        &self,
        name: &str,
        length: usize,
        f: NativeFn,
        constructor: bool,
    ) -> Obj {
        let obj = Obj::new(Object::new(
            Some(self.intrinsics().function_proto.clone()),
            ObjectKind::Function(Callable::Native(NativeFunction {
                name: Arc::from(name),
                f,
                constructor,
            })),
        ));
        define_name_and_length(&obj, name, length);
        obj
    }

    /// Builtin that does not call back into JavaScript
    pub fn native_fn<F>(
        &self,
        name: &str,
        length: usize,
        f: F,
    ) -> Obj
    where
        F: Fn(&Interpreter, CallArgs) -> JsResult<Value> + Send + Sync + 'static,
    {
        self.new_native(name, length, NativeFn::Sync(Arc::new(f)), false)
    }

    /// Builtin that may call back into JavaScript
    pub fn async_native_fn<F>(
        &self,
        name: &str,
        length: usize,
        f: F,
    ) -> Obj
    where
        F: Fn(Interpreter, CallArgs) -> BoxFuture<'static, JsResult<Value>> + Send + Sync + 'static,
    {
        self.new_native(name, length, NativeFn::Async(Arc::new(f)), false)
    }

    pub fn define_method<F>(
        &self,
        target: &Obj,
        name: &str,
        length: usize,
        f: F,
    ) where
        F: Fn(&Interpreter, CallArgs) -> JsResult<Value> + Send + Sync + 'static,
    {
        let func = self.native_fn(name, length, f);
        target.lock().define(name, Property::hidden(Value::Object(func)));
    }

    pub fn define_async_method<F>(
        &self,
        target: &Obj,
        name: &str,
        length: usize,
        f: F,
    ) where
        F: Fn(Interpreter, CallArgs) -> BoxFuture<'static, JsResult<Value>> + Send + Sync + 'static,
    {
        let func = self.async_native_fn(name, length, f);
        target.lock().define(name, Property::hidden(Value::Object(func)));
    }

    /// Method keyed by a well-known symbol, e.g. `[Symbol.iterator]`
    pub fn define_symbol_method(
        &self,
        target: &Obj,
        symbol: crate::runtime::value::Symbol,
        func: Obj,
    ) {
        target
            .lock()
            .define(PropertyKey::Symbol(symbol), Property::hidden(Value::Object(func)));
    }

    /// Read-only accessor property backed by a builtin getter
    pub fn define_getter<F>(
        &self,
        target: &Obj,
        name: &str,
        f: F,
    ) where
        F: Fn(&Interpreter, CallArgs) -> JsResult<Value> + Send + Sync + 'static,
    {
        let getter = self.native_fn(&format!("get {}", name), 0, f);
        target.lock().define(name, Property::accessor(Some(getter), None, false));
    }

    /// Builtin constructor wired to its prototype and published as a global
    pub fn define_constructor(
        &self,
        name: &str,
        length: usize,
        f: NativeFn,
        proto: &Obj,
    ) -> Obj {
        let ctor = self.new_native(name, length, f, true);
        ctor.lock().define(
            "prototype",
            Property {
                slot: Slot::Data(Value::Object(proto.clone())),
                enumerable: false,
                writable: false,
                configurable: false,
            },
        );
        proto
            .lock()
            .define("constructor", Property::hidden(Value::Object(ctor.clone())));
        self.define_global(name, Value::Object(ctor.clone()));
        ctor
    }
}

fn define_name_and_length(
    obj: &Obj,
    name: &str,
    length: usize,
) {
    let attr = |value: Value| Property {
        slot: Slot::Data(value),
        enumerable: false,
        writable: false,
        configurable: true,
    };
    let mut object = obj.lock();
    object.define("length", attr(Value::Number(length as f64)));
    object.define("name", attr(Value::str(name)));
}

fn prototype_property(proto: Obj) -> Property {
    Property {
        slot: Slot::Data(Value::Object(proto)),
        enumerable: false,
        writable: true,
        configurable: false,
    }
}
