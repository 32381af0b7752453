//! Tree-walking interpreter for the erased JavaScript subset
//!
//! The interpreter evaluates syntax trees directly. Every evaluation step is
//! an async function returning a boxed future, so module loading, timers and
//! user-supplied resolvers can suspend an evaluation anywhere.
//!
//! Async functions run eagerly: `await` drives the job queue (microtasks
//! first, then timers) until the awaited promise settles, then resumes.
//! Generators are resumable futures polled by their `next()` calls.

pub mod builtins;
pub mod env;
mod eval;
mod exec;
mod function;
pub mod generator;
mod iterator;
pub mod jobs;
pub mod modules;
mod operators;
mod pattern;
mod property;
pub mod realm;

#[cfg(test)]
mod tests;

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

pub use env::Env;
pub use iterator::IterRecord;
pub use realm::{ErrorKind, Intrinsics};

use crate::frontend::module::resolver::ModuleResolver;
use crate::frontend::parser::ast;
use crate::runtime::value::{Obj, Object, ObjectKind, Property, PropertyKey, Slot, Value};
use env::Frame;

/// Boxed future used for recursive evaluation
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of an evaluation step; `Err` carries a thrown JavaScript value
pub type JsResult<T> = Result<T, Throw>;

/// A thrown JavaScript value
#[derive(Debug, Clone)]
pub struct Throw(pub Value);

/// Maximum nesting of JavaScript calls
const MAX_CALL_DEPTH: usize = 1_000;

/// Stack size of the evaluation thread
const EVAL_STACK_SIZE: usize = 256 * 1024 * 1024;

/// Uncaught exception at the interpreter boundary
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    #[error("{message}")]
    Uncaught {
        message: String,
        /// `error.stack` when an Error object was thrown
        stack: Option<String>,
    },

    #[error("evaluation thread terminated unexpectedly")]
    Aborted,
}

impl RuntimeError {
    /// Stack trace if there is one, the message otherwise
    pub fn stack_or_message(&self) -> String {
        match self {
            RuntimeError::Uncaught {
                stack: Some(stack), ..
            } => stack.clone(),
            other => other.to_string(),
        }
    }
}

/// Evaluation state for one statement list: its scope and the text it was parsed from
#[derive(Clone)]
pub struct Cx {
    pub env: Env,
    pub source: Arc<str>,
}

impl Cx {
    pub fn new(
        env: Env,
        source: Arc<str>,
    ) -> Self {
        Cx { env, source }
    }

    /// Same source, different scope
    pub fn with_env(
        &self,
        env: Env,
    ) -> Cx {
        Cx {
            env,
            source: self.source.clone(),
        }
    }
}

/// Everything shared by code running in one interpreter
pub struct Realm {
    pub intrinsics: Intrinsics,
    pub global: Obj,
    pub global_env: Env,
    pub(crate) jobs: jobs::JobQueue,
    pub(crate) modules: modules::ModuleRegistry,
    pub(crate) resolver: Arc<dyn ModuleResolver>,
    depth: AtomicUsize,
    call_stack: Mutex<Vec<(u64, Arc<str>)>>,
    next_call: AtomicU64,
}

/// Handle to an interpreter; clones share the same realm
#[derive(Clone)]
pub struct Interpreter {
    realm: Arc<Realm>,
}

impl fmt::Debug for Interpreter {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("modules", &self.realm.modules.len())
            .finish_non_exhaustive()
    }
}

/// Pops the call stack entry when a call finishes
pub(crate) struct CallGuard {
    realm: Arc<Realm>,
    id: u64,
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.realm.depth.fetch_sub(1, Ordering::Relaxed);
        let mut stack = self.realm.call_stack.lock();
        if let Some(pos) = stack.iter().rposition(|(id, _)| *id == self.id) {
            stack.remove(pos);
        }
    }
}

impl Interpreter {
    /// Create an interpreter with all builtins installed
    pub fn new(resolver: Arc<dyn ModuleResolver>) -> Self {
        let intrinsics = Intrinsics::new();
        let global = Obj::new(Object::new(Some(intrinsics.object_proto.clone()), ObjectKind::Ordinary));
        let realm = Realm {
            intrinsics,
            global,
            global_env: Env::root(),
            jobs: jobs::JobQueue::default(),
            modules: modules::ModuleRegistry::default(),
            resolver,
            depth: AtomicUsize::new(0),
            call_stack: Mutex::new(Vec::new()),
            next_call: AtomicU64::new(0),
        };
        let interp = Interpreter {
            realm: Arc::new(realm),
        };
        builtins::install(&interp);
        interp
    }

    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    pub fn intrinsics(&self) -> &Intrinsics {
        &self.realm.intrinsics
    }

    pub fn global(&self) -> &Obj {
        &self.realm.global
    }

    /// Register a running call; fails once the nesting limit is reached
    pub(crate) fn enter_call(
        &self,
        name: Arc<str>,
    ) -> JsResult<CallGuard> {
        let depth = self.realm.depth.fetch_add(1, Ordering::Relaxed);
        let id = self.realm.next_call.fetch_add(1, Ordering::Relaxed);
        let guard = CallGuard {
            realm: self.realm.clone(),
            id,
        };
        if depth >= MAX_CALL_DEPTH {
            return Err(self.range_error("Maximum call stack size exceeded"));
        }
        self.realm.call_stack.lock().push((id, name));
        Ok(guard)
    }

    /// `stack` text for an error created now
    fn stack_trace(
        &self,
        header: &str,
    ) -> String {
        let stack = self.realm.call_stack.lock();
        let mut out = header.to_string();
        for (_, name) in stack.iter().rev().take(10) {
            let name = if name.is_empty() { "<anonymous>" } else { name };
            out.push_str("\n    at ");
            out.push_str(name);
        }
        out
    }

    /// New error object of the given kind
    pub fn new_error(
        &self,
        kind: ErrorKind,
        message: &str,
    ) -> Obj {
        let proto = self.intrinsics().error_proto(kind);
        self.new_error_with_proto(proto, kind.name(), message)
    }

    pub(crate) fn new_error_with_proto(
        &self,
        proto: Obj,
        name: &str,
        message: &str,
    ) -> Obj {
        let header = if message.is_empty() {
            name.to_string()
        } else {
            format!("{}: {}", name, message)
        };
        let stack = self.stack_trace(&header);
        let mut object = Object::new(Some(proto), ObjectKind::Error);
        if !message.is_empty() {
            object.define("message", Property::hidden(Value::str(message)));
        }
        object.define("stack", Property::hidden(Value::from(stack)));
        Obj::new(object)
    }

    /// Throwable error of the given kind
    pub fn throw(
        &self,
        kind: ErrorKind,
        message: impl AsRef<str>,
    ) -> Throw {
        Throw(Value::Object(self.new_error(kind, message.as_ref())))
    }

    pub fn type_error(
        &self,
        message: impl AsRef<str>,
    ) -> Throw {
        self.throw(ErrorKind::TypeError, message)
    }

    pub fn range_error(
        &self,
        message: impl AsRef<str>,
    ) -> Throw {
        self.throw(ErrorKind::RangeError, message)
    }

    pub fn reference_error(
        &self,
        message: impl AsRef<str>,
    ) -> Throw {
        self.throw(ErrorKind::ReferenceError, message)
    }

    pub fn syntax_error(
        &self,
        message: impl AsRef<str>,
    ) -> Throw {
        self.throw(ErrorKind::SyntaxError, message)
    }

    /// Convert an uncaught exception for reporting
    pub fn describe(
        &self,
        throw: &Throw,
    ) -> RuntimeError {
        let Value::Object(obj) = &throw.0 else {
            let message = match &throw.0 {
                Value::Symbol(s) => format!("{:?}", s),
                v => v.primitive_to_string().map(|s| s.to_string()).unwrap_or_default(),
            };
            return RuntimeError::Uncaught { message, stack: None };
        };
        let data = |key: &str| match self.get_data(&throw.0, &PropertyKey::from(key)) {
            Some(Value::String(s)) => Some(s.to_string()),
            _ => None,
        };
        let is_error = matches!(obj.lock().kind, ObjectKind::Error);
        if is_error {
            let name = data("name").unwrap_or_else(|| "Error".to_string());
            let message = match data("message") {
                Some(m) if !m.is_empty() => format!("{}: {}", name, m),
                _ => name,
            };
            RuntimeError::Uncaught {
                message,
                stack: data("stack"),
            }
        } else {
            RuntimeError::Uncaught {
                message: builtins::console::inspect(self, &throw.0),
                stack: None,
            }
        }
    }

    /// Evaluate a parsed async function body in a fresh top-level scope and
    /// settle its result
    ///
    /// # Arguments
    /// * `source` - Text the body was parsed from
    /// * `body` - Parsed body (function-body mode)
    /// * `referrer` - File relative dynamic imports resolve against
    pub async fn evaluate_body(
        &self,
        source: Arc<str>,
        body: Arc<ast::Module>,
        referrer: &Path,
    ) -> JsResult<Value> {
        let env = self
            .realm
            .global_env
            .with_frame(Frame::module(Some(Arc::new(referrer.to_path_buf()))));
        let cx = Cx::new(env, source);
        self.hoist_declarations(&body.body, &cx, true)?;
        let value = match self.exec_stmts(&body.body, &cx).await? {
            exec::Completion::Return(v) => v,
            _ => Value::Undefined,
        };
        self.settle(value).await
    }

    /// Await a value if it is a promise or thenable, then run the queued microtasks
    pub async fn settle(
        &self,
        value: Value,
    ) -> JsResult<Value> {
        let value = self.await_value(value).await?;
        self.drain_microtasks().await;
        Ok(value)
    }

    /// Run `fut` to completion on a dedicated thread with a deep stack
    ///
    /// Deeply recursive JavaScript recurses on the native stack; evaluation
    /// therefore runs on its own thread with a current-thread runtime.
    pub async fn run_isolated<F, T>(fut: F) -> Result<T, RuntimeError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let spawned = std::thread::Builder::new()
            .name("comptime-eval".into())
            .stack_size(EVAL_STACK_SIZE)
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(rt) => rt,
                    Err(e) => {
                        tracing::error!("failed to start evaluation runtime: {}", e);
                        return;
                    }
                };
                let _ = tx.send(runtime.block_on(fut));
            });
        if let Err(e) = spawned {
            tracing::error!("failed to spawn evaluation thread: {}", e);
            return Err(RuntimeError::Aborted);
        }
        rx.await.map_err(|_| RuntimeError::Aborted)
    }

    /// Path of the module currently being evaluated, if any
    pub(crate) fn referrer_of(
        &self,
        env: &Env,
    ) -> PathBuf {
        env.referrer()
            .map(|p| p.as_ref().clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Define a global binding visible to all code
    pub fn define_global(
        &self,
        name: &str,
        value: Value,
    ) {
        self.global().lock().define(name, Property::hidden(value));
    }

    /// Read a global data property
    pub fn global_value(
        &self,
        name: &str,
    ) -> Option<Value> {
        match self.global().lock().props.get(&PropertyKey::from(name)) {
            Some(Property {
                slot: Slot::Data(v), ..
            }) => Some(v.clone()),
            _ => None,
        }
    }
}
