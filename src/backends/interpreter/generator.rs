//! Generators as resumable futures
//!
//! A generator body is an ordinary evaluation future. `yield` parks a value in
//! the generator's [`Channel`] and awaits a [`YieldPoint`], which stays pending
//! until the next resumption is posted. `next()` polls the body once: a pending
//! poll with a parked value is a yield, a ready poll is completion.
//!
//! `return()` on a suspended generator resumes it with a marker exception that
//! `catch` clauses do not intercept, so `finally` blocks still run.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;

use super::{Interpreter, JsResult, Throw};
use crate::runtime::value::{CallArgs, Obj, ObjectKind, Property, PropertyKey, Value};

/// Suspended generator body
pub type Body = Pin<Box<dyn Future<Output = JsResult<Value>> + Send>>;

/// How a suspended generator is resumed
#[derive(Debug, Clone)]
pub enum Resume {
    Next(Value),
    Throw(Value),
    Return(Value),
}

#[derive(Default)]
struct Slots {
    resume: Option<Resume>,
    yielded: Option<Value>,
    returned: Option<Value>,
}

/// Mailbox between a generator body and its driver
pub struct Channel {
    slots: Mutex<Slots>,
    pub is_async: bool,
}

impl Channel {
    pub fn new(is_async: bool) -> Arc<Channel> {
        Arc::new(Channel {
            slots: Mutex::new(Slots::default()),
            is_async,
        })
    }

    /// Park `value` and wait for the driver to resume the body
    pub async fn suspend(
        &self,
        value: Value,
    ) -> Resume {
        self.slots.lock().yielded = Some(value);
        YieldPoint { chan: self }.await
    }

    fn post(
        &self,
        resume: Resume,
    ) {
        self.slots.lock().resume = Some(resume);
    }

    fn take_yielded(&self) -> Option<Value> {
        self.slots.lock().yielded.take()
    }

    /// Remember the value of a pending `return()`
    pub(crate) fn set_returned(
        &self,
        value: Value,
    ) {
        self.slots.lock().returned = Some(value);
    }

    fn take_returned(&self) -> Value {
        self.slots.lock().returned.take().unwrap_or_default()
    }
}

/// Pending until a resumption is posted
struct YieldPoint<'a> {
    chan: &'a Channel,
}

impl Future for YieldPoint<'_> {
    type Output = Resume;

    fn poll(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Resume> {
        match self.chan.slots.lock().resume.take() {
            Some(resume) => Poll::Ready(resume),
            None => Poll::Pending,
        }
    }
}

/// Internal state of a generator object
pub struct GeneratorState {
    /// `None` while the body runs or after it finished
    pub body: Option<Body>,
    pub chan: Arc<Channel>,
    pub started: bool,
    pub done: bool,
}

impl GeneratorState {
    pub fn new(
        body: Body,
        chan: Arc<Channel>,
    ) -> Self {
        GeneratorState {
            body: Some(body),
            chan,
            started: false,
            done: false,
        }
    }
}

enum Taken {
    Body(Body, Arc<Channel>, bool),
    Done,
    Running,
    Incompatible,
}

enum Step {
    Yield(Value),
    Done(JsResult<Value>),
}

impl Interpreter {
    /// Whether `throw` is the marker used to unwind a generator for `return()`
    pub(crate) fn is_generator_return(
        &self,
        throw: &Throw,
    ) -> bool {
        matches!(&throw.0, Value::Object(o) if o.ptr_eq(&self.intrinsics().generator_return))
    }

    pub(crate) fn generator_return_signal(&self) -> Throw {
        Throw(Value::Object(self.intrinsics().generator_return.clone()))
    }

    /// Evaluate `yield value` inside the generator owning `chan`
    pub(crate) async fn yield_value(
        &self,
        chan: &Channel,
        value: Value,
    ) -> JsResult<Value> {
        let value = if chan.is_async {
            self.await_value(value).await?
        } else {
            value
        };
        match chan.suspend(value).await {
            Resume::Next(v) => Ok(v),
            Resume::Throw(e) => Err(Throw(e)),
            Resume::Return(v) => {
                let v = if chan.is_async { self.await_value(v).await? } else { v };
                chan.set_returned(v);
                Err(self.generator_return_signal())
            }
        }
    }

    /// Resume a generator; returns the produced value and whether it finished
    pub(crate) async fn resume_generator(
        &self,
        generator: &Obj,
        resume: Resume,
    ) -> JsResult<(Value, bool)> {
        let taken = {
            let mut object = generator.lock();
            match &mut object.kind {
                ObjectKind::Generator(state) if state.done => Taken::Done,
                ObjectKind::Generator(state) => match state.body.take() {
                    Some(body) => {
                        let started = std::mem::replace(&mut state.started, true);
                        Taken::Body(body, state.chan.clone(), started)
                    }
                    None => Taken::Running,
                },
                _ => Taken::Incompatible,
            }
        };
        let (mut body, chan, started) = match taken {
            Taken::Body(body, chan, started) => (body, chan, started),
            Taken::Done => {
                return match resume {
                    Resume::Next(_) => Ok((Value::Undefined, true)),
                    Resume::Return(v) => Ok((v, true)),
                    Resume::Throw(e) => Err(Throw(e)),
                };
            }
            Taken::Running => return Err(self.type_error("Generator is already running")),
            Taken::Incompatible => {
                return Err(self.type_error("next method called on incompatible receiver"));
            }
        };

        if !started {
            match resume {
                Resume::Next(_) => {}
                Resume::Return(v) => {
                    self.finish_generator(generator);
                    return Ok((v, true));
                }
                Resume::Throw(e) => {
                    self.finish_generator(generator);
                    return Err(Throw(e));
                }
            }
        } else {
            chan.post(resume);
        }

        let step = std::future::poll_fn(|cx| match body.as_mut().poll(cx) {
            Poll::Ready(result) => Poll::Ready(Step::Done(result)),
            Poll::Pending => match chan.take_yielded() {
                Some(v) => Poll::Ready(Step::Yield(v)),
                None => Poll::Pending,
            },
        })
        .await;

        match step {
            Step::Yield(v) => {
                if let ObjectKind::Generator(state) = &mut generator.lock().kind {
                    state.body = Some(body);
                }
                Ok((v, false))
            }
            Step::Done(result) => {
                self.finish_generator(generator);
                match result {
                    Ok(v) => Ok((v, true)),
                    Err(t) if self.is_generator_return(&t) => Ok((chan.take_returned(), true)),
                    Err(t) => Err(t),
                }
            }
        }
    }

    fn finish_generator(
        &self,
        generator: &Obj,
    ) {
        if let ObjectKind::Generator(state) = &mut generator.lock().kind {
            state.done = true;
            state.body = None;
        }
    }

    /// Resume and package the outcome as an iterator result object
    async fn generator_step(
        &self,
        this: &Value,
        resume: Resume,
    ) -> JsResult<Value> {
        let Value::Object(generator) = this else {
            return Err(self.type_error("next method called on incompatible receiver"));
        };
        let (value, done) = self.resume_generator(generator, resume).await?;
        Ok(self.iter_result(value, done))
    }
}

fn resume_kind(
    name: &str,
    value: Value,
) -> Resume {
    match name {
        "throw" => Resume::Throw(value),
        "return" => Resume::Return(value),
        _ => Resume::Next(value),
    }
}

/// Install `next`, `return` and `throw` on the generator prototypes
pub(crate) fn install(interp: &Interpreter) {
    let generator_proto = interp.intrinsics().generator_proto.clone();
    for name in ["next", "return", "throw"] {
        interp.define_async_method(&generator_proto, name, 1, move |interp, args: CallArgs| {
            Box::pin(async move {
                let resume = resume_kind(name, args.arg(0));
                interp.generator_step(&args.this, resume).await
            })
        });
    }

    // async generators settle each step into a promise
    let async_proto = interp.intrinsics().async_generator_proto.clone();
    for name in ["next", "return", "throw"] {
        interp.define_async_method(&async_proto, name, 1, move |interp, args: CallArgs| {
            Box::pin(async move {
                let resume = resume_kind(name, args.arg(0));
                let promise = interp.new_promise();
                match interp.generator_step(&args.this, resume).await {
                    Ok(result) => interp.resolve_promise(&promise, result),
                    Err(Throw(e)) => interp.reject_promise(&promise, e),
                }
                Ok(Value::Object(promise))
            })
        });
    }

    let tag = PropertyKey::Symbol(interp.intrinsics().symbols.to_string_tag.clone());
    generator_proto
        .lock()
        .define(tag.clone(), Property::constant(Value::str("Generator")));
    async_proto
        .lock()
        .define(tag, Property::constant(Value::str("AsyncGenerator")));
}
