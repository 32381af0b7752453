//! Promise jobs and timers
//!
//! Microtasks run in FIFO order. Timers are kept sorted by due time and only
//! run when no microtask is queued; waiting for one suspends on
//! `tokio::time::sleep_until`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use super::{Interpreter, JsResult, Throw};
use crate::runtime::value::{CallArgs, Obj, Object, ObjectKind, PromiseState, PropertyKey, Reaction, Value};

/// Queued microtask
pub(crate) enum Job {
    /// Run a `then` callback and settle the derived promise
    Reaction {
        handler: Value,
        argument: Value,
        derived: Option<Obj>,
        rejected: bool,
    },
    /// Adopt the state of a thenable
    ResolveThenable { promise: Obj, thenable: Value, then: Value },
    /// `queueMicrotask(callback)`
    Callback(Value),
}

struct Timer {
    id: u64,
    due: Instant,
    callback: Value,
    args: Vec<Value>,
    interval: Option<Duration>,
}

/// Pending microtasks and timers of one interpreter
#[derive(Default)]
pub struct JobQueue {
    microtasks: Mutex<VecDeque<Job>>,
    timers: Mutex<Vec<Timer>>,
    next_timer: AtomicU64,
}

impl JobQueue {
    fn push(
        &self,
        job: Job,
    ) {
        self.microtasks.lock().push_back(job);
    }

    fn pop(&self) -> Option<Job> {
        self.microtasks.lock().pop_front()
    }

    /// Number of timers still scheduled
    pub fn pending_timers(&self) -> usize {
        self.timers.lock().len()
    }

    fn schedule(
        &self,
        mut timer: Timer,
    ) -> u64 {
        if timer.id == 0 {
            timer.id = self.next_timer.fetch_add(1, Ordering::Relaxed) + 1;
        }
        let id = timer.id;
        let mut timers = self.timers.lock();
        let pos = timers
            .iter()
            .position(|t| (t.due, t.id) > (timer.due, timer.id))
            .unwrap_or(timers.len());
        timers.insert(pos, timer);
        id
    }

    fn cancel(
        &self,
        id: u64,
    ) {
        self.timers.lock().retain(|t| t.id != id);
    }

    fn pop_timer(&self) -> Option<Timer> {
        let mut timers = self.timers.lock();
        (!timers.is_empty()).then(|| timers.remove(0))
    }
}

/// Settled state of a promise
pub enum Settled {
    Pending,
    Fulfilled(Value),
    Rejected(Value),
}

impl Interpreter {
    /// New pending promise
    pub fn new_promise(&self) -> Obj {
        Obj::new(Object::new(
            Some(self.intrinsics().promise_proto.clone()),
            ObjectKind::Promise(PromiseState::Pending(Vec::new())),
        ))
    }

    pub fn is_promise(
        &self,
        value: &Value,
    ) -> bool {
        matches!(value, Value::Object(o) if matches!(o.lock().kind, ObjectKind::Promise(_)))
    }

    pub fn promise_state(
        &self,
        promise: &Obj,
    ) -> Settled {
        match &promise.lock().kind {
            ObjectKind::Promise(PromiseState::Fulfilled(v)) => Settled::Fulfilled(v.clone()),
            ObjectKind::Promise(PromiseState::Rejected(v)) => Settled::Rejected(v.clone()),
            _ => Settled::Pending,
        }
    }

    /// Resolve `promise` with `value`, adopting thenables
    pub fn resolve_promise(
        &self,
        promise: &Obj,
        value: Value,
    ) {
        if let Value::Object(obj) = &value {
            if obj.ptr_eq(promise) {
                let err = self.type_error("Chaining cycle detected for promise");
                self.reject_promise(promise, err.0);
                return;
            }
            let then = self.get_data(&value, &PropertyKey::from("then"));
            if let Some(then) = then.filter(|t| self.is_callable(t)) {
                self.realm.jobs.push(Job::ResolveThenable {
                    promise: promise.clone(),
                    thenable: value,
                    then,
                });
                return;
            }
        }
        self.settle_promise(promise, PromiseState::Fulfilled(value));
    }

    pub fn reject_promise(
        &self,
        promise: &Obj,
        reason: Value,
    ) {
        self.settle_promise(promise, PromiseState::Rejected(reason));
    }

    fn settle_promise(
        &self,
        promise: &Obj,
        state: PromiseState,
    ) {
        let (reactions, argument, rejected) = {
            let mut object = promise.lock();
            let ObjectKind::Promise(current) = &mut object.kind else {
                return;
            };
            if !matches!(current, PromiseState::Pending(_)) {
                return;
            }
            let (argument, rejected) = match &state {
                PromiseState::Fulfilled(v) => (v.clone(), false),
                PromiseState::Rejected(v) => (v.clone(), true),
                PromiseState::Pending(_) => return,
            };
            match std::mem::replace(current, state) {
                PromiseState::Pending(reactions) => (reactions, argument, rejected),
                _ => return,
            }
        };
        for reaction in reactions {
            self.enqueue_reaction(reaction, argument.clone(), rejected);
        }
    }

    fn enqueue_reaction(
        &self,
        reaction: Reaction,
        argument: Value,
        rejected: bool,
    ) {
        let handler = if rejected {
            reaction.on_rejected
        } else {
            reaction.on_fulfilled
        };
        self.realm.jobs.push(Job::Reaction {
            handler,
            argument,
            derived: reaction.derived,
            rejected,
        });
    }

    /// Register callbacks on a promise (`then` without creating the derived promise)
    pub fn promise_then(
        &self,
        promise: &Obj,
        on_fulfilled: Value,
        on_rejected: Value,
        derived: Option<Obj>,
    ) {
        let reaction = Reaction {
            on_fulfilled,
            on_rejected,
            derived,
        };
        let settled = {
            let mut object = promise.lock();
            match &mut object.kind {
                ObjectKind::Promise(PromiseState::Pending(reactions)) => {
                    reactions.push(reaction);
                    return;
                }
                ObjectKind::Promise(PromiseState::Fulfilled(v)) => (v.clone(), false),
                ObjectKind::Promise(PromiseState::Rejected(v)) => (v.clone(), true),
                _ => return,
            }
        };
        self.enqueue_reaction(reaction, settled.0, settled.1);
    }

    /// `Promise.resolve(value)`
    pub fn promise_resolved(
        &self,
        value: Value,
    ) -> Obj {
        if let Value::Object(obj) = &value {
            if self.is_promise(&value) {
                return obj.clone();
            }
        }
        let promise = self.new_promise();
        self.resolve_promise(&promise, value);
        promise
    }

    pub fn promise_rejected(
        &self,
        reason: Value,
    ) -> Obj {
        let promise = self.new_promise();
        self.reject_promise(&promise, reason);
        promise
    }

    /// `resolve` and `reject` functions bound to `promise`; only the first call counts
    pub fn resolving_functions(
        &self,
        promise: &Obj,
    ) -> (Obj, Obj) {
        let done = Arc::new(AtomicBool::new(false));
        let (p, d) = (promise.clone(), done.clone());
        let resolve = self.native_fn("", 1, move |interp, args: CallArgs| {
            if !d.swap(true, Ordering::SeqCst) {
                interp.resolve_promise(&p, args.arg(0));
            }
            Ok(Value::Undefined)
        });
        let p = promise.clone();
        let reject = self.native_fn("", 1, move |interp, args: CallArgs| {
            if !done.swap(true, Ordering::SeqCst) {
                interp.reject_promise(&p, args.arg(0));
            }
            Ok(Value::Undefined)
        });
        (resolve, reject)
    }

    /// Queue `callback` as a microtask
    pub fn queue_microtask(
        &self,
        callback: Value,
    ) {
        self.realm.jobs.push(Job::Callback(callback));
    }

    /// Schedule `callback` after `delay`; returns the timer id
    pub fn set_timer(
        &self,
        callback: Value,
        delay: Duration,
        args: Vec<Value>,
        repeat: bool,
    ) -> u64 {
        self.realm.jobs.schedule(Timer {
            id: 0,
            due: Instant::now() + delay,
            callback,
            args,
            interval: repeat.then_some(delay.max(Duration::from_millis(1))),
        })
    }

    pub fn clear_timer(
        &self,
        id: u64,
    ) {
        self.realm.jobs.cancel(id);
    }

    async fn run_job(
        &self,
        job: Job,
    ) {
        match job {
            Job::Reaction {
                handler,
                argument,
                derived,
                rejected,
            } => {
                let outcome = if self.is_callable(&handler) {
                    self.call(&handler, Value::Undefined, vec![argument]).await
                } else if rejected {
                    Err(Throw(argument))
                } else {
                    Ok(argument)
                };
                if let Some(derived) = derived {
                    match outcome {
                        Ok(v) => self.resolve_promise(&derived, v),
                        Err(Throw(e)) => self.reject_promise(&derived, e),
                    }
                }
            }
            Job::ResolveThenable {
                promise,
                thenable,
                then,
            } => {
                let (resolve, reject) = self.resolving_functions(&promise);
                let args = vec![Value::Object(resolve), Value::Object(reject.clone())];
                if let Err(Throw(e)) = self.call(&then, thenable, args).await {
                    let _ = self.call_function(&reject, Value::Undefined, vec![e]).await;
                }
            }
            Job::Callback(callback) => {
                if let Err(throw) = self.call(&callback, Value::Undefined, Vec::new()).await {
                    tracing::warn!("uncaught exception in microtask: {}", self.describe(&throw));
                }
            }
        }
    }

    /// Run every queued microtask, including ones queued while draining
    pub async fn drain_microtasks(&self) {
        while let Some(job) = self.realm.jobs.pop() {
            self.run_job(job).await;
        }
    }

    /// Run one microtask, or wait for and run the earliest timer; `false` if
    /// nothing is scheduled
    pub async fn run_next_job(&self) -> bool {
        if let Some(job) = self.realm.jobs.pop() {
            self.run_job(job).await;
            return true;
        }
        let Some(timer) = self.realm.jobs.pop_timer() else {
            return false;
        };
        tokio::time::sleep_until(timer.due).await;
        if let Some(interval) = timer.interval {
            self.realm.jobs.schedule(Timer {
                id: timer.id,
                due: timer.due + interval,
                callback: timer.callback.clone(),
                args: timer.args.clone(),
                interval: timer.interval,
            });
        }
        if let Err(throw) = self.call(&timer.callback, Value::Undefined, timer.args).await {
            tracing::warn!("uncaught exception in timer callback: {}", self.describe(&throw));
        }
        true
    }

    /// `await value`: run jobs until the promise (or thenable) settles
    pub async fn await_value(
        &self,
        value: Value,
    ) -> JsResult<Value> {
        self.drain_microtasks().await;
        let promise = match &value {
            Value::Object(obj) if self.is_promise(&value) => obj.clone(),
            Value::Object(_) => {
                let then = self.get_named(&value, "then").await?;
                if !self.is_callable(&then) {
                    return Ok(value);
                }
                let promise = self.new_promise();
                self.realm.jobs.push(Job::ResolveThenable {
                    promise: promise.clone(),
                    thenable: value.clone(),
                    then,
                });
                promise
            }
            _ => return Ok(value),
        };
        loop {
            match self.promise_state(&promise) {
                Settled::Fulfilled(v) => return Ok(v),
                Settled::Rejected(e) => return Err(Throw(e)),
                Settled::Pending => {}
            }
            if !self.run_next_job().await {
                return Err(self.type_error("awaited promise can never settle: no pending jobs or timers"));
            }
        }
    }
}
