//! Evaluation context
//!
//! The target being evaluated is published through a tokio task-local for
//! the duration of its evaluation. Anything running inside that future
//! (native helpers called from arbitrarily deep JavaScript, promise jobs,
//! timers) reads it with [`current`]. Thunks registered through `defer`
//! go to a queue shared by the whole build and run once at its end.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::runtime::value::Value;
use crate::util::span::Span;

tokio::task_local! {
    static CONTEXT: EvaluationContext;
}

/// What is being evaluated right now
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    /// File containing the target
    pub source_file: PathBuf,
    /// Byte range of the target in that file
    pub position: Span,
    pub defer_queue: DeferQueue,
}

/// A thunk registered with `defer`, with the context it was registered in
#[derive(Debug, Clone)]
pub struct Deferred {
    pub thunk: Value,
    pub source_file: PathBuf,
    pub position: Span,
}

impl Deferred {
    /// Context to run the thunk in
    pub fn context(
        &self,
        queue: &DeferQueue,
    ) -> EvaluationContext {
        EvaluationContext {
            source_file: self.source_file.clone(),
            position: self.position,
            defer_queue: queue.clone(),
        }
    }
}

/// Build-wide FIFO of deferred thunks
#[derive(Debug, Clone, Default)]
pub struct DeferQueue(Arc<Mutex<Vec<Deferred>>>);

impl DeferQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &self,
        deferred: Deferred,
    ) {
        self.0.lock().push(deferred);
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    /// Take every queued thunk in registration order
    pub fn take(&self) -> Vec<Deferred> {
        std::mem::take(&mut *self.0.lock())
    }
}

/// Run `fut` with `ctx` as the current evaluation context
pub async fn with_context<F>(
    ctx: EvaluationContext,
    fut: F,
) -> F::Output
where
    F: Future,
{
    CONTEXT.scope(ctx, fut).await
}

/// Context of the evaluation running on this task, if any
pub fn current() -> Option<EvaluationContext> {
    CONTEXT.try_with(|ctx| ctx.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(queue: &DeferQueue) -> EvaluationContext {
        EvaluationContext {
            source_file: PathBuf::from("/p/a.ts"),
            position: Span::new(3, 9),
            defer_queue: queue.clone(),
        }
    }

    #[tokio::test]
    async fn test_context_is_scoped() {
        assert!(current().is_none());
        let queue = DeferQueue::new();
        let seen = with_context(context(&queue), async {
            tokio::task::yield_now().await;
            current().map(|c| c.position)
        })
        .await;
        assert_eq!(seen, Some(Span::new(3, 9)));
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn test_queue_is_fifo_and_shared() {
        let queue = DeferQueue::new();
        let ctx = context(&queue);
        for n in 0..3 {
            ctx.defer_queue.push(Deferred {
                thunk: Value::Number(n as f64),
                source_file: ctx.source_file.clone(),
                position: ctx.position,
            });
        }
        assert_eq!(queue.len(), 3);
        let taken: Vec<f64> = queue.take().iter().filter_map(|d| d.thunk.as_number()).collect();
        assert_eq!(taken, [0.0, 1.0, 2.0]);
        assert!(queue.is_empty());
    }
}
