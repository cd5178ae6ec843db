//! Background work attached to a request.
//!
//! The edge host hands the response to the client first and only then
//! retires the request. Work submitted through [`TaskScheduler::wait_until`]
//! runs in that window: it never delays the response, but the host awaits
//! it before the request is considered finished.

use std::cell::RefCell;
use std::future::Future;

use futures::future::{join_all, LocalBoxFuture};
use futures::FutureExt;

use crate::context::RequestId;

/// Capability to submit fire-and-forget work tracked by the host.
pub trait TaskScheduler {
    /// Submit a task that must complete before the request is retired.
    fn wait_until(&self, task: LocalBoxFuture<'static, ()>);
}

/// Per-request execution context holding deferred background tasks.
///
/// Tasks are not polled when submitted. The host calls [`ExecutionContext::drain`]
/// after the response has been handed off.
pub struct ExecutionContext {
    request_id: RequestId,
    pending: RefCell<Vec<LocalBoxFuture<'static, ()>>>,
}

impl ExecutionContext {
    /// Create a context for a request.
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            pending: RefCell::new(Vec::new()),
        }
    }

    /// Submit any future as a background task.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + 'static,
    {
        self.wait_until(task.boxed_local());
    }

    /// Number of tasks not yet drained.
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// The request this context belongs to.
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Run every submitted task to completion, returning how many ran.
    ///
    /// Tasks submitted while draining are picked up in the next round.
    pub async fn drain(&self) -> usize {
        let mut completed = 0;
        loop {
            let batch: Vec<_> = self.pending.borrow_mut().drain(..).collect();
            if batch.is_empty() {
                return completed;
            }
            completed += batch.len();
            join_all(batch).await;
        }
    }
}

impl TaskScheduler for ExecutionContext {
    fn wait_until(&self, task: LocalBoxFuture<'static, ()>) {
        self.pending.borrow_mut().push(task);
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("request_id", &self.request_id)
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[tokio::test]
    async fn test_tasks_do_not_run_until_drained() {
        let ctx = ExecutionContext::new(RequestId::from_string("req-1"));
        let ran = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let ran = ran.clone();
            ctx.spawn(async move {
                ran.borrow_mut().push(i);
            });
        }

        assert_eq!(ctx.pending(), 3);
        assert!(ran.borrow().is_empty());

        assert_eq!(ctx.drain().await, 3);
        assert_eq!(*ran.borrow(), vec![0, 1, 2]);
        assert_eq!(ctx.pending(), 0);
    }

    #[tokio::test]
    async fn test_drain_empty_context() {
        let ctx = ExecutionContext::new(RequestId::generate());
        assert_eq!(ctx.drain().await, 0);
    }
}
