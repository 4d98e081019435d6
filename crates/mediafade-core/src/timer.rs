//! Cancellable delayed actions and fire-and-forget tasks
//!
//! Components capture the runtime once at construction ([`Scheduler`]) so
//! later input changes can schedule work from synchronous code.

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

/// Handle to the runtime that drives a component's timers and probes
#[derive(Debug, Clone)]
pub struct Scheduler {
    handle: Handle,
}

impl Scheduler {
    /// Capture the runtime the caller is running in
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(|handle| Self { handle })
            .map_err(|_| Error::NoRuntime)
    }

    pub fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Run `action` once `after` has elapsed
    pub fn delay<F>(&self, after: Duration, action: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.spawn(async move {
            tokio::time::sleep(after).await;
            action();
        })
    }
}

/// A slot holding at most one pending delayed action
///
/// Scheduling replaces (and cancels) whatever was pending. Dropping the slot
/// cancels the pending action.
#[derive(Debug)]
pub struct TimerSlot {
    name: &'static str,
    scheduler: Scheduler,
    pending: Option<JoinHandle<()>>,
}

impl TimerSlot {
    pub fn new(name: &'static str, scheduler: Scheduler) -> Self {
        Self {
            name,
            scheduler,
            pending: None,
        }
    }

    pub fn schedule<F>(&mut self, after: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        trace!(timer = self.name, after_ms = after.as_millis() as u64, "Timer scheduled");
        self.pending = Some(self.scheduler.delay(after, action));
    }

    /// Cancel the pending action; returns true if one was still waiting
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                trace!(timer = self.name, "Timer cancelled");
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Fire-and-forget tasks owned by a component, aborted when it goes away
#[derive(Debug)]
pub struct TaskGroup {
    scheduler: Scheduler,
    tasks: Vec<JoinHandle<()>>,
}

impl TaskGroup {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            tasks: Vec::new(),
        }
    }

    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.retain(|task| !task.is_finished());
        self.tasks.push(self.scheduler.spawn(future));
    }

    /// Number of tasks still running
    pub fn active(&self) -> usize {
        self.tasks.iter().filter(|task| !task.is_finished()).count()
    }

    pub fn abort_all(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for TaskGroup {
    fn drop(&mut self) {
        self.abort_all();
    }
}
