//! Mount transitions
//!
//! Translates a desired-mounted flag into the pair the renderer needs:
//! whether the content is still in the tree and whether the "active" styling
//! applies. Entering is immediate; leaving drops `active` at once but keeps
//! the content mounted for the transition duration so the exit can animate.

use crate::{
    cell::Current,
    timer::{Scheduler, TimerSlot},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Callback fired on a transition edge
pub type TransitionCallback = Arc<dyn Fn() + Send + Sync>;

/// Output of a [`MountTransition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MountState {
    /// Keep the content in the tree
    pub should_mount: bool,
    /// Apply the active styling
    pub active: bool,
}

pub struct MountTransition {
    state: Arc<Current<MountState>>,
    intent: bool,
    duration: Duration,
    exit_timer: TimerSlot,
    on_entering: Option<TransitionCallback>,
    on_exited: Option<TransitionCallback>,
}

impl MountTransition {
    pub fn new(should_be_mounted: bool, duration: Duration, scheduler: Scheduler) -> Self {
        Self {
            state: Arc::new(Current::new(MountState {
                should_mount: should_be_mounted,
                active: should_be_mounted,
            })),
            intent: should_be_mounted,
            duration,
            exit_timer: TimerSlot::new("mount-exit", scheduler),
            on_entering: None,
            on_exited: None,
        }
    }

    /// Called when a transition into the mounted state begins
    pub fn on_entering(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_entering = Some(Arc::new(callback));
        self
    }

    /// Called once the exit duration has elapsed and the content is removed
    pub fn on_exited(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_exited = Some(Arc::new(callback));
        self
    }

    pub fn set_should_be_mounted(&mut self, should_be_mounted: bool) {
        if self.intent == should_be_mounted {
            return;
        }
        self.intent = should_be_mounted;

        if should_be_mounted {
            let interrupted_exit = self.exit_timer.cancel();
            self.state.set(MountState {
                should_mount: true,
                active: true,
            });
            debug!(interrupted_exit, "Mount transition entering");
            if let Some(callback) = &self.on_entering {
                callback();
            }
            return;
        }

        self.state.update(|s| s.active = false);
        debug!(duration_ms = self.duration.as_millis() as u64, "Mount transition leaving");

        let state = Arc::clone(&self.state);
        let on_exited = self.on_exited.clone();
        self.exit_timer.schedule(self.duration, move || {
            let removed = state.update_if(|s| {
                if s.active || !s.should_mount {
                    return false;
                }
                s.should_mount = false;
                true
            });
            if removed {
                debug!("Mount transition exited");
                if let Some(callback) = on_exited {
                    callback();
                }
            }
        });
    }

    pub fn should_be_mounted(&self) -> bool {
        self.intent
    }

    pub fn state(&self) -> MountState {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<MountState> {
        self.state.subscribe()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}
