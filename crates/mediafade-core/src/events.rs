//! Native media events and caller-supplied handlers

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Native media element events consumed by the video state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaEvent {
    Play,
    Pause,
    Ended,
    CanPlay,
}

impl MediaEvent {
    /// DOM event name
    pub fn dom_name(&self) -> &'static str {
        match self {
            MediaEvent::Play => "play",
            MediaEvent::Pause => "pause",
            MediaEvent::Ended => "ended",
            MediaEvent::CanPlay => "canplay",
        }
    }
}

impl std::fmt::Display for MediaEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dom_name())
    }
}

pub type MediaEventHandler = Arc<dyn Fn(MediaEvent) + Send + Sync>;

/// Caller handler slots
///
/// The player wraps these, it never replaces them: each registered handler
/// runs after the player's own reaction to the same event.
#[derive(Clone, Default)]
pub struct MediaEventHandlers {
    on_play: Option<MediaEventHandler>,
    on_pause: Option<MediaEventHandler>,
    on_ended: Option<MediaEventHandler>,
    on_can_play: Option<MediaEventHandler>,
}

impl MediaEventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_play(mut self, handler: impl Fn(MediaEvent) + Send + Sync + 'static) -> Self {
        self.on_play = Some(Arc::new(handler));
        self
    }

    pub fn on_pause(mut self, handler: impl Fn(MediaEvent) + Send + Sync + 'static) -> Self {
        self.on_pause = Some(Arc::new(handler));
        self
    }

    pub fn on_ended(mut self, handler: impl Fn(MediaEvent) + Send + Sync + 'static) -> Self {
        self.on_ended = Some(Arc::new(handler));
        self
    }

    pub fn on_can_play(mut self, handler: impl Fn(MediaEvent) + Send + Sync + 'static) -> Self {
        self.on_can_play = Some(Arc::new(handler));
        self
    }

    fn slot(&self, event: MediaEvent) -> Option<&MediaEventHandler> {
        match event {
            MediaEvent::Play => self.on_play.as_ref(),
            MediaEvent::Pause => self.on_pause.as_ref(),
            MediaEvent::Ended => self.on_ended.as_ref(),
            MediaEvent::CanPlay => self.on_can_play.as_ref(),
        }
    }

    pub fn is_registered(&self, event: MediaEvent) -> bool {
        self.slot(event).is_some()
    }

    /// Invoke the handler registered for `event`, if any
    pub fn dispatch(&self, event: MediaEvent) {
        if let Some(handler) = self.slot(event) {
            handler(event);
        }
    }
}

impl std::fmt::Debug for MediaEventHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaEventHandlers")
            .field("on_play", &self.on_play.is_some())
            .field("on_pause", &self.on_pause.is_some())
            .field("on_ended", &self.on_ended.is_some())
            .field("on_can_play", &self.on_can_play.is_some())
            .finish()
    }
}
