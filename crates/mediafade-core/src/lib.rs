//! mediafade Core - fade-in images and transition-aware video playback
//!
//! This crate provides two headless presentation primitives:
//! - `FadeImage`: loads an image source and decides when (and whether) to
//!   fade it in
//! - `VideoPlayer`: reconciles pause/mount/mute intents with native media
//!   events and decides when the video may be revealed over its poster
//!
//! Rendering is left to the host. Components expose a view snapshot of what
//! to draw and an element handle for the live media element the host creates.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         mediafade Core                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   intents (pause/mount/muted/source)     native media events    │
//! │                  │                                │             │
//! │           ┌──────┴──────────────────────────────┴──────┐      │
//! │           │                VideoPlayer                  │      │
//! │           └──────┬───────────────┬───────────────┬──────┘      │
//! │                  │               │               │              │
//! │         ┌────────┴─────┐ ┌───────┴───────┐ ┌─────┴──────┐       │
//! │         │  FadeImage   │ │    Mount      │ │  Element   │       │
//! │         │  (poster)    │ │  Transition   │ │    Ref     │       │
//! │         └────────┬─────┘ └───────┬───────┘ └────────────┘       │
//! │                  │               │                              │
//! │         ┌────────┴─────┐ ┌───────┴───────┐ ┌────────────┐       │
//! │         │ MediaProbe   │ │  TimerSlot    │ │  Current   │       │
//! │         └──────────────┘ └───────────────┘ └────────────┘       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use mediafade_core::{SimulatedProbe, VideoOptions, VideoPlayer};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> mediafade_core::Result<()> {
//! let probe = Arc::new(SimulatedProbe::new(Duration::from_millis(120)));
//! let options = VideoOptions::default()
//!     .with_source("https://cdn.example.com/intro.mp4")
//!     .with_poster("https://cdn.example.com/intro.jpg");
//! let player = VideoPlayer::new(options, probe)?;
//!
//! let view = player.view();
//! assert!(view.mount_video);
//! # Ok(())
//! # }
//! ```

pub mod cell;
pub mod element;
pub mod error;
pub mod events;
pub mod image;
pub mod probe;
pub mod timer;
pub mod transition;
pub mod types;
pub mod video;

pub use cell::{Change, Current};
pub use element::{ElementRef, MediaElement};
pub use error::{Error, Result};
pub use events::{MediaEvent, MediaEventHandler, MediaEventHandlers};
pub use image::{FadeImage, FadeImageOptions, FadeImageView, FadeTransition, LoadPhase, LoadState};
pub use probe::{DefaultProbe, MediaProbe, ProbeScript, SimulatedProbe};
pub use timer::{Scheduler, TaskGroup, TimerSlot};
pub use transition::{MountState, MountTransition, TransitionCallback};
pub use types::*;
pub use video::{PlaybackPhase, PlaybackState, VideoOptions, VideoPlayer, VideoView};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version; the host installs its own subscriber
pub fn init() {
    tracing::info!(version = VERSION, "mediafade Core initialized");
}
