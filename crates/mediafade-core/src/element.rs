//! Live media elements and the handle exposed to callers
//!
//! The renderer owns element creation. Once it inserts an element it attaches
//! it to the component's [`ElementRef`]; the component drives it through the
//! [`MediaElement`] trait and callers may reach the same element for
//! imperative control the state machines are not told about.

use crate::{cell::Current, Error, Result};
use std::sync::Arc;

/// A live image or video element
///
/// Every capability is optional. The defaults report
/// [`Error::Unsupported`], which the state machines treat as a no-op.
pub trait MediaElement: Send + Sync {
    /// Begin or resume playback
    fn play(&self) -> Result<()> {
        Err(Error::unsupported("play"))
    }

    fn pause(&self) -> Result<()> {
        Err(Error::unsupported("pause"))
    }

    /// Set output volume in `0.0..=1.0`
    fn set_volume(&self, _volume: f64) -> Result<()> {
        Err(Error::unsupported("set_volume"))
    }
}

/// Shared reference to the currently attached element, if any
#[derive(Clone)]
pub struct ElementRef {
    slot: Arc<Current<Option<Arc<dyn MediaElement>>>>,
}

impl ElementRef {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Current::new(None)),
        }
    }

    /// Attach a live element, returning the one it replaces
    pub fn attach(&self, element: Arc<dyn MediaElement>) -> Option<Arc<dyn MediaElement>> {
        self.slot.set(Some(element))
    }

    pub fn detach(&self) -> Option<Arc<dyn MediaElement>> {
        self.slot.set(None)
    }

    pub fn get(&self) -> Option<Arc<dyn MediaElement>> {
        self.slot.get()
    }

    pub fn is_attached(&self) -> bool {
        self.slot.with(Option::is_some)
    }
}

impl Default for ElementRef {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementRef")
            .field("attached", &self.is_attached())
            .finish()
    }
}
