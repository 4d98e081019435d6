//! Current-value cells
//!
//! Asynchronous continuations (timer expiry, probe completion, exit
//! transitions) must act on the value an input has *when they run*, not the
//! value captured when they were created. Every volatile input is therefore
//! held in a [`Current`] cell that is updated synchronously on change and
//! read by the continuation at its own invocation time.
//!
//! Cells are backed by a `watch` channel, so any state they hold can also be
//! observed by subscribers.

use tokio::sync::watch;

/// A shared cell holding the latest value of an input or piece of state
#[derive(Debug)]
pub struct Current<T> {
    tx: watch::Sender<T>,
}

/// A value transition reported by [`Current::change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change<T> {
    pub previous: T,
    pub current: T,
}

impl Change<bool> {
    /// `false -> true`
    pub fn rose(&self) -> bool {
        !self.previous && self.current
    }

    /// `true -> false`
    pub fn fell(&self) -> bool {
        self.previous && !self.current
    }
}

impl<T> Current<T> {
    pub fn new(value: T) -> Self {
        let (tx, _) = watch::channel(value);
        Self { tx }
    }

    /// Replace the value, returning the previous one
    pub fn set(&self, value: T) -> T {
        self.tx.send_replace(value)
    }

    /// Read the value through a closure without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Mutate in place and notify subscribers
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.tx.send_modify(f);
    }

    /// Mutate in place; subscribers are only notified when `f` returns true
    pub fn update_if(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        self.tx.send_if_modified(f)
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone> Current<T> {
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }
}

impl<T: Clone + PartialEq> Current<T> {
    /// Store `value` and report the transition if it differs from the held one
    ///
    /// Setting an equal value is not a change: nothing is stored, subscribers
    /// are not woken and `None` is returned.
    pub fn change(&self, value: T) -> Option<Change<T>> {
        let mut previous = None;
        self.tx.send_if_modified(|held| {
            if *held == value {
                return false;
            }
            previous = Some(std::mem::replace(held, value.clone()));
            true
        });
        previous.map(|previous| Change {
            previous,
            current: value,
        })
    }
}

impl<T: Default> Default for Current<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
