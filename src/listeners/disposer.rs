//! Registration handles.

use parking_lot::Mutex;
use std::fmt;

type DisposeFn = Box<dyn FnOnce() + Send>;

/// Removes exactly one registration when disposed or dropped.
///
/// Disposing twice is a no-op.
#[must_use = "dropping a Disposer removes the registration immediately"]
pub struct Disposer {
    action: Mutex<Option<DisposeFn>>,
}

impl Disposer {
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            action: Mutex::new(Some(Box::new(action))),
        }
    }

    /// Remove the registration.
    pub fn dispose(&self) {
        // Take first so the action runs without the lock held.
        let action = self.action.lock().take();
        if let Some(action) = action {
            action();
        }
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        if let Some(action) = self.action.get_mut().take() {
            action();
        }
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.action.lock().is_none())
            .finish()
    }
}
