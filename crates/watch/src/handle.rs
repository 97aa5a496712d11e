//! Watcher disposal handle

use std::fmt;
use std::rc::Rc;

/// Implemented by each watcher kind
pub(crate) trait Watcher {
    /// Detach for good; must be idempotent
    fn dispose(&self);

    /// Whether the watcher can still invoke its callback
    fn is_active(&self) -> bool;
}

/// Disposer returned by the `watch_for_*` functions.
///
/// `dispose()` may be called any number of times, including from inside
/// the watcher's own callback. Dropping the handle does not stop the
/// watcher.
#[derive(Clone)]
#[must_use = "dropping a WatchHandle does not stop the watcher"]
pub struct WatchHandle {
    watcher: Rc<dyn Watcher>,
}

impl WatchHandle {
    pub(crate) fn new(watcher: Rc<dyn Watcher>) -> Self {
        Self { watcher }
    }

    /// Stop watching; no callback runs after this returns
    pub fn dispose(&self) {
        self.watcher.dispose();
    }

    /// Whether the watcher is still monitoring (or about to deliver)
    pub fn is_active(&self) -> bool {
        self.watcher.is_active()
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("active", &self.is_active())
            .finish()
    }
}
