//! Domwatch Watchers
//!
//! Two observation utilities built on a [`Page`](domwatch_runtime::Page):
//!
//! - [`watch_for_replacement`] fires once when an element is removed from
//!   the document, guessing which element replaced it.
//! - [`watch_for_content_change`] reports batches of subtree, text and
//!   attribute changes, optionally debounced and optionally one-shot.
//!
//! Both return a [`WatchHandle`] whose `dispose()` stops the watcher.

mod config;
mod content;
mod error;
mod handle;
mod replacement;
mod summary;

#[cfg(test)]
mod test_util;

pub use config::ContentWatchConfig;
pub use content::{watch_for_content_change, ChangeBatch};
pub use error::{WatchError, WatchResult};
pub use handle::WatchHandle;
pub use replacement::{watch_for_replacement, ReplacementEvent};
pub use summary::ChangeSummary;
