//! Content watcher configuration

use domwatch_dom::ObserveOptions;
use serde::{Deserialize, Serialize};

/// Options for [`watch_for_content_change`](crate::watch_for_content_change).
///
/// Deserializes from camelCase option objects such as
/// `{"watchAttributes": true, "debounceMs": 50}`; missing fields take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentWatchConfig {
    /// Track added and removed child nodes
    pub watch_children: bool,
    /// Track text node changes
    pub watch_text: bool,
    /// Track attribute changes
    pub watch_attributes: bool,
    /// Only these attributes (implies `watch_attributes`); `None` means all
    pub attribute_filter: Option<Vec<String>>,
    /// Watch descendants, not just the element itself
    pub watch_subtree: bool,
    /// Quiet period before a batch is delivered; 0 delivers every batch
    pub debounce_ms: u64,
    /// Stop after the first delivered batch
    pub once: bool,
}

impl Default for ContentWatchConfig {
    fn default() -> Self {
        Self {
            watch_children: true,
            watch_text: true,
            watch_attributes: false,
            attribute_filter: None,
            watch_subtree: true,
            debounce_ms: 0,
            once: false,
        }
    }
}

impl ContentWatchConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_children(mut self, enabled: bool) -> Self {
        self.watch_children = enabled;
        self
    }

    pub fn with_text(mut self, enabled: bool) -> Self {
        self.watch_text = enabled;
        self
    }

    pub fn with_attributes(mut self, enabled: bool) -> Self {
        self.watch_attributes = enabled;
        self
    }

    /// Restrict attribute tracking to the given names
    pub fn with_attribute_filter<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_filter = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_subtree(mut self, enabled: bool) -> Self {
        self.watch_subtree = enabled;
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    pub fn with_once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    /// Observer options for the underlying mutation observer
    pub fn observe_options(&self) -> ObserveOptions {
        ObserveOptions {
            child_list: self.watch_children,
            attributes: self.watch_attributes,
            character_data: self.watch_text,
            subtree: self.watch_subtree,
            attribute_filter: self.attribute_filter.clone(),
            ..ObserveOptions::default()
        }
    }
}
