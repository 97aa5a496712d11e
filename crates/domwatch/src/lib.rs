//! Domwatch - DOM change watchers and CSS declaration helpers
//!
//! Re-exports the public surface of the workspace crates:
//!
//! - [`dom`]: arena DOM tree with mutation records
//! - [`css`]: declaration parsing and the stylesheet model
//! - [`style`]: declarations applied to an element through its classes
//! - [`runtime`]: the page event loop (timers, microtasks, observers)
//! - [`watch`]: replacement and content-change watchers

pub use domwatch_css as css;
pub use domwatch_dom as dom;
pub use domwatch_runtime as runtime;
pub use domwatch_style as style;
pub use domwatch_watch as watch;

pub use domwatch_css::{parse_declarations, DeclarationMap, StyleSheet, StyleSheetList};
pub use domwatch_dom::{DomTree, MutationRecord, NodeId};
pub use domwatch_runtime::Page;
pub use domwatch_style::applied_class_rules;
pub use domwatch_watch::{
    watch_for_content_change, watch_for_replacement, ChangeBatch, ContentWatchConfig, ReplacementEvent,
    WatchHandle,
};
