//! Domwatch Style
//!
//! Looks up the declarations an element picks up from loaded stylesheets
//! through its class list. Only exact `.class` selector text matches;
//! there is no cascade, specificity or inheritance.

pub mod resolver;

pub use resolver::{applied_class_rules, class_selector};
