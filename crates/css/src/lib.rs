//! Domwatch CSS
//!
//! Inline declaration parsing and a CSSOM-like stylesheet model
//! (`document.styleSheets` and their `cssRules`).

mod declaration;
mod error;
mod stylesheet;

pub use declaration::{parse_declarations, DeclarationMap};
pub use error::{CssError, CssResult};
pub use stylesheet::{CssRule, MediaRule, StyleRule, StyleSheet, StyleSheetList};
