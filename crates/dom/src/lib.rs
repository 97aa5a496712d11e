//! Domwatch DOM - Document Object Model
//!
//! Arena-backed DOM tree that records structural, attribute and text
//! mutations for registered observers, the way a browser's
//! `MutationObserver` registry does.

mod node;
mod tree;
mod error;
mod mutation;

pub use node::{Node, NodeId, NodeType, ElementData};
pub use tree::DomTree;
pub use error::{DomError, DomResult};
pub use mutation::{MutationKind, MutationRecord, ObserveOptions, ObserverId};
