//! DOM error types

use thiserror::Error;

/// DOM operation result type
pub type DomResult<T> = Result<T, DomError>;

/// DOM errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(u32),

    #[error("Observer not found: {0}")]
    ObserverNotFound(u32),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid node type for operation")]
    InvalidNodeType,

    /// The reference node is not a child of the given parent
    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: u32, child: u32 },

    /// Insertion would produce an invalid tree (cycle, child under a leaf, ...)
    #[error("Hierarchy request error: {0}")]
    HierarchyRequest(String),

    /// None of childList, attributes or characterData was requested
    #[error("Observe options must request at least one of childList, attributes or characterData")]
    InvalidObserveOptions,
}
