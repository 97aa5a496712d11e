//! Watcher error types

use domwatch_dom::{DomError, NodeId};
use domwatch_runtime::RuntimeError;
use thiserror::Error;

/// Watcher result type
pub type WatchResult<T> = Result<T, WatchError>;

/// Errors raised synchronously when a watcher cannot be created
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WatchError {
    /// The watched node exists but is not an element
    #[error("{0} is not an element")]
    NotAnElement(NodeId),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Runtime(RuntimeError),
}

impl From<RuntimeError> for WatchError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Dom(e) => WatchError::Dom(e),
            other => WatchError::Runtime(other),
        }
    }
}
