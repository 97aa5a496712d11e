//! CSS error types

use thiserror::Error;

/// CSS result type
pub type CssResult<T> = Result<T, CssError>;

/// CSS errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CssError {
    /// Rules of a stylesheet loaded from another origin cannot be read
    #[error("Cannot access rules of cross-origin stylesheet '{href}'")]
    SecurityError { href: String },
}
