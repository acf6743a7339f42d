//! Error types for foreign handle operations.

use thiserror::Error;

/// Result type alias for fallible handle and listener-set operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for foreign handle operations.
///
/// Reference-count operations never fail; only hashing and registration do.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The foreign runtime could not compute an identity hash for the object.
    #[error("object is not hashable: {0}")]
    Unhashable(String),

    /// A null handle was offered as a listener.
    #[error("cannot register a null listener")]
    NullListener,

    /// The listener identity is already present.
    #[error("listener already registered")]
    DuplicateListener,
}

impl Error {
    /// Check if this error came from the foreign runtime's hash function.
    pub fn is_unhashable(&self) -> bool {
        matches!(self, Error::Unhashable(_))
    }
}
