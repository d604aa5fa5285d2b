#![forbid(unsafe_code)]

//! Recoverable errors reported by the containers.
//!
//! Contract violations, such as writing a property from inside its own `with`
//! closure, are programming errors and panic instead.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReactiveError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    #[error("key not found")]
    KeyNotFound,

    #[error("an entry with the same key already exists")]
    DuplicateKey,

    /// `position` is `None` before the first `move_next`.
    #[error("cursor is before or after the collection (position {position:?}, len {len})")]
    InvalidCursor { position: Option<usize>, len: usize },
}

impl ReactiveError {
    #[must_use]
    pub fn invalid_cursor(position: Option<usize>, len: usize) -> Self {
        Self::InvalidCursor { position, len }
    }
}
