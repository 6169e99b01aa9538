//! Input errors raised before anything touches storage.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Rejected client input. Missing rows and uniqueness clashes are reported by
/// the store layer instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A request field or query parameter is out of bounds. The message is
    /// shown to the client as-is.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A path segment does not parse as a record id.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// The client-facing part of the error, without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(msg) | Self::InvalidId(msg) => msg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_drops_the_category_prefix() {
        let err = DomainError::validation("Passwords do not match");
        assert_eq!(err.to_string(), "validation failed: Passwords do not match");
        assert_eq!(err.message(), "Passwords do not match");
    }
}
