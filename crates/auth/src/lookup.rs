//! The user-lookup collaborator the credential manager calls into.

use async_trait::async_trait;
use thiserror::Error;

use bookstore_core::UserId;

/// What the credential manager needs to know about a token subject.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SubjectStatus {
    pub verified: bool,
}

/// Storage failure while looking a subject up. Propagated as-is.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("subject lookup failed: {0}")]
pub struct LookupError(String);

impl LookupError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[async_trait]
pub trait SubjectLookup: Send + Sync {
    /// `Ok(None)` when the subject does not exist.
    async fn lookup_subject(&self, subject: UserId) -> Result<Option<SubjectStatus>, LookupError>;
}
