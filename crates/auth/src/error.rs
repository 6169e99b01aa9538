use thiserror::Error;

use crate::lookup::LookupError;

/// Why a credential could not be issued or accepted.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no credential presented")]
    Missing,

    /// Bad signature, malformed token, wrong kind or impossible time window.
    #[error("invalid credential: {0}")]
    Invalid(String),

    #[error("credential has expired")]
    Expired,

    #[error("credential subject no longer exists")]
    SubjectNotFound,

    #[error("credential subject is not verified")]
    UnverifiedSubject,

    #[error("failed to sign credential: {0}")]
    Signing(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl CredentialError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    /// Client-facing reason for an unauthenticated request.
    ///
    /// Every credential failure collapses to the same unauthorized outcome and
    /// only this text differs. Returns `None` for server-side failures
    /// (signing, lookup), which are not the client's fault.
    pub fn unauthenticated_reason(&self) -> Option<&'static str> {
        match self {
            Self::Missing => Some("you are not logged in"),
            Self::SubjectNotFound => Some("user no longer exist"),
            Self::UnverifiedSubject => Some("please verify your account"),
            Self::Invalid(_) | Self::Expired => Some("Token is invalid or has expired"),
            Self::Signing(_) | Self::Lookup(_) => None,
        }
    }
}
