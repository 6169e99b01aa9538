//! `bookstore-auth`: stateless credential issuance and verification.
//!
//! Nothing here depends on HTTP or storage: callers hand
//! in the raw token they found (header or cookie) and a [`SubjectLookup`]
//! implementation for the user table.

pub mod claims;
pub mod error;
pub mod keys;
pub mod lookup;
pub mod manager;
pub mod password;

pub use claims::{TokenClaims, TokenKind, TokenValidationError, validate_claims};
pub use error::CredentialError;
pub use keys::{KeyError, SigningKeys};
pub use lookup::{LookupError, SubjectLookup, SubjectStatus};
pub use manager::{CredentialManager, TokenSettings};
pub use password::{BcryptHasher, PasswordError, PasswordHasher};
