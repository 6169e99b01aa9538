//! Credential manager: mint, verify and refresh signed access/refresh tokens.
//!
//! Tokens are stateless. Nothing is stored server-side, so a token stays valid
//! until its own `exp` even after the client drops its cookies.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Header, Validation};
use tracing::debug;

use bookstore_core::UserId;

use crate::claims::{TokenClaims, TokenKind, TokenValidationError, validate_claims};
use crate::error::CredentialError;
use crate::keys::SigningKeys;
use crate::lookup::SubjectLookup;

/// Independently configurable lifetimes of the two token kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TokenSettings {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenSettings {
    /// Minutes beyond the `Duration` range saturate; issuing then fails.
    pub fn from_minutes(access: i64, refresh: i64) -> Self {
        Self {
            access_ttl: Duration::try_minutes(access).unwrap_or(Duration::MAX),
            refresh_ttl: Duration::try_minutes(refresh).unwrap_or(Duration::MAX),
        }
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }
}

pub struct CredentialManager {
    keys: SigningKeys,
    settings: TokenSettings,
    lookup: Arc<dyn SubjectLookup>,
}

impl CredentialManager {
    pub fn new(keys: SigningKeys, settings: TokenSettings, lookup: Arc<dyn SubjectLookup>) -> Self {
        Self {
            keys,
            settings,
            lookup,
        }
    }

    pub fn settings(&self) -> TokenSettings {
        self.settings
    }

    pub fn issue_access(&self, subject: UserId) -> Result<String, CredentialError> {
        self.issue_at(subject, TokenKind::Access, Utc::now())
    }

    pub fn issue_refresh(&self, subject: UserId) -> Result<String, CredentialError> {
        self.issue_at(subject, TokenKind::Refresh, Utc::now())
    }

    /// Sign a token of `kind` for `subject`, expiring `now + ttl(kind)`.
    pub fn issue_at(&self, subject: UserId, kind: TokenKind, now: DateTime<Utc>) -> Result<String, CredentialError> {
        let claims = TokenClaims::new(subject.to_string(), kind, now, self.settings.ttl(kind))
            .ok_or_else(|| CredentialError::Signing(format!("{kind} token expiry is out of range")))?;
        jsonwebtoken::encode(&Header::new(self.keys.algorithm()), &claims, self.keys.encoding())
            .map_err(|e| CredentialError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: Option<&str>, required: TokenKind) -> Result<UserId, CredentialError> {
        self.verify_at(token, required, Utc::now())
    }

    /// Check signature, kind and expiry (in that order) and return the subject.
    pub fn verify_at(
        &self,
        token: Option<&str>,
        required: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<UserId, CredentialError> {
        let token = match token.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return Err(CredentialError::Missing),
        };

        let data = jsonwebtoken::decode::<TokenClaims>(token, self.keys.decoding(), &self.validation())
            .map_err(|e| CredentialError::invalid(e.to_string()))?;
        let claims = data.claims;

        if claims.kind != required {
            return Err(CredentialError::invalid(format!(
                "expected {required} token, got {}",
                claims.kind
            )));
        }

        validate_claims(&claims, now).map_err(|e| match e {
            TokenValidationError::Expired => CredentialError::Expired,
            other => CredentialError::invalid(other.to_string()),
        })?;

        claims
            .sub
            .parse::<UserId>()
            .map_err(|e| CredentialError::invalid(e.to_string()))
    }

    /// Trade a refresh token for a fresh access token.
    ///
    /// The refresh token itself is not rotated and stays usable until it
    /// expires.
    pub async fn refresh_cycle(&self, refresh_token: Option<&str>) -> Result<String, CredentialError> {
        self.refresh_cycle_at(refresh_token, Utc::now()).await
    }

    pub async fn refresh_cycle_at(
        &self,
        refresh_token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<String, CredentialError> {
        let subject = self.verify_at(refresh_token, TokenKind::Refresh, now)?;
        if self.lookup.lookup_subject(subject).await?.is_none() {
            debug!(%subject, "refresh token subject no longer exists");
            return Err(CredentialError::SubjectNotFound);
        }
        self.issue_at(subject, TokenKind::Access, now)
    }

    /// Resolve the access token to a subject that still exists and is
    /// verified.
    pub async fn require_authenticated_user(&self, access_token: Option<&str>) -> Result<UserId, CredentialError> {
        self.require_authenticated_user_at(access_token, Utc::now()).await
    }

    pub async fn require_authenticated_user_at(
        &self,
        access_token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<UserId, CredentialError> {
        let subject = self.verify_at(access_token, TokenKind::Access, now)?;
        match self.lookup.lookup_subject(subject).await? {
            None => Err(CredentialError::SubjectNotFound),
            Some(status) if !status.verified => Err(CredentialError::UnverifiedSubject),
            Some(_) => Ok(subject),
        }
    }

    fn validation(&self) -> Validation {
        // Expiry is checked against the caller's clock in `validate_claims`.
        let mut validation = Validation::new(self.keys.algorithm());
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        validation
    }
}

impl core::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("keys", &self.keys)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::{LookupError, SubjectStatus};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::RwLock;

    #[derive(Default)]
    struct FakeUsers {
        users: RwLock<HashMap<UserId, SubjectStatus>>,
    }

    impl FakeUsers {
        fn with(users: &[(i64, bool)]) -> Arc<Self> {
            let map = users
                .iter()
                .map(|(id, verified)| (UserId::new(*id), SubjectStatus { verified: *verified }))
                .collect();
            Arc::new(Self { users: RwLock::new(map) })
        }

        fn remove(&self, id: i64) {
            self.users.write().unwrap().remove(&UserId::new(id));
        }
    }

    #[async_trait]
    impl SubjectLookup for FakeUsers {
        async fn lookup_subject(&self, subject: UserId) -> Result<Option<SubjectStatus>, LookupError> {
            Ok(self.users.read().unwrap().get(&subject).copied())
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl SubjectLookup for BrokenStore {
        async fn lookup_subject(&self, _subject: UserId) -> Result<Option<SubjectStatus>, LookupError> {
            Err(LookupError::new("connection refused"))
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn manager_with(secret: &[u8], lookup: Arc<dyn SubjectLookup>) -> CredentialManager {
        CredentialManager::new(
            SigningKeys::hs256(secret).unwrap(),
            TokenSettings::from_minutes(15, 60),
            lookup,
        )
    }

    fn manager(lookup: Arc<dyn SubjectLookup>) -> CredentialManager {
        manager_with(b"test-secret", lookup)
    }

    #[test]
    fn access_token_lives_for_its_ttl() {
        let m = manager(FakeUsers::with(&[]));
        let subject = UserId::new(1);
        let token = m.issue_at(subject, TokenKind::Access, t0()).unwrap();

        let at_14 = m.verify_at(Some(&token), TokenKind::Access, t0() + Duration::minutes(14));
        assert_eq!(at_14.unwrap(), subject);

        let at_16 = m.verify_at(Some(&token), TokenKind::Access, t0() + Duration::minutes(16));
        assert!(matches!(at_16, Err(CredentialError::Expired)));
    }

    #[test]
    fn missing_and_blank_tokens_are_missing() {
        let m = manager(FakeUsers::with(&[]));
        assert!(matches!(m.verify(None, TokenKind::Access), Err(CredentialError::Missing)));
        assert!(matches!(m.verify(Some("  "), TokenKind::Access), Err(CredentialError::Missing)));
    }

    #[test]
    fn token_from_another_key_is_invalid() {
        let ours = manager(FakeUsers::with(&[]));
        let theirs = manager_with(b"other-secret", FakeUsers::with(&[]));
        let token = theirs.issue_at(UserId::new(1), TokenKind::Access, t0()).unwrap();

        let result = ours.verify_at(Some(&token), TokenKind::Access, t0());
        assert!(matches!(result, Err(CredentialError::Invalid(_))));
    }

    #[test]
    fn garbage_is_invalid() {
        let m = manager(FakeUsers::with(&[]));
        let result = m.verify_at(Some("not.a.jwt"), TokenKind::Access, t0());
        assert!(matches!(result, Err(CredentialError::Invalid(_))));
    }

    #[test]
    fn kinds_are_not_interchangeable() {
        let m = manager(FakeUsers::with(&[]));
        let refresh = m.issue_at(UserId::new(1), TokenKind::Refresh, t0()).unwrap();
        let access = m.issue_at(UserId::new(1), TokenKind::Access, t0()).unwrap();

        assert!(matches!(
            m.verify_at(Some(&refresh), TokenKind::Access, t0()),
            Err(CredentialError::Invalid(_))
        ));
        assert!(matches!(
            m.verify_at(Some(&access), TokenKind::Refresh, t0()),
            Err(CredentialError::Invalid(_))
        ));
    }

    #[test]
    fn refresh_outlives_access() {
        let m = manager(FakeUsers::with(&[]));
        let refresh = m.issue_at(UserId::new(3), TokenKind::Refresh, t0()).unwrap();
        let later = t0() + Duration::minutes(59);
        assert_eq!(m.verify_at(Some(&refresh), TokenKind::Refresh, later).unwrap(), UserId::new(3));
    }

    #[test]
    fn oversized_ttl_fails_to_issue() {
        let m = CredentialManager::new(
            SigningKeys::hs256(b"test-secret").unwrap(),
            TokenSettings::from_minutes(200_000_000_000, i64::MAX),
            FakeUsers::with(&[]),
        );
        assert!(matches!(m.issue_at(UserId::new(1), TokenKind::Access, t0()), Err(CredentialError::Signing(_))));
        assert!(matches!(m.issue_at(UserId::new(1), TokenKind::Refresh, t0()), Err(CredentialError::Signing(_))));
    }

    #[test]
    fn every_issued_token_is_distinct() {
        let m = manager(FakeUsers::with(&[]));
        let a = m.issue_at(UserId::new(1), TokenKind::Access, t0()).unwrap();
        let b = m.issue_at(UserId::new(1), TokenKind::Access, t0()).unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn refresh_cycle_mints_access_and_keeps_refresh_usable() {
        let m = manager(FakeUsers::with(&[(5, true)]));
        let refresh = m.issue_at(UserId::new(5), TokenKind::Refresh, t0()).unwrap();

        let now = t0() + Duration::minutes(30);
        let access = m.refresh_cycle_at(Some(&refresh), now).await.unwrap();
        assert_eq!(m.verify_at(Some(&access), TokenKind::Access, now).unwrap(), UserId::new(5));

        // Not single-use.
        assert!(m.refresh_cycle_at(Some(&refresh), now).await.is_ok());
    }

    #[tokio::test]
    async fn refresh_cycle_for_vanished_subject_fails() {
        let users = FakeUsers::with(&[(9, true)]);
        let m = manager(users.clone());
        let refresh = m.issue_at(UserId::new(9), TokenKind::Refresh, t0()).unwrap();
        users.remove(9);

        let result = m.refresh_cycle_at(Some(&refresh), t0()).await;
        assert!(matches!(result, Err(CredentialError::SubjectNotFound)));
    }

    #[tokio::test]
    async fn refresh_cycle_rejects_access_tokens() {
        let m = manager(FakeUsers::with(&[(1, true)]));
        let access = m.issue_at(UserId::new(1), TokenKind::Access, t0()).unwrap();
        let result = m.refresh_cycle_at(Some(&access), t0()).await;
        assert!(matches!(result, Err(CredentialError::Invalid(_))));
        assert!(matches!(m.refresh_cycle_at(None, t0()).await, Err(CredentialError::Missing)));
    }

    #[tokio::test]
    async fn require_authenticated_user_checks_existence_and_verification() {
        let m = manager(FakeUsers::with(&[(1, true), (2, false)]));
        let ok = m.issue_at(UserId::new(1), TokenKind::Access, t0()).unwrap();
        let unverified = m.issue_at(UserId::new(2), TokenKind::Access, t0()).unwrap();
        let gone = m.issue_at(UserId::new(3), TokenKind::Access, t0()).unwrap();

        assert_eq!(m.require_authenticated_user_at(Some(&ok), t0()).await.unwrap(), UserId::new(1));
        assert!(matches!(
            m.require_authenticated_user_at(Some(&unverified), t0()).await,
            Err(CredentialError::UnverifiedSubject)
        ));
        assert!(matches!(
            m.require_authenticated_user_at(Some(&gone), t0()).await,
            Err(CredentialError::SubjectNotFound)
        ));
        assert!(matches!(
            m.require_authenticated_user_at(None, t0()).await,
            Err(CredentialError::Missing)
        ));
    }

    #[tokio::test]
    async fn lookup_failures_propagate() {
        let m = manager(Arc::new(BrokenStore));
        let token = m.issue_at(UserId::new(1), TokenKind::Access, t0()).unwrap();
        let err = m.require_authenticated_user_at(Some(&token), t0()).await.unwrap_err();
        assert!(matches!(err, CredentialError::Lookup(_)));
        assert_eq!(err.unauthenticated_reason(), None);
    }
}
