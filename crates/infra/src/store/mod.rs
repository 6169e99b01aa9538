//! User and book persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use bookstore_core::{BookId, PageRequest, UserId};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint (email, username) would be violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store failed (connection, poisoned lock, bad row).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub photo: Option<String>,
    pub verified: bool,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub photo: Option<String>,
    pub verified: bool,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookRecord {
    pub id: BookId,
    pub title: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner: UserId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub price: f64,
    pub owner: UserId,
}

/// Partial update; `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub price: Option<f64>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<UserRecord>>;

    /// Emails are stored lower-cased; callers pass them lower-cased too.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

    async fn exists_with_email_or_username(&self, email: &str, username: &str) -> StoreResult<bool>;

    /// Fails with [`StoreError::Conflict`] on a duplicate email or username.
    async fn insert(&self, user: NewUser) -> StoreResult<UserRecord>;
}

/// Books are always addressed through their owner, except for the public
/// search.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Case-insensitive substring match on title or description, ordered by
    /// id. Returns the page and the total number of matches.
    async fn search(&self, term: &str, page: PageRequest) -> StoreResult<(Vec<BookRecord>, u64)>;

    async fn list_by_owner(&self, owner: UserId, page: PageRequest) -> StoreResult<(Vec<BookRecord>, u64)>;

    async fn get(&self, owner: UserId, id: BookId) -> StoreResult<Option<BookRecord>>;

    async fn insert(&self, book: NewBook) -> StoreResult<BookRecord>;

    /// `Ok(false)` when the owner has no such book.
    async fn update(&self, owner: UserId, id: BookId, changes: BookChanges) -> StoreResult<bool>;

    /// `Ok(false)` when the owner has no such book.
    async fn delete(&self, owner: UserId, id: BookId) -> StoreResult<bool>;
}
