//! Postgres-backed user and book store.
//!
//! Schema lives in `migrations/0001_create_tables.sql`:
//!
//! | Table | Key | Notes |
//! |-------|-----|-------|
//! | `users` | `id BIGSERIAL` | `username` and `email` are `UNIQUE` |
//! | `books` | `id BIGSERIAL` | `user_id` references `users(id)` with `ON DELETE CASCADE` |
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | Any other | `Unavailable` |
//! | PoolClosed / Io / Tls / other | N/A | `Unavailable` |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;

use bookstore_auth::{LookupError, SubjectLookup, SubjectStatus};
use bookstore_core::{BookId, PageRequest, UserId};

use super::{
    BookChanges, BookRecord, BookStore, NewBook, NewUser, StoreError, StoreResult, UserRecord, UserStore,
};

const SCHEMA: &str = include_str!("../../../../migrations/0001_create_tables.sql");

const USER_COLUMNS: &str = "id, username, email, password, photo, verified, role, created_at, updated_at";
const BOOK_COLUMNS: &str = "id, title, description, cover_image, price, created_at, updated_at, user_id";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the tables if they do not exist yet. Idempotent.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn page_of_books(
        &self,
        operation: &str,
        filter: &str,
        arg: BookFilterArg<'_>,
        page: PageRequest,
    ) -> StoreResult<(Vec<BookRecord>, u64)> {
        let count_sql = format!("SELECT COUNT(*) AS total FROM books WHERE {filter}");
        let rows_sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE {filter} ORDER BY id LIMIT $2 OFFSET $3");

        let count_query = sqlx::query(&count_sql);
        let count_query = match arg {
            BookFilterArg::Term(term) => count_query.bind(term),
            BookFilterArg::Owner(owner) => count_query.bind(owner.get()),
        };
        let total: i64 = count_query
            .fetch_one(&self.pool)
            .await
            .and_then(|row| row.try_get("total"))
            .map_err(|e| map_sqlx_error(operation, e))?;

        let rows_query = sqlx::query(&rows_sql);
        let rows_query = match arg {
            BookFilterArg::Term(term) => rows_query.bind(term),
            BookFilterArg::Owner(owner) => rows_query.bind(owner.get()),
        };
        let rows = rows_query
            .bind(i64::try_from(page.limit()).unwrap_or(i64::MAX))
            .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        let books = rows
            .iter()
            .map(book_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error(operation, e))?;

        Ok((books, total.max(0) as u64))
    }
}

#[derive(Clone, Copy)]
enum BookFilterArg<'a> {
    Term(&'a str),
    Owner(UserId),
}

#[async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self), fields(operation = "find_user_by_id"))]
    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_id", e))?;
        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("find_user_by_id", e))
    }

    #[instrument(skip(self), fields(operation = "find_user_by_email"))]
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("find_user_by_email", e))
    }

    async fn exists_with_email_or_username(&self, email: &str, username: &str) -> StoreResult<bool> {
        sqlx::query("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 OR username = $2) AS taken")
            .bind(email)
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .and_then(|row| row.try_get("taken"))
            .map_err(|e| map_sqlx_error("user_exists", e))
    }

    #[instrument(skip(self, user), fields(operation = "insert_user"))]
    async fn insert(&self, user: NewUser) -> StoreResult<UserRecord> {
        let sql = format!(
            "INSERT INTO users (username, email, password, photo, verified, role) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.photo)
            .bind(user.verified)
            .bind(&user.role)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_user", e))?;
        user_from_row(&row).map_err(|e| map_sqlx_error("insert_user", e))
    }
}

#[async_trait]
impl BookStore for PostgresStore {
    #[instrument(skip(self), fields(operation = "search_books"))]
    async fn search(&self, term: &str, page: PageRequest) -> StoreResult<(Vec<BookRecord>, u64)> {
        self.page_of_books(
            "search_books",
            "(title ILIKE '%' || $1 || '%' OR description ILIKE '%' || $1 || '%')",
            BookFilterArg::Term(term),
            page,
        )
        .await
    }

    #[instrument(skip(self), fields(operation = "list_books_by_owner"))]
    async fn list_by_owner(&self, owner: UserId, page: PageRequest) -> StoreResult<(Vec<BookRecord>, u64)> {
        self.page_of_books("list_books_by_owner", "user_id = $1", BookFilterArg::Owner(owner), page)
            .await
    }

    async fn get(&self, owner: UserId, id: BookId) -> StoreResult<Option<BookRecord>> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1 AND user_id = $2");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .bind(owner.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_book", e))?;
        row.as_ref()
            .map(book_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("get_book", e))
    }

    #[instrument(skip(self, book), fields(operation = "insert_book"))]
    async fn insert(&self, book: NewBook) -> StoreResult<BookRecord> {
        let sql = format!(
            "INSERT INTO books (title, description, cover_image, price, user_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {BOOK_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&book.title)
            .bind(&book.description)
            .bind(&book.cover_image)
            .bind(book.price)
            .bind(book.owner.get())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_book", e))?;
        book_from_row(&row).map_err(|e| map_sqlx_error("insert_book", e))
    }

    async fn update(&self, owner: UserId, id: BookId, changes: BookChanges) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE books SET
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                cover_image = COALESCE($5, cover_image),
                price = COALESCE($6, price),
                updated_at = now()
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id.get())
        .bind(owner.get())
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.cover_image)
        .bind(changes.price)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_book", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, owner: UserId, id: BookId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1 AND user_id = $2")
            .bind(id.get())
            .bind(owner.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_book", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SubjectLookup for PostgresStore {
    async fn lookup_subject(&self, subject: UserId) -> Result<Option<SubjectStatus>, LookupError> {
        let row = sqlx::query("SELECT verified FROM users WHERE id = $1")
            .bind(subject.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| LookupError::new(map_sqlx_error("lookup_subject", e).to_string()))?;

        match row {
            Some(row) => {
                let verified: bool = row
                    .try_get("verified")
                    .map_err(|e| LookupError::new(format!("failed to read verified flag: {e}")))?;
                Ok(Some(SubjectStatus { verified }))
            }
            None => Ok(None),
        }
    }
}

fn user_from_row(row: &PgRow) -> Result<UserRecord, sqlx::Error> {
    Ok(UserRecord {
        id: UserId::new(row.try_get("id")?),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password")?,
        photo: row.try_get("photo")?,
        verified: row.try_get("verified")?,
        role: row.try_get("role")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn book_from_row(row: &PgRow) -> Result<BookRecord, sqlx::Error> {
    Ok(BookRecord {
        id: BookId::new(row.try_get("id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        cover_image: row.try_get("cover_image")?,
        price: row.try_get("price")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        owner: UserId::new(row.try_get("user_id")?),
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code() {
                Some(code) if code.as_ref() == "23505" => StoreError::Conflict(msg),
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Unavailable(format!("connection pool closed in {operation}")),
        other => StoreError::Unavailable(format!("sqlx error in {operation}: {other}")),
    }
}
