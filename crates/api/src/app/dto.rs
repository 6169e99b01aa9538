use serde::{Deserialize, Deserializer, de};

use bookstore_codec::{Payload, Value};
use bookstore_core::{DomainError, DomainResult, PageRequest, PageSummary};
use bookstore_infra::{BookChanges, BookRecord, UserRecord};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const DEFAULT_PER_PAGE: u32 = 10;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub photo: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> DomainResult<()> {
        if self.username.trim().is_empty() {
            return Err(DomainError::validation("username must not be empty"));
        }
        validate_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.password != self.password_confirm {
            return Err(DomainError::validation("Passwords do not match"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(deserialize_with = "number_or_text")]
    pub price: f64,
}

impl CreateBookRequest {
    pub fn validate(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("title must not be empty"));
        }
        validate_price(self.price)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBookRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default, deserialize_with = "optional_number_or_text")]
    pub price: Option<f64>,
}

impl UpdateBookRequest {
    pub fn into_changes(self) -> DomainResult<BookChanges> {
        if self.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(DomainError::validation("title must not be empty"));
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(BookChanges {
            title: self.title,
            description: self.description,
            cover_image: self.cover_image,
            price: self.price,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn page_request(&self) -> DomainResult<PageRequest> {
        PageRequest::new(self.page.unwrap_or(1), self.per_page.unwrap_or(DEFAULT_PER_PAGE))
    }
}

fn validate_email(email: &str) -> DomainResult<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(DomainError::validation("email is not a valid address"))
    }
}

fn validate_price(price: f64) -> DomainResult<()> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        Err(DomainError::validation("price must be a non-negative number"))
    }
}

/// XML bodies arrive with every scalar as text, so numbers may be strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
}

fn number_or_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match RawNumber::deserialize(deserializer)? {
        RawNumber::Number(n) => Ok(n),
        RawNumber::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

fn optional_number_or_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<RawNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawNumber::Number(n)) => Ok(Some(n)),
        Some(RawNumber::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(RawNumber::Text(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
    }
}

// -------------------------
// Payload mapping helpers
// -------------------------

pub fn user_to_payload(user: &UserRecord) -> Payload {
    Payload::new()
        .with("id", user.id.get())
        .with("username", user.username.as_str())
        .with("email", user.email.as_str())
        .with("photo", user.photo.clone())
        .with("created_at", user.created_at.to_rfc3339())
        .with("updated_at", user.updated_at.to_rfc3339())
}

/// The owner id stays server-side.
pub fn book_to_payload(book: &BookRecord) -> Payload {
    Payload::new()
        .with("id", book.id.get())
        .with("title", book.title.as_str())
        .with("description", book.description.clone())
        .with("cover_image", book.cover_image.clone())
        .with("price", book.price)
        .with("created_at", book.created_at.to_rfc3339())
        .with("updated_at", book.updated_at.to_rfc3339())
}

pub fn summary_to_payload(summary: PageSummary) -> Payload {
    Payload::new()
        .with("page", summary.page)
        .with("per_page", summary.per_page)
        .with("total", summary.total)
        .with("total_pages", summary.total_pages)
}

pub fn book_page_to_payload(rows: &[BookRecord], summary: PageSummary) -> Payload {
    Payload::new()
        .with("rows", Value::List(rows.iter().map(book_to_payload).collect()))
        .with("summary", summary_to_payload(summary))
}
