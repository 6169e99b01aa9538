use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use bookstore_auth::{LookupError, SubjectLookup, SubjectStatus};
use bookstore_core::{BookId, PageRequest, UserId};

use super::{
    BookChanges, BookRecord, BookStore, NewBook, NewUser, StoreError, StoreResult, UserRecord, UserStore,
};

/// In-memory user/book tables for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, UserRecord>,
    books: BTreeMap<BookId, BookRecord>,
    last_user_id: i64,
    last_book_id: i64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Tables>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

fn paginate<'a>(rows: impl Iterator<Item = &'a BookRecord>, page: PageRequest) -> (Vec<BookRecord>, u64) {
    let matched: Vec<&BookRecord> = rows.collect();
    let total = matched.len() as u64;
    let rows = matched
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .cloned()
        .collect();
    (rows, total)
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<UserRecord>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn exists_with_email_or_username(&self, email: &str, username: &str) -> StoreResult<bool> {
        Ok(self
            .read()?
            .users
            .values()
            .any(|u| u.email == email || u.username == username))
    }

    async fn insert(&self, user: NewUser) -> StoreResult<UserRecord> {
        let mut tables = self.write()?;
        if tables
            .users
            .values()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(StoreError::Conflict("email or username already taken".to_string()));
        }

        tables.last_user_id += 1;
        let now = Utc::now();
        let record = UserRecord {
            id: UserId::new(tables.last_user_id),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            photo: user.photo,
            verified: user.verified,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }
}

#[async_trait]
impl BookStore for InMemoryStore {
    async fn search(&self, term: &str, page: PageRequest) -> StoreResult<(Vec<BookRecord>, u64)> {
        let needle = term.to_lowercase();
        let tables = self.read()?;
        let matches = tables.books.values().filter(|b| {
            b.title.to_lowercase().contains(&needle)
                || b.description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        });
        Ok(paginate(matches, page))
    }

    async fn list_by_owner(&self, owner: UserId, page: PageRequest) -> StoreResult<(Vec<BookRecord>, u64)> {
        let tables = self.read()?;
        Ok(paginate(tables.books.values().filter(|b| b.owner == owner), page))
    }

    async fn get(&self, owner: UserId, id: BookId) -> StoreResult<Option<BookRecord>> {
        Ok(self
            .read()?
            .books
            .get(&id)
            .filter(|b| b.owner == owner)
            .cloned())
    }

    async fn insert(&self, book: NewBook) -> StoreResult<BookRecord> {
        let mut tables = self.write()?;
        tables.last_book_id += 1;
        let now = Utc::now();
        let record = BookRecord {
            id: BookId::new(tables.last_book_id),
            title: book.title,
            description: book.description,
            cover_image: book.cover_image,
            price: book.price,
            created_at: now,
            updated_at: now,
            owner: book.owner,
        };
        tables.books.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, owner: UserId, id: BookId, changes: BookChanges) -> StoreResult<bool> {
        let mut tables = self.write()?;
        let Some(book) = tables.books.get_mut(&id).filter(|b| b.owner == owner) else {
            return Ok(false);
        };

        if let Some(title) = changes.title {
            book.title = title;
        }
        if let Some(description) = changes.description {
            book.description = Some(description);
        }
        if let Some(cover_image) = changes.cover_image {
            book.cover_image = Some(cover_image);
        }
        if let Some(price) = changes.price {
            book.price = price;
        }
        book.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete(&self, owner: UserId, id: BookId) -> StoreResult<bool> {
        let mut tables = self.write()?;
        if tables.books.get(&id).is_some_and(|b| b.owner == owner) {
            tables.books.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait]
impl SubjectLookup for InMemoryStore {
    async fn lookup_subject(&self, subject: UserId) -> Result<Option<SubjectStatus>, LookupError> {
        let user = self
            .find_by_id(subject)
            .await
            .map_err(|e| LookupError::new(e.to_string()))?;
        Ok(user.map(|u| SubjectStatus { verified: u.verified }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: "hash".to_string(),
            photo: None,
            verified: true,
            role: "user".to_string(),
        }
    }

    fn new_book(owner: UserId, title: &str, description: &str) -> NewBook {
        NewBook {
            title: title.to_string(),
            description: Some(description.to_string()),
            cover_image: None,
            price: 10.0,
            owner,
        }
    }

    #[tokio::test]
    async fn duplicate_users_conflict() {
        let store = InMemoryStore::new();
        let first = UserStore::insert(&store, new_user("alice")).await.unwrap();
        assert_eq!(first.id, UserId::new(1));

        let err = UserStore::insert(&store, new_user("alice")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.exists_with_email_or_username("x@y.z", "alice").await.unwrap());
    }

    #[tokio::test]
    async fn search_matches_title_or_description_and_paginates() {
        let store = InMemoryStore::new();
        let owner = UserStore::insert(&store, new_user("bob")).await.unwrap().id;
        BookStore::insert(&store, new_book(owner, "Rust", "This is my book description")).await.unwrap();
        BookStore::insert(&store, new_book(owner, "Go", "Another Description")).await.unwrap();
        BookStore::insert(&store, new_book(owner, "Zig", "nothing here")).await.unwrap();

        let page = PageRequest::new(1, 1).unwrap();
        let (rows, total) = store.search("description", page).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Rust");

        let page2 = PageRequest::new(2, 1).unwrap();
        let (rows, _) = store.search("description", page2).await.unwrap();
        assert_eq!(rows[0].title, "Go");

        let (all, total) = store.search("", PageRequest::new(1, 10).unwrap()).await.unwrap();
        assert_eq!((all.len(), total), (3, 3));
    }

    #[tokio::test]
    async fn books_are_scoped_to_their_owner() {
        let store = InMemoryStore::new();
        let alice = UserStore::insert(&store, new_user("alice")).await.unwrap().id;
        let bob = UserStore::insert(&store, new_user("bob")).await.unwrap().id;
        let book = BookStore::insert(&store, new_book(alice, "A", "a")).await.unwrap();

        assert!(store.get(bob, book.id).await.unwrap().is_none());
        assert!(!store.update(bob, book.id, BookChanges::default()).await.unwrap());
        assert!(!store.delete(bob, book.id).await.unwrap());

        let changes = BookChanges {
            title: Some("B".to_string()),
            price: Some(20.5),
            ..BookChanges::default()
        };
        assert!(store.update(alice, book.id, changes).await.unwrap());
        let updated = store.get(alice, book.id).await.unwrap().unwrap();
        assert_eq!(updated.title, "B");
        assert_eq!(updated.price, 20.5);
        assert_eq!(updated.description.as_deref(), Some("a"));

        assert!(store.delete(alice, book.id).await.unwrap());
        assert!(store.get(alice, book.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lookup_reports_verification() {
        let store = InMemoryStore::new();
        let mut pending = new_user("carol");
        pending.verified = false;
        let id = UserStore::insert(&store, pending).await.unwrap().id;

        assert_eq!(
            store.lookup_subject(id).await.unwrap(),
            Some(SubjectStatus { verified: false })
        );
        assert_eq!(store.lookup_subject(UserId::new(99)).await.unwrap(), None);
    }
}
