//! Infrastructure layer: persistence and file storage behind traits.

pub mod files;
pub mod store;

pub use files::{FileStore, FileStoreError, LocalFileStore};
pub use store::{
    BookChanges, BookRecord, BookStore, InMemoryStore, NewBook, NewUser, PostgresStore, StoreError,
    StoreResult, UserRecord, UserStore,
};
