//! Data models for the library catalog

pub mod book;
pub mod identifiers;
pub mod user;

// Re-export commonly used types
pub use book::{
    Book, BookDetails, BookFilter, BookId, BookIndex, BookPatch, Borrow, BorrowedRecord,
    BorrowingStatus, NewBook,
};
pub use identifiers::{BorrowerId, CatalogId, Isbn};
pub use user::User;
