//! In-process record store.
//!
//! Secondary indexes are maintained under the same write lock as the primary
//! map, so a reader never sees an index entry that disagrees with its record.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RecordStore, StoreError, StoreResult};
use crate::models::{Book, BookId, BookIndex, BookPatch};

type IndexView = BTreeMap<String, BTreeSet<BookId>>;

#[derive(Default)]
struct Tables {
    books: BTreeMap<BookId, Book>,
    indexes: HashMap<BookIndex, IndexView>,
}

impl Tables {
    fn index(&mut self, book: &Book) {
        let id = book.id();
        for index in BookIndex::ALL {
            self.indexes
                .entry(index)
                .or_default()
                .entry(book.index_value(index).to_string())
                .or_default()
                .insert(id.clone());
        }
    }

    fn unindex(&mut self, book: &Book) {
        let id = book.id();
        for index in BookIndex::ALL {
            let Some(view) = self.indexes.get_mut(&index) else {
                continue;
            };
            let key = book.index_value(index);
            if let Some(ids) = view.get_mut(key) {
                ids.remove(&id);
                if ids.is_empty() {
                    view.remove(key);
                }
            }
        }
    }

    fn lookup(&self, index: BookIndex, value: &str) -> Vec<Book> {
        self.indexes
            .get(&index)
            .and_then(|view| view.get(value))
            .map(|ids| ids.iter().filter_map(|id| self.books.get(id).cloned()).collect())
            .unwrap_or_default()
    }
}

/// Record store held entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.tables.read().await.books.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, id: &BookId) -> StoreResult<Book> {
        self.tables
            .read()
            .await
            .books
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn put(&self, book: &Book) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(previous) = tables.books.remove(&book.id()) {
            tables.unindex(&previous);
        }
        tables.index(book);
        tables.books.insert(book.id(), book.clone());
        Ok(())
    }

    async fn delete(&self, id: &BookId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(previous) = tables.books.remove(id) {
            tables.unindex(&previous);
        }
        Ok(())
    }

    async fn query_by_index(&self, index: BookIndex, value: &str) -> StoreResult<Vec<Book>> {
        Ok(self.tables.read().await.lookup(index, value))
    }

    async fn scan_all(&self) -> StoreResult<Vec<Book>> {
        Ok(self.tables.read().await.books.values().cloned().collect())
    }

    async fn update_fields(&self, id: &BookId, patch: BookPatch) -> StoreResult<Book> {
        let mut tables = self.tables.write().await;
        let mut book = tables
            .books
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        tables.unindex(&book);
        patch.apply(&mut book);
        tables.index(&book);
        tables.books.insert(id.clone(), book.clone());
        Ok(book)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{
        BookDetails, BorrowedRecord, BorrowerId, BorrowingStatus, CatalogId, Isbn, NewBook,
    };

    fn book(isbn: &str, title: &str, author: &str) -> Book {
        NewBook {
            isbn: Isbn::parse(isbn).unwrap(),
            details: BookDetails {
                title: title.to_string(),
                author: author.to_string(),
                image_url: "https://example.com/cover.png".to_string(),
            },
        }
        .into_book(CatalogId::generate())
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStore::new();
        let b = book("0306406152", "Dune", "Herbert");

        store.put(&b).await.unwrap();
        assert_eq!(store.get(&b.id()).await.unwrap(), b);

        store.delete(&b.id()).await.unwrap();
        assert!(matches!(store.get(&b.id()).await, Err(StoreError::NotFound(_))));
        assert!(store.query_by_index(BookIndex::Title, "Dune").await.unwrap().is_empty());

        // Deleting again is fine
        store.delete(&b.id()).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_isbn_shared_by_two_copies() {
        let store = MemoryStore::new();
        let first = book("0306406152", "Dune", "Herbert");
        let second = book("0306406152", "Dune", "Herbert");
        store.put(&first).await.unwrap();
        store.put(&second).await.unwrap();

        let copies = store.query_by_index(BookIndex::Isbn, "0306406152").await.unwrap();
        assert_eq!(copies.len(), 2);
        assert!(copies[0].catalog_id < copies[1].catalog_id);
    }

    #[tokio::test]
    async fn test_update_fields_moves_index_entries() {
        let store = MemoryStore::new();
        let b = book("0306406152", "Dune", "Herbert");
        store.put(&b).await.unwrap();

        let record = BorrowedRecord::new(BorrowerId::parse("user1").unwrap(), Utc::now(), None)
            .unwrap();
        let updated = store
            .update_fields(
                &b.id(),
                BookPatch {
                    title: Some("Dune Messiah".to_string()),
                    ..BookPatch::check_out(record)
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.borrowing_status, BorrowingStatus::CheckedOut);

        assert!(store.query_by_index(BookIndex::Title, "Dune").await.unwrap().is_empty());
        assert_eq!(store.query_by_index(BookIndex::Title, "Dune Messiah").await.unwrap(), vec![updated.clone()]);
        assert!(store.query_by_index(BookIndex::BorrowingStatus, "Available").await.unwrap().is_empty());
        assert_eq!(
            store.query_by_index(BookIndex::BorrowingStatus, "Checked Out").await.unwrap(),
            vec![updated]
        );
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let store = MemoryStore::new();
        let b = book("0306406152", "Dune", "Herbert");
        let result = store.update_fields(&b.id(), BookPatch::check_in()).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_put_replaces_and_reindexes() {
        let store = MemoryStore::new();
        let mut b = book("0306406152", "Dune", "Herbert");
        store.put(&b).await.unwrap();

        b.author = "Frank Herbert".to_string();
        store.put(&b).await.unwrap();

        assert!(store.query_by_index(BookIndex::Author, "Herbert").await.unwrap().is_empty());
        assert_eq!(store.query_by_index(BookIndex::Author, "Frank Herbert").await.unwrap().len(), 1);
        assert_eq!(store.scan_all().await.unwrap().len(), 1);
    }
}
