//! Catalog management service

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookDetails, BookId, BookPatch, CatalogId, NewBook},
    repository::SharedStore,
};

use super::search::SearchService;

/// Result of an idempotent insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new copy was written
    Created(Book),
    /// A copy with the same ISBN already existed and was left untouched
    Found(Book),
}

impl CreateOutcome {
    pub fn book(&self) -> &Book {
        match self {
            CreateOutcome::Created(book) | CreateOutcome::Found(book) => book,
        }
    }

    pub fn into_book(self) -> Book {
        match self {
            CreateOutcome::Created(book) | CreateOutcome::Found(book) => book,
        }
    }
}

#[derive(Clone)]
pub struct CatalogService {
    store: SharedStore,
    search: SearchService,
}

impl CatalogService {
    pub fn new(store: SharedStore, search: SearchService) -> Self {
        Self { store, search }
    }

    /// Get one copy by its compound identity
    pub async fn get_book(&self, id: &BookId) -> AppResult<Book> {
        Ok(self.store.get(id).await?)
    }

    /// Whole catalog
    pub async fn get_all(&self) -> AppResult<Vec<Book>> {
        self.search.all_books().await
    }

    /// Insert a new copy unless one with the same ISBN already exists.
    ///
    /// A fresh copy is forced to `Available` and read back before returning.
    pub async fn create_book(&self, new_book: NewBook) -> AppResult<CreateOutcome> {
        if let Some(existing) = self.search.find_by_isbn(&new_book.isbn).await?.into_iter().next() {
            tracing::debug!(
                "Catalog create: ISBN {} already present as book {}",
                existing.isbn,
                existing.catalog_id
            );
            return Ok(CreateOutcome::Found(existing));
        }

        let book = new_book.into_book(CatalogId::generate());
        let id = book.id();
        self.store.put(&book).await?;

        let stored = self.store.get(&id).await.map_err(|e| {
            tracing::error!("Catalog create: book {} not readable after write: {}", id, e);
            AppError::Storage(format!("Insertion of book with {} failed: {}", id, e))
        })?;

        tracing::info!("Catalog create: added book {} (ISBN {})", stored.catalog_id, stored.isbn);
        Ok(CreateOutcome::Created(stored))
    }

    /// Replace the descriptive attributes of a copy.
    ///
    /// The patch carries no lending state; the store recomputes the status
    /// from whatever borrowed record it holds at write time, so an edit racing
    /// a borrow or return never checks a book in or out.
    pub async fn update_book(&self, id: &BookId, details: BookDetails) -> AppResult<Book> {
        let updated = self
            .store
            .update_fields(id, BookPatch::details(details))
            .await?;

        tracing::info!("Catalog update: book {}", updated.catalog_id);
        Ok(updated)
    }

    /// Unconditional delete by primary key; callers check existence first.
    pub async fn delete_book(&self, id: &BookId) -> AppResult<()> {
        self.store.delete(id).await?;
        tracing::info!("Catalog delete: book {}", id.catalog_id);
        Ok(())
    }

    /// Delete an existing copy and hand back its last state
    pub async fn remove_book(&self, id: &BookId) -> AppResult<Book> {
        let current = self.get_book(id).await?;
        self.delete_book(id).await?;
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::{
        models::{BookIndex, BorrowedRecord, BorrowerId, BorrowingStatus, Isbn},
        repository::{
            MemoryStore, MockRecordStore, RecordStore, SharedStore, StoreError, StoreResult,
        },
    };

    /// Memory store that lands one lending write just before the next
    /// `update_fields`, as a concurrent borrow or return would.
    #[derive(Default)]
    struct LendingLandsFirst {
        inner: MemoryStore,
        pending: Mutex<Option<BookPatch>>,
    }

    impl LendingLandsFirst {
        fn before_next_write(&self, patch: BookPatch) {
            *self.pending.lock().unwrap() = Some(patch);
        }
    }

    #[async_trait]
    impl RecordStore for LendingLandsFirst {
        async fn get(&self, id: &BookId) -> StoreResult<Book> {
            self.inner.get(id).await
        }

        async fn put(&self, book: &Book) -> StoreResult<()> {
            self.inner.put(book).await
        }

        async fn delete(&self, id: &BookId) -> StoreResult<()> {
            self.inner.delete(id).await
        }

        async fn query_by_index(&self, index: BookIndex, value: &str) -> StoreResult<Vec<Book>> {
            self.inner.query_by_index(index, value).await
        }

        async fn scan_all(&self) -> StoreResult<Vec<Book>> {
            self.inner.scan_all().await
        }

        async fn update_fields(&self, id: &BookId, patch: BookPatch) -> StoreResult<Book> {
            let lending = self.pending.lock().unwrap().take();
            if let Some(lending) = lending {
                self.inner.update_fields(id, lending).await?;
            }
            self.inner.update_fields(id, patch).await
        }
    }

    fn catalog_with(store: SharedStore) -> CatalogService {
        CatalogService::new(store.clone(), SearchService::new(store))
    }

    fn new_book(isbn: &str) -> NewBook {
        NewBook {
            isbn: Isbn::parse(isbn).unwrap(),
            details: BookDetails {
                title: "X".to_string(),
                author: "Y".to_string(),
                image_url: "https://example.com/a.png".to_string(),
            },
        }
    }

    fn details(title: &str) -> BookDetails {
        BookDetails {
            title: title.to_string(),
            author: "Y".to_string(),
            image_url: "https://example.com/b.png".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_then_get_returns_equal_record() {
        let catalog = catalog_with(Arc::new(MemoryStore::new()));

        let created = catalog.create_book(new_book("978-1-933624-76-3")).await.unwrap();
        let CreateOutcome::Created(book) = created else {
            panic!("expected a new record");
        };
        assert_eq!(book.borrowing_status, BorrowingStatus::Available);
        assert!(book.borrowed_record.is_none());
        assert_eq!(catalog.get_book(&book.id()).await.unwrap(), book);
    }

    #[tokio::test]
    async fn test_create_is_idempotent_on_isbn() {
        let catalog = catalog_with(Arc::new(MemoryStore::new()));

        let first = catalog.create_book(new_book("0306406152")).await.unwrap();
        let mut other = new_book("0306406152");
        other.details.title = "Another title".to_string();
        let second = catalog.create_book(other).await.unwrap();

        assert!(matches!(first, CreateOutcome::Created(_)));
        assert!(matches!(second, CreateOutcome::Found(_)));
        assert_eq!(first.book().catalog_id, second.book().catalog_id);
        assert_eq!(second.book().title, "X");
        assert_eq!(catalog.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_fails_when_write_is_not_readable() {
        let mut mock = MockRecordStore::new();
        mock.expect_query_by_index().returning(|_, _| Ok(Vec::new()));
        mock.expect_put().times(1).returning(|_| Ok(()));
        mock.expect_get()
            .times(1)
            .returning(|id| Err(StoreError::NotFound(id.clone())));

        let catalog = catalog_with(Arc::new(mock));
        let result = catalog.create_book(new_book("0306406152")).await;
        assert!(matches!(result, Err(AppError::Storage(_))));
    }

    #[tokio::test]
    async fn test_update_keeps_lending_state() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let catalog = catalog_with(store.clone());
        let book = catalog.create_book(new_book("0306406152")).await.unwrap().into_book();

        let record = BorrowedRecord::new(BorrowerId::parse("user3").unwrap(), Utc::now(), None)
            .unwrap();
        store
            .update_fields(&book.id(), BookPatch::check_out(record.clone()))
            .await
            .unwrap();

        let updated = catalog.update_book(&book.id(), details("New title")).await.unwrap();
        assert_eq!(updated.title, "New title");
        assert_eq!(updated.image_url, "https://example.com/b.png");
        assert_eq!(updated.borrowing_status, BorrowingStatus::CheckedOut);
        assert_eq!(updated.borrowed_record, Some(record));
        assert_eq!(updated.catalog_id, book.catalog_id);
    }

    #[tokio::test]
    async fn test_update_racing_a_borrow_keeps_status_and_index_in_step() {
        let store = Arc::new(LendingLandsFirst::default());
        let catalog = catalog_with(store.clone());
        let book = catalog.create_book(new_book("0306406152")).await.unwrap().into_book();

        let record = BorrowedRecord::new(BorrowerId::parse("user1").unwrap(), Utc::now(), None)
            .unwrap();
        store.before_next_write(BookPatch::check_out(record.clone()));

        let updated = catalog.update_book(&book.id(), details("New title")).await.unwrap();
        assert_eq!(updated.title, "New title");
        assert_eq!(updated.borrowing_status, BorrowingStatus::CheckedOut);
        assert_eq!(updated.borrowed_record, Some(record));

        let checked_out = store
            .query_by_index(BookIndex::BorrowingStatus, BorrowingStatus::CheckedOut.as_str())
            .await
            .unwrap();
        assert_eq!(checked_out, vec![updated]);
    }

    #[tokio::test]
    async fn test_update_racing_a_return_keeps_status_and_index_in_step() {
        let store = Arc::new(LendingLandsFirst::default());
        let catalog = catalog_with(store.clone());
        let book = catalog.create_book(new_book("0306406152")).await.unwrap().into_book();
        let record = BorrowedRecord::new(BorrowerId::parse("user1").unwrap(), Utc::now(), None)
            .unwrap();
        store
            .update_fields(&book.id(), BookPatch::check_out(record))
            .await
            .unwrap();

        store.before_next_write(BookPatch::check_in());

        let updated = catalog.update_book(&book.id(), details("New title")).await.unwrap();
        assert_eq!(updated.borrowing_status, BorrowingStatus::Available);
        assert!(updated.borrowed_record.is_none());

        let available = store
            .query_by_index(BookIndex::BorrowingStatus, BorrowingStatus::Available.as_str())
            .await
            .unwrap();
        assert_eq!(available, vec![updated]);
        let checked_out = store
            .query_by_index(BookIndex::BorrowingStatus, BorrowingStatus::CheckedOut.as_str())
            .await
            .unwrap();
        assert!(checked_out.is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_book() {
        let catalog = catalog_with(Arc::new(MemoryStore::new()));
        let id = BookId::new(CatalogId::generate(), Isbn::parse("0306406152").unwrap());
        let result = catalog.update_book(&id, details("T")).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_book() {
        let catalog = catalog_with(Arc::new(MemoryStore::new()));
        let book = catalog.create_book(new_book("0306406152")).await.unwrap().into_book();

        let removed = catalog.remove_book(&book.id()).await.unwrap();
        assert_eq!(removed, book);
        assert!(matches!(catalog.get_book(&book.id()).await, Err(AppError::NotFound(_))));
        assert!(matches!(catalog.remove_book(&book.id()).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_lookup_requires_both_identity_parts() {
        let catalog = catalog_with(Arc::new(MemoryStore::new()));
        let book = catalog.create_book(new_book("0306406152")).await.unwrap().into_book();

        let wrong_isbn = BookId::new(book.catalog_id, Isbn::parse("080442957X").unwrap());
        assert!(matches!(catalog.get_book(&wrong_isbn).await, Err(AppError::NotFound(_))));
    }
}
