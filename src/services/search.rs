//! Book search across the secondary indexes

use indexmap::IndexMap;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookFilter, BookIndex, CatalogId, Isbn},
    repository::SharedStore,
};

#[derive(Clone)]
pub struct SearchService {
    store: SharedStore,
}

impl SearchService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Union of the books matching any present predicate.
    ///
    /// One index query per predicate, in filter evaluation order; a book
    /// matched by several predicates keeps the position of its first match.
    /// An empty filter returns the whole catalog.
    pub async fn search(&self, filter: &BookFilter) -> AppResult<Vec<Book>> {
        if filter.is_empty() {
            return self.all_books().await;
        }

        let mut merged: IndexMap<CatalogId, Book> = IndexMap::new();
        for (index, value) in filter.predicates() {
            for book in self.query(index, &value).await? {
                merged.entry(book.catalog_id).or_insert(book);
            }
        }

        tracing::debug!("Search matched {} books", merged.len());
        Ok(merged.into_values().collect())
    }

    /// Every copy sharing an ISBN
    pub async fn find_by_isbn(&self, isbn: &Isbn) -> AppResult<Vec<Book>> {
        self.query(BookIndex::Isbn, isbn.as_str()).await
    }

    /// Unfiltered scan
    pub async fn all_books(&self) -> AppResult<Vec<Book>> {
        self.store.scan_all().await.map_err(|e| {
            tracing::error!("Catalog scan failed: {}", e);
            AppError::Storage(e.to_string())
        })
    }

    async fn query(&self, index: BookIndex, value: &str) -> AppResult<Vec<Book>> {
        self.store.query_by_index(index, value).await.map_err(|e| {
            tracing::error!("Query on {} failed: {}", index.name(), e);
            AppError::Storage(e.to_string())
        })
    }
}
