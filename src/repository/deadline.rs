//! Deadline-bounded record store wrapper

use std::{future::Future, time::Duration};

use async_trait::async_trait;

use super::{RecordStore, SharedStore, StoreError, StoreResult};
use crate::models::{Book, BookId, BookIndex, BookPatch};

/// Applies one deadline to every call of the wrapped store.
///
/// An expired call surfaces as [`StoreError::Timeout`]; the underlying write,
/// if already sent, is not rolled back.
pub struct DeadlineStore {
    inner: SharedStore,
    deadline: Duration,
}

impl DeadlineStore {
    pub fn new(inner: SharedStore, deadline: Duration) -> Self {
        Self { inner, deadline }
    }

    async fn bounded<T>(&self, call: impl Future<Output = StoreResult<T>> + Send) -> StoreResult<T> {
        match tokio::time::timeout(self.deadline, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!("Record store call exceeded {:?}", self.deadline);
                Err(StoreError::Timeout(self.deadline))
            }
        }
    }
}

#[async_trait]
impl RecordStore for DeadlineStore {
    async fn get(&self, id: &BookId) -> StoreResult<Book> {
        self.bounded(self.inner.get(id)).await
    }

    async fn put(&self, book: &Book) -> StoreResult<()> {
        self.bounded(self.inner.put(book)).await
    }

    async fn delete(&self, id: &BookId) -> StoreResult<()> {
        self.bounded(self.inner.delete(id)).await
    }

    async fn query_by_index(&self, index: BookIndex, value: &str) -> StoreResult<Vec<Book>> {
        self.bounded(self.inner.query_by_index(index, value)).await
    }

    async fn scan_all(&self) -> StoreResult<Vec<Book>> {
        self.bounded(self.inner.scan_all()).await
    }

    async fn update_fields(&self, id: &BookId, patch: BookPatch) -> StoreResult<Book> {
        self.bounded(self.inner.update_fields(id, patch)).await
    }
}
