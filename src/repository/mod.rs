//! Record store layer: the persistence contract and its implementations.
//!
//! Every operation is atomic for one record; nothing spans several records.

pub mod deadline;
pub mod memory;
pub mod postgres;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    config::{AppConfig, StoreBackend},
    models::{Book, BookId, BookIndex, BookPatch},
};

pub use deadline::DeadlineStore;
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Record store failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Book with {0} not found")]
    NotFound(BookId),

    #[error("Record store failure: {0}")]
    Backend(String),

    #[error("Record store call exceeded {0:?}")]
    Timeout(Duration),

    #[error("Malformed record: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Backend(format!("migration failed: {}", err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed book storage with secondary-index lookups.
///
/// Implementations keep the four index views in step with the primary record
/// on every write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch one record by primary key
    async fn get(&self, id: &BookId) -> StoreResult<Book>;

    /// Insert or fully replace a record
    async fn put(&self, book: &Book) -> StoreResult<()>;

    /// Remove a record; removing an absent record is not an error
    async fn delete(&self, id: &BookId) -> StoreResult<()>;

    /// All records whose `index` attribute equals `value`, ordered by catalog ID
    async fn query_by_index(&self, index: BookIndex, value: &str) -> StoreResult<Vec<Book>>;

    /// Every record in the store
    async fn scan_all(&self) -> StoreResult<Vec<Book>>;

    /// Apply a partial update to an existing record and return the new state
    async fn update_fields(&self, id: &BookId, patch: BookPatch) -> StoreResult<Book>;
}

/// Store handle shared by all services
pub type SharedStore = Arc<dyn RecordStore>;

/// Open the configured backend, bounded by the configured deadline.
pub async fn open_store(config: &AppConfig) -> StoreResult<SharedStore> {
    let inner: SharedStore = match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory record store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Postgres => Arc::new(PgStore::connect(&config.database).await?),
    };

    let deadline = Duration::from_millis(config.store.timeout_ms);
    Ok(Arc::new(DeadlineStore::new(inner, deadline)))
}
