//! PostgreSQL record store.
//!
//! One `books` table keyed by `(catalog_id, isbn)` with a b-tree index per
//! lookup attribute; PostgreSQL keeps those indexes transactionally in step
//! with the rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, Pool, Postgres};
use uuid::Uuid;

use super::{RecordStore, StoreError, StoreResult};
use crate::{
    config::DatabaseConfig,
    models::{
        Book, BookId, BookIndex, BookPatch, BorrowedRecord, BorrowerId, BorrowingStatus,
        CatalogId, Isbn,
    },
};

const BOOK_COLUMNS: &str = "catalog_id, isbn, title, author, image_url, borrowing_status, \
                            borrower_id, borrowed_date, return_date";

/// Row as stored in the `books` table
#[derive(Debug, FromRow)]
struct BookRow {
    catalog_id: Uuid,
    isbn: String,
    title: String,
    author: String,
    image_url: String,
    borrowing_status: String,
    borrower_id: Option<String>,
    borrowed_date: Option<DateTime<Utc>>,
    return_date: Option<DateTime<Utc>>,
}

impl BookRow {
    fn into_book(self) -> StoreResult<Book> {
        let row = self;
        let isbn = Isbn::parse(&row.isbn).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let borrowing_status = BorrowingStatus::parse(&row.borrowing_status).ok_or_else(|| {
            StoreError::Corrupt(format!("unknown borrowing status '{}'", row.borrowing_status))
        })?;

        let borrowed_record = match (row.borrower_id, row.borrowed_date, row.return_date) {
            (Some(borrower), Some(borrowed_date), Some(return_date)) => Some(BorrowedRecord {
                borrower_id: BorrowerId::parse(&borrower)
                    .map_err(|e| StoreError::Corrupt(e.to_string()))?,
                borrowed_date,
                return_date,
            }),
            (None, None, None) => None,
            _ => {
                return Err(StoreError::Corrupt(format!(
                    "partial borrowed record on book {}",
                    row.catalog_id
                )))
            }
        };

        Ok(Book {
            catalog_id: CatalogId::from(row.catalog_id),
            isbn,
            title: row.title,
            author: row.author,
            image_url: row.image_url,
            borrowing_status,
            borrowed_record,
        })
    }
}

fn index_column(index: BookIndex) -> &'static str {
    match index {
        BookIndex::Isbn => "isbn",
        BookIndex::Title => "title",
        BookIndex::Author => "author",
        BookIndex::BorrowingStatus => "borrowing_status",
    }
}

fn into_books(rows: Vec<BookRow>) -> StoreResult<Vec<Book>> {
    rows.into_iter().map(BookRow::into_book).collect()
}

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Connect and bring the schema up to date
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;

        tracing::info!("Connected to database");

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!("Database migrations completed");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn get(&self, id: &BookId) -> StoreResult<Book> {
        let sql = format!(
            "SELECT {} FROM books WHERE catalog_id = $1 AND isbn = $2",
            BOOK_COLUMNS
        );
        sqlx::query_as::<_, BookRow>(&sql)
            .bind(id.catalog_id.as_uuid())
            .bind(id.isbn.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.clone()))?
            .into_book()
    }

    async fn put(&self, book: &Book) -> StoreResult<()> {
        let record = book.borrowed_record.as_ref();
        sqlx::query(
            r#"
            INSERT INTO books (catalog_id, isbn, title, author, image_url, borrowing_status,
                               borrower_id, borrowed_date, return_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (catalog_id, isbn) DO UPDATE SET
                title = EXCLUDED.title,
                author = EXCLUDED.author,
                image_url = EXCLUDED.image_url,
                borrowing_status = EXCLUDED.borrowing_status,
                borrower_id = EXCLUDED.borrower_id,
                borrowed_date = EXCLUDED.borrowed_date,
                return_date = EXCLUDED.return_date
            "#,
        )
        .bind(book.catalog_id.as_uuid())
        .bind(book.isbn.as_str())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.image_url)
        .bind(book.borrowing_status.as_str())
        .bind(record.map(|r| r.borrower_id.as_str().to_string()))
        .bind(record.map(|r| r.borrowed_date))
        .bind(record.map(|r| r.return_date))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &BookId) -> StoreResult<()> {
        sqlx::query("DELETE FROM books WHERE catalog_id = $1 AND isbn = $2")
            .bind(id.catalog_id.as_uuid())
            .bind(id.isbn.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn query_by_index(&self, index: BookIndex, value: &str) -> StoreResult<Vec<Book>> {
        let sql = format!(
            "SELECT {} FROM books WHERE {} = $1 ORDER BY catalog_id",
            BOOK_COLUMNS,
            index_column(index)
        );
        let rows = sqlx::query_as::<_, BookRow>(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;

        into_books(rows)
    }

    async fn scan_all(&self) -> StoreResult<Vec<Book>> {
        let sql = format!("SELECT {} FROM books ORDER BY catalog_id, isbn", BOOK_COLUMNS);
        let rows = sqlx::query_as::<_, BookRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        into_books(rows)
    }

    async fn update_fields(&self, id: &BookId, patch: BookPatch) -> StoreResult<Book> {
        let touch_record = patch.borrowed_record.is_some();
        let record = patch.borrowed_record.flatten();

        let sql = format!(
            r#"
            UPDATE books SET
                title = COALESCE($3, title),
                author = COALESCE($4, author),
                image_url = COALESCE($5, image_url),
                borrowing_status = CASE
                    WHEN NOT $6 THEN borrowing_status
                    WHEN $7::TEXT IS NULL THEN '{available}'
                    ELSE '{checked_out}'
                END,
                borrower_id = CASE WHEN $6 THEN $7 ELSE borrower_id END,
                borrowed_date = CASE WHEN $6 THEN $8 ELSE borrowed_date END,
                return_date = CASE WHEN $6 THEN $9 ELSE return_date END
            WHERE catalog_id = $1 AND isbn = $2
            RETURNING {columns}
            "#,
            available = BorrowingStatus::Available.as_str(),
            checked_out = BorrowingStatus::CheckedOut.as_str(),
            columns = BOOK_COLUMNS
        );

        sqlx::query_as::<_, BookRow>(&sql)
            .bind(id.catalog_id.as_uuid())
            .bind(id.isbn.as_str())
            .bind(patch.title)
            .bind(patch.author)
            .bind(patch.image_url)
            .bind(touch_record)
            .bind(record.as_ref().map(|r| r.borrower_id.as_str().to_string()))
            .bind(record.as_ref().map(|r| r.borrowed_date))
            .bind(record.as_ref().map(|r| r.return_date))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.clone()))?
            .into_book()
    }
}
