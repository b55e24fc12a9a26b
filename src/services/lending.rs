//! Lending: moves a copy between `Available` and `Checked Out`.
//!
//! The state check and the write are two separate store calls with no lock
//! in between. Two concurrent borrows of the same copy can both pass the
//! check; the later write wins and the earlier borrower is not told.

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookId, BookPatch, Borrow, BorrowedRecord, BorrowerId},
    repository::SharedStore,
};

use super::users::UserDirectory;

#[derive(Clone)]
pub struct LendingService {
    store: SharedStore,
    users: UserDirectory,
}

impl LendingService {
    pub fn new(store: SharedStore, users: UserDirectory) -> Self {
        Self { store, users }
    }

    /// Check a copy out to a borrower.
    ///
    /// `borrowed_date` defaults to now and `return_date` to one day later.
    pub async fn borrow_book(&self, borrow: Borrow) -> AppResult<Book> {
        let borrowed_date = borrow.borrowed_date.unwrap_or_else(Utc::now);
        let record = BorrowedRecord::new(borrow.borrower_id, borrowed_date, borrow.return_date)
            .map_err(|issue| AppError::Validation(vec![issue]))?;

        let current = self.store.get(&borrow.id).await?;
        if let Some(held) = &current.borrowed_record {
            return Err(AppError::InvalidState(format!(
                "The book is already checked out by user: {}",
                self.users.display_name(&held.borrower_id)
            )));
        }

        let borrower = record.borrower_id.clone();
        let updated = self
            .store
            .update_fields(&borrow.id, BookPatch::check_out(record))
            .await?;

        tracing::info!("Book {} checked out by {}", updated.catalog_id, borrower);
        Ok(updated)
    }

    /// Check a copy back in; only its current borrower may do so.
    pub async fn return_book(&self, id: &BookId, borrower_id: &BorrowerId) -> AppResult<Book> {
        let current = self.store.get(id).await?;

        let Some(record) = &current.borrowed_record else {
            return Err(AppError::InvalidState("The book has not been borrowed".to_string()));
        };

        if &record.borrower_id != borrower_id {
            return Err(AppError::Forbidden(format!(
                "The user returning the book must be the same user. Currently borrowed by user: {}",
                self.users.display_name(&record.borrower_id)
            )));
        }

        let updated = self.store.update_fields(id, BookPatch::check_in()).await?;

        tracing::info!("Book {} returned by {}", updated.catalog_id, borrower_id);
        Ok(updated)
    }
}
