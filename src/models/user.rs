//! Library member as known to the borrower directory

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Directory entry, used to show who holds a book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Borrower ID (`user<digits>`)
    pub id: String,
    /// Display name
    pub name: String,
    pub image_url: String,
}
