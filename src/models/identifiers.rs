//! Validated identifier types.
//!
//! Raw strings only become identifiers through `parse`, so anything holding a
//! [`CatalogId`], [`Isbn`] or [`BorrowerId`] has already passed validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::validation::{
    is_valid_borrower_id, is_valid_isbn, FieldError, EXPECTED_BORROWER_ID, EXPECTED_ISBN,
    EXPECTED_UUID,
};

/// System generated identity of one physical copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct CatalogId(Uuid);

impl CatalogId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Result<Self, FieldError> {
        Uuid::parse_str(raw).map(Self).map_err(|_| {
            FieldError::new("BookID", "invalid_string", EXPECTED_UUID, raw, "Invalid uuid")
        })
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for CatalogId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Book edition identifier in ISBN-10 or ISBN-13 notation.
///
/// Stored exactly as supplied; two copies of the same edition share it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "978-1-933624-76-3")]
pub struct Isbn(String);

impl Isbn {
    pub fn parse(raw: &str) -> Result<Self, FieldError> {
        if is_valid_isbn(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(FieldError::new("ISBN", "invalid_string", EXPECTED_ISBN, raw, "Invalid ISBN"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Isbn {
    type Error = FieldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Isbn> for String {
    fn from(value: Isbn) -> Self {
        value.0
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Library member identifier (`user` followed by digits)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "user1")]
pub struct BorrowerId(String);

impl BorrowerId {
    pub fn parse(raw: &str) -> Result<Self, FieldError> {
        if is_valid_borrower_id(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(FieldError::new(
                "BorrowerID",
                "invalid_string",
                EXPECTED_BORROWER_ID,
                raw,
                "Invalid borrower ID",
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BorrowerId {
    type Error = FieldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BorrowerId> for String {
    fn from(value: BorrowerId) -> Self {
        value.0
    }
}

impl fmt::Display for BorrowerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
