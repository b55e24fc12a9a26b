//! Book (one physical copy) model and related request types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::identifiers::{BorrowerId, CatalogId, Isbn};
use crate::{
    error::{AppError, AppResult},
    validation::{collect_field_errors, parse_date, FieldError, EXPECTED_DATE},
};

/// Lending state of a copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum BorrowingStatus {
    Available,
    #[serde(rename = "Checked Out")]
    CheckedOut,
}

impl BorrowingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowingStatus::Available => "Available",
            BorrowingStatus::CheckedOut => "Checked Out",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Available" => Some(BorrowingStatus::Available),
            "Checked Out" => Some(BorrowingStatus::CheckedOut),
            _ => None,
        }
    }

    /// Status implied by the presence of a borrowed record
    pub fn for_record(record: Option<&BorrowedRecord>) -> Self {
        match record {
            Some(_) => BorrowingStatus::CheckedOut,
            None => BorrowingStatus::Available,
        }
    }
}

/// Compound identity of one physical copy
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub struct BookId {
    #[serde(rename = "BookID")]
    pub catalog_id: CatalogId,
    #[serde(rename = "ISBN")]
    pub isbn: Isbn,
}

impl BookId {
    pub fn new(catalog_id: CatalogId, isbn: Isbn) -> Self {
        Self { catalog_id, isbn }
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ID: {} and ISBN: {}", self.catalog_id, self.isbn)
    }
}

/// Who holds a checked-out copy and until when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BorrowedRecord {
    #[serde(rename = "BorrowerID")]
    pub borrower_id: BorrowerId,
    #[serde(rename = "BorrowedDate")]
    pub borrowed_date: DateTime<Utc>,
    #[serde(rename = "ReturnDate")]
    pub return_date: DateTime<Utc>,
}

impl BorrowedRecord {
    /// Build a record, defaulting the window to one day from `borrowed_date`.
    pub fn new(
        borrower_id: BorrowerId,
        borrowed_date: DateTime<Utc>,
        return_date: Option<DateTime<Utc>>,
    ) -> Result<Self, FieldError> {
        let return_date = match return_date {
            None => borrowed_date + Duration::days(1),
            Some(date) if date > borrowed_date => date,
            Some(date) => {
                return Err(FieldError::new(
                    "ReturnDate",
                    "invalid_date",
                    format!("date after {}", borrowed_date.to_rfc3339()),
                    date.to_rfc3339(),
                    "The return date must be later than the borrowed date",
                ))
            }
        };

        Ok(Self {
            borrower_id,
            borrowed_date,
            return_date,
        })
    }
}

/// Catalog entry for one physical copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    #[serde(rename = "BookID")]
    pub catalog_id: CatalogId,
    #[serde(rename = "ISBN")]
    pub isbn: Isbn,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "ImageURL")]
    pub image_url: String,
    #[serde(rename = "BorrowingStatus")]
    pub borrowing_status: BorrowingStatus,
    #[serde(rename = "BorrowedRecord", default, skip_serializing_if = "Option::is_none")]
    pub borrowed_record: Option<BorrowedRecord>,
}

impl Book {
    pub fn id(&self) -> BookId {
        BookId::new(self.catalog_id, self.isbn.clone())
    }

    /// Attribute value as seen by a secondary index
    pub fn index_value(&self, index: BookIndex) -> &str {
        match index {
            BookIndex::Isbn => self.isbn.as_str(),
            BookIndex::Title => &self.title,
            BookIndex::Author => &self.author,
            BookIndex::BorrowingStatus => self.borrowing_status.as_str(),
        }
    }
}

/// Secondary lookup views, each keyed by one attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BookIndex {
    Isbn,
    Title,
    Author,
    BorrowingStatus,
}

impl BookIndex {
    pub const ALL: [BookIndex; 4] = [
        BookIndex::Isbn,
        BookIndex::Title,
        BookIndex::Author,
        BookIndex::BorrowingStatus,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BookIndex::Isbn => "ISBNIndex",
            BookIndex::Title => "TitleIndex",
            BookIndex::Author => "AuthorIndex",
            BookIndex::BorrowingStatus => "BorrowingStatusIndex",
        }
    }
}

/// Input of a catalog insert (identity and status are assigned by the catalog)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub isbn: Isbn,
    pub details: BookDetails,
}

impl NewBook {
    pub fn into_book(self, catalog_id: CatalogId) -> Book {
        Book {
            catalog_id,
            isbn: self.isbn,
            title: self.details.title,
            author: self.details.author,
            image_url: self.details.image_url,
            borrowing_status: BorrowingStatus::Available,
            borrowed_record: None,
        }
    }
}

/// Editable, non-identity attributes of a book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDetails {
    pub title: String,
    pub author: String,
    pub image_url: String,
}

/// Partial attribute update applied atomically by the record store.
///
/// Identity fields are deliberately absent, and so is the lending status: the
/// store derives it from the borrowed record inside the same write.
/// `borrowed_record` distinguishes "leave alone" (`None`) from "clear"
/// (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub borrowed_record: Option<Option<BorrowedRecord>>,
}

impl BookPatch {
    pub fn details(details: BookDetails) -> Self {
        Self {
            title: Some(details.title),
            author: Some(details.author),
            image_url: Some(details.image_url),
            borrowed_record: None,
        }
    }

    pub fn check_out(record: BorrowedRecord) -> Self {
        Self {
            borrowed_record: Some(Some(record)),
            ..Self::default()
        }
    }

    pub fn check_in() -> Self {
        Self {
            borrowed_record: Some(None),
            ..Self::default()
        }
    }

    pub fn apply(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(image_url) = self.image_url {
            book.image_url = image_url;
        }
        if let Some(record) = self.borrowed_record {
            book.borrowed_record = record;
        }
        book.borrowing_status = BorrowingStatus::for_record(book.borrowed_record.as_ref());
    }
}

/// Sparse search filter; predicates are OR-ed together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub isbn: Option<Isbn>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub borrowing_status: Option<BorrowingStatus>,
}

impl BookFilter {
    pub fn is_empty(&self) -> bool {
        self.isbn.is_none()
            && self.title.is_none()
            && self.author.is_none()
            && self.borrowing_status.is_none()
    }

    /// Present predicates in evaluation order
    pub fn predicates(&self) -> Vec<(BookIndex, String)> {
        let mut predicates = Vec::new();
        if let Some(author) = &self.author {
            predicates.push((BookIndex::Author, author.clone()));
        }
        if let Some(status) = &self.borrowing_status {
            predicates.push((BookIndex::BorrowingStatus, status.as_str().to_string()));
        }
        if let Some(isbn) = &self.isbn {
            predicates.push((BookIndex::Isbn, isbn.as_str().to_string()));
        }
        if let Some(title) = &self.title {
            predicates.push((BookIndex::Title, title.clone()));
        }
        predicates
    }
}

// --- Request bodies ---

/// Map Rust field names of the request bodies to their JSON names
fn wire_name(field: &str) -> &str {
    match field {
        "catalog_id" => "BookID",
        "isbn" => "ISBN",
        "title" => "Title",
        "author" => "Author",
        "image_url" => "ImageURL",
        "borrowing_status" => "BorrowingStatus",
        "borrower_id" => "BorrowerID",
        "borrowed_date" => "BorrowedDate",
        "return_date" => "ReturnDate",
        other => other,
    }
}

fn check(request: &impl Validate) -> AppResult<()> {
    request
        .validate()
        .map_err(|errors| AppError::Validation(collect_field_errors(&errors, wire_name)))
}

fn parsed<T>(result: Result<T, FieldError>) -> AppResult<T> {
    result.map_err(|issue| AppError::Validation(vec![issue]))
}

fn date_field(field: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>, FieldError> {
    value
        .map(|raw| {
            parse_date(raw).ok_or_else(|| {
                FieldError::new(field, "invalid_date", EXPECTED_DATE, raw, "Invalid date")
            })
        })
        .transpose()
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBookRequest {
    #[serde(rename = "ISBN")]
    #[validate(custom(function = "crate::validation::isbn_rule"))]
    pub isbn: String,
    #[serde(rename = "Title")]
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: String,
    #[serde(rename = "Author")]
    #[validate(length(min = 1, message = "Author must not be empty"))]
    pub author: String,
    #[serde(rename = "ImageURL")]
    #[validate(url(message = "Invalid url"))]
    pub image_url: String,
}

impl CreateBookRequest {
    pub fn into_new_book(self) -> AppResult<NewBook> {
        check(&self)?;
        Ok(NewBook {
            isbn: parsed(Isbn::parse(&self.isbn))?,
            details: BookDetails {
                title: self.title,
                author: self.author,
                image_url: self.image_url,
            },
        })
    }
}

/// Full edit of a book's descriptive attributes
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBookRequest {
    #[serde(rename = "BookID")]
    #[validate(custom(function = "crate::validation::catalog_id_rule"))]
    pub catalog_id: String,
    #[serde(rename = "ISBN")]
    #[validate(custom(function = "crate::validation::isbn_rule"))]
    pub isbn: String,
    #[serde(rename = "Title")]
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: String,
    #[serde(rename = "Author")]
    #[validate(length(min = 1, message = "Author must not be empty"))]
    pub author: String,
    #[serde(rename = "ImageURL")]
    #[validate(url(message = "Invalid url"))]
    pub image_url: String,
}

impl UpdateBookRequest {
    pub fn into_parts(self) -> AppResult<(BookId, BookDetails)> {
        check(&self)?;
        let id = BookId::new(
            parsed(CatalogId::parse(&self.catalog_id))?,
            parsed(Isbn::parse(&self.isbn))?,
        );
        Ok((
            id,
            BookDetails {
                title: self.title,
                author: self.author,
                image_url: self.image_url,
            },
        ))
    }
}

/// Address of one copy
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BookIdRequest {
    #[serde(rename = "BookID")]
    #[validate(custom(function = "crate::validation::catalog_id_rule"))]
    pub catalog_id: String,
    #[serde(rename = "ISBN")]
    #[validate(custom(function = "crate::validation::isbn_rule"))]
    pub isbn: String,
}

impl BookIdRequest {
    pub fn into_book_id(self) -> AppResult<BookId> {
        check(&self)?;
        Ok(BookId::new(
            parsed(CatalogId::parse(&self.catalog_id))?,
            parsed(Isbn::parse(&self.isbn))?,
        ))
    }
}

/// Book search query parameters
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookSearchQuery {
    /// Exact ISBN
    #[serde(rename = "ISBN")]
    #[validate(custom(function = "crate::validation::isbn_rule"))]
    pub isbn: Option<String>,
    /// Exact title
    #[serde(rename = "Title")]
    pub title: Option<String>,
    /// Exact author
    #[serde(rename = "Author")]
    pub author: Option<String>,
    /// `Available` or `Checked Out`
    #[serde(rename = "BorrowingStatus")]
    #[validate(custom(function = "crate::validation::borrowing_status_rule"))]
    pub borrowing_status: Option<String>,
}

impl BookSearchQuery {
    pub fn into_filter(self) -> AppResult<BookFilter> {
        // Empty query parameters (`?Title=`) count as absent
        let query = Self {
            isbn: self.isbn.filter(|v| !v.is_empty()),
            title: self.title.filter(|v| !v.is_empty()),
            author: self.author.filter(|v| !v.is_empty()),
            borrowing_status: self.borrowing_status.filter(|v| !v.is_empty()),
        };
        check(&query)?;

        Ok(BookFilter {
            isbn: parsed(query.isbn.as_deref().map(Isbn::parse).transpose())?,
            title: query.title,
            author: query.author,
            borrowing_status: query.borrowing_status.as_deref().and_then(BorrowingStatus::parse),
        })
    }
}

/// Borrow request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BorrowRequest {
    #[serde(rename = "BookID")]
    #[validate(custom(function = "crate::validation::catalog_id_rule"))]
    pub catalog_id: String,
    #[serde(rename = "ISBN")]
    #[validate(custom(function = "crate::validation::isbn_rule"))]
    pub isbn: String,
    #[serde(rename = "BorrowerID")]
    #[validate(custom(function = "crate::validation::borrower_id_rule"))]
    pub borrower_id: String,
    /// Defaults to now
    #[serde(rename = "BorrowedDate", default)]
    #[schema(format = DateTime)]
    #[validate(custom(function = "crate::validation::date_rule"))]
    pub borrowed_date: Option<String>,
    /// Defaults to one day after the borrowed date
    #[serde(rename = "ReturnDate", default)]
    #[schema(format = DateTime)]
    #[validate(custom(function = "crate::validation::date_rule"))]
    pub return_date: Option<String>,
}

/// Validated borrow command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Borrow {
    pub id: BookId,
    pub borrower_id: BorrowerId,
    pub borrowed_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
}

impl BorrowRequest {
    pub fn into_borrow(self) -> AppResult<Borrow> {
        check(&self)?;
        Ok(Borrow {
            id: BookId::new(
                parsed(CatalogId::parse(&self.catalog_id))?,
                parsed(Isbn::parse(&self.isbn))?,
            ),
            borrower_id: parsed(BorrowerId::parse(&self.borrower_id))?,
            borrowed_date: parsed(date_field("BorrowedDate", self.borrowed_date.as_deref()))?,
            return_date: parsed(date_field("ReturnDate", self.return_date.as_deref()))?,
        })
    }
}

/// Return request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReturnRequest {
    #[serde(rename = "BookID")]
    #[validate(custom(function = "crate::validation::catalog_id_rule"))]
    pub catalog_id: String,
    #[serde(rename = "ISBN")]
    #[validate(custom(function = "crate::validation::isbn_rule"))]
    pub isbn: String,
    #[serde(rename = "BorrowerID")]
    #[validate(custom(function = "crate::validation::borrower_id_rule"))]
    pub borrower_id: String,
}

impl ReturnRequest {
    pub fn into_parts(self) -> AppResult<(BookId, BorrowerId)> {
        check(&self)?;
        Ok((
            BookId::new(
                parsed(CatalogId::parse(&self.catalog_id))?,
                parsed(Isbn::parse(&self.isbn))?,
            ),
            parsed(BorrowerId::parse(&self.borrower_id))?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(isbn: &str, title: &str, url: &str) -> CreateBookRequest {
        CreateBookRequest {
            isbn: isbn.to_string(),
            title: title.to_string(),
            author: "Y".to_string(),
            image_url: url.to_string(),
        }
    }

    #[test]
    fn test_create_request_collects_every_issue() {
        let err = create_request("123", "", "not a url").into_new_book().unwrap_err();
        let AppError::Validation(issues) = err else {
            panic!("expected a validation error");
        };
        let fields: Vec<&str> = issues.iter().map(|i| i.field()).collect();
        assert_eq!(fields, vec!["ISBN", "ImageURL", "Title"]);
        assert_eq!(issues[0].received, "123");
    }

    #[test]
    fn test_create_request_valid() {
        let book = create_request("978-1-933624-76-3", "X", "https://example.com/a.png")
            .into_new_book()
            .unwrap();
        assert_eq!(book.isbn.as_str(), "978-1-933624-76-3");
        assert_eq!(book.details.title, "X");
    }

    #[test]
    fn test_relative_url_rejected() {
        assert!(create_request("0306406152", "X", "/images/a.png").into_new_book().is_err());
    }

    #[test]
    fn test_borrowed_record_defaults_to_one_day() {
        let borrowed = Utc::now();
        let record = BorrowedRecord::new(BorrowerId::parse("user1").unwrap(), borrowed, None).unwrap();
        assert_eq!(record.return_date - record.borrowed_date, Duration::days(1));
    }

    #[test]
    fn test_borrowed_record_rejects_non_increasing_window() {
        let borrowed = Utc::now();
        let borrower = BorrowerId::parse("user1").unwrap();
        assert!(BorrowedRecord::new(borrower.clone(), borrowed, Some(borrowed)).is_err());
        assert!(
            BorrowedRecord::new(borrower, borrowed, Some(borrowed - Duration::hours(1))).is_err()
        );
    }

    #[test]
    fn test_search_query_blank_params_are_absent() {
        let filter = BookSearchQuery {
            isbn: Some(String::new()),
            title: Some(String::new()),
            author: None,
            borrowing_status: None,
        }
        .into_filter()
        .unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_search_query_rejects_unknown_status() {
        let query = BookSearchQuery {
            borrowing_status: Some("Lost".to_string()),
            ..Default::default()
        };
        assert!(matches!(query.into_filter(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_filter_predicate_order() {
        let filter = BookFilter {
            isbn: Some(Isbn::parse("0306406152").unwrap()),
            title: Some("T".to_string()),
            author: Some("A".to_string()),
            borrowing_status: Some(BorrowingStatus::CheckedOut),
        };
        let order: Vec<BookIndex> = filter.predicates().into_iter().map(|(i, _)| i).collect();
        assert_eq!(
            order,
            vec![BookIndex::Author, BookIndex::BorrowingStatus, BookIndex::Isbn, BookIndex::Title]
        );
    }

    #[test]
    fn test_book_wire_shape() {
        let book = NewBook {
            isbn: Isbn::parse("0306406152").unwrap(),
            details: BookDetails {
                title: "X".into(),
                author: "Y".into(),
                image_url: "https://example.com/a.png".into(),
            },
        }
        .into_book(CatalogId::generate());
        let value = serde_json::to_value(&book).unwrap();
        assert_eq!(value["BorrowingStatus"], "Available");
        assert!(value.get("BorrowedRecord").is_none());
        assert_eq!(value["ISBN"], "0306406152");
    }

    fn borrow_request(borrowed: Option<&str>, until: Option<&str>) -> BorrowRequest {
        BorrowRequest {
            catalog_id: "5f0c3a52-2b8e-4a3e-9a55-6f0d2c1b7e11".to_string(),
            isbn: "0306406152".to_string(),
            borrower_id: "user1".to_string(),
            borrowed_date: borrowed.map(str::to_string),
            return_date: until.map(str::to_string),
        }
    }

    #[test]
    fn test_borrow_request_parses_dates() {
        let borrow = borrow_request(Some("2024-03-01T10:00:00Z"), Some("2024-03-15"))
            .into_borrow()
            .unwrap();
        let from: DateTime<Utc> = "2024-03-01T10:00:00Z".parse().unwrap();
        let until: DateTime<Utc> = "2024-03-15T00:00:00Z".parse().unwrap();
        assert_eq!(borrow.borrowed_date, Some(from));
        assert_eq!(borrow.return_date, Some(until));

        let defaults = borrow_request(None, None).into_borrow().unwrap();
        assert!(defaults.borrowed_date.is_none());
        assert!(defaults.return_date.is_none());
    }

    #[test]
    fn test_borrow_request_malformed_dates_are_field_issues() {
        let err = borrow_request(Some("yesterday"), Some("2024-13-01"))
            .into_borrow()
            .unwrap_err();
        let AppError::Validation(issues) = err else {
            panic!("expected a validation error");
        };
        let fields: Vec<&str> = issues.iter().map(|i| i.field()).collect();
        assert_eq!(fields, vec!["BorrowedDate", "ReturnDate"]);
        assert!(issues.iter().all(|i| i.code == "invalid_date"));
        assert_eq!(issues[0].received, "yesterday");
    }

    #[test]
    fn test_patch_derives_status_from_record() {
        let mut book = NewBook {
            isbn: Isbn::parse("0306406152").unwrap(),
            details: BookDetails {
                title: "X".into(),
                author: "Y".into(),
                image_url: "https://example.com/a.png".into(),
            },
        }
        .into_book(CatalogId::generate());
        let record = BorrowedRecord::new(BorrowerId::parse("user1").unwrap(), Utc::now(), None)
            .unwrap();

        BookPatch::check_out(record).apply(&mut book);
        assert_eq!(book.borrowing_status, BorrowingStatus::CheckedOut);

        BookPatch::details(BookDetails {
            title: "Z".into(),
            author: "Y".into(),
            image_url: "https://example.com/a.png".into(),
        })
        .apply(&mut book);
        assert_eq!(book.title, "Z");
        assert_eq!(book.borrowing_status, BorrowingStatus::CheckedOut);

        BookPatch::check_in().apply(&mut book);
        assert_eq!(book.borrowing_status, BorrowingStatus::Available);
        assert!(book.borrowed_record.is_none());
    }
}
