//! Catalog endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        book::{BookIdRequest, BookSearchQuery, CreateBookRequest, UpdateBookRequest},
        Book,
    },
    services::catalog::CreateOutcome,
    AppState,
};

use super::ApiResponse;

/// Search books by any of ISBN, Title, Author or BorrowingStatus
#[utoipa::path(
    get,
    path = "/book",
    tag = "books",
    params(BookSearchQuery),
    responses(
        (status = 200, description = "Matching books in the `data` envelope", body = [Book]),
        (status = 400, description = "Invalid filter", body = crate::error::ErrorResponse)
    )
)]
pub async fn search_books(
    State(state): State<AppState>,
    query: Result<Query<BookSearchQuery>, QueryRejection>,
) -> AppResult<Json<ApiResponse<Vec<Book>>>> {
    let Query(query) = query?;
    let filter = query.into_filter()?;

    let books = state.services.search.search(&filter).await?;
    Ok(Json(ApiResponse::ok(books)))
}

/// Get one copy by catalog ID and ISBN
#[utoipa::path(
    get,
    path = "/book/{book_id}/{isbn}",
    tag = "books",
    params(
        ("book_id" = String, Path, description = "Catalog ID (uuid)"),
        ("isbn" = String, Path, description = "ISBN")
    ),
    responses(
        (status = 200, description = "Book in the `data` envelope", body = Book),
        (status = 400, description = "Malformed identifiers"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path((book_id, isbn)): Path<(String, String)>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let id = BookIdRequest {
        catalog_id: book_id,
        isbn,
    }
    .into_book_id()?;

    let book = state.services.catalog.get_book(&id).await?;
    Ok(Json(ApiResponse::ok(book)))
}

/// Add a copy to the catalog (idempotent on ISBN)
#[utoipa::path(
    post,
    path = "/book",
    tag = "books",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 200, description = "A book with this ISBN already exists and is returned", body = Book),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    payload: Result<Json<CreateBookRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<Book>>)> {
    let Json(request) = payload?;
    let new_book = request.into_new_book()?;

    let (status, book) = match state.services.catalog.create_book(new_book).await? {
        CreateOutcome::Created(book) => (StatusCode::CREATED, book),
        CreateOutcome::Found(book) => (StatusCode::OK, book),
    };

    Ok((status, Json(ApiResponse::new(status, book))))
}

/// Edit a copy's title, author and image
#[utoipa::path(
    put,
    path = "/book",
    tag = "books",
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    payload: Result<Json<UpdateBookRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let Json(request) = payload?;
    let (id, details) = request.into_parts()?;

    let book = state.services.catalog.update_book(&id, details).await?;
    Ok(Json(ApiResponse::ok(book)))
}

/// Remove a copy from the catalog
#[utoipa::path(
    delete,
    path = "/book",
    tag = "books",
    request_body = BookIdRequest,
    responses(
        (status = 200, description = "Deleted book", body = Book),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    payload: Result<Json<BookIdRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let Json(request) = payload?;
    let id = request.into_book_id()?;

    let book = state.services.catalog.remove_book(&id).await?;
    Ok(Json(ApiResponse::ok(book)))
}
