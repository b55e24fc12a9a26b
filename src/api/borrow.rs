//! Lending endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        book::{BorrowRequest, ReturnRequest},
        Book,
    },
    AppState,
};

use super::ApiResponse;

/// Check a book out
#[utoipa::path(
    put,
    path = "/book/borrow",
    tag = "lending",
    request_body = BorrowRequest,
    responses(
        (status = 200, description = "Book checked out", body = Book),
        (status = 400, description = "Invalid input or book already checked out", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    payload: Result<Json<BorrowRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let Json(request) = payload?;
    let borrow = request.into_borrow()?;

    let book = state.services.lending.borrow_book(borrow).await?;
    Ok(Json(ApiResponse::ok(book)))
}

/// Return a borrowed book
#[utoipa::path(
    delete,
    path = "/book/borrow",
    tag = "lending",
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Book returned", body = Book),
        (status = 400, description = "Invalid input or book not borrowed", body = crate::error::ErrorResponse),
        (status = 403, description = "Book is held by another borrower"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    payload: Result<Json<ReturnRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let Json(request) = payload?;
    let (id, borrower_id) = request.into_parts()?;

    let book = state.services.lending.return_book(&id, &borrower_id).await?;
    Ok(Json(ApiResponse::ok(book)))
}
