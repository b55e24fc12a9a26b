//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, borrow, health, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Simple Library API",
        version = "0.1.0",
        description = "Book catalog and lending REST API"
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Catalog
        books::search_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Lending
        borrow::borrow_book,
        borrow::return_book,
        // Users
        users::list_users,
    ),
    components(
        schemas(
            crate::models::Book,
            crate::models::BookId,
            crate::models::BorrowedRecord,
            crate::models::BorrowingStatus,
            crate::models::CatalogId,
            crate::models::Isbn,
            crate::models::BorrowerId,
            crate::models::User,
            crate::models::book::CreateBookRequest,
            crate::models::book::UpdateBookRequest,
            crate::models::book::BookIdRequest,
            crate::models::book::BorrowRequest,
            crate::models::book::ReturnRequest,
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
            crate::error::ErrorDetail,
            crate::validation::FieldError,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "lending", description = "Borrowing and returning books"),
        (name = "users", description = "Borrower directory")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
