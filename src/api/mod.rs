//! API handlers for the library REST endpoints

pub mod books;
pub mod borrow;
pub mod health;
pub mod openapi;
pub mod users;

use axum::{
    http::StatusCode,
    routing::{get, put},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Success envelope: `{"status": 200, "data": ...}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        Self {
            status: status.as_u16(),
            data,
        }
    }

    pub fn ok(data: T) -> Self {
        Self::new(StatusCode::OK, data)
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Catalog
        .route(
            "/book",
            get(books::search_books)
                .post(books::create_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        .route("/book/:book_id/:isbn", get(books::get_book))
        // Lending
        .route("/book/borrow", put(borrow::borrow_book).delete(borrow::return_book))
        // Borrower directory
        .route("/users", get(users::list_users))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
