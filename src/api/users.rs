//! Borrower directory endpoint

use axum::{extract::State, Json};

use crate::{models::User, AppState};

use super::ApiResponse;

/// List known borrowers
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    responses(
        (status = 200, description = "Borrower directory in the `data` envelope", body = [User])
    )
)]
pub async fn list_users(State(state): State<AppState>) -> Json<ApiResponse<Vec<User>>> {
    Json(ApiResponse::ok(state.services.users.list()))
}
