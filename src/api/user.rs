use axum::{extract::State, http::StatusCode, routing::post, Extension, Json, Router};
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::db::models::user::{Actor, NewUser, Role, User};
use crate::db::queries::user::{create_user, list_users};
use crate::utils::api_response::ApiResponse;
use crate::workflow::error::WorkflowError;

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users", post(register_user).get(get_all_users))
}

/// Register a user in the recipient directory (admin only)
#[utoipa::path(
    post,
    path = "/users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid email or name"),
        (status = 403, description = "Caller is not an admin"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Users",
    security(("bearerAuth" = []))
)]
pub async fn register_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<NewUser>,
) -> Result<ApiResponse<User>, ApiResponse<()>> {
    if actor.role != Role::Admin {
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Only admins can register users",
            None,
        ));
    }
    let user = create_user(&state.pool, &payload).await?;
    state.workflow.recipients().invalidate();
    tracing::info!(email = %user.email, role = %user.role, by = %actor.email, "user registered");
    Ok(ApiResponse::success(StatusCode::CREATED, "User created", user))
}

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All users by role", body = Vec<User>)
    ),
    tag = "Users",
    security(("bearerAuth" = []))
)]
pub async fn get_all_users(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<User>>, ApiResponse<()>> {
    let users = list_users(&state.pool)
        .await
        .map_err(WorkflowError::from)?;
    Ok(ApiResponse::success(StatusCode::OK, "Users retrieved", users))
}

#[derive(OpenApi)]
#[openapi(
    paths(register_user, get_all_users),
    components(schemas(User, NewUser, Role)),
    tags(
        (name = "Users", description = "Notification recipients and their roles")
    )
)]
pub struct UserDoc;
