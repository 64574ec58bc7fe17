use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::db::models::history::{HistoryAction, HistoryEntry, HistoryMetadata, NewHistoryNote};
use crate::db::models::user::Actor;
use crate::utils::api_response::ApiResponse;

pub fn history_routes() -> Router<AppState> {
    Router::new().route(
        "/requests/{request_id}/history",
        get(list_history).post(append_note),
    )
}

#[utoipa::path(
    get,
    path = "/requests/{request_id}/history",
    params(("request_id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Audit timeline, oldest first", body = Vec<HistoryEntry>),
        (status = 404, description = "Request not found")
    ),
    tag = "History",
    security(("bearerAuth" = []))
)]
pub async fn list_history(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<ApiResponse<Vec<HistoryEntry>>, ApiResponse<()>> {
    let entries = state.workflow.history(&request_id).await?;
    Ok(ApiResponse::success(StatusCode::OK, "History retrieved", entries))
}

/// Append a free-form note to the timeline
#[utoipa::path(
    post,
    path = "/requests/{request_id}/history",
    params(("request_id" = String, Path, description = "Request id")),
    request_body = NewHistoryNote,
    responses(
        (status = 201, description = "Entry appended", body = HistoryEntry),
        (status = 400, description = "Action other than note"),
        (status = 404, description = "Request not found")
    ),
    tag = "History",
    security(("bearerAuth" = []))
)]
pub async fn append_note(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(request_id): Path<String>,
    Json(payload): Json<NewHistoryNote>,
) -> Result<ApiResponse<HistoryEntry>, ApiResponse<()>> {
    let entry = state
        .workflow
        .append_note(&actor, &request_id, payload)
        .await?;
    Ok(ApiResponse::success(StatusCode::CREATED, "History entry appended", entry))
}

#[derive(OpenApi)]
#[openapi(
    paths(list_history, append_note),
    components(schemas(HistoryEntry, HistoryAction, HistoryMetadata, NewHistoryNote)),
    tags(
        (name = "History", description = "Append-only audit log")
    )
)]
pub struct HistoryDoc;
