use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::db::models::details::{DetailsSubmission, VersionedDetails};
use crate::db::models::user::Actor;
use crate::utils::api_response::ApiResponse;
use crate::workflow::diff::{ChangeSet, FieldChange};
use crate::workflow::service::{DetailsDiff, RequestSnapshot};

pub fn details_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/requests/{request_id}/details",
            get(all_versions).put(resubmit_details),
        )
        .route("/requests/{request_id}/details/latest", get(latest_details))
        .route("/requests/{request_id}/details/diff", get(details_diff))
}

#[utoipa::path(
    get,
    path = "/requests/{request_id}/details/latest",
    params(("request_id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Highest stored version", body = VersionedDetails),
        (status = 404, description = "Request or details not found")
    ),
    tag = "Details",
    security(("bearerAuth" = []))
)]
pub async fn latest_details(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<ApiResponse<VersionedDetails>, ApiResponse<()>> {
    let details = state.workflow.latest_details(&request_id).await?;
    Ok(ApiResponse::success(
        StatusCode::OK,
        format!("Version {} of {request_id}", details.version()),
        details,
    ))
}

/// Every stored version, newest first
#[utoipa::path(
    get,
    path = "/requests/{request_id}/details",
    params(("request_id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "All versions, descending", body = Vec<VersionedDetails>),
        (status = 404, description = "Request not found")
    ),
    tag = "Details",
    security(("bearerAuth" = []))
)]
pub async fn all_versions(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<ApiResponse<Vec<VersionedDetails>>, ApiResponse<()>> {
    let versions = state.workflow.all_versions(&request_id).await?;
    Ok(ApiResponse::success(StatusCode::OK, "Versions retrieved", versions))
}

/// Resubmit the request's details as a new version
///
/// Restarts the approval chain at `pending-secretary`.
#[utoipa::path(
    put,
    path = "/requests/{request_id}/details",
    params(("request_id" = String, Path, description = "Request id")),
    request_body = DetailsSubmission,
    responses(
        (status = 200, description = "Version stored", body = RequestSnapshot),
        (status = 400, description = "Invalid version or missing identity fields"),
        (status = 403, description = "Caller did not create the request"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Stale or duplicate version, or request already approved")
    ),
    tag = "Details",
    security(("bearerAuth" = []))
)]
pub async fn resubmit_details(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(request_id): Path<String>,
    Json(payload): Json<DetailsSubmission>,
) -> Result<ApiResponse<RequestSnapshot>, ApiResponse<()>> {
    let snapshot = state
        .workflow
        .resubmit_details(&actor, &request_id, payload)
        .await?;
    Ok(ApiResponse::success(
        StatusCode::OK,
        format!("Version {} saved", snapshot.details.version()),
        snapshot,
    ))
}

/// Field changes between the two most recent versions
#[utoipa::path(
    get,
    path = "/requests/{request_id}/details/diff",
    params(("request_id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Changes; empty when only one version exists", body = DetailsDiff),
        (status = 404, description = "Request or details not found")
    ),
    tag = "Details",
    security(("bearerAuth" = []))
)]
pub async fn details_diff(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<ApiResponse<DetailsDiff>, ApiResponse<()>> {
    let diff = state.workflow.details_diff(&request_id).await?;
    Ok(ApiResponse::success(StatusCode::OK, "Diff computed", diff))
}

#[derive(OpenApi)]
#[openapi(
    paths(latest_details, all_versions, resubmit_details, details_diff),
    components(schemas(DetailsSubmission, DetailsDiff, ChangeSet, FieldChange)),
    tags(
        (name = "Details", description = "Versioned request details")
    )
)]
pub struct DetailsDoc;
