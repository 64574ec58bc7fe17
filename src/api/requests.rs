use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::db::models::details::{
    CompanyCodeDetails, CompanyCodeFields, PlantCodeDetails, PlantCodeFields, VersionedDetails,
};
use crate::db::models::requests::{
    NewRequest, Request, RequestFilter, RequestKind, RequestStatus, RequestType, SapUpdate,
    SubmittedFields,
};
use crate::db::models::user::Actor;
use crate::utils::api_response::ApiResponse;
use crate::workflow::service::RequestSnapshot;

pub fn request_routes() -> Router<AppState> {
    Router::new()
        .route("/requests", post(create_request).get(list_requests))
        .route("/requests/pending", get(pending_requests))
        .route("/requests/{request_id}", get(get_request))
        .route("/requests/{request_id}/sap-update", post(mark_sap_updated))
        .route("/requests/{request_id}/complete", post(mark_completed))
}

/// Submit a new plant or company code request
#[utoipa::path(
    post,
    path = "/requests",
    request_body = NewRequest,
    responses(
        (status = 201, description = "Request created with details version 1", body = RequestSnapshot),
        (status = 400, description = "Missing identity fields or invalid change request"),
        (status = 404, description = "Original request not found"),
        (status = 409, description = "Original request is not approved yet")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn create_request(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<NewRequest>,
) -> Result<ApiResponse<RequestSnapshot>, ApiResponse<()>> {
    let snapshot = state.workflow.create_request(&actor, payload).await?;
    Ok(ApiResponse::success(
        StatusCode::CREATED,
        format!("Request {} created", snapshot.request.request_id),
        snapshot,
    ))
}

/// List requests, most recently updated first
#[utoipa::path(
    get,
    path = "/requests",
    params(RequestFilter),
    responses(
        (status = 200, description = "Requests matching the filter", body = Vec<Request>)
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn list_requests(
    State(state): State<AppState>,
    Query(filter): Query<RequestFilter>,
) -> Result<ApiResponse<Vec<Request>>, ApiResponse<()>> {
    let requests = state.workflow.list_requests(&filter).await?;
    Ok(ApiResponse::success(StatusCode::OK, "Requests retrieved", requests))
}

/// Requests currently waiting on the caller's role
#[utoipa::path(
    get,
    path = "/requests/pending",
    responses(
        (status = 200, description = "Requests awaiting the caller", body = Vec<Request>)
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn pending_requests(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<ApiResponse<Vec<Request>>, ApiResponse<()>> {
    let requests = state.workflow.pending_for(actor.role).await?;
    Ok(ApiResponse::success(
        StatusCode::OK,
        format!("{} request(s) awaiting {}", requests.len(), actor.role),
        requests,
    ))
}

#[utoipa::path(
    get,
    path = "/requests/{request_id}",
    params(("request_id" = String, Path, description = "Request id, e.g. N_01012025_001")),
    responses(
        (status = 200, description = "Request found", body = Request),
        (status = 404, description = "Request not found")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn get_request(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<ApiResponse<Request>, ApiResponse<()>> {
    let request = state.workflow.get_request(&request_id).await?;
    Ok(ApiResponse::success(StatusCode::OK, "Request found", request))
}

/// IT confirms the approved data was entered in SAP
#[utoipa::path(
    post,
    path = "/requests/{request_id}/sap-update",
    params(("request_id" = String, Path, description = "Request id")),
    request_body = SapUpdate,
    responses(
        (status = 200, description = "Request marked sap-updated", body = Request),
        (status = 403, description = "Caller is not IT or request is not approved"),
        (status = 404, description = "Request not found")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn mark_sap_updated(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(request_id): Path<String>,
    Json(payload): Json<SapUpdate>,
) -> Result<ApiResponse<Request>, ApiResponse<()>> {
    let request = state
        .workflow
        .mark_sap_updated(&actor, &request_id, payload)
        .await?;
    Ok(ApiResponse::success(StatusCode::OK, "Request marked as updated in SAP", request))
}

#[utoipa::path(
    post,
    path = "/requests/{request_id}/complete",
    params(("request_id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request completed", body = Request),
        (status = 403, description = "Request is not sap-updated"),
        (status = 404, description = "Request not found")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn mark_completed(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(request_id): Path<String>,
) -> Result<ApiResponse<Request>, ApiResponse<()>> {
    let request = state.workflow.mark_completed(&actor, &request_id).await?;
    Ok(ApiResponse::success(StatusCode::OK, "Request completed", request))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        create_request,
        list_requests,
        pending_requests,
        get_request,
        mark_sap_updated,
        mark_completed,
    ),
    components(
        schemas(
            NewRequest,
            Request,
            RequestKind,
            RequestStatus,
            RequestType,
            SapUpdate,
            SubmittedFields,
            PlantCodeFields,
            CompanyCodeFields,
            PlantCodeDetails,
            CompanyCodeDetails,
            VersionedDetails,
            RequestSnapshot,
        )
    ),
    tags(
        (name = "Requests", description = "Plant and company code request lifecycle")
    )
)]
pub struct RequestDoc;
