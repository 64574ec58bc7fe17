use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::db::models::approval::{Approval, Decision, NewDecision};
use crate::db::models::user::{Actor, Role};
use crate::utils::api_response::ApiResponse;
use crate::workflow::service::DecisionOutcome;

pub fn approval_routes() -> Router<AppState> {
    Router::new().route(
        "/requests/{request_id}/approvals",
        post(record_decision).get(list_approvals),
    )
}

/// Approve or reject a request at the caller's stage
#[utoipa::path(
    post,
    path = "/requests/{request_id}/approvals",
    params(("request_id" = String, Path, description = "Request id")),
    request_body = NewDecision,
    responses(
        (status = 200, description = "Decision recorded and status advanced", body = DecisionOutcome),
        (status = 400, description = "Comment missing"),
        (status = 403, description = "Request is not waiting on the caller's role"),
        (status = 404, description = "Request not found")
    ),
    tag = "Approvals",
    security(("bearerAuth" = []))
)]
pub async fn record_decision(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(request_id): Path<String>,
    Json(payload): Json<NewDecision>,
) -> Result<ApiResponse<DecisionOutcome>, ApiResponse<()>> {
    let decision = payload.decision;
    let outcome = state
        .workflow
        .record_decision(&actor, &request_id, payload)
        .await?;
    let verb = match decision {
        Decision::Approve => "approved",
        Decision::Reject => "rejected",
    };
    Ok(ApiResponse::success(
        StatusCode::OK,
        format!("Request {verb}; now {}", outcome.request.status),
        outcome,
    ))
}

/// Latest decision of each approver, oldest first
#[utoipa::path(
    get,
    path = "/requests/{request_id}/approvals",
    params(("request_id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Approval ledger", body = Vec<Approval>),
        (status = 404, description = "Request not found")
    ),
    tag = "Approvals",
    security(("bearerAuth" = []))
)]
pub async fn list_approvals(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<ApiResponse<Vec<Approval>>, ApiResponse<()>> {
    let approvals = state.workflow.approvals(&request_id).await?;
    Ok(ApiResponse::success(StatusCode::OK, "Approvals retrieved", approvals))
}

#[derive(OpenApi)]
#[openapi(
    paths(record_decision, list_approvals),
    components(schemas(Approval, Decision, NewDecision, DecisionOutcome, Role)),
    tags(
        (name = "Approvals", description = "Approver decisions")
    )
)]
pub struct ApprovalDoc;
