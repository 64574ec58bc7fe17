use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::db::models::user::Role;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

/// ✅ **Approval ledger row**: the latest decision of one approver on one request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub request_id: String,
    pub approver_email: String,
    pub role: Role,
    pub decision: Decision,
    pub comment: String,
    pub attachment_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Body of `POST /requests/{id}/approvals`.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewDecision {
    pub decision: Decision,
    #[serde(default)]
    pub comment: String,
    pub attachment_id: Option<String>,
}
