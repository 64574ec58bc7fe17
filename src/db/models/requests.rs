// src/db/models/requests.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::db::models::details::{CompanyCodeFields, PlantCodeFields};

/// Which master-data object a request creates or changes.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Plant,
    Company,
}

/// New creation (`N_` ids) or change of existing data (`C_` ids).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    New,
    Change,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    Draft,
    PendingSecretary,
    PendingSiva,
    PendingRaghu,
    PendingManoj,
    Approved,
    Rejected,
    SapUpdated,
    Completed,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub request_id: String,
    pub request_type: RequestType,
    pub request_kind: RequestKind,
    pub original_request_id: Option<String>,
    pub title: String,
    pub status: RequestStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field data submitted with a new request, tagged by request type.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
#[serde(tag = "requestType", content = "fields", rename_all = "lowercase")]
pub enum SubmittedFields {
    Plant(PlantCodeFields),
    Company(CompanyCodeFields),
}

impl SubmittedFields {
    pub fn request_type(&self) -> RequestType {
        match self {
            SubmittedFields::Plant(_) => RequestType::Plant,
            SubmittedFields::Company(_) => RequestType::Company,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewRequest {
    #[serde(default = "default_kind")]
    pub request_kind: RequestKind,
    /// Required for change requests: the request whose data is carried forward.
    pub original_request_id: Option<String>,
    pub details: SubmittedFields,
}

fn default_kind() -> RequestKind {
    RequestKind::New
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub request_type: Option<RequestType>,
    pub created_by: Option<String>,
}

/// Payload for IT marking a request as updated in SAP.
#[derive(Debug, Serialize, Deserialize, Default, Clone, ToSchema)]
pub struct SapUpdate {
    pub comment: Option<String>,
}
