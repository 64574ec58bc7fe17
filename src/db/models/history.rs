use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::requests::{RequestKind, RequestStatus};
use crate::db::models::user::Role;
use crate::workflow::diff::FieldChange;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum HistoryAction {
    Create,
    Edit,
    Approve,
    Reject,
    UpdateSap,
    Complete,
    Note,
}

impl HistoryAction {
    /// Actions the workflow records itself. Clients may only append notes.
    pub fn is_lifecycle(&self) -> bool {
        !matches!(self, HistoryAction::Note)
    }
}

/// Structured payload attached to a history entry. The variant normally
/// matches the entry's action; `Note` carries free-form client data.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HistoryMetadata {
    #[serde(rename_all = "camelCase")]
    Created {
        request_kind: RequestKind,
        version: i64,
        original_request_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Edited {
        version: i64,
        previous_status: RequestStatus,
        changes: Vec<FieldChange>,
    },
    #[serde(rename_all = "camelCase")]
    Decision {
        role: Role,
        comment: String,
        from_status: RequestStatus,
        to_status: RequestStatus,
        attachment_id: Option<String>,
    },
    SapUpdated {
        comment: Option<String>,
    },
    Completed,
    Note {
        fields: BTreeMap<String, String>,
    },
}

/// One row of the audit timeline.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub action: HistoryAction,
    pub user: String,
    pub metadata: HistoryMetadata,
}

/// Body of `POST /requests/{id}/history`. `action` defaults to `note`,
/// the only action a client may append.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct NewHistoryNote {
    #[serde(default = "note_action")]
    pub action: HistoryAction,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

fn note_action() -> HistoryAction {
    HistoryAction::Note
}
