use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use utoipa::ToSchema;

use crate::db::models::approval::{Approval, Decision, NewDecision};
use crate::db::models::attachment::{Attachment, NewAttachment};
use crate::db::models::details::{
    CompanyCodeDetails, DetailFields, DetailsSubmission, PlantCodeDetails, VersionedDetails,
};
use crate::db::models::history::{HistoryAction, HistoryEntry, HistoryMetadata, NewHistoryNote};
use crate::db::models::requests::{
    NewRequest, Request, RequestFilter, RequestKind, RequestStatus, RequestType, SapUpdate,
    SubmittedFields,
};
use crate::db::models::user::{Actor, Role};
use crate::db::queries::approvals::{self, DecisionRecord};
use crate::db::queries::user::RecipientDirectory;
use crate::db::pool::begin_write;
use crate::db::queries::{attachments, details, history, requests};
use crate::utils::blob_store::BlobStore;
use crate::utils::notification::NotificationDispatcher;
use crate::workflow::diff::{self, ChangeSet};
use crate::workflow::error::{WorkflowError, WorkflowResult};
use crate::workflow::request_id;
use crate::workflow::status::{authorize_admin_action, authorize_decision, AdminAction};

/// A request together with the details version a write just stored.
#[derive(Debug, Serialize, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestSnapshot {
    pub request: Request,
    pub details: VersionedDetails,
}

/// Result of an approve/reject call.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome {
    pub request: Request,
    pub approval: Approval,
}

/// Changes between the two most recent stored versions.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetailsDiff {
    pub request_id: String,
    pub from_version: Option<i64>,
    pub to_version: i64,
    pub diff: ChangeSet,
}

/// An uploaded file on its way into the blob store.
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub file_type: String,
    pub version: Option<i64>,
    pub title: Option<String>,
    pub bytes: Vec<u8>,
}

/// Orchestrates the approval workflow on top of the stores.
///
/// Primary mutations run in a single transaction. History appends and
/// notifications follow the commit and only log on failure.
#[derive(Clone)]
pub struct WorkflowService {
    pool: SqlitePool,
    notifier: NotificationDispatcher,
    recipients: RecipientDirectory,
    blobs: BlobStore,
}

impl WorkflowService {
    pub fn new(
        pool: SqlitePool,
        notifier: NotificationDispatcher,
        recipients: RecipientDirectory,
        blobs: BlobStore,
    ) -> Self {
        Self {
            pool,
            notifier,
            recipients,
            blobs,
        }
    }

    pub fn recipients(&self) -> &RecipientDirectory {
        &self.recipients
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    pub async fn create_request(
        &self,
        actor: &Actor,
        new: NewRequest,
    ) -> WorkflowResult<RequestSnapshot> {
        validate_fields(&new.details)?;
        let request_type = new.details.request_type();

        let original_request_id = match (new.request_kind, new.original_request_id) {
            (RequestKind::New, None) => None,
            (RequestKind::New, Some(_)) => {
                return Err(WorkflowError::Validation(
                    "originalRequestId is only accepted on change requests".into(),
                ))
            }
            (RequestKind::Change, None) => {
                return Err(WorkflowError::Validation(
                    "change requests must name the originalRequestId they change".into(),
                ))
            }
            (RequestKind::Change, Some(original_id)) => {
                let original = self.get_request(&original_id).await?;
                if original.request_type != request_type {
                    return Err(WorkflowError::Validation(format!(
                        "{original_id} is a {:?} request, not {:?}",
                        original.request_type, request_type
                    )));
                }
                if !original.status.accepts_change_request() {
                    return Err(WorkflowError::Conflict(format!(
                        "{original_id} is {} and cannot be changed until it is approved",
                        original.status
                    )));
                }
                Some(original_id)
            }
        };

        let title = title_of(&new.details);
        let now = Utc::now();

        let mut tx = begin_write(&self.pool).await?;
        let request_id = request_id::allocate(&mut *tx, new.request_kind).await?;
        let request = requests::insert_request(
            &mut *tx,
            requests::InsertRequest {
                request_id: &request_id,
                request_type,
                request_kind: new.request_kind,
                original_request_id: original_request_id.as_deref(),
                title: &title,
                status: RequestStatus::INITIAL,
                created_by: &actor.email,
                now,
            },
        )
        .await?;
        let stored = save_submitted(&mut *tx, &request_id, 1, &new.details, &actor.email).await?;
        tx.commit().await?;

        tracing::info!(
            request_id = %request.request_id,
            created_by = %actor.email,
            "request created"
        );

        self.append_history(
            &request.request_id,
            HistoryAction::Create,
            &actor.email,
            HistoryMetadata::Created {
                request_kind: request.request_kind,
                version: 1,
                original_request_id,
            },
        )
        .await;

        let recipients = self.recipients_for(&request, request.status).await;
        self.notifier.notify_version_saved(&request.request_id, 1, recipients.clone());
        self.notifier.notify_status_changed(&request.request_id, request.status, recipients);

        Ok(RequestSnapshot {
            request,
            details: stored,
        })
    }

    /// Stores a new details version and restarts the approval chain.
    pub async fn resubmit_details(
        &self,
        actor: &Actor,
        request_id: &str,
        submission: DetailsSubmission,
    ) -> WorkflowResult<RequestSnapshot> {
        let mut tx = begin_write(&self.pool).await?;
        let current = requests::find_request(&mut *tx, request_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(format!("request {request_id}")))?;
        if current.created_by != actor.email {
            return Err(WorkflowError::Authorization(format!(
                "only {} may resubmit {request_id}",
                current.created_by
            )));
        }
        if !current.status.accepts_resubmission() {
            return Err(WorkflowError::Conflict(format!(
                "{request_id} is {}; submit a change request instead",
                current.status
            )));
        }
        if submission.details.request_type() != current.request_type {
            return Err(WorkflowError::Validation(format!(
                "{request_id} holds {:?} details",
                current.request_type
            )));
        }
        validate_fields(&submission.details)?;

        let changes = changes_since_latest(&mut *tx, request_id, &submission.details).await?;
        let title = title_of(&submission.details);
        let stored = save_submitted(
            &mut *tx,
            request_id,
            submission.version,
            &submission.details,
            &actor.email,
        )
        .await?;
        let request =
            requests::update_after_resubmission(&mut *tx, request_id, &title, Utc::now()).await?;
        tx.commit().await?;

        tracing::info!(
            request_id,
            version = submission.version,
            changed = changes.changes.len(),
            "details resubmitted"
        );

        self.append_history(
            request_id,
            HistoryAction::Edit,
            &actor.email,
            HistoryMetadata::Edited {
                version: submission.version,
                previous_status: current.status,
                changes: changes.changes,
            },
        )
        .await;

        let recipients = self.recipients_for(&request, request.status).await;
        self.notifier.notify_version_saved(request_id, submission.version, recipients.clone());
        if current.status != request.status {
            self.notifier.notify_status_changed(request_id, request.status, recipients);
        }

        Ok(RequestSnapshot {
            request,
            details: stored,
        })
    }

    pub async fn record_decision(
        &self,
        actor: &Actor,
        request_id: &str,
        input: NewDecision,
    ) -> WorkflowResult<DecisionOutcome> {
        let comment = input.comment.trim();
        if comment.is_empty() {
            return Err(WorkflowError::Validation(
                "a comment is required to approve or reject".into(),
            ));
        }
        if let Some(attachment_id) = input.attachment_id.as_deref() {
            let attachment = attachments::get_attachment(&self.pool, attachment_id)
                .await?
                .ok_or_else(|| WorkflowError::not_found(format!("attachment {attachment_id}")))?;
            if attachment.request_id != request_id {
                return Err(WorkflowError::Validation(format!(
                    "attachment {attachment_id} belongs to {}",
                    attachment.request_id
                )));
            }
        }

        let mut tx = begin_write(&self.pool).await?;
        let current = requests::find_request(&mut *tx, request_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(format!("request {request_id}")))?;
        let next = authorize_decision(current.status, actor.role, input.decision)?;
        let now = Utc::now();

        let approval = approvals::record_decision(
            &mut *tx,
            DecisionRecord {
                request_id,
                approver_email: &actor.email,
                role: actor.role,
                decision: input.decision,
                comment,
                attachment_id: input.attachment_id.as_deref(),
                timestamp: now,
            },
        )
        .await?;
        let request = requests::update_status(&mut *tx, request_id, next, now).await?;
        tx.commit().await?;

        tracing::info!(
            request_id,
            approver = %actor.email,
            from = %current.status,
            to = %next,
            "decision recorded"
        );

        let action = match input.decision {
            Decision::Approve => HistoryAction::Approve,
            Decision::Reject => HistoryAction::Reject,
        };
        self.append_history(
            request_id,
            action,
            &actor.email,
            HistoryMetadata::Decision {
                role: actor.role,
                comment: comment.to_string(),
                from_status: current.status,
                to_status: next,
                attachment_id: input.attachment_id.clone(),
            },
        )
        .await;

        let recipients = self.recipients_for(&request, next).await;
        self.notifier.notify_status_changed(request_id, next, recipients);

        Ok(DecisionOutcome { request, approval })
    }

    pub async fn mark_sap_updated(
        &self,
        actor: &Actor,
        request_id: &str,
        update: SapUpdate,
    ) -> WorkflowResult<Request> {
        let comment = update
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self.apply_admin_action(
            actor,
            request_id,
            AdminAction::SapUpdate,
            HistoryAction::UpdateSap,
            HistoryMetadata::SapUpdated { comment },
        )
        .await
    }

    pub async fn mark_completed(&self, actor: &Actor, request_id: &str) -> WorkflowResult<Request> {
        self.apply_admin_action(
            actor,
            request_id,
            AdminAction::MarkCompleted,
            HistoryAction::Complete,
            HistoryMetadata::Completed,
        )
        .await
    }

    async fn apply_admin_action(
        &self,
        actor: &Actor,
        request_id: &str,
        action: AdminAction,
        history_action: HistoryAction,
        metadata: HistoryMetadata,
    ) -> WorkflowResult<Request> {
        let mut tx = begin_write(&self.pool).await?;
        let current = requests::find_request(&mut *tx, request_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(format!("request {request_id}")))?;
        let next = authorize_admin_action(current.status, actor.role, action)?;
        let request = requests::update_status(&mut *tx, request_id, next, Utc::now()).await?;
        tx.commit().await?;

        tracing::info!(request_id, by = %actor.email, to = %next, "{:?} applied", action);

        self.append_history(request_id, history_action, &actor.email, metadata)
            .await;
        let recipients = self.recipients_for(&request, next).await;
        self.notifier.notify_status_changed(request_id, next, recipients);

        Ok(request)
    }

    /// Appends a client supplied note. Unlike the automatic entries, a
    /// failure here is the caller's error, and lifecycle actions are refused.
    pub async fn append_note(
        &self,
        actor: &Actor,
        request_id: &str,
        note: NewHistoryNote,
    ) -> WorkflowResult<HistoryEntry> {
        if note.action.is_lifecycle() {
            return Err(WorkflowError::Validation(format!(
                "{:?} entries are recorded by the workflow; append a note instead",
                note.action
            )));
        }
        self.get_request(request_id).await?;
        history::append(
            &self.pool,
            request_id,
            HistoryAction::Note,
            &actor.email,
            Utc::now(),
            &HistoryMetadata::Note { fields: note.fields },
        )
        .await
    }

    pub async fn add_attachment(
        &self,
        actor: &Actor,
        request_id: &str,
        upload: AttachmentUpload,
    ) -> WorkflowResult<Attachment> {
        let latest = self.latest_details(request_id).await?.version();
        let version = match upload.version {
            Some(v) if v < 1 || v > latest => {
                return Err(WorkflowError::Validation(format!(
                    "version {v} does not exist for {request_id}"
                )))
            }
            Some(v) => v,
            None => latest,
        };
        let title = upload
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| upload.file_name.clone());

        self.blobs
            .put(
                &self.pool,
                NewAttachment {
                    request_id: request_id.to_string(),
                    file_name: upload.file_name,
                    file_type: upload.file_type,
                    version,
                    title,
                    uploaded_by: actor.email.clone(),
                },
                &upload.bytes,
            )
            .await
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    pub async fn get_request(&self, request_id: &str) -> WorkflowResult<Request> {
        requests::get_request(&self.pool, request_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(format!("request {request_id}")))
    }

    pub async fn list_requests(&self, filter: &RequestFilter) -> WorkflowResult<Vec<Request>> {
        Ok(requests::list_requests(&self.pool, filter).await?)
    }

    /// Requests whose current status waits on the caller's role.
    pub async fn pending_for(&self, role: Role) -> WorkflowResult<Vec<Request>> {
        let mut pending = Vec::new();
        for status in RequestStatus::ALL
            .into_iter()
            .filter(|s| s.responsible_role() == Some(role))
        {
            pending.extend(requests::list_by_status(&self.pool, status).await?);
        }
        pending.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(pending)
    }

    pub async fn latest_details(&self, request_id: &str) -> WorkflowResult<VersionedDetails> {
        let request = self.get_request(request_id).await?;
        let latest = match request.request_type {
            RequestType::Plant => details::get_latest::<PlantCodeDetails>(&self.pool, request_id)
                .await?
                .map(VersionedDetails::from),
            RequestType::Company => {
                details::get_latest::<CompanyCodeDetails>(&self.pool, request_id)
                    .await?
                    .map(VersionedDetails::from)
            }
        };
        latest.ok_or_else(|| WorkflowError::not_found(format!("details of {request_id}")))
    }

    /// Every stored version, newest first.
    pub async fn all_versions(&self, request_id: &str) -> WorkflowResult<Vec<VersionedDetails>> {
        let request = self.get_request(request_id).await?;
        Ok(match request.request_type {
            RequestType::Plant => {
                details::get_all_versions::<PlantCodeDetails>(&self.pool, request_id)
                    .await?
                    .into_iter()
                    .map(VersionedDetails::from)
                    .collect()
            }
            RequestType::Company => {
                details::get_all_versions::<CompanyCodeDetails>(&self.pool, request_id)
                    .await?
                    .into_iter()
                    .map(VersionedDetails::from)
                    .collect()
            }
        })
    }

    pub async fn details_diff(&self, request_id: &str) -> WorkflowResult<DetailsDiff> {
        let request = self.get_request(request_id).await?;
        let (from_version, to_version, diff) = match request.request_type {
            RequestType::Plant => {
                let latest =
                    details::get_latest_two::<PlantCodeDetails>(&self.pool, request_id).await?;
                diff_latest_two(request_id, &latest, |d| (d.version, &d.fields))?
            }
            RequestType::Company => {
                let latest =
                    details::get_latest_two::<CompanyCodeDetails>(&self.pool, request_id).await?;
                diff_latest_two(request_id, &latest, |d| (d.version, &d.fields))?
            }
        };
        Ok(DetailsDiff {
            request_id: request_id.to_string(),
            from_version,
            to_version,
            diff,
        })
    }

    pub async fn approvals(&self, request_id: &str) -> WorkflowResult<Vec<Approval>> {
        self.get_request(request_id).await?;
        Ok(approvals::list_for_request(&self.pool, request_id).await?)
    }

    pub async fn history(&self, request_id: &str) -> WorkflowResult<Vec<HistoryEntry>> {
        self.get_request(request_id).await?;
        history::list_for_request(&self.pool, request_id).await
    }

    pub async fn attachments(&self, request_id: &str) -> WorkflowResult<Vec<Attachment>> {
        self.get_request(request_id).await?;
        self.blobs.list(&self.pool, request_id).await
    }

    pub async fn open_attachment(
        &self,
        attachment_id: &str,
    ) -> WorkflowResult<(Attachment, tokio::fs::File)> {
        self.blobs.get(&self.pool, attachment_id).await
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    async fn append_history(
        &self,
        request_id: &str,
        action: HistoryAction,
        user: &str,
        metadata: HistoryMetadata,
    ) {
        if let Err(e) =
            history::append(&self.pool, request_id, action, user, Utc::now(), &metadata).await
        {
            tracing::warn!(request_id, ?action, "failed to append history entry: {}", e);
        }
    }

    /// The requestor plus everyone holding the role `status` waits on.
    async fn recipients_for(&self, request: &Request, status: RequestStatus) -> Vec<String> {
        let mut recipients = vec![request.created_by.clone()];
        if let Some(role) = status.responsible_role() {
            match self.recipients.emails_for(role).await {
                Ok(emails) => recipients.extend(emails),
                Err(e) => tracing::warn!("failed to look up {} recipients: {}", role, e),
            }
        }
        recipients.sort();
        recipients.dedup();
        recipients
    }
}

async fn changes_since_latest(
    conn: &mut SqliteConnection,
    request_id: &str,
    submitted: &SubmittedFields,
) -> WorkflowResult<ChangeSet> {
    Ok(match submitted {
        SubmittedFields::Plant(fields) => {
            let latest = details::get_latest::<PlantCodeDetails>(conn, request_id).await?;
            diff::compare(latest.as_ref().map(|d| &d.fields), fields)
        }
        SubmittedFields::Company(fields) => {
            let latest = details::get_latest::<CompanyCodeDetails>(conn, request_id).await?;
            diff::compare(latest.as_ref().map(|d| &d.fields), fields)
        }
    })
}

fn validate_fields(submitted: &SubmittedFields) -> WorkflowResult<()> {
    match submitted {
        SubmittedFields::Plant(fields) => fields.validate(),
        SubmittedFields::Company(fields) => fields.validate(),
    }
}

fn title_of(submitted: &SubmittedFields) -> String {
    match submitted {
        SubmittedFields::Plant(fields) => fields.title(),
        SubmittedFields::Company(fields) => fields.title(),
    }
}

async fn save_submitted(
    conn: &mut SqliteConnection,
    request_id: &str,
    version: i64,
    submitted: &SubmittedFields,
    saved_by: &str,
) -> WorkflowResult<VersionedDetails> {
    Ok(match submitted {
        SubmittedFields::Plant(fields) => {
            details::save_version::<PlantCodeDetails>(conn, request_id, version, fields, saved_by)
                .await?
                .into()
        }
        SubmittedFields::Company(fields) => {
            details::save_version::<CompanyCodeDetails>(conn, request_id, version, fields, saved_by)
                .await?
                .into()
        }
    })
}

/// `versions` is newest first, as returned by `get_latest_two`.
fn diff_latest_two<D, F: DetailFields>(
    request_id: &str,
    versions: &[D],
    view: impl Fn(&D) -> (i64, &F),
) -> WorkflowResult<(Option<i64>, i64, ChangeSet)> {
    let (newest, previous) = match versions {
        [] => return Err(WorkflowError::not_found(format!("details of {request_id}"))),
        [newest] => (view(newest), None),
        [newest, previous, ..] => (view(newest), Some(view(previous))),
    };
    let diff = diff::compare(previous.map(|(_, fields)| fields), newest.1);
    Ok((previous.map(|(version, _)| version), newest.0, diff))
}
