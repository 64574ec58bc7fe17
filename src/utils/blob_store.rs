use std::path::PathBuf;

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::fs::{self, File};
use uuid::Uuid;

use crate::db::models::attachment::{Attachment, NewAttachment};
use crate::db::queries::attachments;
use crate::workflow::error::{WorkflowError, WorkflowResult};

/// Attachment bytes on disk, metadata in the `attachments` table.
/// Files live at `{root}/{request_id}/{attachment_id}`.
#[derive(Clone, Debug)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn blob_path(&self, request_id: &str, attachment_id: &str) -> PathBuf {
        self.root.join(request_id).join(attachment_id)
    }

    pub async fn put(
        &self,
        pool: &SqlitePool,
        meta: NewAttachment,
        bytes: &[u8],
    ) -> WorkflowResult<Attachment> {
        if meta.file_name.trim().is_empty() {
            return Err(WorkflowError::Validation("file name is required".into()));
        }
        if meta.request_id.contains(['/', '\\']) || meta.request_id.contains("..") {
            return Err(WorkflowError::Validation(format!(
                "invalid request id '{}'",
                meta.request_id
            )));
        }

        let attachment_id = Uuid::new_v4().to_string();
        let dir = self.root.join(&meta.request_id);
        fs::create_dir_all(&dir).await?;
        let path = self.blob_path(&meta.request_id, &attachment_id);
        fs::write(&path, bytes).await?;

        match attachments::insert_attachment(
            pool,
            &attachment_id,
            &meta,
            bytes.len() as i64,
            Utc::now(),
        )
        .await
        {
            Ok(attachment) => {
                tracing::info!(
                    request_id = %meta.request_id,
                    attachment_id = %attachment_id,
                    size = bytes.len(),
                    "stored attachment"
                );
                Ok(attachment)
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&path).await {
                    tracing::warn!("failed to remove orphaned blob {:?}: {}", path, cleanup);
                }
                Err(e.into())
            }
        }
    }

    /// Metadata plus an open handle on the stored bytes.
    pub async fn get(
        &self,
        pool: &SqlitePool,
        attachment_id: &str,
    ) -> WorkflowResult<(Attachment, File)> {
        let attachment = attachments::get_attachment(pool, attachment_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(format!("attachment {attachment_id}")))?;

        let path = self.blob_path(&attachment.request_id, &attachment.attachment_id);
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::error!(
                    "attachment {} has metadata but no blob at {:?}",
                    attachment_id,
                    path
                );
                return Err(WorkflowError::not_found(format!("attachment {attachment_id}")));
            }
            Err(e) => return Err(e.into()),
        };
        Ok((attachment, file))
    }

    pub async fn list(
        &self,
        pool: &SqlitePool,
        request_id: &str,
    ) -> WorkflowResult<Vec<Attachment>> {
        Ok(attachments::list_for_request(pool, request_id).await?)
    }
}
