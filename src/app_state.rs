use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::db::queries::user::RecipientDirectory;
use crate::utils::blob_store::BlobStore;
use crate::utils::notification::{NotificationDispatcher, NotificationResult};
use crate::workflow::service::WorkflowService;

/// Long-lived state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub workflow: WorkflowService,
}

impl AppState {
    /// Wires the workflow service to the configured notifier and blob directory.
    pub fn new(pool: SqlitePool, config: Config) -> NotificationResult<Self> {
        let notifier =
            NotificationDispatcher::from_webhook_url(config.notify_webhook_url.as_deref())?;
        let workflow = WorkflowService::new(
            pool.clone(),
            notifier,
            RecipientDirectory::new(pool.clone()),
            BlobStore::new(config.attachment_storage_path.clone()),
        );
        Ok(Self {
            pool,
            config: Arc::new(config),
            workflow,
        })
    }
}
