#![allow(dead_code)]

use std::sync::Arc;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;

use code_approvals::db::models::details::{CompanyCodeFields, PlantCodeFields};
use code_approvals::db::models::requests::{NewRequest, RequestKind, SubmittedFields};
use code_approvals::db::models::user::{Actor, Role};
use code_approvals::db::pool::{pool_options, tune_connect_options};
use code_approvals::db::queries::user::RecipientDirectory;
use code_approvals::utils::blob_store::BlobStore;
use code_approvals::utils::notification::{LogNotifier, NotificationDispatcher};
use code_approvals::workflow::service::WorkflowService;

pub const REQUESTOR: &str = "requestor@example.com";

pub fn actor(role: Role) -> Actor {
    Actor::new(format!("{role}@example.com"), role)
}

pub fn requestor() -> Actor {
    Actor::new(REQUESTOR, Role::Requestor)
}

pub fn plant_fields(plant_code: &str, name: &str) -> PlantCodeFields {
    PlantCodeFields {
        company_code: Some("1000".into()),
        plant_code: Some(plant_code.into()),
        name_of_plant: Some(name.into()),
        address_of_plant: Some("12 Industrial Estate".into()),
        ..Default::default()
    }
}

pub fn company_fields(code: &str, name: &str) -> CompanyCodeFields {
    CompanyCodeFields {
        company_code: Some(code.into()),
        name_of_company_code: Some(name.into()),
        shareholding_percentage: Some("51".into()),
        currency: Some("INR".into()),
        ..Default::default()
    }
}

pub fn new_plant_request(plant_code: &str, name: &str) -> NewRequest {
    NewRequest {
        request_kind: RequestKind::New,
        original_request_id: None,
        details: SubmittedFields::Plant(plant_fields(plant_code, name)),
    }
}

/// Workflow service over `pool` with a log-only notifier and a throwaway blob directory.
/// Keep the returned [`TempDir`] alive for the duration of the test.
pub fn service(pool: &SqlitePool) -> (WorkflowService, TempDir) {
    let blobs = tempfile::tempdir().expect("create blob dir");
    let service = WorkflowService::new(
        pool.clone(),
        NotificationDispatcher::new(Arc::new(LogNotifier)),
        RecipientDirectory::new(pool.clone()),
        BlobStore::new(blobs.path()),
    );
    (service, blobs)
}

/// Pool over the per-test database with the server's settings (WAL, busy
/// timeout, ten connections). Concurrency tests use this instead of the
/// default test pool so they exercise the production locking behaviour.
pub async fn server_pool(connect_opts: SqliteConnectOptions) -> SqlitePool {
    pool_options()
        .connect_with(tune_connect_options(connect_opts))
        .await
        .expect("connect server pool")
}
