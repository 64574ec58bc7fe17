mod common;

use std::collections::HashSet;

use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use code_approvals::db::models::approval::Decision;
use code_approvals::db::models::details::{PlantCodeDetails, PlantCodeFields};
use code_approvals::db::models::history::{HistoryAction, HistoryMetadata};
use code_approvals::db::models::requests::RequestKind;
use code_approvals::db::models::user::Role;
use code_approvals::db::pool::begin_write;
use code_approvals::db::queries::{approvals, details, history};
use code_approvals::workflow::error::WorkflowError;
use code_approvals::workflow::request_id;

use common::*;

async fn seeded_request(pool: &SqlitePool) -> String {
    let (service, _blobs) = service(pool);
    service
        .create_request(&requestor(), new_plant_request("P100", "Alpha"))
        .await
        .unwrap()
        .request
        .request_id
}

async fn save(
    pool: &SqlitePool,
    request_id: &str,
    version: i64,
    fields: &PlantCodeFields,
    saved_by: &str,
) -> Result<PlantCodeDetails, WorkflowError> {
    let mut conn = pool.acquire().await.unwrap();
    details::save_version::<PlantCodeDetails>(&mut *conn, request_id, version, fields, saved_by)
        .await
}

#[sqlx::test]
async fn new_request_latest_is_version_one(pool: SqlitePool) {
    let request_id = seeded_request(&pool).await;

    let latest = details::get_latest::<PlantCodeDetails>(&pool, &request_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.version, 1);
    assert_eq!(latest.fields.plant_code.as_deref(), Some("P100"));
    assert_eq!(latest.saved_by, REQUESTOR);
}

#[sqlx::test]
async fn versions_increase_and_list_descending(pool: SqlitePool) {
    let request_id = seeded_request(&pool).await;

    save(&pool, &request_id, 2, &plant_fields("P100", "Beta"), REQUESTOR).await.unwrap();
    save(&pool, &request_id, 3, &plant_fields("P100", "Gamma"), REQUESTOR).await.unwrap();

    let versions: Vec<i64> = details::get_all_versions::<PlantCodeDetails>(&pool, &request_id)
        .await
        .unwrap()
        .iter()
        .map(|d| d.version)
        .collect();
    assert_eq!(versions, vec![3, 2, 1]);
}

#[sqlx::test]
async fn stale_version_is_a_conflict(pool: SqlitePool) {
    let request_id = seeded_request(&pool).await;
    save(&pool, &request_id, 3, &plant_fields("P100", "Beta"), REQUESTOR).await.unwrap();

    let err = save(&pool, &request_id, 2, &plant_fields("P100", "Stale"), REQUESTOR)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Conflict(_)), "{err:?}");

    // Version 1 exists and is the caller's own, but it is no longer the latest.
    let err = save(&pool, &request_id, 1, &plant_fields("P100", "Rewrite"), REQUESTOR)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Conflict(_)), "{err:?}");

    let latest = details::get_latest::<PlantCodeDetails>(&pool, &request_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.version, 3);
}

#[sqlx::test]
async fn same_version_by_another_saver_is_a_conflict(pool: SqlitePool) {
    let request_id = seeded_request(&pool).await;
    save(&pool, &request_id, 2, &plant_fields("P100", "Beta"), REQUESTOR).await.unwrap();

    let err = save(&pool, &request_id, 2, &plant_fields("P100", "Other"), "someone@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Conflict(_)), "{err:?}");
}

#[sqlx::test]
async fn same_saver_retry_overwrites_in_place(pool: SqlitePool) {
    let request_id = seeded_request(&pool).await;
    save(&pool, &request_id, 2, &plant_fields("P100", "Beta"), REQUESTOR).await.unwrap();

    let retried = save(&pool, &request_id, 2, &plant_fields("P100", "Beta II"), REQUESTOR)
        .await
        .unwrap();
    assert_eq!(retried.fields.name_of_plant.as_deref(), Some("Beta II"));

    let all = details::get_all_versions::<PlantCodeDetails>(&pool, &request_id)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[sqlx::test]
async fn invalid_versions_and_missing_identity_are_rejected(pool: SqlitePool) {
    let request_id = seeded_request(&pool).await;

    let err = save(&pool, &request_id, 0, &plant_fields("P100", "Beta"), REQUESTOR)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));

    let mut missing = plant_fields("P100", "Beta");
    missing.name_of_plant = Some("   ".into());
    let err = save(&pool, &request_id, 2, &missing, REQUESTOR).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(ref m) if m.contains("nameOfPlant")));
}

#[sqlx::test]
async fn approval_ledger_keeps_latest_decision_per_approver(pool: SqlitePool) {
    let request_id = seeded_request(&pool).await;
    let secretary = actor(Role::Secretary);

    let mut conn = pool.acquire().await.unwrap();
    for (decision, comment) in [(Decision::Reject, "first look"), (Decision::Approve, "fixed")] {
        approvals::record_decision(
            &mut *conn,
            approvals::DecisionRecord {
                request_id: &request_id,
                approver_email: &secretary.email,
                role: secretary.role,
                decision,
                comment,
                attachment_id: None,
                timestamp: chrono::Utc::now(),
            },
        )
        .await
        .unwrap();
    }
    drop(conn);

    let ledger = approvals::list_for_request(&pool, &request_id).await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].decision, Decision::Approve);
    assert_eq!(ledger[0].comment, "fixed");
}

#[sqlx::test]
async fn history_ties_are_ordered_by_insertion(pool: SqlitePool) {
    let request_id = seeded_request(&pool).await;
    let at = chrono::Utc::now();

    for n in 0..3 {
        let fields = [("n".to_string(), n.to_string())].into_iter().collect();
        history::append(
            &pool,
            &request_id,
            HistoryAction::Edit,
            REQUESTOR,
            at,
            &HistoryMetadata::Note { fields },
        )
        .await
        .unwrap();
    }

    let notes: Vec<String> = history::list_for_request(&pool, &request_id)
        .await
        .unwrap()
        .into_iter()
        .filter_map(|entry| match entry.metadata {
            HistoryMetadata::Note { fields } => fields.get("n").cloned(),
            _ => None,
        })
        .collect();
    assert_eq!(notes, vec!["0", "1", "2"]);
}

#[sqlx::test]
async fn concurrent_allocations_are_unique_and_sequential(
    _pool_opts: SqlitePoolOptions,
    connect_opts: SqliteConnectOptions,
) {
    let pool = server_pool(connect_opts).await;
    let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();

    let tasks: Vec<_> = (0..100)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move {
                let mut conn = pool.acquire().await.unwrap();
                request_id::allocate_on(&mut *conn, RequestKind::New, day)
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for task in tasks {
        assert!(ids.insert(task.await.unwrap()), "duplicate request id");
    }
    assert_eq!(ids.len(), 100);
    assert!(ids.contains("N_01012025_001"));
    assert!(ids.contains("N_01012025_002"));
    assert!(ids.contains("N_01012025_100"));

    // Change requests count separately.
    let mut conn = pool.acquire().await.unwrap();
    let change = request_id::allocate_on(&mut *conn, RequestKind::Change, day)
        .await
        .unwrap();
    assert_eq!(change, "C_01012025_001");
    drop(conn);
    pool.close().await;
}

#[sqlx::test]
async fn racing_saves_of_one_new_version_leave_a_single_winner(
    _pool_opts: SqlitePoolOptions,
    connect_opts: SqliteConnectOptions,
) {
    let pool = server_pool(connect_opts).await;
    let request_id = seeded_request(&pool).await;

    let racers: Vec<_> = ["first@example.com", "second@example.com"]
        .into_iter()
        .map(|saver| {
            let pool = pool.clone();
            let request_id = request_id.clone();
            tokio::spawn(async move {
                let mut tx = begin_write(&pool).await?;
                let saved = details::save_version::<PlantCodeDetails>(
                    &mut *tx,
                    &request_id,
                    2,
                    &plant_fields("P100", saver),
                    saver,
                )
                .await?;
                tx.commit().await?;
                Ok::<_, WorkflowError>(saved)
            })
        })
        .collect();

    let mut winners = Vec::new();
    let mut conflicts = 0;
    for racer in racers {
        match racer.await.unwrap() {
            Ok(saved) => winners.push(saved.saved_by),
            Err(WorkflowError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(winners.len(), 1);
    assert_eq!(conflicts, 1);

    let latest = details::get_latest::<PlantCodeDetails>(&pool, &request_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.version, 2);
    assert_eq!(latest.saved_by, winners[0]);
    pool.close().await;
}
