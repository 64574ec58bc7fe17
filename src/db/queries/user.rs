use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::sync::Cache;
use sqlx::SqlitePool;

use crate::db::models::user::{NewUser, Role, User};
use crate::workflow::error::{WorkflowError, WorkflowResult};

pub async fn create_user(pool: &SqlitePool, new: &NewUser) -> WorkflowResult<User> {
    let email = new.email.trim().to_ascii_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(WorkflowError::Validation(format!(
            "'{}' is not a valid email",
            new.email
        )));
    }
    if new.name.trim().is_empty() {
        return Err(WorkflowError::Validation("name is required".into()));
    }

    sqlx::query_as::<_, User>(
        "INSERT INTO users (email, name, role, created_at) VALUES (?, ?, ?, ?) RETURNING *",
    )
    .bind(&email)
    .bind(new.name.trim())
    .bind(new.role)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .map_err(|e| match WorkflowError::from(e) {
        WorkflowError::Conflict(_) => {
            WorkflowError::Conflict(format!("user {email} already exists"))
        }
        other => other,
    })
}

pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY role, email")
        .fetch_all(pool)
        .await
}

pub async fn emails_for_role(pool: &SqlitePool, role: Role) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE role = ? ORDER BY email")
        .bind(role)
        .fetch_all(pool)
        .await
}

/// ✅ **Role -> recipient emails, cached with a TTL using `moka`**
#[derive(Clone)]
pub struct RecipientDirectory {
    pool: SqlitePool,
    cache: Arc<Cache<Role, Vec<String>>>,
}

impl RecipientDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            cache: Arc::new(
                Cache::builder()
                    .time_to_live(Duration::from_secs(600)) // ✅ TTL = 10 minutes
                    .build(),
            ),
        }
    }

    pub async fn emails_for(&self, role: Role) -> Result<Vec<String>, sqlx::Error> {
        if let Some(cached) = self.cache.get(&role) {
            return Ok(cached);
        }
        let emails = emails_for_role(&self.pool, role).await?;
        self.cache.insert(role, emails.clone());
        Ok(emails)
    }

    /// Drops cached lookups after the user directory changes.
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }
}
