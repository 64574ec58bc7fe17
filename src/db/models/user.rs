use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Roles handed out by the auth provider.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Requestor,
    Secretary,
    Siva,
    Raghu,
    Manoj,
    It,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Requestor => "requestor",
            Role::Secretary => "secretary",
            Role::Siva => "siva",
            Role::Raghu => "raghu",
            Role::Manoj => "manoj",
            Role::It => "it",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "requestor" => Ok(Role::Requestor),
            "secretary" => Ok(Role::Secretary),
            "siva" => Ok(Role::Siva),
            "raghu" => Ok(Role::Raghu),
            "manoj" => Ok(Role::Manoj),
            "it" => Ok(Role::It),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Clone, ToSchema)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// The authenticated caller of a request, as supplied by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub email: String,
    pub role: Role,
}

impl Actor {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into().trim().to_ascii_lowercase(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!("Secretary".parse::<Role>(), Ok(Role::Secretary));
        assert_eq!(" IT ".parse::<Role>(), Ok(Role::It));
        assert!("finance".parse::<Role>().is_err());
    }

    #[test]
    fn actor_email_is_normalised() {
        let actor = Actor::new("  Siva@Example.COM ", Role::Siva);
        assert_eq!(actor.email, "siva@example.com");
    }
}
