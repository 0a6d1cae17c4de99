use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbUser {
    pub id: i64,
    pub name: String,
    /// Login identity; also the e-mail for Google-delegated accounts.
    pub username: String,
    /// Argon2id PHC string; empty for Google-delegated accounts.
    pub password_hash: String,
    pub twitter_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbAcronym {
    pub id: i64,
    pub short: String,
    pub long: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbCategory {
    pub id: i64,
    pub name: String,
}
