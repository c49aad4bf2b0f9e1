use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A named deployment target of a web app (e.g. "production")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub id: Uuid,
    pub web_app_id: Uuid,
    pub name: String,
    pub branch: String,
    pub port: i32,
    /// Stored variables as a JSON object of string values
    pub env_vars: serde_json::Value,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Key/value pair supplied when creating a web app
#[derive(Debug, Clone, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}
