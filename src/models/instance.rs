use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

/// Provider-side compute resource status; mirrors the deployment phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Pending,
    Provisioning,
    Deploying,
    Active,
    Failed,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Provisioning => "provisioning",
            Self::Deploying => "deploying",
            Self::Active => "active",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "provisioning" => Ok(Self::Provisioning),
            "deploying" => Ok(Self::Deploying),
            "active" => Ok(Self::Active),
            "failed" => Ok(Self::Failed),
            other => Err(AppError::Internal(format!("Unknown instance status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub id: Uuid,
    pub environment_id: Uuid,
    pub cpu: i32,
    pub ram: i32,
    pub storage: i32,
    pub instance_type: String,
    pub status: InstanceStatus,
    pub public_ip: Option<String>,
    pub provider_instance_id: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Unconditional field update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceUpdate {
    pub status: Option<InstanceStatus>,
    pub instance_type: Option<String>,
    pub public_ip: Option<Option<String>>,
    pub provider_instance_id: Option<Option<String>>,
}

impl InstanceUpdate {
    pub fn status(status: InstanceStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}
