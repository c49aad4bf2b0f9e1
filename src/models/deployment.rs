use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

/// Deployment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Created with the web app, never started
    Pending,
    /// Start lock won, instance being requested
    Provisioning,
    /// Instance requested, waiting for it to run
    Deploying,
    Active,
    /// Attempt failed; may be started again
    Failed,
}

impl DeploymentStatus {
    /// Statuses the start lock may be taken from
    pub const STARTABLE: [DeploymentStatus; 2] = [Self::Pending, Self::Failed];
    /// Statuses held while an attempt is in flight
    pub const IN_PROGRESS: [DeploymentStatus; 2] = [Self::Provisioning, Self::Deploying];

    pub fn is_startable(&self) -> bool {
        Self::STARTABLE.contains(self)
    }

    pub fn is_in_progress(&self) -> bool {
        Self::IN_PROGRESS.contains(self)
    }

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

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "provisioning" => Ok(Self::Provisioning),
            "deploying" => Ok(Self::Deploying),
            "active" => Ok(Self::Active),
            "failed" => Ok(Self::Failed),
            other => Err(AppError::Internal(format!(
                "Unknown deployment status: {}",
                other
            ))),
        }
    }
}

/// One provisioning attempt record for one environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: Uuid,
    pub web_app_id: Uuid,
    pub environment_id: Uuid,
    pub status: DeploymentStatus,
    pub started_at: Option<OffsetDateTime>,
    pub finished_at: Option<OffsetDateTime>,
    pub error_message: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Web app fields the engine needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentWebApp {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub plan: String,
    pub region: String,
}

/// Environment fields the engine needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentEnvironment {
    pub id: Uuid,
    pub name: String,
    pub branch: String,
    pub port: i32,
}

/// A deployment joined with its owning web app and environment
#[derive(Debug, Clone)]
pub struct DeploymentContext {
    pub deployment: Deployment,
    pub web_app: DeploymentWebApp,
    pub environment: DeploymentEnvironment,
}

/// Unconditional field update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentUpdate {
    pub status: Option<DeploymentStatus>,
    pub finished_at: Option<Option<OffsetDateTime>>,
    pub error_message: Option<Option<String>>,
}

impl DeploymentUpdate {
    pub fn status(status: DeploymentStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn active(finished_at: OffsetDateTime) -> Self {
        Self {
            status: Some(DeploymentStatus::Active),
            finished_at: Some(Some(finished_at)),
            ..Default::default()
        }
    }

    pub fn failed(error_message: impl Into<String>, finished_at: OffsetDateTime) -> Self {
        Self {
            status: Some(DeploymentStatus::Failed),
            finished_at: Some(Some(finished_at)),
            error_message: Some(Some(error_message.into())),
        }
    }
}

/// Status projection for polling clients
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentStatusView {
    pub status: DeploymentStatus,
    pub started_at: Option<OffsetDateTime>,
    pub finished_at: Option<OffsetDateTime>,
    pub error_message: Option<String>,
}

impl From<&Deployment> for DeploymentStatusView {
    fn from(d: &Deployment) -> Self {
        Self {
            status: d.status,
            started_at: d.started_at,
            finished_at: d.finished_at,
            error_message: d.error_message.clone(),
        }
    }
}

/// Successful outcome of a start request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedDeployment {
    pub public_address: String,
    pub status: DeploymentStatus,
}
