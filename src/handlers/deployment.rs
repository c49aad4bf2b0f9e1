use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::cloud::CloudOverrides;
use crate::error::AppResult;
use crate::middlewares::{AppJson, AuthUser};
use crate::models::{DeploymentLog, DeploymentStatus, DeploymentStatusView, LogLevel};
use crate::services::StartDeploymentRequest;
use crate::state::AppState;

// ============ Request/Response DTOs ============

/// Per-request AWS settings; never stored
#[derive(Deserialize, ToSchema)]
pub struct AwsCredentialsInput {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: Option<String>,
    pub ami_id: Option<String>,
}

#[derive(Default, Deserialize, ToSchema)]
pub struct StartDeploymentBody {
    pub aws_credentials: Option<AwsCredentialsInput>,
}

impl From<StartDeploymentBody> for CloudOverrides {
    fn from(body: StartDeploymentBody) -> Self {
        match body.aws_credentials {
            Some(input) => Self {
                access_key_id: input.access_key_id,
                secret_access_key: input.secret_access_key,
                region: input.region,
                image_id: input.ami_id,
            },
            None => Self::default(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StartDeploymentResponse {
    pub deployment_id: Uuid,
    pub public_address: String,
    pub status: DeploymentStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeploymentStatusResponse {
    pub deployment_id: Uuid,
    pub status: DeploymentStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>)]
    pub started_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>)]
    pub finished_at: Option<OffsetDateTime>,
    pub error_message: Option<String>,
}

impl DeploymentStatusResponse {
    fn new(deployment_id: Uuid, view: DeploymentStatusView) -> Self {
        Self {
            deployment_id,
            status: view.status,
            started_at: view.started_at,
            finished_at: view.finished_at,
            error_message: view.error_message,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeploymentLogResponse {
    pub id: i64,
    pub level: LogLevel,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String)]
    pub created_at: OffsetDateTime,
}

impl From<DeploymentLog> for DeploymentLogResponse {
    fn from(log: DeploymentLog) -> Self {
        Self {
            id: log.id,
            level: log.level,
            message: log.message,
            created_at: log.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeploymentLogListResponse {
    pub deployment_id: Uuid,
    pub data: Vec<DeploymentLogResponse>,
}

// ============ Handlers ============

/// Start (or restart) a deployment and wait for it to finish
#[utoipa::path(
    post,
    path = "/api/deployments/{deployment_id}/start",
    params(
        ("deployment_id" = Uuid, Path, description = "Deployment ID")
    ),
    request_body(content = StartDeploymentBody, description = "Optional AWS overrides"),
    responses(
        (status = 200, description = "Deployment is active", body = StartDeploymentResponse),
        (status = 400, description = "Unsupported plan or region, incomplete credentials or malformed body"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Deployment not found"),
        (status = 409, description = "Deployment is not in a startable status"),
        (status = 502, description = "Cloud provisioning failed; the deployment is now failed")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Deployments"
)]
pub async fn start_deployment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(deployment_id): Path<Uuid>,
    body: Option<AppJson<StartDeploymentBody>>,
) -> AppResult<Json<StartDeploymentResponse>> {
    let overrides = body.map(|AppJson(body)| body).unwrap_or_default().into();

    let started = state
        .engine
        .start_deployment(StartDeploymentRequest {
            deployment_id,
            user_id: user.id,
            overrides,
        })
        .await?;

    Ok(Json(StartDeploymentResponse {
        deployment_id,
        public_address: started.public_address,
        status: started.status,
    }))
}

/// Current status of a deployment
#[utoipa::path(
    get,
    path = "/api/deployments/{deployment_id}",
    params(
        ("deployment_id" = Uuid, Path, description = "Deployment ID")
    ),
    responses(
        (status = 200, description = "Deployment status", body = DeploymentStatusResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Deployment not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Deployments"
)]
pub async fn get_deployment_status(
    user: AuthUser,
    State(state): State<AppState>,
    Path(deployment_id): Path<Uuid>,
) -> AppResult<Json<DeploymentStatusResponse>> {
    let view = state.engine.get_status(deployment_id, user.id).await?;
    Ok(Json(DeploymentStatusResponse::new(deployment_id, view)))
}

/// Deployment progress log, oldest first
#[utoipa::path(
    get,
    path = "/api/deployments/{deployment_id}/logs",
    params(
        ("deployment_id" = Uuid, Path, description = "Deployment ID")
    ),
    responses(
        (status = 200, description = "Deployment logs", body = DeploymentLogListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Deployment not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Deployments"
)]
pub async fn get_deployment_logs(
    user: AuthUser,
    State(state): State<AppState>,
    Path(deployment_id): Path<Uuid>,
) -> AppResult<Json<DeploymentLogListResponse>> {
    let logs = state.engine.get_logs(deployment_id, user.id).await?;
    Ok(Json(DeploymentLogListResponse {
        deployment_id,
        data: logs.into_iter().map(DeploymentLogResponse::from).collect(),
    }))
}
