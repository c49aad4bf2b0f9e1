use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middlewares::{AppJson, AuthUser};
use crate::models::{
    CreateWebApp, Deployment, DeploymentStatus, EnvVar, EnvironmentDetail, Instance,
    InstanceStatus, RepositoryRef, WebApp, WebAppDetail,
};
use crate::repositories::WebAppRepository;
use crate::services::WebAppService;
use crate::state::AppState;

// ============ Request/Response DTOs ============

#[derive(Debug, Deserialize, ToSchema)]
pub struct RepositoryInput {
    pub provider: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EnvVarInput {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateWebAppRequest {
    pub name: String,
    pub region: String,
    pub plan: String,
    pub framework: String,
    pub repository: RepositoryInput,
    pub port: i32,
    #[serde(default)]
    pub env_vars: Vec<EnvVarInput>,
}

impl From<CreateWebAppRequest> for CreateWebApp {
    fn from(r: CreateWebAppRequest) -> Self {
        Self {
            name: r.name.trim().to_string(),
            region: r.region,
            plan: r.plan,
            framework: r.framework,
            repository: RepositoryRef {
                provider: r.repository.provider,
                owner: r.repository.owner,
                repo: r.repository.repo,
                branch: r.repository.branch,
            },
            port: r.port,
            env_vars: r
                .env_vars
                .into_iter()
                .map(|v| EnvVar {
                    key: v.key,
                    value: v.value,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateWebAppResponse {
    pub web_app_id: Uuid,
    pub deployment_id: Uuid,
    pub status: DeploymentStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebAppResponse {
    pub id: Uuid,
    pub name: String,
    pub region: String,
    pub plan: String,
    pub framework: String,
    pub repo_provider: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub default_branch: String,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String)]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String)]
    pub updated_at: OffsetDateTime,
}

impl From<WebApp> for WebAppResponse {
    fn from(w: WebApp) -> Self {
        Self {
            id: w.id,
            name: w.name,
            region: w.region,
            plan: w.plan,
            framework: w.framework,
            repo_provider: w.repo_provider,
            repo_owner: w.repo_owner,
            repo_name: w.repo_name,
            default_branch: w.default_branch,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebAppListResponse {
    pub data: Vec<WebAppResponse>,
    pub total: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InstanceResponse {
    pub id: Uuid,
    pub cpu: i32,
    pub ram: i32,
    pub storage: i32,
    pub instance_type: String,
    pub status: InstanceStatus,
    pub public_ip: Option<String>,
    pub provider_instance_id: Option<String>,
}

impl From<Instance> for InstanceResponse {
    fn from(i: Instance) -> Self {
        Self {
            id: i.id,
            cpu: i.cpu,
            ram: i.ram,
            storage: i.storage,
            instance_type: i.instance_type,
            status: i.status,
            public_ip: i.public_ip,
            provider_instance_id: i.provider_instance_id,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeploymentSummary {
    pub id: Uuid,
    pub status: DeploymentStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>)]
    pub started_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>)]
    pub finished_at: Option<OffsetDateTime>,
    pub error_message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String)]
    pub created_at: OffsetDateTime,
}

impl From<Deployment> for DeploymentSummary {
    fn from(d: Deployment) -> Self {
        Self {
            id: d.id,
            status: d.status,
            started_at: d.started_at,
            finished_at: d.finished_at,
            error_message: d.error_message,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnvironmentResponse {
    pub id: Uuid,
    pub name: String,
    pub branch: String,
    pub port: i32,
    /// Variable names only; values are not returned
    pub env_var_keys: Vec<String>,
    pub status: String,
    pub instance: Option<InstanceResponse>,
    pub deployments: Vec<DeploymentSummary>,
}

impl From<EnvironmentDetail> for EnvironmentResponse {
    fn from(detail: EnvironmentDetail) -> Self {
        let env = detail.environment;
        let env_var_keys = env
            .env_vars
            .as_object()
            .map(|vars| vars.keys().cloned().collect())
            .unwrap_or_default();

        Self {
            id: env.id,
            name: env.name,
            branch: env.branch,
            port: env.port,
            env_var_keys,
            status: env.status,
            instance: detail.instance.map(InstanceResponse::from),
            deployments: detail
                .deployments
                .into_iter()
                .map(DeploymentSummary::from)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebAppDetailResponse {
    #[serde(flatten)]
    pub web_app: WebAppResponse,
    pub environments: Vec<EnvironmentResponse>,
}

impl From<WebAppDetail> for WebAppDetailResponse {
    fn from(detail: WebAppDetail) -> Self {
        Self {
            web_app: detail.web_app.into(),
            environments: detail
                .environments
                .into_iter()
                .map(EnvironmentResponse::from)
                .collect(),
        }
    }
}

// ============ Handlers ============

/// Create a web app with a production environment and a pending deployment
#[utoipa::path(
    post,
    path = "/api/webapps",
    request_body = CreateWebAppRequest,
    responses(
        (status = 201, description = "Web app created", body = CreateWebAppResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "A web app with this name already exists")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Web Apps"
)]
pub async fn create_webapp(
    user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateWebAppRequest>,
) -> AppResult<(StatusCode, Json<CreateWebAppResponse>)> {
    let input = CreateWebApp::from(payload);
    let created = WebAppService::create(&state.db, user.id, &input).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateWebAppResponse {
            web_app_id: created.web_app_id,
            deployment_id: created.deployment_id,
            status: DeploymentStatus::Pending,
        }),
    ))
}

/// List the caller's web apps, newest first
#[utoipa::path(
    get,
    path = "/api/webapps",
    responses(
        (status = 200, description = "List of web apps", body = WebAppListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Web Apps"
)]
pub async fn list_webapps(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<WebAppListResponse>> {
    let web_apps = WebAppRepository::list_by_user(&state.db, user.id).await?;

    Ok(Json(WebAppListResponse {
        total: web_apps.len(),
        data: web_apps.into_iter().map(WebAppResponse::from).collect(),
    }))
}

/// Get a web app with its environments and deployments
#[utoipa::path(
    get,
    path = "/api/webapps/{id}",
    params(
        ("id" = Uuid, Path, description = "Web app ID")
    ),
    responses(
        (status = 200, description = "Web app details", body = WebAppDetailResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Web app not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Web Apps"
)]
pub async fn get_webapp(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<WebAppDetailResponse>> {
    let detail = WebAppRepository::find_detail(&state.db, id, user.id).await?;
    Ok(Json(detail.into()))
}
