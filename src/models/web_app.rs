use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{Deployment, EnvVar, Environment, Instance};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebApp {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub region: String,
    pub plan: String,
    pub framework: String,
    pub repo_provider: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub default_branch: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryRef {
    pub provider: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

/// Web app creation DTO (validated by `WebAppService`)
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWebApp {
    pub name: String,
    pub region: String,
    pub plan: String,
    pub framework: String,
    pub repository: RepositoryRef,
    pub port: i32,
    #[serde(default)]
    pub env_vars: Vec<EnvVar>,
}

/// Ids produced by web app creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedWebApp {
    pub web_app_id: Uuid,
    pub deployment_id: Uuid,
}

/// Environment with its instance and deployment history
#[derive(Debug, Clone)]
pub struct EnvironmentDetail {
    pub environment: Environment,
    pub instance: Option<Instance>,
    pub deployments: Vec<Deployment>,
}

#[derive(Debug, Clone)]
pub struct WebAppDetail {
    pub web_app: WebApp,
    pub environments: Vec<EnvironmentDetail>,
}
