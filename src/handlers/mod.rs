pub mod auth;
pub mod catalog;
pub mod common;
pub mod deployment;
pub mod webapp;

pub use auth::{login, me, register, AuthResponse, LoginRequest, RegisterRequest};
pub use catalog::{
    list_database_types, list_frameworks, list_plans, list_regions, CatalogEntryResponse,
    PlanResponse, RegionResponse,
};
pub use common::{health, not_found, HealthResponse};
pub use deployment::{
    get_deployment_logs, get_deployment_status, start_deployment, AwsCredentialsInput,
    DeploymentLogListResponse, DeploymentLogResponse, DeploymentStatusResponse,
    StartDeploymentBody, StartDeploymentResponse,
};
pub use webapp::{
    create_webapp, get_webapp, list_webapps, CreateWebAppRequest, CreateWebAppResponse,
    DeploymentSummary, EnvVarInput, EnvironmentResponse, InstanceResponse, RepositoryInput,
    WebAppDetailResponse, WebAppListResponse, WebAppResponse,
};
