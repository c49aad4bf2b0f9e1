use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::entity::{deployment, environment, instance, web_app};
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateWebApp, CreatedWebApp, Deployment, DeploymentStatus, Environment, EnvironmentDetail,
    Instance, InstanceStatus, WebApp, WebAppDetail,
};
use crate::plans::Plan;

pub const DEFAULT_ENVIRONMENT: &str = "production";

/// Web app repository for database operations
pub struct WebAppRepository;

impl WebAppRepository {
    /// Insert a web app with its `production` environment, a `pending` instance
    /// and a `pending` deployment, all in one transaction.
    pub async fn create(
        db: &DatabaseConnection,
        user_id: Uuid,
        input: &CreateWebApp,
        plan: &'static Plan,
    ) -> AppResult<CreatedWebApp> {
        let input = input.clone();

        db.transaction::<_, CreatedWebApp, AppError>(|txn| {
            Box::pin(async move {
                let duplicates = web_app::Entity::find()
                    .filter(web_app::Column::UserId.eq(user_id))
                    .filter(web_app::Column::Name.eq(input.name.as_str()))
                    .count(txn)
                    .await?;
                if duplicates > 0 {
                    return Err(AppError::Conflict(
                        "Web app with this name already exists".to_string(),
                    ));
                }

                let now = OffsetDateTime::now_utc();
                let web_app_id = Uuid::new_v4();
                let environment_id = Uuid::new_v4();
                let deployment_id = Uuid::new_v4();

                web_app::ActiveModel {
                    id: Set(web_app_id),
                    user_id: Set(user_id),
                    name: Set(input.name.clone()),
                    region: Set(input.region.clone()),
                    plan: Set(plan.id.to_string()),
                    framework: Set(input.framework.clone()),
                    repo_provider: Set(input.repository.provider.clone()),
                    repo_owner: Set(input.repository.owner.clone()),
                    repo_name: Set(input.repository.repo.clone()),
                    default_branch: Set(input.repository.branch.clone()),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(txn)
                .await?;

                let env_vars: Map<String, Value> = input
                    .env_vars
                    .iter()
                    .map(|var| (var.key.clone(), Value::String(var.value.clone())))
                    .collect();

                environment::ActiveModel {
                    id: Set(environment_id),
                    web_app_id: Set(web_app_id),
                    name: Set(DEFAULT_ENVIRONMENT.to_string()),
                    branch: Set(input.repository.branch.clone()),
                    port: Set(input.port),
                    env_vars: Set(Value::Object(env_vars)),
                    status: Set(DeploymentStatus::Pending.as_str().to_string()),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(txn)
                .await?;

                instance::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    environment_id: Set(environment_id),
                    cpu: Set(plan.cpu),
                    ram: Set(plan.ram),
                    storage: Set(plan.storage),
                    instance_type: Set(plan.instance_type.to_string()),
                    status: Set(InstanceStatus::Pending.as_str().to_string()),
                    public_ip: Set(None),
                    provider_instance_id: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(txn)
                .await?;

                deployment::ActiveModel {
                    id: Set(deployment_id),
                    web_app_id: Set(web_app_id),
                    environment_id: Set(environment_id),
                    status: Set(DeploymentStatus::Pending.as_str().to_string()),
                    started_at: Set(None),
                    finished_at: Set(None),
                    error_message: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(txn)
                .await?;

                Ok(CreatedWebApp {
                    web_app_id,
                    deployment_id,
                })
            })
        })
        .await
        .map_err(AppError::from)
    }

    /// Caller's web apps, newest first
    pub async fn list_by_user(db: &DatabaseConnection, user_id: Uuid) -> AppResult<Vec<WebApp>> {
        let models = web_app::Entity::find()
            .filter(web_app::Column::UserId.eq(user_id))
            .order_by_desc(web_app::Column::CreatedAt)
            .all(db)
            .await?;

        Ok(models.into_iter().map(WebApp::from).collect())
    }

    /// One web app with its environments, instances and deployment history
    pub async fn find_detail(
        db: &DatabaseConnection,
        id: Uuid,
        user_id: Uuid,
    ) -> AppResult<WebAppDetail> {
        let model = web_app::Entity::find_by_id(id)
            .filter(web_app::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Web app".to_string()))?;

        let environments = environment::Entity::find()
            .filter(environment::Column::WebAppId.eq(id))
            .order_by_asc(environment::Column::CreatedAt)
            .all(db)
            .await?;

        let mut details = Vec::with_capacity(environments.len());
        for env in environments {
            let instance = instance::Entity::find()
                .filter(instance::Column::EnvironmentId.eq(env.id))
                .one(db)
                .await?
                .map(Instance::try_from)
                .transpose()?;

            let deployments = deployment::Entity::find()
                .filter(deployment::Column::EnvironmentId.eq(env.id))
                .order_by_desc(deployment::Column::CreatedAt)
                .all(db)
                .await?
                .into_iter()
                .map(Deployment::try_from)
                .collect::<AppResult<Vec<_>>>()?;

            details.push(EnvironmentDetail {
                environment: env.into(),
                instance,
                deployments,
            });
        }

        Ok(WebAppDetail {
            web_app: model.into(),
            environments: details,
        })
    }
}

impl From<web_app::Model> for WebApp {
    fn from(m: web_app::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            name: m.name,
            region: m.region,
            plan: m.plan,
            framework: m.framework,
            repo_provider: m.repo_provider,
            repo_owner: m.repo_owner,
            repo_name: m.repo_name,
            default_branch: m.default_branch,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<environment::Model> for Environment {
    fn from(m: environment::Model) -> Self {
        Self {
            id: m.id,
            web_app_id: m.web_app_id,
            name: m.name,
            branch: m.branch,
            port: m.port,
            env_vars: m.env_vars,
            status: m.status,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
