use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter,
    QueryOrder, QuerySelect, QueryTrait, Set,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::entity::{deployment, deployment_log, environment, instance, web_app};
use crate::error::{AppError, AppResult};
use crate::models::{
    Deployment, DeploymentContext, DeploymentEnvironment, DeploymentLog, DeploymentStatus,
    DeploymentStatusView, DeploymentUpdate, DeploymentWebApp, Instance, InstanceUpdate, LogLevel,
};
use crate::store::DeploymentStore;

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgDeploymentStore {
    db: DatabaseConnection,
}

impl PgDeploymentStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn status_values(statuses: &[DeploymentStatus]) -> Vec<&'static str> {
        statuses.iter().map(DeploymentStatus::as_str).collect()
    }
}

#[async_trait]
impl DeploymentStore for PgDeploymentStore {
    async fn find_for_user(
        &self,
        deployment_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<DeploymentContext>> {
        let Some((deployment, Some(web_app))) = deployment::Entity::find_by_id(deployment_id)
            .find_also_related(web_app::Entity)
            .filter(web_app::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let Some(environment) = environment::Entity::find_by_id(deployment.environment_id)
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        Ok(Some(DeploymentContext {
            deployment: deployment.try_into()?,
            web_app: DeploymentWebApp {
                id: web_app.id,
                user_id: web_app.user_id,
                name: web_app.name,
                plan: web_app.plan,
                region: web_app.region,
            },
            environment: DeploymentEnvironment {
                id: environment.id,
                name: environment.name,
                branch: environment.branch,
                port: environment.port,
            },
        }))
    }

    async fn begin_provisioning_if_startable(
        &self,
        deployment_id: Uuid,
        user_id: Uuid,
        started_at: OffsetDateTime,
    ) -> AppResult<bool> {
        let owned_web_apps = web_app::Entity::find()
            .select_only()
            .column(web_app::Column::Id)
            .filter(web_app::Column::UserId.eq(user_id))
            .into_query();

        // Single conditional write: whoever changes the row holds the start lock
        let result = deployment::Entity::update_many()
            .col_expr(
                deployment::Column::Status,
                Expr::value(DeploymentStatus::Provisioning.as_str()),
            )
            .col_expr(deployment::Column::StartedAt, Expr::value(Some(started_at)))
            .col_expr(
                deployment::Column::FinishedAt,
                Expr::value(Option::<OffsetDateTime>::None),
            )
            .col_expr(
                deployment::Column::ErrorMessage,
                Expr::value(Option::<String>::None),
            )
            .col_expr(deployment::Column::UpdatedAt, Expr::value(started_at))
            .filter(deployment::Column::Id.eq(deployment_id))
            .filter(
                deployment::Column::Status
                    .is_in(Self::status_values(&DeploymentStatus::STARTABLE)),
            )
            .filter(deployment::Column::WebAppId.in_subquery(owned_web_apps))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn update_deployment(
        &self,
        deployment_id: Uuid,
        update: DeploymentUpdate,
    ) -> AppResult<()> {
        let mut query = deployment::Entity::update_many()
            .col_expr(
                deployment::Column::UpdatedAt,
                Expr::value(OffsetDateTime::now_utc()),
            )
            .filter(deployment::Column::Id.eq(deployment_id));

        if let Some(status) = update.status {
            query = query.col_expr(deployment::Column::Status, Expr::value(status.as_str()));
        }
        if let Some(finished_at) = update.finished_at {
            query = query.col_expr(deployment::Column::FinishedAt, Expr::value(finished_at));
        }
        if let Some(error_message) = update.error_message {
            query = query.col_expr(deployment::Column::ErrorMessage, Expr::value(error_message));
        }

        let result = query.exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Deployment".to_string()));
        }
        Ok(())
    }

    async fn update_instance(&self, environment_id: Uuid, update: InstanceUpdate) -> AppResult<()> {
        let mut query = instance::Entity::update_many()
            .col_expr(
                instance::Column::UpdatedAt,
                Expr::value(OffsetDateTime::now_utc()),
            )
            .filter(instance::Column::EnvironmentId.eq(environment_id));

        if let Some(status) = update.status {
            query = query.col_expr(instance::Column::Status, Expr::value(status.as_str()));
        }
        if let Some(instance_type) = update.instance_type {
            query = query.col_expr(instance::Column::InstanceType, Expr::value(instance_type));
        }
        if let Some(public_ip) = update.public_ip {
            query = query.col_expr(instance::Column::PublicIp, Expr::value(public_ip));
        }
        if let Some(provider_instance_id) = update.provider_instance_id {
            query = query.col_expr(
                instance::Column::ProviderInstanceId,
                Expr::value(provider_instance_id),
            );
        }

        let result = query.exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Instance".to_string()));
        }
        Ok(())
    }

    async fn append_log(
        &self,
        deployment_id: Uuid,
        level: LogLevel,
        message: &str,
    ) -> AppResult<DeploymentLog> {
        let model = deployment_log::ActiveModel {
            id: NotSet,
            deployment_id: Set(deployment_id),
            level: Set(level.as_str().to_string()),
            message: Set(message.to_string()),
            created_at: Set(OffsetDateTime::now_utc()),
        };

        let result = model.insert(&self.db).await?;
        result.try_into()
    }

    async fn status_for_user(
        &self,
        deployment_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<DeploymentStatusView>> {
        let context = self.find_for_user(deployment_id, user_id).await?;
        Ok(context.map(|c| DeploymentStatusView::from(&c.deployment)))
    }

    async fn logs_for_user(
        &self,
        deployment_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Vec<DeploymentLog>>> {
        if self.find_for_user(deployment_id, user_id).await?.is_none() {
            return Ok(None);
        }

        let models = deployment_log::Entity::find()
            .filter(deployment_log::Column::DeploymentId.eq(deployment_id))
            .order_by_asc(deployment_log::Column::CreatedAt)
            .order_by_asc(deployment_log::Column::Id)
            .all(&self.db)
            .await?;

        let logs = models
            .into_iter()
            .map(DeploymentLog::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Some(logs))
    }

    async fn find_stale(&self, cutoff: OffsetDateTime) -> AppResult<Vec<Deployment>> {
        let models = deployment::Entity::find()
            .filter(
                deployment::Column::Status
                    .is_in(Self::status_values(&DeploymentStatus::IN_PROGRESS)),
            )
            .filter(deployment::Column::StartedAt.lt(cutoff))
            .order_by_asc(deployment::Column::StartedAt)
            .all(&self.db)
            .await?;

        models.into_iter().map(Deployment::try_from).collect()
    }

    async fn fail_if_unchanged(
        &self,
        deployment_id: Uuid,
        expected: DeploymentStatus,
        started_at: Option<OffsetDateTime>,
        error_message: &str,
        finished_at: OffsetDateTime,
    ) -> AppResult<bool> {
        let started_at_matches = match started_at {
            Some(started_at) => deployment::Column::StartedAt.eq(started_at),
            None => deployment::Column::StartedAt.is_null(),
        };

        let result = deployment::Entity::update_many()
            .col_expr(
                deployment::Column::Status,
                Expr::value(DeploymentStatus::Failed.as_str()),
            )
            .col_expr(deployment::Column::FinishedAt, Expr::value(Some(finished_at)))
            .col_expr(
                deployment::Column::ErrorMessage,
                Expr::value(Some(error_message.to_string())),
            )
            .col_expr(deployment::Column::UpdatedAt, Expr::value(finished_at))
            .filter(deployment::Column::Id.eq(deployment_id))
            .filter(deployment::Column::Status.eq(expected.as_str()))
            .filter(started_at_matches)
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }
}

impl TryFrom<deployment::Model> for Deployment {
    type Error = AppError;

    fn try_from(m: deployment::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: m.id,
            web_app_id: m.web_app_id,
            environment_id: m.environment_id,
            status: m.status.parse()?,
            started_at: m.started_at,
            finished_at: m.finished_at,
            error_message: m.error_message,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

impl TryFrom<instance::Model> for Instance {
    type Error = AppError;

    fn try_from(m: instance::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: m.id,
            environment_id: m.environment_id,
            cpu: m.cpu,
            ram: m.ram,
            storage: m.storage,
            instance_type: m.instance_type,
            status: m.status.parse()?,
            public_ip: m.public_ip,
            provider_instance_id: m.provider_instance_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

impl TryFrom<deployment_log::Model> for DeploymentLog {
    type Error = AppError;

    fn try_from(m: deployment_log::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: m.id,
            deployment_id: m.deployment_id,
            level: m.level.parse()?,
            message: m.message,
            created_at: m.created_at,
        })
    }
}
