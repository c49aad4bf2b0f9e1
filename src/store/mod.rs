pub mod memory_store;
pub mod postgres_store;

pub use memory_store::InMemoryDeploymentStore;
pub use postgres_store::PgDeploymentStore;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    Deployment, DeploymentContext, DeploymentLog, DeploymentStatus, DeploymentStatusView,
    DeploymentUpdate, InstanceUpdate, LogLevel,
};

/// Durable deployment, instance and log state used by the deployment engine.
///
/// Lookups taking a `user_id` are owner-scoped: a deployment whose web app belongs
/// to someone else is reported as absent.
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    /// Deployment joined with its web app and environment
    async fn find_for_user(
        &self,
        deployment_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<DeploymentContext>>;

    /// Atomically move an owned deployment from `pending`/`failed` to `provisioning`.
    ///
    /// Sets `started_at` and clears `finished_at` and `error_message` in the same
    /// write. Returns `true` only for the caller whose write took effect.
    async fn begin_provisioning_if_startable(
        &self,
        deployment_id: Uuid,
        user_id: Uuid,
        started_at: OffsetDateTime,
    ) -> AppResult<bool>;

    async fn update_deployment(&self, deployment_id: Uuid, update: DeploymentUpdate)
        -> AppResult<()>;

    /// Update the instance bound to an environment
    async fn update_instance(&self, environment_id: Uuid, update: InstanceUpdate) -> AppResult<()>;

    async fn append_log(
        &self,
        deployment_id: Uuid,
        level: LogLevel,
        message: &str,
    ) -> AppResult<DeploymentLog>;

    async fn status_for_user(
        &self,
        deployment_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<DeploymentStatusView>>;

    /// Logs in creation order, `None` when the deployment is not owned by the user
    async fn logs_for_user(
        &self,
        deployment_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Vec<DeploymentLog>>>;

    /// Deployments still `provisioning`/`deploying` that started before `cutoff`
    async fn find_stale(&self, cutoff: OffsetDateTime) -> AppResult<Vec<Deployment>>;

    /// Move a stale deployment to `failed` if it is still in `expected` with the
    /// same `started_at`. Returns whether the write took effect.
    async fn fail_if_unchanged(
        &self,
        deployment_id: Uuid,
        expected: DeploymentStatus,
        started_at: Option<OffsetDateTime>,
        error_message: &str,
        finished_at: OffsetDateTime,
    ) -> AppResult<bool>;
}
