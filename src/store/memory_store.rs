use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    Deployment, DeploymentContext, DeploymentEnvironment, DeploymentLog, DeploymentStatus,
    DeploymentStatusView, DeploymentUpdate, DeploymentWebApp, Instance, InstanceUpdate, LogLevel,
};
use crate::store::DeploymentStore;

/// In-memory store for tests and local runs.
///
/// Every operation takes the single inner lock, so the conditional start
/// transition is indivisible exactly like the SQL version.
#[derive(Clone)]
pub struct InMemoryDeploymentStore {
    inner: Arc<Mutex<InMemoryStoreInner>>,
}

#[derive(Default)]
struct InMemoryStoreInner {
    web_apps: HashMap<Uuid, DeploymentWebApp>,
    environments: HashMap<Uuid, (Uuid, DeploymentEnvironment)>,
    instances: HashMap<Uuid, Instance>,
    deployments: HashMap<Uuid, Deployment>,
    logs: Vec<DeploymentLog>,
    next_log_id: i64,
    fail_instance_updates: bool,
}

impl InMemoryStoreInner {
    fn owned_deployment(&self, deployment_id: Uuid, user_id: Uuid) -> Option<&Deployment> {
        let deployment = self.deployments.get(&deployment_id)?;
        let web_app = self.web_apps.get(&deployment.web_app_id)?;
        (web_app.user_id == user_id).then_some(deployment)
    }

    fn logs_of(&self, deployment_id: Uuid) -> Vec<DeploymentLog> {
        self.logs
            .iter()
            .filter(|l| l.deployment_id == deployment_id)
            .cloned()
            .collect()
    }
}

impl InMemoryDeploymentStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(InMemoryStoreInner {
                next_log_id: 1,
                ..Default::default()
            })),
        }
    }

    pub async fn insert_web_app(&self, web_app: DeploymentWebApp) {
        self.inner.lock().await.web_apps.insert(web_app.id, web_app);
    }

    pub async fn insert_environment(&self, web_app_id: Uuid, environment: DeploymentEnvironment) {
        self.inner
            .lock()
            .await
            .environments
            .insert(environment.id, (web_app_id, environment));
    }

    pub async fn insert_instance(&self, instance: Instance) {
        self.inner
            .lock()
            .await
            .instances
            .insert(instance.environment_id, instance);
    }

    pub async fn insert_deployment(&self, deployment: Deployment) {
        self.inner
            .lock()
            .await
            .deployments
            .insert(deployment.id, deployment);
    }

    pub async fn deployment(&self, deployment_id: Uuid) -> Option<Deployment> {
        self.inner.lock().await.deployments.get(&deployment_id).cloned()
    }

    pub async fn instance(&self, environment_id: Uuid) -> Option<Instance> {
        self.inner.lock().await.instances.get(&environment_id).cloned()
    }

    /// Logs of a deployment regardless of owner
    pub async fn logs(&self, deployment_id: Uuid) -> Vec<DeploymentLog> {
        self.inner.lock().await.logs_of(deployment_id)
    }

    /// Make every subsequent instance update fail with a database error
    pub async fn fail_instance_updates(&self, fail: bool) {
        self.inner.lock().await.fail_instance_updates = fail;
    }
}

impl Default for InMemoryDeploymentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeploymentStore for InMemoryDeploymentStore {
    async fn find_for_user(
        &self,
        deployment_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<DeploymentContext>> {
        let inner = self.inner.lock().await;
        let Some(deployment) = inner.owned_deployment(deployment_id, user_id) else {
            return Ok(None);
        };
        let web_app = inner.web_apps.get(&deployment.web_app_id).cloned();
        let environment = inner
            .environments
            .get(&deployment.environment_id)
            .map(|(_, env)| env.clone());

        Ok(match (web_app, environment) {
            (Some(web_app), Some(environment)) => Some(DeploymentContext {
                deployment: deployment.clone(),
                web_app,
                environment,
            }),
            _ => None,
        })
    }

    async fn begin_provisioning_if_startable(
        &self,
        deployment_id: Uuid,
        user_id: Uuid,
        started_at: OffsetDateTime,
    ) -> AppResult<bool> {
        let mut inner = self.inner.lock().await;
        let startable = inner
            .owned_deployment(deployment_id, user_id)
            .is_some_and(|d| d.status.is_startable());
        if !startable {
            return Ok(false);
        }

        if let Some(deployment) = inner.deployments.get_mut(&deployment_id) {
            deployment.status = DeploymentStatus::Provisioning;
            deployment.started_at = Some(started_at);
            deployment.finished_at = None;
            deployment.error_message = None;
            deployment.updated_at = started_at;
        }
        Ok(true)
    }

    async fn update_deployment(
        &self,
        deployment_id: Uuid,
        update: DeploymentUpdate,
    ) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        let deployment = inner
            .deployments
            .get_mut(&deployment_id)
            .ok_or_else(|| AppError::NotFound("Deployment".to_string()))?;

        if let Some(status) = update.status {
            deployment.status = status;
        }
        if let Some(finished_at) = update.finished_at {
            deployment.finished_at = finished_at;
        }
        if let Some(error_message) = update.error_message {
            deployment.error_message = error_message;
        }
        deployment.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn update_instance(&self, environment_id: Uuid, update: InstanceUpdate) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.fail_instance_updates {
            return Err(AppError::Database("instance update rejected".to_string()));
        }
        let instance = inner
            .instances
            .get_mut(&environment_id)
            .ok_or_else(|| AppError::NotFound("Instance".to_string()))?;

        if let Some(status) = update.status {
            instance.status = status;
        }
        if let Some(instance_type) = update.instance_type {
            instance.instance_type = instance_type;
        }
        if let Some(public_ip) = update.public_ip {
            instance.public_ip = public_ip;
        }
        if let Some(provider_instance_id) = update.provider_instance_id {
            instance.provider_instance_id = provider_instance_id;
        }
        instance.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn append_log(
        &self,
        deployment_id: Uuid,
        level: LogLevel,
        message: &str,
    ) -> AppResult<DeploymentLog> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_log_id;
        inner.next_log_id += 1;

        // Never earlier than the previous entry, even if the wall clock steps back
        let mut created_at = OffsetDateTime::now_utc();
        if let Some(last) = inner.logs.last() {
            created_at = created_at.max(last.created_at);
        }

        let log = DeploymentLog {
            id,
            deployment_id,
            level,
            message: message.to_string(),
            created_at,
        };
        inner.logs.push(log.clone());
        Ok(log)
    }

    async fn status_for_user(
        &self,
        deployment_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<DeploymentStatusView>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .owned_deployment(deployment_id, user_id)
            .map(DeploymentStatusView::from))
    }

    async fn logs_for_user(
        &self,
        deployment_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Vec<DeploymentLog>>> {
        let inner = self.inner.lock().await;
        if inner.owned_deployment(deployment_id, user_id).is_none() {
            return Ok(None);
        }
        Ok(Some(inner.logs_of(deployment_id)))
    }

    async fn find_stale(&self, cutoff: OffsetDateTime) -> AppResult<Vec<Deployment>> {
        let inner = self.inner.lock().await;
        let mut stale: Vec<Deployment> = inner
            .deployments
            .values()
            .filter(|d| d.status.is_in_progress())
            .filter(|d| d.started_at.is_some_and(|started| started < cutoff))
            .cloned()
            .collect();
        stale.sort_by_key(|d| d.started_at);
        Ok(stale)
    }

    async fn fail_if_unchanged(
        &self,
        deployment_id: Uuid,
        expected: DeploymentStatus,
        started_at: Option<OffsetDateTime>,
        error_message: &str,
        finished_at: OffsetDateTime,
    ) -> AppResult<bool> {
        let mut inner = self.inner.lock().await;
        let Some(deployment) = inner.deployments.get_mut(&deployment_id) else {
            return Ok(false);
        };
        if deployment.status != expected || deployment.started_at != started_at {
            return Ok(false);
        }

        deployment.status = DeploymentStatus::Failed;
        deployment.finished_at = Some(finished_at);
        deployment.error_message = Some(error_message.to_string());
        deployment.updated_at = finished_at;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InstanceStatus;
    use time::Duration;

    async fn seeded(status: DeploymentStatus) -> (InMemoryDeploymentStore, Uuid, Uuid) {
        let store = InMemoryDeploymentStore::new();
        let user_id = Uuid::new_v4();
        let web_app_id = Uuid::new_v4();
        let environment_id = Uuid::new_v4();
        let deployment_id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        store
            .insert_web_app(DeploymentWebApp {
                id: web_app_id,
                user_id,
                name: "shop".to_string(),
                plan: "starter".to_string(),
                region: "us-east-1".to_string(),
            })
            .await;
        store
            .insert_environment(
                web_app_id,
                DeploymentEnvironment {
                    id: environment_id,
                    name: "production".to_string(),
                    branch: "main".to_string(),
                    port: 3000,
                },
            )
            .await;
        store
            .insert_deployment(Deployment {
                id: deployment_id,
                web_app_id,
                environment_id,
                status,
                started_at: None,
                finished_at: None,
                error_message: None,
                created_at: now,
                updated_at: now,
            })
            .await;

        (store, deployment_id, user_id)
    }

    #[tokio::test]
    async fn test_begin_provisioning_only_from_startable() {
        let (store, id, user) = seeded(DeploymentStatus::Pending).await;
        let now = OffsetDateTime::now_utc();

        assert!(store.begin_provisioning_if_startable(id, user, now).await.unwrap());
        assert!(!store.begin_provisioning_if_startable(id, user, now).await.unwrap());

        let deployment = store.deployment(id).await.unwrap();
        assert_eq!(deployment.status, DeploymentStatus::Provisioning);
        assert_eq!(deployment.started_at, Some(now));
    }

    #[tokio::test]
    async fn test_begin_provisioning_from_failed_clears_previous_outcome() {
        let (store, id, user) = seeded(DeploymentStatus::Failed).await;
        store
            .update_deployment(id, DeploymentUpdate::failed("old", OffsetDateTime::now_utc()))
            .await
            .unwrap();

        assert!(store
            .begin_provisioning_if_startable(id, user, OffsetDateTime::now_utc())
            .await
            .unwrap());

        let deployment = store.deployment(id).await.unwrap();
        assert_eq!(deployment.error_message, None);
        assert_eq!(deployment.finished_at, None);
    }

    #[tokio::test]
    async fn test_other_users_cannot_see_or_start() {
        let (store, id, _) = seeded(DeploymentStatus::Pending).await;
        let stranger = Uuid::new_v4();

        assert!(store.find_for_user(id, stranger).await.unwrap().is_none());
        assert!(store.logs_for_user(id, stranger).await.unwrap().is_none());
        assert!(!store
            .begin_provisioning_if_startable(id, stranger, OffsetDateTime::now_utc())
            .await
            .unwrap());
        assert_eq!(
            store.deployment(id).await.unwrap().status,
            DeploymentStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_update_instance_without_row_is_not_found() {
        let (store, _, _) = seeded(DeploymentStatus::Pending).await;

        let err = store
            .update_instance(
                Uuid::new_v4(),
                InstanceUpdate::status(InstanceStatus::Failed),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(ref what) if what == "Instance"));
    }

    #[tokio::test]
    async fn test_logs_keep_insertion_order() {
        let (store, id, user) = seeded(DeploymentStatus::Pending).await;
        for message in ["one", "two", "three"] {
            store.append_log(id, LogLevel::Info, message).await.unwrap();
        }

        let logs = store.logs_for_user(id, user).await.unwrap().unwrap();
        let messages: Vec<_> = logs.iter().map(|l| l.message.as_str()).collect();
        assert_eq!(messages, ["one", "two", "three"]);
        assert!(logs.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn test_fail_if_unchanged_skips_restarted_deployment() {
        let (store, id, user) = seeded(DeploymentStatus::Pending).await;
        let first_start = OffsetDateTime::now_utc() - Duration::hours(1);
        store
            .begin_provisioning_if_startable(id, user, first_start)
            .await
            .unwrap();

        let stale = store.find_stale(OffsetDateTime::now_utc()).await.unwrap();
        assert_eq!(stale.len(), 1);

        // A different started_at means another attempt owns the record now
        let other_start = Some(first_start + Duration::minutes(1));
        let applied = store
            .fail_if_unchanged(
                id,
                DeploymentStatus::Provisioning,
                other_start,
                "stale",
                OffsetDateTime::now_utc(),
            )
            .await
            .unwrap();
        assert!(!applied);

        let applied = store
            .fail_if_unchanged(
                id,
                DeploymentStatus::Provisioning,
                Some(first_start),
                "stale",
                OffsetDateTime::now_utc(),
            )
            .await
            .unwrap();
        assert!(applied);
        assert_eq!(
            store.deployment(id).await.unwrap().status,
            DeploymentStatus::Failed
        );
    }
}
