use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::cloud::{
    CloudDefaults, CloudError, CloudOverrides, CloudProvider, LaunchSpec, ResolvedCloudConfig,
    WaitOutcome,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    DeploymentContext, DeploymentLog, DeploymentStatus, DeploymentStatusView, DeploymentUpdate,
    InstanceStatus, InstanceUpdate, LogLevel, StartedDeployment,
};
use crate::plans;
use crate::store::DeploymentStore;

/// Inbound start request
#[derive(Debug, Clone)]
pub struct StartDeploymentRequest {
    pub deployment_id: Uuid,
    pub user_id: Uuid,
    pub overrides: CloudOverrides,
}

/// Failure inside the provisioning workflow, after the start lock was won
#[derive(Debug, thiserror::Error)]
enum WorkflowError {
    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl WorkflowError {
    fn into_app_error(self) -> AppError {
        match self {
            Self::Cloud(e) => AppError::Provisioning(e.to_string()),
            Self::Store(e) => e,
        }
    }
}

/// Drives one deployment from a startable status to `active` or `failed`.
///
/// Holds no per-deployment state: the only coordination between concurrent
/// callers, in this process or another, is the store's conditional start
/// transition.
pub struct DeploymentEngine {
    store: Arc<dyn DeploymentStore>,
    provider: Arc<dyn CloudProvider>,
    defaults: CloudDefaults,
    wait_timeout: Duration,
}

impl DeploymentEngine {
    pub fn new(
        store: Arc<dyn DeploymentStore>,
        provider: Arc<dyn CloudProvider>,
        defaults: CloudDefaults,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            store,
            provider,
            defaults,
            wait_timeout,
        }
    }

    /// Start (or restart) a deployment and block until it is `active` or `failed`.
    ///
    /// Not-found, validation and conflict errors are raised before anything is
    /// written. Once the start lock is won every failure is compensated before it
    /// is returned, so the record is terminal whenever this returns.
    pub async fn start_deployment(
        &self,
        request: StartDeploymentRequest,
    ) -> AppResult<StartedDeployment> {
        let StartDeploymentRequest {
            deployment_id,
            user_id,
            overrides,
        } = request;

        tracing::info!(
            deployment_id = %deployment_id,
            user_id = %user_id,
            access_key_override = overrides.has_access_key(),
            secret_key_override = overrides.has_secret_key(),
            region_override = overrides.has_region(),
            "Start deployment requested"
        );

        let context = self
            .store
            .find_for_user(deployment_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Deployment".to_string()))?;

        let instance_type = plans::instance_type_for(&context.web_app.plan)?;
        let resolved = self
            .defaults
            .resolve(&overrides, Some(&context.web_app.region))?;

        tracing::info!(
            deployment_id = %deployment_id,
            region = %resolved.target.region,
            credential_source = %resolved.credential_source,
            instance_type,
            "Resolved cloud configuration"
        );

        let won = self
            .store
            .begin_provisioning_if_startable(deployment_id, user_id, OffsetDateTime::now_utc())
            .await?;
        if !won {
            let status = self
                .store
                .status_for_user(deployment_id, user_id)
                .await?
                .map(|view| view.status)
                .unwrap_or(context.deployment.status);
            tracing::warn!(
                deployment_id = %deployment_id,
                status = %status,
                "Start lock rejected"
            );
            return Err(AppError::Conflict(format!(
                "Deployment cannot be started from status: {}",
                status
            )));
        }

        match self.provision(&context, instance_type, &resolved).await {
            Ok(public_address) => Ok(StartedDeployment {
                public_address,
                status: DeploymentStatus::Active,
            }),
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(
                    deployment_id = %deployment_id,
                    lifecycle_started = true,
                    error = %message,
                    "Deployment failed, rolling back"
                );
                self.compensate(&context, &message).await?;
                Err(err.into_app_error())
            }
        }
    }

    pub async fn get_status(
        &self,
        deployment_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<DeploymentStatusView> {
        self.store
            .status_for_user(deployment_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Deployment".to_string()))
    }

    pub async fn get_logs(
        &self,
        deployment_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Vec<DeploymentLog>> {
        self.store
            .logs_for_user(deployment_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Deployment".to_string()))
    }

    /// The committed steps of one attempt. Runs only while holding the start lock.
    async fn provision(
        &self,
        context: &DeploymentContext,
        instance_type: &str,
        resolved: &ResolvedCloudConfig,
    ) -> Result<String, WorkflowError> {
        let deployment_id = context.deployment.id;
        let environment_id = context.environment.id;
        let target = &resolved.target;

        self.log(
            deployment_id,
            format!("Starting provisioning in {}", target.region),
        )
        .await?;

        let image_id = match &resolved.image_id {
            Some(image_id) => image_id.clone(),
            None => {
                self.log(deployment_id, "Resolving image...").await?;
                let image_id = self.provider.resolve_latest_image_id(target).await?;
                self.log(deployment_id, format!("Image resolved: {}", image_id))
                    .await?;
                image_id
            }
        };

        self.store
            .update_instance(
                environment_id,
                InstanceUpdate {
                    status: Some(InstanceStatus::Provisioning),
                    instance_type: Some(instance_type.to_string()),
                    ..Default::default()
                },
            )
            .await?;

        let spec = LaunchSpec {
            image_id,
            instance_type: instance_type.to_string(),
            name: format!("{}-{}", context.web_app.name, context.environment.name),
        };
        let instance_id = self.provider.launch_instance(target, &spec).await?;

        self.store
            .update_instance(
                environment_id,
                InstanceUpdate {
                    provider_instance_id: Some(Some(instance_id.clone())),
                    ..Default::default()
                },
            )
            .await?;
        self.log(
            deployment_id,
            format!("Instance created with id {}", instance_id),
        )
        .await?;

        self.store
            .update_deployment(
                deployment_id,
                DeploymentUpdate::status(DeploymentStatus::Deploying),
            )
            .await?;
        self.store
            .update_instance(environment_id, InstanceUpdate::status(InstanceStatus::Deploying))
            .await?;
        self.log(deployment_id, "Waiting for instance running state")
            .await?;

        match self
            .provider
            .wait_until_running(target, &instance_id, self.wait_timeout)
            .await?
        {
            WaitOutcome::Running => {}
            WaitOutcome::NotRunning(state) => return Err(CloudError::NotRunning(state).into()),
        }

        let public_address = self
            .provider
            .get_public_address(target, &instance_id)
            .await?;

        self.store
            .update_instance(
                environment_id,
                InstanceUpdate {
                    status: Some(InstanceStatus::Active),
                    public_ip: Some(Some(public_address.clone())),
                    ..Default::default()
                },
            )
            .await?;
        self.store
            .update_deployment(
                deployment_id,
                DeploymentUpdate::active(OffsetDateTime::now_utc()),
            )
            .await?;
        self.log(deployment_id, "Deployment active").await?;

        Ok(public_address)
    }

    /// Best-effort rollback: every write is attempted, the first failure is returned.
    async fn compensate(&self, context: &DeploymentContext, message: &str) -> AppResult<()> {
        let deployment_id = context.deployment.id;
        let now = OffsetDateTime::now_utc();

        let writes = [
            (
                "deployment",
                self.store
                    .update_deployment(deployment_id, DeploymentUpdate::failed(message, now))
                    .await,
            ),
            (
                "instance",
                self.store
                    .update_instance(
                        context.environment.id,
                        InstanceUpdate::status(InstanceStatus::Failed),
                    )
                    .await,
            ),
            (
                "log",
                self.store
                    .append_log(deployment_id, LogLevel::Error, message)
                    .await
                    .map(|_| ()),
            ),
        ];

        let mut first_failure = None;
        for (record, result) in writes {
            if let Err(e) = result {
                tracing::error!(
                    deployment_id = %deployment_id,
                    record,
                    error = %e,
                    "Compensation write failed"
                );
                first_failure.get_or_insert(e);
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn log(&self, deployment_id: Uuid, message: impl AsRef<str>) -> AppResult<()> {
        let message = message.as_ref();
        tracing::info!(deployment_id = %deployment_id, "{}", message);
        self.store
            .append_log(deployment_id, LogLevel::Info, message)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_failures_become_provisioning_errors() {
        let err = WorkflowError::from(CloudError::Rejected("capacity".to_string()));
        assert_eq!(err.to_string(), "capacity");
        assert!(matches!(err.into_app_error(), AppError::Provisioning(m) if m == "capacity"));
    }

    #[test]
    fn test_store_failures_are_reraised_unchanged() {
        let err = WorkflowError::from(AppError::Database("gone".to_string()));
        assert!(matches!(err.into_app_error(), AppError::Database(m) if m == "gone"));
    }
}
