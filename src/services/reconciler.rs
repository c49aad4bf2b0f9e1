use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use crate::error::AppResult;
use crate::models::{InstanceStatus, InstanceUpdate, LogLevel};
use crate::store::DeploymentStore;

pub const INTERRUPTED_MESSAGE: &str = "Deployment interrupted before reaching a terminal state";

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub failed: usize,
}

/// Fails deployments left in `provisioning`/`deploying` by a crashed attempt.
///
/// `stale_after` must exceed the engine's wait ceiling, otherwise a live attempt
/// could be reaped.
pub struct StaleDeploymentSweeper {
    store: Arc<dyn DeploymentStore>,
    stale_after: Duration,
}

impl StaleDeploymentSweeper {
    pub fn new(store: Arc<dyn DeploymentStore>, stale_after: Duration) -> Self {
        Self { store, stale_after }
    }

    pub async fn sweep_once(&self, now: OffsetDateTime) -> AppResult<SweepReport> {
        let stale = self.store.find_stale(now - self.stale_after).await?;
        let mut report = SweepReport {
            examined: stale.len(),
            failed: 0,
        };

        for deployment in stale {
            let applied = self
                .store
                .fail_if_unchanged(
                    deployment.id,
                    deployment.status,
                    deployment.started_at,
                    INTERRUPTED_MESSAGE,
                    now,
                )
                .await?;
            if !applied {
                tracing::debug!(deployment_id = %deployment.id, "Deployment moved on, skipping");
                continue;
            }

            // The deployment is already failed; the follow-up writes must not stop the sweep
            if let Err(error) = self
                .store
                .update_instance(
                    deployment.environment_id,
                    InstanceUpdate::status(InstanceStatus::Failed),
                )
                .await
            {
                tracing::error!(
                    deployment_id = %deployment.id,
                    error = %error,
                    "Failed to mark instance of stale deployment as failed"
                );
            }
            if let Err(error) = self
                .store
                .append_log(deployment.id, LogLevel::Error, INTERRUPTED_MESSAGE)
                .await
            {
                tracing::error!(
                    deployment_id = %deployment.id,
                    error = %error,
                    "Failed to log stale deployment failure"
                );
            }

            tracing::warn!(
                deployment_id = %deployment.id,
                status = %deployment.status,
                "Failed stale deployment"
            );
            report.failed += 1;
        }

        Ok(report)
    }
}
