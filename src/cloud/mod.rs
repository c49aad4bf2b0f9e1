pub mod credentials;
pub mod ec2;
pub mod region;
pub mod scripted;
pub mod sigv4;

pub use credentials::{AwsCredentials, CloudDefaults, CloudOverrides, CloudTarget, ResolvedCloudConfig};
pub use ec2::Ec2Provider;
pub use region::Region;
pub use scripted::{ProviderCall, ScriptedProvider};

use std::time::Duration;

use async_trait::async_trait;

/// Errors raised by a cloud provider call
#[derive(Debug, Clone, thiserror::Error)]
pub enum CloudError {
    #[error("Request to cloud provider failed: {0}")]
    Http(String),

    /// The provider rejected the call; `code` is the provider error code
    #[error("{code}: {message}")]
    Api { code: String, message: String },

    #[error("{0}")]
    UnexpectedResponse(String),

    /// Wait finished without the instance running; carries the provider state
    #[error("Instance did not reach running state: {0}")]
    NotRunning(String),

    #[error("{0}")]
    Rejected(String),
}

/// Result of waiting for an instance to come up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Running,
    /// Provider-reported state other than running, or `TIMEOUT` when the ceiling elapsed
    NotRunning(String),
}

/// What to launch
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub image_id: String,
    pub instance_type: String,
    pub name: String,
}

/// Compute provider capabilities consumed by the deployment engine.
///
/// Every call is a single fallible remote operation. Implementations never retry
/// on behalf of the caller.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Look up the current default machine image for a region
    async fn resolve_latest_image_id(&self, target: &CloudTarget) -> Result<String, CloudError>;

    /// Request a new instance, returning the provider instance id
    async fn launch_instance(
        &self,
        target: &CloudTarget,
        spec: &LaunchSpec,
    ) -> Result<String, CloudError>;

    /// Block until the instance is running, or `max_wait` elapses
    async fn wait_until_running(
        &self,
        target: &CloudTarget,
        instance_id: &str,
        max_wait: Duration,
    ) -> Result<WaitOutcome, CloudError>;

    /// Read the public network address assigned to a running instance
    async fn get_public_address(
        &self,
        target: &CloudTarget,
        instance_id: &str,
    ) -> Result<String, CloudError>;
}
