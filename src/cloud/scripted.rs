use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::cloud::{CloudError, CloudProvider, CloudTarget, LaunchSpec, Region, WaitOutcome};

pub const SCRIPTED_IMAGE_ID: &str = "ami-0scripted00000000";
pub const SCRIPTED_INSTANCE_ID: &str = "i-0scripted000000000";
pub const SCRIPTED_PUBLIC_ADDRESS: &str = "203.0.113.10";

/// A call received by [`ScriptedProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    ResolveImage { region: Region },
    Launch { region: Region, image_id: String, instance_type: String, name: String },
    WaitUntilRunning { region: Region, instance_id: String, max_wait: Duration },
    GetPublicAddress { region: Region, instance_id: String },
}

#[derive(Clone)]
struct Script {
    image: Result<String, CloudError>,
    launch: Result<String, CloudError>,
    launch_delay: Duration,
    wait: Result<WaitOutcome, CloudError>,
    address: Result<String, CloudError>,
}

/// In-process provider with programmable outcomes.
///
/// Used by tests and for running the service locally without a cloud account
/// (`CLOUD_PROVIDER=scripted`). Every call is journaled.
#[derive(Clone)]
pub struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
    calls: Arc<Mutex<Vec<ProviderCall>>>,
}

impl ScriptedProvider {
    /// A provider where every call succeeds
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                image: Ok(SCRIPTED_IMAGE_ID.to_string()),
                launch: Ok(SCRIPTED_INSTANCE_ID.to_string()),
                launch_delay: Duration::ZERO,
                wait: Ok(WaitOutcome::Running),
                address: Ok(SCRIPTED_PUBLIC_ADDRESS.to_string()),
            })),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn set_image(&self, result: Result<String, CloudError>) {
        self.script.lock().await.image = result;
    }

    pub async fn set_launch(&self, result: Result<String, CloudError>) {
        self.script.lock().await.launch = result;
    }

    /// Delay applied before the launch call returns
    pub async fn set_launch_delay(&self, delay: Duration) {
        self.script.lock().await.launch_delay = delay;
    }

    pub async fn set_wait(&self, result: Result<WaitOutcome, CloudError>) {
        self.script.lock().await.wait = result;
    }

    pub async fn set_address(&self, result: Result<String, CloudError>) {
        self.script.lock().await.address = result;
    }

    /// Calls received so far, in order
    pub async fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: ProviderCall) -> Script {
        self.calls.lock().await.push(call);
        self.script.lock().await.clone()
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CloudProvider for ScriptedProvider {
    async fn resolve_latest_image_id(&self, target: &CloudTarget) -> Result<String, CloudError> {
        let script = self
            .record(ProviderCall::ResolveImage {
                region: target.region,
            })
            .await;
        script.image
    }

    async fn launch_instance(
        &self,
        target: &CloudTarget,
        spec: &LaunchSpec,
    ) -> Result<String, CloudError> {
        let script = self
            .record(ProviderCall::Launch {
                region: target.region,
                image_id: spec.image_id.clone(),
                instance_type: spec.instance_type.clone(),
                name: spec.name.clone(),
            })
            .await;

        if !script.launch_delay.is_zero() {
            tokio::time::sleep(script.launch_delay).await;
        }
        script.launch
    }

    async fn wait_until_running(
        &self,
        target: &CloudTarget,
        instance_id: &str,
        max_wait: Duration,
    ) -> Result<WaitOutcome, CloudError> {
        let script = self
            .record(ProviderCall::WaitUntilRunning {
                region: target.region,
                instance_id: instance_id.to_string(),
                max_wait,
            })
            .await;
        script.wait
    }

    async fn get_public_address(
        &self,
        target: &CloudTarget,
        instance_id: &str,
    ) -> Result<String, CloudError> {
        let script = self
            .record(ProviderCall::GetPublicAddress {
                region: target.region,
                instance_id: instance_id.to_string(),
            })
            .await;
        script.address
    }
}
