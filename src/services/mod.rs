pub mod auth;
pub mod deployment_engine;
pub mod reconciler;
pub mod webapp;

pub use auth::{AuthService, Claims};
pub use deployment_engine::{DeploymentEngine, StartDeploymentRequest};
pub use reconciler::{StaleDeploymentSweeper, SweepReport};
pub use webapp::WebAppService;
