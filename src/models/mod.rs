pub mod deployment;
pub mod deployment_log;
pub mod environment;
pub mod instance;
pub mod user;
pub mod web_app;

pub use deployment::*;
pub use deployment_log::*;
pub use environment::*;
pub use instance::*;
pub use user::*;
pub use web_app::*;
