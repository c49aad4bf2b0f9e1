pub mod deployment;
pub mod deployment_log;
pub mod environment;
pub mod instance;
pub mod user;
pub mod web_app;
