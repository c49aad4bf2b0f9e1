#![allow(dead_code)]

pub mod app;
pub mod factory;

pub use app::{test_config, DbTestApp, TestApp, TEST_AMI_ID};
pub use factory::{DbFactory, Factory, SeededDeployment, TestAuth};
