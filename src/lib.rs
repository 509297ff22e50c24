pub mod checks;
pub mod cli;
pub mod domain;
pub mod error;
pub mod infra;
pub mod services;

// Make test_support available for integration tests
pub mod test_support;

pub use domain::{
    CommandCheck, ContainerConfig, ContainerRuntime, FileCheck, HttpCheck, ImageResolver, Probe,
    ReadinessPolicy, Suite, TestCase, resolve_test_image,
};
pub use error::{HarnessError, ProbeFailure};
pub use infra::{Engine, EngineAdapter};
pub use services::{ProbeHarness, ProbeOutcome, Report, SuiteRunner};
