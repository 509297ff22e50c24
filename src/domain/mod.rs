mod container;
pub mod image;
pub mod probe;
pub mod suite;
pub mod traits;

pub use container::{
    Container, ContainerConfig, ContainerSpec, ContainerState, IDLE_ENTRYPOINT, MAX_READINESS_TIMEOUT,
    ReadinessPolicy,
};
pub use image::{ImageResolver, resolve_test_image};
pub use probe::{CommandCheck, FileCheck, HttpCheck, Probe};
pub use suite::{Suite, TestCase};
pub use traits::{ContainerRuntime, ExecOutput};
