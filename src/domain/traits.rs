use super::{Container, ContainerSpec};
use anyhow::Result;
use std::fmt::Debug;

/// Result of one `exec` inside a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// Trait for container runtime operations
pub trait ContainerRuntime: Send + Sync + Debug {
    /// Name of the backing engine, used in logs and errors
    fn name(&self) -> &str;

    /// Check whether the engine can be invoked at all
    fn is_available(&self) -> bool;

    /// Create a container from a spec, returning its id
    fn create_container(&self, spec: &ContainerSpec) -> Result<String>;

    /// Start a created container
    fn start_container(&self, id: &str) -> Result<()>;

    /// Get the current state of a container
    fn get_container(&self, id: &str) -> Result<Container>;

    /// Run a command inside a running container.
    ///
    /// A non-zero exit of the command is a successful call; `Err` means the
    /// exec itself could not be performed.
    fn exec(&self, id: &str, argv: &[String]) -> Result<ExecOutput>;

    /// Host port a published container port is bound to
    fn host_port(&self, id: &str, container_port: u16) -> Result<Option<u16>>;

    /// Stop and remove a container
    fn remove_container(&self, id: &str) -> Result<()>;
}
