//! Error taxonomy of the probe harness.
//!
//! [`HarnessError`] means the harness could not get a container into a state
//! where the expectation can be checked at all; it aborts the enclosing test
//! case. [`ProbeFailure`] means the container was reachable and the
//! expectation did not hold; it is recorded as a failed assertion and sibling
//! checks keep running.

use std::time::Duration;

/// Fatal harness-level error. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The container engine binary cannot be invoked
    #[error("container runtime '{0}' is not available")]
    RuntimeUnavailable(String),

    /// Image could not be pulled, or the container could not be created or started
    #[error("failed to start container from image '{image}': {reason}")]
    Startup {
        /// Image reference under test
        image: String,
        /// Engine error message
        reason: String,
    },

    /// Container never became ready within the bounded wait
    #[error("container '{container}' not ready after {timeout:?}: {reason}")]
    ReadinessTimeout {
        /// Container id
        container: String,
        /// Configured readiness timeout
        timeout: Duration,
        /// Last observed state
        reason: String,
    },

    /// The container's main process exited before it became ready
    #[error("container '{container}' exited with code {exit_code} before becoming ready")]
    ContainerExited {
        /// Container id
        container: String,
        /// Exit code of the main process
        exit_code: i32,
    },

    /// The exec call itself could not run (distinct from a non-zero exit)
    #[error("exec in container '{container}' failed: {reason}")]
    Exec {
        /// Container id
        container: String,
        /// Engine error message
        reason: String,
    },

    /// Any other engine failure
    #[error("container runtime error: {0:#}")]
    Runtime(#[from] anyhow::Error),
}

/// An expectation that did not hold, with the concrete mismatch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{check}: expected {expected}, got {actual}")]
pub struct ProbeFailure {
    pub check: String,
    pub expected: String,
    pub actual: String,
}

impl ProbeFailure {
    pub fn new(
        check: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Self {
            check: check.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
