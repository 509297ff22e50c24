use crate::domain::{
    CommandCheck, ContainerConfig, ContainerRuntime, ContainerSpec, ContainerState, ExecOutput,
    FileCheck, HttpCheck, Probe, ReadinessPolicy,
};
use crate::error::{HarnessError, ProbeFailure};
use crate::infra::http::{HttpProber, HttpResponse, port_open};
use crate::services::report::{Assertion, ProbeOutcome};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

static NEXT_CONTAINER: AtomicU64 = AtomicU64::new(0);

/// Runs one probe against one freshly started container.
///
/// Every call creates exactly one container and removes it before returning,
/// whether the probe passed, failed, or hit a harness error.
pub struct ProbeHarness {
    runtime: Arc<dyn ContainerRuntime>,
    readiness: ReadinessPolicy,
}

impl ProbeHarness {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, readiness: ReadinessPolicy) -> Self {
        Self { runtime, readiness }
    }

    pub fn readiness(&self) -> ReadinessPolicy {
        self.readiness
    }

    pub fn check(
        &self,
        image: &str,
        config: &ContainerConfig,
        probe: &Probe,
    ) -> Result<ProbeOutcome, HarnessError> {
        if !self.runtime.is_available() {
            return Err(HarnessError::RuntimeUnavailable(
                self.runtime.name().to_string(),
            ));
        }

        let label = probe.label();
        debug!(image, probe = %label, "running probe");

        match probe {
            Probe::File(check) => self.check_file(image, config, check, label),
            Probe::Http(check) => self.check_http(image, config, check, label),
            Probe::Command(check) => self.check_command(image, config, check, label),
        }
    }

    fn check_file(
        &self,
        image: &str,
        config: &ContainerConfig,
        check: &FileCheck,
        label: String,
    ) -> Result<ProbeOutcome, HarnessError> {
        let deadline = self.readiness.deadline();
        let (entrypoint, command) = config.idle_process();
        let handle = self.launch(image, config, Some(entrypoint.as_slice()), &command, &[])?;
        self.wait_running(&handle, deadline)?;

        let argv = ["test", "-e", check.path.as_str()].map(str::to_string);
        let output = self.exec(&handle, &argv)?;

        let mut outcome = ProbeOutcome::new(label);
        outcome.observed_exit_code = Some(output.exit_code);
        match output.exit_code {
            0 => outcome.record(Assertion::pass("exists")),
            1 => outcome.record(Assertion::fail(
                "exists",
                ProbeFailure::new("exists", "present", "absent"),
            )),
            code => {
                return Err(HarnessError::Exec {
                    container: handle.id.clone(),
                    reason: format!("`test -e` exited with {code}: {}", output.stderr.trim()),
                });
            }
        }

        Ok(outcome)
    }

    fn check_http(
        &self,
        image: &str,
        config: &ContainerConfig,
        check: &HttpCheck,
        label: String,
    ) -> Result<ProbeOutcome, HarnessError> {
        let prober = HttpProber::new(REQUEST_TIMEOUT)?;
        let deadline = self.readiness.deadline();
        let handle = self.launch(
            image,
            config,
            config.entrypoint.as_deref(),
            &config.command,
            &[check.port],
        )?;
        self.wait_running(&handle, deadline)?;
        let host_port = self.wait_port(&handle, check.port, deadline)?;

        let mut outcome = ProbeOutcome::new(label);
        match self.fetch(&prober, host_port, &check.path, deadline) {
            Ok(response) => {
                outcome.observed_status = Some(response.status);
                outcome.record(Assertion::equals("status", check.status, response.status));
                if let Some(needle) = &check.body_contains {
                    outcome.record(Assertion::contains("body", needle, &response.body));
                }
            }
            Err(err) => {
                let actual = format!("no response ({err:#})");
                outcome.record(Assertion::fail(
                    "status",
                    ProbeFailure::new("status", check.status, &actual),
                ));
                if let Some(needle) = &check.body_contains {
                    outcome.record(Assertion::fail(
                        "body",
                        ProbeFailure::new("body", format!("{needle:?}"), &actual),
                    ));
                }
            }
        }

        Ok(outcome)
    }

    fn check_command(
        &self,
        image: &str,
        config: &ContainerConfig,
        check: &CommandCheck,
        label: String,
    ) -> Result<ProbeOutcome, HarnessError> {
        let deadline = self.readiness.deadline();
        let (entrypoint, command) = config.idle_process();
        let handle = self.launch(image, config, Some(entrypoint.as_slice()), &command, &[])?;
        self.wait_running(&handle, deadline)?;

        let output = self.exec(&handle, &check.argv())?;

        let mut outcome = ProbeOutcome::new(label);
        outcome.observed_exit_code = Some(output.exit_code);
        outcome.record(Assertion::equals("exit code", check.exit_code, output.exit_code));
        if let Some(needle) = &check.stdout_contains {
            outcome.record(Assertion::contains("stdout", needle, &output.stdout));
        }
        if let Some(needle) = &check.stderr_contains {
            outcome.record(Assertion::contains("stderr", needle, &output.stderr));
        }

        Ok(outcome)
    }

    /// Creates and starts a container. The returned handle removes it on drop.
    fn launch(
        &self,
        image: &str,
        config: &ContainerConfig,
        entrypoint: Option<&[String]>,
        command: &[String],
        ports: &[u16],
    ) -> Result<ContainerHandle<'_>, HarnessError> {
        let name = next_container_name();
        let spec = ContainerSpec {
            name: &name,
            image,
            env: &config.env,
            entrypoint,
            command,
            ports,
        };

        let startup = |err: anyhow::Error| HarnessError::Startup {
            image: image.to_string(),
            reason: format!("{err:#}"),
        };

        let id = self.runtime.create_container(&spec).map_err(startup)?;
        let handle = ContainerHandle {
            runtime: self.runtime.as_ref(),
            id,
        };

        self.runtime.start_container(&handle.id).map_err(startup)?;
        info!(image, container = %handle.id, "container started");

        Ok(handle)
    }

    fn wait_running(&self, handle: &ContainerHandle, deadline: Instant) -> Result<(), HarnessError> {
        loop {
            let state = self.current_state(handle)?;
            if state.is_running() {
                debug!(container = %handle.id, "container running");
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(self.timeout(handle, format!("last state {state:?}")));
            }

            thread::sleep(self.readiness.pause_before(deadline));
        }
    }

    /// Waits until the published port accepts connections, returning the host port.
    fn wait_port(
        &self,
        handle: &ContainerHandle,
        container_port: u16,
        deadline: Instant,
    ) -> Result<u16, HarnessError> {
        loop {
            self.current_state(handle)?;

            let last = match self.runtime.host_port(&handle.id, container_port)? {
                Some(host_port) if port_open(host_port, CONNECT_TIMEOUT) => {
                    debug!(container = %handle.id, container_port, host_port, "port accepting connections");
                    return Ok(host_port);
                }
                Some(host_port) => format!("host port {host_port} not accepting connections"),
                None => format!("port {container_port} not published"),
            };

            if Instant::now() >= deadline {
                return Err(self.timeout(handle, last));
            }

            thread::sleep(self.readiness.pause_before(deadline));
        }
    }

    /// GETs `path`, retrying connection-level errors until `deadline`.
    /// Any HTTP response ends the wait.
    fn fetch(
        &self,
        prober: &HttpProber,
        port: u16,
        path: &str,
        deadline: Instant,
    ) -> anyhow::Result<HttpResponse> {
        loop {
            match prober.get(port, path) {
                Ok(response) => return Ok(response),
                Err(err) if Instant::now() >= deadline => return Err(err),
                Err(err) => debug!(port, path, "no response yet: {err:#}"),
            }
            thread::sleep(self.readiness.pause_before(deadline));
        }
    }

    /// State of the container, failing once its process has exited.
    fn current_state(&self, handle: &ContainerHandle) -> Result<ContainerState, HarnessError> {
        let container = self.runtime.get_container(&handle.id)?;
        match container.state {
            ContainerState::Exited(exit_code) => Err(HarnessError::ContainerExited {
                container: handle.id.clone(),
                exit_code,
            }),
            ContainerState::NotFound => Err(HarnessError::Runtime(anyhow::anyhow!(
                "container {} disappeared",
                handle.id
            ))),
            state => Ok(state),
        }
    }

    /// Runs `argv` in the container. A non-zero exit only counts as the
    /// command's own result while the container is still running: docker
    /// reports a rejected exec with the same codes a command may return.
    fn exec(&self, handle: &ContainerHandle, argv: &[String]) -> Result<ExecOutput, HarnessError> {
        debug!(container = %handle.id, ?argv, "exec");
        let output = self
            .runtime
            .exec(&handle.id, argv)
            .map_err(|err| HarnessError::Exec {
                container: handle.id.clone(),
                reason: format!("{err:#}"),
            })?;

        if output.exit_code != 0 {
            self.current_state(handle)?;
        }
        Ok(output)
    }

    fn timeout(&self, handle: &ContainerHandle, reason: String) -> HarnessError {
        HarnessError::ReadinessTimeout {
            container: handle.id.clone(),
            timeout: self.readiness.timeout,
            reason,
        }
    }
}

/// Exclusive owner of one ephemeral container.
///
/// Dropping the handle removes the container, so every exit path of a probe
/// (return, `?`, panic) tears it down exactly once.
struct ContainerHandle<'r> {
    runtime: &'r dyn ContainerRuntime,
    id: String,
}

impl Drop for ContainerHandle<'_> {
    fn drop(&mut self) {
        match self.runtime.remove_container(&self.id) {
            Ok(()) => debug!(container = %self.id, "container removed"),
            Err(err) => warn!(container = %self.id, "failed to remove container: {err:#}"),
        }
    }
}

fn next_container_name() -> String {
    format!(
        "imagecheck-{}-{}",
        std::process::id(),
        NEXT_CONTAINER.fetch_add(1, Ordering::Relaxed)
    )
}
