use crate::domain::{Container, ContainerRuntime, ContainerSpec, ContainerState, ExecOutput};
use anyhow::{Result, bail};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Owned copy of a [`ContainerSpec`] seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockContainerSpec {
    pub name: String,
    pub image: String,
    pub env: BTreeMap<String, String>,
    pub entrypoint: Option<Vec<String>>,
    pub command: Vec<String>,
    pub ports: Vec<u16>,
}

#[derive(Debug, Clone)]
pub struct MockContainer {
    pub id: String,
    pub state: ContainerState,
    pub spec: MockContainerSpec,
}

/// In-memory [`ContainerRuntime`] that records every call.
///
/// Files listed with [`MockRuntime::add_file`] make `test -e` succeed; other
/// commands answer with whatever [`MockRuntime::set_exec_result`] scripted,
/// or exit 127.
#[derive(Debug)]
pub struct MockRuntime {
    containers: RwLock<HashMap<String, MockContainer>>,
    created: RwLock<Vec<MockContainerSpec>>,
    commands: RwLock<Vec<String>>,
    files: RwLock<HashSet<String>>,
    exec_results: RwLock<HashMap<String, ExecOutput>>,
    host_ports: RwLock<HashMap<u16, u16>>,
    fail_on: RwLock<Option<String>>,
    state_after_start: RwLock<ContainerState>,
    starting_polls: AtomicUsize,
    exit_after_exec: RwLock<Option<i32>>,
    available: AtomicBool,
    next_id: AtomicU64,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            containers: RwLock::new(HashMap::new()),
            created: RwLock::new(Vec::new()),
            commands: RwLock::new(Vec::new()),
            files: RwLock::new(HashSet::new()),
            exec_results: RwLock::new(HashMap::new()),
            host_ports: RwLock::new(HashMap::new()),
            fail_on: RwLock::new(None),
            state_after_start: RwLock::new(ContainerState::Running),
            starting_polls: AtomicUsize::new(0),
            exit_after_exec: RwLock::new(None),
            available: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
        }
    }

    /// Makes `operation` (`create`, `start`, `inspect`, `exec`, `port`,
    /// `remove`) fail from now on.
    pub fn set_fail_on(&self, operation: &str) {
        *self.fail_on.write().unwrap() = Some(operation.to_string());
    }

    pub fn set_unavailable(&self) {
        self.available.store(false, Ordering::SeqCst);
    }

    /// State containers report after `start`, e.g. `Created` for a container
    /// that never comes up or `Exited(1)` for one that crashes.
    pub fn set_state_after_start(&self, state: ContainerState) {
        *self.state_after_start.write().unwrap() = state;
    }

    /// Number of inspections that still report `Created` for a started
    /// container before it shows its state after start.
    pub fn set_starting_polls(&self, polls: usize) {
        self.starting_polls.store(polls, Ordering::SeqCst);
    }

    /// Makes every exec end its container with `exit_code`, the way a
    /// container whose main process dies mid-probe looks to the engine.
    pub fn set_exit_after_exec(&self, exit_code: i32) {
        *self.exit_after_exec.write().unwrap() = Some(exit_code);
    }

    pub fn add_file(&self, path: &str) {
        self.files.write().unwrap().insert(path.to_string());
    }

    /// Scripts the result of an exec whose argv joined by spaces is `command`.
    pub fn set_exec_result(&self, command: &str, output: ExecOutput) {
        self.exec_results
            .write()
            .unwrap()
            .insert(command.to_string(), output);
    }

    /// Publishes `container_port` of every container on `host_port`.
    pub fn set_host_port(&self, container_port: u16, host_port: u16) {
        self.host_ports
            .write()
            .unwrap()
            .insert(container_port, host_port);
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.commands.read().unwrap().clone()
    }

    pub fn created_specs(&self) -> Vec<MockContainerSpec> {
        self.created.read().unwrap().clone()
    }

    /// Containers created and not yet removed.
    pub fn live_containers(&self) -> usize {
        self.containers.read().unwrap().len()
    }

    pub fn count_commands(&self, prefix: &str) -> usize {
        self.commands
            .read()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record_command(&self, cmd: &str) {
        self.commands.write().unwrap().push(cmd.to_string());
    }

    fn check_fail(&self, operation: &str) -> Result<()> {
        if let Some(ref fail_on) = *self.fail_on.read().unwrap() {
            if fail_on == operation {
                bail!("Mock failure on: {}", operation);
            }
        }
        Ok(())
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerRuntime for MockRuntime {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        self.record_command(&format!("create:{}", spec.image));
        self.check_fail("create")?;

        let id = format!("mock-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let spec = MockContainerSpec {
            name: spec.name.to_string(),
            image: spec.image.to_string(),
            env: spec.env.clone(),
            entrypoint: spec.entrypoint.map(|e| e.to_vec()),
            command: spec.command.to_vec(),
            ports: spec.ports.to_vec(),
        };

        self.created.write().unwrap().push(spec.clone());
        self.containers.write().unwrap().insert(
            id.clone(),
            MockContainer {
                id: id.clone(),
                state: ContainerState::Created,
                spec,
            },
        );
        Ok(id)
    }

    fn start_container(&self, id: &str) -> Result<()> {
        self.record_command(&format!("start:{}", id));
        self.check_fail("start")?;

        let state = self.state_after_start.read().unwrap().clone();
        match self.containers.write().unwrap().get_mut(id) {
            Some(container) => container.state = state,
            None => bail!("no such container: {id}"),
        }
        Ok(())
    }

    fn get_container(&self, id: &str) -> Result<Container> {
        self.record_command(&format!("inspect:{}", id));
        self.check_fail("inspect")?;

        let state = self
            .containers
            .read()
            .unwrap()
            .get(id)
            .map(|c| c.state.clone())
            .unwrap_or(ContainerState::NotFound);

        let starting = state.is_running()
            && self
                .starting_polls
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
        if starting {
            return Ok(Container::new(id.to_string(), ContainerState::Created));
        }

        Ok(Container::new(id.to_string(), state))
    }

    fn exec(&self, id: &str, argv: &[String]) -> Result<ExecOutput> {
        let joined = argv.join(" ");
        self.record_command(&format!("exec:{}:{}", id, joined));
        self.check_fail("exec")?;

        if let Some(exit_code) = *self.exit_after_exec.read().unwrap() {
            if let Some(container) = self.containers.write().unwrap().get_mut(id) {
                container.state = ContainerState::Exited(exit_code);
            }
            return Ok(ExecOutput::new(
                1,
                "",
                format!("Error response from daemon: container {id} is not running"),
            ));
        }

        if let Some(output) = self.exec_results.read().unwrap().get(&joined) {
            return Ok(output.clone());
        }

        if let [test, flag, path] = argv {
            if test == "test" && flag == "-e" {
                let exists = self.files.read().unwrap().contains(path);
                return Ok(ExecOutput::new(if exists { 0 } else { 1 }, "", ""));
            }
        }

        Ok(ExecOutput::new(
            127,
            "",
            format!("{}: command not found", argv.first().map(String::as_str).unwrap_or("")),
        ))
    }

    fn host_port(&self, id: &str, container_port: u16) -> Result<Option<u16>> {
        self.record_command(&format!("port:{}:{}", id, container_port));
        self.check_fail("port")?;

        Ok(self.host_ports.read().unwrap().get(&container_port).copied())
    }

    fn remove_container(&self, id: &str) -> Result<()> {
        self.record_command(&format!("remove:{}", id));
        self.check_fail("remove")?;

        self.containers.write().unwrap().remove(id);
        Ok(())
    }
}
