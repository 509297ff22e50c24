use crate::domain::{Container, ContainerRuntime, ContainerSpec, ContainerState, ExecOutput};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::ffi::OsStr;
use std::fmt;
use std::process::{Command, Output, Stdio};
use std::str::FromStr;
use tracing::debug;

/// Exit code podman uses for its own failures during `exec`.
const ENGINE_EXEC_ERROR: i32 = 125;

/// Prefix of the docker CLI's stderr when the daemon rejects a request. An
/// exec rejected this way exits 1, like many commands do.
const DAEMON_ERROR_PREFIX: &str = "Error response from daemon:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Docker,
    Podman,
}

impl Engine {
    pub fn binary(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

impl FromStr for Engine {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "podman" => Ok(Self::Podman),
            other => bail!("unknown container engine '{other}' (expected docker or podman)"),
        }
    }
}

/// [`ContainerRuntime`] backed by the `docker` or `podman` command line.
#[derive(Debug, Clone)]
pub struct EngineAdapter {
    engine: Engine,
}

impl EngineAdapter {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    /// First engine found on `PATH`, docker before podman.
    pub fn detect() -> Option<Self> {
        [Engine::Docker, Engine::Podman]
            .into_iter()
            .find(|engine| command_available(engine.binary()))
            .map(Self::new)
    }

    fn run<I, S>(&self, args: I, context: &str) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self.output(args, context)?;
        ensure_success(&output, self.engine, context)?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn output<I, S>(&self, args: I, context: &str) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<_> = args
            .into_iter()
            .map(|item| item.as_ref().to_os_string())
            .collect();
        debug!(engine = %self.engine, ?args, "{context}");
        Command::new(self.engine.binary())
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| context.to_string())
    }
}

impl ContainerRuntime for EngineAdapter {
    fn name(&self) -> &str {
        self.engine.binary()
    }

    fn is_available(&self) -> bool {
        command_available(self.engine.binary())
    }

    fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        let id = self.run(
            create_args(spec),
            &format!("creating container {} from {}", spec.name, spec.image),
        )?;

        if id.is_empty() {
            bail!("{} create returned no container id", self.engine);
        }

        Ok(id)
    }

    fn start_container(&self, id: &str) -> Result<()> {
        self.run(["start", id], &format!("starting container {id}"))
            .map(|_| ())
    }

    fn get_container(&self, id: &str) -> Result<Container> {
        let output = self.output(
            [
                "container",
                "inspect",
                id,
                "--format",
                "{{.State.Status}} {{.State.ExitCode}}",
            ],
            &format!("inspecting container {id}"),
        )?;

        if !output.status.success() {
            return Ok(Container::new(id.to_string(), ContainerState::NotFound));
        }

        let state = parse_state(&String::from_utf8_lossy(&output.stdout));
        Ok(Container::new(id.to_string(), state))
    }

    fn exec(&self, id: &str, argv: &[String]) -> Result<ExecOutput> {
        if argv.is_empty() {
            bail!("nothing to exec in container {id}");
        }

        let mut args: Vec<&str> = vec!["exec", id];
        args.extend(argv.iter().map(String::as_str));

        let output = self.output(args, &format!("exec in container {id}"))?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        match output.status.code() {
            Some(code) if !exec_rejected(code, &stderr) => {
                Ok(ExecOutput::new(code, stdout, stderr))
            }
            _ => bail!(
                "{} exec returned {:?}: {}",
                self.engine,
                output.status,
                stderr.trim()
            ),
        }
    }

    fn host_port(&self, id: &str, container_port: u16) -> Result<Option<u16>> {
        let port = format!("{container_port}/tcp");
        let output = self.output(
            ["port", id, port.as_str()],
            &format!("looking up published port {container_port} of {id}"),
        )?;

        if !output.status.success() {
            return Ok(None);
        }

        Ok(parse_port_mapping(&String::from_utf8_lossy(&output.stdout)))
    }

    fn remove_container(&self, id: &str) -> Result<()> {
        self.run(["rm", "-f", id], &format!("removing container {id}"))
            .map(|_| ())
    }
}

fn create_args(spec: &ContainerSpec) -> Vec<String> {
    let mut args: Vec<String> = vec!["create".into(), "--name".into(), spec.name.into()];

    for (key, value) in spec.env {
        args.push("-e".into());
        args.push(format!("{key}={value}"));
    }

    for port in spec.ports {
        args.push("-p".into());
        args.push(format!("127.0.0.1::{port}"));
    }

    // --entrypoint takes a single word; the rest of the override leads the command.
    let mut trailing: Vec<String> = Vec::new();
    if let Some(entrypoint) = spec.entrypoint {
        match entrypoint.split_first() {
            Some((first, rest)) => {
                args.push("--entrypoint".into());
                args.push(first.clone());
                trailing.extend(rest.iter().cloned());
            }
            None => args.push("--entrypoint=".into()),
        }
    }

    args.push(spec.image.into());
    args.extend(trailing);
    args.extend(spec.command.iter().cloned());
    args
}

/// Whether an exec exit status came from the engine rather than the command.
fn exec_rejected(code: i32, stderr: &str) -> bool {
    code == ENGINE_EXEC_ERROR || (code == 1 && stderr.trim_start().starts_with(DAEMON_ERROR_PREFIX))
}

fn parse_state(raw: &str) -> ContainerState {
    let mut parts = raw.split_whitespace();
    let status = parts.next().unwrap_or_default();
    let exit_code = parts.next().and_then(|c| c.parse().ok()).unwrap_or(0);

    match status {
        "running" => ContainerState::Running,
        "exited" | "stopped" | "dead" => ContainerState::Exited(exit_code),
        "" => ContainerState::NotFound,
        _ => ContainerState::Created,
    }
}

/// Picks the host port out of `port` output such as `127.0.0.1:49153`.
fn parse_port_mapping(raw: &str) -> Option<u16> {
    raw.lines()
        .filter_map(|line| line.trim().rsplit_once(':'))
        .find_map(|(_, port)| port.trim().parse().ok())
}

fn command_available(binary: &str) -> bool {
    Command::new(binary)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn ensure_success(output: &Output, engine: Engine, context: &str) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    bail!(
        "{engine} returned status {:?} ({context}): {}",
        output.status,
        stderr.trim()
    )
}
