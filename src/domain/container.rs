use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Entrypoint used when a probe needs a container that stays up for `exec`
/// and the configuration does not override the entrypoint itself.
pub const IDLE_ENTRYPOINT: &[&str] = &["sleep", "infinity"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Exited(i32),
    NotFound,
}

impl ContainerState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

#[derive(Debug, Clone)]
pub struct Container {
    pub id: String,
    pub state: ContainerState,
}

impl Container {
    pub fn new(id: String, state: ContainerState) -> Self {
        Self { id, state }
    }
}

/// Longest readiness timeout a policy honours; larger values are clamped.
pub const MAX_READINESS_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Bounded wait used while a container comes up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl ReadinessPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Instant at which a wait starting now gives up.
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.timeout.min(MAX_READINESS_TIMEOUT)
    }

    /// Time to sleep before the next poll, never past `deadline`.
    pub fn pause_before(&self, deadline: Instant) -> Duration {
        self.interval
            .min(deadline.saturating_duration_since(Instant::now()))
    }
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            interval: Duration::from_millis(500),
        }
    }
}

/// Everything the runtime needs to create one ephemeral container.
#[derive(Debug, Clone)]
pub struct ContainerSpec<'a> {
    pub name: &'a str,
    pub image: &'a str,
    pub env: &'a BTreeMap<String, String>,
    pub entrypoint: Option<&'a [String]>,
    pub command: &'a [String],
    /// Container ports published to a random loopback port on the host.
    pub ports: &'a [u16],
}

/// Settings injected into every container a probe starts.
///
/// Built once through the `with_*` methods and then only read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerConfig {
    pub env: BTreeMap<String, String>,
    pub entrypoint: Option<Vec<String>>,
    pub command: Vec<String>,
}

impl ContainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_entrypoint<I, S>(mut self, entrypoint: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entrypoint = Some(entrypoint.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Parses `KEY=VALUE` pairs, the form accepted on the command line.
    pub fn from_env_pairs<I, S>(pairs: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let Some((key, value)) = pair.split_once('=') else {
                anyhow::bail!("environment entry '{pair}' is not in KEY=VALUE form");
            };
            if key.trim().is_empty() {
                anyhow::bail!("environment entry '{pair}' has an empty name");
            }
            config = config.with_env(key, value);
        }
        Ok(config)
    }

    /// Entrypoint and command for a container that must stay alive for
    /// `exec`. Without an entrypoint override the image's process is replaced
    /// by [`IDLE_ENTRYPOINT`] and the configured command is dropped.
    pub fn idle_process(&self) -> (Vec<String>, Vec<String>) {
        match &self.entrypoint {
            Some(entrypoint) => (entrypoint.clone(), self.command.clone()),
            None => (
                IDLE_ENTRYPOINT.iter().map(|s| s.to_string()).collect(),
                Vec::new(),
            ),
        }
    }
}
