use crate::domain::{
    ContainerConfig, ImageResolver, MAX_READINESS_TIMEOUT, Probe, ReadinessPolicy, Suite, TestCase,
};
use crate::infra::engine_adapter::Engine;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    pub default: Option<String>,
    pub override_var: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    pub engine: Option<Engine>,
    pub timeout: Option<String>,
    pub interval: Option<String>,
}

impl RuntimeConfig {
    /// Merges another RuntimeConfig into self.
    /// Values from `other` overwrite values in `self` if present.
    pub fn merge(&mut self, other: RuntimeConfig) {
        if let Some(engine) = other.engine {
            self.engine = Some(engine);
        }
        if let Some(timeout) = other.timeout {
            self.timeout = Some(timeout);
        }
        if let Some(interval) = other.interval {
            self.interval = Some(interval);
        }
    }

    pub fn readiness(&self) -> Result<ReadinessPolicy> {
        let mut policy = ReadinessPolicy::default();
        if let Some(timeout) = &self.timeout {
            policy.timeout = parse_duration(timeout).context("runtime.timeout")?;
        }
        if policy.timeout > MAX_READINESS_TIMEOUT {
            bail!(
                "runtime.timeout {:?} exceeds the {}h limit",
                policy.timeout,
                MAX_READINESS_TIMEOUT.as_secs() / 3600
            );
        }
        if let Some(interval) = &self.interval {
            policy.interval = parse_duration(interval).context("runtime.interval")?;
        }
        if policy.interval.is_zero() {
            bail!("runtime.interval must be greater than zero");
        }
        Ok(policy)
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct CaseConfig {
    pub name: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    pub entrypoint: Option<Vec<String>>,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default, rename = "probe")]
    pub probes: Vec<Probe>,
}

impl CaseConfig {
    fn container(&self) -> ContainerConfig {
        ContainerConfig {
            env: self.env.clone(),
            entrypoint: self.entrypoint.clone(),
            command: self.command.clone(),
        }
    }
}

/// On-disk form of a suite, TOML or YAML.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct SuiteFile {
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default, rename = "case")]
    pub cases: Vec<CaseConfig>,
}

impl SuiteFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yml") | Some("yaml")
        );

        if is_yaml {
            serde_yml::from_str(content).with_context(|| format!("parsing {:?}", path))
        } else {
            toml::from_str(content).with_context(|| format!("parsing {:?}", path))
        }
    }

    /// Validates the file and converts it into a runnable [`Suite`].
    pub fn into_suite(self, path: &Path) -> Result<Suite> {
        let default_image = match self.image.default {
            Some(image) if !image.trim().is_empty() => image.trim().to_string(),
            _ => bail!("{:?} has no image.default", path),
        };

        let resolver = match self.image.override_var {
            Some(var) if var.trim().is_empty() => bail!("{:?}: image.override_var is empty", path),
            Some(var) => ImageResolver::new(var.trim()),
            None => ImageResolver::default(),
        };

        let mut names = HashSet::new();
        let mut cases = Vec::with_capacity(self.cases.len());

        for (idx, case) in self.cases.into_iter().enumerate() {
            if case.name.trim().is_empty() {
                bail!("case {} in {:?} has no name", idx + 1, path);
            }
            if !names.insert(case.name.clone()) {
                bail!("case {} in {:?} repeats the name '{}'", idx + 1, path, case.name);
            }
            if case.probes.is_empty() {
                bail!("case '{}' in {:?} has no probes", case.name, path);
            }
            for probe in &case.probes {
                validate_probe(probe).with_context(|| format!("case '{}' in {:?}", case.name, path))?;
            }

            cases.push(TestCase {
                config: case.container(),
                name: case.name,
                probes: case.probes,
            });
        }

        if cases.is_empty() {
            bail!("{:?} declares no cases", path);
        }

        Ok(Suite {
            default_image,
            resolver,
            cases,
        })
    }
}

fn validate_probe(probe: &Probe) -> Result<()> {
    match probe {
        Probe::File(check) => {
            if !check.path.starts_with('/') {
                bail!("file path '{}' is not absolute", check.path);
            }
        }
        Probe::Http(check) => {
            if check.port == 0 {
                bail!("http probe on '{}' needs a non-zero port", check.path);
            }
            if !check.path.starts_with('/') {
                bail!("http path '{}' must start with '/'", check.path);
            }
            if !(100..=599).contains(&check.status) {
                bail!("http status {} is not a valid status code", check.status);
            }
        }
        Probe::Command(check) => {
            if check.argv().is_empty() {
                bail!("command probe needs an entrypoint or at least one argument");
            }
        }
    }
    Ok(())
}

/// Loads and validates a suite, returning its runtime section alongside.
pub fn load_suite(path: &Path) -> Result<(Suite, RuntimeConfig)> {
    let file = SuiteFile::load(path)?;
    let runtime = file.runtime.clone();
    let suite = file.into_suite(path)?;
    Ok((suite, runtime))
}

/// Expands `~` and `$VAR` in a path given on the command line.
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded =
        shellexpand::full(raw).with_context(|| format!("expanding path '{raw}'"))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if let Some(stripped) = s.strip_suffix("ms") {
        let millis: u64 = stripped.trim().parse()?;
        Ok(Duration::from_millis(millis))
    } else if let Some(stripped) = s.strip_suffix('s') {
        let secs: u64 = stripped.trim().parse()?;
        Ok(Duration::from_secs(secs))
    } else if let Some(stripped) = s.strip_suffix('m') {
        let mins: u64 = stripped.trim().parse()?;
        match mins.checked_mul(60) {
            Some(secs) => Ok(Duration::from_secs(secs)),
            None => bail!("duration '{s}' is too large"),
        }
    } else {
        bail!("invalid duration '{s}' (use ms, s or m)")
    }
}
