//! Assertions for ordinary `#[test]` functions.
//!
//! ```no_run
//! use imagecheck::checks;
//! use imagecheck::domain::resolve_test_image;
//!
//! #[test]
//! fn yq_is_installed() {
//!     let image = resolve_test_image("ghcr.io/example/actions-runner:rolling");
//!     checks::file_exists(&image, "/usr/local/bin/yq", None);
//! }
//! ```
//!
//! Harness errors panic right away; failed expectations panic after every
//! sub-check of the probe has been evaluated, listing each mismatch.

use crate::domain::{CommandCheck, ContainerConfig, HttpCheck, Probe, ReadinessPolicy};
use crate::error::HarnessError;
use crate::infra::{Engine, EngineAdapter};
use crate::services::{ProbeHarness, ProbeOutcome};
use std::env;
use std::sync::Arc;

/// Variable selecting the engine (`docker` or `podman`).
pub const ENGINE_VAR: &str = "IMAGECHECK_ENGINE";

/// Harness on the engine named by `IMAGECHECK_ENGINE`, or the first one on `PATH`.
pub fn default_harness() -> Result<ProbeHarness, HarnessError> {
    let adapter = match env::var(ENGINE_VAR) {
        Ok(name) if !name.trim().is_empty() => EngineAdapter::new(name.parse::<Engine>()?),
        _ => EngineAdapter::detect()
            .ok_or_else(|| HarnessError::RuntimeUnavailable("docker or podman".to_string()))?,
    };
    Ok(ProbeHarness::new(Arc::new(adapter), ReadinessPolicy::default()))
}

/// Runs `probe` and panics unless every sub-check passed.
pub fn check_with(
    harness: &ProbeHarness,
    image: &str,
    config: Option<&ContainerConfig>,
    probe: &Probe,
) -> ProbeOutcome {
    let default_config = ContainerConfig::default();
    let config = config.unwrap_or(&default_config);

    let outcome = match harness.check(image, config, probe) {
        Ok(outcome) => outcome,
        Err(err) => panic!("{probe} against {image}: {err}"),
    };
    outcome.assert_passed();
    outcome
}

pub fn file_exists(image: &str, path: &str, config: Option<&ContainerConfig>) {
    check_with(&harness_or_panic(), image, config, &Probe::file(path));
}

pub fn http_responds(image: &str, check: HttpCheck, config: Option<&ContainerConfig>) {
    check_with(&harness_or_panic(), image, config, &Probe::Http(check));
}

/// Execs `entrypoint args...` and expects exit code 0.
pub fn command_succeeds(
    image: &str,
    entrypoint: &str,
    args: &[&str],
    config: Option<&ContainerConfig>,
) {
    let check = CommandCheck::new(Some(entrypoint), args.iter().copied());
    check_with(&harness_or_panic(), image, config, &Probe::Command(check));
}

fn harness_or_panic() -> ProbeHarness {
    match default_harness() {
        Ok(harness) => harness,
        Err(err) => panic!("no container engine: {err}"),
    }
}
