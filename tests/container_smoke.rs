//! Runs against a real docker or podman engine.
//!
//! ```sh
//! cargo test --test container_smoke -- --ignored
//! ```

use imagecheck::checks;
use imagecheck::{CommandCheck, ContainerConfig, Probe, resolve_test_image};

fn image() -> String {
    resolve_test_image("docker.io/library/alpine:3.20")
}

#[test]
#[ignore = "requires a container engine"]
fn alpine_has_busybox() {
    checks::file_exists(&image(), "/bin/busybox", None);
}

#[test]
#[ignore = "requires a container engine"]
fn alpine_reports_its_release() {
    let harness = checks::default_harness().unwrap();
    let config = ContainerConfig::new().with_env("GREETING", "hello");
    let check = CommandCheck::new(Some("sh"), ["-c", "echo $GREETING-$(cat /etc/alpine-release)"])
        .expect_stdout("hello-3.20");

    let outcome = checks::check_with(&harness, &image(), Some(&config), &Probe::Command(check));
    assert_eq!(outcome.observed_exit_code, Some(0));
}

#[test]
#[ignore = "requires a container engine"]
#[should_panic(expected = "expected present, got absent")]
fn missing_file_fails() {
    checks::file_exists(&image(), "/usr/local/bin/definitely-not-here", None);
}
