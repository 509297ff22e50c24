mod common;

use anyhow::Result;
use common::{fast_harness, serve};
use imagecheck::SuiteRunner;
use imagecheck::domain::ContainerState;
use imagecheck::infra::config::load_suite;
use imagecheck::test_support::MockRuntime;
use std::fs;
use std::sync::Arc;

#[test]
fn test_workflow_suite_file_to_report() -> Result<()> {
    // 1. Suite file on disk
    let temp_dir = tempfile::tempdir()?;
    let port = serve(200, "OK", "ok");
    let suite_path = temp_dir.path().join("container-test.toml");
    fs::write(
        &suite_path,
        r#"
[image]
default = "ghcr.io/example/actions-runner:rolling"
override_var = "IMAGECHECK_WORKFLOW_TEST_IMAGE"

[runtime]
timeout = "1s"
interval = "10ms"

[[case]]
name = "tools"

[[case.probe]]
kind = "file"
path = "/usr/local/bin/yq"

[[case.probe]]
kind = "file"
path = "/usr/local/bin/jq"

[[case]]
name = "web"
env = { LISTEN_PORT = "8080" }

[[case.probe]]
kind = "http"
port = 8080
path = "/healthz"
body_contains = "ok"
"#,
    )?;

    // 2. Mock runtime: yq present, jq missing, web answering
    let mock = Arc::new(MockRuntime::new());
    mock.add_file("/usr/local/bin/yq");
    mock.set_host_port(8080, port);

    // 3. Load and run
    let (suite, runtime) = load_suite(&suite_path)?;
    assert_eq!(runtime.timeout.as_deref(), Some("1s"));
    let image = suite.image();
    assert_eq!(image, "ghcr.io/example/actions-runner:rolling");

    let report = SuiteRunner::new(&fast_harness(&mock)).run(&suite, &image);

    // 4. The missing file fails only its own assertion; the web case still runs
    assert!(!report.passed());
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.cases.len(), 2);
    assert_eq!(report.cases[0].outcomes.len(), 2);
    assert!(report.cases[0].outcomes[0].passed());
    assert!(!report.cases[0].outcomes[1].passed());
    assert!(report.cases[1].passed());
    assert_eq!(report.failure_count(), 1);

    // 5. One container per probe, all gone
    assert_eq!(mock.count_commands("create:"), 3);
    assert_eq!(mock.live_containers(), 0);
    let web_spec = &mock.created_specs()[2];
    assert_eq!(
        web_spec.env.get("LISTEN_PORT").map(String::as_str),
        Some("8080")
    );

    Ok(())
}

#[test]
fn test_workflow_harness_error_aborts_only_its_case() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let suite_path = temp_dir.path().join("container-test.yaml");
    fs::write(
        &suite_path,
        r#"
image:
  default: ghcr.io/example/app:rolling
case:
  - name: broken
    probe:
      - kind: file
        path: /first
      - kind: file
        path: /second
  - name: after
    probe:
      - kind: file
        path: /first
"#,
    )?;

    let mock = Arc::new(MockRuntime::new());
    mock.add_file("/first");
    mock.set_state_after_start(ContainerState::Exited(2));

    let (suite, _) = load_suite(&suite_path)?;
    let report = SuiteRunner::new(&fast_harness(&mock)).run(&suite, &suite.image());

    let broken = &report.cases[0];
    assert!(broken.outcomes.is_empty());
    let fatal = broken.fatal.as_deref().unwrap_or_default();
    assert!(fatal.starts_with("file /first:"), "{fatal}");
    assert!(fatal.contains("exited with code 2"), "{fatal}");

    // The second probe of the broken case never ran, the next case did.
    assert!(report.cases[1].fatal.is_some());
    assert_eq!(mock.count_commands("create:"), 2);
    assert_eq!(mock.live_containers(), 0);

    let rendered = report.to_string();
    assert!(rendered.contains("case broken"));
    assert!(rendered.contains("ERROR   file /first:"));
    assert!(rendered.ends_with("result: FAILED. 0 assertions, 2 failures"));

    Ok(())
}

#[test]
fn test_workflow_override_variable_wins() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let suite_path = temp_dir.path().join("suite.toml");
    fs::write(
        &suite_path,
        r#"
[image]
default = "ghcr.io/example/app:rolling"
override_var = "IMAGECHECK_OVERRIDE_WORKFLOW_TEST"

[[case]]
name = "files"
[[case.probe]]
kind = "file"
path = "/app/script.sh"
"#,
    )?;

    let (suite, _) = load_suite(&suite_path)?;
    unsafe {
        std::env::set_var("IMAGECHECK_OVERRIDE_WORKFLOW_TEST", "localhost/app:pr-7");
    }
    assert_eq!(suite.image(), "localhost/app:pr-7");
    unsafe {
        std::env::remove_var("IMAGECHECK_OVERRIDE_WORKFLOW_TEST");
    }
    assert_eq!(suite.image(), "ghcr.io/example/app:rolling");

    Ok(())
}
