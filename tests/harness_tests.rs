mod common;

use common::{fast_harness, serve};
use imagecheck::domain::ExecOutput;
use imagecheck::test_support::MockRuntime;
use imagecheck::{CommandCheck, ContainerConfig, HarnessError, HttpCheck, Probe};
use std::sync::Arc;

const IMAGE: &str = "ghcr.io/example/app:rolling";

#[test]
fn test_file_present_passes() {
    let mock = Arc::new(MockRuntime::new());
    mock.add_file("/usr/local/bin/yq");

    let outcome = fast_harness(&mock)
        .check(IMAGE, &ContainerConfig::new(), &Probe::file("/usr/local/bin/yq"))
        .unwrap();

    assert!(outcome.passed());
    assert_eq!(outcome.label, "file /usr/local/bin/yq");
    assert_eq!(outcome.observed_exit_code, Some(0));
    assert_eq!(mock.live_containers(), 0);
}

#[test]
fn test_file_absent_is_probe_failure() {
    let mock = Arc::new(MockRuntime::new());

    let outcome = fast_harness(&mock)
        .check(IMAGE, &ContainerConfig::new(), &Probe::file("/usr/local/bin/yq"))
        .unwrap();

    assert!(!outcome.passed());
    let failure = outcome.failures().next().unwrap();
    assert_eq!(failure.expected, "present");
    assert_eq!(failure.actual, "absent");
    assert_eq!(mock.live_containers(), 0);
}

#[test]
fn test_env_is_passed_verbatim() {
    let mock = Arc::new(MockRuntime::new());
    mock.add_file("/config");
    let config = ContainerConfig::new()
        .with_env("TZ", "Europe/Lisbon")
        .with_env("EXTRA", "a=b c");

    fast_harness(&mock)
        .check(IMAGE, &config, &Probe::file("/config"))
        .unwrap();

    let spec = &mock.created_specs()[0];
    assert_eq!(spec.image, IMAGE);
    assert_eq!(spec.env.get("TZ").map(String::as_str), Some("Europe/Lisbon"));
    assert_eq!(spec.env.get("EXTRA").map(String::as_str), Some("a=b c"));
    assert!(spec.ports.is_empty());
}

#[test]
fn test_command_records_actual_exit_code() {
    let mock = Arc::new(MockRuntime::new());
    mock.set_exec_result("sh -c exit 3", ExecOutput::new(3, "", ""));

    let check = CommandCheck::new(Some("sh"), ["-c", "exit 3"]).expect_exit_code(3);
    let outcome = fast_harness(&mock)
        .check(IMAGE, &ContainerConfig::new(), &Probe::Command(check))
        .unwrap();

    assert!(outcome.passed());
    assert_eq!(outcome.observed_exit_code, Some(3));
}

#[test]
fn test_command_exit_code_mismatch() {
    let mock = Arc::new(MockRuntime::new());
    mock.set_exec_result("yq --version", ExecOutput::new(2, "", "bad flag"));

    let check = CommandCheck::new(Some("yq"), ["--version"]);
    let outcome = fast_harness(&mock)
        .check(IMAGE, &ContainerConfig::new(), &Probe::Command(check))
        .unwrap();

    assert!(!outcome.passed());
    let failure = outcome.failures().next().unwrap();
    assert_eq!(failure.check, "exit code");
    assert_eq!(failure.expected, "0");
    assert_eq!(failure.actual, "2");
    assert_eq!(outcome.observed_exit_code, Some(2));
}

#[test]
fn test_command_output_substrings_are_separate_assertions() {
    let mock = Arc::new(MockRuntime::new());
    mock.set_exec_result(
        "yq --version",
        ExecOutput::new(0, "yq (https://github.com/mikefarah/yq/) version v4.44.1\n", ""),
    );

    let check = CommandCheck::new(Some("yq"), ["--version"])
        .expect_stdout("version v4")
        .expect_stderr("warning");
    let outcome = fast_harness(&mock)
        .check(IMAGE, &ContainerConfig::new(), &Probe::Command(check))
        .unwrap();

    let labels: Vec<(&str, bool)> = outcome
        .assertions
        .iter()
        .map(|a| (a.label.as_str(), a.passed()))
        .collect();
    assert_eq!(
        labels,
        vec![("exit code", true), ("stdout", true), ("stderr", false)]
    );
}

#[test]
fn test_command_uses_configured_entrypoint_when_given() {
    let mock = Arc::new(MockRuntime::new());
    mock.set_exec_result("id -u", ExecOutput::new(0, "1000\n", ""));
    let config = ContainerConfig::new()
        .with_entrypoint(["/bin/sh", "-c"])
        .with_command(["sleep 600"]);

    let check = CommandCheck::new(None, ["id", "-u"]).expect_stdout("1000");
    fast_harness(&mock)
        .check(IMAGE, &config, &Probe::Command(check))
        .unwrap()
        .assert_passed();

    let spec = &mock.created_specs()[0];
    assert_eq!(
        spec.entrypoint,
        Some(vec!["/bin/sh".to_string(), "-c".to_string()])
    );
    assert_eq!(spec.command, vec!["sleep 600".to_string()]);
}

#[test]
fn test_http_expected_status_and_body_pass() {
    let mock = Arc::new(MockRuntime::new());
    mock.set_host_port(8080, serve(200, "OK", "{\"status\":\"ok\"}"));

    let check = HttpCheck::new(8080, "/healthz").expect_body("\"ok\"");
    let outcome = fast_harness(&mock)
        .check(IMAGE, &ContainerConfig::new(), &Probe::Http(check))
        .unwrap();

    assert!(outcome.passed(), "{outcome:?}");
    assert_eq!(outcome.observed_status, Some(200));
    assert_eq!(mock.live_containers(), 0);

    let spec = &mock.created_specs()[0];
    assert_eq!(spec.ports, vec![8080]);
    assert_eq!(spec.entrypoint, None);
}

#[test]
fn test_http_wrong_status_reports_expected_and_actual() {
    let mock = Arc::new(MockRuntime::new());
    mock.set_host_port(8080, serve(503, "Service Unavailable", "starting"));

    let check = HttpCheck::new(8080, "/healthz").expect_status(200);
    let outcome = fast_harness(&mock)
        .check(IMAGE, &ContainerConfig::new(), &Probe::Http(check))
        .unwrap();

    assert!(!outcome.passed());
    let failure = outcome.failures().next().unwrap();
    assert_eq!(failure.check, "status");
    assert_eq!(failure.expected, "200");
    assert_eq!(failure.actual, "503");
}

#[test]
fn test_http_missing_body_substring_fails_alone() {
    let mock = Arc::new(MockRuntime::new());
    mock.set_host_port(80, serve(200, "OK", "<h1>Welcome</h1>"));

    let check = HttpCheck::new(80, "/").expect_body("Dashboard");
    let outcome = fast_harness(&mock)
        .check(IMAGE, &ContainerConfig::new(), &Probe::Http(check))
        .unwrap();

    let status = &outcome.assertions[0];
    let body = &outcome.assertions[1];
    assert!(status.passed());
    assert!(!body.passed());
    assert_eq!(outcome.failures().count(), 1);
}

#[test]
fn test_startup_failure_is_fatal_and_leaves_nothing() {
    let mock = Arc::new(MockRuntime::new());
    mock.set_fail_on("start");

    let err = fast_harness(&mock)
        .check("does-not-exist:latest", &ContainerConfig::new(), &Probe::file("/x"))
        .unwrap_err();

    match err {
        HarnessError::Startup { image, .. } => assert_eq!(image, "does-not-exist:latest"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(mock.live_containers(), 0);
    assert_eq!(mock.count_commands("remove:"), 1);
}

#[test]
fn test_exec_failure_is_harness_error() {
    let mock = Arc::new(MockRuntime::new());
    mock.set_fail_on("exec");

    let err = fast_harness(&mock)
        .check(IMAGE, &ContainerConfig::new(), &Probe::file("/x"))
        .unwrap_err();

    assert!(matches!(err, HarnessError::Exec { .. }));
    assert_eq!(mock.live_containers(), 0);
}

#[test]
fn test_every_probe_removes_its_container_exactly_once() {
    let mock = Arc::new(MockRuntime::new());
    mock.add_file("/present");
    mock.set_host_port(8080, serve(200, "OK", "ok"));
    let harness = fast_harness(&mock);
    let config = ContainerConfig::new();

    let probes = [
        Probe::file("/present"),
        Probe::file("/absent"),
        Probe::Command(CommandCheck::new(Some("false"), Vec::<String>::new())),
        Probe::Http(HttpCheck::new(8080, "/")),
        Probe::Http(HttpCheck::new(8080, "/").expect_status(404)),
    ];

    for probe in &probes {
        let _ = harness.check(IMAGE, &config, probe);
        assert_eq!(mock.live_containers(), 0, "container left behind by {probe}");
    }

    assert_eq!(mock.count_commands("create:"), probes.len());
    assert_eq!(mock.count_commands("remove:"), probes.len());
}
