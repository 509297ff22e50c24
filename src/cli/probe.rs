use crate::cli::build_runtime;
use crate::domain::{
    CommandCheck, ContainerConfig, ContainerRuntime, FileCheck, HttpCheck, Probe, Suite, TestCase,
};
use crate::infra::Engine;
use crate::infra::config::RuntimeConfig;
use crate::services::{ProbeHarness, SuiteRunner};
use anyhow::{Result, bail};
use clap::Args;
use std::sync::Arc;

/// Options shared by the single-probe commands.
#[derive(Args, Debug)]
pub struct ProbeTarget {
    /// Image to start
    pub image: String,

    /// Environment variable for the container, KEY=VALUE (repeatable)
    #[arg(short = 'e', long = "env")]
    pub env: Vec<String>,

    /// Readiness timeout, e.g. 90s or 2m
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct FileCommand {
    #[command(flatten)]
    pub target: ProbeTarget,

    /// Absolute path expected inside the container
    pub path: String,
}

#[derive(Args, Debug)]
pub struct HttpCommand {
    #[command(flatten)]
    pub target: ProbeTarget,

    /// Container port the server listens on
    #[arg(long)]
    pub port: u16,

    #[arg(long, default_value = "/")]
    pub path: String,

    /// Expected status code
    #[arg(long, default_value_t = 200)]
    pub status: u16,

    /// Substring the response body must contain
    #[arg(long)]
    pub body_contains: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExecCommand {
    #[command(flatten)]
    pub target: ProbeTarget,

    /// First word of the command run inside the container
    #[arg(long)]
    pub entrypoint: Option<String>,

    /// Expected exit code
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub exit_code: i32,

    #[arg(long)]
    pub stdout_contains: Option<String>,

    #[arg(long)]
    pub stderr_contains: Option<String>,

    /// Arguments, after `--`
    #[arg(last = true)]
    pub args: Vec<String>,
}

impl FileCommand {
    fn probe(&self) -> Probe {
        Probe::File(FileCheck::new(self.path.as_str()))
    }
}

impl HttpCommand {
    fn probe(&self) -> Probe {
        let mut check = HttpCheck::new(self.port, self.path.as_str()).expect_status(self.status);
        if let Some(needle) = &self.body_contains {
            check = check.expect_body(needle.as_str());
        }
        Probe::Http(check)
    }
}

impl ExecCommand {
    fn probe(&self) -> Result<Probe> {
        let mut check = CommandCheck::new(self.entrypoint.as_deref(), self.args.iter().cloned())
            .expect_exit_code(self.exit_code);
        if let Some(needle) = &self.stdout_contains {
            check = check.expect_stdout(needle.as_str());
        }
        if let Some(needle) = &self.stderr_contains {
            check = check.expect_stderr(needle.as_str());
        }
        if check.argv().is_empty() {
            bail!("nothing to run: pass --entrypoint or arguments after --");
        }
        Ok(Probe::Command(check))
    }
}

pub fn run_file(cmd: FileCommand, engine: Option<Engine>) -> Result<i32> {
    let probe = cmd.probe();
    run_single(&cmd.target, probe, engine, build_runtime)
}

pub fn run_http(cmd: HttpCommand, engine: Option<Engine>) -> Result<i32> {
    let probe = cmd.probe();
    run_single(&cmd.target, probe, engine, build_runtime)
}

pub fn run_exec(cmd: ExecCommand, engine: Option<Engine>) -> Result<i32> {
    let probe = cmd.probe()?;
    run_single(&cmd.target, probe, engine, build_runtime)
}

fn run_single<F>(target: &ProbeTarget, probe: Probe, engine: Option<Engine>, build: F) -> Result<i32>
where
    F: Fn(Option<Engine>) -> Result<Arc<dyn ContainerRuntime>>,
{
    let config = ContainerConfig::from_env_pairs(&target.env)?;
    let runtime_config = RuntimeConfig {
        engine,
        timeout: target.timeout.clone(),
        interval: None,
    };
    let readiness = runtime_config.readiness()?;
    let harness = ProbeHarness::new(build(engine)?, readiness);

    let case_name = probe.label();
    let suite = Suite::new(&target.image).with_case(TestCase::new(case_name, config).with_probe(probe));

    let report = SuiteRunner::new(&harness).run(&suite, &target.image);
    println!("{report}");
    Ok(report.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockRuntime;

    fn target(env: &[&str], timeout: Option<&str>) -> ProbeTarget {
        ProbeTarget {
            image: "ghcr.io/example/app:rolling".into(),
            env: env.iter().map(|e| e.to_string()).collect(),
            timeout: timeout.map(str::to_string),
        }
    }

    fn exec_command(entrypoint: Option<&str>, args: &[&str]) -> ExecCommand {
        ExecCommand {
            target: target(&[], None),
            entrypoint: entrypoint.map(str::to_string),
            exit_code: 0,
            stdout_contains: Some("jq-1.7".into()),
            stderr_contains: None,
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn exec_without_argv_is_rejected() {
        assert!(exec_command(None, &[]).probe().is_err());
        assert!(run_exec(exec_command(None, &[]), None).is_err());
    }

    #[test]
    fn exec_builds_command_check() {
        let probe = exec_command(Some("jq"), &["--version"]).probe().unwrap();
        assert_eq!(
            probe,
            Probe::Command(CommandCheck::new(Some("jq"), ["--version"]).expect_stdout("jq-1.7"))
        );
    }

    #[test]
    fn http_builds_http_check() {
        let cmd = HttpCommand {
            target: target(&[], None),
            port: 8080,
            path: "/healthz".into(),
            status: 204,
            body_contains: None,
        };
        assert_eq!(
            cmd.probe(),
            Probe::Http(HttpCheck::new(8080, "/healthz").expect_status(204))
        );
    }

    #[test]
    fn single_probe_exit_codes_follow_report() {
        let mock = Arc::new(MockRuntime::new());
        mock.add_file("/usr/local/bin/yq");
        let build = |_: Option<Engine>| -> Result<Arc<dyn ContainerRuntime>> { Ok(mock.clone()) };
        let target = target(&["TZ=UTC"], Some("1s"));

        let present = Probe::file("/usr/local/bin/yq");
        assert_eq!(run_single(&target, present, None, build).unwrap(), 0);
        let absent = Probe::file("/usr/local/bin/jq");
        assert_eq!(run_single(&target, absent, None, build).unwrap(), 1);

        let specs = mock.created_specs();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].env.get("TZ").map(String::as_str), Some("UTC"));
        assert_eq!(mock.live_containers(), 0);
    }

    #[test]
    fn bad_flags_fail_before_any_container() {
        let mock = Arc::new(MockRuntime::new());
        let build = |_: Option<Engine>| -> Result<Arc<dyn ContainerRuntime>> { Ok(mock.clone()) };

        let malformed_env = target(&["NOVALUE"], None);
        assert!(run_single(&malformed_env, Probe::file("/x"), None, build).is_err());
        let huge_timeout = target(&[], Some("999999999999999999m"));
        assert!(run_single(&huge_timeout, Probe::file("/x"), None, build).is_err());
        assert_eq!(mock.count_commands("create:"), 0);
    }
}
