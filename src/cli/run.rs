use crate::cli::build_runtime;
use crate::domain::{ContainerRuntime, Suite};
use crate::infra::Engine;
use crate::infra::config::{RuntimeConfig, expand_path, load_suite};
use crate::services::{ProbeHarness, SuiteRunner};
use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug)]
pub struct RunCommand {
    /// Suite files (TOML, or YAML with a .yml/.yaml extension)
    #[arg(required = true)]
    pub suites: Vec<String>,

    /// Image to test, ahead of the override variable and the suite default
    #[arg(long)]
    pub image: Option<String>,

    /// Readiness timeout, e.g. 90s or 2m
    #[arg(long)]
    pub timeout: Option<String>,

    /// Readiness poll interval, e.g. 250ms
    #[arg(long)]
    pub interval: Option<String>,
}

impl RunCommand {
    /// Runtime settings of one suite with the command line applied on top.
    fn settings(&self, engine: Option<Engine>, mut suite_runtime: RuntimeConfig) -> RuntimeConfig {
        suite_runtime.merge(RuntimeConfig {
            engine,
            timeout: self.timeout.clone(),
            interval: self.interval.clone(),
        });
        suite_runtime
    }

    fn image_for(&self, suite: &Suite) -> String {
        self.image.clone().unwrap_or_else(|| suite.image())
    }
}

/// Runs every suite and returns the process exit code.
pub fn run(cmd: RunCommand, engine: Option<Engine>) -> Result<i32> {
    run_with(&cmd, engine, build_runtime)
}

fn run_with<F>(cmd: &RunCommand, engine: Option<Engine>, build: F) -> Result<i32>
where
    F: Fn(Option<Engine>) -> Result<Arc<dyn ContainerRuntime>>,
{
    let mut exit_code = 0;

    for raw in &cmd.suites {
        let path = expand_path(raw)?;
        let (suite, suite_runtime) = load_suite(&path)?;
        let settings = cmd.settings(engine, suite_runtime);

        let harness = ProbeHarness::new(build(settings.engine)?, settings.readiness()?);
        let image = cmd.image_for(&suite);
        info!(
            suite = %path.display(),
            image,
            timeout = ?harness.readiness().timeout,
            "loaded suite"
        );

        let report = SuiteRunner::new(&harness).run(&suite, &image);
        println!("{report}");
        exit_code = exit_code.max(report.exit_code());
    }

    Ok(exit_code)
}
