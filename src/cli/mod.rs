pub mod probe;
pub mod resolve;
pub mod run;

pub use probe::{ExecCommand, FileCommand, HttpCommand};
pub use resolve::ResolveCommand;
pub use run::RunCommand;

use crate::domain::ContainerRuntime;
use crate::infra::{Engine, EngineAdapter};
use anyhow::{Result, bail};
use std::sync::Arc;

/// Engine adapter for `engine`, or the first engine found on `PATH`.
pub fn build_runtime(engine: Option<Engine>) -> Result<Arc<dyn ContainerRuntime>> {
    let adapter = match engine {
        Some(engine) => EngineAdapter::new(engine),
        None => match EngineAdapter::detect() {
            Some(adapter) => adapter,
            None => bail!("neither docker nor podman was found on PATH"),
        },
    };
    Ok(Arc::new(adapter))
}
