use crate::domain::ImageResolver;
use crate::domain::image::DEFAULT_OVERRIDE_VAR;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct ResolveCommand {
    /// Image used when the override variable is unset or empty
    pub default: String,

    /// Override variable to consult
    #[arg(long, default_value = DEFAULT_OVERRIDE_VAR)]
    pub var: String,
}

impl ResolveCommand {
    fn image(&self) -> String {
        ImageResolver::new(self.var.as_str()).resolve(&self.default)
    }
}

pub fn run(cmd: ResolveCommand) -> Result<i32> {
    println!("{}", cmd.image());
    Ok(0)
}
