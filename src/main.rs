use anyhow::Result;
use clap::{Parser, Subcommand};
use imagecheck::cli::{
    self, ExecCommand, FileCommand, HttpCommand, ResolveCommand, RunCommand,
};
use imagecheck::infra::Engine;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "imagecheck",
    version,
    about = "Verify that container images expose expected files, endpoints and commands"
)]
struct Cli {
    /// Container engine (docker or podman); default: first one on PATH
    #[arg(long, global = true, env = "IMAGECHECK_ENGINE")]
    engine: Option<Engine>,

    /// Log filter, e.g. info or imagecheck=debug
    #[arg(long, global = true, env = "IMAGECHECK_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run suite files against their images
    Run(RunCommand),
    /// Check that a path exists inside an image
    File(FileCommand),
    /// Check an HTTP endpoint served by an image
    Http(HttpCommand),
    /// Check a command run inside an image
    Exec(ExecCommand),
    /// Print the image a test run would use
    Resolve(ResolveCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log_level))
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match cli.command {
        Commands::Run(cmd) => cli::run::run(cmd, cli.engine)?,
        Commands::File(cmd) => cli::probe::run_file(cmd, cli.engine)?,
        Commands::Http(cmd) => cli::probe::run_http(cmd, cli.engine)?,
        Commands::Exec(cmd) => cli::probe::run_exec(cmd, cli.engine)?,
        Commands::Resolve(cmd) => cli::resolve::run(cmd)?,
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }

    Ok(())
}
