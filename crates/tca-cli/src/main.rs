//! `tca` binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tca_cli::commands::{AuditCommand, ConfigCommand, PolicyCommand, RunCommand};
use tca_cli::{Cli, Commands, OutputFormat};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_json) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("tca=info".parse()?);
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json().with_writer(io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(io::stderr)).init();
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match &cli.command {
        Commands::Run(args) => RunCommand::new(args).execute(&mut stdout, &format).await?,
        Commands::ValidateConfig { config } => {
            ConfigCommand::new(config).validate(&mut stdout, &format)?;
        }
        Commands::CheckPolicy { policy } => {
            PolicyCommand::new(policy).execute(&mut stdout, &format)?;
        }
        Commands::Audit(args) => AuditCommand::new(args).execute(&mut stdout, &format)?,
        Commands::InitConfig { output } => ConfigCommand::new(output).init(&mut stdout, &format)?,
    }

    Ok(())
}
