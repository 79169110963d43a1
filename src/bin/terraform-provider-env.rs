use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use terraform_provider_env::logging::{self, LogSettings};
use terraform_provider_env::{EnvProvider, ServeOptions, SourceEnv};

/// Terraform provider for environment variables. Started by Terraform, not by hand.
#[derive(Debug, Parser)]
#[command(name = "terraform-provider-env", version, about)]
struct Cli {
    /// Start standalone and print TF_REATTACH_PROVIDERS for a debugger session.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let env = SourceEnv::process();

    if let Err(err) = logging::try_init(LogSettings::from_env(&env)) {
        eprintln!("failed to initialise logging: {err}");
    }

    match run(cli, &env).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, env: &SourceEnv) -> anyhow::Result<()> {
    let options = ServeOptions::from_env(env, cli.debug)?;
    tracing::debug!(?options, "starting provider");

    terraform_provider_env::serve(EnvProvider::with_env(env.clone()), options)
        .await
        .context("provider server failed")
}
