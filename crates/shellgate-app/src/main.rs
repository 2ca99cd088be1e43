mod cli;

use std::process::ExitCode;

use shellgate_common::ConfigError;
use shellgate_config::{validation, ShellgateConfig};
use shellgate_server::TerminalManager;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

fn load_config(args: &cli::Args) -> Result<ShellgateConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => shellgate_config::load_from_path(path)?,
        None => shellgate_config::load_default()?,
    };
    args.apply(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

fn init_logging(args: &cli::Args, config: &ShellgateConfig) {
    let default_directive = config.logging.level.directive();
    let directive = args.log_level.as_deref().unwrap_or(default_directive);
    let directive: Directive = directive.parse().unwrap_or_else(|_| {
        eprintln!("invalid log filter {directive:?}, using {default_directive}");
        default_directive
            .parse()
            .expect("built-in log directive is valid")
    });

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("shellgate: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&args, &config);

    let manager = match TerminalManager::initialize(&config).await {
        Ok(manager) => manager,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start terminal gateway");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        "shellgate serving ws://{}{}",
        manager.local_addr(),
        config.server.path
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }

    match manager.close().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Shutdown did not complete cleanly");
            ExitCode::FAILURE
        }
    }
}
