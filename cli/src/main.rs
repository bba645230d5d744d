use clap::Parser;
use std::path::PathBuf;
use tenantctl_config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::Commands;

#[derive(Parser, PartialEq, Debug)]
#[command(name = "tenantctl")]
#[command(about = "Manage tenantctl contexts and configuration", long_about = None)]
struct Cli {
    /// Path to the config file (default: ~/.tenantctl/config.json)
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Use this context for this command only
    #[arg(long = "context", global = true)]
    context: Option<String>,

    /// Use this environment for this command only
    #[arg(long = "environment", global = true)]
    environment: Option<String>,

    /// Use this Kafka cluster for this command only
    #[arg(long = "cluster", global = true)]
    cluster: Option<String>,

    /// Enable debug output
    #[arg(long = "debug", default_value_t = false, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Apply per-invocation flags. The context goes first so environment and
/// cluster land on the selected context.
fn apply_overwrites(config: &mut Config, cli: &Cli) -> Result<(), String> {
    if let Some(context) = &cli.context {
        config
            .set_overwritten_curr_context(context)
            .map_err(|e| e.to_string())?;
    }
    if let Some(environment) = &cli.environment {
        config
            .set_overwritten_account(environment)
            .map_err(|e| e.to_string())?;
    }
    if let Some(cluster) = &cli.cluster {
        config
            .set_overwritten_active_kafka(cluster)
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    format!("error,{}=debug,tenantctl_config=debug", env!("CARGO_CRATE_NAME")).into()
                }),
            )
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    tracing::debug!(path = %config.filename.display(), "loaded config");

    if let Err(e) = apply_overwrites(&mut config, &cli) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    if let Err(e) = cli.command.run(&mut config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
