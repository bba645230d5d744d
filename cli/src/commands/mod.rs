use clap::Subcommand;
use tenantctl_config::Config;

pub mod configuration;
pub mod context;

pub use configuration::ConfigurationCommands;
pub use context::ContextCommands;

#[derive(Subcommand, PartialEq, Debug)]
pub enum Commands {
    /// Manage contexts
    #[command(subcommand)]
    Context(ContextCommands),

    /// View and change configuration fields
    #[command(subcommand)]
    Configuration(ConfigurationCommands),
}

impl Commands {
    pub fn run(self, config: &mut Config) -> Result<(), String> {
        match self {
            Commands::Context(command) => command.run(config),
            Commands::Configuration(command) => command.run(config),
        }
    }
}
