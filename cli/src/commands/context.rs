//! Context commands
//!
//! - `tenantctl context list` - List contexts, marking the current one
//! - `tenantctl context describe [NAME]` - Show one context
//! - `tenantctl context use NAME` - Switch the current context
//! - `tenantctl context create NAME` - Create an API key context for a Kafka cluster
//! - `tenantctl context update [NAME] --name NEW` - Rename a context
//! - `tenantctl context delete NAME` - Remove a context

use clap::Subcommand;
use tenantctl_config::{Config, Context};

#[derive(Subcommand, PartialEq, Debug)]
pub enum ContextCommands {
    /// List all contexts
    #[command(name = "list", alias = "ls")]
    List,

    /// Describe a context (default: the current one)
    Describe {
        /// Context to describe
        name: Option<String>,

        /// Show the API secret of the active Kafka cluster
        #[arg(long, default_value_t = false)]
        api_secret: bool,
    },

    /// Make a context the current one
    Use {
        name: String,
    },

    /// Create a context for a Kafka cluster reached with an API key
    Create {
        name: String,

        /// Bootstrap URL of the Kafka cluster
        #[arg(long)]
        bootstrap: String,

        /// API key for the cluster
        #[arg(long)]
        api_key: String,

        /// API secret for the cluster
        #[arg(long, env("TENANTCTL_API_SECRET"))]
        api_secret: String,
    },

    /// Rename a context (default: the current one)
    Update {
        name: Option<String>,

        /// New name for the context
        #[arg(long = "name")]
        new_name: String,
    },

    /// Delete a context
    Delete {
        name: String,
    },
}

impl ContextCommands {
    pub fn run(self, config: &mut Config) -> Result<(), String> {
        match self {
            ContextCommands::List => {
                print!("{}", render_list(config));
                Ok(())
            }
            ContextCommands::Describe { name, api_secret } => {
                let context = resolve(config, name.as_deref())?;
                print!("{}", render_describe(context, api_secret)?);
                Ok(())
            }
            ContextCommands::Use { name } => {
                config.use_context(&name).map_err(|e| e.to_string())?;
                save(config)?;
                println!("Using context \"{}\".", name);
                Ok(())
            }
            ContextCommands::Create {
                name,
                bootstrap,
                api_key,
                api_secret,
            } => {
                config
                    .create_context(&name, &bootstrap, &api_key, &api_secret)
                    .map_err(|e| e.to_string())?;
                save(config)?;
                let context = resolve(config, Some(name.as_str()))?;
                print!("{}", render_describe(context, false)?);
                Ok(())
            }
            ContextCommands::Update { name, new_name } => {
                let old = resolve(config, name.as_deref())?.name.clone();
                config
                    .rename_context(&old, &new_name)
                    .map_err(|e| e.to_string())?;
                save(config)?;
                println!("Renamed context \"{}\" to \"{}\".", old, new_name);
                Ok(())
            }
            ContextCommands::Delete { name } => {
                config.delete_context(&name).map_err(|e| e.to_string())?;
                save(config)?;
                println!("Deleted context \"{}\".", name);
                Ok(())
            }
        }
    }
}

fn save(config: &mut Config) -> Result<(), String> {
    config
        .save()
        .map_err(|e| format!("Failed to save config: {}", e))
}

/// The named context, or the current one when no name is given
fn resolve<'a>(config: &'a Config, name: Option<&str>) -> Result<&'a Context, String> {
    match name {
        Some(name) => config.find_context(name).map_err(|e| e.to_string()),
        None => config.context().ok_or_else(|| {
            "No context selected. Run 'tenantctl context use NAME' or pass a context name."
                .to_string()
        }),
    }
}

pub(crate) fn render_list(config: &Config) -> String {
    let names = config.context_names();
    if names.is_empty() {
        return "No contexts configured.\n\nRun 'tenantctl context create' to add one.\n".into();
    }

    let width = names.iter().map(String::len).max().unwrap_or(0).max("NAME".len());
    let mut out = format!("  {:<width$}  {:<30}  CREDENTIAL\n", "NAME", "PLATFORM");
    for name in names {
        let Some(context) = config.contexts.get(&name) else {
            continue;
        };
        let marker = if config.current_context == name { "*" } else { " " };
        out.push_str(&format!(
            "{} {:<width$}  {:<30}  {}\n",
            marker, name, context.platform_name, context.credential_name
        ));
    }
    out
}

pub(crate) fn render_describe(context: &Context, show_secret: bool) -> Result<String, String> {
    let mut rows: Vec<(&str, String)> = vec![
        ("Name", context.name.clone()),
        ("Platform", context.platform_name.clone()),
        ("Credential", context.credential_name.clone()),
    ];
    if let Some(credential) = context.credential() {
        rows.push(("Credential Type", credential.credential_type.to_string()));
    }
    if let Some(environment) = context.current_environment() {
        rows.push(("Environment", environment.to_string()));
    }
    if let Some(cluster) = context.active_kafka_cluster_config() {
        rows.push(("Kafka Cluster", cluster.id.clone()));
        rows.push(("Bootstrap Server", cluster.bootstrap.clone()));
        if let Some(pair) = cluster.active_api_key_pair() {
            rows.push(("API Key", pair.key.clone()));
            if show_secret {
                let pair = pair
                    .decrypted()
                    .map_err(|e| format!("Failed to decrypt API secret: {}", e))?;
                rows.push(("API Secret", pair.secret));
            }
        }
    } else if let Some(cluster_id) = context.active_kafka_cluster_id() {
        rows.push(("Kafka Cluster", cluster_id.to_string()));
    }
    if let Some(user) = context.user() {
        rows.push(("User", user.email.clone()));
    }

    let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    Ok(rows
        .into_iter()
        .map(|(k, v)| format!("{:<width$}  {}\n", format!("{}:", k), v, width = width + 1))
        .collect())
}
