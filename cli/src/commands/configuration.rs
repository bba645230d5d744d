//! Configuration field commands

use clap::Subcommand;
use tenantctl_config::Config;
use tenantctl_config::fields::{self, FIELDS};

#[derive(Subcommand, PartialEq, Debug)]
pub enum ConfigurationCommands {
    /// List all user-editable fields and their values
    #[command(name = "list", alias = "ls")]
    List,

    /// Show one field
    Describe { field: String },

    /// Change one field
    Update { field: String, value: String },
}

impl ConfigurationCommands {
    pub fn run(self, config: &mut Config) -> Result<(), String> {
        match self {
            ConfigurationCommands::List => {
                print!("{}", render_list(config));
                Ok(())
            }
            ConfigurationCommands::Describe { field } => {
                let field = fields::field(&field).map_err(|e| e.to_string())?;
                println!("{}: {}", field.name, field.value(config));
                println!("  {}", field.description);
                Ok(())
            }
            ConfigurationCommands::Update { field, value } => {
                let field = fields::field(&field).map_err(|e| e.to_string())?;
                field.update(config, &value).map_err(|e| e.to_string())?;
                config
                    .save()
                    .map_err(|e| format!("Failed to save config: {}", e))?;
                println!("Set {} to {}.", field.name, field.value(config));
                Ok(())
            }
        }
    }
}

fn render_list(config: &Config) -> String {
    let width = FIELDS.iter().map(|f| f.name.len()).max().unwrap_or(0);
    FIELDS
        .iter()
        .map(|f| format!("{:<width$}  {}\n", f.name, f.value(config)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn list_shows_every_field() {
        let dir = TempDir::new().unwrap();
        let config = Config::new(dir.path().join("config.json"));

        let out = render_list(&config);
        assert_eq!(out.lines().count(), FIELDS.len());
        assert!(out.lines().any(|l| l.starts_with("enable_color") && l.ends_with("true")));
    }

    #[test]
    fn update_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::new(&path);

        ConfigurationCommands::Update {
            field: "disable_update_check".into(),
            value: "true".into(),
        }
        .run(&mut config)
        .unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert!(loaded.disable_update_check);
    }

    #[test]
    fn update_rejects_unknown_field_and_bad_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::new(&path);

        let err = ConfigurationCommands::Update {
            field: "nope".into(),
            value: "true".into(),
        }
        .run(&mut config)
        .unwrap_err();
        assert!(err.contains("nope"));

        let err = ConfigurationCommands::Update {
            field: "enable_color".into(),
            value: "sometimes".into(),
        }
        .run(&mut config)
        .unwrap_err();
        assert!(err.contains("sometimes"));
        assert!(!path.exists());
    }
}
