//! User-editable top-level settings, addressed by their file name.

use crate::config::Config;
use crate::error::{ConfigError, ConfigResult};

/// A boolean setting of [`Config`]
pub struct Field {
    pub name: &'static str,
    pub description: &'static str,
    get: fn(&Config) -> bool,
    set: fn(&mut Config, bool),
}

impl Field {
    pub fn value(&self, config: &Config) -> bool {
        (self.get)(config)
    }

    /// Parse `raw` and store it. Accepts `true`/`false` in any case.
    pub fn update(&self, config: &mut Config, raw: &str) -> ConfigResult<()> {
        let value = match raw.trim().to_ascii_lowercase().as_str() {
            "true" => true,
            "false" => false,
            _ => {
                return Err(ConfigError::InvalidArgument(format!(
                    "\"{raw}\" is not a valid value for {}, expected true or false",
                    self.name
                )));
            }
        };
        (self.set)(config, value);
        Ok(())
    }
}

pub static FIELDS: &[Field] = &[
    Field {
        name: "disable_update_check",
        description: "Skip checking for new releases",
        get: |c| c.disable_update_check,
        set: |c, v| c.disable_update_check = v,
    },
    Field {
        name: "disable_updates",
        description: "Refuse to install new releases",
        get: |c| c.disable_updates,
        set: |c, v| c.disable_updates = v,
    },
    Field {
        name: "disable_plugins",
        description: "Ignore plugins found on the PATH",
        get: |c| c.disable_plugins,
        set: |c, v| c.disable_plugins = v,
    },
    Field {
        name: "disable_feature_flags",
        description: "Use built-in defaults instead of remote feature flags",
        get: |c| c.disable_feature_flags,
        set: |c, v| c.disable_feature_flags = v,
    },
    Field {
        name: "enable_color",
        description: "Colorize terminal output",
        get: |c| c.enable_color,
        set: |c, v| c.enable_color = v,
    },
];

/// Look up a field by name
pub fn field(name: &str) -> ConfigResult<&'static Field> {
    FIELDS.iter().find(|f| f.name == name).ok_or_else(|| {
        let known: Vec<&str> = FIELDS.iter().map(|f| f.name).collect();
        ConfigError::InvalidArgument(format!(
            "unknown configuration field \"{name}\" (known fields: {})",
            known.join(", ")
        ))
    })
}
