//! Schema version dispatch.
//!
//! A config document is migrated as raw JSON before it is bound to the
//! current types. Each [`Migration`] knows the version it reads and the
//! version it writes; the [`Migrator`] chains them until the document is at
//! [`CURRENT_VERSION`].

mod netrc;
mod v0;

pub use netrc::NetrcShim;
pub use v0::V0ToV1;

use semver::Version;
use serde_json::Value;
use std::path::Path;

use crate::config::CURRENT_VERSION;
use crate::error::{ConfigError, ConfigResult};

/// Version assumed for documents that carry none
pub const UNVERSIONED: &str = "0.0.0";

/// One step of the migration chain
pub trait Migration {
    /// Version of the documents this migration reads
    fn from_version(&self) -> &'static str;

    /// Version of the documents it produces
    fn to_version(&self) -> &'static str;

    fn migrate(&self, document: Value) -> ConfigResult<Value>;
}

pub struct Migrator {
    current: &'static str,
    migrations: Vec<Box<dyn Migration + Send + Sync>>,
}

impl Default for Migrator {
    fn default() -> Self {
        Migrator::new(CURRENT_VERSION)
            .with_migration(V0ToV1)
            .with_migration(NetrcShim)
    }
}

impl Migrator {
    /// A migrator targeting `current` with no migrations registered
    pub fn new(current: &'static str) -> Self {
        Migrator {
            current,
            migrations: Vec::new(),
        }
    }

    pub fn with_migration(mut self, migration: impl Migration + Send + Sync + 'static) -> Self {
        self.migrations.push(Box::new(migration));
        self
    }

    /// Bring `document` to the current version. Returns the document and
    /// whether any migration ran.
    pub fn run(&self, mut document: Value, path: &Path) -> ConfigResult<(Value, bool)> {
        let current = parse_version(self.current)?;
        let mut migrated = false;

        loop {
            let found = document_version(&document)?;
            if found == current {
                return Ok((document, migrated));
            }
            let Some(migration) = self.find(&found)? else {
                return Err(version_error(&found, self.current, path, found < current));
            };
            tracing::debug!(
                from = migration.from_version(),
                to = migration.to_version(),
                "migrating config"
            );
            document = migration.migrate(document)?;
            if document_version(&document)? == found {
                return Err(ConfigError::migration(format!(
                    "migration from version {found} did not change the version"
                )));
            }
            migrated = true;
        }
    }

    fn find(&self, version: &Version) -> ConfigResult<Option<&(dyn Migration + Send + Sync)>> {
        for migration in &self.migrations {
            if parse_version(migration.from_version())? == *version {
                return Ok(Some(migration.as_ref()));
            }
        }
        Ok(None)
    }
}

/// The version recorded in a raw document; missing or empty means
/// [`UNVERSIONED`].
pub fn document_version(document: &Value) -> ConfigResult<Version> {
    match document.get("version").and_then(Value::as_str) {
        None | Some("") => parse_version(UNVERSIONED),
        Some(version) => parse_version(version),
    }
}

fn parse_version(version: &str) -> ConfigResult<Version> {
    Version::parse(version)
        .map_err(|e| ConfigError::migration(format!("invalid config version \"{version}\": {e}")))
}

fn version_error(found: &Version, expected: &str, path: &Path, older: bool) -> ConfigError {
    let found = found.to_string();
    let expected = expected.to_string();
    let path = path.display().to_string();
    if older {
        ConfigError::OutOfDate {
            found,
            expected,
            path,
        }
    } else {
        ConfigError::UnsupportedVersion {
            found,
            expected,
            path,
        }
    }
}

/// Set the `version` field of a raw document
pub(crate) fn set_version(document: &mut Value, version: &str) -> ConfigResult<()> {
    let object = document
        .as_object_mut()
        .ok_or_else(|| ConfigError::migration("config document is not a JSON object"))?;
    object.insert("version".into(), Value::String(version.to_string()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Rename;

    impl Migration for Rename {
        fn from_version(&self) -> &'static str {
            "0.5.0"
        }
        fn to_version(&self) -> &'static str {
            "1.0.0"
        }
        fn migrate(&self, mut document: Value) -> ConfigResult<Value> {
            set_version(&mut document, self.to_version())?;
            Ok(document)
        }
    }

    struct Stuck;

    impl Migration for Stuck {
        fn from_version(&self) -> &'static str {
            "0.5.0"
        }
        fn to_version(&self) -> &'static str {
            "1.0.0"
        }
        fn migrate(&self, document: Value) -> ConfigResult<Value> {
            Ok(document)
        }
    }

    #[test]
    fn test_document_version_defaults_to_unversioned() {
        assert_eq!(document_version(&json!({})).unwrap(), Version::new(0, 0, 0));
        assert_eq!(document_version(&json!({"version": ""})).unwrap(), Version::new(0, 0, 0));
        assert_eq!(document_version(&json!({"version": "1.2.3"})).unwrap(), Version::new(1, 2, 3));
    }

    #[test]
    fn test_current_document_is_untouched() {
        let doc = json!({"version": "1.0.0", "contexts": {}});
        let (out, migrated) = Migrator::new("1.0.0").run(doc.clone(), Path::new("c.json")).unwrap();
        assert_eq!(out, doc);
        assert!(!migrated);
    }

    #[test]
    fn test_registered_migration_runs() {
        let migrator = Migrator::new("1.0.0").with_migration(Rename);
        let (out, migrated) = migrator
            .run(json!({"version": "0.5.0"}), Path::new("c.json"))
            .unwrap();
        assert_eq!(out["version"], "1.0.0");
        assert!(migrated);
    }

    #[test]
    fn test_older_without_migration_is_out_of_date() {
        let err = Migrator::new("1.0.0")
            .run(json!({"version": "0.9.0"}), Path::new("c.json"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::OutOfDate { ref found, .. } if found == "0.9.0"));
    }

    #[test]
    fn test_newer_without_migration_is_unsupported() {
        let err = Migrator::new("1.0.0")
            .run(json!({"version": "2.0.0"}), Path::new("c.json"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedVersion { ref found, .. } if found == "2.0.0"));
    }

    #[test]
    fn test_migration_that_keeps_version_fails() {
        let err = Migrator::new("1.0.0")
            .with_migration(Stuck)
            .run(json!({"version": "0.5.0"}), Path::new("c.json"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Migration(_)));
    }

    #[test]
    fn test_invalid_version_string() {
        let err = Migrator::new("1.0.0")
            .run(json!({"version": "banana"}), Path::new("c.json"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Migration(_)));
    }
}
