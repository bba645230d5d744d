//! Files written by the netrc-era releases carry version 3.0.0 but share the
//! current layout. They only lack each context's netrc machine name.

use serde_json::Value;

use super::{Migration, set_version};
use crate::config::CURRENT_VERSION;
use crate::error::ConfigResult;

pub struct NetrcShim;

impl Migration for NetrcShim {
    fn from_version(&self) -> &'static str {
        "3.0.0"
    }

    fn to_version(&self) -> &'static str {
        CURRENT_VERSION
    }

    fn migrate(&self, mut document: Value) -> ConfigResult<Value> {
        if let Some(contexts) = document.get_mut("contexts").and_then(Value::as_object_mut) {
            for (name, context) in contexts.iter_mut() {
                if let Some(context) = context.as_object_mut() {
                    context.insert("netrc_machine_name".into(), Value::String(name.clone()));
                }
            }
        }
        set_version(&mut document, self.to_version())?;
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_marks_contexts_and_resets_version() {
        let doc = json!({
            "version": "3.0.0",
            "contexts": {
                "dev": {"name": "dev"},
                "prod": {"name": "prod", "netrc_machine_name": "stale"}
            }
        });
        let out = NetrcShim.migrate(doc).unwrap();
        assert_eq!(out["version"], CURRENT_VERSION);
        assert_eq!(out["contexts"]["dev"]["netrc_machine_name"], "dev");
        assert_eq!(out["contexts"]["prod"]["netrc_machine_name"], "prod");
    }

    #[test]
    fn test_document_without_contexts() {
        let out = NetrcShim.migrate(json!({"version": "3.0.0"})).unwrap();
        assert_eq!(out["version"], CURRENT_VERSION);
    }
}
