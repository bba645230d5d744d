//! Writing the config to disk.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use super::Config;
use crate::error::{ConfigError, ConfigResult};
use crate::state::Tokens;

impl Config {
    /// Persist the config.
    ///
    /// Flag overwrites are swapped out for the values they replaced, secrets
    /// and tokens are encrypted, the result is validated and written
    /// atomically with owner-only permissions. Afterwards the flag values and
    /// plaintext tokens are back in place, so the rest of the process keeps
    /// seeing the overwritten session while the file holds the real one.
    pub fn save(&mut self) -> ConfigResult<()> {
        let resolved = self.resolve_overwrites();
        let result = self.encrypt_and_write();
        self.restore_overwrites(resolved);
        result
    }

    fn encrypt_and_write(&mut self) -> ConfigResult<()> {
        let tokens = self.encrypt_tokens()?;
        let result = self.encrypt_api_keys().and_then(|_| {
            self.sync_context_states();
            self.validate()?;
            let body = serde_json::to_vec_pretty(&*self)?;
            write_private(&self.filename, &body)
        });
        self.restore_tokens(tokens);
        if result.is_ok() {
            tracing::debug!(path = %self.filename.display(), "saved config");
        }
        result
    }

    /// Encrypt the tokens of every context that holds some, returning the
    /// plaintext per context. Nothing stays encrypted if one of them fails.
    fn encrypt_tokens(&mut self) -> ConfigResult<Vec<(String, Tokens)>> {
        let mut captured = Vec::new();
        let mut failure = None;
        for (name, context) in self.contexts.iter_mut() {
            if let Some(state) = context.state.as_mut()
                && state.has_tokens()
            {
                match state.encrypt_tokens(name) {
                    Ok(tokens) => captured.push((name.clone(), tokens)),
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
        }
        match failure {
            Some(e) => {
                self.restore_tokens(captured);
                Err(e)
            }
            None => Ok(captured),
        }
    }

    fn restore_tokens(&mut self, tokens: Vec<(String, Tokens)>) {
        for (name, plaintext) in tokens {
            if let Some(state) = self.contexts.get_mut(&name).and_then(|c| c.state.as_mut()) {
                state.restore_tokens(plaintext);
            }
        }
        self.sync_context_states();
    }

    /// Key pair secrets stay encrypted in memory; read them with
    /// [`crate::ApiKeyPair::decrypted`].
    fn encrypt_api_keys(&mut self) -> ConfigResult<()> {
        for credential in self.credentials.values_mut() {
            credential.encrypt_secrets()?;
        }
        for context in self.contexts.values_mut() {
            context.encrypt_api_keys()?;
            if let Some(credential) = self.credentials.get(&context.credential_name) {
                context.credential = Some(credential.clone());
            }
        }
        Ok(())
    }
}

/// Write `contents` to `path` through a temp file and rename. The file is
/// created readable by the owner only; missing directories are created
/// likewise.
fn write_private(path: &Path, contents: &[u8]) -> ConfigResult<()> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::InvalidArgument("config has no file path".into()));
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_private_dir(parent)?;
    }

    let temp_path = path.with_extension("json.tmp");
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(&temp_path)
        .map_err(|e| ConfigError::io("create", &temp_path, e))?;
    file.write_all(contents)
        .and_then(|_| file.sync_all())
        .map_err(|e| ConfigError::io("write", &temp_path, e))?;

    std::fs::rename(&temp_path, path).map_err(|e| ConfigError::io("replace", path, e))
}

fn create_private_dir(dir: &Path) -> ConfigResult<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder
        .create(dir)
        .map_err(|e| ConfigError::io("create directory", dir, e))
}
