// API key resolution and owner-only file helpers.
//
// The generation API key never lives in config files: it comes from the
// `FOLIO_API_KEY` environment variable or the OS keychain.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

pub const API_KEY_ENV: &str = "FOLIO_API_KEY";

const KEYRING_SERVICE: &str = "com.folio.studio";
const API_KEY_ACCOUNT: &str = "generation_api_key";

pub trait SecretStore: Send + Sync {
    fn set_secret(&self, service: &str, account: &str, value: &str) -> Result<()>;
    fn get_secret(&self, service: &str, account: &str) -> Result<Option<String>>;
    fn delete_secret(&self, service: &str, account: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeyringSecretStore;

impl SecretStore for KeyringSecretStore {
    fn set_secret(&self, service: &str, account: &str, value: &str) -> Result<()> {
        let entry = keyring::Entry::new(service, account)
            .context("failed to initialize keychain entry")?;
        entry.set_password(value).context("failed to write keychain entry")?;
        Ok(())
    }

    fn get_secret(&self, service: &str, account: &str) -> Result<Option<String>> {
        let entry = keyring::Entry::new(service, account)
            .context("failed to initialize keychain entry")?;
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(error).context("failed to read keychain entry"),
        }
    }

    fn delete_secret(&self, service: &str, account: &str) -> Result<()> {
        let entry = keyring::Entry::new(service, account)
            .context("failed to initialize keychain entry")?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(error).context("failed to delete keychain entry"),
        }
    }
}

pub fn store_api_key(store: &dyn SecretStore, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("API key must not be empty");
    }
    store
        .set_secret(KEYRING_SERVICE, API_KEY_ACCOUNT, value.trim())
        .context("failed to persist the API key in the keychain")
}

pub fn clear_api_key(store: &dyn SecretStore) -> Result<()> {
    store
        .delete_secret(KEYRING_SERVICE, API_KEY_ACCOUNT)
        .context("failed to clear the API key from the keychain")
}

/// Environment first, then keychain. Blank values count as unset.
pub fn resolve_api_key(store: &dyn SecretStore) -> Result<Option<String>> {
    resolve_api_key_from(std::env::var(API_KEY_ENV).ok(), store)
}

fn resolve_api_key_from(env_value: Option<String>, store: &dyn SecretStore) -> Result<Option<String>> {
    if let Some(value) = env_value.filter(|value| !value.trim().is_empty()) {
        return Ok(Some(value.trim().to_string()));
    }
    let stored = store
        .get_secret(KEYRING_SERVICE, API_KEY_ACCOUNT)
        .context("failed to read the API key from the keychain")?;
    Ok(stored.filter(|value| !value.trim().is_empty()))
}

pub fn ensure_owner_only_file(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if !path.exists() {
            return Ok(());
        }

        let metadata = fs::metadata(path)
            .with_context(|| format!("failed to read metadata for `{}`", path.display()))?;
        let mode = metadata.permissions().mode() & 0o777;
        if mode != 0o600 {
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                .with_context(|| format!("failed to set owner-only mode on `{}`", path.display()))?;
        }
    }

    #[cfg(not(unix))]
    {
        let _ = path;
    }

    Ok(())
}

pub fn ensure_owner_only_dir(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if !path.exists() {
            return Ok(());
        }

        let metadata = fs::metadata(path)
            .with_context(|| format!("failed to read metadata for `{}`", path.display()))?;
        let mode = metadata.permissions().mode() & 0o777;
        if mode != 0o700 {
            fs::set_permissions(path, fs::Permissions::from_mode(0o700))
                .with_context(|| format!("failed to set owner-only mode on `{}`", path.display()))?;
        }
    }

    #[cfg(not(unix))]
    {
        let _ = path;
    }

    Ok(())
}
