//! Bearer token persistence.
//!
//! The token lives in the OS secret store when one is usable and otherwise in
//! a file under the user's config directory readable only by its owner.
//! Both are [`SecretBackend`]s; the [`CredentialStore`] tries them in priority
//! order. The last backend is the fallback: its errors are the ones callers see.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use keyring::Entry;
use tracing::debug;

use super::AuthError;

const SERVICE_NAME: &str = "textonly-cli";

/// Keychain account name for the single stored token
const TOKEN_ACCOUNT: &str = "token";

/// Fallback token file name inside the config directory
const TOKEN_FILE: &str = "token";

/// Token file permissions (Unix only): owner read/write.
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Config directory permissions (Unix only), applied when we create it.
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

/// A place a token can be kept.
pub trait SecretBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    fn save(&self, token: &str) -> Result<(), AuthError>;

    /// `Ok(None)` when nothing is stored.
    fn load(&self) -> Result<Option<String>, AuthError>;

    /// Removing a token that is not there is not an error.
    fn clear(&self) -> Result<(), AuthError>;
}

/// OS-native secret store (macOS Keychain, Windows Credential Manager,
/// Linux Secret Service with a kernel keyring cache).
pub struct KeyringBackend {
    service: String,
    account: String,
}

impl KeyringBackend {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<Entry, AuthError> {
        Ok(Entry::new(&self.service, &self.account)?)
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new(SERVICE_NAME, TOKEN_ACCOUNT)
    }
}

impl SecretBackend for KeyringBackend {
    fn name(&self) -> &str {
        "keyring"
    }

    fn save(&self, token: &str) -> Result<(), AuthError> {
        self.entry()?.set_password(token)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<String>, AuthError> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<(), AuthError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Plain file holding only the token, created with owner-only permissions.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.config/textonly/token`
    pub fn default_path() -> anyhow::Result<PathBuf> {
        Ok(crate::config::config_dir()?.join(TOKEN_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(&self) -> Result<(), AuthError> {
        let Some(parent) = self.path.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() || parent.exists() {
            return Ok(());
        }

        std::fs::create_dir_all(parent).map_err(|e| AuthError::storage(parent, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(parent, std::fs::Permissions::from_mode(DIR_MODE))
                .map_err(|e| AuthError::storage(parent, e))?;
        }
        Ok(())
    }
}

impl SecretBackend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    fn save(&self, token: &str) -> Result<(), AuthError> {
        self.ensure_parent()?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(FILE_MODE);
        }

        let mut file = options
            .open(&self.path)
            .map_err(|e| AuthError::storage(&self.path, e))?;

        // The mode above only applies to new files; tighten an existing one too
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(FILE_MODE))
                .map_err(|e| AuthError::storage(&self.path, e))?;
        }

        file.write_all(token.as_bytes())
            .map_err(|e| AuthError::storage(&self.path, e))?;
        Ok(())
    }

    fn load(&self) -> Result<Option<String>, AuthError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents.trim().to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AuthError::storage(&self.path, e)),
        }
    }

    fn clear(&self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::storage(&self.path, e)),
        }
    }
}

/// The single credential of this install, spread over prioritized backends.
pub struct CredentialStore {
    backends: Vec<Box<dyn SecretBackend>>,
}

impl CredentialStore {
    /// OS keychain first, then `~/.config/textonly/token`.
    pub fn default_store() -> anyhow::Result<Self> {
        Ok(Self::with_backends(vec![
            Box::new(KeyringBackend::default()),
            Box::new(FileBackend::new(FileBackend::default_path()?)),
        ]))
    }

    /// Backends in priority order; the last one is the fallback.
    pub fn with_backends(backends: Vec<Box<dyn SecretBackend>>) -> Self {
        Self { backends }
    }

    /// Store the token in the first backend that accepts it, then remove any
    /// copy held by the others so an older token cannot shadow the new one.
    pub fn save(&self, token: &str) -> Result<(), AuthError> {
        let mut last_error = None;
        for (index, backend) in self.backends.iter().enumerate() {
            match backend.save(token) {
                Ok(()) => {
                    debug!(backend = backend.name(), "Stored credential");
                    self.clear_except(index);
                    return Ok(());
                }
                Err(e) => {
                    debug!(backend = backend.name(), error = %e, "Credential backend failed, trying next");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(AuthError::NotAuthenticated))
    }

    fn clear_except(&self, keep: usize) {
        for (index, backend) in self.backends.iter().enumerate() {
            if index == keep {
                continue;
            }
            if let Err(e) = backend.clear() {
                debug!(backend = backend.name(), error = %e, "Could not remove stale credential");
            }
        }
    }

    /// Return the first non-empty token found, or `NotAuthenticated`.
    pub fn load(&self) -> Result<String, AuthError> {
        for backend in &self.backends {
            match backend.load() {
                Ok(Some(token)) if !token.trim().is_empty() => {
                    debug!(backend = backend.name(), "Loaded credential");
                    return Ok(token.trim().to_string());
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(backend = backend.name(), error = %e, "Credential backend unreadable");
                }
            }
        }
        Err(AuthError::NotAuthenticated)
    }

    /// Remove the token everywhere. Only a fallback failure is reported.
    pub fn clear(&self) -> Result<(), AuthError> {
        let fallback = self.backends.len().saturating_sub(1);
        let mut result = Ok(());
        for (index, backend) in self.backends.iter().enumerate() {
            if let Err(e) = backend.clear() {
                if index == fallback {
                    result = Err(e);
                } else {
                    debug!(backend = backend.name(), error = %e, "Ignoring credential removal failure");
                }
            }
        }
        result
    }

    /// Check if a token is stored
    pub fn has_credentials(&self) -> bool {
        self.load().is_ok()
    }
}
