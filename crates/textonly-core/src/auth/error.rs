//! Auth error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::api::ApiError;

/// Errors that can occur while acquiring, storing or using a credential.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token in any credential backend.
    ///
    /// The user needs to run `to login` (or set `TO_TOKEN`).
    #[error("not logged in")]
    NotAuthenticated,

    /// The fallback token file could not be written, read or removed.
    #[error("credential storage failed at {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The OS secret store rejected the operation.
    #[error("OS keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    /// The device authorization expired before the user approved it.
    #[error("login timed out")]
    LoginTimedOut,

    /// A non-polling API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AuthError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AuthError::Storage {
            path: path.into(),
            source,
        }
    }
}
