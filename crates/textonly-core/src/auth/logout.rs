use reqwest::Method;
use tracing::debug;

use super::{AuthError, CredentialStore};
use crate::api::ApiClient;

pub const REVOKE_PATH: &str = "/auth/logout";

/// Revoke the stored token server-side if there is one, then forget it locally.
///
/// Revocation is best effort; a failed call never keeps the token on disk.
pub async fn logout(client: &ApiClient, store: &CredentialStore) -> Result<(), AuthError> {
    if store.has_credentials() {
        if let Err(e) = client.send(Method::POST, REVOKE_PATH, None, true).await {
            debug!(error = %e, "Token revocation failed, clearing local credential anyway");
        }
    }
    store.clear()
}
