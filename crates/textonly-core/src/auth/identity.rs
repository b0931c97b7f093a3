//! Who the stored credential belongs to.

use serde_json::{Map, Value};

use super::AuthError;
use crate::api::ApiClient;

pub const ME_PATH: &str = "/me";

/// Fetch the authenticated user's profile object.
pub async fn whoami(client: &ApiClient) -> Result<Map<String, Value>, AuthError> {
    Ok(client.get(ME_PATH, true).await?)
}

/// Human-readable identity: the `email` field when present.
pub fn identity_summary(me: &Map<String, Value>) -> &str {
    me.get("email")
        .and_then(Value::as_str)
        .unwrap_or("authenticated")
}
