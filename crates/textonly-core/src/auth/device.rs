//! Device-authorization login.
//!
//! The CLI asks the server for a device code, shows the operator a short user
//! code and a URL to approve it in a browser, then polls until the server
//! hands out a bearer token or the authorization expires.
//!
//! ```text
//! Idle -> Started -> Polling -> { Authenticated | TimedOut | Failed }
//! ```

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{AuthError, CredentialStore};
use crate::api::ApiClient;
use crate::backoff;

pub const START_PATH: &str = "/cli/login/start";
pub const POLL_PATH: &str = "/cli/login/poll";

/// Poll interval used when the server omits one or sends a non-positive value
const DEFAULT_INTERVAL_SECS: u64 = 3;

/// Upper bound on a session's lifetime, whatever the server claims
const MAX_SESSION_SECS: u64 = 24 * 60 * 60;

/// Launches a browser at a URL
type Opener = dyn Fn(&str) -> std::io::Result<()> + Send + Sync;

#[derive(Debug, Deserialize)]
struct StartResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    #[serde(default)]
    interval: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

/// One login attempt. Lives only in memory.
#[derive(Clone)]
pub struct DeviceSession {
    device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub interval: Duration,
    /// Wall-clock expiry, for display
    pub expires_at: DateTime<Utc>,
    /// Monotonic deadline, computed once when the session starts
    deadline: Instant,
}

impl DeviceSession {
    fn from_start(resp: StartResponse, now: Instant) -> Self {
        let interval = match resp.interval {
            Some(secs) if secs > 0 => Duration::from_secs(secs as u64),
            _ => Duration::from_secs(DEFAULT_INTERVAL_SECS),
        };
        let lifetime = Duration::from_secs(
            resp.expires_in
                .unwrap_or(0)
                .clamp(0, MAX_SESSION_SECS as i64) as u64,
        );
        let expires_at = Utc::now()
            + chrono::Duration::from_std(lifetime).unwrap_or_else(|_| chrono::Duration::zero());

        Self {
            device_code: resp.device_code,
            user_code: resp.user_code,
            verification_uri: resp.verification_uri,
            interval,
            expires_at,
            deadline: now.checked_add(lifetime).unwrap_or(now),
        }
    }

    /// Get minutes remaining until the code expires (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_minutes().max(0)
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

// The device code is a polling secret and stays out of logs
impl fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession")
            .field("user_code", &self.user_code)
            .field("verification_uri", &self.verification_uri)
            .field("interval", &self.interval)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

enum LoginState {
    Idle,
    Started(DeviceSession),
    Polling { session: DeviceSession, attempt: u32 },
    Authenticated(String),
    TimedOut,
    Failed(AuthError),
}

/// Drives one device-authorization login against the API.
pub struct LoginFlow<'a> {
    client: &'a ApiClient,
    store: &'a CredentialStore,
    open_browser: bool,
    opener: Box<Opener>,
}

impl<'a> LoginFlow<'a> {
    pub fn new(client: &'a ApiClient, store: &'a CredentialStore) -> Self {
        Self {
            client,
            store,
            open_browser: true,
            opener: Box::new(|url: &str| open::that_detached(url)),
        }
    }

    /// Whether to try launching a browser at the verification URL
    pub fn open_browser(mut self, open: bool) -> Self {
        self.open_browser = open;
        self
    }

    /// Replace how the verification URL is opened
    pub fn with_opener(
        mut self,
        opener: impl Fn(&str) -> std::io::Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.opener = Box::new(opener);
        self
    }

    /// Run the flow to completion. `on_started` is called once with the
    /// session so the caller can show the user code and URL.
    pub async fn run(&self, on_started: impl FnOnce(&DeviceSession)) -> Result<(), AuthError> {
        let mut on_started = Some(on_started);
        let mut state = LoginState::Idle;

        loop {
            state = match state {
                LoginState::Idle => match self.start().await {
                    Ok(session) => LoginState::Started(session),
                    Err(e) => LoginState::Failed(e),
                },
                LoginState::Started(session) => {
                    if let Some(notify) = on_started.take() {
                        notify(&session);
                    }
                    if self.open_browser {
                        self.open_verification_uri(&session.verification_uri);
                    }
                    LoginState::Polling {
                        session,
                        attempt: 0,
                    }
                }
                LoginState::Polling { session, attempt } => {
                    if session.is_expired() {
                        LoginState::TimedOut
                    } else if let Some(token) = self.poll_once(&session, attempt).await {
                        LoginState::Authenticated(token)
                    } else {
                        let pause = backoff::delay(session.interval, 0).min(session.remaining());
                        tokio::time::sleep(pause).await;
                        LoginState::Polling {
                            session,
                            attempt: attempt + 1,
                        }
                    }
                }
                LoginState::Authenticated(token) => {
                    self.store.save(&token)?;
                    info!("Login successful, credential stored");
                    return Ok(());
                }
                LoginState::TimedOut => {
                    warn!("Device authorization expired before approval");
                    return Err(AuthError::LoginTimedOut);
                }
                LoginState::Failed(e) => return Err(e),
            };
        }
    }

    async fn start(&self) -> Result<DeviceSession, AuthError> {
        let resp: StartResponse = self.client.post(START_PATH, None, false).await?;
        let session = DeviceSession::from_start(resp, Instant::now());
        debug!(?session, "Device authorization started");
        Ok(session)
    }

    /// One poll. Errors of any kind count as "still pending": the server may
    /// be briefly unavailable, or the user has not approved yet.
    async fn poll_once(&self, session: &DeviceSession, attempt: u32) -> Option<String> {
        let body = json!({ "device_code": session.device_code });
        match self
            .client
            .post::<PollResponse>(POLL_PATH, Some(&body), false)
            .await
        {
            Ok(PollResponse {
                access_token: Some(token),
                ..
            }) if !token.is_empty() => Some(token),
            Ok(resp) => {
                debug!(attempt, status = resp.status.as_deref().unwrap_or(""), "Authorization pending");
                None
            }
            Err(e) => {
                debug!(attempt, error = %e, "Poll failed, treating as pending");
                None
            }
        }
    }

    /// Best effort; the URL has already been printed for manual use.
    fn open_verification_uri(&self, url: &str) {
        if let Err(e) = (self.opener)(url) {
            debug!(error = %e, "Could not open browser");
        }
    }
}
