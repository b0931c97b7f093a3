//! Command implementations on top of `textonly-core`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use textonly_core::api::Method;
use textonly_core::auth::{self, identity::ME_PATH, LoginFlow};
use textonly_core::{ApiClient, ApiError, Config, CredentialStore};
use tracing::debug;

/// Connectivity probe timeout for `doctor`
const DOCTOR_TIMEOUT_SECS: u64 = 5;

/// What every command needs: where the API is, and the credential.
pub struct Context {
    pub base_url: String,
    pub client: ApiClient,
    pub store: Arc<CredentialStore>,
}

impl Context {
    pub fn new(api_override: Option<&str>) -> Result<Self> {
        let config = Config::load()?;
        let base_url = config.api_base_url(api_override);
        debug!(base_url = %base_url, "Resolved API base URL");

        let store = Arc::new(CredentialStore::default_store()?);
        let provider_store = store.clone();
        let client = ApiClient::new(&base_url)
            .context("Failed to create HTTP client")?
            .with_token_provider(move || provider_store.load().map_err(anyhow::Error::from));

        Ok(Self {
            base_url,
            client,
            store,
        })
    }
}

pub async fn login(ctx: &Context, no_open: bool) -> Result<()> {
    LoginFlow::new(&ctx.client, &ctx.store)
        .open_browser(!no_open)
        .run(|session| {
            println!(
                "Go to {} and enter code: {}",
                session.verification_uri, session.user_code
            );
            let minutes = session.minutes_until_expiry();
            if minutes > 0 {
                println!("The code expires in {} minutes.", minutes);
            }
        })
        .await?;
    println!("login successful");
    Ok(())
}

pub async fn logout(ctx: &Context) -> Result<()> {
    auth::logout(&ctx.client, &ctx.store).await?;
    println!("logged out");
    Ok(())
}

pub async fn whoami(ctx: &Context, as_json: bool) -> Result<()> {
    let me = auth::whoami(&ctx.client).await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&me)?);
    } else {
        println!("{}", auth::identity_summary(&me));
    }
    Ok(())
}

/// Report reachability of the API and whether a token is stored.
/// Problems are printed, never returned.
pub async fn doctor(ctx: &Context) -> Result<()> {
    println!("API: {}", ctx.base_url);

    let probe = ApiClient::with_timeout(&ctx.base_url, Duration::from_secs(DOCTOR_TIMEOUT_SECS))?;
    let outcome = probe.status_of(Method::GET, ME_PATH).await;
    println!("{}", network_report(&outcome));

    match ctx.store.load() {
        Ok(_) => println!("auth: token present"),
        Err(e) => println!("auth: {}", e),
    }
    Ok(())
}

/// `/me` answers 200 with a token and 401 without one; both mean the API is
/// reachable. Anything else is reported as-is.
fn network_report(outcome: &Result<u16, ApiError>) -> String {
    match outcome {
        Ok(200) | Ok(401) => "network: ok".to_string(),
        Ok(status) => format!("network: unexpected status {}", status),
        Err(e) => format!("network: {}", e),
    }
}

pub fn version() {
    println!(
        "to {} ({} {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}
