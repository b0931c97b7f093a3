//! Core library for the TextOnly CLI.
//!
//! Everything a command needs to talk to the API as the logged-in user:
//! the HTTP client, the credential store, the device login flow, and the
//! shared backoff helper.

pub mod api;
pub mod auth;
pub mod backoff;
pub mod config;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, CredentialStore};
pub use config::Config;
