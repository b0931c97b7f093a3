//! Authentication module for acquiring and managing the bearer token.
//!
//! This module provides:
//! - `CredentialStore`: OS keychain storage with a permissioned file fallback
//! - `LoginFlow`: the device-authorization login state machine
//! - `logout` and `whoami` helpers built on the API client
//!
//! The token has no client-side expiry; the server rejecting it with a 401 is
//! the only signal that a new login is needed.

pub mod credentials;
pub mod device;
pub mod error;
pub mod identity;
pub mod logout;

pub use credentials::{CredentialStore, FileBackend, KeyringBackend, SecretBackend};
pub use device::{DeviceSession, LoginFlow};
pub use error::AuthError;
pub use identity::{identity_summary, whoami};
pub use logout::logout;
