//! REST API client module for TextOnly services.
//!
//! This module provides the `ApiClient`, the one place where HTTP requests
//! are built and their statuses classified.
//!
//! Protected routes use bearer token authentication. The token comes from the
//! `TO_TOKEN` environment variable or from a `TokenProvider` injected by the
//! caller, normally backed by the credential store.

pub mod client;
pub mod error;

pub use client::{user_agent, ApiClient, TokenProvider, TOKEN_ENV_VAR};
pub use error::ApiError;
pub use reqwest::Method;
