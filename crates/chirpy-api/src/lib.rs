//! # chirpy-api
//!
//! Request flows behind the HTTP surface.
//!
//! Everything here is transport-agnostic: a router hands in the raw body and
//! the `Authorization` header it already read, and gets typed views or an
//! `AppError` back. `status_for` gives the status code for each error kind.

pub mod handlers;
pub mod middleware;
pub mod views;

use std::sync::Arc;
use std::time::Duration;

use chirpy_core::traits::{CredentialProvider, RecordRepo};
use secrecy::SecretString;

pub use handlers::{status_for, SortOrder, WebhookOutcome};

/// State shared across all request handlers.
pub struct AppState {
    pub repo: Arc<dyn RecordRepo>,
    pub auth: Arc<dyn CredentialProvider>,
    /// Upper bound on bearer token lifetime.
    pub access_token_ttl: Duration,
    /// Webhooks are refused outright when unset.
    pub webhook_api_key: Option<SecretString>,
}
