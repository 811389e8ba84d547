//! chirpy/crates/chirpy-api/src/middleware.rs
//!
//! Authorization header parsing and the bearer-token gate in front of every
//! authenticated store mutation.

use chirpy_core::error::{AuthError, Result};
use chirpy_core::models::RecordId;
use secrecy::ExposeSecret;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::AppState;

/// Extracts `<token>` from `Bearer <token>`.
pub fn bearer_token(authorization: Option<&str>) -> Result<&str> {
    scheme_value(authorization, "Bearer")
}

/// Extracts `<key>` from `ApiKey <key>`.
pub fn api_key(authorization: Option<&str>) -> Result<&str> {
    scheme_value(authorization, "ApiKey")
}

fn scheme_value<'a>(authorization: Option<&'a str>, scheme: &str) -> Result<&'a str> {
    let value = authorization
        .map(str::trim)
        .and_then(|header| header.strip_prefix(scheme))
        .filter(|rest| rest.starts_with(' '))
        .map(str::trim)
        .unwrap_or_default();

    if value.is_empty() {
        return Err(AuthError::MissingCredentials.into());
    }
    Ok(value)
}

/// Resolves the account behind a bearer token.
pub fn authenticate(state: &AppState, authorization: Option<&str>) -> Result<RecordId> {
    let token = bearer_token(authorization)?;
    match state.auth.validate_bearer_token(token) {
        Ok(claims) => Ok(claims.subject),
        Err(e) => {
            warn!(error = %e, "bearer token rejected");
            Err(e)
        }
    }
}

/// Checks the webhook shared secret.
pub fn authorize_webhook(state: &AppState, authorization: Option<&str>) -> Result<()> {
    let presented = api_key(authorization)?;
    let expected = state
        .webhook_api_key
        .as_ref()
        .map(|key| key.expose_secret())
        .filter(|key| !key.is_empty());

    match expected {
        Some(expected) if bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) => Ok(()),
        _ => {
            warn!("webhook api key rejected");
            Err(AuthError::InvalidCredentials.into())
        }
    }
}
