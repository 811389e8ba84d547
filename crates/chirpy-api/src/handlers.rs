//! # chirpy-api Handlers
//!
//! This module coordinates the flow between inbound requests and Core traits.

use std::str::FromStr;

use chirpy_core::error::{AppError, AuthError, Result};
use chirpy_core::models::{Post, RecordId, RecordKind};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::middleware::{authenticate, authorize_webhook, bearer_token};
use crate::views::{AccountView, LoginView, TokenView};
use crate::AppState;

const PROFANE_WORDS: [&str; 3] = ["kerfuffle", "sharbert", "fornax"];

const UPGRADE_EVENT: &str = "user.upgraded";

const UNKNOWN_ACCOUNT_DECOY: &str = "chirpy-unknown-account";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChirpBody {
    body: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebhookEvent {
    event: String,
    data: WebhookData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebhookData {
    user_id: RecordId,
}

/// Listing order for chirps, by id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Anything other than `desc` sorts ascending.
impl FromStr for SortOrder {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(if s.eq_ignore_ascii_case("desc") { SortOrder::Desc } else { SortOrder::Asc })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Upgraded(RecordId),
    /// Event type we do not act on; still acknowledged.
    Ignored,
}

/// Maps each error kind to the status the HTTP layer should answer with.
pub fn status_for(err: &AppError) -> u16 {
    match err {
        AppError::Decode(_) | AppError::UnknownKind(_) => 400,
        AppError::Auth(_) => 401,
        AppError::Forbidden(_) => 403,
        AppError::NotFound { .. } => 404,
        AppError::DuplicateEmail(_) => 409,
        AppError::Storage(_) | AppError::Internal(_) => 500,
    }
}

/// Registers an account. Only email and password are taken from the body.
pub fn register(state: &AppState, body: &[u8]) -> Result<AccountView> {
    let credentials: Credentials = serde_json::from_slice(body)?;
    let payload = serde_json::to_vec(&json!({
        "email": credentials.email,
        "password": credentials.password,
    }))?;

    let record = state.repo.create(RecordKind::Account, &payload, None)?;
    let account = record
        .as_account()
        .ok_or_else(|| AppError::Internal("store returned a non-account record".into()))?;
    Ok(AccountView::from(account))
}

/// Verifies email and password, rotates the session token and issues a bearer token.
pub fn login(state: &AppState, body: &[u8]) -> Result<LoginView> {
    let credentials: Credentials = serde_json::from_slice(body)?;

    let account = state
        .repo
        .list(RecordKind::Account)?
        .into_iter()
        .filter_map(|record| record.into_account())
        .find(|account| account.email == credentials.email);

    // Unknown emails pay for one hash too, so timing does not reveal registration.
    let verified = match &account {
        Some(account) => state.auth.verify_password(&credentials.password, &account.password_hash),
        None => {
            let _ = state.auth.hash_password(UNKNOWN_ACCOUNT_DECOY);
            false
        }
    };
    let account = account.filter(|_| verified).ok_or_else(|| {
        debug!("login refused");
        AppError::Auth(AuthError::InvalidCredentials)
    })?;

    let session_token = state.auth.generate_session_token()?;
    state.repo.commit(&mut |snapshot| {
        let stored = snapshot
            .accounts
            .get_mut(&account.id)
            .ok_or(AppError::NotFound { kind: RecordKind::Account, id: account.id })?;
        stored.session_token = session_token.clone();
        Ok(())
    })?;

    let ttl = state
        .access_token_ttl
        .min(std::time::Duration::from_secs(account.session_ttl_seconds));
    let token = state.auth.issue_bearer_token(account.id, ttl)?;

    info!(account_id = account.id, "login succeeded");
    Ok(LoginView {
        id: account.id,
        email: account.email,
        is_chirpy_red: account.privilege_flag,
        token,
        refresh_token: session_token,
    })
}

/// Trades a session token for a fresh bearer token.
pub fn refresh(state: &AppState, authorization: Option<&str>) -> Result<TokenView> {
    let presented = bearer_token(authorization)?;

    let account = state
        .repo
        .list(RecordKind::Account)?
        .into_iter()
        .filter_map(|record| record.into_account())
        .find(|account| state.auth.compare_session_tokens(presented, &account.session_token))
        .ok_or(AppError::Auth(AuthError::SessionMismatch))?;

    let ttl = state
        .access_token_ttl
        .min(std::time::Duration::from_secs(account.session_ttl_seconds));
    let token = state.auth.issue_bearer_token(account.id, ttl)?;
    Ok(TokenView { token })
}

/// Clears the session token that was presented.
pub fn revoke(state: &AppState, authorization: Option<&str>) -> Result<()> {
    let presented = bearer_token(authorization)?;

    let mut revoked = None;
    state.repo.commit(&mut |snapshot| {
        let account_id = snapshot
            .accounts
            .values()
            .find(|account| state.auth.compare_session_tokens(presented, &account.session_token))
            .map(|account| account.id)
            .ok_or(AppError::Auth(AuthError::SessionMismatch))?;
        snapshot.revoke_session(account_id);
        revoked = Some(account_id);
        Ok(())
    })?;

    info!(account_id = ?revoked, "session revoked");
    Ok(())
}

/// Changes the caller's own email and/or password.
pub fn update_account(state: &AppState, authorization: Option<&str>, body: &[u8]) -> Result<AccountView> {
    let account_id = authenticate(state, authorization)?;
    let credentials: Credentials = serde_json::from_slice(body)?;
    let payload = serde_json::to_vec(&json!({
        "email": credentials.email,
        "password": credentials.password,
    }))?;

    let record = state.repo.update(RecordKind::Account, &payload, account_id)?;
    let account = record
        .as_account()
        .ok_or_else(|| AppError::Internal("store returned a non-account record".into()))?;
    Ok(AccountView::from(account))
}

/// Posts a chirp as the authenticated account.
pub fn create_chirp(state: &AppState, authorization: Option<&str>, body: &[u8]) -> Result<Post> {
    let author_id = authenticate(state, authorization)?;
    let chirp: ChirpBody = serde_json::from_slice(body)?;
    let payload = serde_json::to_vec(&json!({ "body": clean_body(&chirp.body) }))?;

    state
        .repo
        .create(RecordKind::Post, &payload, Some(author_id))?
        .into_post()
        .ok_or_else(|| AppError::Internal("store returned a non-post record".into()))
}

pub fn list_chirps(state: &AppState, order: SortOrder) -> Result<Vec<Post>> {
    let mut posts: Vec<Post> = state
        .repo
        .list(RecordKind::Post)?
        .into_iter()
        .filter_map(|record| record.into_post())
        .collect();

    match order {
        SortOrder::Asc => posts.sort_by_key(|post| post.id),
        SortOrder::Desc => posts.sort_by(|a, b| b.id.cmp(&a.id)),
    }
    Ok(posts)
}

pub fn get_chirp(state: &AppState, id: RecordId) -> Result<Post> {
    state
        .repo
        .get(RecordKind::Post, id)?
        .into_post()
        .ok_or(AppError::NotFound { kind: RecordKind::Post, id })
}

/// Deletes a chirp. Only its author may; the check and the removal share one
/// critical section so nothing changes when the caller is refused.
pub fn delete_chirp(state: &AppState, authorization: Option<&str>, id: RecordId) -> Result<()> {
    let account_id = authenticate(state, authorization)?;

    state.repo.commit(&mut |snapshot| {
        let post = snapshot
            .posts
            .get(&id)
            .ok_or(AppError::NotFound { kind: RecordKind::Post, id })?;
        if post.author_id != account_id {
            return Err(AppError::Forbidden(format!("chirp {id} belongs to another account")));
        }
        snapshot.remove(RecordKind::Post, id);
        Ok(())
    })?;

    info!(id, account_id, "chirp deleted");
    Ok(())
}

/// Payment-provider webhook. Gated by the shared api key, not by bearer tokens.
pub fn handle_webhook(state: &AppState, authorization: Option<&str>, body: &[u8]) -> Result<WebhookOutcome> {
    authorize_webhook(state, authorization)?;
    let event: WebhookEvent = serde_json::from_slice(body)?;

    if event.event != UPGRADE_EVENT {
        debug!(event = %event.event, "webhook event ignored");
        return Ok(WebhookOutcome::Ignored);
    }

    let user_id = event.data.user_id;
    state
        .repo
        .update(RecordKind::Account, br#"{"is_chirpy_red":true}"#, user_id)?;

    info!(account_id = user_id, "account upgraded");
    Ok(WebhookOutcome::Upgraded(user_id))
}

/// Masks profane words. Words are split on single spaces and matched
/// case-insensitively; punctuation attached to a word prevents a match.
pub fn clean_body(body: &str) -> String {
    body.split(' ')
        .map(|word| {
            let lowered = word.to_lowercase();
            if PROFANE_WORDS.contains(&lowered.as_str()) {
                "****"
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
