//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Record, RecordId, RecordKind, Snapshot};

/// Verified content of a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account the token speaks for.
    pub subject: RecordId,
    pub issuer: String,
    pub expires_at: DateTime<Utc>,
}

/// Data persistence contract for posts and accounts.
///
/// Every mutating call is one read-modify-write of the whole snapshot under an
/// exclusive guard; reads share the guard.
pub trait RecordRepo: Send + Sync {
    /// Decodes `payload`, assigns a fresh id and persists. `author_id`, when
    /// given, overrides the payload's author for posts.
    fn create(&self, kind: RecordKind, payload: &[u8], author_id: Option<RecordId>) -> Result<Record>;

    /// Rewrites the record with id `id` from `payload` and persists.
    fn update(&self, kind: RecordKind, payload: &[u8], id: RecordId) -> Result<Record>;

    /// Copies of every record of `kind`, ascending by id.
    fn list(&self, kind: RecordKind) -> Result<Vec<Record>>;

    fn get(&self, kind: RecordKind, id: RecordId) -> Result<Record>;

    /// 1-based position in the id-ascending listing. Prefer [`RecordRepo::get`].
    fn get_by_ordinal(&self, kind: RecordKind, ordinal: usize) -> Result<Record>;

    /// Returns the snapshot without `id`. Does NOT persist; hand the result to
    /// [`RecordRepo::persist`].
    fn delete(&self, kind: RecordKind, id: RecordId) -> Result<Snapshot>;

    /// Returns the snapshot with the account's session token cleared. Does NOT persist.
    fn revoke_session(&self, account_id: RecordId) -> Result<Snapshot>;

    /// Replaces the stored snapshot wholesale.
    fn persist(&self, snapshot: &Snapshot) -> Result<()>;

    /// Loads, applies `mutation` and persists, all inside one exclusive
    /// critical section. Nothing is written if `mutation` fails.
    fn commit(&self, mutation: &mut dyn FnMut(&mut Snapshot) -> Result<()>) -> Result<()>;

    /// True if no account holds `email`.
    fn validate_email_unique(&self, email: &str) -> Result<bool>;
}

/// Password hashing, session tokens and bearer tokens.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait CredentialProvider: Send + Sync {
    /// One-way salted hash. Values already in hash form are returned as-is.
    fn hash_password(&self, plaintext: &str) -> Result<String>;

    fn verify_password(&self, plaintext: &str, hash: &str) -> bool;

    /// 32 random bytes, hex-encoded.
    fn generate_session_token(&self) -> Result<String>;

    fn issue_bearer_token(&self, account_id: RecordId, ttl: Duration) -> Result<String>;

    fn validate_bearer_token(&self, token: &str) -> Result<Claims>;

    /// Constant-time comparison of two hex tokens. Undecodable or empty tokens never match.
    fn compare_session_tokens(&self, presented: &str, stored: &str) -> bool;
}

/// Time source for token expiry.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
