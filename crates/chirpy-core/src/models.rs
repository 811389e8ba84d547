//! # Domain Models
//!
//! These structs represent the core entities of Chirpy.
//! Identifiers are small positive integers assigned by the store, never by clients.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Identifier of a post or an account. Always `>= 1` once stored.
pub type RecordId = u32;

/// Session lifetime applied when an account does not carry its own (60 days).
pub const DEFAULT_SESSION_TTL_SECS: u64 = 5_184_000;

/// Selects which collection of the snapshot an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Post,
    Account,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Post => "post",
            RecordKind::Account => "account",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts both the domain names and the wire names ("chirp", "user").
impl FromStr for RecordKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "post" | "chirp" | "chirps" => Ok(RecordKind::Post),
            "account" | "user" | "users" => Ok(RecordKind::Account),
            other => Err(AppError::UnknownKind(other.to_string())),
        }
    }
}

/// Uniform identifier access so the store can assign ids without caring
/// which entity it holds.
pub trait Identified {
    fn get_id(&self) -> RecordId;
    fn set_id(&mut self, id: RecordId);
}

/// A short text message ("chirp").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Post {
    pub id: RecordId,
    pub body: String,
    pub author_id: RecordId,
}

/// A registered user.
///
/// Field names on the wire follow the service's public JSON contract, which is
/// also the layout of the persisted snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    pub id: RecordId,
    pub email: String,
    /// Plaintext on the way in, a PHC hash string once stored.
    #[serde(rename = "password")]
    pub password_hash: String,
    /// Hex-encoded refresh token. Empty when revoked.
    #[serde(rename = "refresh_token")]
    pub session_token: String,
    #[serde(rename = "expires_in_seconds")]
    pub session_ttl_seconds: u64,
    #[serde(rename = "is_chirpy_red")]
    pub privilege_flag: bool,
}

impl Identified for Post {
    fn get_id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }
}

impl Identified for Account {
    fn get_id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }
}

/// Either entity kind. Serializes as the bare inner entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Post(Post),
    Account(Account),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Post(_) => RecordKind::Post,
            Record::Account(_) => RecordKind::Account,
        }
    }

    pub fn as_post(&self) -> Option<&Post> {
        match self {
            Record::Post(post) => Some(post),
            Record::Account(_) => None,
        }
    }

    pub fn as_account(&self) -> Option<&Account> {
        match self {
            Record::Account(account) => Some(account),
            Record::Post(_) => None,
        }
    }

    pub fn into_post(self) -> Option<Post> {
        match self {
            Record::Post(post) => Some(post),
            Record::Account(_) => None,
        }
    }

    pub fn into_account(self) -> Option<Account> {
        match self {
            Record::Account(account) => Some(account),
            Record::Post(_) => None,
        }
    }
}

impl Identified for Record {
    fn get_id(&self) -> RecordId {
        match self {
            Record::Post(post) => post.get_id(),
            Record::Account(account) => account.get_id(),
        }
    }

    fn set_id(&mut self, id: RecordId) {
        match self {
            Record::Post(post) => post.set_id(id),
            Record::Account(account) => account.set_id(id),
        }
    }
}

/// Decodes an untyped JSON payload into the entity selected by `kind`.
///
/// Missing fields fall back to their zero values; only structurally invalid
/// input (bad encoding, wrong JSON types) is rejected.
pub fn decode(kind: RecordKind, payload: &[u8]) -> Result<Record> {
    let record = match kind {
        RecordKind::Post => Record::Post(serde_json::from_slice(payload)?),
        RecordKind::Account => Record::Account(serde_json::from_slice(payload)?),
    };
    Ok(record)
}

/// The complete persisted state: the unit of durability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    #[serde(rename = "chirps")]
    pub posts: BTreeMap<RecordId, Post>,
    #[serde(rename = "users")]
    pub accounts: BTreeMap<RecordId, Account>,
}

impl Snapshot {
    pub fn len(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Post => self.posts.len(),
            RecordKind::Account => self.accounts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty() && self.accounts.is_empty()
    }

    /// Next free identifier for `kind`.
    ///
    /// For a collection without holes this is `size + 1`. After deletes the
    /// highest id wins so an existing record is never overwritten. Fails once
    /// the highest id is `RecordId::MAX`.
    pub fn next_id(&self, kind: RecordKind) -> Result<RecordId> {
        let highest = match kind {
            RecordKind::Post => self.posts.keys().next_back(),
            RecordKind::Account => self.accounts.keys().next_back(),
        };
        match highest {
            None => Ok(1),
            Some(id) => id
                .checked_add(1)
                .ok_or_else(|| AppError::Internal(format!("{kind} id space exhausted"))),
        }
    }

    pub fn get(&self, kind: RecordKind, id: RecordId) -> Option<Record> {
        match kind {
            RecordKind::Post => self.posts.get(&id).cloned().map(Record::Post),
            RecordKind::Account => self.accounts.get(&id).cloned().map(Record::Account),
        }
    }

    /// Copies of every record of `kind`, ascending by id.
    pub fn records(&self, kind: RecordKind) -> Vec<Record> {
        match kind {
            RecordKind::Post => self.posts.values().cloned().map(Record::Post).collect(),
            RecordKind::Account => self.accounts.values().cloned().map(Record::Account).collect(),
        }
    }

    /// Inserts or replaces a record under its own id.
    pub fn insert(&mut self, record: Record) {
        match record {
            Record::Post(post) => {
                self.posts.insert(post.id, post);
            }
            Record::Account(account) => {
                self.accounts.insert(account.id, account);
            }
        }
    }

    /// Removes a record; absent ids are a no-op.
    pub fn remove(&mut self, kind: RecordKind, id: RecordId) -> Option<Record> {
        match kind {
            RecordKind::Post => self.posts.remove(&id).map(Record::Post),
            RecordKind::Account => self.accounts.remove(&id).map(Record::Account),
        }
    }

    /// True if any account other than `except` holds `email`.
    pub fn email_taken(&self, email: &str, except: Option<RecordId>) -> bool {
        self.accounts
            .values()
            .any(|account| account.email == email && Some(account.id) != except)
    }

    pub fn account_by_email(&self, email: &str) -> Option<&Account> {
        self.accounts.values().find(|account| account.email == email)
    }

    /// Clears the session token of `account_id`. Returns false if no such account.
    pub fn revoke_session(&mut self, account_id: RecordId) -> bool {
        match self.accounts.get_mut(&account_id) {
            Some(account) => {
                account.session_token.clear();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_post_defaults_missing_fields() {
        let record = decode(RecordKind::Post, br#"{"body":"hello"}"#).unwrap();
        assert_eq!(
            record,
            Record::Post(Post { id: 0, body: "hello".into(), author_id: 0 })
        );
    }

    #[test]
    fn test_decode_account_uses_wire_names() {
        let payload = br#"{"email":"a@x.com","password":"p","is_chirpy_red":true,"expires_in_seconds":60}"#;
        let account = decode(RecordKind::Account, payload).unwrap().into_account().unwrap();
        assert_eq!(account.email, "a@x.com");
        assert_eq!(account.password_hash, "p");
        assert!(account.privilege_flag);
        assert_eq!(account.session_ttl_seconds, 60);
        assert!(account.session_token.is_empty());
    }

    #[test]
    fn test_decode_rejects_type_mismatch_and_garbage() {
        assert!(matches!(
            decode(RecordKind::Post, br#"{"body":42}"#),
            Err(AppError::Decode(_))
        ));
        assert!(matches!(
            decode(RecordKind::Account, b"\xff\xfe not json"),
            Err(AppError::Decode(_))
        ));
    }

    #[test]
    fn test_kind_parsing_accepts_wire_aliases() {
        assert_eq!("chirp".parse::<RecordKind>().unwrap(), RecordKind::Post);
        assert_eq!("users".parse::<RecordKind>().unwrap(), RecordKind::Account);
        assert!(matches!(
            "boards".parse::<RecordKind>(),
            Err(AppError::UnknownKind(k)) if k == "boards"
        ));
    }

    #[test]
    fn test_set_id_through_record() {
        let mut record = Record::Account(Account::default());
        record.set_id(4);
        assert_eq!(record.get_id(), 4);
        assert_eq!(record.kind(), RecordKind::Account);
    }

    #[test]
    fn test_next_id_is_size_plus_one_and_survives_holes() {
        let mut snapshot = Snapshot::default();
        assert_eq!(snapshot.next_id(RecordKind::Post).unwrap(), 1);

        for id in 1..=3 {
            snapshot.insert(Record::Post(Post { id, ..Post::default() }));
        }
        assert_eq!(snapshot.next_id(RecordKind::Post).unwrap(), 4);

        snapshot.remove(RecordKind::Post, 1);
        assert_eq!(snapshot.next_id(RecordKind::Post).unwrap(), 4);
        assert_eq!(snapshot.next_id(RecordKind::Account).unwrap(), 1);
    }

    #[test]
    fn test_next_id_refuses_to_wrap() {
        let mut snapshot = Snapshot::default();
        snapshot.insert(Record::Post(Post { id: RecordId::MAX, ..Post::default() }));

        assert!(matches!(snapshot.next_id(RecordKind::Post), Err(AppError::Internal(_))));
        assert_eq!(snapshot.next_id(RecordKind::Account).unwrap(), 1);
    }

    #[test]
    fn test_snapshot_json_layout() {
        let mut snapshot = Snapshot::default();
        snapshot.insert(Record::Post(Post { id: 1, body: "hi".into(), author_id: 2 }));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["chirps"]["1"]["body"], "hi");
        assert!(json["users"].as_object().unwrap().is_empty());

        let back: Snapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_email_taken_ignores_self() {
        let mut snapshot = Snapshot::default();
        snapshot.insert(Record::Account(Account {
            id: 1,
            email: "a@x.com".into(),
            ..Account::default()
        }));

        assert!(snapshot.email_taken("a@x.com", None));
        assert!(!snapshot.email_taken("a@x.com", Some(1)));
        assert!(!snapshot.email_taken("b@x.com", None));
    }

    #[test]
    fn test_revoke_session_clears_token() {
        let mut snapshot = Snapshot::default();
        snapshot.insert(Record::Account(Account {
            id: 3,
            session_token: "ab".repeat(32),
            ..Account::default()
        }));

        assert!(snapshot.revoke_session(3));
        assert!(snapshot.accounts[&3].session_token.is_empty());
        assert!(!snapshot.revoke_session(99));
    }
}
