//! # chirpy-db-json
//!
//! `RecordRepo` over a single JSON snapshot file.
//!
//! One `JsonRecordStore` is built at process start and shared by reference.
//! It owns the only lock on the file: reads share it, and every mutation holds
//! it exclusively across load, id assignment, change and rewrite.

mod snapshot_file;

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chirpy_core::error::{AppError, Result};
use chirpy_core::models::{
    decode, Account, Identified, Record, RecordId, RecordKind, Snapshot, DEFAULT_SESSION_TTL_SECS,
};
use chirpy_core::traits::{CredentialProvider, RecordRepo};
use tracing::{debug, info, instrument};

pub struct JsonRecordStore {
    path: PathBuf,
    guard: RwLock<()>,
    credentials: Arc<dyn CredentialProvider>,
}

impl JsonRecordStore {
    /// Opens the snapshot at `path`, creating an empty one if absent.
    pub fn open(path: impl Into<PathBuf>, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        let path = path.into();
        if snapshot_file::ensure(&path)? {
            info!(path = %path.display(), "created empty snapshot");
        }
        Ok(Self { path, guard: RwLock::new(()), credentials })
    }

    /// Deletes the snapshot file so the next `open` starts empty.
    pub fn reset(path: &Path) -> Result<()> {
        if snapshot_file::remove(path)? {
            info!(path = %path.display(), "snapshot deleted");
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // The guard protects no data of its own and the file is replaced by
    // rename, so a panic in another holder leaves nothing half-done.
    fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.guard.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.guard.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn load_shared(&self) -> Result<Snapshot> {
        let _guard = self.shared();
        snapshot_file::load(&self.path)
    }

    /// Hashes the password, issues a session token and defaults the TTL.
    /// Pure with respect to the snapshot, so it runs before the exclusive guard.
    fn prepare_new_account(&self, account: &mut Account) -> Result<()> {
        account.password_hash = self.credentials.hash_password(&account.password_hash)?;
        account.session_token = self.credentials.generate_session_token()?;
        if account.session_ttl_seconds == 0 {
            account.session_ttl_seconds = DEFAULT_SESSION_TTL_SECS;
        }
        Ok(())
    }
}

fn not_found(kind: RecordKind, id: RecordId) -> AppError {
    AppError::NotFound { kind, id }
}

/// Folds profile changes into the stored account. Empty email, empty password
/// and zero TTL mean "unchanged"; the privilege flag only moves when present.
fn apply_account_changes(
    stored: &mut Account,
    changes: Account,
    new_hash: Option<String>,
    privilege: Option<bool>,
) {
    if let Some(hash) = new_hash {
        if hash != stored.password_hash {
            stored.session_token.clear();
        }
        stored.password_hash = hash;
    }
    if !changes.email.is_empty() {
        stored.email = changes.email;
    }
    if let Some(flag) = privilege {
        stored.privilege_flag = flag;
    }
    stored.session_ttl_seconds = match (changes.session_ttl_seconds, stored.session_ttl_seconds) {
        (0, 0) => DEFAULT_SESSION_TTL_SECS,
        (0, existing) => existing,
        (requested, _) => requested,
    };
}

impl RecordRepo for JsonRecordStore {
    #[instrument(skip(self, payload), fields(kind = %kind))]
    fn create(&self, kind: RecordKind, payload: &[u8], author_id: Option<RecordId>) -> Result<Record> {
        // 1. Decode and validate before touching anything
        let mut record = decode(kind, payload)?;

        match &mut record {
            Record::Post(post) => {
                if let Some(author_id) = author_id {
                    post.author_id = author_id;
                }
            }
            Record::Account(account) => {
                if !self.validate_email_unique(&account.email)? {
                    return Err(AppError::DuplicateEmail(account.email.clone()));
                }
                // 2. Credentials are expensive; keep them out of the critical section
                self.prepare_new_account(account)?;
            }
        }

        // 3. Id assignment and persistence form one critical section
        let _guard = self.exclusive();
        let mut snapshot = snapshot_file::load(&self.path)?;

        if let Record::Account(account) = &record {
            if snapshot.email_taken(&account.email, None) {
                return Err(AppError::DuplicateEmail(account.email.clone()));
            }
        }

        let id = snapshot.next_id(kind)?;
        record.set_id(id);
        snapshot.insert(record.clone());
        snapshot_file::write(&self.path, &snapshot)?;

        info!(id, "record created");
        Ok(record)
    }

    #[instrument(skip(self, payload), fields(kind = %kind))]
    fn update(&self, kind: RecordKind, payload: &[u8], id: RecordId) -> Result<Record> {
        let incoming = decode(kind, payload)?;

        let privilege = match &incoming {
            Record::Account(changes) => {
                let fields: serde_json::Value = serde_json::from_slice(payload)?;
                fields.get("is_chirpy_red").map(|_| changes.privilege_flag)
            }
            Record::Post(_) => None,
        };

        let new_hash = match &incoming {
            Record::Account(changes) if !changes.password_hash.is_empty() => {
                Some(self.credentials.hash_password(&changes.password_hash)?)
            }
            _ => None,
        };

        let _guard = self.exclusive();
        let mut snapshot = snapshot_file::load(&self.path)?;

        let updated = match incoming {
            // Post bodies are immutable; only the id is rebound.
            Record::Post(_) => {
                let mut post = snapshot.posts.get(&id).cloned().ok_or_else(|| not_found(kind, id))?;
                post.set_id(id);
                Record::Post(post)
            }
            Record::Account(changes) => {
                let mut account = snapshot
                    .accounts
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| not_found(kind, id))?;

                if !changes.email.is_empty() && snapshot.email_taken(&changes.email, Some(id)) {
                    return Err(AppError::DuplicateEmail(changes.email));
                }

                apply_account_changes(&mut account, changes, new_hash, privilege);
                account.set_id(id);
                Record::Account(account)
            }
        };

        snapshot.insert(updated.clone());
        snapshot_file::write(&self.path, &snapshot)?;

        info!(id, "record updated");
        Ok(updated)
    }

    fn list(&self, kind: RecordKind) -> Result<Vec<Record>> {
        Ok(self.load_shared()?.records(kind))
    }

    fn get(&self, kind: RecordKind, id: RecordId) -> Result<Record> {
        self.load_shared()?.get(kind, id).ok_or_else(|| not_found(kind, id))
    }

    fn get_by_ordinal(&self, kind: RecordKind, ordinal: usize) -> Result<Record> {
        let missing = || not_found(kind, RecordId::try_from(ordinal).unwrap_or(RecordId::MAX));
        let position = ordinal.checked_sub(1).ok_or_else(missing)?;
        self.list(kind)?.into_iter().nth(position).ok_or_else(missing)
    }

    #[instrument(skip(self), fields(kind = %kind))]
    fn delete(&self, kind: RecordKind, id: RecordId) -> Result<Snapshot> {
        let mut snapshot = self.load_shared()?;
        if snapshot.remove(kind, id).is_none() {
            debug!(id, "delete of absent record ignored");
        }
        Ok(snapshot)
    }

    #[instrument(skip(self))]
    fn revoke_session(&self, account_id: RecordId) -> Result<Snapshot> {
        let mut snapshot = self.load_shared()?;
        if !snapshot.revoke_session(account_id) {
            debug!(account_id, "revoke for absent account ignored");
        }
        Ok(snapshot)
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let _guard = self.exclusive();
        snapshot_file::write(&self.path, snapshot)
    }

    fn commit(&self, mutation: &mut dyn FnMut(&mut Snapshot) -> Result<()>) -> Result<()> {
        let _guard = self.exclusive();
        let mut snapshot = snapshot_file::load(&self.path)?;
        mutation(&mut snapshot)?;
        snapshot_file::write(&self.path, &snapshot)
    }

    fn validate_email_unique(&self, email: &str) -> Result<bool> {
        Ok(!self.load_shared()?.email_taken(email, None))
    }
}
