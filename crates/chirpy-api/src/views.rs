//! Response shapes. Password hashes never appear in any of them.

use chirpy_core::models::{Account, RecordId};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountView {
    pub id: RecordId,
    pub email: String,
    pub is_chirpy_red: bool,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            is_chirpy_red: account.privilege_flag,
        }
    }
}

/// Returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginView {
    pub id: RecordId,
    pub email: String,
    pub is_chirpy_red: bool,
    /// Bearer token.
    pub token: String,
    /// Session token for `refresh` and `revoke`.
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenView {
    pub token: String,
}
