//! # AppError
//!
//! Centralized error handling for the Chirpy ecosystem.
//! Every store and credential operation returns one of these to its caller;
//! nothing is swallowed and nothing is fatal to the process.

use thiserror::Error;

use crate::models::{RecordId, RecordKind};

/// Reasons a bearer token, session token or password check was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token was signed with an unexpected algorithm")]
    UnexpectedAlgorithm,

    #[error("token has expired")]
    Expired,

    /// Subject claim missing, empty, or not an account id.
    #[error("token subject missing")]
    MissingSubject,

    #[error("token issuer mismatch")]
    InvalidIssuer,

    /// Structurally broken token (bad base64, bad JSON, missing claims).
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("wrong email or password")]
    InvalidCredentials,

    #[error("session token does not match any account")]
    SessionMismatch,

    #[error("authorization header missing or malformed")]
    MissingCredentials,
}

/// The primary error type for all chirpy-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Structurally invalid payload, either inbound or persisted.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Kind discriminator that names neither posts nor accounts.
    #[error("unknown record kind `{0}`")]
    UnknownKind(String),

    #[error("{kind} not found with ID {id}")]
    NotFound { kind: RecordKind, id: RecordId },

    #[error("email `{0}` is already registered")]
    DuplicateEmail(String),

    #[error("unauthorized: {0}")]
    Auth(#[from] AuthError),

    /// Authenticated, but not allowed to touch this record.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Reading or writing the snapshot file failed.
    #[error("storage I/O error: {0}")]
    Storage(#[from] std::io::Error),

    /// Infrastructure failure (e.g., hashing backend, token signer)
    #[error("internal service error: {0}")]
    Internal(String),
}

/// A specialized Result type for Chirpy logic.
pub type Result<T> = std::result::Result<T, AppError>;
