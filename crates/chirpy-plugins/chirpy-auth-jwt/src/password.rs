//! Argon2id password hashing.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use chirpy_core::error::{AppError, Result};

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

pub(crate) fn hasher(cost: PasswordCost) -> Result<Argon2<'static>> {
    let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
        .map_err(|e| AppError::Internal(format!("invalid argon2 cost: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// True if `value` is already an argon2 PHC string, i.e. the output of [`hash`].
pub fn is_hashed(value: &str) -> bool {
    value.starts_with("$argon2") && PasswordHash::new(value).is_ok()
}

/// Hashes `plaintext` with a fresh salt. Already-hashed input is stored as-is
/// so carrying a hash forward through an update never double-hashes it.
pub(crate) fn hash(argon2: &Argon2<'_>, plaintext: &str) -> Result<String> {
    if is_hashed(plaintext) {
        return Ok(plaintext.to_string());
    }

    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

/// Verifies `plaintext` against a stored hash. Unparseable hashes never match.
pub(crate) fn verify(argon2: &Argon2<'_>, plaintext: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(_) => return false,
    };
    argon2.verify_password(plaintext.as_bytes(), &parsed_hash).is_ok()
}
