//! Refresh ("session") tokens: 32 random bytes, hex-encoded.

use chirpy_core::error::{AppError, Result};
use subtle::ConstantTimeEq;

pub const SESSION_TOKEN_BYTES: usize = 32;

pub(crate) fn generate() -> Result<String> {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| AppError::Internal(format!("system randomness unavailable: {e}")))?;
    Ok(hex::encode(bytes))
}

/// Compares two hex tokens without short-circuiting on the first differing byte.
/// A revoked (empty) stored token or any undecodable side is a non-match.
pub(crate) fn compare(presented: &str, stored: &str) -> bool {
    if stored.is_empty() || presented.is_empty() {
        return false;
    }

    let (Ok(presented), Ok(stored)) = (hex::decode(presented), hex::decode(stored)) else {
        return false;
    };

    presented.ct_eq(&stored).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_token_shape() {
        let token = generate().unwrap();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate().unwrap());
    }

    #[test]
    fn test_compare_matches_case_insensitively() {
        let token = generate().unwrap();
        assert!(compare(&token, &token));
        assert!(compare(&token.to_uppercase(), &token));
    }

    #[test]
    fn test_compare_rejects_mismatch_and_garbage() {
        let token = generate().unwrap();
        assert!(!compare(&generate().unwrap(), &token));
        assert!(!compare("not-hex", &token));
        assert!(!compare(&token, "zz"));
        assert!(!compare(&token[..62], &token));
    }

    #[test]
    fn test_empty_stored_token_never_matches() {
        assert!(!compare("", ""));
        assert!(!compare(&generate().unwrap(), ""));
    }
}
