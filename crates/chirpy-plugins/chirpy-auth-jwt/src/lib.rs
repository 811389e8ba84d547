//! # chirpy-auth-jwt
//!
//! Argon2 + JWT implementation of `CredentialProvider`.
//! Handles password hashing, refresh-token issuance and bearer-token claims.

mod bearer;
pub mod password;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use argon2::Argon2;
use chirpy_core::error::Result;
use chirpy_core::models::RecordId;
use chirpy_core::traits::{Claims, Clock, CredentialProvider, SystemClock};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::bearer::BearerSigner;
pub use crate::password::PasswordCost;

/// Issuer written into and required from every bearer token by default.
pub const DEFAULT_ISSUER: &str = "chirpy";

pub struct JwtCredentialProvider {
    argon2: Argon2<'static>,
    signer: BearerSigner,
    clock: Arc<dyn Clock>,
}

impl JwtCredentialProvider {
    /// Accepts the process-wide signing secret (e.g., from `JWT_SECRET`).
    pub fn new(secret: &SecretString, issuer: &str, cost: PasswordCost) -> Result<Self> {
        Ok(Self {
            argon2: password::hasher(cost)?,
            signer: BearerSigner::new(secret.expose_secret().as_bytes(), issuer),
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the wall clock used for expiry computation and checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl CredentialProvider for JwtCredentialProvider {
    fn hash_password(&self, plaintext: &str) -> Result<String> {
        password::hash(&self.argon2, plaintext)
    }

    fn verify_password(&self, plaintext: &str, hash: &str) -> bool {
        password::verify(&self.argon2, plaintext, hash)
    }

    fn generate_session_token(&self) -> Result<String> {
        session::generate()
    }

    fn issue_bearer_token(&self, account_id: RecordId, ttl: Duration) -> Result<String> {
        let token = self.signer.issue(account_id, self.clock.now(), ttl)?;
        debug!(account_id, ttl_secs = ttl.as_secs(), "issued bearer token");
        Ok(token)
    }

    fn validate_bearer_token(&self, token: &str) -> Result<Claims> {
        self.signer.validate(token, self.clock.now())
    }

    fn compare_session_tokens(&self, presented: &str, stored: &str) -> bool {
        session::compare(presented, stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chirpy_core::error::{AppError, AuthError};
    use chirpy_core::traits::MockClock;
    use chrono::DateTime;

    fn provider_at(secret: &str, now: i64) -> JwtCredentialProvider {
        let mut clock = MockClock::new();
        clock
            .expect_now()
            .returning(move || DateTime::from_timestamp(now, 0).unwrap());

        JwtCredentialProvider::new(
            &SecretString::from(secret.to_string()),
            DEFAULT_ISSUER,
            PasswordCost { memory_kib: 1024, iterations: 1, parallelism: 1 },
        )
        .unwrap()
        .with_clock(Arc::new(clock))
    }

    #[test]
    fn test_token_lifecycle_follows_clock() {
        let issued = provider_at("s3cret", 1_700_000_000);
        let token = issued.issue_bearer_token(7, Duration::from_secs(3600)).unwrap();

        assert_eq!(issued.validate_bearer_token(&token).unwrap().subject, 7);

        let later = provider_at("s3cret", 1_700_007_200);
        assert!(matches!(
            later.validate_bearer_token(&token),
            Err(AppError::Auth(AuthError::Expired))
        ));

        let foreign = provider_at("another", 1_700_000_000);
        assert!(matches!(
            foreign.validate_bearer_token(&token),
            Err(AppError::Auth(AuthError::InvalidSignature))
        ));
    }

    #[test]
    fn test_password_round_trip_through_provider() {
        let provider = provider_at("s3cret", 0);
        let hash = provider.hash_password("secret").unwrap();

        assert_ne!(hash, "secret");
        assert!(provider.verify_password("secret", &hash));
        assert!(!provider.verify_password("wrong", &hash));
        assert_eq!(provider.hash_password(&hash).unwrap(), hash);
    }

    #[test]
    fn test_session_tokens_through_provider() {
        let provider = provider_at("s3cret", 0);
        let token = provider.generate_session_token().unwrap();

        assert!(provider.compare_session_tokens(&token, &token));
        assert!(!provider.compare_session_tokens(&token, ""));
    }
}
