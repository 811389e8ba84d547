//! HS256 bearer tokens.
//!
//! Expiry is checked here against the injected clock rather than by
//! `jsonwebtoken`, so tests and callers control "now".

use std::time::Duration;

use chirpy_core::error::{AppError, AuthError, Result};
use chirpy_core::models::RecordId;
use chirpy_core::traits::Claims;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Registered claims as they travel inside the token.
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sub: String,
    iss: String,
    iat: i64,
    exp: i64,
}

pub(crate) struct BearerSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    validation: Validation,
}

impl BearerSigner {
    pub(crate) fn new(secret: &[u8], issuer: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: issuer.to_string(),
            validation,
        }
    }

    pub(crate) fn issue(&self, subject: RecordId, now: DateTime<Utc>, ttl: Duration) -> Result<String> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AppError::Internal(format!("token lifetime out of range: {e}")))?;

        let claims = TokenClaims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    pub(crate) fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims> {
        let data = decode::<TokenClaims>(token, &self.decoding, &self.validation).map_err(reject)?;
        let claims = data.claims;

        // Valid only while now < exp.
        if claims.exp <= now.timestamp() {
            return Err(AuthError::Expired.into());
        }

        let subject = match claims.sub.parse::<RecordId>() {
            Ok(id) if id > 0 => id,
            _ => return Err(AuthError::MissingSubject.into()),
        };

        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| AuthError::Malformed("expiry out of range".to_string()))?;

        Ok(Claims { subject, issuer: claims.iss, expires_at })
    }
}

fn reject(err: jsonwebtoken::errors::Error) -> AppError {
    let reason = match err.kind() {
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidAlgorithm => AuthError::UnexpectedAlgorithm,
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        ErrorKind::MissingRequiredClaim(claim) if claim == "sub" => AuthError::MissingSubject,
        _ => AuthError::Malformed(err.to_string()),
    };
    AppError::Auth(reason)
}
