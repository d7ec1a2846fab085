//! Bearer Token Validation
//!
//! HS256 JSON Web Tokens signed with a shared secret. Verification checks the
//! signature and the `exp` claim only; there is no external lookup.

use std::fmt;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TokenError;

/// Claims carried by a task-manager token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id as a decimal string
    pub sub: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiry (Unix seconds)
    pub exp: i64,
}

/// Identity of the caller, derived from a verified credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    /// Positive user id
    pub subject: u64,
}

// == Token Validator ==
/// Verifies bearer credentials against a shared signing secret.
///
/// Pure computation: no I/O, no retries, no interior state. Safe to share
/// behind an `Arc` across every request.
#[derive(Clone)]
pub struct TokenValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenValidator")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}

impl TokenValidator {
    /// Creates a validator for tokens signed with `secret`.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Returns true when the token verifies.
    pub fn validate(&self, token: &str) -> bool {
        self.claims(token).is_ok()
    }

    /// Extracts the `sub` claim of a verified token.
    pub fn subject(&self, token: &str) -> Result<String, TokenError> {
        Ok(self.claims(token)?.sub)
    }

    /// Verifies the token and builds the caller's [`AuthContext`].
    ///
    /// A subject that is not a positive integer is rejected the same way as a
    /// bad signature.
    pub fn authenticate(&self, token: &str) -> Result<AuthContext, TokenError> {
        let subject = self.subject(token)?;
        subject
            .parse::<u64>()
            .ok()
            .filter(|id| *id > 0)
            .map(|subject| AuthContext { subject })
            .ok_or(TokenError::InvalidToken)
    }

    /// Signs a token for `subject` that expires after `ttl`.
    pub fn issue(&self, subject: u64, ttl: chrono::Duration) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now + ttl.num_seconds(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Issue(e.to_string()))
    }

    fn claims(&self, token: &str) -> Result<Claims, TokenError> {
        if token.is_empty() {
            return Err(TokenError::InvalidToken);
        }

        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Token verification failed");
                TokenError::InvalidToken
            })
    }
}
