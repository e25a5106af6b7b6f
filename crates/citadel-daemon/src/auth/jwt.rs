//! JWT issue and verification
//!
//! HS256-signed tokens. Claims carry the user's id, username, and base role;
//! the effective role is never encoded in a token.

use crate::error::{DaemonError, DaemonResult};
use citadel_types::{Role, UserId};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Payload stored in a token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: UserId,
    pub username: String,
    /// Persisted base role at issue time
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Token signer/verifier
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_seconds: u64,
}

impl JwtKeys {
    /// Create keys from a shared secret.
    ///
    /// Rejects secrets shorter than 32 characters.
    pub fn new(secret: &str, expiry_seconds: u64) -> DaemonResult<Self> {
        if secret.len() < 32 {
            return Err(DaemonError::Config(
                "jwt_secret must be at least 32 characters".to_string(),
            ));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        })
    }

    /// Issue a token for an authenticated account.
    pub fn issue(&self, id: UserId, username: &str, role: Role) -> DaemonResult<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| DaemonError::Server(format!("system time error: {e}")))?
            .as_secs();

        let claims = Claims {
            sub: id,
            username: username.to_string(),
            role,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| DaemonError::Server(format!("failed to sign token: {e}")))
    }

    /// Verify a token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding, &Validation::default()).map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::new("test-secret-which-is-long-enough-0123456789", 3600).unwrap()
    }

    #[test]
    fn issue_and_verify_round_trip() {
        let keys = keys();
        let id = UserId::generate();
        let token = keys.issue(id, "kestrel", Role::Heir).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.username, "kestrel");
        assert_eq!(claims.role, Role::Heir);
    }

    #[test]
    fn short_secret_is_rejected() {
        assert!(JwtKeys::new("short", 3600).is_err());
    }

    #[test]
    fn garbage_token_fails_verification() {
        assert!(keys().verify("not-a-token").is_err());
    }

    #[test]
    fn token_signed_with_other_secret_fails() {
        let other = JwtKeys::new("another-secret-that-is-also-long-enough!", 3600).unwrap();
        let token = other
            .issue(UserId::generate(), "kestrel", Role::Observer)
            .unwrap();
        assert!(keys().verify(&token).is_err());
    }
}
