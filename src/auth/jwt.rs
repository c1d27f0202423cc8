//! JWT Token Handler
//! Mission: Issue and verify signed, time-limited identity tokens

use crate::auth::models::Claims;
use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use tracing::debug;

/// Claim keys the codec manages itself; stripped from profile input so a
/// client-supplied field can never override them.
const RESERVED_CLAIMS: [&str; 3] = ["email", "iat", "exp"];

/// A token that failed the signature or expiry check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidToken;

impl std::fmt::Display for InvalidToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid or expired token")
    }
}

impl std::error::Error for InvalidToken {}

/// Token codec holding the process-wide signing secret.
///
/// The secret is injected once at construction and never mutated.
pub struct JwtHandler {
    secret: String,
    expiration_hours: i64,
}

impl JwtHandler {
    /// Create a new handler with the given signing secret.
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            expiration_hours: 24, // tokens live exactly one day
        }
    }

    /// Sign a token for `email`, embedding the given profile fields.
    ///
    /// Returns the token and its lifetime in seconds.
    pub fn issue_token(
        &self,
        email: &str,
        profile: &Map<String, Value>,
    ) -> Result<(String, usize)> {
        let now = Utc::now();
        let issued_at = now.timestamp() as usize;
        let expiration = now
            .checked_add_signed(chrono::Duration::hours(self.expiration_hours))
            .context("Invalid timestamp")?
            .timestamp() as usize;

        let expires_in = (self.expiration_hours * 3600) as usize;

        let mut profile = profile.clone();
        for key in RESERVED_CLAIMS {
            profile.remove(key);
        }

        let claims = Claims {
            email: email.to_string(),
            profile,
            iat: issued_at,
            exp: expiration,
        };

        debug!(
            "Issuing token for {}, expires in {}h",
            email, self.expiration_hours
        );

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to sign token")?;

        Ok((token, expires_in))
    }

    /// Verify a token and return its claims.
    ///
    /// Fails on signature mismatch or past expiry; no leeway is granted on
    /// the expiry timestamp. Side-effect-free.
    pub fn verify_token(&self, token: &str) -> Result<Claims, InvalidToken> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|_| InvalidToken)?;

        debug!("Verified token for {}", decoded.claims.email);

        Ok(decoded.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_profile() -> Map<String, Value> {
        let mut profile = Map::new();
        profile.insert("name".to_string(), Value::String("Test Rider".to_string()));
        profile.insert(
            "address".to_string(),
            Value::String("12 Spoke Lane".to_string()),
        );
        profile
    }

    #[test]
    fn test_issue_and_verify_returns_claims_unchanged() {
        let handler = JwtHandler::new("test-secret-key-12345".to_string());
        let profile = test_profile();

        let (token, expires_in) = handler.issue_token("rider@x.com", &profile).unwrap();
        assert!(!token.is_empty());
        assert_eq!(expires_in, 24 * 3600); // 1 day in seconds

        let claims = handler.verify_token(&token).unwrap();
        assert_eq!(claims.email, "rider@x.com");
        assert_eq!(claims.profile, profile);
        assert!(claims.exp > Utc::now().timestamp() as usize);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_garbage_token_rejected() {
        let handler = JwtHandler::new("test-secret-key-12345".to_string());

        let result = handler.verify_token("not.a.token");
        assert_eq!(result, Err(InvalidToken));
    }

    #[test]
    fn test_different_secrets_reject() {
        let handler1 = JwtHandler::new("secret1".to_string());
        let handler2 = JwtHandler::new("secret2".to_string());

        let (token, _) = handler1.issue_token("rider@x.com", &Map::new()).unwrap();

        assert_eq!(handler2.verify_token(&token), Err(InvalidToken));
    }

    #[test]
    fn test_expired_token_rejected() {
        let secret = "test-secret-key-12345";
        let handler = JwtHandler::new(secret.to_string());

        // Correctly signed, but the embedded expiry is in the past.
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            email: "rider@x.com".to_string(),
            profile: Map::new(),
            iat: now - 2 * 24 * 3600,
            exp: now - 24 * 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(handler.verify_token(&token), Err(InvalidToken));
    }

    #[test]
    fn test_issuance_is_idempotent_on_verification() {
        let handler = JwtHandler::new("test-secret-key-12345".to_string());
        let profile = test_profile();

        let (first, _) = handler.issue_token("rider@x.com", &profile).unwrap();
        let (second, _) = handler.issue_token("rider@x.com", &profile).unwrap();

        // Tokens need not be byte-identical; both must verify to the same
        // identity and profile.
        let a = handler.verify_token(&first).unwrap();
        let b = handler.verify_token(&second).unwrap();
        assert_eq!(a.email, b.email);
        assert_eq!(a.profile, b.profile);
    }

    #[test]
    fn test_reserved_claims_cannot_be_overridden() {
        let handler = JwtHandler::new("test-secret-key-12345".to_string());

        let mut profile = Map::new();
        profile.insert("email".to_string(), Value::String("spoof@x.com".to_string()));
        profile.insert("exp".to_string(), Value::from(0));

        let (token, _) = handler.issue_token("rider@x.com", &profile).unwrap();
        let claims = handler.verify_token(&token).unwrap();

        assert_eq!(claims.email, "rider@x.com");
        assert!(!claims.profile.contains_key("email"));
        assert!(!claims.profile.contains_key("exp"));
    }
}
