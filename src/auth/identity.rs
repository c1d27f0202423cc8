//! Identity Extraction
//! Mission: Turn an Authorization header into a verified, reconciled identity

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::auth::jwt::JwtHandler;

/// Verified identity of a request: the email carried by a valid token.
///
/// Immutable for the lifetime of the request; attached to request
/// extensions by the access gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(String);

impl Identity {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Identity-match rule for caller-claimed identities: the claim must
    /// equal the token identity, otherwise the request is denied.
    pub fn ensure_matches(&self, claimed: &str) -> Result<(), AuthError> {
        if self.0 == claimed {
            Ok(())
        } else {
            Err(AuthError::IdentityMismatch)
        }
    }
}

/// Denials produced by the access gate.
///
/// Missing/malformed credentials map to 401; everything presented-but-
/// rejected maps to 403. Store failures below the gate deny with 500
/// rather than letting a fault fall through to a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No Authorization header presented.
    MissingCredential,
    /// Header is not a two-part "scheme token" string.
    MalformedCredential,
    /// Signature or expiry check failed.
    InvalidToken,
    /// Caller-claimed identity differs from the token identity.
    IdentityMismatch,
    /// Token verified but no user record exists for the identity.
    UnknownUser,
    /// Verified identity lacks the required role.
    InsufficientRole,
    /// Role lookup failed below the gate.
    StoreFailure,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            AuthError::MissingCredential => "authorization header missing",
            AuthError::MalformedCredential => "authorization header malformed",
            AuthError::InvalidToken => "invalid or expired token",
            AuthError::IdentityMismatch => "identity mismatch",
            AuthError::UnknownUser => "unknown user",
            AuthError::InsufficientRole => "insufficient role",
            AuthError::StoreFailure => "role lookup failed",
        };
        write!(f, "{}", msg)
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingCredential => {
                (StatusCode::UNAUTHORIZED, "Missing authorization header")
            }
            AuthError::MalformedCredential => (
                StatusCode::UNAUTHORIZED,
                "Authorization header must be '<scheme> <token>'",
            ),
            AuthError::InvalidToken => (StatusCode::FORBIDDEN, "Invalid or expired token"),
            AuthError::IdentityMismatch => (
                StatusCode::FORBIDDEN,
                "Token identity does not match requested identity",
            ),
            AuthError::UnknownUser => (StatusCode::FORBIDDEN, "No account for this identity"),
            AuthError::InsufficientRole => (StatusCode::FORBIDDEN, "Admin access required"),
            AuthError::StoreFailure => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Extract and reconcile the request identity.
///
/// The header must be a two-part "scheme token" string; the token is the
/// second part. When the caller also states an identity (query or path
/// parameter), it must match the token identity.
pub fn extract(
    header: Option<&str>,
    claimed: Option<&str>,
    jwt: &JwtHandler,
) -> Result<Identity, AuthError> {
    let header = header.ok_or(AuthError::MissingCredential)?;

    let mut parts = header.split_whitespace();
    let (Some(_scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AuthError::MalformedCredential);
    };

    let claims = jwt
        .verify_token(token)
        .map_err(|_| AuthError::InvalidToken)?;
    let identity = Identity(claims.email);

    if let Some(claimed) = claimed {
        identity.ensure_matches(claimed)?;
    }

    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn handler() -> JwtHandler {
        JwtHandler::new("test-secret-key-12345".to_string())
    }

    fn token_for(email: &str, jwt: &JwtHandler) -> String {
        jwt.issue_token(email, &Map::new()).unwrap().0
    }

    #[test]
    fn test_missing_header_is_unauthorized() {
        let jwt = handler();
        assert_eq!(
            extract(None, None, &jwt),
            Err(AuthError::MissingCredential)
        );
    }

    #[test]
    fn test_malformed_header_is_unauthorized() {
        let jwt = handler();
        let token = token_for("a@x.com", &jwt);

        // Token alone, no scheme.
        assert_eq!(
            extract(Some(token.as_str()), None, &jwt),
            Err(AuthError::MalformedCredential)
        );
        // Empty header.
        assert_eq!(
            extract(Some(""), None, &jwt),
            Err(AuthError::MalformedCredential)
        );
        // Three parts.
        let three = format!("Bearer {} trailing", token);
        assert_eq!(
            extract(Some(three.as_str()), None, &jwt),
            Err(AuthError::MalformedCredential)
        );
    }

    #[test]
    fn test_bad_token_is_forbidden() {
        let jwt = handler();
        assert_eq!(
            extract(Some("Bearer garbage"), None, &jwt),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn test_wrong_secret_is_forbidden() {
        let jwt = handler();
        let other = JwtHandler::new("another-secret".to_string());
        let header = format!("Bearer {}", token_for("a@x.com", &other));
        assert_eq!(
            extract(Some(header.as_str()), None, &jwt),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn test_valid_token_without_claim_is_trusted() {
        let jwt = handler();
        let header = format!("Bearer {}", token_for("a@x.com", &jwt));

        let identity = extract(Some(header.as_str()), None, &jwt).unwrap();
        assert_eq!(identity.as_str(), "a@x.com");
    }

    #[test]
    fn test_matching_claim_is_allowed() {
        let jwt = handler();
        let header = format!("Bearer {}", token_for("a@x.com", &jwt));

        let identity = extract(Some(header.as_str()), Some("a@x.com"), &jwt).unwrap();
        assert_eq!(identity.as_str(), "a@x.com");
    }

    #[test]
    fn test_mismatched_claim_is_forbidden() {
        let jwt = handler();
        let header = format!("Bearer {}", token_for("a@x.com", &jwt));

        assert_eq!(
            extract(Some(header.as_str()), Some("b@x.com"), &jwt),
            Err(AuthError::IdentityMismatch)
        );
    }

    #[test]
    fn test_scheme_word_is_not_checked() {
        // The header contract is "two parts, token second"; the scheme word
        // itself is not interpreted.
        let jwt = handler();
        let header = format!("Token {}", token_for("a@x.com", &jwt));

        let identity = extract(Some(header.as_str()), None, &jwt).unwrap();
        assert_eq!(identity.as_str(), "a@x.com");
    }
}
