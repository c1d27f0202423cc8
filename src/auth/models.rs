//! Authentication Models
//! Mission: Define user records, roles, and token claims

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Persistent user account, keyed by unique email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub email: String,
    /// Arbitrary profile fields as last written by the client.
    pub profile: Map<String, Value>,
    /// Absent until an admin grant; absent means plain `user`.
    pub role: Option<UserRole>,
    pub updated_at: String,
}

impl UserRecord {
    /// Effective role: a record without a role field is a plain user.
    pub fn effective_role(&self) -> UserRole {
        self.role.unwrap_or(UserRole::User)
    }
}

/// User roles for RBAC
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UserRole {
    #[serde(rename = "admin")]
    Admin, // Catalog and account administration
    #[serde(rename = "user")]
    User, // Ordering and reviews
}

impl UserRole {
    pub fn as_str(&self) -> &str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "user" => Some(UserRole::User),
            _ => None,
        }
    }
}

/// JWT claims payload: the identity plus the profile fields the token was
/// issued with, and the issuance/expiry timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
    pub iat: usize, // issuance timestamp
    pub exp: usize, // expiration timestamp
}
