//! User Storage
//! Mission: Store and manage user accounts keyed by unique email

use crate::auth::models::{UserRecord, UserRole};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use serde_json::{Map, Value};
use tracing::info;

/// User storage with SQLite backend.
///
/// One record per email. The role column is NULL until an admin grant;
/// NULL resolves to the default `user` role.
pub struct UserStore {
    db_path: String,
}

impl UserStore {
    /// Create a new user store and initialize the schema.
    pub fn new(db_path: &str) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        store.init_db()?;
        Ok(store)
    }

    fn init_db(&self) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                email TEXT PRIMARY KEY,
                profile TEXT NOT NULL,
                role TEXT,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Insert or update the record for `email` in one atomic statement.
    ///
    /// Profile fields are replaced wholesale; an existing role grant
    /// survives the upsert.
    pub fn upsert_user(&self, email: &str, profile: &Map<String, Value>) -> Result<UserRecord> {
        let profile_json = serde_json::to_string(profile).context("Failed to encode profile")?;
        let updated_at = Utc::now().to_rfc3339();

        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "INSERT INTO users (email, profile, role, updated_at)
             VALUES (?1, ?2, NULL, ?3)
             ON CONFLICT(email) DO UPDATE SET
                profile = excluded.profile,
                updated_at = excluded.updated_at",
            params![email, profile_json, updated_at],
        )
        .context("Failed to upsert user")?;

        info!("Upserted user record for {}", email);

        self.get_user(email)?
            .context("Upserted user record missing")
    }

    /// Get the record for `email`, if any.
    pub fn get_user(&self, email: &str) -> Result<Option<UserRecord>> {
        let conn = Connection::open(&self.db_path)?;

        let mut stmt = conn.prepare(
            "SELECT email, profile, role, updated_at FROM users WHERE email = ?1",
        )?;

        let row = stmt.query_row(params![email], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
            ))
        });

        match row {
            Ok((email, profile_json, role_str, updated_at)) => {
                let profile = serde_json::from_str(&profile_json)
                    .context("Corrupt profile document")?;
                let role = role_str.as_deref().and_then(UserRole::from_str);
                Ok(Some(UserRecord {
                    email,
                    profile,
                    role,
                    updated_at,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Role lookup for the access gate. Pure read.
    ///
    /// `None` means no record exists at all; a record whose role column is
    /// NULL (or unrecognized) resolves to the default `user` role.
    pub fn resolve_role(&self, email: &str) -> Result<Option<UserRole>> {
        let conn = Connection::open(&self.db_path)?;

        let row: rusqlite::Result<Option<String>> = conn.query_row(
            "SELECT role FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        );

        match row {
            Ok(role_str) => Ok(Some(
                role_str
                    .as_deref()
                    .and_then(UserRole::from_str)
                    .unwrap_or(UserRole::User),
            )),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Grant or revoke a role. Returns false if no record exists.
    pub fn set_role(&self, email: &str, role: UserRole) -> Result<bool> {
        let conn = Connection::open(&self.db_path)?;

        let updated = conn.execute(
            "UPDATE users SET role = ?1, updated_at = ?2 WHERE email = ?3",
            params![role.as_str(), Utc::now().to_rfc3339(), email],
        )?;

        if updated > 0 {
            info!("Role '{}' set for {}", role.as_str(), email);
        }

        Ok(updated > 0)
    }

    /// List all user records (admin only).
    pub fn list_users(&self) -> Result<Vec<UserRecord>> {
        let conn = Connection::open(&self.db_path)?;

        let mut stmt =
            conn.prepare("SELECT email, profile, role, updated_at FROM users ORDER BY email")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut users = Vec::with_capacity(rows.len());
        for (email, profile_json, role_str, updated_at) in rows {
            let profile =
                serde_json::from_str(&profile_json).context("Corrupt profile document")?;
            users.push(UserRecord {
                email,
                profile,
                role: role_str.as_deref().and_then(UserRole::from_str),
                updated_at,
            });
        }

        Ok(users)
    }
}
