//! User Storage
//! Mission: Securely store and manage user accounts with SQLite

use crate::auth::models::{User, UserRole};
use anyhow::{Context, Result};
use bcrypt::{hash, verify};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::env;
use tracing::{info, warn};
use uuid::Uuid;

/// Errors the store distinguishes for callers. Everything else is internal.
#[derive(Debug)]
pub enum StoreError {
    DuplicateEmail,
    Internal(anyhow::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::DuplicateEmail => write!(f, "email already registered"),
            StoreError::Internal(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Outcome of a change-password attempt. The hash comparison stays inside
/// the store; callers only see this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordChange {
    Updated,
    WrongPassword,
    UnknownUser,
}

/// User storage with SQLite backend
pub struct UserStore {
    db_path: String,
    bcrypt_cost: u32,
}

/// Emails are compared case-insensitively: trimmed and lower-cased at the
/// store boundary, both on insert and on lookup.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl UserStore {
    /// Create a new user store and initialize database
    pub fn new(db_path: &str, bcrypt_cost: u32) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
            bcrypt_cost,
        };
        store.init_db()?;
        Ok(store)
    }

    /// Initialize database schema
    fn init_db(&self) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        // Create default admin user if none exists
        self.create_default_admin(&conn)?;

        Ok(())
    }

    /// Create default admin user for initial setup
    fn create_default_admin(&self, conn: &Connection) -> Result<()> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE role = 'admin'",
                [],
                |row| row.get(0),
            )
            .context("Failed to check for admin users")?;

        if count == 0 {
            let email = normalize_email(
                &env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@payroll.local".to_string()),
            );
            let password =
                env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());

            let password_hash =
                hash(&password, self.bcrypt_cost).context("Failed to hash password")?;
            let now = Utc::now().to_rfc3339();

            conn.execute(
                "INSERT INTO users (id, email, password_hash, role, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    Uuid::new_v4().to_string(),
                    email,
                    password_hash,
                    UserRole::Admin.as_str(),
                    now,
                    now,
                ],
            )
            .context("Failed to insert admin user")?;

            info!("🔐 Default admin user created ({})", email);
            warn!("⚠️  CHANGE DEFAULT PASSWORD IN PRODUCTION!");
        }

        Ok(())
    }

    /// Get user by email (case-insensitive)
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = Connection::open(&self.db_path)?;

        let mut stmt = conn.prepare(
            "SELECT id, email, password_hash, role, created_at, updated_at
             FROM users WHERE email = ?1",
        )?;

        let user_result = stmt.query_row(params![normalize_email(email)], map_user_row);

        match user_result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get user by id
    pub fn get_user_by_id(&self, user_id: &Uuid) -> Result<Option<User>> {
        let conn = Connection::open(&self.db_path)?;

        let mut stmt = conn.prepare(
            "SELECT id, email, password_hash, role, created_at, updated_at
             FROM users WHERE id = ?1",
        )?;

        let user_result = stmt.query_row(params![user_id.to_string()], map_user_row);

        match user_result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Verify credentials. Returns the user only when both the account
    /// exists and the password matches; a missing account and a wrong
    /// password are indistinguishable to the caller.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        match self.get_user_by_email(email)? {
            Some(user) => {
                let valid =
                    verify(password, &user.password_hash).context("Failed to verify password")?;
                Ok(if valid { Some(user) } else { None })
            }
            None => {
                // Burn a hash so a missing account costs about the same as
                // a wrong password.
                let _ = hash(password, self.bcrypt_cost);
                Ok(None)
            }
        }
    }

    /// Create a new user. Duplicate emails surface as `DuplicateEmail`
    /// via the table's UNIQUE constraint, not an application-level check.
    pub fn create_user(
        &self,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> Result<User, StoreError> {
        let password_hash = hash(password, self.bcrypt_cost)
            .context("Failed to hash password")
            .map_err(StoreError::Internal)?;

        let now = Utc::now().to_rfc3339();
        let user = User {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            password_hash,
            role,
            created_at: now.clone(),
            updated_at: now,
        };

        let conn = Connection::open(&self.db_path)
            .context("Failed to open user database")
            .map_err(StoreError::Internal)?;

        let inserted = conn.execute(
            "INSERT INTO users (id, email, password_hash, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id.to_string(),
                user.email,
                user.password_hash,
                user.role.as_str(),
                user.created_at,
                user.updated_at,
            ],
        );

        match inserted {
            Ok(_) => {
                info!("✅ Created user: {} ({})", user.email, user.role.as_str());
                Ok(user)
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateEmail)
            }
            Err(e) => Err(StoreError::Internal(
                anyhow::Error::new(e).context("Failed to insert user"),
            )),
        }
    }

    /// Re-verify the old password, then replace the stored hash. Fails
    /// closed on a wrong old password regardless of what the caller has
    /// already verified upstream.
    pub fn change_password(
        &self,
        user_id: &Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<PasswordChange> {
        let Some(user) = self.get_user_by_id(user_id)? else {
            return Ok(PasswordChange::UnknownUser);
        };

        let valid = verify(old_password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            return Ok(PasswordChange::WrongPassword);
        }

        let new_hash =
            hash(new_password, self.bcrypt_cost).context("Failed to hash password")?;

        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
            params![new_hash, Utc::now().to_rfc3339(), user_id.to_string()],
        )
        .context("Failed to update password")?;

        info!("🔑 Password updated for user {}", user_id);
        Ok(PasswordChange::Updated)
    }
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id_str: String = row.get(0)?;
    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let role_str: String = row.get(3)?;

    Ok(User {
        id,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        role: UserRole::from_str(&role_str).unwrap_or(UserRole::Employee),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
