//! User Storage
//! Mission: Persist identities keyed by email with SQLite

use crate::auth::models::{User, UserRole};
use parking_lot::Mutex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{ffi, params, Connection, OptionalExtension, Row};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Single-row operations the auth flows need from a credential store.
///
/// Implementations must be safe for concurrent use and must enforce email
/// uniqueness themselves: `insert` reports a duplicate even when a prior
/// `exists` check said the email was free.
pub trait CredentialStore: Send + Sync {
    fn exists(&self, email: &str) -> Result<bool, StoreError>;
    fn insert(&self, user: &User) -> Result<(), StoreError>;
    fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    fn list_users(&self) -> Result<Vec<User>, StoreError>;
}

#[derive(Debug)]
pub enum StoreError {
    DuplicateKey(String),
    Sqlite(rusqlite::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey(email) => write!(f, "User already exists: {}", email),
            Self::Sqlite(e) => write!(f, "SQLite error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlite(e) => Some(e),
            Self::DuplicateKey(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e)
    }
}

impl ToSql for UserRole {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for UserRole {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        UserRole::parse(s).ok_or_else(|| FromSqlError::Other(format!("unknown role {:?}", s).into()))
    }
}

const USER_COLUMNS: &str = "email, password, full_name, age, occupation, role";

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        email: row.get(0)?,
        password_hash: row.get(1)?,
        full_name: row.get(2)?,
        age: row.get(3)?,
        occupation: row.get(4)?,
        role: row.get(5)?,
    })
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, _) => {
            err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}

/// User storage with SQLite backend
pub struct UserStore {
    conn: Arc<Mutex<Connection>>,
}

impl UserStore {
    /// Open (or create) the store at `path` and initialize the schema
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_db()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_db()?;
        Ok(store)
    }

    /// The PRIMARY KEY on `email` is the real uniqueness guard.
    fn init_db(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                email TEXT PRIMARY KEY NOT NULL,
                password TEXT NOT NULL,
                full_name TEXT NOT NULL,
                age INTEGER NOT NULL,
                occupation TEXT NOT NULL,
                role TEXT NOT NULL
            )",
            [],
        )?;
        debug!("users table ready");
        Ok(())
    }
}

impl CredentialStore for UserStore {
    fn exists(&self, email: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
            params![email],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn insert(&self, user: &User) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            &format!("INSERT INTO users ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)", USER_COLUMNS),
            params![
                user.email,
                user.password_hash,
                user.full_name,
                user.age,
                user.occupation,
                user.role,
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateKey(user.email.clone())
            } else {
                StoreError::Sqlite(e)
            }
        })?;

        info!(email = %user.email, role = %user.role, "Created user");
        Ok(())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock();
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                params![email],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users ORDER BY email",
            USER_COLUMNS
        ))?;
        let users = stmt
            .query_map([], row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn test_user(email: &str, role: UserRole) -> User {
        User {
            email: email.to_string(),
            password_hash: "$2b$04$hash".to_string(),
            full_name: "John Smith".to_string(),
            age: 20,
            occupation: "eng".to_string(),
            role,
        }
    }

    #[test]
    fn test_insert_and_find() {
        let store = UserStore::in_memory().unwrap();
        assert!(!store.exists("a@b.com").unwrap());

        store.insert(&test_user("a@b.com", UserRole::SuperAdmin)).unwrap();
        assert!(store.exists("a@b.com").unwrap());

        let found = store.find_by_email("a@b.com").unwrap().unwrap();
        assert_eq!(found.email, "a@b.com");
        assert_eq!(found.password_hash, "$2b$04$hash");
        assert_eq!(found.full_name, "John Smith");
        assert_eq!(found.age, 20);
        assert_eq!(found.occupation, "eng");
        assert_eq!(found.role, UserRole::SuperAdmin);
    }

    #[test]
    fn test_find_missing_is_none() {
        let store = UserStore::in_memory().unwrap();
        assert!(store.find_by_email("nobody@b.com").unwrap().is_none());
    }

    #[test]
    fn test_email_is_case_sensitive() {
        let store = UserStore::in_memory().unwrap();
        store.insert(&test_user("a@b.com", UserRole::Admin)).unwrap();
        assert!(!store.exists("A@b.com").unwrap());
        store.insert(&test_user("A@b.com", UserRole::Admin)).unwrap();
        assert_eq!(store.list_users().unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_insert_rejected_by_constraint() {
        let store = UserStore::in_memory().unwrap();
        store.insert(&test_user("a@b.com", UserRole::Admin)).unwrap();

        let result = store.insert(&test_user("a@b.com", UserRole::SuperAdmin));
        assert!(matches!(result, Err(StoreError::DuplicateKey(ref e)) if e == "a@b.com"));

        // The original row is untouched
        let found = store.find_by_email("a@b.com").unwrap().unwrap();
        assert_eq!(found.role, UserRole::Admin);
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_file = NamedTempFile::new().unwrap();
        {
            let store = UserStore::new(temp_file.path()).unwrap();
            store.insert(&test_user("a@b.com", UserRole::Admin)).unwrap();
        }

        let store = UserStore::new(temp_file.path()).unwrap();
        assert!(store.exists("a@b.com").unwrap());
    }

    #[test]
    fn test_list_users_sorted() {
        let store = UserStore::in_memory().unwrap();
        store.insert(&test_user("zed@b.com", UserRole::Admin)).unwrap();
        store.insert(&test_user("amy@b.com", UserRole::SuperAdmin)).unwrap();

        let emails: Vec<_> = store
            .list_users()
            .unwrap()
            .into_iter()
            .map(|u| u.email)
            .collect();
        assert_eq!(emails, vec!["amy@b.com", "zed@b.com"]);
    }
}
