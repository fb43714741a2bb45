//! SQLite-backed user store: users, credentials, tokens, roles, crates.

use super::auth::{AuthTokenValue, DjdbHasher};
use super::models::User;
use super::permissions::UserRole;
use super::user_store::UserStore;
use crate::crates::{Crate, CrateItem, CrateStore};
use crate::library::EntityKind;
use crate::retry::{with_retries, RetryPolicy};
use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_in_memory_database, open_versioned_database, Column, ForeignKey, ForeignKeyOnChange,
    SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};
use anyhow::{Context, Result};
use rand::{rng, Rng};
use rand_distr::Alphanumeric;
use rusqlite::{params, Connection};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("handle", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

const USER_FK: ForeignKey = ForeignKey {
    foreign_table: "user",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const CREDENTIALS_TABLE_V_0: Table = Table {
    name: "credentials",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Text,
            is_primary_key = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("salt", &SqlType::Text, non_null = true),
        sqlite_column!("hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

const AUTH_TOKEN_TABLE_V_0: Table = Table {
    name: "auth_token",
    columns: &[
        sqlite_column!("value", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    indices: &[("index_auth_token_user_id", "user_id")],
    unique_constraints: &[],
};

const USER_ROLE_TABLE_V_0: Table = Table {
    name: "user_role",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("role", &SqlType::Text, non_null = true),
    ],
    indices: &[("index_user_role_user_id", "user_id")],
    unique_constraints: &[&["user_id", "role"]],
};

const USER_CRATE_TABLE_V_0: Table = Table {
    name: "user_crate",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Text,
            is_primary_key = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

/// Row id keeps the insertion order of `items`, `position` is the 1-based
/// display position.
const USER_CRATE_ITEM_TABLE_V_0: Table = Table {
    name: "user_crate_item",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("kind", &SqlType::Integer, non_null = true),
        sqlite_column!("entity_id", &SqlType::Text, non_null = true),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
    ],
    indices: &[("index_user_crate_item_user_id", "user_id")],
    unique_constraints: &[&["user_id", "kind", "entity_id"]],
};

pub const USER_DB_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        USER_TABLE_V_0,
        CREDENTIALS_TABLE_V_0,
        AUTH_TOKEN_TABLE_V_0,
        USER_ROLE_TABLE_V_0,
        USER_CRATE_TABLE_V_0,
        USER_CRATE_ITEM_TABLE_V_0,
    ],
    migration: None,
}];

/// A random A-z0-9 string
fn random_string(len: usize) -> String {
    let bytes = rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .collect::<Vec<u8>>();
    String::from_utf8_lossy(&bytes).to_string()
}

pub struct SqliteUserStore {
    conn: Mutex<Connection>,
    hasher: DjdbHasher,
    retry_policy: RetryPolicy,
}

impl SqliteUserStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = open_versioned_database(db_path, USER_DB_SCHEMAS)
            .context("Failed to open user database")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Mutex::new(conn),
            hasher: DjdbHasher::Argon2,
            retry_policy: RetryPolicy::default(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = open_in_memory_database(USER_DB_SCHEMAS)?;
        Ok(Self {
            conn: Mutex::new(conn),
            hasher: DjdbHasher::Argon2,
            retry_policy: RetryPolicy::default(),
        })
    }

    fn load_roles(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<UserRole>> {
        let mut stmt = conn.prepare("SELECT role FROM user_role WHERE user_id = ?1")?;
        let role_names = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(role_names
            .iter()
            .filter_map(|name| UserRole::from_str(name))
            .collect())
    }

    fn load_user(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<User>> {
        let handle: Option<String> = conn
            .query_row(
                "SELECT handle FROM user WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                e => Err(e),
            })?;
        match handle {
            Some(handle) => Ok(Some(User {
                id: user_id.to_string(),
                handle,
                roles: Self::load_roles(conn, user_id)?,
            })),
            None => Ok(None),
        }
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, handle: &str, password: &str, roles: &[UserRole]) -> Result<User> {
        let salt = self.hasher.generate_b64_salt();
        let hash = self.hasher.hash(password.as_bytes(), &salt)?;
        let user_id = random_string(16);

        let conn = self.conn.lock().unwrap();
        with_retries(&self.retry_policy, || {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO user (id, handle) VALUES (?1, ?2)",
                params![user_id, handle],
            )?;
            tx.execute(
                "INSERT INTO credentials (user_id, salt, hash, hasher) VALUES (?1, ?2, ?3, ?4)",
                params![user_id, salt, hash, self.hasher.to_string()],
            )?;
            for role in roles {
                tx.execute(
                    "INSERT INTO user_role (user_id, role) VALUES (?1, ?2)",
                    params![user_id, role.as_str()],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .with_context(|| format!("Failed to create user '{}'", handle))?;

        Ok(User {
            id: user_id,
            handle: handle.to_string(),
            roles: roles.to_vec(),
        })
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        Ok(Self::load_user(&conn, id)?)
    }

    fn get_user_by_handle(&self, handle: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let user_id: Option<String> = conn
            .query_row(
                "SELECT id FROM user WHERE handle = ?1",
                params![handle],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                e => Err(e),
            })?;
        match user_id {
            Some(user_id) => Ok(Self::load_user(&conn, &user_id)?),
            None => Ok(None),
        }
    }

    fn verify_password(&self, handle: &str, password: &str) -> Result<Option<User>> {
        let (user_id, hash, hasher_name) = {
            let conn = self.conn.lock().unwrap();
            let row: Option<(String, String, String)> = conn
                .query_row(
                    "SELECT u.id, c.hash, c.hasher FROM user u
                     JOIN credentials c ON c.user_id = u.id WHERE u.handle = ?1",
                    params![handle],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    e => Err(e),
                })?;
            match row {
                Some(found) => found,
                None => return Ok(None),
            }
        };
        // Argon2 verification is slow on purpose, run it without the db lock
        let hasher = DjdbHasher::from_str(&hasher_name)?;
        if !hasher.verify(password, hash.as_str())? {
            return Ok(None);
        }
        self.get_user(&user_id)
    }

    fn create_auth_token(&self, user_id: &str) -> Result<AuthTokenValue> {
        let token = AuthTokenValue::generate();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auth_token (value, user_id) VALUES (?1, ?2)",
            params![token.0, user_id],
        )
        .context("Failed to create auth token")?;
        Ok(token)
    }

    fn get_user_by_token(&self, token: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let user_id: Option<String> = conn
            .query_row(
                "SELECT user_id FROM auth_token WHERE value = ?1",
                params![token],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                e => Err(e),
            })?;
        let user_id = match user_id {
            Some(user_id) => user_id,
            None => return Ok(None),
        };
        conn.execute(
            "UPDATE auth_token SET last_used = cast(strftime('%s','now') as int) WHERE value = ?1",
            params![token],
        )?;
        Ok(Self::load_user(&conn, &user_id)?)
    }

    fn delete_auth_token(&self, token: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM auth_token WHERE value = ?1", params![token])?;
        Ok(deleted > 0)
    }
}

impl CrateStore for SqliteUserStore {
    fn get_or_create_crate(&self, user_id: &str) -> Result<Crate> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO user_crate (user_id) VALUES (?1)",
            params![user_id],
        )
        .with_context(|| format!("Failed to create crate for user {}", user_id))?;

        let mut stmt = conn.prepare(
            "SELECT kind, entity_id, position FROM user_crate_item
             WHERE user_id = ?1 ORDER BY id",
        )?;
        let mut items = Vec::new();
        let mut order = Vec::new();
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;
        for row in rows {
            let (kind_int, entity_id, position) = row?;
            let kind = EntityKind::from_int(kind_int)
                .with_context(|| format!("invalid crate item kind {}", kind_int))?;
            items.push(CrateItem { kind, entity_id });
            order.push(position as usize);
        }
        Ok(Crate {
            user_id: user_id.to_string(),
            items,
            order,
        })
    }

    fn save_crate(&self, crate_value: &Crate) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        with_retries(&self.retry_policy, || {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT OR IGNORE INTO user_crate (user_id) VALUES (?1)",
                params![crate_value.user_id],
            )?;
            tx.execute(
                "DELETE FROM user_crate_item WHERE user_id = ?1",
                params![crate_value.user_id],
            )?;
            for (item, position) in crate_value.items.iter().zip(crate_value.order.iter()) {
                tx.execute(
                    "INSERT INTO user_crate_item (user_id, kind, entity_id, position)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        crate_value.user_id,
                        item.kind.to_int(),
                        item.entity_id,
                        *position as i64
                    ],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .with_context(|| format!("Failed to save crate for user {}", crate_value.user_id))?;
        Ok(())
    }
}
