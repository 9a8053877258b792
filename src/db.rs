//! Key/value persistence for pinch
//!
//! A small SQLite-backed store with `localStorage` semantics: string keys,
//! string values, last write wins. The wedding profile lives here as one
//! JSON blob. Schema is created with raw SQL on open.

use crate::error::StoreError;
use crate::schema::*;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use std::path::{Path, PathBuf};

/// Walk up directory tree to find .pinch folder (like git finds .git)
/// Can be overridden with PINCH_DB_PATH env var
fn get_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("PINCH_DB_PATH") {
        return PathBuf::from(path);
    }

    if let Ok(current_dir) = std::env::current_dir() {
        let mut dir = current_dir.as_path();
        loop {
            let pinch_dir = dir.join(".pinch");
            if pinch_dir.is_dir() {
                return pinch_dir.join("pinch.db");
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
    }

    // No .pinch found - default to current directory
    // (pinch init will create it here)
    PathBuf::from(".pinch/pinch.db")
}

/// Current schema version for pinch
pub const CURRENT_SCHEMA: StoreSchema = StoreSchema {
    major: 1,
    minor: 0,
    patch: 0,
    name: "kv-store",
    features: &["kv_store"],
};

/// Describes the version and capabilities of the schema
#[derive(Debug, Clone)]
pub struct StoreSchema {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub name: &'static str,
    pub features: &'static [&'static str],
}

impl StoreSchema {
    pub fn version_string(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl std::fmt::Display for StoreSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{} ({})", self.version_string(), self.name)
    }
}

// ============================================================================
// Diesel Models
// ============================================================================

/// Insertable schema version
#[derive(Insertable)]
#[diesel(table_name = schema_versions)]
struct NewSchemaVersion<'a> {
    version: &'a str,
    name: &'a str,
    features: &'a str,
    introduced_at: &'a str,
}

/// Insertable / replaceable key-value row
#[derive(Insertable, AsChangeset)]
#[diesel(table_name = kv_store)]
struct NewKvEntry<'a> {
    key: &'a str,
    value: &'a str,
    updated_at: &'a str,
}

/// Queryable key-value row
#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = kv_store)]
pub struct KvEntry {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

// ============================================================================
// Database Connection
// ============================================================================

type DbPool = Pool<ConnectionManager<SqliteConnection>>;
type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Database connection wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    path: PathBuf,
}

impl Database {
    /// Get the database path that will be used
    pub fn db_path() -> PathBuf {
        get_db_path()
    }

    /// Open database at default path (respects PINCH_DB_PATH env var)
    pub fn open() -> Result<Self> {
        let path = get_db_path();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            }
        }
        Self::open_at(&path)
    }

    /// Open database at specified path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(&path_str);
        let pool = Pool::builder()
            .max_size(5)
            .build(manager)
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let db = Self {
            pool,
            path: path.as_ref().to_path_buf(),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Path this database was opened at
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn get_conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn init_schema(&self) -> Result<()> {
        let mut conn = self.get_conn()?;

        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                version TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                features TEXT NOT NULL,
                introduced_at TEXT NOT NULL
            )
        "#,
        )
        .execute(&mut conn)?;

        diesel::sql_query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
        "#,
        )
        .execute(&mut conn)?;

        self.register_schema(&CURRENT_SCHEMA)?;
        Ok(())
    }

    fn register_schema(&self, schema: &StoreSchema) -> Result<()> {
        let mut conn = self.get_conn()?;
        let now = chrono::Local::now().to_rfc3339();
        let features_json = serde_json::to_string(&schema.features)?;

        let new_schema = NewSchemaVersion {
            version: &schema.version_string(),
            name: schema.name,
            features: &features_json,
            introduced_at: &now,
        };

        diesel::insert_or_ignore_into(schema_versions::table)
            .values(&new_schema)
            .execute(&mut conn)?;

        Ok(())
    }

    /// Version strings recorded in this database, oldest first
    pub fn schema_versions(&self) -> Result<Vec<String>> {
        let mut conn = self.get_conn()?;
        let versions = schema_versions::table
            .order(schema_versions::id.asc())
            .select(schema_versions::version)
            .load::<String>(&mut conn)?;
        Ok(versions)
    }

    // ========================================================================
    // Key/value operations
    // ========================================================================

    /// Read a value, `None` when the key was never written
    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.get_conn()?;
        let value = kv_store::table
            .filter(kv_store::key.eq(key))
            .select(kv_store::value)
            .first::<String>(&mut conn)
            .optional()?;
        Ok(value)
    }

    /// Write a value, replacing any previous one
    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.get_conn()?;
        let now = chrono::Local::now().to_rfc3339();
        let entry = NewKvEntry {
            key,
            value,
            updated_at: &now,
        };

        diesel::insert_into(kv_store::table)
            .values(&entry)
            .on_conflict(kv_store::key)
            .do_update()
            .set(&entry)
            .execute(&mut conn)?;

        Ok(())
    }

    /// Remove a key. Returns whether anything was deleted.
    pub fn remove_item(&self, key: &str) -> Result<bool> {
        let mut conn = self.get_conn()?;
        let deleted =
            diesel::delete(kv_store::table.filter(kv_store::key.eq(key))).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    /// All stored entries, ordered by key
    pub fn entries(&self) -> Result<Vec<KvEntry>> {
        let mut conn = self.get_conn()?;
        let entries = kv_store::table
            .order(kv_store::key.asc())
            .select(KvEntry::as_select())
            .load(&mut conn)?;
        Ok(entries)
    }
}
