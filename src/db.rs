//! SQLite database with Diesel ORM
//!
//! Plays the part of the browser's local storage (one key/value table) and
//! keeps a history of fetched result snapshots.

use crate::identity::KeyValueStore;
use crate::schema::*;
use crate::status::ResultRow;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use std::path::Path;

// ============================================================================
// Diesel Models
// ============================================================================

/// Insertable (or replaceable) local storage entry
#[derive(Insertable)]
#[diesel(table_name = local_storage)]
pub struct NewStorageEntry<'a> {
    pub key: &'a str,
    pub value: &'a str,
    pub updated_at: &'a str,
}

/// Insertable result snapshot row
#[derive(Insertable)]
#[diesel(table_name = result_history)]
pub struct NewHistoryRecord<'a> {
    pub identity: &'a str,
    pub image_id: &'a str,
    pub raw_status: &'a str,
    pub condition: &'a str,
    pub fetched_at: &'a str,
}

/// Queryable result snapshot row
#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = result_history)]
pub struct HistoryRecord {
    pub id: i32,
    pub identity: String,
    pub image_id: String,
    pub raw_status: String,
    pub condition: String,
    pub fetched_at: String,
}

// ============================================================================
// Database Connection
// ============================================================================

type DbPool = Pool<ConnectionManager<SqliteConnection>>;
type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Database connection wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

/// Error type for database operations
#[derive(Debug)]
pub enum DbError {
    Connection(String),
    Query(diesel::result::Error),
    Pool(diesel::r2d2::Error),
}

impl std::fmt::Display for DbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbError::Connection(msg) => write!(f, "Connection error: {}", msg),
            DbError::Query(e) => write!(f, "Query error: {}", e),
            DbError::Pool(e) => write!(f, "Pool error: {}", e),
        }
    }
}

impl std::error::Error for DbError {}

impl From<diesel::result::Error> for DbError {
    fn from(e: diesel::result::Error) -> Self {
        DbError::Query(e)
    }
}

impl From<diesel::r2d2::Error> for DbError {
    fn from(e: diesel::r2d2::Error) -> Self {
        DbError::Pool(e)
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

impl Database {
    /// Open database at specified path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(&path_str);
        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .map_err(|e| DbError::Connection(e.to_string()))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    fn get_conn(&self) -> Result<DbConn> {
        self.pool.get().map_err(|e| DbError::Connection(e.to_string()))
    }

    fn init_schema(&self) -> Result<()> {
        let mut conn = self.get_conn()?;

        diesel::sql_query(r#"
            CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
        "#).execute(&mut conn)?;

        diesel::sql_query(r#"
            CREATE TABLE IF NOT EXISTS result_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                identity TEXT NOT NULL,
                image_id TEXT NOT NULL,
                raw_status TEXT NOT NULL,
                condition TEXT NOT NULL,
                fetched_at TEXT NOT NULL
            )
        "#).execute(&mut conn)?;

        diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_history_identity ON result_history(identity)").execute(&mut conn)?;
        diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_history_fetched_at ON result_history(fetched_at)").execute(&mut conn)?;

        Ok(())
    }

    // ========================================================================
    // Local Storage
    // ========================================================================

    /// Read a stored value
    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.get_conn()?;
        let value = local_storage::table
            .filter(local_storage::key.eq(key))
            .select(local_storage::value)
            .first::<String>(&mut conn)
            .optional()?;
        Ok(value)
    }

    /// Store a value, replacing any previous one under the same key
    pub fn set_value(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.get_conn()?;
        let now = chrono::Local::now().to_rfc3339();

        diesel::replace_into(local_storage::table)
            .values(&NewStorageEntry { key, value, updated_at: &now })
            .execute(&mut conn)?;

        Ok(())
    }

    // ========================================================================
    // Result History
    // ========================================================================

    /// Store one snapshot row per rendered result
    pub fn insert_snapshot(&self, identity: &str, rows: &[ResultRow]) -> Result<usize> {
        let mut conn = self.get_conn()?;
        let now = chrono::Local::now().to_rfc3339();

        let inserted = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            for row in rows {
                let condition = row.badge.condition.to_string();
                diesel::insert_into(result_history::table)
                    .values(&NewHistoryRecord {
                        identity,
                        image_id: &row.image_id,
                        raw_status: &row.raw_status,
                        condition: &condition,
                        fetched_at: &now,
                    })
                    .execute(conn)?;
            }
            Ok(rows.len())
        })?;

        Ok(inserted)
    }

    /// Most recent snapshot rows, newest first
    pub fn recent_history(&self, limit: i64) -> Result<Vec<HistoryRecord>> {
        let mut conn = self.get_conn()?;
        let records = result_history::table
            .order((result_history::fetched_at.desc(), result_history::id.desc()))
            .limit(limit)
            .load::<HistoryRecord>(&mut conn)?;
        Ok(records)
    }

    /// Most recent snapshot rows for one identity, newest first
    pub fn history_for(&self, identity: &str, limit: i64) -> Result<Vec<HistoryRecord>> {
        let mut conn = self.get_conn()?;
        let records = result_history::table
            .filter(result_history::identity.eq(identity))
            .order((result_history::fetched_at.desc(), result_history::id.desc()))
            .limit(limit)
            .load::<HistoryRecord>(&mut conn)?;
        Ok(records)
    }

    /// Delete all history rows
    pub fn clear_history(&self) -> Result<usize> {
        let mut conn = self.get_conn()?;
        let count = diesel::delete(result_history::table).execute(&mut conn)?;
        Ok(count)
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_value(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{classify, Condition};

    fn temp_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn row(id: &str, status: &str) -> ResultRow {
        ResultRow {
            image_id: id.to_string(),
            raw_status: status.to_string(),
            badge: classify(status),
        }
    }

    // ==========================================================================
    // LOCAL STORAGE TESTS
    // ==========================================================================

    #[test]
    fn test_missing_key_is_none() {
        let (_dir, db) = temp_db();
        assert_eq!(db.get_value("ti_userId").unwrap(), None);
    }

    #[test]
    fn test_set_then_get() {
        let (_dir, db) = temp_db();
        db.set_value("ti_userId", "abc").unwrap();
        assert_eq!(db.get_value("ti_userId").unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_set_replaces_existing_value() {
        let (_dir, db) = temp_db();
        db.set_value("k", "first").unwrap();
        db.set_value("k", "second").unwrap();
        assert_eq!(db.get_value("k").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.db");
        Database::open_at(&path).unwrap().set_value("k", "v").unwrap();

        let reopened = Database::open_at(&path).unwrap();
        assert_eq!(reopened.get_value("k").unwrap().as_deref(), Some("v"));
    }

    // ==========================================================================
    // RESULT HISTORY TESTS
    // ==========================================================================

    #[test]
    fn test_snapshot_rows_are_stored() {
        let (_dir, db) = temp_db();
        let rows = vec![row("a1", "양호"), row("a2", "HIGH")];
        assert_eq!(db.insert_snapshot("user-1", &rows).unwrap(), 2);

        let history = db.recent_history(10).unwrap();
        assert_eq!(history.len(), 2);
        // Same timestamp, so the later insert comes first
        assert_eq!(history[0].image_id, "a2");
        assert_eq!(history[0].condition, Condition::Bad.to_string());
        assert_eq!(history[1].image_id, "a1");
        assert_eq!(history[1].raw_status, "양호");
    }

    #[test]
    fn test_history_filtered_by_identity() {
        let (_dir, db) = temp_db();
        db.insert_snapshot("user-1", &[row("a1", "LOW")]).unwrap();
        db.insert_snapshot("user-2", &[row("b1", "MID")]).unwrap();

        let history = db.history_for("user-2", 10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].image_id, "b1");
    }

    #[test]
    fn test_history_limit_and_clear() {
        let (_dir, db) = temp_db();
        let rows: Vec<ResultRow> = (0..5).map(|i| row(&format!("id{}", i), "")).collect();
        db.insert_snapshot("u", &rows).unwrap();

        assert_eq!(db.recent_history(3).unwrap().len(), 3);
        assert_eq!(db.clear_history().unwrap(), 5);
        assert!(db.recent_history(10).unwrap().is_empty());
    }
}
