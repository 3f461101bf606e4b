//! SQLite persistence layer: the inventory table and the theft ledger.
//!
//! Two tables, schema created idempotently at open:
//!
//! ```text
//! inventory(user_id INTEGER, item TEXT)
//! stolen_items(thief_id INTEGER, victim_id INTEGER, item TEXT, timestamp TEXT)
//! ```
//!
//! A user's inventory is a multiset of item names: duplicates are ordinary
//! rows, nothing is unique-keyed. The stolen_items table is an append log of
//! thief→victim transfers, consumed newest-first when a theft is reversed.
//!
//! Concurrency: the connection sits behind a `Mutex`, and every multi-step
//! engine operation runs inside one SQL transaction via [`Store::with_tx`].
//! The guard plus the transaction make each operation serializable; the
//! random-pick-then-delete pattern in theft never races a concurrent
//! operation on the same owner. Row helpers in this module take a
//! [`Transaction`] so callers choose the atomic boundary.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use thiserror::Error;

/// Chat-platform user identifier (a snowflake-style integer).
pub type UserId = i64;

/// Errors that can arise while interacting with the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Wrapper around rusqlite's error type.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection mutex was poisoned by a panicking thread.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Handle to the SQLite database holding inventories and the theft ledger.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) a database at the given path and ensure the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS inventory (
                 user_id INTEGER NOT NULL,
                 item    TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_inventory_user ON inventory(user_id);
             CREATE TABLE IF NOT EXISTS stolen_items (
                 thief_id  INTEGER NOT NULL,
                 victim_id INTEGER NOT NULL,
                 item      TEXT NOT NULL,
                 timestamp TEXT NOT NULL
             );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` inside a single SQL transaction.
    ///
    /// Commits when `f` returns `Ok`; any error rolls the whole transaction
    /// back, so no partial mutation is ever visible. The error type only has
    /// to be convertible from [`StoreError`] so the engine can thread its own
    /// domain errors through.
    pub fn with_tx<T, E>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| E::from(StoreError::Poisoned))?;
        let tx = conn
            .transaction()
            .map_err(|e| E::from(StoreError::from(e)))?;
        let out = f(&tx)?;
        tx.commit().map_err(|e| E::from(StoreError::from(e)))?;
        Ok(out)
    }

    /// Insert one inventory entry (single-statement convenience).
    pub fn add_item(&self, owner: UserId, item: &str) -> Result<(), StoreError> {
        self.with_tx(|tx| add_item(tx, owner, item))
    }

    /// All items currently held by `owner`, in insertion order.
    pub fn list_items(&self, owner: UserId) -> Result<Vec<String>, StoreError> {
        self.with_tx(|tx| list_items(tx, owner))
    }

    /// How many instances of `item` the owner holds.
    pub fn count_item(&self, owner: UserId, item: &str) -> Result<u32, StoreError> {
        self.with_tx(|tx| count_item(tx, owner, item))
    }

    /// Items recorded as stolen by `thief` from `victim`, oldest first.
    pub fn stolen_records(&self, thief: UserId, victim: UserId) -> Result<Vec<String>, StoreError> {
        self.with_tx(|tx| {
            let mut stmt = tx.prepare(
                "SELECT item FROM stolen_items
                 WHERE thief_id = ?1 AND victim_id = ?2
                 ORDER BY timestamp, rowid",
            )?;
            let rows = stmt.query_map(params![thief, victim], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
        })
    }

    /// Row totals for the status report: `(inventory_rows, stolen_rows)`.
    pub fn totals(&self) -> Result<(i64, i64), StoreError> {
        self.with_tx(|tx| {
            let inv: i64 = tx.query_row("SELECT COUNT(*) FROM inventory", [], |r| r.get(0))?;
            let stolen: i64 = tx.query_row("SELECT COUNT(*) FROM stolen_items", [], |r| r.get(0))?;
            Ok((inv, stolen))
        })
    }
}

// ---------------------------------------------------------------------------
// Inventory rows
// ---------------------------------------------------------------------------

/// Insert one `(owner, item)` entry. Duplicates are fine; never fails.
pub fn add_item(tx: &Transaction<'_>, owner: UserId, item: &str) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO inventory (user_id, item) VALUES (?1, ?2)",
        params![owner, item],
    )?;
    Ok(())
}

/// Delete at most one matching entry (any duplicate; no ordering guarantee).
/// Returns whether an entry was found and removed.
pub fn remove_one(tx: &Transaction<'_>, owner: UserId, item: &str) -> Result<bool, StoreError> {
    let affected = tx.execute(
        "DELETE FROM inventory WHERE rowid IN (
             SELECT rowid FROM inventory WHERE user_id = ?1 AND item = ?2 LIMIT 1
         )",
        params![owner, item],
    )?;
    Ok(affected == 1)
}

/// All items held by `owner`, in insertion order (display only; the order
/// carries no meaning beyond that).
pub fn list_items(tx: &Transaction<'_>, owner: UserId) -> Result<Vec<String>, StoreError> {
    let mut stmt = tx.prepare("SELECT item FROM inventory WHERE user_id = ?1 ORDER BY rowid")?;
    let rows = stmt.query_map(params![owner], |row| row.get::<_, String>(0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
}

/// Count instances of `item` held by `owner`.
pub fn count_item(tx: &Transaction<'_>, owner: UserId, item: &str) -> Result<u32, StoreError> {
    let n: u32 = tx.query_row(
        "SELECT COUNT(*) FROM inventory WHERE user_id = ?1 AND item = ?2",
        params![owner, item],
        |row| row.get(0),
    )?;
    Ok(n)
}

/// Pick a uniformly random entry among the owner's current entries, or `None`
/// if the inventory is empty. Candidates are loaded and the pick made
/// in-memory so the read and any following delete share one transaction.
pub fn pick_random(tx: &Transaction<'_>, owner: UserId) -> Result<Option<String>, StoreError> {
    use rand::seq::SliceRandom;
    let items = list_items(tx, owner)?;
    let mut rng = rand::thread_rng();
    Ok(items.choose(&mut rng).cloned())
}

/// Delete every protective-gadget entry held by `owner`, returning how many
/// rows went away (zero or more; duplicates all count).
pub fn remove_all_protective(tx: &Transaction<'_>, owner: UserId) -> Result<usize, StoreError> {
    let affected = tx.execute(
        "DELETE FROM inventory WHERE user_id = ?1 AND item IN (?2, ?3)",
        params![
            owner,
            crate::catalog::PROTECTIVE_GADGETS[0],
            crate::catalog::PROTECTIVE_GADGETS[1]
        ],
    )?;
    Ok(affected)
}

// ---------------------------------------------------------------------------
// Theft ledger rows
// ---------------------------------------------------------------------------

/// Append a timestamped thief→victim→item record.
pub fn record_theft(
    tx: &Transaction<'_>,
    thief: UserId,
    victim: UserId,
    item: &str,
) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO stolen_items (thief_id, victim_id, item, timestamp) VALUES (?1, ?2, ?3, ?4)",
        params![thief, victim, item, Utc::now()],
    )?;
    Ok(())
}

/// The most recently stolen item for the ordered `(thief, victim)` pair, or
/// `None`. Latest timestamp wins; ties break by insertion order.
pub fn most_recent_theft(
    tx: &Transaction<'_>,
    thief: UserId,
    victim: UserId,
) -> Result<Option<String>, StoreError> {
    let item = tx
        .query_row(
            "SELECT item FROM stolen_items
             WHERE thief_id = ?1 AND victim_id = ?2
             ORDER BY timestamp DESC, rowid DESC
             LIMIT 1",
            params![thief, victim],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(item)
}

/// Delete exactly one matching ledger record (the most recent one), used when
/// a theft is reversed. Returns whether a record was found.
pub fn consume_theft_record(
    tx: &Transaction<'_>,
    thief: UserId,
    victim: UserId,
    item: &str,
) -> Result<bool, StoreError> {
    let affected = tx.execute(
        "DELETE FROM stolen_items WHERE rowid IN (
             SELECT rowid FROM stolen_items
             WHERE thief_id = ?1 AND victim_id = ?2 AND item = ?3
             ORDER BY timestamp DESC, rowid DESC
             LIMIT 1
         )",
        params![thief, victim, item],
    )?;
    Ok(affected == 1)
}
