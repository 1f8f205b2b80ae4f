//! Database schema migrations for the member store.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use indoc::indoc;
use rusqlite::{Connection, Result as SqliteResult};

/// Schema version produced by [`migrate`].
pub const CURRENT_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);
    tracing::debug!(current_version, target_version = CURRENT_VERSION, "checking member schema");

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
pub(crate) fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: members table keyed by owner.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(indoc! {"
        CREATE TABLE IF NOT EXISTS members (
            owner_id            TEXT NOT NULL,
            id                  TEXT NOT NULL,
            first_name          TEXT NOT NULL,
            last_name           TEXT NOT NULL,
            phone               TEXT NOT NULL,
            plan_duration_days  INTEGER NOT NULL DEFAULT 30,
            registration_date   TEXT,
            is_active           INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (owner_id, id)
        );
    "})?;
    set_schema_version(&tx, 1)?;
    tx.commit()?;
    tracing::info!("member schema migrated to v1");
    Ok(())
}

/// Migration v2: bookkeeping timestamps and an owner index for listing.
///
/// Existing rows get `created_at = updated_at = ''`.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(indoc! {"
        ALTER TABLE members ADD COLUMN created_at TEXT NOT NULL DEFAULT '';
        ALTER TABLE members ADD COLUMN updated_at TEXT NOT NULL DEFAULT '';
        CREATE INDEX IF NOT EXISTS idx_members_owner ON members(owner_id);
    "})?;
    set_schema_version(&tx, 2)?;
    tx.commit()?;
    tracing::info!("member schema migrated to v2");
    Ok(())
}
