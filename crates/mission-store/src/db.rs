use rusqlite::Connection;

use crate::error::Result;

/// Initialise every Mission Control table.
///
/// Idempotent; uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS documents (
            key         TEXT    NOT NULL PRIMARY KEY,
            body        TEXT    NOT NULL,   -- JSON document, replaced wholesale
            updated_at  TEXT    NOT NULL
        ) STRICT;

        CREATE TABLE IF NOT EXISTS calendar_items (
            id             TEXT    NOT NULL PRIMARY KEY,
            title          TEXT    NOT NULL,
            owner          TEXT    NOT NULL,
            status         TEXT    NOT NULL,
            scheduled_for  TEXT    NOT NULL,
            duration_min   INTEGER,
            notes          TEXT
        ) STRICT;

        CREATE TABLE IF NOT EXISTS tasks (
            id           TEXT    NOT NULL PRIMARY KEY,
            title        TEXT    NOT NULL,
            description  TEXT,
            status       TEXT    NOT NULL DEFAULT 'inbox',
            owner        TEXT    NOT NULL,
            created_at   INTEGER NOT NULL,   -- epoch ms
            updated_at   INTEGER NOT NULL    -- epoch ms
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_tasks_updated ON tasks (updated_at DESC);
        ",
    )?;
    Ok(())
}

/// Open an in-memory database with the schema applied. Used by tests across
/// the workspace.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_db(&conn)?;
    Ok(conn)
}
