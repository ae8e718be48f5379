use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::types::{CalendarItem, CalendarItemPatch, NewCalendarItem};

const SELECT_COLUMNS: &str =
    "SELECT id, title, owner, status, scheduled_for, duration_min, notes FROM calendar_items";

/// Manually planned calendar entries.
///
/// Owned entirely by the dashboard; merged with generated cron occurrences
/// only when the calendar is read.
pub struct CalendarStore {
    db: Mutex<Connection>,
}

impl CalendarStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All items, most recently added first.
    pub fn list(&self) -> Result<Vec<CalendarItem>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!("{SELECT_COLUMNS} ORDER BY rowid DESC"))?;
        let rows = stmt.query_map([], |row| Ok(row_to_item(row)))?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row??);
        }
        Ok(items)
    }

    pub fn get(&self, id: &str) -> Result<Option<CalendarItem>> {
        let db = self.conn();
        let row = db
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                [id],
                |row| Ok(row_to_item(row)),
            )
            .optional()?;
        row.transpose()
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub fn add(&self, input: NewCalendarItem) -> Result<CalendarItem> {
        let item = CalendarItem {
            id: Uuid::new_v4().to_string(),
            title: input.title,
            owner: input.owner,
            status: input.status,
            scheduled_for: input.scheduled_for,
            duration_min: input.duration_min,
            notes: input.notes,
        };
        self.conn().execute(
            "INSERT INTO calendar_items
             (id, title, owner, status, scheduled_for, duration_min, notes)
             VALUES (?1,?2,?3,?4,?5,?6,?7)",
            rusqlite::params![
                item.id,
                item.title,
                item.owner.to_string(),
                item.status.to_string(),
                item.scheduled_for,
                item.duration_min,
                item.notes,
            ],
        )?;
        info!(item_id = %item.id, "calendar item added");
        Ok(item)
    }

    /// Apply `patch` to an existing item. Returns `NotFound` for unknown ids.
    pub fn update(&self, id: &str, patch: CalendarItemPatch) -> Result<CalendarItem> {
        let mut item = self.get(id)?.ok_or_else(|| StoreError::NotFound {
            kind: "Calendar item",
            id: id.to_string(),
        })?;

        if let Some(title) = patch.title {
            item.title = title;
        }
        if let Some(owner) = patch.owner {
            item.owner = owner;
        }
        if let Some(status) = patch.status {
            item.status = status;
        }
        if let Some(scheduled_for) = patch.scheduled_for {
            item.scheduled_for = scheduled_for;
        }
        if patch.duration_min.is_some() {
            item.duration_min = patch.duration_min;
        }
        if patch.notes.is_some() {
            item.notes = patch.notes;
        }

        self.conn().execute(
            "UPDATE calendar_items SET title=?1, owner=?2, status=?3, scheduled_for=?4,
                    duration_min=?5, notes=?6
             WHERE id=?7",
            rusqlite::params![
                item.title,
                item.owner.to_string(),
                item.status.to_string(),
                item.scheduled_for,
                item.duration_min,
                item.notes,
                item.id,
            ],
        )?;
        info!(item_id = %id, "calendar item updated");
        Ok(item)
    }

    /// Delete an item. Deleting an unknown id is not an error.
    pub fn delete(&self, id: &str) -> Result<()> {
        let n = self
            .conn()
            .execute("DELETE FROM calendar_items WHERE id = ?1", [id])?;
        info!(item_id = %id, removed = n, "calendar item deleted");
        Ok(())
    }
}

fn row_to_item(row: &Row<'_>) -> Result<CalendarItem> {
    let owner: String = row.get(2)?;
    let status: String = row.get(3)?;
    Ok(CalendarItem {
        id: row.get(0)?,
        title: row.get(1)?,
        owner: owner.parse().map_err(StoreError::InvalidValue)?,
        status: status.parse().map_err(StoreError::InvalidValue)?,
        scheduled_for: row.get(4)?,
        duration_min: row.get(5)?,
        notes: row.get(6)?,
    })
}
