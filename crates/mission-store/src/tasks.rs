use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::types::{NewTask, TaskItem, TaskPatch};

const SELECT_COLUMNS: &str =
    "SELECT id, title, description, status, owner, created_at, updated_at FROM tasks";

/// Task board persistence.
pub struct TaskStore {
    db: Mutex<Connection>,
}

impl TaskStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All tasks, most recently updated first.
    pub fn list(&self) -> Result<Vec<TaskItem>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "{SELECT_COLUMNS} ORDER BY updated_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map([], |row| Ok(row_to_task(row)))?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row??);
        }
        Ok(tasks)
    }

    pub fn get(&self, id: &str) -> Result<Option<TaskItem>> {
        let db = self.conn();
        let row = db
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                [id],
                |row| Ok(row_to_task(row)),
            )
            .optional()?;
        row.transpose()
    }

    /// Insert a task. Status defaults to `inbox`.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub fn create(&self, input: NewTask) -> Result<TaskItem> {
        let now = chrono::Utc::now().timestamp_millis();
        let task = TaskItem {
            id: Uuid::new_v4().to_string(),
            title: input.title,
            description: input.description,
            status: input.status.unwrap_or_default(),
            owner: input.owner,
            created_at: now,
            updated_at: now,
        };
        self.conn().execute(
            "INSERT INTO tasks (id, title, description, status, owner, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?6)",
            rusqlite::params![
                task.id,
                task.title,
                task.description,
                task.status.to_string(),
                task.owner.to_string(),
                now,
            ],
        )?;
        info!(task_id = %task.id, "task created");
        Ok(task)
    }

    /// Apply `patch` and bump `updated_at`.
    pub fn update(&self, id: &str, patch: TaskPatch) -> Result<TaskItem> {
        let mut task = self.get(id)?.ok_or_else(|| StoreError::NotFound {
            kind: "Task",
            id: id.to_string(),
        })?;

        if let Some(title) = patch.title {
            task.title = title;
        }
        if patch.description.is_some() {
            task.description = patch.description;
        }
        if let Some(owner) = patch.owner {
            task.owner = owner;
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        // Strictly increasing so back-to-back edits still reorder the board.
        task.updated_at = chrono::Utc::now()
            .timestamp_millis()
            .max(task.updated_at + 1);

        self.conn().execute(
            "UPDATE tasks SET title=?1, description=?2, status=?3, owner=?4, updated_at=?5
             WHERE id=?6",
            rusqlite::params![
                task.title,
                task.description,
                task.status.to_string(),
                task.owner.to_string(),
                task.updated_at,
                task.id,
            ],
        )?;
        info!(task_id = %id, status = %task.status, "task updated");
        Ok(task)
    }
}

fn row_to_task(row: &Row<'_>) -> Result<TaskItem> {
    let status: String = row.get(3)?;
    let owner: String = row.get(4)?;
    Ok(TaskItem {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: status.parse().map_err(StoreError::InvalidValue)?,
        owner: owner.parse().map_err(StoreError::InvalidValue)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
