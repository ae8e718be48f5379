//! `mission-store`: SQLite persistence for Mission Control.
//!
//! Two shapes of data live here:
//!
//! | Shape          | Used for                                         |
//! |----------------|--------------------------------------------------|
//! | Key-documents  | cron descriptor snapshot, cron cache, settings   |
//! | Tables         | calendar items, tasks                            |
//!
//! Every document write replaces the whole document in a single statement,
//! so readers never observe a half-written value.

pub mod calendar;
pub mod db;
pub mod documents;
pub mod error;
pub mod settings;
pub mod tasks;
pub mod types;

pub use calendar::CalendarStore;
pub use documents::{read_doc, write_doc, DocumentStore, SqliteDocumentStore};
pub use error::{Result, StoreError};
pub use settings::SettingsStore;
pub use tasks::TaskStore;
pub use types::{
    AppSettings, CalendarItem, CalendarItemPatch, CalendarStatus, NewCalendarItem, NewTask, Owner,
    SettingsPatch, TaskItem, TaskPatch, TaskStatus,
};
