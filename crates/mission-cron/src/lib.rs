//! `mission-cron`: occurrence engine and TTL cache for external cron jobs.
//!
//! # Overview
//!
//! The external scheduler (`openclaw cron list --json`) is queried through a
//! [`fetcher::SnapshotFetcher`], its jobs are normalized into
//! [`types::ScheduleDescriptor`]s, and [`schedule::generate`] expands them
//! into concrete [`types::Occurrence`]s over a bounded horizon. The
//! [`coordinator::CacheCoordinator`] keeps the result in the document store
//! and refreshes it at most once at a time.
//!
//! # Schedule rules
//!
//! | Kind    | Behaviour                                               |
//! |---------|---------------------------------------------------------|
//! | `at`    | Single instant, kept only inside the window             |
//! | `every` | Fixed step from the job's creation time                 |
//! | `cron`  | 5- or 6-field expression, evaluated in an IANA timezone |

pub mod coordinator;
pub mod error;
pub mod fetcher;
pub mod schedule;
pub mod snapshot;
pub mod types;

pub use coordinator::{CacheCoordinator, Clock, SystemClock, CACHE_KEY, SNAPSHOT_KEY};
pub use error::{CronError, Result};
pub use fetcher::{CliSnapshotFetcher, SnapshotFetcher};
pub use schedule::{generate, Horizon};
pub use types::{
    CacheMeta, CachePayload, CacheState, CronData, Occurrence, ScheduleDescriptor, ScheduleRule,
};
