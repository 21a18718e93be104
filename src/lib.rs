//! Tempo: an in-memory task, epic and subtask manager with conflict-free scheduling.
//!
//! Tempo keeps three tables of work items, rejects any schedule that would
//! overlap an existing one, derives epic status and timing from subtasks,
//! and remembers what was recently viewed. A store may be backed by a flat
//! text file that is rewritten after every change.
//!
//! # Example
//!
//! ```no_run
//! use tempo::{Epic, Status, Store, Subtask, Task};
//! use chrono::{Duration, NaiveDate};
//! use std::path::Path;
//!
//! let mut store = Store::open(Path::new("tasks.csv")).unwrap();
//! let ten = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap().and_hms_opt(10, 0, 0).unwrap();
//!
//! // Scheduled work may not overlap
//! store.create_task(Task::new("Standup", "").scheduled(ten, Duration::minutes(30))).unwrap();
//! assert!(store.create_task(Task::new("Review", "").scheduled(ten, Duration::minutes(10))).is_err());
//!
//! // Epics follow their subtasks
//! let epic = store.create_epic(Epic::new("Release", "")).unwrap();
//! store.create_subtask(Subtask::new(epic.id, "Tag", "").with_status(Status::Done)).unwrap();
//! assert_eq!(store.get_epic(epic.id).unwrap().unwrap().status, Status::Done);
//! ```

mod aggregate;
mod history;
mod id;
mod schedule;
mod storage;
mod store;
mod types;

pub mod daemon;
pub mod http;
pub mod protocol;

// Re-export public API
pub use aggregate::{EpicSummary, recompute};
pub use daemon::{Daemon, DaemonConfig, DaemonHandle};
pub use history::HistoryTracker;
pub use id::IdAllocator;
pub use protocol::{Request, Response};
pub use schedule::{IntervalIndex, Slot};
pub use storage::{Snapshot, Storage};
pub use store::{Store, StoreConfig, StoreError};
pub use types::{Entity, Epic, Kind, Status, Subtask, Task, ValidationError};
