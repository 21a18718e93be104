//! Shared test infrastructure for Tempo integration tests.
//!
//! Provides TestEnv helper for consistent test setup/teardown.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::path::PathBuf;
use tempo::{Entity, Epic, Slot, Status, Store, StoreError, Subtask, Task};
use tempfile::TempDir;

/// A fixed day so schedules read as plain clock times.
pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 2)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

/// Pull the store error out of a failed operation.
pub fn store_error<T: std::fmt::Debug>(result: eyre::Result<T>) -> StoreError {
    let report = result.expect_err("expected the operation to fail");
    report
        .downcast_ref::<StoreError>()
        .cloned()
        .unwrap_or_else(|| panic!("expected a StoreError, got: {:#}", report))
}

/// Test environment with automatic cleanup.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub store: Store,
}

impl TestEnv {
    /// Create a new test environment with a file-backed store.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Store::open(&temp_dir.path().join("tasks.csv")).expect("Failed to open store");
        Self { temp_dir, store }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> PathBuf {
        self.temp_dir.path().join("tasks.csv")
    }

    /// Open a second store on the same file, as a restart would.
    pub fn reopen(&self) -> Store {
        Store::open(&self.path()).expect("Failed to reopen store")
    }

    /// Create an unscheduled task.
    pub fn create_task(&mut self, name: &str) -> Task {
        self.store.create_task(Task::new(name, "")).expect("Failed to create task")
    }

    /// Create a task occupying `[start, start + minutes)`.
    pub fn create_scheduled_task(&mut self, name: &str, start: NaiveDateTime, minutes: i64) -> Task {
        self.store
            .create_task(Task::new(name, "").scheduled(start, Duration::minutes(minutes)))
            .expect("Failed to create task")
    }

    /// Create an epic.
    pub fn create_epic(&mut self, name: &str) -> Epic {
        self.store.create_epic(Epic::new(name, "")).expect("Failed to create epic")
    }

    /// Create an unscheduled subtask with a status.
    pub fn create_subtask(&mut self, epic: &Epic, name: &str, status: Status) -> Subtask {
        self.store
            .create_subtask(Subtask::new(epic.id, name, "").with_status(status))
            .expect("Failed to create subtask")
    }

    /// Create a subtask occupying `[start, start + minutes)`.
    pub fn create_scheduled_subtask(&mut self, epic: &Epic, name: &str, start: NaiveDateTime, minutes: i64) -> Subtask {
        self.store
            .create_subtask(Subtask::new(epic.id, name, "").scheduled(start, Duration::minutes(minutes)))
            .expect("Failed to create subtask")
    }

    /// Current state of an epic, without recording a view.
    pub fn epic(&self, id: u64) -> Epic {
        match self.store.find(id) {
            Some(Entity::Epic(epic)) => epic,
            other => panic!("expected epic {}, found {:?}", id, other),
        }
    }

    /// Ids in the view history, oldest first.
    pub fn history_ids(&self) -> Vec<u64> {
        self.store.history().iter().map(Entity::id).collect()
    }

    /// Ids in prioritized order.
    pub fn prioritized_ids(&self) -> Vec<u64> {
        self.store.prioritized().iter().map(Entity::id).collect()
    }

    /// Assert no two scheduled entities overlap.
    pub fn assert_no_overlaps(&self) {
        let slots: Vec<(u64, Slot)> = self
            .store
            .prioritized()
            .iter()
            .filter_map(|e| {
                let slot = Slot {
                    start: e.start_time()?,
                    end: e.end_time()?,
                };
                Some((e.id(), slot))
            })
            .collect();
        for (i, (a, slot_a)) in slots.iter().enumerate() {
            for (b, slot_b) in &slots[i + 1..] {
                assert!(!slot_a.overlaps(slot_b), "{} overlaps {}", a, b);
            }
        }
    }

    /// Total entities across all tables.
    pub fn total_count(&self) -> usize {
        self.store.tasks().len() + self.store.epics().len() + self.store.subtasks().len()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
