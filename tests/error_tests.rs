//! Integration tests for error handling.
//!
//! Tests that errors are properly returned for invalid operations and that
//! a rejected operation leaves the store untouched.

mod common;

use chrono::{Duration, NaiveDateTime};
use common::{TestEnv, at, store_error};
use tempo::{Epic, Kind, Status, Store, StoreError, Subtask, Task, ValidationError};
use tempfile::TempDir;

// =============================================================================
// Not Found
// =============================================================================

#[test]
fn test_get_nonexistent_returns_none() {
    let mut env = TestEnv::new();
    assert!(env.store.get(42).unwrap().is_none());
    assert!(env.store.get_task(42).unwrap().is_none());
    assert!(env.store.get_epic(42).unwrap().is_none());
    assert!(env.store.get_subtask(42).unwrap().is_none());
}

#[test]
fn test_update_nonexistent_fails_with_kind() {
    let mut env = TestEnv::new();

    let mut task = Task::new("ghost", "");
    task.id = 7;
    assert_eq!(
        store_error(env.store.update_task(task)),
        StoreError::NotFound { kind: Kind::Task, id: 7 }
    );

    let mut epic = Epic::new("ghost", "");
    epic.id = 8;
    assert_eq!(
        store_error(env.store.update_epic(epic)),
        StoreError::NotFound { kind: Kind::Epic, id: 8 }
    );

    let mut sub = Subtask::new(1, "ghost", "");
    sub.id = 9;
    assert_eq!(
        store_error(env.store.update_subtask(sub)),
        StoreError::NotFound {
            kind: Kind::Subtask,
            id: 9
        }
    );
}

#[test]
fn test_update_with_wrong_kind_is_not_found() {
    let mut env = TestEnv::new();
    let epic = env.create_epic("epic");

    let mut task = Task::new("pretend", "");
    task.id = epic.id;
    assert_eq!(
        store_error(env.store.update_task(task)),
        StoreError::NotFound {
            kind: Kind::Task,
            id: epic.id
        }
    );
    assert_eq!(env.epic(epic.id).name, "epic");
}

#[test]
fn test_delete_nonexistent_is_ok() {
    let mut env = TestEnv::new();
    env.store.delete_task(100).unwrap();
    env.store.delete_epic(100).unwrap();
    env.store.delete_subtask(100).unwrap();
}

#[test]
fn test_delete_with_wrong_kind_leaves_entity() {
    let mut env = TestEnv::new();
    let task = env.create_task("survivor");
    env.store.delete_epic(task.id).unwrap();
    env.store.delete_subtask(task.id).unwrap();
    assert_eq!(env.store.tasks().len(), 1);
}

// =============================================================================
// Invalid references
// =============================================================================

#[test]
fn test_subtask_with_missing_epic_rejected() {
    let mut env = TestEnv::new();
    assert_eq!(
        store_error(env.store.create_subtask(Subtask::new(3, "orphan", ""))),
        StoreError::InvalidReference { epic_id: 3 }
    );
    assert_eq!(env.total_count(), 0);
}

#[test]
fn test_subtask_pointing_at_task_rejected() {
    let mut env = TestEnv::new();
    let task = env.create_task("not an epic");
    assert_eq!(
        store_error(env.store.create_subtask(Subtask::new(task.id, "confused", ""))),
        StoreError::InvalidReference { epic_id: task.id }
    );
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_empty_names_rejected() {
    let mut env = TestEnv::new();
    let epic = env.create_epic("epic");

    assert_eq!(
        store_error(env.store.create_task(Task::new("", ""))),
        StoreError::Validation(ValidationError::EmptyName)
    );
    assert_eq!(
        store_error(env.store.create_epic(Epic::new("", ""))),
        StoreError::Validation(ValidationError::EmptyName)
    );
    assert_eq!(
        store_error(env.store.create_subtask(Subtask::new(epic.id, "", ""))),
        StoreError::Validation(ValidationError::EmptyName)
    );
    assert_eq!(env.total_count(), 1);
}

#[test]
fn test_negative_duration_rejected() {
    let mut env = TestEnv::new();
    let task = Task::new("backwards", "").scheduled(at(10, 0), Duration::minutes(-30));
    assert_eq!(
        store_error(env.store.create_task(task)),
        StoreError::Validation(ValidationError::NegativeDuration)
    );
}

#[test]
fn test_end_past_calendar_rejected() {
    let mut env = TestEnv::new();
    let task = Task::new("forever", "").scheduled(NaiveDateTime::MAX, Duration::minutes(1));
    assert_eq!(
        store_error(env.store.create_task(task)),
        StoreError::Validation(ValidationError::ScheduleOverflow)
    );
}

#[test]
fn test_invalid_update_keeps_previous_version() {
    let mut env = TestEnv::new();
    let task = env.create_task("original");

    let broken = Task {
        name: String::new(),
        status: Status::Done,
        ..task.clone()
    };
    assert!(env.store.update_task(broken).is_err());
    assert_eq!(env.store.tasks(), vec![task]);
}

// =============================================================================
// Error messages
// =============================================================================

#[test]
fn test_error_messages_are_readable() {
    let mut env = TestEnv::new();
    let t1 = env.create_scheduled_task("T1", at(10, 0), 30);

    let err = env
        .store
        .create_task(Task::new("T2", "").scheduled(at(10, 15), Duration::minutes(30)))
        .unwrap_err();
    assert_eq!(err.to_string(), format!("time slot overlaps with {}", t1.id));

    let err = env.store.create_subtask(Subtask::new(55, "x", "")).unwrap_err();
    assert_eq!(err.to_string(), "epic does not exist: 55");
}

// =============================================================================
// Persistence failures
// =============================================================================

#[test]
fn test_open_with_bad_header_fails() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tasks.csv");
    std::fs::write(&path, "id,title\n1,hello\n").unwrap();

    assert!(matches!(store_error(Store::open(&path)), StoreError::Persistence(_)));
}

#[test]
fn test_open_directory_fails() {
    let temp_dir = TempDir::new().unwrap();
    assert!(matches!(
        store_error(Store::open(temp_dir.path())),
        StoreError::Persistence(_)
    ));
}
