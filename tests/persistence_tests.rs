//! Integration tests for the flat-file snapshot.
//!
//! Every mutation rewrites the file, so a reopened store must see exactly
//! what the live one saw.

mod common;

use chrono::Duration;
use common::{TestEnv, at};
use tempo::{Snapshot, Status, Storage, Store, StoreConfig, Subtask, Task};
use tempfile::TempDir;

#[test]
fn test_open_creates_file_with_header() {
    let env = TestEnv::new();
    let text = std::fs::read_to_string(env.path()).unwrap();
    assert!(text.starts_with("type,id,name,status,description,duration,startTime,epicId\n"));
}

#[test]
fn test_round_trip_reproduces_store() {
    let mut env = TestEnv::new();
    let task = env.create_scheduled_task("Write, then \\ edit", at(9, 0), 45);
    let epic = env.create_epic("Release");
    let s1 = env.create_scheduled_subtask(&epic, "Tag", at(11, 0), 15);
    let s2 = env.create_subtask(&epic, "Announce\nloudly", Status::Done);
    env.store.get_subtask(s2.id).unwrap();
    env.store.get_task(task.id).unwrap();

    let reopened = env.reopen();
    assert_eq!(reopened.tasks(), env.store.tasks());
    assert_eq!(reopened.subtasks(), env.store.subtasks());
    assert_eq!(reopened.epics(), env.store.epics());
    assert_eq!(
        reopened.history().iter().map(|e| e.id()).collect::<Vec<_>>(),
        vec![s2.id, task.id]
    );
    assert_eq!(reopened.prioritized().len(), 2);
    assert!(reopened.next_id() > s1.id.max(s2.id));
}

#[test]
fn test_reopened_store_enforces_restored_schedule() {
    let mut env = TestEnv::new();
    env.create_scheduled_task("busy", at(14, 0), 60);

    let mut reopened = env.reopen();
    let clash = Task::new("clash", "").scheduled(at(14, 30), Duration::minutes(10));
    assert!(reopened.create_task(clash).is_err());
}

#[test]
fn test_epic_fields_recomputed_on_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tasks.csv");
    // Stored epic status disagrees with its subtasks
    let text = "\
type,id,name,status,description,duration,startTime,epicId
EPIC,1,Release,NEW,,,,
SUBTASK,2,Tag,DONE,,20,2025-06-02T10:00:00,1
SUBTASK,3,Ship,DONE,,,,1

3
";
    std::fs::write(&path, text).unwrap();

    let mut store = Store::open(&path).unwrap();
    let epic = store.get_epic(1).unwrap().unwrap();
    assert_eq!(epic.status, Status::Done);
    assert_eq!(epic.subtask_ids, vec![2, 3]);
    assert_eq!(epic.duration, Duration::minutes(20));
    assert_eq!(epic.start_time, Some(at(10, 0)));
    assert_eq!(store.history().iter().map(|e| e.id()).collect::<Vec<_>>(), vec![3, 1]);
}

#[test]
fn test_malformed_rows_skipped_on_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tasks.csv");
    let text = "\
type,id,name,status,description,duration,startTime,epicId
TASK,1,Fine,NEW,,,,
TASK,2,Bad time,NEW,,30,yesterday,
TASK,3,Bad status,SOMEDAY,,,,
SUBTASK,4,Orphan,NEW,,,,99

";
    std::fs::write(&path, text).unwrap();

    let store = Store::open(&path).unwrap();
    assert_eq!(store.tasks().len(), 1);
    assert!(store.subtasks().is_empty());
    // The dropped orphan still counts towards the watermark
    assert_eq!(store.next_id(), 5);
}

#[test]
fn test_out_of_range_rows_skipped_on_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tasks.csv");
    let text = "\
type,id,name,status,description,duration,startTime,epicId
TASK,18446744073709551615,Max,NEW,,,,
TASK,2,Huge,NEW,,9223372036854775807,,
TASK,3,Fine,NEW,,30,,

";
    std::fs::write(&path, text).unwrap();

    let mut store = Store::open(&path).unwrap();
    assert_eq!(store.tasks().iter().map(|t| t.id).collect::<Vec<_>>(), vec![3]);

    let created = store.create_task(Task::new("after", "")).unwrap();
    assert_eq!(created.id, 4);
}

#[test]
fn test_max_id_in_snapshot_does_not_exhaust_ids() {
    let snapshot = Snapshot {
        tasks: vec![
            Task {
                id: u64::MAX,
                ..Task::new("max", "")
            },
            Task {
                id: 7,
                ..Task::new("seven", "")
            },
        ],
        ..Snapshot::default()
    };

    let mut store = Store::from_snapshot(snapshot, StoreConfig::default());
    assert_eq!(store.tasks().len(), 1);
    assert_eq!(store.create_task(Task::new("next", "")).unwrap().id, 8);
}

#[test]
fn test_every_mutation_is_persisted() {
    let mut env = TestEnv::new();
    let task = env.create_task("draft");
    assert_eq!(env.reopen().tasks().len(), 1);

    env.store.update_task(task.clone().with_status(Status::InProgress)).unwrap();
    assert_eq!(env.reopen().tasks()[0].status, Status::InProgress);

    env.store.get_task(task.id).unwrap();
    assert_eq!(env.reopen().history().len(), 1);

    env.store.delete_task(task.id).unwrap();
    assert!(env.reopen().tasks().is_empty());
}

#[test]
fn test_snapshot_restore_in_memory() {
    let mut store = Store::in_memory();
    let epic = store.create_epic(tempo::Epic::new("Epic", "")).unwrap();
    let sub = store
        .create_subtask(Subtask::new(epic.id, "Child", "").with_status(Status::InProgress))
        .unwrap();
    store.get(sub.id).unwrap();

    let snapshot: Snapshot = store.snapshot();
    let restored = Store::from_snapshot(snapshot, StoreConfig::default());
    assert_eq!(restored.epics(), store.epics());
    assert_eq!(restored.subtasks(), store.subtasks());
    assert_eq!(restored.history().len(), 1);
    assert_eq!(restored.next_id(), store.next_id());
    assert!(restored.storage_path().is_none());
}

#[test]
fn test_history_limit_applies_on_restore() {
    let mut env = TestEnv::new();
    let ids: Vec<u64> = (0..4).map(|i| env.create_task(&format!("t{}", i)).id).collect();
    for id in &ids {
        env.store.get(*id).unwrap();
    }

    let store = Store::open_with(&env.path(), StoreConfig { history_limit: Some(2) }).unwrap();
    assert_eq!(
        store.history().iter().map(|e| e.id()).collect::<Vec<_>>(),
        vec![ids[2], ids[3]]
    );
}

#[test]
fn test_storage_handle_reads_what_store_wrote() {
    let mut env = TestEnv::new();
    env.create_task("visible");

    let snapshot = Storage::new(env.path()).load().unwrap();
    assert_eq!(snapshot.tasks.len(), 1);
    assert_eq!(snapshot.tasks[0].name, "visible");
}
