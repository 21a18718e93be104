//! High-level store API for tempo.

use crate::aggregate;
use crate::history::HistoryTracker;
use crate::id::IdAllocator;
use crate::schedule::{IntervalIndex, Slot};
use crate::storage::{Snapshot, Storage};
use crate::types::{Entity, Epic, Kind, Subtask, Task, ValidationError};
use eyre::{Result, eyre};
use std::collections::BTreeMap;
use std::path::Path;

/// Errors that can occur during store operations.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No live entity of that kind has this id.
    NotFound { kind: Kind, id: u64 },
    /// The requested slot overlaps another scheduled entity.
    /// `id` is 0 when the entity was being created.
    SchedulingConflict { id: u64, conflicts_with: u64 },
    /// A subtask names an epic that does not exist.
    InvalidReference { epic_id: u64 },
    /// Validation error.
    Validation(ValidationError),
    /// Reading or writing the snapshot file failed.
    Persistence(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound { kind, id } => write!(f, "{} not found: {}", kind.as_str().to_lowercase(), id),
            StoreError::SchedulingConflict { id: 0, conflicts_with } => {
                write!(f, "time slot overlaps with {}", conflicts_with)
            }
            StoreError::SchedulingConflict { id, conflicts_with } => {
                write!(f, "time slot of {} overlaps with {}", id, conflicts_with)
            }
            StoreError::InvalidReference { epic_id } => write!(f, "epic does not exist: {}", epic_id),
            StoreError::Validation(e) => write!(f, "validation error: {}", e),
            StoreError::Persistence(msg) => write!(f, "persistence failure: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Store tuning.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Maximum history entries; `None` keeps everything.
    pub history_limit: Option<usize>,
}

/// The main tempo store.
///
/// Operations either apply completely (tables, schedule index, history,
/// epic aggregates) or are rejected before anything changes. When opened on
/// a file, every mutation rewrites the whole snapshot.
#[derive(Debug)]
pub struct Store {
    tasks: BTreeMap<u64, Task>,
    epics: BTreeMap<u64, Epic>,
    subtasks: BTreeMap<u64, Subtask>,
    ids: IdAllocator,
    schedule: IntervalIndex,
    history: HistoryTracker,
    storage: Option<Storage>,
}

impl Store {
    /// A store that lives only in memory.
    pub fn in_memory() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            tasks: BTreeMap::new(),
            epics: BTreeMap::new(),
            subtasks: BTreeMap::new(),
            ids: IdAllocator::new(),
            schedule: IntervalIndex::new(),
            history: HistoryTracker::with_limit(config.history_limit),
            storage: None,
        }
    }

    /// Open a file-backed store, creating the file if it does not exist.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, StoreConfig::default())
    }

    pub fn open_with(path: &Path, config: StoreConfig) -> Result<Self> {
        let storage = Storage::new(path);
        let existed = storage.exists();

        let mut store = if existed {
            let snapshot = storage.load().map_err(persistence)?;
            Self::from_snapshot(snapshot, config)
        } else {
            Self::with_config(config)
        };
        store.storage = Some(storage);

        if !existed {
            store.persist()?;
        }

        log::info!(
            "Opened store at {} ({} tasks, {} epics, {} subtasks)",
            path.display(),
            store.tasks.len(),
            store.epics.len(),
            store.subtasks.len()
        );
        Ok(store)
    }

    /// Rebuild a store from a snapshot.
    ///
    /// Subtasks are re-attached to their epics, epic fields recomputed, and
    /// history replayed in order. Rows that break an invariant (duplicate id,
    /// missing epic, overlapping slot, invalid fields) are dropped with a warning.
    pub fn from_snapshot(snapshot: Snapshot, config: StoreConfig) -> Self {
        let mut store = Self::with_config(config);
        let mut max_id = 0;
        // u64::MAX rows are dropped below and must not exhaust the allocator.
        let mut seen = |id: u64| {
            if id != u64::MAX {
                max_id = max_id.max(id);
            }
        };

        for epic in snapshot.epics {
            seen(epic.id);
            if !store.admit(epic.id, epic.validate(), None) {
                continue;
            }
            store.epics.insert(
                epic.id,
                Epic {
                    subtask_ids: Vec::new(),
                    ..epic
                },
            );
        }

        for task in snapshot.tasks {
            seen(task.id);
            let slot = task.slot();
            if !store.admit(task.id, task.validate(), slot) {
                continue;
            }
            if let Some(slot) = slot {
                store.schedule.insert(task.id, slot);
            }
            store.tasks.insert(task.id, task);
        }

        for subtask in snapshot.subtasks {
            seen(subtask.id);
            let slot = subtask.slot();
            if !store.epics.contains_key(&subtask.epic_id) {
                log::warn!("Dropping subtask {}: epic {} is missing", subtask.id, subtask.epic_id);
                continue;
            }
            if !store.admit(subtask.id, subtask.validate(), slot) {
                continue;
            }
            if let Some(slot) = slot {
                store.schedule.insert(subtask.id, slot);
            }
            if let Some(epic) = store.epics.get_mut(&subtask.epic_id) {
                epic.subtask_ids.push(subtask.id);
            }
            store.subtasks.insert(subtask.id, subtask);
        }

        let epic_ids: Vec<u64> = store.epics.keys().copied().collect();
        for epic_id in epic_ids {
            store.refresh_epic(epic_id);
        }

        store.ids = IdAllocator::starting_after(max_id);

        for id in snapshot.history {
            if store.contains(id) {
                store.history.add(id);
            } else {
                log::warn!("Dropping history entry {}: no such entity", id);
            }
        }

        store
    }

    /// Whether a restored row may enter the tables.
    fn admit(&self, id: u64, validation: Result<(), ValidationError>, slot: Option<Slot>) -> bool {
        if id == 0 || id == u64::MAX || self.contains(id) {
            log::warn!("Dropping row with duplicate or out-of-range id {}", id);
            return false;
        }
        if let Err(e) = validation {
            log::warn!("Dropping row {}: {}", id, e);
            return false;
        }
        if let Some(slot) = slot
            && let Some(other) = self.schedule.find_conflict(&slot, None)
        {
            log::warn!("Dropping row {}: time slot overlaps with {}", id, other);
            return false;
        }
        true
    }

    /// Full state as written to disk.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tasks: self.tasks.values().cloned().collect(),
            epics: self.epics.values().cloned().collect(),
            subtasks: self.subtasks.values().cloned().collect(),
            history: self.history.list(),
        }
    }

    /// Path of the backing file, if any.
    pub fn storage_path(&self) -> Option<&Path> {
        self.storage.as_ref().map(Storage::path)
    }

    /// The id the next created entity will receive.
    pub fn next_id(&self) -> u64 {
        self.ids.peek()
    }

    fn persist(&self) -> Result<()> {
        if let Some(storage) = &self.storage {
            storage.save(&self.snapshot()).map_err(persistence)?;
        }
        Ok(())
    }

    fn check_slot(&self, slot: Option<Slot>, id: Option<u64>) -> Result<()> {
        if let Some(slot) = slot
            && let Some(other) = self.schedule.find_conflict(&slot, id)
        {
            log::warn!("Rejected slot {} - {}: overlaps with {}", slot.start, slot.end, other);
            return Err(eyre!(StoreError::SchedulingConflict {
                id: id.unwrap_or(0),
                conflicts_with: other,
            }));
        }
        Ok(())
    }

    fn place(&mut self, id: u64, slot: Option<Slot>) {
        match slot {
            Some(slot) => self.schedule.insert(id, slot),
            None => {
                self.schedule.remove(id);
            }
        }
    }

    fn refresh_epic(&mut self, epic_id: u64) {
        let Some(epic) = self.epics.get_mut(&epic_id) else {
            return;
        };
        let subtasks = &self.subtasks;
        aggregate::recompute(epic.subtask_ids.iter().filter_map(|id| subtasks.get(id))).apply_to(epic);
    }

    fn forget(&mut self, id: u64) {
        self.schedule.remove(id);
        self.history.remove(id);
    }

    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Create a task. Any id on the draft is ignored.
    pub fn create_task(&mut self, draft: Task) -> Result<Task> {
        draft.validate().map_err(|e| eyre!(StoreError::Validation(e)))?;
        let slot = draft.slot();
        self.check_slot(slot, None)?;

        let id = self.ids.allocate()?;
        let task = Task { id, ..draft };
        self.place(id, slot);
        self.tasks.insert(id, task.clone());

        log::info!("Created task {} '{}'", id, task.name);
        self.persist()?;
        Ok(task)
    }

    /// Create an epic. Children and derived fields on the draft are ignored.
    pub fn create_epic(&mut self, draft: Epic) -> Result<Epic> {
        draft.validate().map_err(|e| eyre!(StoreError::Validation(e)))?;

        let id = self.ids.allocate()?;
        let epic = Epic {
            id,
            ..Epic::new(draft.name, draft.description)
        };
        self.epics.insert(id, epic.clone());

        log::info!("Created epic {} '{}'", id, epic.name);
        self.persist()?;
        Ok(epic)
    }

    /// Create a subtask under an existing epic.
    pub fn create_subtask(&mut self, draft: Subtask) -> Result<Subtask> {
        draft.validate().map_err(|e| eyre!(StoreError::Validation(e)))?;
        if !self.epics.contains_key(&draft.epic_id) {
            return Err(eyre!(StoreError::InvalidReference { epic_id: draft.epic_id }));
        }
        let slot = draft.slot();
        self.check_slot(slot, None)?;

        let id = self.ids.allocate()?;
        let subtask = Subtask { id, ..draft };
        self.place(id, slot);
        self.subtasks.insert(id, subtask.clone());
        if let Some(epic) = self.epics.get_mut(&subtask.epic_id) {
            epic.subtask_ids.push(id);
        }
        self.refresh_epic(subtask.epic_id);

        log::info!("Created subtask {} '{}' in epic {}", id, subtask.name, subtask.epic_id);
        self.persist()?;
        Ok(subtask)
    }

    // ------------------------------------------------------------------
    // Read (records history)
    // ------------------------------------------------------------------

    /// Get a task by ID, recording the view.
    pub fn get_task(&mut self, id: u64) -> Result<Option<Task>> {
        let Some(task) = self.tasks.get(&id).cloned() else {
            return Ok(None);
        };
        self.record_view(id)?;
        Ok(Some(task))
    }

    pub fn get_epic(&mut self, id: u64) -> Result<Option<Epic>> {
        let Some(epic) = self.epics.get(&id).cloned() else {
            return Ok(None);
        };
        self.record_view(id)?;
        Ok(Some(epic))
    }

    pub fn get_subtask(&mut self, id: u64) -> Result<Option<Subtask>> {
        let Some(subtask) = self.subtasks.get(&id).cloned() else {
            return Ok(None);
        };
        self.record_view(id)?;
        Ok(Some(subtask))
    }

    /// Get any entity by ID, recording the view.
    pub fn get(&mut self, id: u64) -> Result<Option<Entity>> {
        let Some(entity) = self.find(id) else {
            return Ok(None);
        };
        self.record_view(id)?;
        Ok(Some(entity))
    }

    fn record_view(&mut self, id: u64) -> Result<()> {
        log::debug!("Viewed {}", id);
        self.history.add(id);
        self.persist()
    }

    /// Look up any entity without recording a view.
    pub fn find(&self, id: u64) -> Option<Entity> {
        if let Some(task) = self.tasks.get(&id) {
            return Some(Entity::Task(task.clone()));
        }
        if let Some(epic) = self.epics.get(&id) {
            return Some(Entity::Epic(epic.clone()));
        }
        self.subtasks.get(&id).map(|s| Entity::Subtask(s.clone()))
    }

    /// Whether any table holds `id`.
    pub fn contains(&self, id: u64) -> bool {
        self.tasks.contains_key(&id) || self.epics.contains_key(&id) || self.subtasks.contains_key(&id)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Replace a task. Its own previous slot never counts as a conflict.
    pub fn update_task(&mut self, task: Task) -> Result<Task> {
        if !self.tasks.contains_key(&task.id) {
            return Err(eyre!(StoreError::NotFound {
                kind: Kind::Task,
                id: task.id,
            }));
        }
        task.validate().map_err(|e| eyre!(StoreError::Validation(e)))?;
        let slot = task.slot();
        self.check_slot(slot, Some(task.id))?;

        self.place(task.id, slot);
        self.tasks.insert(task.id, task.clone());

        log::info!("Updated task {}", task.id);
        self.persist()?;
        Ok(task)
    }

    /// Rename or re-describe an epic. Children and derived fields are kept.
    pub fn update_epic(&mut self, epic: Epic) -> Result<Epic> {
        let Some(stored) = self.epics.get_mut(&epic.id) else {
            return Err(eyre!(StoreError::NotFound {
                kind: Kind::Epic,
                id: epic.id,
            }));
        };
        epic.validate().map_err(|e| eyre!(StoreError::Validation(e)))?;
        stored.name = epic.name;
        stored.description = epic.description;
        let updated = stored.clone();

        log::info!("Updated epic {}", updated.id);
        self.persist()?;
        Ok(updated)
    }

    /// Replace a subtask, moving it between epics if `epic_id` changed.
    pub fn update_subtask(&mut self, subtask: Subtask) -> Result<Subtask> {
        let id = subtask.id;
        let previous_epic = self
            .subtasks
            .get(&id)
            .map(|s| s.epic_id)
            .ok_or_else(|| eyre!(StoreError::NotFound { kind: Kind::Subtask, id }))?;
        subtask.validate().map_err(|e| eyre!(StoreError::Validation(e)))?;
        if !self.epics.contains_key(&subtask.epic_id) {
            return Err(eyre!(StoreError::InvalidReference {
                epic_id: subtask.epic_id,
            }));
        }
        let slot = subtask.slot();
        self.check_slot(slot, Some(id))?;

        self.place(id, slot);
        let epic_id = subtask.epic_id;
        self.subtasks.insert(id, subtask.clone());

        if previous_epic != epic_id {
            if let Some(old) = self.epics.get_mut(&previous_epic) {
                old.subtask_ids.retain(|&child| child != id);
            }
            if let Some(new) = self.epics.get_mut(&epic_id) {
                new.subtask_ids.push(id);
            }
            self.refresh_epic(previous_epic);
            log::info!("Moved subtask {} from epic {} to {}", id, previous_epic, epic_id);
        }
        self.refresh_epic(epic_id);

        log::info!("Updated subtask {}", id);
        self.persist()?;
        Ok(subtask)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a task. Unknown ids are ignored.
    pub fn delete_task(&mut self, id: u64) -> Result<()> {
        if self.tasks.remove(&id).is_none() {
            return Ok(());
        }
        self.forget(id);

        log::info!("Deleted task {}", id);
        self.persist()
    }

    /// Delete an epic together with all of its subtasks.
    pub fn delete_epic(&mut self, id: u64) -> Result<()> {
        let Some(epic) = self.epics.remove(&id) else {
            return Ok(());
        };
        self.history.remove(id);
        for child in &epic.subtask_ids {
            self.subtasks.remove(child);
            self.forget(*child);
        }

        log::info!("Deleted epic {} and {} subtasks", id, epic.subtask_ids.len());
        self.persist()
    }

    /// Delete a subtask and recompute its epic.
    pub fn delete_subtask(&mut self, id: u64) -> Result<()> {
        let Some(subtask) = self.subtasks.remove(&id) else {
            return Ok(());
        };
        self.forget(id);
        if let Some(epic) = self.epics.get_mut(&subtask.epic_id) {
            epic.subtask_ids.retain(|&child| child != id);
        }
        self.refresh_epic(subtask.epic_id);

        log::info!("Deleted subtask {}", id);
        self.persist()
    }

    pub fn clear_tasks(&mut self) -> Result<()> {
        let ids: Vec<u64> = self.tasks.keys().copied().collect();
        for id in &ids {
            self.forget(*id);
        }
        self.tasks.clear();

        log::info!("Cleared {} tasks", ids.len());
        self.persist()
    }

    /// Remove every epic, and with them every subtask.
    pub fn clear_epics(&mut self) -> Result<()> {
        let epic_ids: Vec<u64> = self.epics.keys().copied().collect();
        let subtask_ids: Vec<u64> = self.subtasks.keys().copied().collect();
        for id in &epic_ids {
            self.history.remove(*id);
        }
        for id in &subtask_ids {
            self.forget(*id);
        }
        self.epics.clear();
        self.subtasks.clear();

        log::info!("Cleared {} epics and {} subtasks", epic_ids.len(), subtask_ids.len());
        self.persist()
    }

    /// Remove every subtask; all epics fall back to their empty state.
    pub fn clear_subtasks(&mut self) -> Result<()> {
        let ids: Vec<u64> = self.subtasks.keys().copied().collect();
        for id in &ids {
            self.forget(*id);
        }
        self.subtasks.clear();

        let epic_ids: Vec<u64> = self.epics.keys().copied().collect();
        for epic_id in epic_ids {
            if let Some(epic) = self.epics.get_mut(&epic_id) {
                epic.subtask_ids.clear();
            }
            self.refresh_epic(epic_id);
        }

        log::info!("Cleared {} subtasks", ids.len());
        self.persist()
    }

    // ------------------------------------------------------------------
    // Listing
    // ------------------------------------------------------------------

    /// All tasks in creation order.
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.values().cloned().collect()
    }

    pub fn epics(&self) -> Vec<Epic> {
        self.epics.values().cloned().collect()
    }

    pub fn subtasks(&self) -> Vec<Subtask> {
        self.subtasks.values().cloned().collect()
    }

    /// Subtasks of one epic in attachment order, or `None` if the epic is unknown.
    pub fn epic_subtasks(&self, epic_id: u64) -> Option<Vec<Subtask>> {
        let epic = self.epics.get(&epic_id)?;
        Some(
            epic.subtask_ids
                .iter()
                .filter_map(|id| self.subtasks.get(id).cloned())
                .collect(),
        )
    }

    /// Scheduled tasks and subtasks by start time, ties by id.
    /// Unscheduled entities are left out.
    pub fn prioritized(&self) -> Vec<Entity> {
        self.schedule.ordered_ids().filter_map(|id| self.find(id)).collect()
    }

    /// Viewed entities, oldest first.
    pub fn history(&self) -> Vec<Entity> {
        self.history.list().into_iter().filter_map(|id| self.find(id)).collect()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn persistence(e: eyre::Report) -> eyre::Report {
    eyre!(StoreError::Persistence(format!("{:#}", e)))
}
