// Task list store: in-memory state machine persisted to a key-value backend

use chrono::{DateTime, Utc};
use crate::clock::{Clock, SystemClock};
use crate::state::{EditState, Snapshot, Stats};
use crate::storage::Storage;
use crate::task::{IdGenerator, MAX_TASK_ID, Task, TaskId, lowest_unused_id, normalize_text};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Storage key holding the serialized task list
pub const STORAGE_KEY: &str = "tasklist.tasks";

/// Single source of truth for the task list and its editing state
///
/// Every mutation of the task list is written through to storage before the
/// method returns. Storage failures are logged and otherwise ignored: the
/// in-memory state stays authoritative for the session.
pub struct TaskListStore<S: Storage, C: Clock = SystemClock> {
    storage: S,
    clock: C,
    key: String,
    tasks: Vec<Task>,
    edit: EditState,
    ids: IdGenerator,
}

impl<S: Storage> TaskListStore<S, SystemClock> {
    /// Open a store over `storage` using the default key and the system clock
    pub fn open(storage: S) -> Self {
        Self::open_at(storage, SystemClock, STORAGE_KEY)
    }
}

impl<S: Storage, C: Clock> TaskListStore<S, C> {
    /// Open a store with an explicit clock and the default key
    pub fn with_clock(storage: S, clock: C) -> Self {
        Self::open_at(storage, clock, STORAGE_KEY)
    }

    /// Open a store, hydrating tasks from `key`
    ///
    /// A missing key yields an empty list. Unreadable content, or a value that
    /// is not a JSON array, is logged and also yields an empty list. Array
    /// entries that fail to parse are logged and skipped.
    pub fn open_at(storage: S, clock: C, key: impl Into<String>) -> Self {
        let key = key.into();
        let tasks = Self::load(&storage, &key);
        let ids = IdGenerator::seeded(tasks.iter().map(|t| &t.id));

        info!(key = %key, count = tasks.len(), "Opened task list");

        Self {
            storage,
            clock,
            key,
            tasks,
            edit: EditState::Idle,
            ids,
        }
    }

    fn load(storage: &S, key: &str) -> Vec<Task> {
        let raw = match storage.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "No stored tasks, starting empty");
                return Vec::new();
            }
            Err(e) => {
                warn!(key, error = ?e, "Failed to read stored tasks, starting empty");
                return Vec::new();
            }
        };

        let entries: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(key, error = ?e, "Failed to parse stored tasks, starting empty");
                return Vec::new();
            }
        };

        // Drop entries that fail to parse or would break list invariants
        let mut seen = HashSet::new();
        let mut tasks = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let task: Task = match serde_json::from_value(entry) {
                Ok(task) => task,
                Err(e) => {
                    warn!(key, index, error = ?e, "Skipping stored task that failed to parse");
                    continue;
                }
            };
            if task.id.0 > MAX_TASK_ID {
                warn!(key, id = %task.id, "Skipping stored task with out-of-range id");
                continue;
            }
            if task.text.trim().is_empty() {
                warn!(key, id = %task.id, "Skipping stored task with empty text");
                continue;
            }
            if !seen.insert(task.id) {
                warn!(key, id = %task.id, "Skipping stored task with duplicate id");
                continue;
            }
            tasks.push(task);
        }

        tasks
    }

    /// Write the full task list to storage
    fn persist(&mut self) {
        let json = match serde_json::to_string(&self.tasks) {
            Ok(json) => json,
            Err(e) => {
                error!(key = %self.key, error = ?e, "Failed to serialize tasks");
                return;
            }
        };

        match self.storage.set(&self.key, &json) {
            Ok(()) => debug!(key = %self.key, count = self.tasks.len(), "Persisted tasks"),
            Err(e) => error!(
                key = %self.key,
                error = ?e,
                "Failed to persist tasks, continuing in memory"
            ),
        }
    }

    /// Next id from the generator, or the lowest free id once it runs out
    fn fresh_id(&mut self, now: DateTime<Utc>) -> Option<TaskId> {
        if let Some(id) = self.ids.next_id(now) {
            return Some(id);
        }
        let id = lowest_unused_id(self.tasks.iter().map(|t| t.id));
        if let Some(id) = id {
            warn!(id = %id, "Task ids exhausted, reusing lowest free id");
        }
        id
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Append a new task
    ///
    /// Returns the new task's id, or `None` if `raw_text` is blank or no id
    /// is left to assign.
    pub fn add(&mut self, raw_text: &str) -> Option<TaskId> {
        let text = normalize_text(raw_text)?;

        let now = self.clock.now();
        let Some(id) = self.fresh_id(now) else {
            warn!("add: no task id available, task not added");
            return None;
        };
        self.tasks.push(Task::new(id, text, now));
        debug!(id = %id, "Added task");

        self.persist();
        Some(id)
    }

    /// Flip a task's completion flag
    ///
    /// Returns false if no task has this id.
    pub fn toggle_complete(&mut self, id: TaskId) -> bool {
        let Some(idx) = self.position(id) else {
            debug!(id = %id, "toggle_complete: no such task");
            return false;
        };

        let now = self.clock.now();
        self.tasks[idx].toggle(now);
        debug!(id = %id, completed = self.tasks[idx].completed, "Toggled task");

        self.persist();
        true
    }

    /// Start editing a task, discarding any other in-progress edit
    ///
    /// Returns false (leaving the edit state untouched) if no task has this id.
    pub fn begin_edit(&mut self, id: TaskId) -> bool {
        let Some(idx) = self.position(id) else {
            debug!(id = %id, "begin_edit: no such task");
            return false;
        };

        if let Some(previous) = self.edit.editing_id().filter(|prev| *prev != id) {
            debug!(previous = %previous, id = %id, "Discarding uncommitted edit");
        }

        self.edit = EditState::Editing {
            id,
            draft: self.tasks[idx].text.clone(),
        };
        true
    }

    /// Replace the draft text of the current edit
    ///
    /// Returns false when no edit is in progress.
    pub fn update_draft(&mut self, text: impl Into<String>) -> bool {
        match &mut self.edit {
            EditState::Editing { draft, .. } => {
                *draft = text.into();
                true
            }
            EditState::Idle => false,
        }
    }

    /// Apply the draft to the edited task and leave edit mode
    ///
    /// A blank draft is rejected: nothing changes and edit mode stays open.
    pub fn commit_edit(&mut self) -> bool {
        let EditState::Editing { id, draft } = &self.edit else {
            return false;
        };
        let id = *id;

        let Some(text) = normalize_text(draft) else {
            debug!(id = %id, "commit_edit: draft is blank, keeping edit open");
            return false;
        };

        let Some(idx) = self.position(id) else {
            // Edited task is gone; delete() normally prevents this
            warn!(id = %id, "commit_edit: edited task no longer exists");
            self.edit = EditState::Idle;
            return false;
        };

        let now = self.clock.now();
        self.tasks[idx].set_text(text, now);
        self.edit = EditState::Idle;
        debug!(id = %id, "Committed edit");

        self.persist();
        true
    }

    /// Leave edit mode without touching any task
    pub fn cancel_edit(&mut self) {
        self.edit = EditState::Idle;
    }

    /// Remove a task, cancelling its edit if it was being edited
    ///
    /// Returns false if no task has this id.
    pub fn delete(&mut self, id: TaskId) -> bool {
        let Some(idx) = self.position(id) else {
            debug!(id = %id, "delete: no such task");
            return false;
        };

        self.tasks.remove(idx);
        if self.edit.editing_id() == Some(id) {
            self.edit = EditState::Idle;
        }
        debug!(id = %id, "Deleted task");

        self.persist();
        true
    }

    /// Clear all tasks and remove the storage key itself
    pub fn reset_all(&mut self) {
        self.tasks.clear();
        self.edit = EditState::Idle;

        match self.storage.remove(&self.key) {
            Ok(()) => info!(key = %self.key, "Reset task list"),
            Err(e) => error!(key = %self.key, error = ?e, "Failed to remove stored tasks"),
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn stats(&self) -> Stats {
        Stats::from_tasks(&self.tasks)
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            tasks: &self.tasks,
            editing_id: self.edit.editing_id(),
            edit_draft: self.edit.draft(),
            stats: self.stats(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn edit_state(&self) -> &EditState {
        &self.edit
    }

    pub fn editing_id(&self) -> Option<TaskId> {
        self.edit.editing_id()
    }

    pub fn edit_draft(&self) -> Option<&str> {
        self.edit.draft()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }
}
