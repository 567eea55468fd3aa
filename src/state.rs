// Edit sub-state, derived stats, and read-only snapshots

use crate::task::{Task, TaskId};
use serde::Serialize;

/// Editing state of the list; at most one task is edited at a time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditState {
    #[default]
    Idle,
    Editing {
        id: TaskId,
        /// Staged text, not applied to the task until committed
        draft: String,
    },
}

impl EditState {
    pub fn editing_id(&self) -> Option<TaskId> {
        match self {
            EditState::Idle => None,
            EditState::Editing { id, .. } => Some(*id),
        }
    }

    pub fn draft(&self) -> Option<&str> {
        match self {
            EditState::Idle => None,
            EditState::Editing { draft, .. } => Some(draft),
        }
    }
}

/// Counts derived from the task list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

impl Stats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.completed).count();
        Self {
            total,
            completed,
            pending: total - completed,
        }
    }
}

/// Read-only view handed to the presentation layer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<'a> {
    pub tasks: &'a [Task],
    pub editing_id: Option<TaskId>,
    pub edit_draft: Option<&'a str>,
    pub stats: Stats,
}
