// Task model and id generation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Identifier of a task within one list
///
/// Serialized as a bare JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(TaskId)
    }
}

/// One to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    /// Absent until the text or completion flag first changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Build a task from already-validated text
    pub(crate) fn new(id: TaskId, text: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            text,
            completed: false,
            created_at: now,
            updated_at: None,
        }
    }

    pub(crate) fn toggle(&mut self, now: DateTime<Utc>) {
        self.completed = !self.completed;
        self.updated_at = Some(now);
    }

    pub(crate) fn set_text(&mut self, text: String, now: DateTime<Utc>) {
        self.text = text;
        self.updated_at = Some(now);
    }
}

/// Trim user input, rejecting text that is empty once trimmed
pub fn normalize_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Largest id that survives a round trip through a JSON number (2^53 - 1)
pub const MAX_TASK_ID: u64 = (1 << 53) - 1;

/// Smallest id not taken by `existing`
pub fn lowest_unused_id<I>(existing: I) -> Option<TaskId>
where
    I: IntoIterator<Item = TaskId>,
{
    let taken: HashSet<u64> = existing.into_iter().map(|id| id.0).collect();
    (1..=MAX_TASK_ID).find(|id| !taken.contains(id)).map(TaskId)
}

/// Hands out strictly increasing task ids
///
/// Ids track the creation time in milliseconds, but never repeat or go
/// backwards: if the clock has not moved past the last id, the next id is
/// `last + 1`. Returns `None` once ids would pass `MAX_TASK_ID`.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: u64,
}

impl IdGenerator {
    /// Start after the largest id already in use
    pub fn seeded<'a, I>(existing: I) -> Self
    where
        I: IntoIterator<Item = &'a TaskId>,
    {
        let last = existing.into_iter().map(|id| id.0).max().unwrap_or(0);
        Self { last }
    }

    pub fn next_id(&mut self, now: DateTime<Utc>) -> Option<TaskId> {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let id = millis.max(self.last.checked_add(1)?);
        if id > MAX_TASK_ID {
            return None;
        }
        self.last = id;
        Some(TaskId(id))
    }
}
