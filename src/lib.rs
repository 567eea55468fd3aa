// TaskList - task list state machine persisted to a key-value store

pub mod clock;
pub mod config;
pub mod state;
pub mod storage;
pub mod store;
pub mod task;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use state::{EditState, Snapshot, Stats};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{STORAGE_KEY, TaskListStore};
pub use task::{Task, TaskId};
