//! Agenda tasks: one-off and recurring tasks, occurrence completion, and the
//! windowed listings built from them.

pub mod completion;
pub mod recurrence;
pub mod store;
pub mod types;
pub mod window;

pub use completion::{complete_occurrence, CompletionOutcome};
pub use store::{create_task, delete_task, get_task};
pub use types::{DateWindow, NewTask, Task, TaskKind, TaskOccurrence};
pub use window::{assemble, TaskWindow};
