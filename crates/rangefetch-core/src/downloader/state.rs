//! Task lifecycle states.

use std::fmt;

/// Where a task is in its lifecycle.
///
/// `Configuring → Probing → Planning → Fetching → Merging → Done`, with
/// `Failed` reachable from every state after `Configuring`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    Configuring = 0,
    Probing = 1,
    Planning = 2,
    Fetching = 3,
    Merging = 4,
    Done = 5,
    Failed = 6,
}

impl TaskState {
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => TaskState::Probing,
            2 => TaskState::Planning,
            3 => TaskState::Fetching,
            4 => TaskState::Merging,
            5 => TaskState::Done,
            6 => TaskState::Failed,
            _ => TaskState::Configuring,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Configuring => "configuring",
            TaskState::Probing => "probing",
            TaskState::Planning => "planning",
            TaskState::Fetching => "fetching",
            TaskState::Merging => "merging",
            TaskState::Done => "done",
            TaskState::Failed => "failed",
        };
        f.write_str(s)
    }
}
