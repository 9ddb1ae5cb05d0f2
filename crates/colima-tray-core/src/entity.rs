use std::fmt;

/// Arena index of a supervised entity.
///
/// Assigned once by the supervisor and never reused for the lifetime of the
/// process, so a stale id can only miss, never alias another entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of thing an entity controller supervises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// The single runtime VM.
    Vm,
    /// A container inside the VM.
    Container,
}

/// Controller lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No status query has succeeded yet.
    Initializing,
    /// Idle between polls.
    Observing,
    /// A mutating command is in flight.
    Mutating,
    /// Deleted or retired; the controller loop has ended.
    Terminated,
}

/// User-triggerable action on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Start the entity.
    Start,
    /// Stop the entity.
    Stop,
    /// Restart the entity.
    Restart,
    /// Remove the container.
    Delete,
    /// Follow logs in a terminal.
    Logs,
    /// Open an interactive shell in a terminal.
    Exec,
}

impl Action {
    /// Actions that go through the Mutating phase and change status.
    pub fn mutates_status(self) -> bool {
        matches!(
            self,
            Action::Start | Action::Stop | Action::Restart | Action::Delete
        )
    }

    /// Actions a project may fan out to all of its members.
    pub fn is_bulk(self) -> bool {
        matches!(self, Action::Start | Action::Stop | Action::Restart)
    }

    /// Label shown in place of the status while the action is in flight.
    pub fn progress_label(self) -> &'static str {
        match self {
            Action::Start => "Starting...",
            Action::Stop => "Stopping...",
            Action::Restart => "Restarting...",
            Action::Delete => "Deleting...",
            Action::Logs => "Opening logs...",
            Action::Exec => "Opening shell...",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Start => "Start",
            Action::Stop => "Stop",
            Action::Restart => "Restart",
            Action::Delete => "Delete",
            Action::Logs => "Logs",
            Action::Exec => "Exec",
        };
        f.write_str(name)
    }
}
