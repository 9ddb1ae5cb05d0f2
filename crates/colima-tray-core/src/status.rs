//! Status taxonomy and the parsers that map raw command output onto it.
//!
//! Both parsers are total: text that matches nothing degrades to a verbatim
//! passthrough instead of an error.

use std::fmt;

/// Normalized status of the VM or a container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    /// The entity is up.
    Running,
    /// The entity exists but is not running.
    Stopped,
    /// Nothing has been observed yet, or the output was empty.
    #[default]
    Unknown,
    /// Unrecognized output, trimmed but otherwise verbatim.
    Other(String),
}

impl Status {
    /// Whether this status counts as running for bulk-action visibility.
    pub fn is_running(&self) -> bool {
        matches!(self, Status::Running)
    }

    /// Whether this status counts as stopped for bulk-action visibility.
    pub fn is_stopped(&self) -> bool {
        matches!(self, Status::Stopped)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Running => f.write_str("Running"),
            Status::Stopped => f.write_str("Stopped"),
            Status::Unknown => f.write_str("Unknown"),
            Status::Other(raw) => f.write_str(raw),
        }
    }
}

/// Parse the output of `<runtime> status`.
///
/// "running" is checked before "stopped"; both are substring matches on the
/// lowercased, trimmed text.
pub fn parse_runtime_status(raw: &str) -> Status {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Status::Unknown;
    }

    let lowered = trimmed.to_lowercase();
    if lowered.contains("running") {
        Status::Running
    } else if lowered.contains("stopped") {
        Status::Stopped
    } else {
        Status::Other(trimmed.to_string())
    }
}

/// Parse a container engine status string.
///
/// Accepts both the `ps` phrasing ("Up 2 minutes", "Exited (0) 3 hours ago")
/// and the `inspect` state names ("running", "exited", "created").
pub fn parse_entity_status(raw: &str) -> Status {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Status::Unknown;
    }

    let lowered = trimmed.to_lowercase();
    if lowered.starts_with("up") || lowered.contains("running") {
        Status::Running
    } else if lowered.starts_with("exited")
        || lowered.contains("created")
        || lowered.contains("stopped")
    {
        Status::Stopped
    } else {
        Status::Other(trimmed.to_string())
    }
}
