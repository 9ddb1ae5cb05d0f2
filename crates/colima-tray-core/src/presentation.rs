//! Published snapshots and the boundary to the menu toolkit.
//!
//! Controllers never touch UI handles. They publish [`PresentationUpdate`]s
//! through a [`PresentationSink`] and the UI thread applies them.

use crate::{Action, EntityId, EntityKind, Phase, Status};

/// Receiver of presentation updates.
///
/// `publish` is called from controller tasks and must not block.
pub trait PresentationSink: Send + Sync {
    /// Deliver one update to the UI side.
    fn publish(&self, update: PresentationUpdate);
}

/// Message from the core to the presentation adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationUpdate {
    /// Fresh snapshot of one entity.
    Entity(EntityView),
    /// Fresh aggregate for one project.
    Project(ProjectView),
    /// The project tree changed shape; rebuild it.
    Layout(Vec<ProjectLayout>),
    /// An entity was deleted or retired.
    Removed {
        /// Removed entity.
        id: EntityId,
        /// Project it belonged to, if any.
        project: Option<String>,
    },
    /// A mutating command failed.
    ActionFailed(FailureNotice),
}

/// Snapshot of an entity as last published by its controller.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityView {
    /// Arena id.
    pub id: EntityId,
    /// VM or container.
    pub kind: EntityKind,
    /// Stable name.
    pub name: String,
    /// Owning project; `None` for the VM.
    pub project: Option<String>,
    /// Parsed status from the latest successful observation.
    pub status: Status,
    /// Controller phase.
    pub phase: Phase,
    /// Action currently in flight.
    pub pending: Option<Action>,
    /// Raw output of the latest successful observation.
    pub last_observed_raw: String,
    /// Description of the most recent failed action, cleared on success.
    pub last_failure: Option<String>,
}

impl EntityView {
    /// Snapshot of an entity nothing has been observed for yet.
    pub fn initial(id: EntityId, kind: EntityKind, name: &str, project: Option<&str>) -> Self {
        Self {
            id,
            kind,
            name: name.to_string(),
            project: project.map(str::to_string),
            status: Status::Unknown,
            phase: Phase::Initializing,
            pending: None,
            last_observed_raw: String::new(),
            last_failure: None,
        }
    }

    /// Text to show for the entity's state: the progress label while an
    /// action is in flight, otherwise the status.
    pub fn status_text(&self) -> String {
        match self.pending {
            Some(action) => action.progress_label().to_string(),
            None => self.status.to_string(),
        }
    }

    /// Derive the control state for this snapshot.
    pub fn controls(&self) -> EntityControls {
        let (start_visible, stop_visible) = match self.status {
            Status::Running => (false, true),
            Status::Stopped => (true, false),
            _ => (true, true),
        };

        let enabled = self.pending.is_none() && self.phase != Phase::Terminated;

        EntityControls {
            status_text: self.status_text(),
            start_visible,
            stop_visible,
            enabled,
            shell_enabled: enabled && self.status.is_running(),
        }
    }
}

/// Derived show/hide/enable state for an entity's controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityControls {
    /// Status or progress text.
    pub status_text: String,
    /// Whether "Start" is shown.
    pub start_visible: bool,
    /// Whether "Stop" is shown.
    pub stop_visible: bool,
    /// Whether the entity's actions accept clicks.
    pub enabled: bool,
    /// Whether a shell can be opened: enabled and running.
    pub shell_enabled: bool,
}

/// Aggregate state of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectView {
    /// Project name.
    pub name: String,
    /// Some member is running.
    pub any_running: bool,
    /// Some member is stopped.
    pub any_stopped: bool,
    /// Number of running members.
    pub running: usize,
    /// Number of members.
    pub total: usize,
}

impl ProjectView {
    /// "Start All" is shown iff something is stopped.
    pub fn start_all_visible(&self) -> bool {
        self.any_stopped
    }

    /// "Stop All" is shown iff something is running.
    pub fn stop_all_visible(&self) -> bool {
        self.any_running
    }

    /// "Restart All" is always shown.
    pub fn restart_all_visible(&self) -> bool {
        true
    }
}

/// Shape of one project in the menu tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    /// Project name.
    pub name: String,
    /// Members in display order.
    pub members: Vec<MemberLayout>,
}

/// One container entry in a [`ProjectLayout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberLayout {
    /// Arena id of the container's controller.
    pub id: EntityId,
    /// Container name.
    pub name: String,
}

/// A failed action, published for optional user-visible surfacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureNotice {
    /// Entity the action targeted.
    pub id: EntityId,
    /// Entity name.
    pub name: String,
    /// The action that failed.
    pub action: Action,
    /// Trimmed command output.
    pub output: String,
}
