use colima_tray_core::{Action, EntityId};

/// Commands sent from the UI thread to the application loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Run an action on the VM.
    DispatchVm(Action),
    /// Run an action on one container.
    Dispatch {
        /// Target entity.
        id: EntityId,
        /// Requested action.
        action: Action,
    },
    /// Run a bulk action on every container of a project.
    DispatchProject {
        /// Project name.
        name: String,
        /// Requested action.
        action: Action,
    },
    /// Re-enumerate containers now.
    Rescan,
    /// Request application shutdown.
    Shutdown,
}
