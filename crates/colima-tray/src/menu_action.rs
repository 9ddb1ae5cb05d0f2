use crate::AppCommand;

use colima_tray_core::{Action, EntityId};

/// What a menu item does when clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    /// VM action.
    Vm(Action),
    /// Single-container action.
    Entity {
        /// Target entity.
        id: EntityId,
        /// Requested action.
        action: Action,
    },
    /// Bulk action on a project.
    Project {
        /// Project name.
        name: String,
        /// Requested action.
        action: Action,
    },
    /// Re-enumerate containers.
    Refresh,
    /// Open the settings file.
    Settings,
    /// Exit the application.
    Quit,
}

impl MenuAction {
    /// Command for the application loop, or `None` for UI-thread actions.
    pub fn to_command(&self) -> Option<AppCommand> {
        match self {
            Self::Vm(action) => Some(AppCommand::DispatchVm(*action)),
            Self::Entity { id, action } => Some(AppCommand::Dispatch {
                id: *id,
                action: *action,
            }),
            Self::Project { name, action } => Some(AppCommand::DispatchProject {
                name: name.clone(),
                action: *action,
            }),
            Self::Refresh => Some(AppCommand::Rescan),
            Self::Quit => Some(AppCommand::Shutdown),
            Self::Settings => None,
        }
    }
}
