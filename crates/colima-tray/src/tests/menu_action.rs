use crate::{AppCommand, MenuAction};

use colima_tray_core::{Action, EntityId};

/// WHAT: Menu actions translate into application commands
/// WHY: The UI thread only forwards; the async loop does the work
#[test]
fn given_menu_actions_when_converting_then_matching_commands() {
    assert_eq!(
        MenuAction::Vm(Action::Restart).to_command(),
        Some(AppCommand::DispatchVm(Action::Restart))
    );
    assert_eq!(
        MenuAction::Entity {
            id: EntityId(3),
            action: Action::Logs
        }
        .to_command(),
        Some(AppCommand::Dispatch {
            id: EntityId(3),
            action: Action::Logs
        })
    );
    assert_eq!(
        MenuAction::Project {
            name: "shop".to_string(),
            action: Action::Stop
        }
        .to_command(),
        Some(AppCommand::DispatchProject {
            name: "shop".to_string(),
            action: Action::Stop
        })
    );
    assert_eq!(MenuAction::Refresh.to_command(), Some(AppCommand::Rescan));
    assert_eq!(MenuAction::Quit.to_command(), Some(AppCommand::Shutdown));
}

/// WHAT: Settings is handled on the UI thread
/// WHY: Opening a file needs no controller involvement
#[test]
fn given_settings_when_converting_then_no_command() {
    assert_eq!(MenuAction::Settings.to_command(), None);
}
