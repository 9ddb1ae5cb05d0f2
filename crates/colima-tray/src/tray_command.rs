use colima_tray_core::PresentationUpdate;

use tray_icon::menu::MenuEvent;

/// Events delivered to the main UI thread.
///
/// The main thread owns `TrayManager` (because `TrayIcon` is `!Send`),
/// so all tray mutations and process lifecycle events flow through this enum.
#[derive(Debug, Clone)]
pub enum TrayCommand {
    /// Apply a controller update to the menu.
    Present(PresentationUpdate),
    /// A menu item was clicked.
    Menu(MenuEvent),
    /// Shut down the application. The main thread will exit the event loop.
    Shutdown,
}
