//! Colima Tray: status-bar control for a Colima VM and its containers.

mod app;
mod app_command;
mod config;
mod error;
mod menu_action;
mod menu_slots;
mod proxy_sink;
#[cfg(test)]
mod tests;
mod tray_command;
mod tray_icon_state;
mod tray_manager;

pub(crate) use {
    app::App,
    app_command::AppCommand,
    error::{AppError, Result as AppResult},
    menu_action::MenuAction,
    proxy_sink::ProxySink,
    tray_command::TrayCommand,
    tray_icon_state::TrayIconState,
    tray_manager::TrayManager,
};

use crate::config::Config;

use colima_tray_core::{FailureNotice, PresentationUpdate, Supervisor, SystemInvoker};

use std::sync::Arc;

use notify_rust::Notification;
use tao::{
    event::Event,
    event_loop::{ControlFlow, EventLoopBuilder},
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tray_icon::menu::MenuEvent;

/// Log filter used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "colima_tray=debug,colima_tray_core=info";

/// Application entry point.
fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    let event_loop = EventLoopBuilder::<TrayCommand>::with_user_event().build();
    let tray_proxy = event_loop.create_proxy();

    MenuEvent::set_event_handler(Some({
        let proxy = event_loop.create_proxy();
        move |event| {
            let _ = proxy.send_event(TrayCommand::Menu(event));
        }
    }));

    // TrayManager lives on the main thread - TrayIcon is !Send on all platforms.
    // Created on Init so the platform event loop exists first.
    let mut tray_manager: Option<TrayManager> = None;
    let mut command_tx: Option<mpsc::Sender<AppCommand>> = None;
    let notify_on_failure = config.behaviour.notify_on_failure;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::NewEvents(tao::event::StartCause::Init) => {
                tray_manager = match TrayManager::new() {
                    Ok(tm) => Some(tm),
                    Err(e) => {
                        error!("Failed to create TrayManager: {:?}", e);
                        std::process::exit(1);
                    }
                };

                #[cfg(target_os = "macos")]
                unsafe {
                    use core_foundation::runloop::{CFRunLoopGetMain, CFRunLoopWakeUp};
                    CFRunLoopWakeUp(CFRunLoopGetMain());
                }

                let (tx, command_rx) = mpsc::channel(32);
                command_tx = Some(tx);

                let supervisor = Supervisor::new(
                    Arc::new(SystemInvoker),
                    Arc::new(config.toolchain()),
                    Arc::new(ProxySink::new(tray_proxy.clone())),
                    config.supervisor_settings(),
                );
                let app = App {
                    supervisor,
                    tray_proxy: tray_proxy.clone(),
                    command_rx,
                    rescan_interval: config.rescan_interval(),
                };

                // Spawn tokio runtime on separate thread.
                // TrayManager stays on the main thread.
                std::thread::spawn(move || {
                    let rt = match tokio::runtime::Runtime::new() {
                        Ok(rt) => rt,
                        Err(e) => {
                            error!("Failed to create tokio runtime: {:?}", e);
                            std::process::exit(1);
                        }
                    };

                    rt.block_on(async {
                        if let Err(e) = app.run().await {
                            error!(error = ?e, "App error");
                        }
                    });
                });
            }
            Event::UserEvent(TrayCommand::Present(update)) => {
                if let PresentationUpdate::ActionFailed(notice) = &update {
                    warn!(entity = %notice.name, action = %notice.action, "Action failed");
                    if notify_on_failure {
                        notify_failure(notice);
                    }
                }
                if let Some(tm) = tray_manager.as_mut() {
                    if let Err(e) = tm.apply(update) {
                        error!(error = ?e, "Failed to update tray menu");
                    }
                }
            }
            Event::UserEvent(TrayCommand::Menu(event)) => {
                let Some(action) = tray_manager
                    .as_ref()
                    .and_then(|tm| tm.action_for(&event.id))
                    .cloned()
                else {
                    return;
                };

                match action.to_command() {
                    Some(cmd) => {
                        let quitting = cmd == AppCommand::Shutdown;
                        let sent = command_tx
                            .as_ref()
                            .is_some_and(|tx| tx.try_send(cmd).is_ok());
                        if !sent {
                            warn!(action = ?action, "Application loop busy or gone, click dropped");
                            if quitting {
                                *control_flow = ControlFlow::ExitWithCode(0);
                            }
                        }
                    }
                    None => open_settings(),
                }
            }
            Event::UserEvent(TrayCommand::Shutdown) => {
                *control_flow = ControlFlow::ExitWithCode(0);
            }
            _ => {}
        }
    });
}

fn open_settings() {
    match Config::config_path() {
        Ok(path) => match open::that(&path) {
            Ok(()) => info!(config_path = ?path, "Opened settings file"),
            Err(e) => error!(error = ?e, "Failed to open settings file"),
        },
        Err(e) => error!(error = ?e, "Failed to locate settings file"),
    }
}

fn notify_failure(notice: &FailureNotice) {
    let result = Notification::new()
        .summary(&format!("{} {} failed", notice.name, notice.action))
        .body(notice.output.trim())
        .show();
    if let Err(e) = result {
        warn!(error = ?e, "Failed to show failure notification");
    }
}
