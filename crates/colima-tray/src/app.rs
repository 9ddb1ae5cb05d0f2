use crate::{AppCommand, AppResult, TrayCommand};

use colima_tray_core::Supervisor;

use std::time::Duration;

use tao::event_loop::EventLoopProxy;
use tokio::{
    sync::mpsc,
    time::{Instant, Interval, MissedTickBehavior},
};
use tracing::{error, info, instrument, warn};

/// Main application state.
///
/// Runs on the async runtime thread and owns every controller through the
/// [`Supervisor`]. Menu state changes reach the main thread via the
/// supervisor's sink; this loop only reacts to commands and rescans.
pub struct App {
    pub(crate) supervisor: Supervisor,
    pub(crate) tray_proxy: EventLoopProxy<TrayCommand>,
    pub(crate) command_rx: mpsc::Receiver<AppCommand>,
    pub(crate) rescan_interval: Option<Duration>,
}

impl App {
    /// Run the main application event loop.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("Colima Tray starting");

        self.supervisor.spawn_vm();
        if let Err(e) = self.supervisor.enumerate().await {
            warn!(error = ?e, "Initial container enumeration failed, starting with an empty tree");
        }

        let mut rescan = self.rescan_interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(AppCommand::Shutdown) => {
                            info!("Shutdown requested");
                            break;
                        }
                        Some(cmd) => {
                            if let Err(e) = self.handle_command(cmd).await {
                                warn!(error = ?e, "Command not carried out");
                            }
                        }
                        None => {
                            info!("Command channel closed, shutting down");
                            break;
                        }
                    }
                }

                _ = next_tick(&mut rescan) => self.rescan().await,
            }
        }

        self.supervisor.shutdown().await;

        if self.tray_proxy.send_event(TrayCommand::Shutdown).is_err() {
            error!("Event loop already gone at shutdown");
        }
        info!("Colima Tray shut down successfully");

        Ok(())
    }

    #[instrument(skip(self))]
    async fn handle_command(&mut self, cmd: AppCommand) -> AppResult<()> {
        match cmd {
            AppCommand::DispatchVm(action) => {
                let request_id = self.supervisor.dispatch_vm(action)?;
                info!(action = %action, request_id = %request_id, "VM action queued");
            }
            AppCommand::Dispatch { id, action } => {
                let request_id = self.supervisor.dispatch(id, action)?;
                info!(
                    id = %id,
                    action = %action,
                    request_id = %request_id,
                    "Container action queued"
                );
            }
            AppCommand::DispatchProject { name, action } => {
                let accepted = self.supervisor.dispatch_project(&name, action).await?;
                info!(project = %name, action = %action, accepted, "Project action queued");
            }
            AppCommand::Rescan => self.rescan().await,
            AppCommand::Shutdown => {}
        }
        Ok(())
    }

    async fn rescan(&mut self) {
        match self.supervisor.enumerate().await {
            Ok(summary) if summary.added > 0 || summary.retired > 0 => {
                info!(added = summary.added, retired = summary.retired, "Containers rescanned");
            }
            Ok(_) => {}
            Err(e) => warn!(error = ?e, "Container rescan failed, keeping current tree"),
        }
    }
}

/// Next rescan tick, or never when rescanning is disabled.
async fn next_tick(rescan: &mut Option<Interval>) {
    match rescan {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
