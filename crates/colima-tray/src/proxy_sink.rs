use crate::TrayCommand;

use colima_tray_core::{PresentationSink, PresentationUpdate};

use tao::event_loop::EventLoopProxy;
use tracing::debug;

/// Forwards controller updates to the UI thread's event loop.
pub struct ProxySink {
    proxy: EventLoopProxy<TrayCommand>,
}

impl ProxySink {
    pub fn new(proxy: EventLoopProxy<TrayCommand>) -> Self {
        Self { proxy }
    }
}

impl PresentationSink for ProxySink {
    fn publish(&self, update: PresentationUpdate) {
        // Fails only once the event loop has exited.
        if self.proxy.send_event(TrayCommand::Present(update)).is_err() {
            debug!("Event loop closed, dropping presentation update");
        }
    }
}
