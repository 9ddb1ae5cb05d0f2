use colima_tray_core::{EntityView, Status};

use image::{Rgba, RgbaImage};

/// Edge length of the generated tray icon, in pixels.
pub const ICON_SIZE: u32 = 32;

/// Tray icon states derived from the VM status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayIconState {
    /// VM is running.
    Running,
    /// VM is stopped.
    Stopped,
    /// A start/stop/restart is in flight.
    Busy,
    /// Status not known yet, or not one we recognise.
    Unknown,
}

impl TrayIconState {
    /// Derive the icon state from the VM's latest snapshot.
    pub fn from_view(view: &EntityView) -> Self {
        if view.pending.is_some() {
            return Self::Busy;
        }
        match view.status {
            Status::Running => Self::Running,
            Status::Stopped => Self::Stopped,
            Status::Unknown | Status::Other(_) => Self::Unknown,
        }
    }

    /// Fill colour of the status dot.
    pub fn color(self) -> Rgba<u8> {
        match self {
            Self::Running => Rgba([46, 160, 67, 255]),
            Self::Stopped => Rgba([207, 34, 46, 255]),
            Self::Busy => Rgba([219, 154, 4, 255]),
            Self::Unknown => Rgba([110, 118, 129, 255]),
        }
    }

    /// Tooltip for the VM with the given status text.
    pub fn tooltip(self, status_text: &str) -> String {
        format!("Colima: {status_text}")
    }

    /// Render a filled circle in this state's colour on a transparent square.
    pub fn render(self) -> RgbaImage {
        let color = self.color();
        let center = (ICON_SIZE as f32 - 1.0) / 2.0;
        let radius = ICON_SIZE as f32 / 2.0 - 2.0;

        RgbaImage::from_fn(ICON_SIZE, ICON_SIZE, |x, y| {
            let dx = x as f32 - center;
            let dy = y as f32 - center;
            let distance = (dx * dx + dy * dy).sqrt();
            // Soft one-pixel edge.
            let coverage = (radius + 0.5 - distance).clamp(0.0, 1.0);
            Rgba([color[0], color[1], color[2], (coverage * 255.0) as u8])
        })
    }
}
