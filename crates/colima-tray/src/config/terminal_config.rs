use colima_tray_core::TerminalLauncher;

use serde::{Deserialize, Serialize};

/// Terminal used for logs and shells.
///
/// `args` may contain `{command}` (shell-quoted command) or
/// `{command_quoted}` (the same, escaped for a double-quoted string).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Launcher program.
    pub program: String,
    /// Launcher arguments.
    pub args: Vec<String>,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        let launcher = TerminalLauncher::platform_default();
        Self {
            program: launcher.program,
            args: launcher.args,
        }
    }
}

impl From<&TerminalConfig> for TerminalLauncher {
    fn from(config: &TerminalConfig) -> Self {
        TerminalLauncher {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }
}
