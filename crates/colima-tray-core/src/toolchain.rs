//! Command lines for the VM runtime, the container engine, and the terminal
//! used for interactive sessions.

use crate::{Action, CommandLine, EntityKind};

/// Placeholder replaced by the shell-rendered inner command.
pub const COMMAND_PLACEHOLDER: &str = "{command}";

/// Placeholder replaced by the inner command escaped for embedding inside a
/// double-quoted string (AppleScript, for instance).
pub const QUOTED_COMMAND_PLACEHOLDER: &str = "{command_quoted}";

/// Go template asking `ps` for one `name|project|status` record per line.
pub const LIST_FORMAT: &str =
    "{{.Names}}|{{.Label \"com.docker.compose.project\"}}|{{.Status}}";

/// Go template asking `inspect` for the bare container state.
pub const INSPECT_FORMAT: &str = "{{.State.Status}}";

/// How to open an interactive command in a new terminal window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalLauncher {
    /// Launcher program.
    pub program: String,
    /// Launcher arguments containing one of the command placeholders.
    pub args: Vec<String>,
}

impl TerminalLauncher {
    /// Terminal.app via `osascript` on macOS, `x-terminal-emulator` elsewhere.
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self {
                program: "osascript".to_string(),
                args: vec![
                    "-e".to_string(),
                    [
                        "tell application \"Terminal\" to do script \"",
                        QUOTED_COMMAND_PLACEHOLDER,
                        "\"",
                    ]
                    .concat(),
                    "-e".to_string(),
                    "tell application \"Terminal\" to activate".to_string(),
                ],
            }
        } else {
            Self {
                program: "x-terminal-emulator".to_string(),
                args: vec![
                    "-e".to_string(),
                    "sh".to_string(),
                    "-c".to_string(),
                    COMMAND_PLACEHOLDER.to_string(),
                ],
            }
        }
    }

    /// Wrap `inner` so it runs inside a new terminal.
    pub fn wrap(&self, inner: &CommandLine) -> CommandLine {
        let shell = inner.to_shell();
        let quoted = shell.replace('\\', "\\\\").replace('"', "\\\"");
        let args = self
            .args
            .iter()
            .map(|arg| {
                arg.replace(QUOTED_COMMAND_PLACEHOLDER, &quoted)
                    .replace(COMMAND_PLACEHOLDER, &shell)
            })
            .collect::<Vec<_>>();
        CommandLine::new(self.program.clone(), args)
    }
}

impl Default for TerminalLauncher {
    fn default() -> Self {
        Self::platform_default()
    }
}

/// Binaries used to observe and mutate entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// VM runtime binary, `colima` by default.
    pub runtime: String,
    /// Container engine binary, `docker` by default.
    pub engine: String,
    /// Terminal used for logs and shells.
    pub terminal: TerminalLauncher,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            runtime: "colima".to_string(),
            engine: "docker".to_string(),
            terminal: TerminalLauncher::platform_default(),
        }
    }
}

impl Toolchain {
    /// `<runtime> status`.
    pub fn runtime_status(&self) -> CommandLine {
        CommandLine::new(self.runtime.clone(), ["status"])
    }

    /// `<engine> ps -a --format name|project|status`.
    pub fn list_containers(&self) -> CommandLine {
        CommandLine::new(self.engine.clone(), ["ps", "-a", "--format", LIST_FORMAT])
    }

    /// `<engine> inspect --format {{.State.Status}} <name>`.
    pub fn inspect(&self, name: &str) -> CommandLine {
        CommandLine::new(
            self.engine.clone(),
            ["inspect", "--format", INSPECT_FORMAT, name],
        )
    }

    /// Status query for an entity of the given kind.
    pub fn status_query(&self, kind: EntityKind, name: &str) -> CommandLine {
        match kind {
            EntityKind::Vm => self.runtime_status(),
            EntityKind::Container => self.inspect(name),
        }
    }

    /// Mutating command for `action`, or `None` when the kind does not
    /// support it (the VM cannot be deleted from the tray).
    pub fn mutation(&self, kind: EntityKind, name: &str, action: Action) -> Option<CommandLine> {
        let verb = match (kind, action) {
            (_, Action::Start) => "start",
            (_, Action::Stop) => "stop",
            (_, Action::Restart) => "restart",
            (EntityKind::Container, Action::Delete) => "rm",
            _ => return None,
        };

        Some(match kind {
            EntityKind::Vm => CommandLine::new(self.runtime.clone(), [verb]),
            EntityKind::Container => CommandLine::new(self.engine.clone(), [verb, name]),
        })
    }

    /// Interactive command for `action`, already wrapped in the terminal
    /// launcher, or `None` when the kind does not support it.
    pub fn interactive(&self, kind: EntityKind, name: &str, action: Action) -> Option<CommandLine> {
        let inner = match (kind, action) {
            (EntityKind::Container, Action::Logs) => {
                CommandLine::new(self.engine.clone(), ["logs", "-f", name])
            }
            (EntityKind::Container, Action::Exec) => {
                CommandLine::new(self.engine.clone(), ["exec", "-it", name, "sh"])
            }
            (EntityKind::Vm, Action::Exec) => CommandLine::new(self.runtime.clone(), ["ssh"]),
            _ => return None,
        };
        Some(self.terminal.wrap(&inner))
    }
}
