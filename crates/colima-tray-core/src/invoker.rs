//! External process invocation.
//!
//! Everything the core knows about the outside world goes through
//! [`ProcessInvoker`], so tests can swap in a scripted engine.

use std::{fmt, process::Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Program name or path.
    pub program: String,
    /// Arguments passed verbatim (no shell).
    pub args: Vec<String>,
}

impl CommandLine {
    /// Build a command line from a program and arguments.
    pub fn new<P, I, A>(program: P, args: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The command rendered for a POSIX shell, each word single-quoted when
    /// it contains anything outside a conservative safe set.
    pub fn to_shell(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|word| shell_quote(word))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '='));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Result of running an external command to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Combined stdout followed by stderr.
    pub output: Vec<u8>,
    /// Whether the process ran and exited successfully.
    pub ok: bool,
}

impl Invocation {
    /// Successful invocation with the given output.
    pub fn success(output: impl Into<Vec<u8>>) -> Self {
        Self {
            output: output.into(),
            ok: true,
        }
    }

    /// Failed invocation with whatever output was captured.
    pub fn failure(output: impl Into<Vec<u8>>) -> Self {
        Self {
            output: output.into(),
            ok: false,
        }
    }

    /// Output decoded lossily as UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Capability to run external commands.
///
/// Implementations never return errors: a command that cannot be spawned
/// reports `ok = false`.
#[async_trait]
pub trait ProcessInvoker: Send + Sync {
    /// Run `command` to completion and capture its combined output.
    async fn run(&self, command: &CommandLine) -> Invocation;

    /// Launch `command` without waiting for it. Returns whether it spawned.
    fn spawn_detached(&self, command: &CommandLine) -> bool;
}

/// [`ProcessInvoker`] backed by real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInvoker;

#[async_trait]
impl ProcessInvoker for SystemInvoker {
    #[instrument(skip(self), fields(command = %command))]
    async fn run(&self, command: &CommandLine) -> Invocation {
        let result = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .output()
            .await;

        match result {
            Ok(out) => {
                let mut output = out.stdout;
                output.extend_from_slice(&out.stderr);
                debug!(
                    exit = ?out.status.code(),
                    output_len = output.len(),
                    "Command finished"
                );
                Invocation {
                    output,
                    ok: out.status.success(),
                }
            }
            Err(e) => {
                debug!(error = ?e, "Command could not be spawned");
                Invocation::failure(Vec::new())
            }
        }
    }

    fn spawn_detached(&self, command: &CommandLine) -> bool {
        // The child handle is dropped immediately; tokio reaps it in the
        // background once it exits.
        match Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(_child) => {
                debug!(command = %command, "Detached command spawned");
                true
            }
            Err(e) => {
                warn!(command = %command, error = ?e, "Failed to spawn detached command");
                false
            }
        }
    }
}
