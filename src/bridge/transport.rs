use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::bridge::content::ContentSurface;
use crate::bridge::message::{BridgeMessage, HostCommand};
use crate::error::BridgeError;

/// One-way-at-a-time channel between host and content. Both directions
/// carry JSON lines; nothing is shared.
pub trait Transport {
    fn send(&mut self, command: &HostCommand) -> Result<(), BridgeError>;

    /// Next content message, or `Timeout` once `timeout` elapses.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<BridgeMessage, BridgeError>;
}

fn recv_line(lines: &Receiver<String>, timeout: Duration) -> Result<BridgeMessage, BridgeError> {
    match lines.recv_timeout(timeout) {
        Ok(line) => BridgeMessage::from_line(&line),
        Err(RecvTimeoutError::Timeout) => Err(BridgeError::Timeout {
            waiting_for: "content message".into(),
        }),
        Err(RecvTimeoutError::Disconnected) => Err(BridgeError::Disconnected),
    }
}

// ============================================================================
// In-process transport
// ============================================================================

/// Runs a `ContentSurface` on its own thread, talking over channels.
pub struct InProcessTransport {
    commands: Option<Sender<String>>,
    messages: Receiver<String>,
    worker: Option<JoinHandle<()>>,
}

impl InProcessTransport {
    pub fn spawn(mut surface: ContentSurface) -> Self {
        let (command_tx, command_rx) = mpsc::channel::<String>();
        let (message_tx, message_rx) = mpsc::channel::<String>();

        let worker = thread::spawn(move || {
            let post = |message: &BridgeMessage| match message.to_line() {
                Ok(line) => message_tx.send(line).is_ok(),
                Err(e) => {
                    warn!(error = %e, "Dropping unserializable message");
                    true
                }
            };

            for message in surface.startup_messages() {
                if !post(&message) {
                    return;
                }
            }
            for line in command_rx {
                let command = match HostCommand::from_line(&line) {
                    Ok(command) => command,
                    Err(e) => {
                        warn!(error = %e, "Ignoring malformed command");
                        continue;
                    }
                };
                for message in surface.handle(command) {
                    if !post(&message) {
                        return;
                    }
                }
                if surface.is_closed() {
                    return;
                }
            }
        });

        Self {
            commands: Some(command_tx),
            messages: message_rx,
            worker: Some(worker),
        }
    }
}

impl Transport for InProcessTransport {
    fn send(&mut self, command: &HostCommand) -> Result<(), BridgeError> {
        let line = command.to_line()?;
        let sender = self.commands.as_ref().ok_or(BridgeError::Disconnected)?;
        sender.send(line).map_err(|_| BridgeError::Disconnected)
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<BridgeMessage, BridgeError> {
        recv_line(&self.messages, timeout)
    }
}

impl Drop for InProcessTransport {
    fn drop(&mut self) {
        // closing the command channel ends the worker loop
        self.commands.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

// ============================================================================
// Subprocess transport
// ============================================================================

/// A content surface in a child process (`form-autofill serve`), NDJSON over
/// stdin/stdout. A reader thread turns stdout into a channel so receives can
/// time out.
pub struct ProcessTransport {
    child: Child,
    stdin: ChildStdin,
    messages: Receiver<String>,
    reader: Option<JoinHandle<()>>,
}

impl ProcessTransport {
    pub fn spawn(program: &Path, args: &[String]) -> Result<Self, BridgeError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| BridgeError::SubprocessSpawn {
                program: program.display().to_string(),
                source: e,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::Protocol("Failed to capture stdin of content process".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Protocol("Failed to capture stdout of content process".into()))?;

        let (tx, rx) = mpsc::channel();
        let reader = thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                if tx.send(line).is_err() {
                    break;
                }
            }
            debug!("Content process stdout closed");
        });

        Ok(Self {
            child,
            stdin,
            messages: rx,
            reader: Some(reader),
        })
    }

    /// Spawn this executable's own `serve` subcommand.
    pub fn spawn_self(extra_args: &[String]) -> Result<Self, BridgeError> {
        let exe = std::env::current_exe()?;
        let mut args = extra_args.to_vec();
        args.push("serve".into());
        Self::spawn(&exe, &args)
    }
}

impl Transport for ProcessTransport {
    fn send(&mut self, command: &HostCommand) -> Result<(), BridgeError> {
        writeln!(self.stdin, "{}", command.to_line()?)?;
        self.stdin.flush()?;
        Ok(())
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<BridgeMessage, BridgeError> {
        recv_line(&self.messages, timeout)
    }
}

impl Drop for ProcessTransport {
    fn drop(&mut self) {
        // best effort; the process may already be gone
        let _ = self.send(&HostCommand::Shutdown);
        let _ = self.child.wait();
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}
