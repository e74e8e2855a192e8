use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};

use tracing::warn;

use crate::bridge::message::{BridgeMessage, HostCommand};
use crate::bridge::state::BridgeState;
use crate::trace::trace::{Direction, TraceEvent};

/// JSONL record of bridge traffic, one line per message in either direction.
///
/// Steps are numbered even while disabled, so a trace switched on later
/// still lines up with debug logs.
pub struct TraceLogger {
    out: Option<LineWriter<File>>,
    step: u64,
}

impl TraceLogger {
    /// Append to `path`. An unopenable file yields a disabled logger.
    pub fn new(path: &str) -> Self {
        let out = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(LineWriter::new(file)),
            Err(e) => {
                warn!(path, error = %e, "Could not open trace file, tracing disabled");
                None
            }
        };
        Self { out, step: 0 }
    }

    pub fn disabled() -> Self {
        Self { out: None, step: 0 }
    }

    pub fn is_enabled(&self) -> bool {
        self.out.is_some()
    }

    /// Step number of the last recorded message.
    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn command(&mut self, state: BridgeState, generation: u64, command: &HostCommand) {
        self.step += 1;
        let mut event = TraceEvent::now(self.step, state, generation, Direction::HostToContent, command.name());
        if let Some(summary) = command.summary() {
            event = event.with_summary(summary);
        }
        self.write(&event);
    }

    pub fn message(&mut self, state: BridgeState, generation: u64, message: &BridgeMessage) {
        self.step += 1;
        let mut event = TraceEvent::now(self.step, state, generation, Direction::ContentToHost, message.name());
        if let Some(summary) = message.summary() {
            event = event.with_summary(summary);
        }
        if let Some(error) = message.error() {
            event = event.with_error(error);
        }
        self.write(&event);
    }

    fn write(&mut self, event: &TraceEvent) {
        let Some(out) = self.out.as_mut() else {
            return;
        };
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to serialize trace event");
                return;
            }
        };
        if let Err(e) = writeln!(out, "{}", line) {
            warn!(error = %e, step = event.step, "Failed to write trace event, tracing disabled");
            self.out = None;
        }
    }
}
