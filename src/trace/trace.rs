use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::bridge::state::BridgeState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HostToContent,
    ContentToHost,
}

/// One line of the bridge traffic trace.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub step: u64,

    pub bridge_state: String,
    pub generation: u64,

    pub direction: Direction,
    pub message_type: String,

    pub summary: Option<String>,
    pub error: Option<String>,
}

impl TraceEvent {
    pub fn now(step: u64, state: BridgeState, generation: u64, direction: Direction, message_type: &str) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            step,
            bridge_state: state.to_string(),
            generation,
            direction,
            message_type: message_type.to_string(),
            summary: None,
            error: None,
        }
    }

    pub fn with_summary(mut self, summary: impl ToString) -> Self {
        self.summary = Some(summary.to_string());
        self
    }

    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}
