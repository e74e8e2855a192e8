use thiserror::Error;

use crate::dom::events::EventKind;

/// Failures raised while reading or mutating the document.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomError {
    /// Node handle does not exist in this document
    #[error("Node {0} does not exist in this document")]
    NodeNotFound(usize),

    /// Node was removed from the tree before the operation ran
    #[error("Node {0} is no longer connected to the document")]
    Detached(usize),

    /// Operation needs a form control but got something else
    #[error("Node {node} is not a form control ({tag})")]
    NotAControl { node: usize, tag: String },

    /// A page listener threw while an event was being dispatched
    #[error("Listener for '{event}' threw: {message}")]
    ListenerThrew { event: EventKind, message: String },
}

/// Failures on the host/content channel.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Bridge I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error ({context}): {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Content surface process failed to spawn
    #[error("Failed to spawn content surface '{program}': {source}")]
    SubprocessSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Request issued before a PageReady was observed
    #[error("Bridge is not ready (state: {state})")]
    NotReady { state: String },

    /// Another discovery or injection is still in flight
    #[error("Bridge is busy (state: {state})")]
    Busy { state: String },

    #[error("Timed out waiting for {waiting_for}")]
    Timeout { waiting_for: String },

    /// The content surface navigated while a request was in flight
    #[error("Content surface navigated away; previous descriptors are invalid")]
    Navigated,

    /// Fill instructions were built from a discovery pass of an earlier page
    #[error("Descriptors from page generation {scraped} are stale (current: {current})")]
    StaleDescriptors { scraped: u64, current: u64 },

    /// Content reported `FieldsScraped { success: false }`
    #[error("Discovery failed: {0}")]
    DiscoveryFailed(String),

    /// Content reported `InjectionError`
    #[error("Injection failed: {0}")]
    InjectionFailed(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Content surface disconnected")]
    Disconnected,

    /// The content surface could not load the requested page
    #[error("Failed to load {url}: {error}")]
    Load { url: String, error: String },
}

impl BridgeError {
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        BridgeError::Json {
            context: context.into(),
            source,
        }
    }

    /// Safe to retry the same request once the bridge is ready again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeError::Timeout { .. } | BridgeError::Navigated | BridgeError::NotReady { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Failed to read profile {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid profile {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}
