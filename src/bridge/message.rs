use serde::{Deserialize, Serialize};

use crate::discovery::discovery::DiscoveryResult;
use crate::error::{BridgeError, DomError};
use crate::field::field_model::{FieldDescriptor, FillInstruction};
use crate::inject::fill_pass::{FieldResult, InjectionReport};

// ============================================================================
// Host -> content
// ============================================================================

/// Command sent from the host to the content surface (one JSON line).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum HostCommand {
    RunDiscovery,
    RunInjection {
        instructions: Vec<FillInstruction>,
    },
    /// Fetch and render a page by URL or path
    Load {
        url: String,
    },
    /// Render an HTML snapshot the host already has
    LoadHtml {
        html: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    Shutdown,
}

impl HostCommand {
    pub fn name(&self) -> &'static str {
        match self {
            HostCommand::RunDiscovery => "RunDiscovery",
            HostCommand::RunInjection { .. } => "RunInjection",
            HostCommand::Load { .. } => "Load",
            HostCommand::LoadHtml { .. } => "LoadHtml",
            HostCommand::Shutdown => "Shutdown",
        }
    }

    /// Short gist for traces. Page markup is never copied into the trace.
    pub fn summary(&self) -> Option<String> {
        match self {
            HostCommand::RunInjection { instructions } => Some(format!("{} instructions", instructions.len())),
            HostCommand::Load { url } => Some(url.clone()),
            HostCommand::LoadHtml { html, url } => Some(match url {
                Some(url) => format!("{} ({} bytes)", url, html.len()),
                None => format!("{} bytes", html.len()),
            }),
            HostCommand::RunDiscovery | HostCommand::Shutdown => None,
        }
    }

    pub fn to_line(&self) -> Result<String, BridgeError> {
        serde_json::to_string(self).map_err(|e| BridgeError::json("HostCommand", e))
    }

    pub fn from_line(line: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(line.trim()).map_err(|e| BridgeError::json("HostCommand", e))
    }
}

// ============================================================================
// Content -> host
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Envelope posted by the content surface, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum BridgeMessage {
    /// The document finished loading and may be scraped
    PageReady,
    FieldsScraped {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fields: Option<Vec<FieldDescriptor>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        form_count: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        page_title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fingerprint: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    InjectionComplete {
        success_count: usize,
        fail_count: usize,
        total: usize,
        #[serde(default)]
        results: Vec<FieldResult>,
    },
    /// Whole-batch failure, distinct from per-field misses
    InjectionError {
        error: String,
    },
    ConsoleForward {
        level: ConsoleLevel,
        message: String,
    },
    NavigationStarted {
        url: String,
    },
    LoadFailed {
        url: String,
        error: String,
    },
}

impl BridgeMessage {
    pub fn scraped(result: Result<DiscoveryResult, DomError>) -> Self {
        match result {
            Ok(found) => BridgeMessage::FieldsScraped {
                success: true,
                fields: Some(found.fields),
                form_count: Some(found.form_count),
                page_title: Some(found.page_title),
                fingerprint: Some(found.fingerprint),
                error: None,
            },
            // all or nothing: no partial field list
            Err(e) => Self::scrape_failed(e.to_string()),
        }
    }

    pub fn scrape_failed(error: impl Into<String>) -> Self {
        BridgeMessage::FieldsScraped {
            success: false,
            fields: None,
            form_count: None,
            page_title: None,
            fingerprint: None,
            error: Some(error.into()),
        }
    }

    pub fn injection_complete(report: InjectionReport) -> Self {
        BridgeMessage::InjectionComplete {
            success_count: report.success_count,
            fail_count: report.fail_count,
            total: report.total,
            results: report.results,
        }
    }

    pub fn console(level: ConsoleLevel, message: impl Into<String>) -> Self {
        BridgeMessage::ConsoleForward {
            level,
            message: message.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BridgeMessage::PageReady => "PageReady",
            BridgeMessage::FieldsScraped { .. } => "FieldsScraped",
            BridgeMessage::InjectionComplete { .. } => "InjectionComplete",
            BridgeMessage::InjectionError { .. } => "InjectionError",
            BridgeMessage::ConsoleForward { .. } => "ConsoleForward",
            BridgeMessage::NavigationStarted { .. } => "NavigationStarted",
            BridgeMessage::LoadFailed { .. } => "LoadFailed",
        }
    }

    /// Short human-readable gist for traces.
    pub fn summary(&self) -> Option<String> {
        match self {
            BridgeMessage::PageReady => None,
            BridgeMessage::FieldsScraped {
                success: true,
                fields,
                page_title,
                ..
            } => Some(format!(
                "{} fields on '{}'",
                fields.as_ref().map_or(0, Vec::len),
                page_title.as_deref().unwrap_or_default()
            )),
            BridgeMessage::FieldsScraped { .. } => Some("discovery failed".into()),
            BridgeMessage::InjectionComplete {
                success_count,
                total,
                ..
            } => Some(format!("{}/{} filled", success_count, total)),
            BridgeMessage::InjectionError { .. } => Some("injection failed".into()),
            BridgeMessage::ConsoleForward { level, message } => Some(format!("[{:?}] {}", level, message)),
            BridgeMessage::NavigationStarted { url } => Some(url.clone()),
            BridgeMessage::LoadFailed { url, .. } => Some(url.clone()),
        }
    }

    /// The failure a message reports, if it reports one.
    pub fn error(&self) -> Option<&str> {
        match self {
            BridgeMessage::FieldsScraped {
                success: false, error, ..
            } => Some(error.as_deref().unwrap_or("unknown discovery failure")),
            BridgeMessage::InjectionError { error } | BridgeMessage::LoadFailed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Ends the operation that was in flight.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BridgeMessage::FieldsScraped { .. }
                | BridgeMessage::InjectionComplete { .. }
                | BridgeMessage::InjectionError { .. }
        )
    }

    pub fn to_line(&self) -> Result<String, BridgeError> {
        serde_json::to_string(self).map_err(|e| BridgeError::json("BridgeMessage", e))
    }

    pub fn from_line(line: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(line.trim()).map_err(|e| BridgeError::json("BridgeMessage", e))
    }
}
