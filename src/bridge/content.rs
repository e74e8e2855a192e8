use std::io::{BufRead, Write};

use tracing::{debug, info, warn};

use crate::bridge::loader::load_page;
use crate::bridge::message::{BridgeMessage, ConsoleLevel, HostCommand};
use crate::discovery::discovery::discover;
use crate::dom::dom_model::Document;
use crate::dom::html::parse_html_with_url;
use crate::error::BridgeError;
use crate::inject::fill_pass::run_injection;
use crate::matcher::vocabulary::Vocabulary;

/// The content side of the bridge: owns the page and answers commands.
///
/// Never suspends. Every command runs to completion and yields its messages,
/// with exactly one terminal message per discovery or injection.
pub struct ContentSurface {
    doc: Option<Document>,
    vocabulary: Vocabulary,
    forward_console: bool,
    closed: bool,
}

impl ContentSurface {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self {
            doc: None,
            vocabulary,
            forward_console: true,
            closed: false,
        }
    }

    /// A surface that starts with `doc` already rendered.
    pub fn with_document(vocabulary: Vocabulary, doc: Document) -> Self {
        Self {
            doc: Some(doc),
            ..Self::new(vocabulary)
        }
    }

    pub fn forward_console(mut self, enabled: bool) -> Self {
        self.forward_console = enabled;
        self
    }

    pub fn document(&self) -> Option<&Document> {
        self.doc.as_ref()
    }

    pub fn document_mut(&mut self) -> Option<&mut Document> {
        self.doc.as_mut()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Messages announced as soon as a channel opens.
    pub fn startup_messages(&self) -> Vec<BridgeMessage> {
        match &self.doc {
            Some(_) => vec![BridgeMessage::PageReady],
            None => Vec::new(),
        }
    }

    pub fn handle(&mut self, command: HostCommand) -> Vec<BridgeMessage> {
        debug!(command = command.name(), "Content command");
        let mut out = Vec::new();

        match command {
            HostCommand::Load { url } => {
                out.push(BridgeMessage::NavigationStarted { url: url.clone() });
                self.doc = None;
                match load_page(&url) {
                    Ok(html) => self.render(&html, Some(&url), &mut out),
                    Err(e) => {
                        warn!(url = %url, error = %e, "Page load failed");
                        out.push(BridgeMessage::LoadFailed {
                            url,
                            error: e.to_string(),
                        });
                    }
                }
            }
            HostCommand::LoadHtml { html, url } => {
                out.push(BridgeMessage::NavigationStarted {
                    url: url.clone().unwrap_or_else(|| "about:blank".into()),
                });
                self.doc = None;
                self.render(&html, url.as_deref(), &mut out);
            }
            HostCommand::RunDiscovery => {
                let Some(doc) = self.doc.as_ref() else {
                    out.push(BridgeMessage::scrape_failed("No document loaded"));
                    return out;
                };
                let result = discover(doc);
                if let (Ok(found), true) = (&result, self.forward_console) {
                    out.push(BridgeMessage::console(
                        ConsoleLevel::Info,
                        format!("Discovered {} fields on '{}'", found.fields.len(), found.page_title),
                    ));
                }
                out.push(BridgeMessage::scraped(result));
            }
            HostCommand::RunInjection { instructions } => {
                let Some(doc) = self.doc.as_mut() else {
                    out.push(BridgeMessage::InjectionError {
                        error: "No document loaded".into(),
                    });
                    return out;
                };
                let report = run_injection(doc, &instructions, &self.vocabulary);
                if self.forward_console {
                    for result in report.results.iter().filter(|r| !r.outcome.is_filled()) {
                        out.push(BridgeMessage::console(
                            ConsoleLevel::Debug,
                            format!("{}: {:?}", result.field_name, result.outcome),
                        ));
                    }
                    out.push(BridgeMessage::console(
                        ConsoleLevel::Info,
                        format!("Filled {}/{} fields", report.success_count, report.total),
                    ));
                }
                out.push(BridgeMessage::injection_complete(report));
            }
            HostCommand::Shutdown => {
                info!("Content surface shutting down");
                self.closed = true;
            }
        }
        out
    }

    fn render(&mut self, html: &str, url: Option<&str>, out: &mut Vec<BridgeMessage>) {
        match parse_html_with_url(html, url) {
            Ok(doc) => {
                info!(title = %doc.title(), "Page rendered");
                self.doc = Some(doc);
                out.push(BridgeMessage::PageReady);
            }
            Err(e) => out.push(BridgeMessage::LoadFailed {
                url: url.unwrap_or("about:blank").to_string(),
                error: e.to_string(),
            }),
        }
    }
}

// ============================================================================
// NDJSON serve loop
// ============================================================================

fn write_message(writer: &mut impl Write, message: &BridgeMessage) -> Result<(), BridgeError> {
    writeln!(writer, "{}", message.to_line()?)?;
    writer.flush()?;
    Ok(())
}

/// Answer commands read line by line from `reader` until EOF or Shutdown.
/// Unparseable lines are reported as an error ConsoleForward and skipped.
pub fn serve(
    surface: &mut ContentSurface,
    reader: impl BufRead,
    mut writer: impl Write,
) -> Result<(), BridgeError> {
    for message in surface.startup_messages() {
        write_message(&mut writer, &message)?;
    }

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let command = match HostCommand::from_line(&line) {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed command");
                write_message(
                    &mut writer,
                    &BridgeMessage::console(ConsoleLevel::Error, e.to_string()),
                )?;
                continue;
            }
        };

        for message in surface.handle(command) {
            write_message(&mut writer, &message)?;
        }
        if surface.is_closed() {
            break;
        }
    }
    Ok(())
}
