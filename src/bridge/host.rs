use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::bridge::message::{BridgeMessage, ConsoleLevel, HostCommand};
use crate::bridge::state::{BridgeEvent, BridgeState};
use crate::bridge::transport::Transport;
use crate::discovery::discovery::DiscoveryResult;
use crate::error::BridgeError;
use crate::field::field_model::FillInstruction;
use crate::inject::fill_pass::InjectionReport;
use crate::trace::logger::TraceLogger;

/// Host-side deadlines. The content side has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeSettings {
    pub ready_timeout: Duration,
    pub operation_timeout: Duration,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_millis(10_000),
            operation_timeout: Duration::from_millis(5_000),
        }
    }
}

/// A discovery result tagged with the page generation it was taken from.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedPage {
    pub generation: u64,
    pub result: DiscoveryResult,
}

/// The host end of the bridge.
///
/// Requests take `&mut self`, so at most one discovery or injection is ever
/// in flight. Every navigation bumps `generation`, which invalidates
/// descriptors scraped before it.
pub struct HostBridge<T: Transport> {
    transport: T,
    state: BridgeState,
    generation: u64,
    settings: BridgeSettings,
    console: Vec<(ConsoleLevel, String)>,
    tracer: TraceLogger,
    // a Load/LoadHtml we sent whose NavigationStarted has not arrived yet
    navigation_pending: bool,
    // timed-out requests whose late replies are still owed
    owed: OwedReplies,
}

/// Terminal replies the content side still owes for requests the host gave
/// up on. The content surface answers commands in order, so the next
/// `scrapes` FieldsScraped and `injections` InjectionComplete/InjectionError
/// messages belong to abandoned requests.
#[derive(Debug, Default, Clone, Copy)]
struct OwedReplies {
    scrapes: usize,
    injections: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reply {
    Scrape,
    Injection,
}

impl Reply {
    fn of(message: &BridgeMessage) -> Option<Reply> {
        match message {
            BridgeMessage::FieldsScraped { .. } => Some(Reply::Scrape),
            BridgeMessage::InjectionComplete { .. } | BridgeMessage::InjectionError { .. } => {
                Some(Reply::Injection)
            }
            _ => None,
        }
    }

    fn waiting_for(&self) -> &'static str {
        match self {
            Reply::Scrape => "FieldsScraped",
            Reply::Injection => "InjectionComplete",
        }
    }
}

impl OwedReplies {
    fn counter(&mut self, reply: Reply) -> &mut usize {
        match reply {
            Reply::Scrape => &mut self.scrapes,
            Reply::Injection => &mut self.injections,
        }
    }

    /// Consume one owed reply of this kind, if any is outstanding.
    fn settle(&mut self, reply: Reply) -> bool {
        let owed = self.counter(reply);
        if *owed == 0 {
            return false;
        }
        *owed -= 1;
        true
    }
}

impl<T: Transport> HostBridge<T> {
    pub fn new(transport: T, settings: BridgeSettings) -> Self {
        Self {
            transport,
            state: BridgeState::Idle,
            generation: 0,
            settings,
            console: Vec::new(),
            tracer: TraceLogger::disabled(),
            navigation_pending: false,
            owed: OwedReplies::default(),
        }
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Diagnostics the content surface forwarded so far.
    pub fn console_log(&self) -> &[(ConsoleLevel, String)] {
        &self.console
    }

    // ------------------------------------------------------------------
    // Page lifecycle
    // ------------------------------------------------------------------

    pub fn navigate(&mut self, url: &str) -> Result<(), BridgeError> {
        self.begin_navigation(HostCommand::Load { url: url.to_string() })?;
        self.wait_until_ready()
    }

    pub fn load_html(&mut self, html: &str, url: Option<&str>) -> Result<(), BridgeError> {
        self.begin_navigation(HostCommand::LoadHtml {
            html: html.to_string(),
            url: url.map(str::to_string),
        })?;
        self.wait_until_ready()
    }

    fn begin_navigation(&mut self, command: HostCommand) -> Result<(), BridgeError> {
        self.send(&command)?;
        self.reset_for_navigation();
        self.navigation_pending = true;
        Ok(())
    }

    fn reset_for_navigation(&mut self) {
        self.generation += 1;
        self.transition(BridgeEvent::NavigationStarted);
    }

    /// Block until the content surface announces PageReady.
    pub fn wait_until_ready(&mut self) -> Result<(), BridgeError> {
        let deadline = Instant::now() + self.settings.ready_timeout;
        while self.state != BridgeState::Ready {
            let message = self.next_message(deadline, "PageReady")?;
            if let BridgeMessage::LoadFailed { url, error } = message {
                return Err(BridgeError::Load { url, error });
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    pub fn discover(&mut self) -> Result<ScrapedPage, BridgeError> {
        self.state = self.state.on(BridgeEvent::DiscoveryRequested)?;
        let generation = self.generation;
        self.send_or_abort(&HostCommand::RunDiscovery)?;

        let message = self.await_terminal(Reply::Scrape)?;
        self.transition(BridgeEvent::OperationComplete);

        match message {
            BridgeMessage::FieldsScraped {
                success: true,
                fields,
                form_count,
                page_title,
                fingerprint,
                ..
            } => Ok(ScrapedPage {
                generation,
                result: DiscoveryResult {
                    fields: fields.unwrap_or_default(),
                    form_count: form_count.unwrap_or_default(),
                    page_title: page_title.unwrap_or_default(),
                    fingerprint: fingerprint.unwrap_or_default(),
                },
            }),
            BridgeMessage::FieldsScraped { error, .. } => Err(BridgeError::DiscoveryFailed(
                error.unwrap_or_else(|| "unknown discovery failure".into()),
            )),
            other => Err(BridgeError::Protocol(format!("Unexpected {}", other.name()))),
        }
    }

    pub fn inject(&mut self, instructions: &[FillInstruction]) -> Result<InjectionReport, BridgeError> {
        self.state = self.state.on(BridgeEvent::InjectionRequested)?;
        self.send_or_abort(&HostCommand::RunInjection {
            instructions: instructions.to_vec(),
        })?;

        let message = self.await_terminal(Reply::Injection)?;
        self.transition(BridgeEvent::OperationComplete);

        match message {
            BridgeMessage::InjectionComplete {
                success_count,
                fail_count,
                total,
                results,
            } => {
                info!(success_count, fail_count, total, "Injection complete");
                Ok(InjectionReport {
                    success_count,
                    fail_count,
                    total,
                    results,
                })
            }
            BridgeMessage::InjectionError { error } => Err(BridgeError::InjectionFailed(error)),
            other => Err(BridgeError::Protocol(format!("Unexpected {}", other.name()))),
        }
    }

    /// Inject instructions planned from a scrape of page `generation`.
    /// Refused when the page has navigated since.
    pub fn inject_scraped(
        &mut self,
        generation: u64,
        instructions: &[FillInstruction],
    ) -> Result<InjectionReport, BridgeError> {
        if generation != self.generation {
            return Err(BridgeError::StaleDescriptors {
                scraped: generation,
                current: self.generation,
            });
        }
        self.inject(instructions)
    }

    pub fn shutdown(mut self) -> Result<(), BridgeError> {
        self.send(&HostCommand::Shutdown)?;
        self.transition(BridgeEvent::Closed);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    fn send(&mut self, command: &HostCommand) -> Result<(), BridgeError> {
        self.tracer.command(self.state, self.generation, command);
        debug!(command = command.name(), step = self.tracer.step(), "Host -> content");
        self.transport.send(command)
    }

    fn send_or_abort(&mut self, command: &HostCommand) -> Result<(), BridgeError> {
        self.send(command).inspect_err(|_| {
            self.state = BridgeState::Ready;
        })
    }

    fn transition(&mut self, event: BridgeEvent) {
        match self.state.on(event) {
            Ok(next) => self.state = next,
            Err(e) => warn!(state = %self.state, event = ?event, error = %e, "Ignoring bridge event"),
        }
    }

    /// Wait for the terminal reply to the request just sent. A navigation in
    /// between aborts with `Navigated`. On timeout the request is abandoned
    /// and its reply is recorded as owed, so a late answer is never taken
    /// for the answer to a later request.
    fn await_terminal(&mut self, expected: Reply) -> Result<BridgeMessage, BridgeError> {
        let deadline = Instant::now() + self.settings.operation_timeout;
        let generation = self.generation;
        loop {
            let message = match self.next_message(deadline, expected.waiting_for()) {
                Ok(message) => message,
                Err(e) => {
                    // the content side has no cancel
                    if matches!(e, BridgeError::Timeout { .. }) {
                        *self.owed.counter(expected) += 1;
                    }
                    if self.state.is_busy() {
                        self.state = BridgeState::Ready;
                    }
                    return Err(e);
                }
            };
            if self.generation != generation {
                return Err(BridgeError::Navigated);
            }
            if Reply::of(&message) == Some(expected) {
                return Ok(message);
            }
            if message.is_terminal() {
                warn!(message = message.name(), "Dropping unexpected terminal message");
            }
        }
    }

    /// Next non-console message before `deadline`, with lifecycle messages
    /// already applied to the state machine.
    fn next_message(&mut self, deadline: Instant, waiting_for: &str) -> Result<BridgeMessage, BridgeError> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(BridgeError::Timeout {
                    waiting_for: waiting_for.to_string(),
                });
            }
            let message = self.transport.recv_timeout(remaining).map_err(|e| match e {
                BridgeError::Timeout { .. } => BridgeError::Timeout {
                    waiting_for: waiting_for.to_string(),
                },
                other => other,
            })?;

            self.tracer.message(self.state, self.generation, &message);

            if Reply::of(&message).is_some_and(|reply| self.owed.settle(reply)) {
                debug!(message = message.name(), "Draining late reply of a timed-out request");
                continue;
            }

            match &message {
                BridgeMessage::ConsoleForward { level, message } => {
                    match level {
                        ConsoleLevel::Error => error!(target: "content", "{}", message),
                        ConsoleLevel::Warn => warn!(target: "content", "{}", message),
                        ConsoleLevel::Info => info!(target: "content", "{}", message),
                        ConsoleLevel::Debug => debug!(target: "content", "{}", message),
                    }
                    self.console.push((*level, message.clone()));
                    continue;
                }
                BridgeMessage::NavigationStarted { url } => {
                    debug!(url = %url, "Content navigating");
                    if self.navigation_pending {
                        self.navigation_pending = false;
                    } else {
                        self.reset_for_navigation();
                    }
                }
                BridgeMessage::PageReady => self.transition(BridgeEvent::PageReady),
                BridgeMessage::LoadFailed { url, error } => {
                    warn!(url = %url, error = %error, "Content failed to load page");
                    self.navigation_pending = false;
                    self.transition(BridgeEvent::LoadFailed);
                }
                _ => {}
            }
            return Ok(message);
        }
    }
}
