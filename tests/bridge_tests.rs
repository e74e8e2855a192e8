use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Cursor;
use std::rc::Rc;
use std::time::Duration;

use form_autofill::bridge::content::{ContentSurface, serve};
use form_autofill::bridge::host::{BridgeSettings, HostBridge};
use form_autofill::bridge::message::{BridgeMessage, ConsoleLevel, HostCommand};
use form_autofill::bridge::state::{BridgeEvent, BridgeState};
use form_autofill::bridge::transport::{InProcessTransport, Transport};
use form_autofill::error::BridgeError;
use form_autofill::field::field_model::FillInstruction;
use form_autofill::matcher::vocabulary::Vocabulary;
use form_autofill::trace::logger::TraceLogger;
use serde_json::json;

use crate::common::utils::{E2E_PAGE, doc, page};

mod common;

// ============================================================================
// State machine
// ============================================================================

#[test]
fn state_table() {
    use BridgeEvent as E;
    use BridgeState as S;

    assert_eq!(S::Idle.on(E::NavigationStarted).unwrap(), S::AwaitingPageReady);
    assert_eq!(S::AwaitingPageReady.on(E::PageReady).unwrap(), S::Ready);
    assert_eq!(S::Ready.on(E::DiscoveryRequested).unwrap(), S::Discovering);
    assert_eq!(S::Ready.on(E::InjectionRequested).unwrap(), S::Injecting);
    assert_eq!(S::Discovering.on(E::OperationComplete).unwrap(), S::Ready);
    assert_eq!(S::Injecting.on(E::NavigationStarted).unwrap(), S::AwaitingPageReady);
    assert_eq!(S::Ready.on(E::LoadFailed).unwrap(), S::Idle);
    assert_eq!(S::Discovering.on(E::Closed).unwrap(), S::Idle);

    assert!(matches!(S::Idle.on(E::DiscoveryRequested), Err(BridgeError::NotReady { .. })));
    assert!(matches!(S::AwaitingPageReady.on(E::InjectionRequested), Err(BridgeError::NotReady { .. })));
    assert!(matches!(S::Discovering.on(E::InjectionRequested), Err(BridgeError::Busy { .. })));
    assert!(matches!(S::Injecting.on(E::DiscoveryRequested), Err(BridgeError::Busy { .. })));
    assert!(matches!(S::Ready.on(E::OperationComplete), Err(BridgeError::Protocol(_))));
    assert!(matches!(S::Injecting.on(E::PageReady), Err(BridgeError::Protocol(_))));
}

// ============================================================================
// Wire format
// ============================================================================

#[test]
fn host_commands_are_type_tagged() {
    let command = HostCommand::RunInjection {
        instructions: vec![FillInstruction::new("firstName", "Ada")],
    };
    assert_eq!(
        serde_json::to_value(&command).unwrap(),
        json!({"type": "RunInjection", "instructions": [{"fieldName": "firstName", "value": "Ada"}]})
    );
    assert_eq!(HostCommand::from_line(&command.to_line().unwrap()).unwrap(), command);

    let load = HostCommand::LoadHtml {
        html: "<p>".into(),
        url: None,
    };
    assert_eq!(serde_json::to_value(&load).unwrap(), json!({"type": "LoadHtml", "html": "<p>"}));
    assert_eq!(HostCommand::from_line(r#"{"type":"RunDiscovery"}"#).unwrap(), HostCommand::RunDiscovery);
    assert!(matches!(HostCommand::from_line("{\"type\":\"Explode\"}"), Err(BridgeError::Json { .. })));
}

#[test]
fn content_messages_are_type_tagged_and_camel_case() {
    assert_eq!(
        serde_json::to_value(BridgeMessage::scrape_failed("boom")).unwrap(),
        json!({"type": "FieldsScraped", "success": false, "error": "boom"})
    );
    assert_eq!(
        serde_json::to_value(BridgeMessage::console(ConsoleLevel::Warn, "careful")).unwrap(),
        json!({"type": "ConsoleForward", "level": "warn", "message": "careful"})
    );

    let complete = BridgeMessage::from_line(
        r#"{"type":"InjectionComplete","successCount":1,"failCount":0,"total":1}"#,
    )
    .unwrap();
    assert_eq!(
        complete,
        BridgeMessage::InjectionComplete {
            success_count: 1,
            fail_count: 0,
            total: 1,
            results: Vec::new(),
        }
    );
    assert!(complete.is_terminal());
    assert!(!BridgeMessage::PageReady.is_terminal());
    assert_eq!(complete.summary().as_deref(), Some("1/1 filled"));
}

// ============================================================================
// Content surface
// ============================================================================

#[test]
fn content_without_document_answers_with_failures() {
    let mut surface = ContentSurface::new(Vocabulary::builtin());
    assert!(surface.startup_messages().is_empty());

    assert_eq!(
        surface.handle(HostCommand::RunDiscovery),
        vec![BridgeMessage::scrape_failed("No document loaded")]
    );
    assert_eq!(
        surface.handle(HostCommand::RunInjection { instructions: Vec::new() }),
        vec![BridgeMessage::InjectionError {
            error: "No document loaded".into()
        }]
    );
}

#[test]
fn content_renders_discovers_and_fills() {
    let mut surface = ContentSurface::new(Vocabulary::builtin()).forward_console(false);

    let loaded = surface.handle(HostCommand::LoadHtml {
        html: E2E_PAGE.into(),
        url: None,
    });
    assert_eq!(
        loaded,
        vec![
            BridgeMessage::NavigationStarted {
                url: "about:blank".into()
            },
            BridgeMessage::PageReady,
        ]
    );

    let scraped = surface.handle(HostCommand::RunDiscovery);
    assert_eq!(scraped.len(), 1, "one terminal message and no console chatter");
    match &scraped[0] {
        BridgeMessage::FieldsScraped {
            success: true,
            fields: Some(fields),
            page_title,
            ..
        } => {
            assert_eq!(fields.len(), 3);
            assert_eq!(page_title.as_deref(), Some("Apply"));
        }
        other => panic!("unexpected {other:?}"),
    }

    let filled = surface.handle(HostCommand::RunInjection {
        instructions: vec![FillInstruction::new("firstName", "Ada")],
    });
    assert!(matches!(
        filled.as_slice(),
        [BridgeMessage::InjectionComplete { success_count: 1, total: 1, .. }]
    ));
    let doc = surface.document().unwrap();
    assert_eq!(doc.value(doc.elements_by_tag(&["input"])[0]), "Ada");
}

#[test]
fn content_forwards_console_before_terminal_message() {
    let mut surface = ContentSurface::with_document(Vocabulary::builtin(), doc(E2E_PAGE));
    assert_eq!(surface.startup_messages(), vec![BridgeMessage::PageReady]);

    let messages = surface.handle(HostCommand::RunInjection {
        instructions: vec![FillInstruction::new("email", "a@b.c")],
    });
    let names: Vec<&str> = messages.iter().map(BridgeMessage::name).collect();
    assert_eq!(names, vec!["ConsoleForward", "ConsoleForward", "InjectionComplete"]);
    assert!(matches!(
        &messages[0],
        BridgeMessage::ConsoleForward { level: ConsoleLevel::Debug, message } if message.starts_with("email")
    ));
}

#[test]
fn load_of_missing_file_reports_load_failed() {
    let mut surface = ContentSurface::with_document(Vocabulary::builtin(), doc(E2E_PAGE));

    let messages = surface.handle(HostCommand::Load {
        url: "file:///definitely/not/here.html".into(),
    });
    assert_eq!(messages.len(), 2);
    assert!(matches!(&messages[1], BridgeMessage::LoadFailed { url, .. } if url.ends_with("here.html")));
    assert!(surface.document().is_none(), "the previous page is gone once navigation starts");
}

#[test]
fn serve_loop_speaks_ndjson() {
    let input = [
        r#"{"type":"LoadHtml","html":"<title>T</title><input name=\"email\">"}"#,
        "this is not json",
        "",
        r#"{"type":"RunDiscovery"}"#,
        r#"{"type":"Shutdown"}"#,
        r#"{"type":"RunDiscovery"}"#,
    ]
    .join("\n");
    let mut output = Vec::new();
    let mut surface = ContentSurface::new(Vocabulary::builtin()).forward_console(false);

    serve(&mut surface, Cursor::new(input), &mut output).unwrap();

    let messages: Vec<BridgeMessage> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| BridgeMessage::from_line(l).unwrap())
        .collect();
    let names: Vec<&str> = messages.iter().map(BridgeMessage::name).collect();
    assert_eq!(
        names,
        vec!["NavigationStarted", "PageReady", "ConsoleForward", "FieldsScraped"],
        "nothing is answered after Shutdown"
    );
    assert!(matches!(&messages[2], BridgeMessage::ConsoleForward { level: ConsoleLevel::Error, .. }));
    assert!(surface.is_closed());
}

// ============================================================================
// Host bridge over the in-process transport
// ============================================================================

fn in_process() -> HostBridge<InProcessTransport> {
    HostBridge::new(
        InProcessTransport::spawn(ContentSurface::new(Vocabulary::builtin())),
        BridgeSettings::default(),
    )
}

#[test]
fn requests_before_a_page_are_refused() {
    let mut bridge = in_process();

    assert_eq!(bridge.state(), BridgeState::Idle);
    let err = bridge.discover().unwrap_err();
    assert!(matches!(err, BridgeError::NotReady { .. }));
    assert!(err.is_retryable());
    assert!(matches!(bridge.inject(&[]), Err(BridgeError::NotReady { .. })));
}

#[test]
fn discover_then_fill_through_the_bridge() {
    let mut bridge = in_process();
    bridge.load_html(E2E_PAGE, Some("https://jobs.example/apply")).unwrap();
    assert_eq!(bridge.state(), BridgeState::Ready);
    assert_eq!(bridge.generation(), 1);

    let scraped = bridge.discover().unwrap();
    assert_eq!(scraped.generation, 1);
    assert_eq!(scraped.result.fields.len(), 3);
    assert_eq!(bridge.state(), BridgeState::Ready);

    let report = bridge
        .inject_scraped(
            scraped.generation,
            &[
                FillInstruction::new("firstName", "Ada"),
                FillInstruction::new("state", "California"),
            ],
        )
        .unwrap();
    assert_eq!((report.success_count, report.fail_count, report.total), (2, 0, 2));
    assert!(
        bridge.console_log().iter().any(|(level, m)| *level == ConsoleLevel::Info && m == "Filled 2/2 fields"),
        "content diagnostics are captured on the host"
    );

    let after = bridge.discover().unwrap().result;
    let value = |name: &str| {
        after
            .fields
            .iter()
            .find(|f| f.name.as_deref() == Some(name))
            .and_then(|f| f.current_value.clone())
    };
    assert_eq!(value("first_name").as_deref(), Some("Ada"));
    assert_eq!(value("firstName_legacy").as_deref(), Some("Bob"));
    assert_eq!(value("state").as_deref(), Some("California"));

    bridge.shutdown().unwrap();
}

#[test]
fn descriptors_from_an_earlier_page_are_stale() {
    let mut bridge = in_process();
    bridge.load_html(E2E_PAGE, None).unwrap();
    let scraped = bridge.discover().unwrap();

    bridge.load_html(E2E_PAGE, None).unwrap();
    assert_eq!(bridge.generation(), 2);

    let err = bridge
        .inject_scraped(scraped.generation, &[FillInstruction::new("firstName", "Ada")])
        .unwrap_err();
    assert!(matches!(err, BridgeError::StaleDescriptors { scraped: 1, current: 2 }));
    assert_eq!(bridge.state(), BridgeState::Ready, "a refused request changes nothing");
}

#[test]
fn navigate_to_fixture_and_to_missing_file() {
    let mut bridge = in_process();

    bridge.navigate(&page("application.html")).unwrap();
    let scraped = bridge.discover().unwrap();
    assert_eq!(scraped.result.fields.len(), 12);

    let err = bridge.navigate("file:///no/such/page.html").unwrap_err();
    assert!(matches!(err, BridgeError::Load { .. }));
    assert_eq!(bridge.state(), BridgeState::Idle);
    assert!(matches!(bridge.discover(), Err(BridgeError::NotReady { .. })));
}

// ============================================================================
// Host bridge over a scripted transport
// ============================================================================

/// Replays queued messages; an empty queue behaves like a silent content side.
struct Scripted {
    sent: Rc<RefCell<Vec<&'static str>>>,
    inbox: Rc<RefCell<VecDeque<Result<BridgeMessage, BridgeError>>>>,
}

impl Transport for Scripted {
    fn send(&mut self, command: &HostCommand) -> Result<(), BridgeError> {
        self.sent.borrow_mut().push(command.name());
        Ok(())
    }

    fn recv_timeout(&mut self, _timeout: Duration) -> Result<BridgeMessage, BridgeError> {
        self.inbox.borrow_mut().pop_front().unwrap_or_else(|| {
            Err(BridgeError::Timeout {
                waiting_for: "content message".into(),
            })
        })
    }
}

struct Script {
    bridge: HostBridge<Scripted>,
    sent: Rc<RefCell<Vec<&'static str>>>,
    inbox: Rc<RefCell<VecDeque<Result<BridgeMessage, BridgeError>>>>,
}

impl Script {
    /// A bridge that has already seen PageReady.
    fn ready() -> Self {
        let sent = Rc::new(RefCell::new(Vec::new()));
        let inbox = Rc::new(RefCell::new(VecDeque::new()));
        let transport = Scripted {
            sent: sent.clone(),
            inbox: inbox.clone(),
        };
        let settings = BridgeSettings {
            ready_timeout: Duration::from_millis(200),
            operation_timeout: Duration::from_millis(200),
        };
        let mut script = Self {
            bridge: HostBridge::new(transport, settings),
            sent,
            inbox,
        };
        script.queue([BridgeMessage::PageReady]);
        script.bridge.wait_until_ready().unwrap();
        script
    }

    fn queue(&mut self, messages: impl IntoIterator<Item = BridgeMessage>) {
        self.inbox.borrow_mut().extend(messages.into_iter().map(Ok));
    }
}

fn scraped_ok() -> BridgeMessage {
    scraped_titled("T")
}

#[test]
fn navigation_mid_request_aborts_it() {
    let mut script = Script::ready();
    script.queue([
        BridgeMessage::NavigationStarted {
            url: "https://elsewhere".into(),
        },
        scraped_ok(),
    ]);

    assert!(matches!(script.bridge.discover(), Err(BridgeError::Navigated)));
    assert_eq!(script.bridge.state(), BridgeState::AwaitingPageReady);
    assert_eq!(script.bridge.generation(), 1);

    script.queue([BridgeMessage::PageReady]);
    script.bridge.wait_until_ready().unwrap();
    assert_eq!(script.bridge.state(), BridgeState::Ready);
}

#[test]
fn timeout_releases_the_bridge() {
    let mut script = Script::ready();

    let err = script.bridge.discover().unwrap_err();
    assert!(matches!(&err, BridgeError::Timeout { waiting_for } if waiting_for == "FieldsScraped"));
    assert_eq!(script.bridge.state(), BridgeState::Ready);
    assert_eq!(*script.sent.borrow(), vec!["RunDiscovery"]);
}

fn scraped_titled(title: &str) -> BridgeMessage {
    BridgeMessage::FieldsScraped {
        success: true,
        fields: Some(Vec::new()),
        form_count: Some(0),
        page_title: Some(title.into()),
        fingerprint: Some("f".into()),
        error: None,
    }
}

fn injection_total(total: usize) -> BridgeMessage {
    BridgeMessage::InjectionComplete {
        success_count: 0,
        fail_count: total,
        total,
        results: Vec::new(),
    }
}

#[test]
fn retry_after_timeout_skips_the_late_reply() {
    let mut script = Script::ready();

    let err = script.bridge.discover().unwrap_err();
    assert!(err.is_retryable());

    script.queue([scraped_titled("OLD"), scraped_titled("NEW")]);
    let retried = script.bridge.discover().unwrap();
    assert_eq!(retried.result.page_title, "NEW", "the late reply belongs to the timed-out request");
    assert_eq!(*script.sent.borrow(), vec!["RunDiscovery", "RunDiscovery"]);

    script.queue([scraped_titled("NEXT")]);
    assert_eq!(
        script.bridge.discover().unwrap().result.page_title,
        "NEXT",
        "only one late reply was owed"
    );
}

#[test]
fn late_injection_reply_is_drained_during_other_requests() {
    let mut script = Script::ready();
    assert!(matches!(script.bridge.inject(&[]), Err(BridgeError::Timeout { .. })));

    script.queue([injection_total(7), scraped_ok()]);
    assert_eq!(script.bridge.discover().unwrap().result.page_title, "T");

    script.queue([injection_total(2)]);
    let report = script.bridge.inject(&[]).unwrap();
    assert_eq!(report.total, 2);
}

#[test]
fn two_timeouts_owe_two_replies() {
    let mut script = Script::ready();
    assert!(script.bridge.discover().is_err());
    assert!(script.bridge.discover().is_err());

    script.queue([scraped_titled("FIRST"), scraped_titled("SECOND"), scraped_titled("THIRD")]);
    assert_eq!(script.bridge.discover().unwrap().result.page_title, "THIRD");
}

#[test]
fn stray_results_and_console_lines_are_skipped() {
    let mut script = Script::ready();
    script.queue([
        BridgeMessage::InjectionComplete {
            success_count: 0,
            fail_count: 0,
            total: 0,
            results: Vec::new(),
        },
        BridgeMessage::console(ConsoleLevel::Warn, "deprecated API"),
        scraped_ok(),
    ]);

    let scraped = script.bridge.discover().unwrap();
    assert_eq!(scraped.result.page_title, "T");
    assert_eq!(
        script.bridge.console_log(),
        &[(ConsoleLevel::Warn, "deprecated API".to_string())]
    );
}

#[test]
fn content_side_failures_surface_as_errors() {
    let mut script = Script::ready();

    script.queue([BridgeMessage::scrape_failed("script error")]);
    assert!(matches!(script.bridge.discover(), Err(BridgeError::DiscoveryFailed(e)) if e == "script error"));
    assert_eq!(script.bridge.state(), BridgeState::Ready);

    script.queue([BridgeMessage::InjectionError { error: "frozen".into() }]);
    assert!(matches!(script.bridge.inject(&[]), Err(BridgeError::InjectionFailed(e)) if e == "frozen"));
    assert_eq!(script.bridge.state(), BridgeState::Ready);
}

#[test]
fn disconnect_is_not_retryable() {
    let mut script = Script::ready();
    script.inbox.borrow_mut().push_back(Err(BridgeError::Disconnected));

    let err = script.bridge.discover().unwrap_err();
    assert!(matches!(err, BridgeError::Disconnected));
    assert!(!err.is_retryable());
    assert_eq!(script.bridge.state(), BridgeState::Ready);
}

// ============================================================================
// Traffic trace
// ============================================================================

#[test]
fn trace_logger_writes_one_json_line_per_message() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bridge.jsonl");
    let tracer = TraceLogger::new(path.to_str().unwrap());
    assert!(tracer.is_enabled());

    let mut bridge = HostBridge::new(
        InProcessTransport::spawn(ContentSurface::new(Vocabulary::builtin()).forward_console(false)),
        BridgeSettings::default(),
    )
    .with_tracer(tracer);
    bridge.load_html(E2E_PAGE, None).unwrap();
    bridge.discover().unwrap();
    bridge.shutdown().unwrap();

    let lines: Vec<serde_json::Value> = std::fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let types: Vec<&str> = lines.iter().map(|l| l["message_type"].as_str().unwrap()).collect();
    assert_eq!(
        types,
        vec!["LoadHtml", "NavigationStarted", "PageReady", "RunDiscovery", "FieldsScraped", "Shutdown"]
    );
    assert_eq!(lines[0]["direction"], "host_to_content");
    assert_eq!(lines[1]["direction"], "content_to_host");
    assert_eq!(lines[4]["summary"], "3 fields on 'Apply'");
    let steps: Vec<u64> = lines.iter().map(|l| l["step"].as_u64().unwrap()).collect();
    assert_eq!(steps, (1..=6).collect::<Vec<u64>>());
}

#[test]
fn trace_records_failures_in_the_error_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("failed.jsonl");

    let mut bridge = in_process().with_tracer(TraceLogger::new(path.to_str().unwrap()));
    let err = bridge.navigate("file:///no/such/page.html").unwrap_err();
    assert!(matches!(err, BridgeError::Load { .. }));
    bridge.shutdown().unwrap();

    let lines: Vec<serde_json::Value> = std::fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let types: Vec<&str> = lines.iter().map(|l| l["message_type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["Load", "NavigationStarted", "LoadFailed", "Shutdown"]);

    assert_eq!(lines[0]["summary"], "file:///no/such/page.html");
    assert!(lines[0]["error"].is_null());
    assert_eq!(lines[2]["summary"], "file:///no/such/page.html");
    assert!(
        lines[2]["error"].as_str().is_some_and(|e| !e.is_empty()),
        "the load error is kept apart from the summary: {}",
        lines[2]
    );
}

#[test]
fn failed_messages_expose_their_error() {
    assert_eq!(BridgeMessage::scrape_failed("script error").error(), Some("script error"));
    assert_eq!(
        BridgeMessage::InjectionError { error: "frozen".into() }.error(),
        Some("frozen")
    );
    assert_eq!(scraped_ok().error(), None);
    assert_eq!(BridgeMessage::PageReady.error(), None);

    assert_eq!(
        HostCommand::RunInjection { instructions: vec![FillInstruction::new("email", "a@b.c")] }.summary().as_deref(),
        Some("1 instructions")
    );
    assert_eq!(
        HostCommand::LoadHtml { html: "<p>hi</p>".into(), url: None }.summary().as_deref(),
        Some("9 bytes"),
        "markup itself stays out of the trace"
    );
}

#[test]
fn trace_logger_with_bad_path_is_disabled() {
    let tracer = TraceLogger::new("/definitely/not/a/dir/trace.jsonl");
    assert!(!tracer.is_enabled());
}
