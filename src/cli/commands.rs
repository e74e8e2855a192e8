use std::io;
use std::path::Path;

use tracing::info;

use crate::bridge::content::{serve, ContentSurface};
use crate::bridge::host::HostBridge;
use crate::bridge::transport::{InProcessTransport, ProcessTransport, Transport};
use crate::cli::config::{AppConfig, OutputFormat};
use crate::profile::planner::plan_fill;
use crate::profile::profile::Profile;
use crate::report::console::{format_discovery, format_injection};
use crate::trace::logger::TraceLogger;

/// Where the page comes from: a local HTML file or a URL.
pub enum PageSource<'a> {
    HtmlFile(&'a str),
    Url(&'a str),
}

impl<'a> PageSource<'a> {
    pub fn from_args(html: Option<&'a str>, url: Option<&'a str>) -> Result<Self, Box<dyn std::error::Error>> {
        match (html, url) {
            (Some(path), _) => Ok(PageSource::HtmlFile(path)),
            (None, Some(url)) => Ok(PageSource::Url(url)),
            (None, None) => Err("either --html or --url is required".into()),
        }
    }
}

fn open_page<T: Transport>(
    bridge: &mut HostBridge<T>,
    source: &PageSource<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
    match source {
        PageSource::HtmlFile(path) => {
            let html = std::fs::read_to_string(path)?;
            let url = format!("file://{}", path);
            bridge.load_html(&html, Some(&url))?;
        }
        PageSource::Url(url) => bridge.navigate(url)?,
    }
    Ok(())
}

fn tracer(config: &AppConfig, cli_trace: Option<&str>) -> TraceLogger {
    match config.trace_path(cli_trace) {
        Some(path) => TraceLogger::new(path),
        None => TraceLogger::disabled(),
    }
}

fn in_process_bridge(config: &AppConfig, cli_trace: Option<&str>) -> HostBridge<InProcessTransport> {
    let surface = ContentSurface::new(config.vocabulary()).forward_console(config.bridge.forward_console);
    HostBridge::new(InProcessTransport::spawn(surface), config.bridge_settings())
        .with_tracer(tracer(config, cli_trace))
}

// ============================================================================
// discover subcommand
// ============================================================================

pub fn cmd_discover(
    source: PageSource<'_>,
    format: OutputFormat,
    config: &AppConfig,
    cli_trace: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut bridge = in_process_bridge(config, cli_trace);
    open_page(&mut bridge, &source)?;

    let scraped = bridge.discover()?;
    bridge.shutdown()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&scraped.result)?),
        OutputFormat::Table => print!("{}", format_discovery(&scraped.result)),
    }
    Ok(())
}

// ============================================================================
// fill subcommand
// ============================================================================

pub fn cmd_fill(
    source: PageSource<'_>,
    profile_path: &str,
    use_process: bool,
    format: OutputFormat,
    config: &AppConfig,
    config_path: Option<&str>,
    cli_trace: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let profile = Profile::load(Path::new(profile_path))?;
    info!(entries = profile.len(), path = profile_path, "Profile loaded");

    if use_process {
        let mut args = Vec::new();
        if let Some(path) = config_path {
            args.push("--config".to_string());
            args.push(path.to_string());
        }
        let bridge = HostBridge::new(ProcessTransport::spawn_self(&args)?, config.bridge_settings())
            .with_tracer(tracer(config, cli_trace));
        run_fill(bridge, &source, &profile, format, config)
    } else {
        run_fill(in_process_bridge(config, cli_trace), &source, &profile, format, config)
    }
}

fn run_fill<T: Transport>(
    mut bridge: HostBridge<T>,
    source: &PageSource<'_>,
    profile: &Profile,
    format: OutputFormat,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    open_page(&mut bridge, source)?;

    let scraped = bridge.discover()?;
    let plan = plan_fill(&scraped.result.fields, profile, &config.vocabulary());
    let report = bridge.inject_scraped(scraped.generation, &plan)?;
    bridge.shutdown()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print!("{}", format_injection(&report)),
    }
    Ok(())
}

// ============================================================================
// serve subcommand
// ============================================================================

pub fn cmd_serve(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut surface = ContentSurface::new(config.vocabulary()).forward_console(config.bridge.forward_console);
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve(&mut surface, stdin.lock(), stdout.lock())?;
    Ok(())
}
