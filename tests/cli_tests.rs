use std::time::Duration;

use clap::Parser;
use form_autofill::cli::commands::PageSource;
use form_autofill::cli::config::{AppConfig, Cli, Commands, OutputFormat, load_config, parse_config};

// ============================================================================
// CLI Argument Parsing Tests
// ============================================================================

#[test]
fn cli_parse_discover_html() {
    let cli = Cli::parse_from(["form-autofill", "discover", "--html", "page.html"]);
    match cli.command {
        Commands::Discover { html, url, format } => {
            assert_eq!(html, Some("page.html".to_string()));
            assert!(url.is_none());
            assert_eq!(format, OutputFormat::Table);
        }
        _ => panic!("Expected Discover command"),
    }
    assert_eq!(cli.verbose, 0);
    assert!(cli.config.is_none());
    assert!(cli.trace.is_none());
}

#[test]
fn cli_parse_discover_url_json() {
    let cli = Cli::parse_from([
        "form-autofill",
        "discover",
        "--url",
        "https://jobs.example/apply",
        "--format",
        "json",
    ]);
    match cli.command {
        Commands::Discover { html, url, format } => {
            assert!(html.is_none());
            assert_eq!(url, Some("https://jobs.example/apply".to_string()));
            assert_eq!(format, OutputFormat::Json);
        }
        _ => panic!("Expected Discover command"),
    }
}

#[test]
fn cli_discover_requires_exactly_one_source() {
    assert!(Cli::try_parse_from(["form-autofill", "discover"]).is_err());
    assert!(
        Cli::try_parse_from([
            "form-autofill",
            "discover",
            "--html",
            "a.html",
            "--url",
            "https://example.com",
        ])
        .is_err()
    );
}

#[test]
fn cli_parse_fill_all_args() {
    let cli = Cli::parse_from([
        "form-autofill",
        "fill",
        "--url",
        "file:///tmp/apply.html",
        "--profile",
        "me.yaml",
        "--process",
        "--format",
        "json",
    ]);
    match cli.command {
        Commands::Fill {
            html,
            url,
            profile,
            process,
            format,
        } => {
            assert!(html.is_none());
            assert_eq!(url, Some("file:///tmp/apply.html".to_string()));
            assert_eq!(profile, "me.yaml");
            assert!(process);
            assert_eq!(format, OutputFormat::Json);
        }
        _ => panic!("Expected Fill command"),
    }
}

#[test]
fn cli_fill_requires_profile() {
    assert!(Cli::try_parse_from(["form-autofill", "fill", "--html", "a.html"]).is_err());
}

#[test]
fn cli_parse_serve_with_globals() {
    let cli = Cli::parse_from([
        "form-autofill",
        "-vv",
        "--config",
        "custom.yaml",
        "--trace",
        "bridge.jsonl",
        "serve",
    ]);
    assert!(matches!(cli.command, Commands::Serve));
    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.config, Some("custom.yaml".to_string()));
    assert_eq!(cli.trace, Some("bridge.jsonl".to_string()));
}

#[test]
fn cli_globals_after_subcommand() {
    let cli = Cli::parse_from(["form-autofill", "discover", "--html", "a.html", "-v", "--trace", "t.jsonl"]);
    assert_eq!(cli.verbose, 1);
    assert_eq!(cli.trace, Some("t.jsonl".to_string()));
}

#[test]
fn page_source_prefers_html_file() {
    assert!(matches!(
        PageSource::from_args(Some("a.html"), None),
        Ok(PageSource::HtmlFile("a.html"))
    ));
    assert!(matches!(
        PageSource::from_args(None, Some("https://example.com")),
        Ok(PageSource::Url("https://example.com"))
    ));
    assert!(PageSource::from_args(None, None).is_err());
}

// ============================================================================
// Config File Tests
// ============================================================================

#[test]
fn config_load_missing_file() {
    let config = load_config(Some("nonexistent_file_that_does_not_exist.yaml"));
    // Should return defaults without error
    assert!(config.vocabulary.is_empty());
    assert_eq!(config.bridge.ready_timeout_ms, 10_000);
    assert!(config.trace.path.is_none());
}

#[test]
fn config_default_values() {
    let config = AppConfig::default();
    assert_eq!(config.bridge.ready_timeout_ms, 10_000);
    assert_eq!(config.bridge.operation_timeout_ms, 5_000);
    assert!(config.bridge.forward_console);

    let settings = config.bridge_settings();
    assert_eq!(settings.ready_timeout, Duration::from_secs(10));
    assert_eq!(settings.operation_timeout, Duration::from_secs(5));
}

#[test]
fn config_yaml_roundtrip() {
    let config = AppConfig::default();
    let yaml = serde_yaml::to_string(&config).unwrap();
    let parsed = parse_config(&yaml).unwrap();
    assert_eq!(parsed.bridge.operation_timeout_ms, config.bridge.operation_timeout_ms);
    assert_eq!(parsed.bridge.forward_console, config.bridge.forward_console);
}

#[test]
fn config_partial_yaml() {
    let yaml = r#"
bridge:
  operation_timeout_ms: 250
vocabulary:
  email:
    keywords: ["mail", "correo"]
  pronouns:
    keywords: ["pronoun"]
"#;
    let config = parse_config(yaml).unwrap();
    assert_eq!(config.bridge.operation_timeout_ms, 250);
    // Other bridge fields get defaults
    assert_eq!(config.bridge.ready_timeout_ms, 10_000);
    assert!(config.bridge.forward_console);

    let vocab = config.vocabulary();
    assert_eq!(vocab.get("email").unwrap().keywords, vec!["mail".to_string(), "correo".to_string()]);
    assert_eq!(vocab.get("pronouns").unwrap().keywords, vec!["pronoun".to_string()]);
    assert!(vocab.get("firstName").is_some(), "built-ins survive overrides");
}

#[test]
fn config_empty_file_is_default() {
    let config = parse_config("  \n").unwrap();
    assert!(config.vocabulary.is_empty());
    assert!(parse_config("bridge: [not, a, map]").is_err());
}

#[test]
fn config_load_from_file_and_malformed_fallback() {
    let dir = tempfile::tempdir().unwrap();

    let good = dir.path().join("good.yaml");
    std::fs::write(&good, "trace:\n  path: from-config.jsonl\n").unwrap();
    let config = load_config(good.to_str());
    assert_eq!(config.trace.path.as_deref(), Some("from-config.jsonl"));

    let bad = dir.path().join("bad.yaml");
    std::fs::write(&bad, "bridge: {ready_timeout_ms: soon}\n").unwrap();
    let fallback = load_config(bad.to_str());
    assert_eq!(fallback.bridge.ready_timeout_ms, 10_000, "malformed config falls back to defaults");
}

#[test]
fn trace_path_prefers_cli_flag() {
    let config = parse_config("trace:\n  path: from-config.jsonl\n").unwrap();

    assert_eq!(config.trace_path(Some("from-cli.jsonl")), Some("from-cli.jsonl"));
    assert_eq!(config.trace_path(None), Some("from-config.jsonl"));
    assert_eq!(AppConfig::default().trace_path(None), None);
}
