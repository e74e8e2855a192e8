use clap::Parser;
use form_autofill::cli::commands::{PageSource, cmd_discover, cmd_fill, cmd_serve};
use form_autofill::cli::config::{Cli, Commands, load_config};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logs go to stderr so `serve` keeps stdout for NDJSON.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Discover { html, url, format } => {
            let source = PageSource::from_args(html.as_deref(), url.as_deref())?;
            cmd_discover(source, format, &config, cli.trace.as_deref())?;
        }
        Commands::Fill {
            html,
            url,
            profile,
            process,
            format,
        } => {
            let source = PageSource::from_args(html.as_deref(), url.as_deref())?;
            cmd_fill(
                source,
                &profile,
                process,
                format,
                &config,
                cli.config.as_deref(),
                cli.trace.as_deref(),
            )?;
        }
        Commands::Serve => cmd_serve(&config)?,
    }

    Ok(())
}
