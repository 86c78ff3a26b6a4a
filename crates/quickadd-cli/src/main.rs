//! quickadd CLI entry point.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use quickadd_cli::cli::{Cli, compose_text};
use quickadd_cli::config::{Settings, install_dir};
use quickadd_cli::error::{CliError, CliResult};
use quickadd_google::{AuthConfig, Authenticator, CalendarClient, Event, OAuthCredentials};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.debug {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string()))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let settings = match cli.config {
        Some(ref path) => Settings::load_from(path).map_err(CliError::Config)?,
        None => Settings::load().map_err(CliError::Config)?,
    };

    let base = install_dir();
    let credentials_path = cli
        .credentials_file
        .unwrap_or_else(|| settings.resolved_credentials_path(&base));
    let token_path = cli
        .token_file
        .unwrap_or_else(|| settings.resolved_token_path(&base));
    let max_results = cli.max_results.unwrap_or(settings.max_results);
    let timeout = Duration::from_secs(settings.timeout_secs);

    let text = compose_text(&cli.words);

    // Credential bootstrap: any failure here is fatal, the calendar cannot
    // be reached without a valid token.
    let credentials = OAuthCredentials::from_file(&credentials_path)?;
    let config = AuthConfig::new(credentials, token_path).with_timeout(timeout);
    let tokens = Authenticator::new(config)?.obtain().await?;

    let client = CalendarClient::new(&tokens.access_token, timeout);

    // The two calls are independent: a list failure is reported but does
    // not cancel a requested quick-add.
    println!("Getting the upcoming {} events", max_results);
    match client
        .list_upcoming(&settings.calendar_id, max_results)
        .await
    {
        Ok(events) if events.is_empty() => println!("No upcoming events found."),
        Ok(events) => print_events(&events),
        Err(e) => eprintln!("error: failed to list events: {}", e),
    }

    if text.is_empty() {
        return Ok(());
    }

    println!("Adding {:?}", text);
    let created = client.quick_add(&settings.calendar_id, &text).await?;
    print_created(&created);

    Ok(())
}

fn print_events(events: &[Event]) {
    for event in events {
        println!("{} {}", event.start, event.summary);
    }
}

fn print_created(event: &Event) {
    println!("Created: {} {}", event.start, event.summary);
    if let Some(ref link) = event.html_link {
        println!("  {}", link);
    }
}
