mod cli;
mod commands;
mod error;
mod output;

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gopark_config::Config;
use gopark_core::{ApiClient, CoreError, LiveFeed, Parking};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a server
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "gopark", &mut std::io::stdout());
            Ok(())
        }

        // Ping only needs the feed URL
        Command::Ping(args) => {
            let config = load_effective_config(&cli.global)?;
            commands::live::ping(&config, &args, &cli.global).await
        }

        // Everything else talks to the server
        cmd => {
            let config = load_effective_config(&cli.global)?;
            let parking = build_parking(&config)?;

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &parking, &config, &cli.global).await
        }
    }
}

/// Config file + environment, with command-line overrides applied.
pub(crate) fn load_effective_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut config = gopark_config::load_config()?;
    if let Some(url) = &global.api_url {
        config.api.base_url.clone_from(url);
    }
    if let Some(url) = &global.ws_url {
        config.live.ws_url.clone_from(url);
    }
    if let Some(secs) = global.timeout {
        config.api.timeout_secs = secs;
    }
    Ok(config)
}

/// Build the REST client and live feed, resuming a stored session if the
/// keyring has one.
fn build_parking(config: &Config) -> Result<Parking, CliError> {
    let api_url = config.api_url()?;
    let api = ApiClient::new(api_url.as_str(), &config.to_transport_config())
        .map_err(CoreError::from)?;
    let feed = LiveFeed::spawn(config.to_feed_config()?);
    let parking = Parking::new(api, feed);

    match gopark_config::load_session() {
        Ok(Some(session)) => {
            tracing::debug!(username = session.username(), "resuming stored session");
            Ok(parking.with_session(session))
        }
        Ok(None) => Ok(parking),
        Err(e) => {
            tracing::debug!(error = %e, "no usable stored session");
            Ok(parking)
        }
    }
}

/// Grace period for the close frame to go out before the runtime exits.
pub(crate) const CLOSE_GRACE: Duration = Duration::from_millis(200);
