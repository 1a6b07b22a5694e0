use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tango_config::Config;
use tango_lang_japanese::ScriptClassifier;
use tango_remote::{BackendClient, DisabledImageSearch};
use tokio::io::{AsyncReadExt, BufReader};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod output;
mod profile;
mod session;

#[cfg(test)]
mod tests;

use self::profile::Profiles;
use self::session::Collaborators;

/// Turn vocabulary lists into flashcard terms.
///
/// Each non-blank input line becomes one term, parsed into head word,
/// reading and meaning, then classified and optionally illustrated.
#[derive(Parser, Debug)]
#[command(name = "tango", version, about)]
struct Cli {
    /// Stored profile to load from the user config directory
    #[arg(long)]
    profile: Option<String>,

    /// Config file, overrides --profile
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read input from a file instead of stdin
    #[arg(long)]
    input: Option<PathBuf>,

    /// Search an image for every classified term
    #[arg(long)]
    images: bool,

    /// Never contact the backend
    #[arg(long)]
    offline: bool,

    /// Read stdin line by line and reprocess as it grows
    #[arg(long)]
    watch: bool,

    /// Print the final term list as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    init_tracing(&config.log_filter);

    let collaborators = collaborators(&config, cli.offline).await?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown requested");
                shutdown.cancel();
            }
        }
    });

    let state = if cli.watch {
        let stdin = BufReader::new(tokio::io::stdin());
        session::run_watch(config.pipeline, collaborators, stdin, cli.images, &shutdown).await?
    } else {
        let text = read_input(cli.input.as_deref()).await?;
        session::run_batch(config.pipeline, collaborators, &text, cli.images, &shutdown).await?
    };

    match state {
        Some(state) if cli.json => println!("{}", output::format_json(&state.snapshot)),
        Some(state) => println!("{}", output::format_table(&state.snapshot)),
        None => tracing::warn!("Cancelled before processing finished"),
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match (&cli.config, &cli.profile) {
        (Some(path), _) => profile::load_config_file(path)?,
        (None, Some(name)) => {
            let profiles = Profiles::user()?;
            profiles.init()?;
            profiles.load(name)?
        }
        (None, None) => Config::default(),
    };

    config.apply_env();
    Ok(config)
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .with_target(false)
        .init();
}

async fn collaborators(config: &Config, offline: bool) -> Result<Collaborators> {
    if offline || !config.backend.enabled {
        tracing::info!("Backend disabled, classifying offline");
        return Ok(Collaborators {
            classifier: Arc::new(ScriptClassifier::new()),
            image_search: Arc::new(DisabledImageSearch),
        });
    }

    tracing::info!("Using backend at {}", config.backend.base_url);
    let client = Arc::new(BackendClient::new(config.backend.clone())?);
    if let Err(e) = client.check_connection().await {
        tracing::warn!("Backend not reachable, terms will fail classification: {e:#}");
    }
    Ok(Collaborators {
        classifier: client.clone(),
        image_search: client,
    })
}

async fn read_input(path: Option<&std::path::Path>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            if atty::is(atty::Stream::Stdin) {
                eprintln!("Reading terms from stdin, end with Ctrl+D");
            }
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}
