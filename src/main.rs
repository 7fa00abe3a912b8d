use anyhow::{Context, Result};
use clap::Parser;
use newswire::config::Config;
use newswire::content::ContentFetcher;
use newswire::feed::FeedExtractor;
use newswire::pipeline::{PipelineDriver, Ticker};
use newswire::publish::{
    BearerToken, CredentialProvider, MessageFilter, NoAuth, Publisher, ResilientTransport,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(
    name = "newswire",
    about = "Feed-to-topic injector: pulls web feeds and publishes article content to a message topic"
)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: PathBuf,

    /// Run a single cycle and exit instead of polling
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    config.validate().context("Invalid configuration")?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("newswire/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let credentials: Arc<dyn CredentialProvider> =
        match BearerToken::discover(config.token.as_deref(), config.token_file.as_deref())
            .context("Failed to resolve bearer token")?
        {
            Some(token) => Arc::new(token),
            None => {
                tracing::info!("No bearer token configured, publishing unauthenticated");
                Arc::new(NoAuth)
            }
        };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let timeout = Duration::from_secs(config.request_timeout_secs);
    let fetcher = ContentFetcher::new(client.clone(), timeout);
    let extractor = FeedExtractor::new(fetcher);

    let transport = ResilientTransport::new(
        client,
        credentials,
        config.backoff.clone(),
        timeout,
        shutdown_rx.clone(),
    );
    let publisher = Publisher::new(
        transport,
        MessageFilter::new(config.min_plain_chars),
        config.content_separator.clone(),
        &config.endpoint,
        &config.topic,
    );

    let ticker = if args.once {
        Ticker::once()
    } else {
        Ticker::every(Duration::from_secs(config.poll_interval_secs))
    };

    tracing::info!(
        sources = config.sources.len(),
        topic = %config.topic,
        once = args.once,
        "Starting pipeline"
    );

    let driver = PipelineDriver::new(extractor, publisher, config.sources.clone(), shutdown_rx);
    driver.run(ticker).await;

    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to register SIGTERM handler, SIGINT only");
            if tokio::signal::ctrl_c().await.is_err() {
                tracing::error!("Failed to listen for ctrl-c");
            }
            return;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if result.is_err() {
                tracing::error!("Failed to listen for ctrl-c");
            }
        }
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("Failed to listen for ctrl-c");
    }
}
