//! Feed Crossposter — Binary Entrypoint
//! Runs exactly one fetch → filter → dispatch → commit pass and exits.
//! Invoked by an external scheduler; no CLI surface beyond this.

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feed_crossposter::checkpoint::RestCheckpointStore;
use feed_crossposter::config::{AppConfig, LogLevel};
use feed_crossposter::ingest::rss::RssFeedSource;
use feed_crossposter::notify::webhook::MakerWebhookSender;
use feed_crossposter::notify::WebhookSender;
use feed_crossposter::run::run_once;

fn init_tracing(level: LogLevel) {
    // RUST_LOG wins over the configured level when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.env_filter()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    let cfg = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("configuration error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(cfg.log_level);

    let source = RssFeedSource::new(cfg.feed_url.clone());
    let store =
        RestCheckpointStore::new(cfg.checkpoint_endpoint.clone(), cfg.checkpoint_table.clone());
    let sender: Arc<dyn WebhookSender> = Arc::new(MakerWebhookSender::new(
        cfg.webhook_base_url.clone(),
        cfg.webhook_key.clone(),
        cfg.webhook_event_default.clone(),
        cfg.webhook_event_media.clone(),
    ));

    match run_once(&source, &store, sender, cfg.max_items_per_run).await {
        Ok(report) => {
            tracing::info!(
                considered = report.considered,
                selected = report.selected,
                delivered = report.delivered,
                failed = report.failed,
                checkpoint_before = ?report.checkpoint_before,
                checkpoint_after = ?report.checkpoint_after,
                checkpoint_written = report.checkpoint_written,
                "run complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}
