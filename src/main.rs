use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tagflux::clock::SystemClock;
use tagflux::config::{load_config, new_runtime_config, ControllerConfig};
use tagflux::content::{ContentServices, RendererRegistry};
use tagflux::dispatch::Dispatcher;
use tagflux::http::Fetcher;
use tagflux::hwtype::HwRegistry;
use tagflux::render::{DisplayListRasterizer, DitherCodec};
use tagflux::scheduler::Scheduler;
use tagflux::storage::DirStore;
use tagflux::tag::TagDb;
use tagflux::transport::LogTransport;
use tagflux::vars::VariableStore;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tagflux=info".into()),
        )
        .init();

    info!("Tagflux starting...");

    let config_path =
        std::env::var("TAGFLUX_CONFIG").unwrap_or_else(|_| "tagflux.toml".to_string());
    let config = if std::path::Path::new(&config_path).exists() {
        load_config(&config_path)?
    } else {
        warn!(path = %config_path, "Config file not found, using defaults");
        ControllerConfig::default()
    };

    let tags_path = PathBuf::from(
        std::env::var("TAGFLUX_TAGS").unwrap_or_else(|_| "tags.json".to_string()),
    );

    info!(
        config = %config_path,
        tags = %tags_path.display(),
        content = %config.content.directory.display(),
        "Configuration loaded"
    );

    let tags = if tags_path.exists() {
        Arc::new(TagDb::load_from_file(&tags_path)?)
    } else {
        Arc::new(TagDb::new())
    };

    let store = DirStore::new(config.content.directory.clone(), config.content.capacity_bytes)
        .context("Failed to open content store")?;
    let services = Arc::new(ContentServices {
        store: Arc::new(store),
        vars: Arc::new(VariableStore::new()),
        fetcher: Fetcher::from_config(&config.content)?,
        rasterizer: Arc::new(DisplayListRasterizer::new()),
        codec: Arc::new(DitherCodec),
        transport: Arc::new(LogTransport),
        config: config.content.clone(),
        runtime: new_runtime_config(config.runtime.clone()),
    });

    let dispatcher = Dispatcher::new(
        Arc::new(HwRegistry::new()),
        RendererRegistry::builtin(),
        services,
        config.controller.mac,
    );
    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&tags),
        dispatcher,
        Arc::new(SystemClock),
        config.scheduler.clone(),
    ));

    let runner = Arc::clone(&scheduler);
    let scheduler_handle = tokio::spawn(async move {
        runner.run().await;
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    scheduler_handle.abort();
    if let Err(e) = tags.save_to_file(&tags_path) {
        error!(error = %e, "Failed to save tag database");
    }
    info!("Tagflux stopped");

    Ok(())
}
