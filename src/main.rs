use anyhow::{Context, Result};
use audio_ingest::{create_router, AppState, Config, ConfigOverrides, FfmpegEngine, IngestPipeline};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Receive browser recordings over WebSocket and store them as normalized MP3
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config file, with or without extension
    #[arg(short, long, default_value = "config/audio-ingest")]
    config: String,

    /// Address to bind (overrides service.http.bind)
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on (overrides service.http.port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory for published recordings (overrides storage.output_dir)
    #[arg(long)]
    output_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let overrides = ConfigOverrides {
        bind: args.bind,
        port: args.port,
        output_dir: args.output_dir,
    };
    let cfg = Config::load_with_overrides(&args.config, &overrides)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    // A missing engine degrades submissions, it never stops the server
    let engine = Arc::new(FfmpegEngine::detect(cfg.ffmpeg()).await);
    let pipeline = Arc::new(IngestPipeline::from_config(&cfg, engine));

    let output_dir = pipeline.publisher().output_dir();
    std::fs::create_dir_all(output_dir).context("Failed to create output directory")?;

    info!(
        "Media engine: {} ({:?})",
        pipeline.engine().name(),
        pipeline.engine().readiness()
    );
    info!("Output directory: {}", output_dir.display());
    info!("Scratch directory: {}", pipeline.stager().scratch_root().display());
    info!("Source retention: {:?}", cfg.storage.source_retention);

    let state = AppState::new(pipeline).with_max_message_bytes(cfg.service.max_message_bytes);
    let app = create_router(state);

    let bind_addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    info!("Socket server listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
