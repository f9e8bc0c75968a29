//! Curio -- object registry server.
//!
//! Startup provisions the blob bucket (ensure-exists + public-read
//! policy) before serving, so the repository can assume the namespace is
//! ready.  SIGTERM/SIGINT handlers stop accepting connections and let
//! in-flight requests drain.

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use curio::metadata::store::MetadataStore;
use curio::storage::client::BlobStore;

/// Command-line arguments for the Curio server.
#[derive(Parser, Debug)]
#[command(name = "curio", version, about = "Object registry server")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "curio.example.yaml")]
    config: String,

    /// Override the bind address (host:port).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = curio::config::load_config(&cli.config)?;

    // Initialize tracing / logging. RUST_LOG wins over the config level.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    match config.logging.format.as_str() {
        "json" => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    info!("Loaded configuration from {}", cli.config);

    let bind_addr = cli
        .bind
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));

    // Initialize Prometheus metrics recorder and register metric descriptions.
    curio::metrics::init_metrics();
    curio::metrics::describe_metrics();
    info!("Prometheus metrics initialized");

    // Initialize the metadata store.
    let metadata: Arc<dyn MetadataStore> = match config.metadata.engine.as_str() {
        "memory" => {
            info!("In-memory metadata store initialized");
            Arc::new(curio::metadata::memory::MemoryMetadataStore::new())
        }
        "sqlite" | _ => {
            let metadata_path = &config.metadata.sqlite.path;
            // Ensure parent directory exists for the SQLite file.
            if let Some(parent) = std::path::Path::new(metadata_path).parent() {
                std::fs::create_dir_all(parent)?;
            }
            let store = curio::metadata::sqlite::SqliteMetadataStore::new(metadata_path)?;
            info!("SQLite metadata store initialized at {}", metadata_path);
            Arc::new(store)
        }
    };

    // Initialize the blob store backend.
    let bucket = config.storage.bucket.clone();
    let public_url = config.storage.public_url.clone();
    let blobs: Arc<dyn BlobStore> = match config.storage.backend.as_str() {
        "s3" => {
            let s3_config = config.storage.s3.as_ref().ok_or_else(|| {
                anyhow::anyhow!("storage.backend is 's3' but storage.s3 config section is missing")
            })?;
            let store = curio::storage::s3::S3GatewayStore::new(bucket, public_url, s3_config)
                .await?;
            Arc::new(store)
        }
        "memory" => {
            info!("In-memory blob store initialized");
            Arc::new(curio::storage::memory::MemoryBlobStore::new(
                bucket, public_url,
            ))
        }
        "local" | _ => {
            let root = &config.storage.local.root_dir;
            let store =
                curio::storage::local::LocalBlobStore::new(root, bucket, public_url)?;
            info!("Local blob store initialized at {}", root);
            Arc::new(store)
        }
    };

    // Provision the bucket before any create can run.
    blobs.provision().await?;
    info!("Blob bucket {} provisioned", config.storage.bucket);

    // Build AppState.
    let state = Arc::new(curio::AppState {
        config: config.clone(),
        repository: curio::repository::ObjectRepository::new(metadata, blobs),
        notifier: curio::notify::ChangeNotifier::new(),
    });

    let app = curio::server::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Curio listening on {}", bind_addr);

    // Graceful shutdown: on SIGTERM/SIGINT, stop accepting new connections
    // and wait for in-flight requests to complete.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Curio shut down");

    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C), then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        },
    }
}
