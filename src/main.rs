use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arena_tracker::api::state::AppState;
use arena_tracker::cache::{spawn_invalidation_listener, ResultCache};
use arena_tracker::config::AppConfig;
use arena_tracker::service::{self, CreateCompletedMatch};
use arena_tracker::store::MemoryStore;

#[derive(Parser)]
#[command(name = "arena-tracker")]
#[command(about = "Match record tracker serving derived statistics")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port number (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// JSONL file of completed matches to load at startup
        #[arg(long)]
        seed: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config_path = PathBuf::from(&cli.config);
    let config = if config_path.exists() {
        AppConfig::from_file(&config_path)
            .with_context(|| format!("loading config from {}", config_path.display()))?
    } else {
        AppConfig::default()
    };

    match cli.command {
        Commands::Serve { host, port, seed } => {
            let store = Arc::new(MemoryStore::new());
            let (default_policy, overrides) = config.cache.policy_table();
            let cache = Arc::new(ResultCache::new(default_policy, overrides));
            let invalidation = spawn_invalidation_listener(cache.clone());

            if let Some(ref seed_path) = seed {
                let loaded = load_seed(store.as_ref(), &invalidation, seed_path).await?;
                tracing::info!(count = loaded, path = %seed_path.display(), "seed data loaded");
            }

            let state = AppState {
                store,
                cache,
                invalidation,
            };
            let app = arena_tracker::api::build_router(state);

            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);
            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("binding {}", addr))?;
            tracing::info!("API listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

/// Load completed matches from a JSONL file, one payload per line.
async fn load_seed(
    store: &MemoryStore,
    invalidation: &arena_tracker::cache::InvalidationSender,
    path: &PathBuf,
) -> Result<usize> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed file {}", path.display()))?;

    let mut count = 0;
    for (line_number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let data: CreateCompletedMatch = serde_json::from_str(line)
            .with_context(|| format!("parsing seed line {}", line_number + 1))?;
        match service::create_completed_match(store, invalidation, data).await {
            Ok(_) => count += 1,
            Err(err) => {
                tracing::warn!(line = line_number + 1, %err, "skipping seed record");
            }
        }
    }
    Ok(count)
}
