mod config;

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use chirp_api::auth::{AppState, AppStateInner};
use chirp_api::routes;
use chirp_db::Database;

use crate::config::{Args, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chirp_server=debug,chirp_api=debug,chirp_db=debug,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    if args.debug {
        match std::fs::remove_file(&config.db_path) {
            Ok(()) => warn!("Debug mode: removed {}", config.db_path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("removing {}", config.db_path.display()));
            }
        }
    }

    // A store that does not parse is fatal.
    let db = Database::open(&config.db_path)
        .with_context(|| format!("opening store at {}", config.db_path.display()))?;

    let state: AppState = Arc::new(AppStateInner::new(
        db,
        config.jwt_secret.as_bytes(),
        config.polka_key.clone(),
    ));
    if state.polka_key.is_empty() {
        warn!("POLKA_KEY is unset; upgrade webhooks will be refused");
    }

    let app = routes::router(state, &config.static_dir)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Chirp server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
