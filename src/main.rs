use incentive_board::demo::DemoStore;
use incentive_board::remote::RemoteStore;
use incentive_board::store::SharedStore;
use incentive_board::tiers::TierConfig;
use incentive_board::{router, spawn_ingest_from, AppConfig, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = AppConfig::from_env();

    let store: SharedStore = match config.service() {
        Some((url, key)) => {
            info!("using hosted incentive service at {url}");
            let remote = Arc::new(RemoteStore::connect(url, key));
            remote.spawn_feed();
            remote
        }
        None => {
            info!(path = %config.data_path.display(), "no service configured, using local demo store");
            if let Some(parent) = config.data_path.parent() {
                fs::create_dir_all(parent).await?;
            }
            Arc::new(DemoStore::open(config.data_path.clone()).await)
        }
    };

    let state = AppState::new(store, TierConfig::default());
    // Opened before the fetch; events that race the snapshot replay later.
    let events = state.store.subscribe();
    load_initial(&state).await;
    spawn_ingest_from(state.clone(), events);

    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn load_initial(state: &AppState) {
    let (incentives, contributions) = match tokio::try_join!(
        state.store.fetch_incentives(),
        state.store.fetch_contributions(),
    ) {
        Ok(pair) => pair,
        Err(err) => {
            warn!(error = %err, "initial fetch failed, starting with an empty board");
            return;
        }
    };

    let mut board = state.board.lock().await;
    board.rebuild(incentives, &contributions);
    info!(contributions = contributions.len(), "initial data loaded");
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
